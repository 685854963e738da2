use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::ProductRepository;
use crate::external::DocumentClient;
use crate::reconcile::{ReconcileError, Reconciler};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Token shared with the running worker.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// A pass in progress stops at its next page boundary.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            warn!(error = %err, "sync worker task ended abnormally");
        }
    }
}

/// Shortest accepted period between pass starts.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Recurring reconciliation loop.
///
/// - Runs one pass immediately, then one per `period`
/// - Passes never overlap; a slow pass delays the next tick
/// - A failed pass is logged and the loop waits for the next tick
/// - `period` is raised to `MIN_PERIOD` when shorter
#[derive(Debug)]
pub struct SyncWorker;

impl SyncWorker {
    pub fn spawn<R, C>(
        reconciler: Arc<Reconciler<R, C>>,
        period: Duration,
        cancel: CancellationToken,
    ) -> WorkerHandle
    where
        R: ProductRepository + 'static,
        C: DocumentClient + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let token = cancel.clone();
        let join = tokio::spawn(async move { worker_loop(reconciler, period, token).await });

        WorkerHandle { cancel, join }
    }
}

async fn worker_loop<R, C>(
    reconciler: Arc<Reconciler<R, C>>,
    period: Duration,
    cancel: CancellationToken,
) where
    R: ProductRepository,
    C: DocumentClient,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "sync worker started");

    loop {
        // The first tick completes immediately.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match reconciler.run_pass(&cancel).await {
            Ok(_) => {}
            Err(ReconcileError::Cancelled) => break,
            Err(err) => {
                error!(error = %err, details = ?err, "reconciliation pass failed");
            }
        }
    }

    info!("sync worker stopped");
}
