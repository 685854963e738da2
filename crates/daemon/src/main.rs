use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use stocksync_infra::db::postgres;
use stocksync_infra::{
    MoySkladClient, PostgresProductRepository, Reconciler, SyncConfig, SyncWorker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stocksync_observability::init();

    if let Err(err) = run().await {
        tracing::error!(error = %failure_message(&err), "terminating on startup failure");
        return Err(err);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = load_config(|key| std::env::var(key).ok())?;
    tracing::info!(
        base_url = %config.base_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        page_size = config.page_size,
        "starting stock-entry synchronisation"
    );

    let pool = postgres::connect(&config)
        .await
        .context("database unavailable")?;
    let client = MoySkladClient::new(&config).context("can't build HTTP client")?;

    let reconciler = Arc::new(Reconciler::new(
        PostgresProductRepository::new(pool.clone()),
        client,
        config.settings.clone(),
        config.page_size,
    ));

    let cancel = CancellationToken::new();
    let worker = SyncWorker::spawn(reconciler, config.poll_interval, cancel.clone());

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "can't listen for shutdown signal");
    }
    tracing::info!("shutdown requested");

    worker.shutdown().await;
    pool.close().await;

    tracing::info!("stopped");
    Ok(())
}

fn load_config<F>(lookup: F) -> anyhow::Result<SyncConfig>
where
    F: Fn(&str) -> Option<String>,
{
    SyncConfig::from_lookup(lookup).context("invalid configuration")
}

/// Context chain on one line (`outer: inner`).
fn failure_message(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_reports_context_and_cause() {
        let err = load_config(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/db".to_string()),
            _ => None,
        })
        .unwrap_err();

        assert_eq!(
            failure_message(&err),
            "invalid configuration: MOYSKLAD_TOKEN is not set"
        );
    }

    #[test]
    fn malformed_base_url_is_a_startup_failure() {
        let err = load_config(|key| match key {
            "MOYSKLAD_TOKEN" => Some("token".to_string()),
            "DATABASE_URL" => Some("postgres://localhost/db".to_string()),
            "MOYSKLAD_BASE_URL" => Some("not a url".to_string()),
            _ => None,
        })
        .unwrap_err();

        assert!(failure_message(&err).contains("MOYSKLAD_BASE_URL"));
    }
}
