//! Infrastructure layer: database, remote service client, configuration and
//! the reconciliation loop that ties them together.

pub mod config;
pub mod db;
pub mod external;
pub mod reconcile;
pub mod workers;


pub use config::{StartupError, SyncConfig};
pub use db::{DataAccessError, PostgresProductRepository, ProductRepository};
pub use external::{DocumentClient, MoySkladClient, RemoteServiceError};
pub use reconcile::{PassReport, ReconcileError, Reconciler};
pub use workers::{SyncWorker, WorkerHandle};
