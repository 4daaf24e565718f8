//! Infrastructure layer: transactional storage, the operation boundary,
//! configuration, reports and background notification delivery.

pub mod config;
pub mod error;
pub mod notifications;
pub mod reports;
pub mod service;
pub mod store;
pub mod workers;

pub use self::config::{ConfigLoadError, StockConfig};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use notifications::{LogSink, Notification, NotificationSink, Urgency};
pub use service::{
    AdjustmentResult, CompletionResult, MovementResult, ReceiveResult, StockService,
};
pub use store::{InMemoryStockStore, StockStore, StockTx};
pub use workers::{NotificationWorker, WorkerHandle};

#[cfg(test)]
mod integration_tests;
