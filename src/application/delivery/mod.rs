//! Pass delivery pipeline.
//!
//! - `lock_manager` - Row-embedded delivery lock (at most one sender)
//! - `executor` - Lock, send with timeout, mark sent or release
//! - `dispatcher` - Trigger handling, rendering, queue-or-inline choice
//! - `worker` - Queue consumer sharing the executor with the inline path

mod dispatcher;
mod executor;
mod lock_manager;
mod worker;

pub use dispatcher::{
    normalize_recipient, DispatchOutcome, DispatcherConfig, NotificationDispatcher, QueueHandle,
};
pub use executor::{DeliveryExecutor, DeliveryOutcome};
pub use lock_manager::{Acquisition, DeliveryLease, DeliveryLockManager};
pub use worker::{JobDisposition, QueueWorker, QueueWorkerConfig};
