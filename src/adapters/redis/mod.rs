//! Redis adapters.
//!
//! - `RedisJobQueue` - List-backed delivery job queue with a dead-letter list

mod job_queue;

pub use job_queue::{RedisJobQueue, RedisQueueKeys};
