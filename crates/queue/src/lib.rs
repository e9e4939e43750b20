pub mod control;
pub mod error;
pub mod keys;
pub mod memory;
pub mod queue;
#[cfg(feature = "redis")]
pub mod redis_queue;

pub use control::{ControlPlane, Flag};
pub use error::QueueError;
pub use keys::{now_score, MATCHED_QUEUE, PROCESSING_QUEUE, RESTART_TRACKER_FLAG, STOP_FLAG};
pub use memory::{MemoryControl, MemoryQueue};
pub use queue::{PopOrder, ScoredQueue};
#[cfg(feature = "redis")]
pub use redis_queue::{connect, RedisControl, RedisQueue};
