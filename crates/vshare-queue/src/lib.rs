//! Redis-backed job queue and notification channel for VidShare.

pub mod error;
pub mod events;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use events::{ChannelMessage, EventChannel, EventSink};
pub use job::{JobId, SensitivityScanJob};
pub use queue::{JobQueue, QueueConfig};
