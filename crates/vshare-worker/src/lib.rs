//! Sensitivity-scan worker.
//!
//! Runs the asynchronous moderation workflow detached from the API's
//! request cycle: upload enqueues, this worker classifies and persists the
//! terminal status, clients hear about it over their notification channel.

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, ScanContext};
pub use processor::{run_sensitivity_scan, ScanOutcome, StatusWriter};
