//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Firestore error: {0}")]
    Firestore(#[from] vshare_firestore::FirestoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] vshare_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] vshare_queue::QueueError),

    #[error("Sensitivity error: {0}")]
    Sensitivity(#[from] vshare_sensitivity::SensitivityError),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }
}
