//! S3-compatible object storage for VidShare uploads.

pub mod client;
pub mod error;

pub use client::{RangedObject, StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
