//! Client for the external sensitivity-analysis (content moderation)
//! service.
//!
//! The service is a black box behind [`SensitivityAnalyzer`]: it fetches a
//! video from a presigned URL and returns a safety verdict. Failures are
//! surfaced to the caller, which owns the fail-open policy.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SensitivityAnalyzer, SensitivityClient, SensitivityConfig};
pub use error::{SensitivityError, SensitivityResult};
pub use types::{AnalyzeRequest, SensitivityVerdict};
