//! Firestore REST persistence layer for VidShare.
//!
//! A typed client plus one repository per collection. All mutations are
//! single masked document writes; cross-document membership changes go
//! through atomic commit batches.

pub mod client;
pub mod error;
pub mod group_repo;
pub mod repos;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod video_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use group_repo::GroupRepository;
pub use repos::{OrganizationRepository, UserRepository};
pub use video_repo::{VideoRepository, VideoScope};
