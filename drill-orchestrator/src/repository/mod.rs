//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles database operations for a specific domain entity.

pub mod definition;
pub mod job;
pub mod target;

// Re-export for convenience
pub use definition as definition_repository;
pub use job as job_repository;
pub use target as target_repository;
