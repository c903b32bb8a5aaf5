//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod job;
pub mod registry;

// Re-export for convenience
pub use job as job_service;
pub use registry as registry_service;
