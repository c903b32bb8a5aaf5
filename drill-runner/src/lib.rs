//! Restore drill runner
//!
//! A stateless worker that claims restore jobs from the orchestrator and runs
//! each one through the restore pipeline inside a throwaway database sandbox.

pub mod config;
pub mod context;
pub mod podman;
pub mod queue;
pub mod scheduler;
pub mod service;
