//! Core domain types
//!
//! These types are persisted by the orchestrator and consumed by the runner
//! while it executes a restore drill.

pub mod backup;
pub mod definition;
pub mod job;
pub mod log;
pub mod target;
