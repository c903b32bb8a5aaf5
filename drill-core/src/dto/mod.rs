//! Data Transfer Objects for inter-service communication

pub mod definition;
pub mod job;
pub mod target;
