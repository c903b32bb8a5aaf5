//! Drill Orchestrator
//!
//! Owns the Postgres database and exposes the job queue and the target
//! registry over HTTP.

pub mod api;
pub mod db;
pub mod repository;
pub mod service;
