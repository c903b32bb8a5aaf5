//! Drill Core
//!
//! Core types shared by every Restore Drill service.
//!
//! This crate contains:
//! - Domain types: jobs, test definitions, storage and notification targets, backups
//! - DTOs: request/response bodies exchanged between the orchestrator, runner and CLI

pub mod domain;
pub mod dto;
