//! Service layer
//!
//! The restore pipeline and the capabilities it drives: sandboxes, the
//! backup directory, artifact uploads and notifications.
//!
//! Notification channels live in `drill_client::notify`, shared with the
//! orchestrator's test endpoint.
//!
//! All services are trait-based to enable testing and dependency injection.

pub mod directory;
pub mod execution;
pub mod sandbox;
pub mod sandbox_db;
pub mod upload;

pub use drill_client::notify;

// Re-export traits
pub use directory::BackupDirectory;
pub use notify::Notifier;
pub use sandbox::SandboxManager;
pub use sandbox_db::SandboxDatabase;
pub use upload::ArtifactUploader;

// Re-export implementations
pub use execution::{Pipeline, PipelineDeps, PipelineSettings, PipelineTimings};
pub use notify::ChannelNotifier;
pub use sandbox::ContainerSandboxManager;
pub use sandbox_db::PgSandboxDatabase;
pub use upload::StorageUploader;
