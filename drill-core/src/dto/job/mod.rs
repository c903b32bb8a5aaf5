//! Job DTOs for inter-service communication

use serde::{Deserialize, Serialize};

use crate::domain::definition::TestDefinition;
use crate::domain::job::Job;

/// A job handed to a runner by the queue
///
/// `definition` is `None` when the definition was deleted after enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedJob {
    pub job: Job,
    pub definition: Option<TestDefinition>,
}

/// Orchestrator acknowledgement of a recorded outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutcomeReceipt {
    /// Whether the processed backup id was written onto the definition
    pub definition_updated: bool,
}

/// Query parameters for job history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}
