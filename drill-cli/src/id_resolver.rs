//! ID resolver module
//!
//! Resolves UUID prefixes to full UUIDs by listing the matching resources, so
//! users can type short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use drill_client::OrchestratorClient;
use uuid::Uuid;

/// Largest history page the orchestrator serves
const HISTORY_SCAN_LIMIT: i64 = 500;

/// Resolve a test definition ID or prefix
pub async fn resolve_definition_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid);
    }

    let definitions = client
        .list_definitions()
        .await
        .context("Failed to fetch definitions for ID resolution")?;

    resolve_prefix("definition", input, definitions.iter().map(|d| d.id))
}

/// Resolve a job ID or prefix among active jobs and recent history
pub async fn resolve_job_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid);
    }

    let active = client
        .active_jobs()
        .await
        .context("Failed to fetch active jobs for ID resolution")?;
    let history = client
        .job_history(Some(HISTORY_SCAN_LIMIT))
        .await
        .context("Failed to fetch job history for ID resolution")?;

    resolve_prefix("job", input, active.iter().chain(history.iter()).map(|j| j.id))
}

pub async fn resolve_storage_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid);
    }

    let targets = client
        .list_storage()
        .await
        .context("Failed to fetch storage targets for ID resolution")?;

    resolve_prefix("storage target", input, targets.iter().map(|t| t.id))
}

pub async fn resolve_notification_id(client: &OrchestratorClient, input: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid);
    }

    let targets = client
        .list_notifications()
        .await
        .context("Failed to fetch notification targets for ID resolution")?;

    resolve_prefix("notification target", input, targets.iter().map(|t| t.id))
}

/// Finds the single candidate whose ID starts with `prefix`
fn resolve_prefix(
    kind: &str,
    prefix: &str,
    candidates: impl IntoIterator<Item = Uuid>,
) -> Result<Uuid> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(anyhow!("Empty {} ID", kind));
    }

    let mut matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    matches.sort();
    matches.dedup();

    match matches.len() {
        0 => Err(anyhow!(
            "No {} found with ID starting with '{}'",
            kind,
            prefix
        )),
        1 => Ok(matches[0]),
        _ => {
            let ids: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                prefix,
                kind,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let a = id("1a2b3c4d-0000-4000-8000-000000000001");
        let b = id("9f000000-0000-4000-8000-000000000002");

        assert_eq!(resolve_prefix("job", "1A2B", [a, b]).unwrap(), a);
        assert_eq!(resolve_prefix("job", "9f", [a, b]).unwrap(), b);
    }

    #[test]
    fn test_ambiguous_and_missing_prefix() {
        let a = id("1a2b3c4d-0000-4000-8000-000000000001");
        let b = id("1a2b0000-0000-4000-8000-000000000002");

        let err = resolve_prefix("definition", "1a2b", [a, b]).unwrap_err();
        assert!(err.to_string().starts_with("Ambiguous prefix '1a2b'"));

        let err = resolve_prefix("definition", "ff", [a, b]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No definition found with ID starting with 'ff'"
        );

        assert!(resolve_prefix("job", "  ", [a]).is_err());
    }

    #[test]
    fn test_duplicates_across_sources_are_not_ambiguous() {
        let a = id("1a2b3c4d-0000-4000-8000-000000000001");
        assert_eq!(resolve_prefix("job", "1a", [a, a]).unwrap(), a);
    }
}
