//! Postgres-backed job queue tests
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p drill-orchestrator -- --ignored`.
//! Every test works inside its own schema so runs do not see each other's jobs.

use std::str::FromStr;

use drill_core::domain::job::{JobOutcome, JobStatus};
use drill_core::domain::target::{NotificationKind, StorageKind, TargetConfig};
use drill_core::dto::definition::CreateDefinition;
use drill_core::dto::target::{CreateNotificationTarget, CreateStorageTarget};
use drill_orchestrator::db;
use drill_orchestrator::service::job_service::{self, JobError};
use drill_orchestrator::service::registry_service::{self, RegistryError};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

async fn isolated_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let schema = format!("drill_test_{}", Uuid::new_v4().simple());

    let admin = PgPool::connect(&url).await.unwrap();
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&admin)
        .await
        .unwrap();
    admin.close().await;

    let options = PgConnectOptions::from_str(&url)
        .unwrap()
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .unwrap();

    db::run_migrations(&pool).await.unwrap();
    pool
}

fn definition_request(name: &str) -> CreateDefinition {
    CreateDefinition {
        name: name.to_string(),
        workspace_id: "ws-1".into(),
        source_database_id: "db-1".into(),
        source_database_name: "orders".into(),
        pre_restore_script: None,
        post_restore_script: None,
        storage_ids: vec![],
        notification_ids: vec![],
    }
}

async fn definition(pool: &PgPool, name: &str) -> Uuid {
    registry_service::create_definition(pool, definition_request(name))
        .await
        .unwrap()
        .id
}

fn outcome(status: JobStatus, backup: &str) -> JobOutcome {
    JobOutcome::finish(
        Some(chrono::Utc::now()),
        status,
        "[00:00:00] done".into(),
        Some(backup.to_string()),
    )
}

#[tokio::test]
#[ignore]
async fn test_enqueue_creates_pending_job_with_name_snapshot() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "orders nightly").await;

    let job = job_service::enqueue(&pool, def).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.definition_name, "orders nightly");

    let active = job_service::active_jobs(&pool).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, job.id);
}

#[tokio::test]
#[ignore]
async fn test_enqueue_unknown_definition_is_rejected() {
    let pool = isolated_pool().await;

    let result = job_service::enqueue(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(JobError::DefinitionNotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_enqueue_rejected_while_active() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "dup").await;

    job_service::enqueue(&pool, def).await.unwrap();
    assert!(matches!(
        job_service::enqueue(&pool, def).await,
        Err(JobError::Duplicate(_))
    ));

    let claimed = job_service::claim_next(&pool).await.unwrap().unwrap();
    assert!(matches!(
        job_service::enqueue(&pool, def).await,
        Err(JobError::Duplicate(_))
    ));
    assert_eq!(job_service::active_jobs(&pool).await.unwrap().len(), 1);

    job_service::record_outcome(&pool, claimed.job.id, outcome(JobStatus::Failed, "b-1"))
        .await
        .unwrap();
    let next = job_service::enqueue(&pool, def).await.unwrap();
    assert_ne!(next.id, claimed.job.id);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_enqueues_admit_one_job() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "race").await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { job_service::enqueue(&pool, def).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(JobError::Duplicate(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_claimants_take_job_once() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "claim").await;
    let job = job_service::enqueue(&pool, def).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { job_service::claim_next(&pool).await.unwrap() })
        })
        .collect();

    let mut claims = Vec::new();
    for handle in handles {
        if let Some(claimed) = handle.await.unwrap() {
            claims.push(claimed);
        }
    }

    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].job.id, job.id);
    assert_eq!(claims[0].job.status, JobStatus::Running);
    assert!(claims[0].job.started_at.is_some());
    assert_eq!(claims[0].definition.as_ref().unwrap().id, def);
}

#[tokio::test]
#[ignore]
async fn test_claim_on_empty_queue_returns_none() {
    let pool = isolated_pool().await;
    assert!(job_service::claim_next(&pool).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_outcome_recorded_once_and_propagates_backup() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "outcome").await;
    job_service::enqueue(&pool, def).await.unwrap();
    let claimed = job_service::claim_next(&pool).await.unwrap().unwrap();

    let receipt =
        job_service::record_outcome(&pool, claimed.job.id, outcome(JobStatus::Success, "b-42"))
            .await
            .unwrap();
    assert!(receipt.definition_updated);

    let stored = job_service::get_job(&pool, claimed.job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Success);
    assert_eq!(stored.log_output, "[00:00:00] done");
    assert!(stored.finished_at.is_some());

    let definition = registry_service::get_definition(&pool, def).await.unwrap();
    assert_eq!(definition.last_processed_backup_id.as_deref(), Some("b-42"));

    let second =
        job_service::record_outcome(&pool, claimed.job.id, outcome(JobStatus::Failed, "b-43"))
            .await;
    assert!(matches!(second, Err(JobError::InvalidState(_))));
    let stored = job_service::get_job(&pool, claimed.job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Success);
}

#[tokio::test]
#[ignore]
async fn test_repeated_outcome_is_acknowledged() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "replayed").await;
    job_service::enqueue(&pool, def).await.unwrap();
    let claimed = job_service::claim_next(&pool).await.unwrap().unwrap();

    let first = outcome(JobStatus::Success, "b-7");
    job_service::record_outcome(&pool, claimed.job.id, first.clone())
        .await
        .unwrap();
    let receipt = job_service::record_outcome(&pool, claimed.job.id, first)
        .await
        .unwrap();
    assert!(receipt.definition_updated);

    let stored = job_service::get_job(&pool, claimed.job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Success);
    assert_eq!(stored.last_processed_backup_id.as_deref(), Some("b-7"));
}

#[tokio::test]
#[ignore]
async fn test_stale_running_job_is_failed_and_unblocks_enqueue() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "abandoned").await;
    job_service::enqueue(&pool, def).await.unwrap();
    let claimed = job_service::claim_next(&pool).await.unwrap().unwrap();

    // Nothing is old enough yet
    assert_eq!(job_service::expire_stale_jobs(&pool, 3600).await.unwrap(), 0);
    assert!(matches!(
        job_service::enqueue(&pool, def).await,
        Err(JobError::Duplicate(_))
    ));

    sqlx::query("UPDATE jobs SET started_at = NOW() - INTERVAL '2 hours' WHERE id = $1")
        .bind(claimed.job.id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(job_service::expire_stale_jobs(&pool, 3600).await.unwrap(), 1);

    let stored = job_service::get_job(&pool, claimed.job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.finished_at.is_some());
    assert!(stored.duration_seconds >= 7200);
    assert!(stored.log_output.contains("No outcome reported within 3600s"));

    let late = job_service::record_outcome(&pool, claimed.job.id, outcome(JobStatus::Success, "b-1"))
        .await;
    assert!(matches!(late, Err(JobError::InvalidState(_))));

    let next = job_service::enqueue(&pool, def).await.unwrap();
    assert_eq!(next.status, JobStatus::Pending);
}

#[tokio::test]
#[ignore]
async fn test_failed_outcome_leaves_definition_untouched() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "failed").await;
    job_service::enqueue(&pool, def).await.unwrap();
    let claimed = job_service::claim_next(&pool).await.unwrap().unwrap();

    let receipt =
        job_service::record_outcome(&pool, claimed.job.id, outcome(JobStatus::Failed, "b-1"))
            .await
            .unwrap();
    assert!(!receipt.definition_updated);

    let definition = registry_service::get_definition(&pool, def).await.unwrap();
    assert!(definition.last_processed_backup_id.is_none());
}

#[tokio::test]
#[ignore]
async fn test_deleted_definition_keeps_job_snapshot() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "short lived").await;
    let job = job_service::enqueue(&pool, def).await.unwrap();

    registry_service::delete_definition(&pool, def).await.unwrap();

    let claimed = job_service::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.job.id, job.id);
    assert!(claimed.job.definition_id.is_none());
    assert_eq!(claimed.job.definition_name, "short lived");
    assert!(claimed.definition.is_none());

    let receipt =
        job_service::record_outcome(&pool, job.id, outcome(JobStatus::Success, "b-1"))
            .await
            .unwrap();
    assert!(!receipt.definition_updated);
}

#[tokio::test]
#[ignore]
async fn test_claims_follow_creation_order_and_history_is_newest_first() {
    let pool = isolated_pool().await;
    let first = job_service::enqueue(&pool, definition(&pool, "a").await)
        .await
        .unwrap();
    let second = job_service::enqueue(&pool, definition(&pool, "b").await)
        .await
        .unwrap();

    let active = job_service::active_jobs(&pool).await.unwrap();
    assert_eq!(active[0].id, second.id);
    assert_eq!(active[1].id, first.id);

    let claimed_first = job_service::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed_first.job.id, first.id);
    let claimed_second = job_service::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed_second.job.id, second.id);

    job_service::record_outcome(&pool, first.id, outcome(JobStatus::Success, "b-1"))
        .await
        .unwrap();
    job_service::record_outcome(&pool, second.id, outcome(JobStatus::Failed, "b-2"))
        .await
        .unwrap();

    let history = job_service::job_history(&pool, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);

    let limited = job_service::job_history(&pool, Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert!(job_service::active_jobs(&pool).await.unwrap().is_empty());
}

// =============================================================================
// Registry updates
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_definition_update_keeps_identity_and_history() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "orders nighlty").await;
    let job = job_service::enqueue(&pool, def).await.unwrap();
    job_service::claim_next(&pool).await.unwrap();
    job_service::record_outcome(&pool, job.id, outcome(JobStatus::Success, "b-9"))
        .await
        .unwrap();
    let before = registry_service::get_definition(&pool, def).await.unwrap();

    let mut req = definition_request("orders nightly");
    req.post_restore_script = Some("SELECT count(*) FROM orders".into());
    let updated = registry_service::update_definition(&pool, def, req)
        .await
        .unwrap();

    assert_eq!(updated.id, def);
    assert_eq!(updated.name, "orders nightly");
    assert_eq!(updated.created_at, before.created_at);
    assert_eq!(updated.last_processed_backup_id.as_deref(), Some("b-9"));
    assert!(updated.updated_at >= before.updated_at);

    let history = job_service::job_history(&pool, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].definition_id, Some(def));
}

#[tokio::test]
#[ignore]
async fn test_definition_update_checks_existence_and_references() {
    let pool = isolated_pool().await;
    let def = definition(&pool, "refs").await;

    let missing = registry_service::update_definition(&pool, Uuid::new_v4(), definition_request("x")).await;
    assert!(matches!(missing, Err(RegistryError::NotFound(_))));

    let mut req = definition_request("refs");
    req.storage_ids = vec![Uuid::new_v4()];
    let dangling = registry_service::update_definition(&pool, def, req).await;
    assert!(matches!(dangling, Err(RegistryError::ValidationError(_))));

    let blank = registry_service::update_definition(&pool, def, definition_request(" ")).await;
    assert!(matches!(blank, Err(RegistryError::ValidationError(_))));
}

#[tokio::test]
#[ignore]
async fn test_target_updates_replace_name_kind_and_config() {
    let pool = isolated_pool().await;
    let config = |value: serde_json::Value| serde_json::from_value::<TargetConfig>(value).unwrap();

    let storage = registry_service::create_storage(
        &pool,
        CreateStorageTarget {
            name: "nas".into(),
            kind: StorageKind::Nas,
            config: config(serde_json::json!({"path": "/mnt/old"})),
        },
    )
    .await
    .unwrap();
    let updated = registry_service::update_storage(
        &pool,
        storage.id,
        CreateStorageTarget {
            name: "offsite".into(),
            kind: StorageKind::Sftp,
            config: config(serde_json::json!({"host": "backup.example.com", "user": "drill"})),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.id, storage.id);
    assert_eq!(updated.kind, StorageKind::Sftp);
    assert_eq!(updated.config.get_str("host"), Some("backup.example.com"));

    let notification = registry_service::create_notification(
        &pool,
        CreateNotificationTarget {
            name: "ops".into(),
            kind: NotificationKind::Telegram,
            config: config(serde_json::json!({"bot_token": "t", "chat_id": 1})),
        },
    )
    .await
    .unwrap();
    let renamed = registry_service::update_notification(
        &pool,
        notification.id,
        CreateNotificationTarget {
            name: "ops-email".into(),
            kind: NotificationKind::Email,
            config: config(serde_json::json!({"host": "smtp.example.com"})),
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "ops-email");
    assert_eq!(renamed.kind, NotificationKind::Email);

    let unknown = registry_service::update_storage(
        &pool,
        Uuid::new_v4(),
        CreateStorageTarget {
            name: "x".into(),
            kind: StorageKind::Nas,
            config: TargetConfig::default(),
        },
    )
    .await;
    assert!(matches!(unknown, Err(RegistryError::NotFound(_))));
}
