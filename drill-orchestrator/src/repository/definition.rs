//! Test Definition Repository
//!
//! Handles all database operations related to test definitions.

use drill_core::domain::definition::TestDefinition;
use drill_core::dto::definition::CreateDefinition;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new test definition in the database
pub async fn create(pool: &PgPool, req: CreateDefinition) -> Result<TestDefinition, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    let definition = TestDefinition {
        id,
        name: req.name,
        workspace_id: req.workspace_id,
        source_database_id: req.source_database_id,
        source_database_name: req.source_database_name,
        pre_restore_script: req.pre_restore_script,
        post_restore_script: req.post_restore_script,
        storage_ids: req.storage_ids,
        notification_ids: req.notification_ids,
        last_processed_backup_id: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO test_definitions (
            id, name, workspace_id, source_database_id, source_database_name,
            pre_restore_script, post_restore_script, storage_ids, notification_ids,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(definition.id)
    .bind(&definition.name)
    .bind(&definition.workspace_id)
    .bind(&definition.source_database_id)
    .bind(&definition.source_database_name)
    .bind(&definition.pre_restore_script)
    .bind(&definition.post_restore_script)
    .bind(&definition.storage_ids)
    .bind(&definition.notification_ids)
    .bind(definition.created_at)
    .bind(definition.updated_at)
    .execute(pool)
    .await?;

    Ok(definition)
}

/// Find a test definition by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<TestDefinition>, sqlx::Error> {
    let row = sqlx::query_as::<_, DefinitionRow>(
        r#"
        SELECT id, name, workspace_id, source_database_id, source_database_name,
               pre_restore_script, post_restore_script, storage_ids, notification_ids,
               last_processed_backup_id, created_at, updated_at
        FROM test_definitions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all test definitions
pub async fn list_all(pool: &PgPool) -> Result<Vec<TestDefinition>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DefinitionRow>(
        r#"
        SELECT id, name, workspace_id, source_database_id, source_database_name,
               pre_restore_script, post_restore_script, storage_ids, notification_ids,
               last_processed_backup_id, created_at, updated_at
        FROM test_definitions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Replace the editable fields of a test definition
///
/// Returns `None` when the definition does not exist. Identity, creation time
/// and the last processed backup are kept.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: CreateDefinition,
) -> Result<Option<TestDefinition>, sqlx::Error> {
    let row = sqlx::query_as::<_, DefinitionRow>(
        r#"
        UPDATE test_definitions
        SET name = $1, workspace_id = $2, source_database_id = $3, source_database_name = $4,
            pre_restore_script = $5, post_restore_script = $6, storage_ids = $7,
            notification_ids = $8, updated_at = $9
        WHERE id = $10
        RETURNING id, name, workspace_id, source_database_id, source_database_name,
                  pre_restore_script, post_restore_script, storage_ids, notification_ids,
                  last_processed_backup_id, created_at, updated_at
        "#,
    )
    .bind(&req.name)
    .bind(&req.workspace_id)
    .bind(&req.source_database_id)
    .bind(&req.source_database_name)
    .bind(&req.pre_restore_script)
    .bind(&req.post_restore_script)
    .bind(&req.storage_ids)
    .bind(&req.notification_ids)
    .bind(chrono::Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Record the backup most recently verified for a definition
///
/// Returns `false` when the definition no longer exists.
pub async fn update_last_backup(
    pool: &PgPool,
    id: Uuid,
    backup_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE test_definitions
        SET last_processed_backup_id = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(backup_id)
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a test definition by ID
///
/// Jobs referencing it keep their row with the reference cleared.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM test_definitions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct DefinitionRow {
    id: Uuid,
    name: String,
    workspace_id: String,
    source_database_id: String,
    source_database_name: String,
    pre_restore_script: Option<String>,
    post_restore_script: Option<String>,
    storage_ids: Vec<Uuid>,
    notification_ids: Vec<Uuid>,
    last_processed_backup_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<DefinitionRow> for TestDefinition {
    fn from(row: DefinitionRow) -> Self {
        TestDefinition {
            id: row.id,
            name: row.name,
            workspace_id: row.workspace_id,
            source_database_id: row.source_database_id,
            source_database_name: row.source_database_name,
            pre_restore_script: row.pre_restore_script,
            post_restore_script: row.post_restore_script,
            storage_ids: row.storage_ids,
            notification_ids: row.notification_ids,
            last_processed_backup_id: row.last_processed_backup_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
