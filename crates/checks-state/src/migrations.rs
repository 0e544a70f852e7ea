//! SurrealDB schema migrations and initialization
//!
//! Sets up the `objects` and `refs` tables with the unique indexes the
//! compare-and-swap protocol relies on.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// Initialize all ref store tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing checks ref store schema");

    init_objects_table(db).await?;
    init_refs_table(db).await?;

    info!("Checks ref store schema initialization complete");
    Ok(())
}

/// Initialize `objects` table
///
/// Schema:
/// ```text
/// TABLE objects {
///   object_id:   STRING (unique, SHA-256 hex of the bytes)
///   data:        STRING (hex encoded bytes)
///   size_bytes:  INT
///   created_at:  DATETIME
/// }
/// ```
///
/// Objects are immutable: updates and deletes are not permitted.
async fn init_objects_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing objects table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS objects AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_object_id ON TABLE objects COLUMNS object_id UNIQUE;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    debug!("objects table initialized");
    Ok(())
}

/// Initialize `refs` table
///
/// Schema:
/// ```text
/// TABLE refs {
///   name:        STRING (unique)
///   target:      STRING (object id)
///   updated_at:  DATETIME
/// }
/// ```
///
/// Constraints:
/// - `name` is unique, so two racing creations of the same ref cannot both win
/// - moves are conditional updates on `target` (enforced by the store)
async fn init_refs_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing refs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS refs AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_ref_name ON TABLE refs COLUMNS name UNIQUE;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    debug!("refs table initialized");
    Ok(())
}
