//! SurrealDB-backed RefStore implementation
//!
//! Uses `schema::ObjectRecord` and `schema::RefRecord` for persistence,
//! converting to/from `storage_traits` types at the boundary. Ref moves are
//! single conditional statements, so each compare-and-swap is atomic inside
//! the database.

use std::path::Path;

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::connection;
use crate::error::StorageError;
use crate::migrations;
use crate::schema::{ObjectRecord, RefRecord};
use crate::storage_traits::{
    describe_target, validate_ref_name, ObjectId, RefStore, StorageResult,
};

/// SurrealDB-backed implementation of [`RefStore`].
#[derive(Clone)]
pub struct SurrealRefStore {
    db: Surreal<Any>,
}

impl SurrealRefStore {
    /// Wrap an existing connection and make sure the schema exists.
    pub async fn new(db: Surreal<Any>) -> StorageResult<Self> {
        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> StorageResult<Self> {
        let db = connection::connect("mem://").await?;
        info!("SurrealRefStore connected (in-memory)");
        Self::new(db).await
    }

    /// Open (or create) a SurrealKV database under `path`.
    pub async fn open_local(path: impl AsRef<Path>) -> StorageResult<Self> {
        let url = format!("surrealkv://{}", path.as_ref().display());
        let db = connection::connect(&url).await?;
        info!("SurrealRefStore connected ({})", url);
        Self::new(db).await
    }

    /// Create from environment variables.
    ///
    /// See [`connection::connect_from_env`] for how the location is chosen.
    pub async fn from_env() -> StorageResult<Self> {
        let db = connection::connect_from_env().await?;
        Self::new(db).await
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Surreal<Any> {
        &self.db
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_object(&self, oid: &str) -> StorageResult<Option<ObjectRecord>> {
        let oid_owned = oid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM objects WHERE object_id = $oid")
            .bind(("oid", oid_owned))
            .await?;
        let rows: Vec<ObjectRecord> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_ref(&self, name: &str) -> StorageResult<Option<RefRecord>> {
        let name_owned = name.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM refs WHERE name = $name")
            .bind(("name", name_owned))
            .await?;
        let rows: Vec<RefRecord> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    fn row_target(row: RefRecord) -> StorageResult<ObjectId> {
        ObjectId::try_from(row.target)
    }

    async fn lock_failure(&self, name: &str, expected: Option<&ObjectId>) -> StorageError {
        let actual = match self.fetch_ref(name).await {
            Ok(Some(row)) => row.target,
            Ok(None) => describe_target(None),
            Err(e) => format!("<unreadable: {e}>"),
        };
        StorageError::LockFailure {
            ref_name: name.to_string(),
            expected: describe_target(expected),
            actual,
        }
    }

    async fn create_ref(&self, name: &str, new: &ObjectId) -> StorageResult<()> {
        let row = RefRecord::new(name.to_string(), new.as_str().to_string());
        let created: Result<Option<RefRecord>, surrealdb::Error> =
            self.db.create("refs").content(row).await;
        if let Ok(Some(_)) = created {
            return Ok(());
        }
        // The unique index on `name` rejects a concurrent or prior creation.
        if self.fetch_ref(name).await?.is_some() {
            return Err(self.lock_failure(name, None).await);
        }
        match created {
            Err(e) => Err(e.into()),
            _ => Err(StorageError::Backend(format!("failed to create ref {name}"))),
        }
    }

    async fn move_ref(&self, name: &str, expected: &ObjectId, new: &ObjectId) -> StorageResult<()> {
        let mut res = self
            .db
            .query(
                "UPDATE refs SET target = $new, updated_at = time::now() \
                 WHERE name = $name AND target = $old RETURN AFTER",
            )
            .bind(("name", name.to_string()))
            .bind(("old", expected.as_str().to_string()))
            .bind(("new", new.as_str().to_string()))
            .await?;
        let rows: Vec<RefRecord> = res.take(0)?;
        if rows.is_empty() {
            return Err(self.lock_failure(name, Some(expected)).await);
        }
        Ok(())
    }

    async fn delete_ref(&self, name: &str, expected: &ObjectId) -> StorageResult<()> {
        let mut res = self
            .db
            .query("DELETE refs WHERE name = $name AND target = $old RETURN BEFORE")
            .bind(("name", name.to_string()))
            .bind(("old", expected.as_str().to_string()))
            .await?;
        let rows: Vec<RefRecord> = res.take(0)?;
        if rows.is_empty() {
            return Err(self.lock_failure(name, Some(expected)).await);
        }
        Ok(())
    }
}

#[async_trait]
impl RefStore for SurrealRefStore {
    async fn put_object(&self, data: &[u8]) -> StorageResult<ObjectId> {
        let id = ObjectId::for_bytes(data);
        if self.fetch_object(id.as_str()).await?.is_some() {
            return Ok(id);
        }

        let row = ObjectRecord::new(id.as_str().to_string(), data);
        let created: Result<Option<ObjectRecord>, surrealdb::Error> =
            self.db.create("objects").content(row).await;
        if let Err(e) = created {
            // Lost a race against an identical write: same bytes, same id.
            if self.fetch_object(id.as_str()).await?.is_none() {
                return Err(e.into());
            }
        }
        debug!(object_id = %id.short(), size = data.len(), "stored object");
        Ok(id)
    }

    async fn get_object(&self, id: &ObjectId) -> StorageResult<Vec<u8>> {
        let row = self
            .fetch_object(id.as_str())
            .await?
            .ok_or_else(|| StorageError::ObjectNotFound {
                id: id.as_str().to_string(),
            })?;
        row.bytes()
            .map_err(|e| StorageError::Serialization(format!("object {}: {}", id.short(), e)))
    }

    async fn contains_object(&self, id: &ObjectId) -> StorageResult<bool> {
        Ok(self.fetch_object(id.as_str()).await?.is_some())
    }

    async fn read_ref(&self, name: &str) -> StorageResult<Option<ObjectId>> {
        validate_ref_name(name)?;
        self.fetch_ref(name)
            .await?
            .map(Self::row_target)
            .transpose()
    }

    #[instrument(skip(self, expected, new), fields(ref_name = %name))]
    async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&ObjectId>,
        new: Option<&ObjectId>,
    ) -> StorageResult<()> {
        validate_ref_name(name)?;
        if let Some(target) = new {
            if !self.contains_object(target).await? {
                return Err(StorageError::ObjectNotFound {
                    id: target.as_str().to_string(),
                });
            }
        }

        match (expected, new) {
            (None, Some(new)) => self.create_ref(name, new).await?,
            (Some(old), Some(new)) => self.move_ref(name, old, new).await?,
            (Some(old), None) => self.delete_ref(name, old).await?,
            (None, None) => {
                if self.fetch_ref(name).await?.is_some() {
                    return Err(self.lock_failure(name, None).await);
                }
            }
        }
        debug!(
            expected = %describe_target(expected),
            new = %describe_target(new),
            "ref updated"
        );
        Ok(())
    }

    async fn list_refs(&self, prefix: &str) -> StorageResult<Vec<(String, ObjectId)>> {
        let prefix_owned = prefix.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM refs WHERE string::starts_with(name, $prefix) ORDER BY name ASC")
            .bind(("prefix", prefix_owned))
            .await?;
        let rows: Vec<RefRecord> = res.take(0)?;
        rows.into_iter()
            .map(|row| {
                let name = row.name.clone();
                Self::row_target(row).map(|id| (name, id))
            })
            .collect()
    }
}
