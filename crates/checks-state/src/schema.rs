//! Schema definitions for the checks SurrealDB tables
//!
//! Tables:
//! - objects: content-addressed immutable objects (blobs and commits)
//! - refs: named pointers to objects, moved by compare-and-swap

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Object record - one immutable object keyed by its content id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// SHA-256 hex of the object bytes
    pub object_id: String,
    /// Object bytes, hex encoded
    pub data: String,
    /// Size of the decoded bytes
    pub size_bytes: u64,
    /// When the object was first stored
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ObjectRecord {
    pub fn new(object_id: String, bytes: &[u8]) -> Self {
        ObjectRecord {
            id: None,
            object_id,
            data: hex::encode(bytes),
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
        }
    }

    /// Decode the stored bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.data)
    }
}

/// Ref record - a named pointer to an object id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefRecord {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Full ref name (e.g. "refs/meta/checkers")
    pub name: String,
    /// Object id the ref points at
    pub target: String,
    /// Last time the ref moved
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl RefRecord {
    pub fn new(name: String, target: String) -> Self {
        RefRecord {
            id: None,
            name,
            target,
            updated_at: Utc::now(),
        }
    }
}
