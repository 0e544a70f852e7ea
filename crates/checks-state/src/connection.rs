//! SurrealDB connection settings
//!
//! The ref store lives at `SURREALDB_URL` when set (any engine the `any`
//! connector accepts, `ws://` and `wss://` included), otherwise in local
//! SurrealKV files under [`DEFAULT_LOCAL_PATH`].

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::info;

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// Namespace holding checks data
pub const DEFAULT_NAMESPACE: &str = "checks";
/// Database holding checks data
pub const DEFAULT_DATABASE: &str = "main";
/// Local persistence directory used when `SURREALDB_URL` is unset
pub const DEFAULT_LOCAL_PATH: &str = ".checks/db";

/// Environment variable naming the ref store endpoint.
pub const URL_ENV: &str = "SURREALDB_URL";

/// Where the ref store lives, and whether it is the local default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreLocation {
    Url(String),
    Local(&'static str),
}

impl StoreLocation {
    /// An explicit, non-blank URL wins over local persistence.
    pub(crate) fn resolve(url: Option<String>) -> Self {
        match url.map(|u| u.trim().to_string()) {
            Some(url) if !url.is_empty() => Self::Url(url),
            _ => Self::Local(DEFAULT_LOCAL_PATH),
        }
    }

    fn url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Local(path) => format!("surrealkv://{path}"),
        }
    }
}

/// Connect to `url` and select the default namespace/database.
pub async fn connect(url: &str) -> StorageResult<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StorageError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

    db.use_ns(DEFAULT_NAMESPACE)
        .use_db(DEFAULT_DATABASE)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    Ok(db)
}

/// Connect to `SURREALDB_URL`, or to local persistence when it is unset.
pub async fn connect_from_env() -> StorageResult<Surreal<Any>> {
    let location = StoreLocation::resolve(std::env::var(URL_ENV).ok());
    if let StoreLocation::Local(path) = &location {
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Connection(format!(
                "Failed to create database directory {}: {}",
                path, e
            ))
        })?;
    }
    let url = location.url();
    let db = connect(&url).await?;
    info!(url = %url, "ref store connected");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_wins() {
        let location = StoreLocation::resolve(Some(" ws://db.internal:8000 ".to_string()));
        assert_eq!(location, StoreLocation::Url("ws://db.internal:8000".to_string()));
        assert_eq!(location.url(), "ws://db.internal:8000");
    }

    #[test]
    fn missing_or_blank_url_uses_local_files() {
        for url in [None, Some(String::new()), Some("   ".to_string())] {
            let location = StoreLocation::resolve(url);
            assert_eq!(location, StoreLocation::Local(DEFAULT_LOCAL_PATH));
            assert_eq!(location.url(), "surrealkv://.checks/db");
        }
    }
}
