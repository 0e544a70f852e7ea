use std::sync::Arc;

use anyhow::{Context, Result};
use checks_core::{init_tracing, Checkers, ChecksConfig, RefMigration};
use checks_state::{RefStore, SurrealRefStore};
use tracing::{info, Level};

/// What a startup pass found.
#[derive(Debug, PartialEq, Eq)]
struct Startup {
    migrated: bool,
    checkers: usize,
}

/// Finish any pending ref migration, then load every checker once so broken
/// configs show up in the log at startup.
async fn startup(store: Arc<dyn RefStore>, config: &ChecksConfig) -> Result<Startup> {
    let migrated = RefMigration::new(Arc::clone(&store))
        .migrate()
        .await
        .context("checker ref migration failed")?;
    let checkers = Checkers::new(store, config)
        .list()
        .await
        .context("listing checkers failed")?;
    Ok(Startup {
        migrated,
        checkers: checkers.len(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ChecksConfig::from_env().context("invalid checks configuration")?;
    init_tracing(config.log_json, Level::INFO);

    let store: Arc<dyn RefStore> = Arc::new(
        SurrealRefStore::from_env()
            .await
            .context("cannot open ref store")?,
    );
    let summary = startup(store, &config).await?;
    info!(
        migrated = summary.migrated,
        checkers = summary.checkers,
        "checksd started"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checks_core::CheckerCreation;
    use checks_state::fakes::MemoryRefStore;

    #[tokio::test]
    async fn startup_on_empty_store() {
        let store = Arc::new(MemoryRefStore::new());
        let summary = startup(store, &ChecksConfig::default()).await.unwrap();
        assert_eq!(
            summary,
            Startup {
                migrated: false,
                checkers: 0
            }
        );
    }

    #[tokio::test]
    async fn startup_counts_checkers() {
        let store = Arc::new(MemoryRefStore::new());
        let config = ChecksConfig::default();
        let checkers = Checkers::new(store.clone(), &config);
        checkers
            .create("ci:build", CheckerCreation::new("repo"))
            .await
            .unwrap();
        checkers
            .create("ci:lint", CheckerCreation::new("repo"))
            .await
            .unwrap();

        let summary = startup(store, &config).await.unwrap();
        assert_eq!(summary.checkers, 2);
        assert!(!summary.migrated);
    }
}
