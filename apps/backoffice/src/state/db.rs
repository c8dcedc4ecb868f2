//! # Database State
//!
//! Wraps the tenant-scoped `Database` and the settings store built on it.
//! The `SqlitePool` inside is shared and thread-safe, so commands can run
//! concurrently without extra locking.

use tracing::info;

use crate::state::AppConfig;
use ipe_db::{Database, DbConfig, DbResult, LayeredSettings, LocalSettings};

#[derive(Debug)]
pub struct DbState {
    db: Database,
    settings: LayeredSettings,
}

impl DbState {
    pub fn new(db: Database, local: LocalSettings) -> Self {
        let settings = LayeredSettings::new(db.remote_settings(), local, db.tenant_id());
        DbState { db, settings }
    }

    /// Opens the configured database (running migrations) for the
    /// configured tenant.
    pub async fn open(config: &AppConfig) -> DbResult<Self> {
        if let Some(dir) = config.database_path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        let db = Database::new(
            DbConfig::new(&config.database_path).tenant(config.tenant_id.clone()),
        )
        .await?;

        info!(
            path = %config.database_path.display(),
            tenant_id = %config.tenant_id,
            "Database ready"
        );
        Ok(DbState::new(db, LocalSettings::new(&config.settings_dir)))
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &LayeredSettings {
        &self.settings
    }
}
