//! # Settings Storage
//!
//! Settings documents live in two places: the `tenant_settings` table
//! ([`RemoteSettings`]) and a directory of JSON files ([`LocalSettings`]).
//! [`LayeredSettings`] fixes the precedence between them.
//!
//! ## Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load::<D>(tenant)                                                      │
//! │    remote ── Some(doc) ─────────────────────────────────► doc           │
//! │       │                                                                 │
//! │       ├── None / NotProvisioned ──► local ── Some(doc) ──► doc          │
//! │       │                                 └── None ───────► D::default()  │
//! │       └── any other error ──────────────────────────────► Err           │
//! │                                                                         │
//! │  save::<D>(tenant, doc)                                                 │
//! │    validate ──► local (must succeed) ──► remote (mirror)                │
//! │                                            ├── ok ─────────► Synced     │
//! │                                            ├── NotProvisioned ► LocalOnly│
//! │                                            └── other ──────► Err        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod local;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::settings::RemoteSettings;
use ipe_core::settings::SettingsDocument;

pub use local::LocalSettings;

/// A store of settings documents keyed by tenant and [`SettingsDocument::KEY`].
#[allow(async_fn_in_trait)]
pub trait SettingsBackend {
    async fn load<D: SettingsDocument>(&self, tenant_id: &str) -> DbResult<Option<D>>;

    async fn save<D: SettingsDocument>(&self, tenant_id: &str, document: &D) -> DbResult<()>;
}

/// Where a saved document ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum SaveOutcome {
    /// Written locally and mirrored to the remote table.
    Synced,
    /// Written locally only; the remote table is not provisioned.
    LocalOnly { reason: String },
}

#[derive(Debug, Clone)]
pub struct LayeredSettings {
    remote: RemoteSettings,
    local: LocalSettings,
    tenant_id: String,
}

impl LayeredSettings {
    pub fn new(remote: RemoteSettings, local: LocalSettings, tenant_id: &str) -> Self {
        LayeredSettings {
            remote,
            local,
            tenant_id: tenant_id.to_string(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Loads a document, falling back to `D::default()` when neither store
    /// has one.
    pub async fn load<D: SettingsDocument>(&self) -> DbResult<D> {
        Ok(self.load_stored::<D>().await?.unwrap_or_default())
    }

    /// Loads a document only if one was saved somewhere.
    pub async fn load_stored<D: SettingsDocument>(&self) -> DbResult<Option<D>> {
        match self.remote.load::<D>(&self.tenant_id).await {
            Ok(Some(document)) => return Ok(Some(document)),
            Ok(None) => {
                debug!(key = D::KEY, "No remote settings, reading local");
            }
            Err(DbError::NotProvisioned(reason)) => {
                debug!(key = D::KEY, reason = %reason, "Remote settings not provisioned, reading local");
            }
            Err(e) => return Err(e),
        }

        self.local.load::<D>(&self.tenant_id).await
    }

    pub async fn save<D: SettingsDocument>(&self, document: &D) -> DbResult<SaveOutcome> {
        document.validate()?;

        self.local.save(&self.tenant_id, document).await?;

        match self.remote.save(&self.tenant_id, document).await {
            Ok(()) => Ok(SaveOutcome::Synced),
            Err(DbError::NotProvisioned(reason)) => {
                warn!(key = D::KEY, reason = %reason, "Settings saved locally only");
                Ok(SaveOutcome::LocalOnly { reason })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use ipe_core::settings::{FiscalConfig, WhatsAppTemplates};
    use ipe_core::DEFAULT_TENANT_ID;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ipe-settings-{}", uuid::Uuid::new_v4()))
    }

    async fn layered(dir: &PathBuf) -> (Database, LayeredSettings) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = LayeredSettings::new(
            db.remote_settings(),
            LocalSettings::new(dir.clone()),
            DEFAULT_TENANT_ID,
        );
        (db, settings)
    }

    #[tokio::test]
    async fn test_missing_document_loads_default() {
        let dir = scratch_dir();
        let (_db, settings) = layered(&dir).await;

        let templates: WhatsAppTemplates = settings.load().await.unwrap();
        assert_eq!(templates.templates.len(), 3);
    }

    #[tokio::test]
    async fn test_save_mirrors_to_remote() {
        let dir = scratch_dir();
        let (db, settings) = layered(&dir).await;

        let mut templates = WhatsAppTemplates::default();
        templates.bot_url = Some("https://bot.ipe.example/send".to_string());
        let outcome = settings.save(&templates).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Synced);

        let remote: Option<WhatsAppTemplates> =
            db.remote_settings().load(DEFAULT_TENANT_ID).await.unwrap();
        assert_eq!(remote.unwrap().bot_url.as_deref(), Some("https://bot.ipe.example/send"));

        let local: Option<WhatsAppTemplates> = LocalSettings::new(dir.clone())
            .load(DEFAULT_TENANT_ID)
            .await
            .unwrap();
        assert!(local.is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_remote_preferred_over_local() {
        let dir = scratch_dir();
        let (db, settings) = layered(&dir).await;

        let mut local_doc = WhatsAppTemplates::default();
        local_doc.bot_url = Some("https://local.example".to_string());
        LocalSettings::new(dir.clone())
            .save(DEFAULT_TENANT_ID, &local_doc)
            .await
            .unwrap();

        let mut remote_doc = WhatsAppTemplates::default();
        remote_doc.bot_url = Some("https://remote.example".to_string());
        db.remote_settings()
            .save(DEFAULT_TENANT_ID, &remote_doc)
            .await
            .unwrap();

        let loaded: WhatsAppTemplates = settings.load().await.unwrap();
        assert_eq!(loaded.bot_url.as_deref(), Some("https://remote.example"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unprovisioned_remote_falls_back_to_local() {
        let dir = scratch_dir();
        let (db, settings) = layered(&dir).await;
        sqlx::query("DROP TABLE tenant_settings")
            .execute(db.pool())
            .await
            .unwrap();

        let mut fiscal = FiscalConfig::default();
        fiscal.cnpj = "11.222.333/0001-81".to_string();
        let outcome = settings.save(&fiscal).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::LocalOnly { .. }));

        let loaded: FiscalConfig = settings.load().await.unwrap();
        assert_eq!(loaded.cnpj, "11.222.333/0001-81");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_invalid_document_not_saved() {
        let dir = scratch_dir();
        let (_db, settings) = layered(&dir).await;

        let mut templates = WhatsAppTemplates::default();
        templates.bot_url = Some("ftp://nope".to_string());
        assert!(matches!(
            settings.save(&templates).await,
            Err(DbError::Validation(_))
        ));
        assert!(!dir.exists());
    }
}
