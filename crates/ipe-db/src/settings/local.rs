//! Local settings files: `<root>/<tenant_id>/<key>.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::SettingsBackend;
use crate::error::{DbError, DbResult};
use ipe_core::settings::SettingsDocument;
use ipe_core::validation::validate_uuid;

#[derive(Debug, Clone)]
pub struct LocalSettings {
    root: PathBuf,
}

impl LocalSettings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalSettings { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a document. Tenant ids are UUIDs, so they are safe as a
    /// directory name once validated.
    pub fn path_for(&self, tenant_id: &str, key: &str) -> DbResult<PathBuf> {
        validate_uuid(tenant_id).map_err(|e| DbError::LocalStorage(e.to_string()))?;
        Ok(self.root.join(tenant_id).join(format!("{key}.json")))
    }
}

impl SettingsBackend for LocalSettings {
    async fn load<D: SettingsDocument>(&self, tenant_id: &str) -> DbResult<Option<D>> {
        let path = self.path_for(tenant_id, D::KEY)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), "Loaded local settings");
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save<D: SettingsDocument>(&self, tenant_id: &str, document: &D) -> DbResult<()> {
        let path = self.path_for(tenant_id, D::KEY)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_vec_pretty(document)?;

        // Readers only ever see a complete document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "Saved local settings");
        Ok(())
    }
}
