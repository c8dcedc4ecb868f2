//! # Remote Settings
//!
//! Settings documents stored as JSON text in `tenant_settings`, one row per
//! (tenant, key). Deployments that never provisioned the table surface
//! [`DbError::NotProvisioned`] so the layered store can fall back.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::settings::SettingsBackend;
use ipe_core::settings::SettingsDocument;

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pool: SqlitePool,
}

impl RemoteSettings {
    pub fn new(pool: SqlitePool) -> Self {
        RemoteSettings { pool }
    }

    /// Raw JSON of a document, if stored.
    pub async fn load_raw(&self, tenant_id: &str, key: &str) -> DbResult<Option<String>> {
        let document: Option<String> = sqlx::query_scalar(
            "SELECT document FROM tenant_settings WHERE tenant_id = ?1 AND key = ?2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    pub async fn save_raw(&self, tenant_id: &str, key: &str, document: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_settings (tenant_id, key, document, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (tenant_id, key)
            DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(key)
        .bind(document)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(tenant_id = %tenant_id, key = %key, "Remote settings saved");
        Ok(())
    }
}

impl SettingsBackend for RemoteSettings {
    async fn load<D: SettingsDocument>(&self, tenant_id: &str) -> DbResult<Option<D>> {
        match self.load_raw(tenant_id, D::KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save<D: SettingsDocument>(&self, tenant_id: &str, document: &D) -> DbResult<()> {
        let json = serde_json::to_string(document).map_err(|e| DbError::Serialization(e.to_string()))?;
        self.save_raw(tenant_id, D::KEY, &json).await
    }
}
