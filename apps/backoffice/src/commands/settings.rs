//! # Settings Commands
//!
//! Fiscal (NFe), payment gateway and WhatsApp template screens. Every save
//! goes through `LayeredSettings`: written locally first, then mirrored to
//! the shared table. The returned `SaveOutcome` tells the screen whether
//! the mirror happened.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::DbState;
use ipe_core::settings::{FiscalConfig, GatewayAccount, GatewayProvider, PaymentGatewayConfig, WhatsAppTemplates};
use ipe_db::SaveOutcome;

// =============================================================================
// Fiscal
// =============================================================================

pub async fn get_fiscal_config(db: &DbState) -> Result<FiscalConfig, ApiError> {
    Ok(db.settings().load::<FiscalConfig>().await?)
}

/// Saves fiscal data with the CNPJ reduced to digits.
pub async fn save_fiscal_config(db: &DbState, mut config: FiscalConfig) -> Result<SaveOutcome, ApiError> {
    config.normalize()?;
    let outcome = db.settings().save(&config).await?;
    info!(complete = config.is_complete(), "Fiscal settings saved");
    Ok(outcome)
}

// =============================================================================
// Payment Gateways
// =============================================================================

pub async fn get_payment_gateways(db: &DbState) -> Result<PaymentGatewayConfig, ApiError> {
    Ok(db.settings().load::<PaymentGatewayConfig>().await?)
}

/// Adds or replaces the account of one provider, keeping the others.
pub async fn save_gateway_account(db: &DbState, account: GatewayAccount) -> Result<SaveOutcome, ApiError> {
    let provider = account.provider;
    let mut config = get_payment_gateways(db).await?;
    config.upsert(account);

    let outcome = db.settings().save(&config).await?;
    info!(provider = ?provider, "Gateway account saved");
    Ok(outcome)
}

pub async fn disable_gateway(db: &DbState, provider: GatewayProvider) -> Result<SaveOutcome, ApiError> {
    let mut config = get_payment_gateways(db).await?;
    let mut account = config
        .account(provider)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Gateway", &format!("{:?}", provider)))?;
    account.enabled = false;
    config.upsert(account);
    Ok(db.settings().save(&config).await?)
}

// =============================================================================
// WhatsApp
// =============================================================================

pub async fn get_whatsapp_templates(db: &DbState) -> Result<WhatsAppTemplates, ApiError> {
    Ok(db.settings().load::<WhatsAppTemplates>().await?)
}

pub async fn save_whatsapp_templates(
    db: &DbState,
    templates: WhatsAppTemplates,
) -> Result<SaveOutcome, ApiError> {
    Ok(db.settings().save(&templates).await?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePreview {
    pub template: String,
    pub message: String,
}

/// Renders a saved template with sample values for the preview pane.
pub async fn preview_whatsapp(
    db: &DbState,
    template: &str,
    vars: &[(String, String)],
) -> Result<MessagePreview, ApiError> {
    let templates = get_whatsapp_templates(db).await?;
    let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let message = templates
        .render(template, &vars)
        .ok_or_else(|| ApiError::not_found("Template", template))?;

    Ok(MessagePreview {
        template: template.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::error::ErrorCode;
    use ipe_core::settings::FiscalEnvironment;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_fiscal_defaults_and_normalized_save() {
        let (db, _) = context().await;
        let defaults = get_fiscal_config(&db).await.unwrap();
        assert_eq!(defaults.nfe_series, 1);
        assert!(!defaults.is_complete());

        let config = FiscalConfig {
            cnpj: "11.222.333/0001-81".to_string(),
            legal_name: "Ipê Móveis LTDA".to_string(),
            ..FiscalConfig::default()
        };
        assert_eq!(save_fiscal_config(&db, config).await.unwrap(), SaveOutcome::Synced);
        assert_eq!(get_fiscal_config(&db).await.unwrap().cnpj, "11222333000181");

        let bad = FiscalConfig {
            cnpj: "11.222.333/0001-00".to_string(),
            ..FiscalConfig::default()
        };
        assert_eq!(
            save_fiscal_config(&db, bad).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        let incomplete = FiscalConfig {
            environment: FiscalEnvironment::Producao,
            ..FiscalConfig::default()
        };
        assert!(save_fiscal_config(&db, incomplete).await.is_err());
    }

    #[tokio::test]
    async fn test_gateway_upsert_keeps_other_providers() {
        let (db, _) = context().await;
        let account = |provider, key: &str| GatewayAccount {
            provider,
            enabled: true,
            sandbox: true,
            credentials: BTreeMap::from([("token".to_string(), key.to_string())]),
        };

        save_gateway_account(&db, account(GatewayProvider::Pagbank, "pb-1")).await.unwrap();
        save_gateway_account(&db, account(GatewayProvider::Stone, "st-1")).await.unwrap();
        save_gateway_account(&db, account(GatewayProvider::Pagbank, "pb-2")).await.unwrap();

        let config = get_payment_gateways(&db).await.unwrap();
        assert_eq!(config.gateways.len(), 2);
        assert_eq!(
            config.account(GatewayProvider::Pagbank).unwrap().credentials["token"],
            "pb-2"
        );

        disable_gateway(&db, GatewayProvider::Stone).await.unwrap();
        let config = get_payment_gateways(&db).await.unwrap();
        assert_eq!(config.enabled().count(), 1);

        // Enabled without credentials is refused
        let err = save_gateway_account(&db, account(GatewayProvider::Stone, " ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_whatsapp_preview() {
        let (db, _) = context().await;
        let vars = vec![
            ("cliente".to_string(), "Ana".to_string()),
            ("pedido".to_string(), "#1042".to_string()),
            ("data".to_string(), "20/10".to_string()),
        ];
        let preview = preview_whatsapp(&db, "delivery_scheduled", &vars).await.unwrap();
        assert_eq!(
            preview.message,
            "Olá Ana! A entrega do pedido #1042 está agendada para 20/10."
        );

        let mut templates = get_whatsapp_templates(&db).await.unwrap();
        templates
            .templates
            .insert("pos_venda".to_string(), "Oi {cliente}, tudo certo com o {produto}?".to_string());
        save_whatsapp_templates(&db, templates).await.unwrap();

        let preview = preview_whatsapp(&db, "pos_venda", &vars).await.unwrap();
        assert_eq!(preview.message, "Oi Ana, tudo certo com o {produto}?");

        let err = preview_whatsapp(&db, "missing", &vars).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
