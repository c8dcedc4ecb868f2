//! # Settings Documents
//!
//! Per-tenant configuration edited on the settings screens and stored as
//! JSON documents: NFe emission, payment gateways and WhatsApp message
//! templates. The external services they point at are never contacted by
//! the back office; these are credentials and text only.
//!
//! ```text
//!  ┌───────────────────┐      key              stored as
//!  │ SettingsDocument  │ ─────────────────►  tenant_settings(tenant, key, json)
//!  └─────────┬─────────┘                     or <dir>/<tenant>/<key>.json
//!            │
//!   ┌────────┼──────────────────┬─────────────────────┬──────────────┐
//!   ▼        ▼                  ▼                     ▼              ▼
//! FiscalConfig  PaymentGatewayConfig  WhatsAppTemplates  MarkupConfig
//! "fiscal"      "payment_gateways"    "whatsapp_templates" "markup"
//! ```

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::pricing::MarkupConfig;
use crate::validation::{validate_cnpj, validate_margin_bps, validate_tax_rate_bps, ValidationResult};

/// A JSON settings document with a stable storage key.
pub trait SettingsDocument: Serialize + DeserializeOwned + Default + Send + Sync {
    const KEY: &'static str;

    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }
}

// =============================================================================
// Fiscal (NFe)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    #[default]
    SimplesNacional,
    LucroPresumido,
    LucroReal,
}

/// SEFAZ environment the NFe provider is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FiscalEnvironment {
    #[default]
    Homologacao,
    Producao,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct FiscalConfig {
    /// Digits only once validated.
    pub cnpj: String,
    pub state_registration: String,
    pub legal_name: String,
    pub tax_regime: TaxRegime,
    pub environment: FiscalEnvironment,
    pub api_client_id: String,
    pub api_client_secret: String,
    pub nfe_series: u32,
    pub next_nfe_number: u64,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            cnpj: String::new(),
            state_registration: String::new(),
            legal_name: String::new(),
            tax_regime: TaxRegime::default(),
            environment: FiscalEnvironment::default(),
            api_client_id: String::new(),
            api_client_secret: String::new(),
            nfe_series: 1,
            next_nfe_number: 1,
        }
    }
}

impl FiscalConfig {
    /// Enough data filled in to emit an invoice.
    pub fn is_complete(&self) -> bool {
        !self.cnpj.is_empty()
            && !self.legal_name.trim().is_empty()
            && !self.api_client_id.is_empty()
            && !self.api_client_secret.is_empty()
    }

    /// Replaces the CNPJ with its digits after validating it.
    pub fn normalize(&mut self) -> ValidationResult<()> {
        if !self.cnpj.trim().is_empty() {
            self.cnpj = validate_cnpj(&self.cnpj)?;
        }
        Ok(())
    }
}

impl SettingsDocument for FiscalConfig {
    const KEY: &'static str = "fiscal";

    fn validate(&self) -> ValidationResult<()> {
        if !self.cnpj.trim().is_empty() {
            validate_cnpj(&self.cnpj)?;
        }
        if !(1..=999).contains(&self.nfe_series) {
            return Err(ValidationError::OutOfRange {
                field: "nfe_series".to_string(),
                min: 1,
                max: 999,
            });
        }
        if self.next_nfe_number == 0 {
            return Err(ValidationError::MustBePositive {
                field: "next_nfe_number".to_string(),
            });
        }
        if self.environment == FiscalEnvironment::Producao && !self.is_complete() {
            return Err(ValidationError::Required {
                field: "fiscal credentials".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Payment Gateways
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GatewayProvider {
    Pagbank,
    Stone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAccount {
    pub provider: GatewayProvider,
    pub enabled: bool,
    pub sandbox: bool,
    /// Opaque values (token, merchant id, ...) as the provider names them.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentGatewayConfig {
    pub gateways: Vec<GatewayAccount>,
}

impl PaymentGatewayConfig {
    pub fn account(&self, provider: GatewayProvider) -> Option<&GatewayAccount> {
        self.gateways.iter().find(|g| g.provider == provider)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &GatewayAccount> {
        self.gateways.iter().filter(|g| g.enabled)
    }

    /// Inserts or replaces the account for its provider.
    pub fn upsert(&mut self, account: GatewayAccount) {
        match self.gateways.iter_mut().find(|g| g.provider == account.provider) {
            Some(existing) => *existing = account,
            None => self.gateways.push(account),
        }
    }
}

impl SettingsDocument for PaymentGatewayConfig {
    const KEY: &'static str = "payment_gateways";

    fn validate(&self) -> ValidationResult<()> {
        for (i, account) in self.gateways.iter().enumerate() {
            if self.gateways[..i].iter().any(|g| g.provider == account.provider) {
                return Err(ValidationError::InvalidFormat {
                    field: "gateways".to_string(),
                    reason: "each provider may appear once".to_string(),
                });
            }
            if account.enabled && account.credentials.values().all(|v| v.trim().is_empty()) {
                return Err(ValidationError::Required {
                    field: "gateway credentials".to_string(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// WhatsApp Templates
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct WhatsAppTemplates {
    /// Base URL of the messaging bot service.
    pub bot_url: Option<String>,
    pub templates: BTreeMap<String, String>,
}

impl Default for WhatsAppTemplates {
    fn default() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            "order_confirmation".to_string(),
            "Olá {cliente}! Seu pedido {pedido} foi confirmado. Total: {total}.".to_string(),
        );
        templates.insert(
            "delivery_scheduled".to_string(),
            "Olá {cliente}! A entrega do pedido {pedido} está agendada para {data}.".to_string(),
        );
        templates.insert(
            "payment_reminder".to_string(),
            "Olá {cliente}, lembramos que há um saldo de {saldo} referente ao pedido {pedido}.".to_string(),
        );
        Self {
            bot_url: None,
            templates,
        }
    }
}

impl WhatsAppTemplates {
    /// Fills `{placeholder}`s of the named template in one pass.
    ///
    /// Placeholders without a value are left as written, so a missing
    /// variable is visible in the preview instead of silently blank.
    ///
    /// ```rust
    /// use ipe_core::settings::WhatsAppTemplates;
    ///
    /// let t = WhatsAppTemplates::default();
    /// let msg = t
    ///     .render("order_confirmation", &[("cliente", "Ana"), ("pedido", "#42")])
    ///     .unwrap();
    /// assert_eq!(msg, "Olá Ana! Seu pedido #42 foi confirmado. Total: {total}.");
    /// ```
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Option<String> {
        self.templates.get(name).map(|t| fill_placeholders(t, vars))
    }
}

fn fill_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl SettingsDocument for WhatsAppTemplates {
    const KEY: &'static str = "whatsapp_templates";

    fn validate(&self) -> ValidationResult<()> {
        if let Some(url) = &self.bot_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::InvalidFormat {
                    field: "bot_url".to_string(),
                    reason: "must start with http:// or https://".to_string(),
                });
            }
        }
        if self.templates.keys().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::Required {
                field: "template name".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Markup
// =============================================================================

impl SettingsDocument for MarkupConfig {
    const KEY: &'static str = "markup";

    fn validate(&self) -> ValidationResult<()> {
        validate_margin_bps(self.fallback_margin.bps())?;
        validate_tax_rate_bps(self.tax_estimate.bps())?;
        for (category, margin) in &self.category_margins {
            if category.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "category".to_string(),
                });
            }
            validate_margin_bps(margin.bps())?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let keys = [
            FiscalConfig::KEY,
            PaymentGatewayConfig::KEY,
            WhatsAppTemplates::KEY,
            MarkupConfig::KEY,
        ];
        assert_eq!(keys, ["fiscal", "payment_gateways", "whatsapp_templates", "markup"]);
    }

    #[test]
    fn test_markup_validation() {
        use crate::Percent;

        let config = MarkupConfig::default().with_margin("sofas", Percent::from_bps(6000));
        assert!(config.validate().is_ok());
        assert!(config
            .clone()
            .with_tax_estimate(Percent::from_bps(10_001))
            .validate()
            .is_err());
        assert!(config
            .with_margin("mesas", Percent::from_bps(100_001))
            .validate()
            .is_err());
    }

    #[test]
    fn test_fiscal_validation() {
        let mut config = FiscalConfig::default();
        assert!(config.validate().is_ok());

        config.cnpj = "11.222.333/0001-81".to_string();
        config.normalize().unwrap();
        assert_eq!(config.cnpj, "11222333000181");

        config.environment = FiscalEnvironment::Producao;
        assert!(config.validate().is_err());

        config.legal_name = "Ipê Móveis LTDA".to_string();
        config.api_client_id = "id".to_string();
        config.api_client_secret = "secret".to_string();
        assert!(config.validate().is_ok());

        config.nfe_series = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fiscal_partial_json_uses_defaults() {
        let config: FiscalConfig = serde_json::from_str(r#"{"legalName":"Ipê"}"#).unwrap();
        assert_eq!(config.legal_name, "Ipê");
        assert_eq!(config.nfe_series, 1);
        assert_eq!(config.environment, FiscalEnvironment::Homologacao);
    }

    #[test]
    fn test_gateway_upsert_and_validation() {
        let mut config = PaymentGatewayConfig::default();
        config.upsert(GatewayAccount {
            provider: GatewayProvider::Stone,
            enabled: true,
            sandbox: true,
            credentials: BTreeMap::new(),
        });
        assert!(config.validate().is_err());

        let mut credentials = BTreeMap::new();
        credentials.insert("token".to_string(), "abc".to_string());
        config.upsert(GatewayAccount {
            provider: GatewayProvider::Stone,
            enabled: true,
            sandbox: false,
            credentials,
        });
        assert_eq!(config.gateways.len(), 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled().count(), 1);
        assert!(config.account(GatewayProvider::Pagbank).is_none());
    }

    #[test]
    fn test_render_placeholders() {
        let t = WhatsAppTemplates::default();
        assert_eq!(
            t.render("payment_reminder", &[("cliente", "Bia"), ("saldo", "R$ 500,00"), ("pedido", "7")]),
            Some("Olá Bia, lembramos que há um saldo de R$ 500,00 referente ao pedido 7.".to_string())
        );
        assert_eq!(t.render("unknown", &[]), None);

        // Values are not re-scanned for placeholders
        assert_eq!(fill_placeholders("{a} {b}", &[("a", "{b}"), ("b", "x")]), "{b} x");
        assert_eq!(fill_placeholders("unterminated {a", &[("a", "x")]), "unterminated {a");
    }

    #[test]
    fn test_whatsapp_validation() {
        let mut t = WhatsAppTemplates::default();
        t.bot_url = Some("ftp://bot".to_string());
        assert!(t.validate().is_err());
        t.bot_url = Some("https://bot.example.com".to_string());
        assert!(t.validate().is_ok());
    }
}
