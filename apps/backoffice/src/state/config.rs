//! # Back-Office Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`IPE_*`)
//! 2. Config file (`ipe.toml`, path from `--config`, `IPE_CONFIG`, or the
//!    platform config directory)
//! 3. Defaults (this file)
//!
//! The result is validated once; commands treat it as read-only.
//!
//! ```toml
//! tenant_id = "00000000-0000-0000-0000-000000000001"
//! database_path = "/var/lib/ipe/ipe.db"
//! settings_dir = "/var/lib/ipe/settings"
//! stale_after_days = 120
//!
//! [pricing]
//! fallback_margin_pct = 45.0
//! tax_estimate_pct = 18.0
//!
//! [tokens]
//! ttl_minutes = 15
//! max_uses = 1
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use ipe_core::pricing::MarkupConfig;
use ipe_core::validation::{validate_margin_bps, validate_tax_rate_bps, validate_uuid};
use ipe_core::{Percent, ValidationError, DEFAULT_STALE_AFTER_DAYS, DEFAULT_TENANT_ID, FALLBACK_MARGIN_BPS};

const CONFIG_FILE: &str = "ipe.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tenant_id: String,
    pub database_path: PathBuf,
    /// Root of the local settings fallback.
    pub settings_dir: PathBuf,
    pub pricing: PricingDefaults,
    /// Days without a sale before a product counts as encalhado.
    pub stale_after_days: i64,
    pub tokens: TokenDefaults,
}

/// Used when no markup document has been saved for the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingDefaults {
    pub fallback_margin_pct: f64,
    pub tax_estimate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenDefaults {
    pub ttl_minutes: i64,
    pub max_uses: u32,
}

impl Default for PricingDefaults {
    fn default() -> Self {
        PricingDefaults {
            fallback_margin_pct: Percent::from_bps(FALLBACK_MARGIN_BPS).percentage(),
            tax_estimate_pct: 0.0,
        }
    }
}

impl Default for TokenDefaults {
    fn default() -> Self {
        TokenDefaults {
            ttl_minutes: 15,
            max_uses: 1,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        AppConfig {
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            database_path: data_dir.join("ipe.db"),
            settings_dir: data_dir.join("settings"),
            pricing: PricingDefaults::default(),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            tokens: TokenDefaults::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("br", "ipe", "backoffice")
}

impl AppConfig {
    /// Loads file, then environment, then validates.
    ///
    /// A missing file at the default location is fine; a missing file
    /// that was asked for explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var("IPE_CONFIG").ok().map(PathBuf::from);
        let requested = explicit.map(Path::to_path_buf).or(from_env);

        let mut config = match requested {
            Some(path) => Self::from_file(&path)?,
            None => match project_dirs().map(|d| d.config_dir().join(CONFIG_FILE)) {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `IPE_*` overrides from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ConfigError> {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        }

        if let Some(v) = lookup("IPE_TENANT_ID") {
            self.tenant_id = v;
        }
        if let Some(v) = lookup("IPE_DB_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("IPE_SETTINGS_DIR") {
            self.settings_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("IPE_FALLBACK_MARGIN") {
            self.pricing.fallback_margin_pct = parse("IPE_FALLBACK_MARGIN", v)?;
        }
        if let Some(v) = lookup("IPE_TAX_ESTIMATE") {
            self.pricing.tax_estimate_pct = parse("IPE_TAX_ESTIMATE", v)?;
        }
        if let Some(v) = lookup("IPE_STALE_AFTER_DAYS") {
            self.stale_after_days = parse("IPE_STALE_AFTER_DAYS", v)?;
        }
        if let Some(v) = lookup("IPE_TOKEN_TTL_MINUTES") {
            self.tokens.ttl_minutes = parse("IPE_TOKEN_TTL_MINUTES", v)?;
        }
        if let Some(v) = lookup("IPE_TOKEN_MAX_USES") {
            self.tokens.max_uses = parse("IPE_TOKEN_MAX_USES", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_uuid(&self.tenant_id)?;

        for (key, pct) in [
            ("pricing.fallback_margin_pct", self.pricing.fallback_margin_pct),
            ("pricing.tax_estimate_pct", self.pricing.tax_estimate_pct),
        ] {
            if !pct.is_finite() || pct < 0.0 {
                return Err(ConfigError::InvalidValue(key.to_string()));
            }
        }
        validate_margin_bps(self.fallback_margin().bps())?;
        validate_tax_rate_bps(self.tax_estimate().bps())?;

        if self.stale_after_days < 0 {
            return Err(ConfigError::InvalidValue("stale_after_days".to_string()));
        }
        if self.tokens.ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue("tokens.ttl_minutes".to_string()));
        }
        if self.tokens.max_uses == 0 {
            return Err(ConfigError::InvalidValue("tokens.max_uses".to_string()));
        }
        Ok(())
    }

    pub fn fallback_margin(&self) -> Percent {
        Percent::from_percentage(self.pricing.fallback_margin_pct)
    }

    pub fn tax_estimate(&self) -> Percent {
        Percent::from_percentage(self.pricing.tax_estimate_pct)
    }

    /// Markup table for a tenant that never saved one.
    pub fn markup_defaults(&self) -> MarkupConfig {
        MarkupConfig {
            fallback_margin: self.fallback_margin(),
            ..MarkupConfig::default()
        }
        .with_tax_estimate(self.tax_estimate())
    }

    /// Defaults with database and settings under `dir`.
    pub fn for_dir(dir: &Path) -> Self {
        AppConfig {
            database_path: dir.join("ipe.db"),
            settings_dir: dir.join("settings"),
            ..AppConfig::default()
        }
    }
}
