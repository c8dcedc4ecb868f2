//! # State Module
//!
//! Two state types, each passed only to the commands that need it:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ DbState                      │   │ AppConfig                    │
//! │  • Database (tenant-scoped)  │   │  • tenant, paths             │
//! │  • LayeredSettings           │   │  • pricing / stale / token   │
//! │                              │   │    defaults                  │
//! └──────────────────────────────┘   └──────────────────────────────┘
//! ```

mod config;
mod db;

pub use config::{AppConfig, ConfigError, PricingDefaults, TokenDefaults};
pub use db::DbState;
