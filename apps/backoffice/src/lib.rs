//! # Ipê Back Office Library
//!
//! Commands behind the back-office screens, plus the state they share.
//! The `ipe-admin` binary drives the same commands from a terminal.
//!
//! ## Module Organization
//! ```text
//! ipe_backoffice/
//! ├── lib.rs          ◄─── You are here (logging setup)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database + layered settings
//! │   └── config.rs   ◄─── ipe.toml / IPE_* configuration
//! ├── commands/
//! │   ├── products.rs ◄─── Catalog and showroom
//! │   ├── pricing.rs  ◄─── Markup calculator, batch repricing
//! │   ├── reports.rs  ◄─── Curva ABC, encalhados, dashboard
//! │   ├── sales.rs    ◄─── Sales and commission rates
//! │   ├── tokens.rs   ◄─── Managerial tokens
//! │   ├── settings.rs ◄─── Fiscal, gateways, WhatsApp
//! │   └── hr.rs       ◄─── Employees and payroll
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State
//! ```text
//! ┌──────────────────┐ ┌──────────────────────┐
//! │    DbState       │ │    AppConfig         │
//! │  • Database      │ │  • Tenant, paths     │
//! │  • Settings      │ │  • Pricing defaults  │
//! │    (remote +     │ │  • Stale threshold   │
//! │     local file)  │ │  • Token defaults    │
//! └──────────────────┘ └──────────────────────┘
//! ```
//! Commands take `&DbState` and, when they need defaults, `&AppConfig`.

pub mod commands;
pub mod error;
pub mod state;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=ipe=trace` - Show trace for ipe crates only
/// - Default: INFO, DEBUG for ipe crates
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ipe=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
