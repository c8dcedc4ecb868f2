//! # ipe-db: Storage Layer for the Ipê Back Office
//!
//! SQLite (through sqlx) stands in for the remote object store the screens
//! talk to; a directory of JSON files stands in for the browser's local
//! storage used as the settings fallback.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apps/backoffice command (recalculate_prices, redeem_token, ...)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ipe-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌─────────────────┐  ┌─────────────────┐  │   │
//! │  │   │   Database    │  │  Repositories   │  │    Settings     │  │   │
//! │  │   │   (pool.rs)   │◄─│ product, sale,  │  │ Layered:        │  │   │
//! │  │   │  SqlitePool   │  │ commission,     │  │  remote table → │  │   │
//! │  │   │  migrations   │  │ token, employee │  │  local files    │  │   │
//! │  │   └───────────────┘  └─────────────────┘  └─────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ipe_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ipe.db")).await?;
//! let products = db.products().list_active().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod settings;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::commission::CommissionRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::product::{PriceUpdateReport, ProductRepository};
pub use repository::sale::SaleRepository;
pub use repository::settings::RemoteSettings;
pub use repository::token::TokenRepository;
pub use settings::{LayeredSettings, LocalSettings, SaveOutcome, SettingsBackend};
