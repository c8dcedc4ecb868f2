//! # Commands Module
//!
//! Everything the back-office screens can ask for.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── products.rs  ◄─── Catalog, stock, showroom
//! ├── pricing.rs   ◄─── Markup calculator, category margins, reprice batch
//! ├── reports.rs   ◄─── Curva ABC, stale inventory, dashboard
//! ├── sales.rs     ◄─── Recording sales, commission rates and report
//! ├── tokens.rs    ◄─── Managerial token issue / redeem / revoke
//! ├── settings.rs  ◄─── Fiscal, payment gateways, WhatsApp templates
//! └── hr.rs        ◄─── Employees and payroll
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller (screen or ipe-admin)                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  pub async fn abc_curve(                                                │
//! │      db: &DbState,          ◄── tenant-scoped database + settings       │
//! │      range: DateRange,      ◄── command parameters                      │
//! │  ) -> Result<AbcReport, ApiError>                                       │
//! │         │                                                               │
//! │         │ (ipe-db fetch ──► ipe-core pure computation)                  │
//! │         ▼                                                               │
//! │  camelCase JSON DTO, or ApiError { code, message }                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands needing defaults (fallback margin, stale threshold, token TTL)
//! also take `&AppConfig`.

pub mod hr;
pub mod pricing;
pub mod products;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod tokens;
