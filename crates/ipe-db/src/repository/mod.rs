//! # Repository Module
//!
//! One repository per entity, each bound to a tenant. Commands never write
//! SQL; they call these.
//!
//! ```text
//! command ──► db.tokens().redeem(&request, now)
//!                  │
//!                  ▼
//!             TokenRepository ── SQL ──► SQLite
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog, stock, batch price updates
//! - [`sale::SaleRepository`] - Sales with commission snapshots
//! - [`commission::CommissionRepository`] - Rates per payment method
//! - [`token::TokenRepository`] - Managerial token issue / redeem / revoke
//! - [`employee::EmployeeRepository`] - Colaboradores
//! - [`settings::RemoteSettings`] - Settings documents table

pub mod commission;
pub mod employee;
pub mod product;
pub mod sale;
pub mod settings;
pub mod token;
