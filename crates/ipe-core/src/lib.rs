//! # ipe-core: Pure Business Logic for the Ipê Back Office
//!
//! Every rule the back office applies to data fetched from storage lives
//! here, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ipê Back Office                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               apps/backoffice (commands, ipe-admin)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ipe-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐ │   │
//! │  │   │ pricing  │ │   abc    │ │ turnover │ │ token/commission │ │   │
//! │  │   │  markup  │ │  curva   │ │  giro /  │ │  state machine,  │ │   │
//! │  │   │  batch   │ │   ABC    │ │ encalhado│ │  rate snapshots  │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ipe-db (Storage Layer)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Sale, CommissionRate, ...)
//! - [`money`] - Money in centavos
//! - [`pricing`] - Markup calculator and batch repricing
//! - [`abc`] - Curva ABC
//! - [`turnover`] - Stock turnover and stale inventory
//! - [`commission`] - Commission tables and per-sale snapshots
//! - [`token`] - Managerial token state machine
//! - [`dashboard`] - Manager dashboard KPIs
//! - [`hr`] - Employee compensation
//! - [`settings`] - Fiscal, payment gateway and WhatsApp settings documents
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use ipe_core::money::Money;
//! use ipe_core::pricing::suggested_price;
//! use ipe_core::Percent;
//!
//! let cost = Money::from_reais(100, 0);
//! let price = suggested_price(cost, Percent::from_bps(4500), Percent::from_bps(1800));
//!
//! // 100 × 1.45 × 1.18 = 171.10 → rounded up to R$ 172,00
//! assert_eq!(price.cents(), 17200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod abc;
pub mod commission;
pub mod dashboard;
pub mod error;
pub mod hr;
pub mod money;
pub mod pricing;
pub mod settings;
pub mod token;
pub mod turnover;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, TokenRejection, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by tools and tests when no tenant is configured.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Margin applied when a category has no configured markup (45%).
pub const FALLBACK_MARGIN_BPS: u32 = 4500;

/// Cumulative revenue share that closes class A of the ABC curve (80%).
pub const ABC_CLASS_A_LIMIT_PCT: i64 = 80;

/// Cumulative revenue share that closes class B of the ABC curve (95%).
pub const ABC_CLASS_B_LIMIT_PCT: i64 = 95;

/// Default "encalhado" threshold in days.
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 90;

/// Number of digits in a managerial token code.
pub const TOKEN_CODE_DIGITS: usize = 6;
