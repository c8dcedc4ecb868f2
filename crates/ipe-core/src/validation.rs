//! # Validation Module
//!
//! Input validation for the back office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Screens (TypeScript)                                         │
//! │  └── Masks, required fields, immediate feedback                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Commands (apps/backoffice)                                   │
//! │  └── THIS MODULE: formats, ranges, CPF/CNPJ check digits               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── NOT NULL, UNIQUE (tenant, sku), (tenant, token code), FKs         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ipe_core::validation::{validate_cnpj, validate_sku};
//!
//! validate_sku("SOF-3L-CINZA").unwrap();
//! assert_eq!(validate_cnpj("11.222.333/0001-81").unwrap(), "11222333000181");
//! ```

use crate::error::ValidationError;
use crate::TOKEN_CODE_DIGITS;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// 100% in basis points.
pub const MAX_RATE_BPS: u32 = 10_000;

/// 1000% in basis points. Imported decor items can carry very high markups.
pub const MAX_MARGIN_BPS: u32 = 100_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use ipe_core::validation::validate_sku;
///
/// assert!(validate_sku("MESA-JANTAR-6").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("com espaço").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 200)
}

/// Validates a payment method key ("pix", "credito", "crediario", ...).
pub fn validate_payment_method(method: &str) -> ValidationResult<()> {
    validate_required_text("payment_method", method, 40)
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price or cost in centavos. Zero is allowed.
///
/// ## Example
/// ```rust
/// use ipe_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(129990).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Tax estimate: 0% to 100%.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    validate_bps("tax_rate", bps, MAX_RATE_BPS)
}

/// Discount cap or commission rate: 0% to 100%.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    validate_bps(field, bps, MAX_RATE_BPS)
}

/// Markup margin: 0% to 1000%.
pub fn validate_margin_bps(bps: u32) -> ValidationResult<()> {
    validate_bps("margin", bps, MAX_MARGIN_BPS)
}

fn validate_bps(field: &str, bps: u32, max: u32) -> ValidationResult<()> {
    if bps > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: max as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Code Validators
// =============================================================================

/// A managerial token code is exactly six ASCII digits.
pub fn validate_token_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() != TOKEN_CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: format!("must be {} digits", TOKEN_CODE_DIGITS),
        });
    }

    Ok(())
}

/// Validates a CPF and returns its 11 digits without punctuation.
///
/// ## Example
/// ```rust
/// use ipe_core::validation::validate_cpf;
///
/// assert_eq!(validate_cpf("529.982.247-25").unwrap(), "52998224725");
/// assert!(validate_cpf("529.982.247-26").is_err());
/// assert!(validate_cpf("111.111.111-11").is_err());
/// ```
pub fn validate_cpf(cpf: &str) -> ValidationResult<String> {
    let digits = document_digits("cpf", cpf, 11)?;

    let first = mod11_check_digit(&digits[..9], &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let second = mod11_check_digit(&digits[..10], &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);

    if digits[9] != first || digits[10] != second {
        return Err(ValidationError::InvalidCheckDigits {
            field: "cpf".to_string(),
        });
    }

    Ok(to_string(&digits))
}

/// Validates a CNPJ and returns its 14 digits without punctuation.
pub fn validate_cnpj(cnpj: &str) -> ValidationResult<String> {
    let digits = document_digits("cnpj", cnpj, 14)?;

    let first = mod11_check_digit(&digits[..12], &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let second = mod11_check_digit(&digits[..13], &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);

    if digits[12] != first || digits[13] != second {
        return Err(ValidationError::InvalidCheckDigits {
            field: "cnpj".to_string(),
        });
    }

    Ok(to_string(&digits))
}

/// Strips the usual mask characters and checks the digit count.
/// Sequences of one repeated digit pass the checksum but are never issued.
fn document_digits(field: &str, raw: &str, len: usize) -> ValidationResult<Vec<u32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let mut digits = Vec::with_capacity(len);
    for c in raw.chars() {
        match c {
            '.' | '-' | '/' | ' ' => continue,
            _ => match c.to_digit(10) {
                Some(d) => digits.push(d),
                None => {
                    return Err(ValidationError::InvalidFormat {
                        field: field.to_string(),
                        reason: "must contain only digits".to_string(),
                    })
                }
            },
        }
    }

    if digits.len() != len {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("must have {} digits", len),
        });
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return Err(ValidationError::InvalidCheckDigits {
            field: field.to_string(),
        });
    }

    Ok(digits)
}

fn mod11_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

fn to_string(digits: &[u32]) -> String {
    digits
        .iter()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect()
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
