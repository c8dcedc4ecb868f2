//! # Product Commands
//!
//! Catalog maintenance: registering furniture, stock adjustments and
//! showroom (mostruário) placement.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::DbState;
use ipe_core::validation::{validate_price_cents, validate_product_name, validate_sku};
use ipe_core::Product;

/// Product DTO for the catalog screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub cost_cents: Option<i64>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    /// Cost × stock; zero when the cost is unknown.
    pub stock_value_cents: i64,
    pub is_active: bool,
    pub in_showroom: bool,
    pub showroom_location: Option<String>,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        let stock_value_cents = p.stock_value().cents();
        ProductDto {
            id: p.id,
            sku: p.sku,
            name: p.name,
            category: p.category,
            cost_cents: p.cost_cents,
            price_cents: p.price_cents,
            stock_quantity: p.stock_quantity,
            stock_value_cents,
            is_active: p.is_active,
            in_showroom: p.in_showroom,
            showroom_location: p.showroom_location,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductInput {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub cost_cents: Option<i64>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock_quantity: i64,
}

pub async fn create_product(db: &DbState, input: NewProductInput) -> Result<ProductDto, ApiError> {
    let sku = input.sku.trim().to_uppercase();
    validate_sku(&sku)?;
    validate_product_name(&input.name)?;
    validate_price_cents(input.price_cents)?;
    if let Some(cost) = input.cost_cents {
        validate_price_cents(cost)?;
    }
    if input.stock_quantity < 0 {
        return Err(ApiError::validation("stock_quantity must not be negative"));
    }

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        tenant_id: db.inner().tenant_id().to_string(),
        sku,
        name: input.name.trim().to_string(),
        category: input
            .category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty()),
        cost_cents: input.cost_cents,
        price_cents: input.price_cents,
        stock_quantity: input.stock_quantity,
        is_active: true,
        in_showroom: false,
        showroom_location: None,
        created_at: now,
        updated_at: now,
    };

    let product = db.inner().products().insert(&product).await?;
    info!(sku = %product.sku, "Product created");
    Ok(product.into())
}

pub async fn list_products(db: &DbState, include_inactive: bool) -> Result<Vec<ProductDto>, ApiError> {
    let products = if include_inactive {
        db.inner().products().list_all().await?
    } else {
        db.inner().products().list_active().await?
    };
    debug!(count = products.len(), "list_products");
    Ok(products.into_iter().map(ProductDto::from).collect())
}

pub async fn get_product_by_sku(db: &DbState, sku: &str) -> Result<ProductDto, ApiError> {
    let sku = sku.trim().to_uppercase();
    db.inner()
        .products()
        .get_by_sku(&sku)
        .await?
        .map(ProductDto::from)
        .ok_or_else(|| ApiError::not_found("Product", &sku))
}

/// Updates cost and category, the inputs of the markup.
pub async fn update_costing(
    db: &DbState,
    id: &str,
    category: Option<String>,
    cost_cents: Option<i64>,
) -> Result<ProductDto, ApiError> {
    if let Some(cost) = cost_cents {
        validate_price_cents(cost)?;
    }

    let repo = db.inner().products();
    let mut product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    product.category = category.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty());
    product.cost_cents = cost_cents;
    repo.update_details(&product).await?;

    Ok(product.into())
}

/// Adds `delta` units to stock (negative for losses or corrections).
pub async fn adjust_stock(db: &DbState, id: &str, delta: i64) -> Result<(), ApiError> {
    if delta == 0 {
        return Err(ApiError::validation("delta must not be zero"));
    }
    db.inner().products().update_stock(id, delta).await?;
    info!(id = %id, delta = delta, "Stock adjusted");
    Ok(())
}

/// Places a display unit (`Some(location)`) or removes it (`None`).
pub async fn set_showroom(db: &DbState, id: &str, location: Option<&str>) -> Result<(), ApiError> {
    let location = location.map(str::trim).filter(|l| !l.is_empty());
    db.inner().products().set_showroom(id, location).await?;
    Ok(())
}

pub async fn list_showroom(db: &DbState) -> Result<Vec<ProductDto>, ApiError> {
    let products = db.inner().products().list_showroom().await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}

pub async fn deactivate_product(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().products().deactivate(id).await?;
    info!(id = %id, "Product deactivated");
    Ok(())
}
