// src/dtos/product.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::product::Product;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub base_price_usd: f64,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub base_price_usd: Option<f64>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQueryParams {
    pub category_id: Option<i64>,
    pub active: Option<bool>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub base_price_usd: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Convert from Model to Response DTO
impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            code: product.code,
            name: product.name,
            description: product.description,
            category_id: product.category_id,
            base_price_usd: product.base_price_usd,
            active: product.active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Client portal view of a product at the client's own price.
#[derive(Debug, Serialize)]
pub struct CatalogItemResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub base_price_usd: f64,
    pub price_usd: f64,
    pub has_custom_price: bool,
}
