use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::client_price::ClientPrice;

#[derive(Debug, Deserialize)]
pub struct CreateClientPriceRequest {
    pub user_id: i64,
    pub product_id: i64,
    pub custom_price_usd: Option<f64>,
    pub markup_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientPriceRequest {
    pub custom_price_usd: Option<f64>,
    pub markup_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ClientPriceQueryParams {
    pub user_id: Option<i64>,
    pub product_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAdjustRequest {
    pub user_id: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct BulkAdjustResponse {
    pub updated: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientPriceResponse {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub custom_price_usd: Option<f64>,
    pub markup_percentage: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientPrice> for ClientPriceResponse {
    fn from(price: ClientPrice) -> Self {
        Self {
            id: price.id,
            user_id: price.user_id,
            product_id: price.product_id,
            custom_price_usd: price.custom_price_usd,
            markup_percentage: price.markup_percentage,
            discount_percentage: price.discount_percentage,
            created_at: price.created_at,
            updated_at: price.updated_at,
        }
    }
}
