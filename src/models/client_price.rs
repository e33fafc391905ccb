use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ClientPrice {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub custom_price_usd: Option<f64>,
    pub markup_percentage: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClientPrice {
    pub user_id: i64,
    pub product_id: i64,
    pub custom_price_usd: f64,
    pub markup_percentage: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ClientPriceChanges {
    pub custom_price_usd: f64,
    pub markup_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientPriceFilter {
    pub user_id: Option<i64>,
    pub product_id: Option<i64>,
}
