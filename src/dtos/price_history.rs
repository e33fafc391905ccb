use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::price_history::PriceHistory;

#[derive(Debug, Deserialize)]
pub struct PriceHistoryQueryParams {
    pub product_id: Option<i64>,
    pub user_id: Option<i64>,
    pub change_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PriceHistoryResponse {
    pub id: i64,
    pub product_id: i64,
    pub user_id: Option<i64>,
    pub old_price_usd: Option<f64>,
    pub new_price_usd: f64,
    pub change_type: String,
    pub changed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<PriceHistory> for PriceHistoryResponse {
    fn from(row: PriceHistory) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            old_price_usd: row.old_price_usd,
            new_price_usd: row.new_price_usd,
            change_type: row.change_type,
            changed_by: row.changed_by,
            created_at: row.created_at,
        }
    }
}
