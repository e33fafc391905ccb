use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    BasePrice,
    ClientPrice,
    BulkAdjust,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::BasePrice => "base_price",
            ChangeType::ClientPrice => "client_price",
            ChangeType::BulkAdjust => "bulk_adjust",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "base_price" => Some(ChangeType::BasePrice),
            "client_price" => Some(ChangeType::ClientPrice),
            "bulk_adjust" => Some(ChangeType::BulkAdjust),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PriceHistory {
    pub id: i64,
    pub product_id: i64,
    pub user_id: Option<i64>,
    pub old_price_usd: Option<f64>,
    pub new_price_usd: f64,
    pub change_type: String,
    pub changed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PriceHistoryFilter {
    pub product_id: Option<i64>,
    pub user_id: Option<i64>,
    pub change_type: Option<ChangeType>,
    pub limit: i64,
}
