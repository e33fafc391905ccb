use axum::{extract::State, Extension, Json};
use tracing::instrument;

use crate::dtos::price_history::{PriceHistoryQueryParams, PriceHistoryResponse};
use crate::error::AppError;
use crate::extract::Query;
use crate::middleware::auth::AuthContext;
use crate::models::price_history::{ChangeType, PriceHistoryFilter};
use crate::state::AppState;

pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
pub const MAX_HISTORY_LIMIT: i64 = 500;

// GET /api/price-history - clients only ever see rows about their own prices
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn list_price_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PriceHistoryQueryParams>,
) -> Result<Json<Vec<PriceHistoryResponse>>, AppError> {
    let change_type = match params.change_type.as_deref() {
        Some(raw) => Some(ChangeType::parse(raw).ok_or_else(|| {
            AppError::validation("Invalid change_type. Use: base_price, client_price, or bulk_adjust")
        })?),
        None => None,
    };

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit < 1 {
        return Err(AppError::validation("limit must be at least 1"));
    }

    let user_id = if auth.is_admin { params.user_id } else { Some(auth.user_id) };

    let filter = PriceHistoryFilter {
        product_id: params.product_id,
        user_id,
        change_type,
        limit: limit.min(MAX_HISTORY_LIMIT),
    };

    let rows = state.price_history.list(&filter).await?;
    Ok(Json(rows.into_iter().map(PriceHistoryResponse::from).collect()))
}
