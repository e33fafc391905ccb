use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use tracing::{error, info, instrument};

use crate::dtos::client_price::{
    BulkAdjustRequest, BulkAdjustResponse, ClientPriceQueryParams, ClientPriceResponse,
    CreateClientPriceRequest, UpdateClientPriceRequest,
};
use crate::error::AppError;
use crate::extract::{Path, Query};
use crate::middleware::auth::AuthContext;
use crate::models::client_price::{ClientPriceChanges, ClientPriceFilter, NewClientPrice};
use crate::models::price_history::ChangeType;
use crate::models::product::{Product, ProductFilter};
use crate::models::user::UserProfile;
use crate::pricing::{effective_price, plan_bulk_adjustment, price_from_markup, round_cents};
use crate::services::below_base_price;
use crate::state::AppState;
use crate::validation::ValidatedJson;

async fn load_client(state: &AppState, user_id: i64) -> Result<UserProfile, AppError> {
    let user = state
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Client not found"))?;
    if user.is_admin {
        return Err(AppError::validation("Custom prices can only be set for client accounts"));
    }
    Ok(user)
}

async fn load_product(state: &AppState, product_id: i64) -> Result<Product, AppError> {
    state
        .products
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))
}

/// Resolves the stored custom price and enforces the base price floor.
fn resolve_custom_price(
    product: &Product,
    custom_price_usd: Option<f64>,
    markup_percentage: Option<f64>,
) -> Result<f64, AppError> {
    let price = match (custom_price_usd, markup_percentage) {
        (Some(custom), _) => round_cents(custom),
        (None, Some(markup)) => price_from_markup(product.base_price_usd, markup),
        (None, None) => {
            return Err(AppError::validation("custom_price_usd or markup_percentage is required"))
        }
    };

    if price < product.base_price_usd {
        return Err(below_base_price(price, product.base_price_usd));
    }
    Ok(price)
}

// GET /api/client-prices - admins may filter by client; clients get their own rows
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn list_client_prices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ClientPriceQueryParams>,
) -> Result<Json<Vec<ClientPriceResponse>>, AppError> {
    let filter = ClientPriceFilter {
        user_id: if auth.is_admin { params.user_id } else { Some(auth.user_id) },
        product_id: params.product_id,
    };

    let prices = state.client_prices.list(&filter).await?;
    Ok(Json(prices.into_iter().map(ClientPriceResponse::from).collect()))
}

// GET /api/client-prices/{id}
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_client_price(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ClientPriceResponse>, AppError> {
    let price = state
        .client_prices
        .get(id)
        .await?
        .filter(|cp| auth.is_admin || cp.user_id == auth.user_id)
        .ok_or_else(|| AppError::not_found("Client price not found"))?;

    Ok(Json(ClientPriceResponse::from(price)))
}

// POST /api/client-prices - admin only
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id))]
pub async fn create_client_price(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<CreateClientPriceRequest>,
) -> Result<(StatusCode, Json<ClientPriceResponse>), AppError> {
    let client = load_client(&state, payload.user_id).await?;
    let product = load_product(&state, payload.product_id).await?;

    if state.client_prices.find(client.id, product.id).await?.is_some() {
        return Err(AppError::validation("Client price for this product already exists"));
    }

    let custom_price_usd = resolve_custom_price(&product, payload.custom_price_usd, payload.markup_percentage)?;

    let price = state
        .client_prices
        .create(
            NewClientPrice {
                user_id: client.id,
                product_id: product.id,
                custom_price_usd,
                markup_percentage: payload.markup_percentage,
            },
            auth.user_id,
        )
        .await?;

    info!(client_price_id = price.id, user_id = client.id, product_id = product.id, "Client price created");
    Ok((StatusCode::CREATED, Json(ClientPriceResponse::from(price))))
}

// PUT /api/client-prices/{id} - admin only
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id))]
pub async fn update_client_price(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateClientPriceRequest>,
) -> Result<Json<ClientPriceResponse>, AppError> {
    let existing = state
        .client_prices
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Client price not found"))?;
    let product = load_product(&state, existing.product_id).await?;

    let custom_price_usd = resolve_custom_price(&product, payload.custom_price_usd, payload.markup_percentage)?;
    let old_price_usd = effective_price(product.base_price_usd, Some(&existing));

    let price = state
        .client_prices
        .update(
            id,
            ClientPriceChanges { custom_price_usd, markup_percentage: payload.markup_percentage },
            old_price_usd,
            auth.user_id,
        )
        .await?
        .ok_or_else(|| AppError::not_found("Client price not found"))?;

    Ok(Json(ClientPriceResponse::from(price)))
}

// DELETE /api/client-prices/{id} - admin only
#[instrument(skip(state))]
pub async fn delete_client_price(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.client_prices.delete(id).await? {
        return Err(AppError::not_found("Client price not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/client-prices/bulk-adjust - admin only
//
// Items are independent: a product whose adjusted price would drop below its
// base price is skipped and reported, and the request only fails when nothing
// was updated.
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id, client_id = payload.user_id))]
pub async fn bulk_adjust(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<BulkAdjustRequest>,
) -> Result<Json<BulkAdjustResponse>, AppError> {
    let client = load_client(&state, payload.user_id).await?;

    let products = state
        .products
        .list(&ProductFilter { active: Some(true), ..Default::default() })
        .await?;
    let prices = state
        .client_prices
        .list(&ClientPriceFilter { user_id: Some(client.id), product_id: None })
        .await?;

    let plan = plan_bulk_adjustment(&products, &prices, payload.percentage);
    let mut errors = plan.errors;
    let mut updated = 0usize;

    for item in plan.updates {
        match state
            .client_prices
            .upsert_custom_price(
                client.id,
                item.product_id,
                item.old_price_usd,
                item.new_price_usd,
                ChangeType::BulkAdjust,
                auth.user_id,
            )
            .await
        {
            Ok(_) => updated += 1,
            // The base price moved between planning and saving.
            Err(AppError::ValidationError(msg)) => errors.push(format!("{}: {msg}", item.product_code)),
            Err(e) => {
                error!(error = %e, product_id = item.product_id, "Bulk adjustment item failed");
                errors.push(format!("{}: failed to save new price", item.product_code));
            }
        }
    }

    if updated == 0 {
        if errors.is_empty() {
            errors.push("No active products to adjust".to_string());
        }
        return Err(AppError::BulkRejected { message: "No prices were updated".to_string(), details: errors });
    }

    info!(updated, skipped = errors.len(), percentage = payload.percentage, "Bulk price adjustment applied");
    Ok(Json(BulkAdjustResponse { updated, errors }))
}
