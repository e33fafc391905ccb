// src/handlers/product.rs
use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::{info, instrument};

use crate::dtos::product::{
    CatalogItemResponse, CreateProductRequest, ProductQueryParams, ProductResponse, UpdateProductRequest,
};
use crate::error::AppError;
use crate::extract::{Path, Query};
use crate::middleware::auth::AuthContext;
use crate::models::client_price::{ClientPrice, ClientPriceFilter};
use crate::models::product::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::pricing::{effective_price, round_cents};
use crate::state::AppState;
use crate::validation::{normalize_code, ValidatedJson};

fn catalog_item(product: Product, client_price: Option<&ClientPrice>) -> CatalogItemResponse {
    let price_usd = effective_price(product.base_price_usd, client_price);
    CatalogItemResponse {
        has_custom_price: client_price.is_some_and(|cp| cp.custom_price_usd.is_some()),
        id: product.id,
        code: product.code,
        name: product.name,
        description: product.description,
        category_id: product.category_id,
        base_price_usd: product.base_price_usd,
        price_usd,
    }
}

async fn ensure_category_exists(state: &AppState, category_id: Option<i64>) -> Result<(), AppError> {
    if let Some(id) = category_id {
        if state.categories.get(id).await?.is_none() {
            return Err(AppError::validation("category_id does not exist"));
        }
    }
    Ok(())
}

// GET /api/products - admins see the full list, clients their priced catalog
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Response, AppError> {
    let search = params.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());

    if auth.is_admin {
        let filter = ProductFilter { category_id: params.category_id, active: params.active, search };
        let products = state.products.list(&filter).await?;
        let response: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
        return Ok(Json(response).into_response());
    }

    let filter = ProductFilter { category_id: params.category_id, active: Some(true), search };
    let products = state.products.list(&filter).await?;
    let prices = state
        .client_prices
        .list(&ClientPriceFilter { user_id: Some(auth.user_id), product_id: None })
        .await?;
    let by_product: HashMap<i64, &ClientPrice> = prices.iter().map(|cp| (cp.product_id, cp)).collect();

    let catalog: Vec<CatalogItemResponse> = products
        .into_iter()
        .map(|p| {
            let cp = by_product.get(&p.id).copied();
            catalog_item(p, cp)
        })
        .collect();
    Ok(Json(catalog).into_response())
}

// GET /api/products/{id}
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, AppError> {
    let product = state
        .products
        .get(id)
        .await?
        .filter(|p| auth.is_admin || p.active)
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    if auth.is_admin {
        return Ok(Json(ProductResponse::from(product)).into_response());
    }

    let client_price = state.client_prices.find(auth.user_id, product.id).await?;
    Ok(Json(catalog_item(product, client_price.as_ref())).into_response())
}

// POST /api/products - admin only
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let code = normalize_code(&payload.code);
    if state.products.find_by_code(&code).await?.is_some() {
        return Err(AppError::validation("Product code already exists"));
    }
    ensure_category_exists(&state, payload.category_id).await?;

    let product = state
        .products
        .create(NewProduct {
            code,
            name: payload.name.trim().to_string(),
            description: payload.description,
            category_id: payload.category_id,
            base_price_usd: round_cents(payload.base_price_usd),
            active: payload.active.unwrap_or(true),
        })
        .await?;

    info!(product_id = product.id, code = %product.code, "Product created");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /api/products/{id} - admin only
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    if state.products.get(id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }

    let code = payload.code.as_deref().map(normalize_code);
    if let Some(code) = &code {
        if let Some(other) = state.products.find_by_code(code).await? {
            if other.id != id {
                return Err(AppError::validation("Product code already exists"));
            }
        }
    }
    ensure_category_exists(&state, payload.category_id).await?;

    let changes = ProductChanges {
        code,
        name: payload.name.map(|n| n.trim().to_string()),
        description: payload.description,
        category_id: payload.category_id,
        base_price_usd: payload.base_price_usd.map(round_cents),
        active: payload.active,
    };

    let product = state
        .products
        .update(id, changes, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// DELETE /api/products/{id} - admin only
#[instrument(skip(state))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.products.delete(id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
