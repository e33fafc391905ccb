use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use crate::dtos::category::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
use crate::error::AppError;
use crate::extract::Path;
use crate::models::category::CategoryChanges;
use crate::state::AppState;
use crate::validation::ValidatedJson;

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = state.categories.list().await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    let description = payload.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
    let category = state
        .categories
        .create(payload.name.trim(), description)
        .await?;

    info!(category_id = category.id, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    let changes = CategoryChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        description: payload.description,
    };

    let category = state
        .categories
        .update(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;

    Ok(Json(CategoryResponse::from(category)))
}

#[instrument(skip(state))]
pub async fn delete_category(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if state.categories.get(id).await?.is_none() {
        return Err(AppError::not_found("Category not found"));
    }

    let in_use = state.categories.product_count(id).await?;
    if in_use > 0 {
        return Err(AppError::validation(format!(
            "Cannot delete category with {in_use} product(s) assigned"
        )));
    }

    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
