use axum::{extract::State, Extension, Json};
use tracing::{info, instrument, warn};

use crate::dtos::auth::{UpdateUserStatusRequest, UserQueryParams, UserResponse};
use crate::error::AppError;
use crate::extract::{Path, Query};
use crate::mailer::approval_email;
use crate::middleware::auth::AuthContext;
use crate::models::user::UserStatus;
use crate::state::AppState;
use crate::validation::ValidatedJson;

// GET /api/users - admin only
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserQueryParams>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(UserStatus::parse(raw).ok_or_else(|| {
            AppError::validation("Invalid status. Use: pending, active, rejected, or suspended")
        })?),
        None => None,
    };

    let users = state.users.list(status).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

// GET /api/users/{id} - admin only
pub async fn get_user(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

// PUT /api/users/{id}/status - admin only
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id))]
pub async fn update_user_status(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateUserStatusRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if id == auth.user_id {
        return Err(AppError::validation("You cannot change your own account status"));
    }

    let next = UserStatus::parse(&payload.status)
        .ok_or_else(|| AppError::validation("Invalid status"))?;

    let user = state
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let current = user.status();
    if !current.can_transition_to(next) {
        return Err(AppError::validation(format!(
            "Cannot change status from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let updated = state
        .users
        .set_status(id, next)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id = id, from = current.as_str(), to = next.as_str(), "User status changed");

    if next == UserStatus::Active && current != UserStatus::Suspended {
        let login_url = format!("{}/login", state.config.app_base_url);
        if let Err(e) = state
            .mailer
            .send(approval_email(&updated.email, &updated.company_name, &login_url))
            .await
        {
            warn!(error = %e, user_id = id, "Approval email could not be sent");
        }
    }

    Ok(Json(UserResponse::from(updated)))
}
