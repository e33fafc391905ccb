use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument, warn};

use crate::auth::jwt::sign_token;
use crate::auth::password::{generate_invite_token, hash_password, verify_password};
use crate::dtos::auth::{
    AcceptInviteRequest, InviteRequest, LoginRequest, LoginResponse, RegisterRequest, UserResponse,
};
use crate::error::AppError;
use crate::mailer::invitation_email;
use crate::middleware::auth::AuthContext;
use crate::models::user::{NewUser, UserStatus};
use crate::state::AppState;
use crate::validation::{normalize_email, ValidatedJson};

// POST /api/auth/login
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&payload.email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    // Invited accounts have no password until the invite is accepted.
    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !verify_password(&payload.password, password_hash)? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    match user.status() {
        UserStatus::Active => {}
        UserStatus::Pending => return Err(AppError::forbidden("Account pending approval")),
        UserStatus::Rejected => return Err(AppError::forbidden("Account has been rejected")),
        UserStatus::Suspended => return Err(AppError::forbidden("Account suspended")),
    }

    let config = &state.config;
    let token = sign_token(user.id, &user.email, user.is_admin, &config.jwt_secret, config.token_ttl_hours)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: config.token_ttl_seconds(),
        user: UserResponse::from(user),
    }))
}

// POST /api/auth/register - client self sign-up, awaits admin approval
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = normalize_email(&payload.email);
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::validation("A user with this email already exists"));
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            email,
            company_name: payload.company_name.trim().to_string(),
            is_admin: false,
            status: UserStatus::Pending,
            password_hash: Some(password_hash),
            invite_token: None,
        })
        .await?;

    info!(user_id = user.id, "Client registered, pending approval");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// POST /api/auth/invite - admin only
#[instrument(skip(state, auth, payload), fields(admin_id = auth.user_id))]
pub async fn invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<InviteRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = normalize_email(&payload.email);
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::validation("A user with this email already exists"));
    }

    let token = generate_invite_token();
    let user = state
        .users
        .create(NewUser {
            email,
            company_name: payload.company_name.trim().to_string(),
            is_admin: payload.is_admin,
            status: UserStatus::Pending,
            password_hash: None,
            invite_token: Some(token.clone()),
        })
        .await?;

    let accept_url = format!("{}/accept-invite?token={token}", state.config.app_base_url);
    if let Err(e) = state
        .mailer
        .send(invitation_email(&user.email, &user.company_name, &accept_url))
        .await
    {
        warn!(error = %e, user_id = user.id, "Invitation email could not be sent");
    }

    info!(user_id = user.id, "User invited");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// An invite can be redeemed while the account awaits approval, or after an
/// admin activated it before the invitee set a password.
fn invite_acceptable(status: UserStatus) -> bool {
    matches!(status, UserStatus::Pending | UserStatus::Active)
}

// POST /api/auth/accept-invite
#[instrument(skip(state, payload))]
pub async fn accept_invite(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AcceptInviteRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let invited = state
        .users
        .find_by_invite_token(payload.token.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Invite not found or already used"))?;

    // Rejected or suspended invitees cannot reactivate themselves.
    if !invite_acceptable(invited.status()) {
        return Err(AppError::not_found("Invite not found or already used"));
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .accept_invite(invited.id, &password_hash)
        .await?
        .ok_or_else(|| AppError::not_found("Invite not found or already used"))?;

    info!(user_id = user.id, "Invitation accepted");
    Ok(Json(UserResponse::from(user)))
}

// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .get(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}
