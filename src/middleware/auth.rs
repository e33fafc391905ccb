use axum::extract::{Request, State};
use http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::models::user::UserStatus;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    pub company_name: String,
    pub is_admin: bool,
}

/// Verifies the bearer token and reloads the account so suspensions take
/// effect immediately. Runs before any handler extractor touches the body.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auth_header = match req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return unauthorized("Missing Authorization header"),
    };

    // Expect "Bearer <token>"
    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t.trim(),
        None => return unauthorized("Invalid Authorization format"),
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return unauthorized("Invalid or expired token"),
    };

    let user = match state.users.get(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized("Account no longer exists"),
        Err(e) => return e.into_response(),
    };

    if user.status() != UserStatus::Active {
        return forbidden("Account is not active");
    }

    req.extensions_mut().insert(AuthContext {
        user_id: user.id,
        email: user.email,
        company_name: user.company_name,
        is_admin: user.is_admin,
    });

    next.run(req).await
}

/// Layered inside `require_auth` on admin-only routes.
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<AuthContext>() {
        Some(ctx) if ctx.is_admin => next.run(req).await,
        Some(_) => forbidden("Admin access required"),
        None => unauthorized("Missing Authorization header"),
    }
}

fn unauthorized(msg: &str) -> Response {
    AppError::unauthorized(msg).into_response()
}

fn forbidden(msg: &str) -> Response {
    AppError::forbidden(msg).into_response()
}
