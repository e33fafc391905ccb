use axum::{Router, routing::{post, get}};
use crate::state::AppState;
use crate::handlers::auth::{login, register, accept_invite, invite, me};
use super::{admin_only, authenticated};

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/accept-invite", post(accept_invite));

    let protected = authenticated(Router::new().route("/auth/me", get(me)), state);

    let admin = admin_only(Router::new().route("/auth/invite", post(invite)), state);

    open.merge(protected).merge(admin)
}
