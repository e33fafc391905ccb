use axum::{
    routing::{get, put},
    Router,
};
use crate::handlers::user::{list_users, get_user, update_user_status};
use crate::state::AppState;
use super::admin_only;

pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/status", put(update_user_status));

    admin_only(admin, state)
}
