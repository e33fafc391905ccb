use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers::category::{list_categories, create_category, update_category, delete_category};
use crate::state::AppState;
use super::{admin_only, authenticated};

pub fn routes(state: &AppState) -> Router<AppState> {
    let read = Router::new().route("/categories", get(list_categories));

    let write = Router::new()
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category));

    authenticated(read, state).merge(admin_only(write, state))
}
