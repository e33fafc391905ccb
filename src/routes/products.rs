use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers::product::{
    get_products, get_product, create_product, update_product, delete_product
};
use crate::state::AppState;
use super::{admin_only, authenticated};

pub fn routes(state: &AppState) -> Router<AppState> {
    // Admins and clients can browse; the handlers shape the view per role
    let read = Router::new()
        .route("/products", get(get_products))
        .route("/products/{id}", get(get_product));

    let write = Router::new()
        .route("/products", post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product));

    authenticated(read, state).merge(admin_only(write, state))
}
