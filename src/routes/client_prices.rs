use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers::client_price::{
    list_client_prices, get_client_price, create_client_price, update_client_price,
    delete_client_price, bulk_adjust,
};
use crate::state::AppState;
use super::{admin_only, authenticated};

pub fn routes(state: &AppState) -> Router<AppState> {
    let read = Router::new()
        .route("/client-prices", get(list_client_prices))
        .route("/client-prices/{id}", get(get_client_price));

    let write = Router::new()
        .route("/client-prices", post(create_client_price))
        .route("/client-prices/bulk-adjust", post(bulk_adjust))
        .route("/client-prices/{id}", put(update_client_price).delete(delete_client_price));

    authenticated(read, state).merge(admin_only(write, state))
}
