pub mod auth;
pub mod categories;
pub mod client_prices;
pub mod price_history;
pub mod products;
pub mod users;

use axum::{middleware, Router};

use crate::middleware::auth::{require_admin, require_auth};
use crate::state::AppState;

/// Wraps `router` so every route needs a valid session.
pub(crate) fn authenticated(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Wraps `router` so every route needs an admin session. Authentication runs
/// first, then the admin check, both before the handler reads the body.
pub(crate) fn admin_only(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::routes(state))
        .merge(products::routes(state))
        .merge(categories::routes(state))
        .merge(client_prices::routes(state))
        .merge(price_history::routes(state))
        .merge(users::routes(state))
}
