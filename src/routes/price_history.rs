use axum::{routing::get, Router};
use crate::handlers::price_history::list_price_history;
use crate::state::AppState;
use super::authenticated;

pub fn routes(state: &AppState) -> Router<AppState> {
    authenticated(Router::new().route("/price-history", get(list_price_history)), state)
}
