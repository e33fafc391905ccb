use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::mailer::Mailer;
use crate::services::postgres::PgStore;
use crate::services::{
    CategoryService, ClientPriceService, PriceHistoryService, ProductService, Store, UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub products: Arc<dyn ProductService>,
    pub categories: Arc<dyn CategoryService>,
    pub client_prices: Arc<dyn ClientPriceService>,
    pub price_history: Arc<dyn PriceHistoryService>,
    pub users: Arc<dyn UserService>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: Config, db_pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self::from_store(config, Arc::new(PgStore::new(db_pool)), mailer)
    }

    /// Wires every service to the same backing store.
    pub fn from_store<S: Store>(config: Config, store: Arc<S>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config: Arc::new(config),
            products: store.clone(),
            categories: store.clone(),
            client_prices: store.clone(),
            price_history: store.clone(),
            users: store,
            mailer,
        }
    }
}
