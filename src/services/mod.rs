//! Data access seams. Handlers only talk to these traits; `postgres` backs
//! them with sqlx and `memory` keeps everything in process for tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::category::{CategoryChanges, ProductCategory};
use crate::models::client_price::{ClientPrice, ClientPriceChanges, ClientPriceFilter, NewClientPrice};
use crate::models::price_history::{ChangeType, PriceHistory, PriceHistoryFilter};
use crate::models::product::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::models::user::{NewUser, UserProfile, UserStatus};

pub const PRODUCT_HAS_HISTORY: &str = "Product has price history and cannot be deleted; deactivate it instead";

/// Error for a client price under its product's base price.
pub fn below_base_price(price_usd: f64, base_price_usd: f64) -> AppError {
    AppError::validation(format!(
        "Custom price {price_usd:.2} cannot be below the base price {base_price_usd:.2}"
    ))
}

/// Error for a base price raise that would leave `count` custom prices under the floor.
pub fn stranded_client_prices(count: i64) -> AppError {
    AppError::validation(format!(
        "{count} client price(s) would fall below the new base price; adjust them first"
    ))
}

#[async_trait]
pub trait ProductService: Send + Sync {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError>;
    async fn get(&self, id: i64) -> Result<Option<Product>, AppError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, AppError>;
    async fn create(&self, new: NewProduct) -> Result<Product, AppError>;
    /// Applies `changes`; a base price change appends one history row in the same unit of work.
    /// Raising the base price above any existing custom price is rejected.
    async fn update(&self, id: i64, changes: ProductChanges, actor_id: i64) -> Result<Option<Product>, AppError>;
    /// Fails with a validation error while price history references the product.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn list(&self) -> Result<Vec<ProductCategory>, AppError>;
    async fn get(&self, id: i64) -> Result<Option<ProductCategory>, AppError>;
    async fn create(&self, name: &str, description: Option<&str>) -> Result<ProductCategory, AppError>;
    async fn update(&self, id: i64, changes: CategoryChanges) -> Result<Option<ProductCategory>, AppError>;
    async fn product_count(&self, id: i64) -> Result<i64, AppError>;
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ClientPriceService: Send + Sync {
    async fn list(&self, filter: &ClientPriceFilter) -> Result<Vec<ClientPrice>, AppError>;
    async fn get(&self, id: i64) -> Result<Option<ClientPrice>, AppError>;
    async fn find(&self, user_id: i64, product_id: i64) -> Result<Option<ClientPrice>, AppError>;
    /// Writers re-check the product's base price floor inside their unit of work.
    async fn create(&self, new: NewClientPrice, actor_id: i64) -> Result<ClientPrice, AppError>;
    async fn update(
        &self,
        id: i64,
        changes: ClientPriceChanges,
        old_price_usd: f64,
        actor_id: i64,
    ) -> Result<Option<ClientPrice>, AppError>;
    /// Inserts or overwrites the client's price with `new_price_usd`, clearing
    /// markup and discount, and appends a history row of `change_type`.
    async fn upsert_custom_price(
        &self,
        user_id: i64,
        product_id: i64,
        old_price_usd: f64,
        new_price_usd: f64,
        change_type: ChangeType,
        actor_id: i64,
    ) -> Result<ClientPrice, AppError>;
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PriceHistoryService: Send + Sync {
    async fn list(&self, filter: &PriceHistoryFilter) -> Result<Vec<PriceHistory>, AppError>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<UserProfile>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, AppError>;
    async fn find_by_invite_token(&self, token: &str) -> Result<Option<UserProfile>, AppError>;
    async fn list(&self, status: Option<UserStatus>) -> Result<Vec<UserProfile>, AppError>;
    async fn any_admin(&self) -> Result<bool, AppError>;
    async fn create(&self, new: NewUser) -> Result<UserProfile, AppError>;
    async fn set_status(&self, id: i64, status: UserStatus) -> Result<Option<UserProfile>, AppError>;
    /// Stores the password, activates the account and burns the invite token.
    async fn accept_invite(&self, id: i64, password_hash: &str) -> Result<Option<UserProfile>, AppError>;
}

/// Anything that can back every service at once.
pub trait Store:
    ProductService + CategoryService + ClientPriceService + PriceHistoryService + UserService + 'static
{
}

impl<T> Store for T where
    T: ProductService + CategoryService + ClientPriceService + PriceHistoryService + UserService + 'static
{
}
