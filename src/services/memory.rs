//! In-process store with the same observable behaviour as `PgStore`
//! (unique keys, cascades, history rows). Used by the integration tests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::category::{CategoryChanges, ProductCategory};
use crate::models::client_price::{ClientPrice, ClientPriceChanges, ClientPriceFilter, NewClientPrice};
use crate::models::price_history::{ChangeType, PriceHistory, PriceHistoryFilter};
use crate::models::product::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::models::user::{NewUser, UserProfile, UserStatus};
use crate::services::{
    below_base_price, stranded_client_prices, CategoryService, ClientPriceService, PriceHistoryService,
    ProductService, UserService, PRODUCT_HAS_HISTORY,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    products: Vec<Product>,
    categories: Vec<ProductCategory>,
    client_prices: Vec<ClientPrice>,
    history: Vec<PriceHistory>,
    users: Vec<UserProfile>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_above_base(&self, product_id: i64, price_usd: f64) -> Result<(), AppError> {
        let product = self
            .products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| AppError::not_found("Product not found"))?;
        if price_usd < product.base_price_usd {
            return Err(below_base_price(price_usd, product.base_price_usd));
        }
        Ok(())
    }

    fn append_history(
        &mut self,
        product_id: i64,
        user_id: Option<i64>,
        old_price_usd: Option<f64>,
        new_price_usd: f64,
        change_type: ChangeType,
        actor_id: i64,
    ) {
        let id = self.next_id();
        self.history.push(PriceHistory {
            id,
            product_id,
            user_id,
            old_price_usd,
            new_price_usd,
            change_type: change_type.as_str().to_string(),
            changed_by: Some(actor_id),
            created_at: Utc::now(),
        });
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductService for MemoryStore {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let tables = self.tables.read().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| filter.category_id.is_none_or(|c| p.category_id == Some(c)))
            .filter(|p| filter.active.is_none_or(|a| p.active == a))
            .filter(|p| {
                search.as_ref().is_none_or(|s| {
                    p.name.to_lowercase().contains(s.as_str()) || p.code.to_lowercase().contains(s.as_str())
                })
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(products)
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.code == code).cloned())
    }

    async fn create(&self, new: NewProduct) -> Result<Product, AppError> {
        let mut tables = self.tables.write().await;
        if tables.products.iter().any(|p| p.code == new.code) {
            return Err(AppError::validation("Product code already exists"));
        }
        let now = Utc::now();
        let product = Product {
            id: tables.next_id(),
            code: new.code,
            name: new.name,
            description: new.description,
            category_id: new.category_id,
            base_price_usd: new.base_price_usd,
            active: new.active,
            created_at: now,
            updated_at: now,
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, changes: ProductChanges, actor_id: i64) -> Result<Option<Product>, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(code) = &changes.code {
            if tables.products.iter().any(|p| p.id != id && &p.code == code) {
                return Err(AppError::validation("Product code already exists"));
            }
        }
        let Some(idx) = tables.products.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(new_base) = changes.base_price_usd.filter(|p| *p > tables.products[idx].base_price_usd) {
            let stranded = tables
                .client_prices
                .iter()
                .filter(|cp| cp.product_id == id && cp.custom_price_usd.is_some_and(|c| c < new_base))
                .count() as i64;
            if stranded > 0 {
                return Err(stranded_client_prices(stranded));
            }
        }
        let product = &mut tables.products[idx];

        let old_price = product.base_price_usd;
        if let Some(code) = changes.code {
            product.code = code;
        }
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = Some(description);
        }
        if let Some(category_id) = changes.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(price) = changes.base_price_usd {
            product.base_price_usd = price;
        }
        if let Some(active) = changes.active {
            product.active = active;
        }
        product.updated_at = Utc::now();
        let updated = product.clone();

        if updated.base_price_usd != old_price {
            tables.append_history(id, None, Some(old_price), updated.base_price_usd, ChangeType::BasePrice, actor_id);
        }
        Ok(Some(updated))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.products.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        if tables.history.iter().any(|h| h.product_id == id) {
            return Err(AppError::validation(PRODUCT_HAS_HISTORY));
        }
        tables.products.retain(|p| p.id != id);
        tables.client_prices.retain(|cp| cp.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CategoryService for MemoryStore {
    async fn list(&self) -> Result<Vec<ProductCategory>, AppError> {
        let tables = self.tables.read().await;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get(&self, id: i64) -> Result<Option<ProductCategory>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, name: &str, description: Option<&str>) -> Result<ProductCategory, AppError> {
        let mut tables = self.tables.write().await;
        if tables.categories.iter().any(|c| c.name == name) {
            return Err(AppError::validation("Category name already exists"));
        }
        let category = ProductCategory {
            id: tables.next_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update(&self, id: i64, changes: CategoryChanges) -> Result<Option<ProductCategory>, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &changes.name {
            if tables.categories.iter().any(|c| c.id != id && &c.name == name) {
                return Err(AppError::validation("Category name already exists"));
            }
        }
        let Some(category) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            category.name = name;
        }
        if let Some(description) = changes.description {
            category.description = Some(description);
        }
        Ok(Some(category.clone()))
    }

    async fn product_count(&self, id: i64) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().filter(|p| p.category_id == Some(id)).count() as i64)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }
}

#[async_trait]
impl ClientPriceService for MemoryStore {
    async fn list(&self, filter: &ClientPriceFilter) -> Result<Vec<ClientPrice>, AppError> {
        let tables = self.tables.read().await;
        let mut prices: Vec<ClientPrice> = tables
            .client_prices
            .iter()
            .filter(|cp| filter.user_id.is_none_or(|u| cp.user_id == u))
            .filter(|cp| filter.product_id.is_none_or(|p| cp.product_id == p))
            .cloned()
            .collect();
        prices.sort_by_key(|cp| (cp.user_id, cp.product_id));
        Ok(prices)
    }

    async fn get(&self, id: i64) -> Result<Option<ClientPrice>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.client_prices.iter().find(|cp| cp.id == id).cloned())
    }

    async fn find(&self, user_id: i64, product_id: i64) -> Result<Option<ClientPrice>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .client_prices
            .iter()
            .find(|cp| cp.user_id == user_id && cp.product_id == product_id)
            .cloned())
    }

    async fn create(&self, new: NewClientPrice, actor_id: i64) -> Result<ClientPrice, AppError> {
        let mut tables = self.tables.write().await;
        if tables
            .client_prices
            .iter()
            .any(|cp| cp.user_id == new.user_id && cp.product_id == new.product_id)
        {
            return Err(AppError::validation("Client price for this product already exists"));
        }
        tables.ensure_above_base(new.product_id, new.custom_price_usd)?;
        let now = Utc::now();
        let price = ClientPrice {
            id: tables.next_id(),
            user_id: new.user_id,
            product_id: new.product_id,
            custom_price_usd: Some(new.custom_price_usd),
            markup_percentage: new.markup_percentage,
            discount_percentage: None,
            created_at: now,
            updated_at: now,
        };
        tables.client_prices.push(price.clone());
        tables.append_history(
            new.product_id,
            Some(new.user_id),
            None,
            new.custom_price_usd,
            ChangeType::ClientPrice,
            actor_id,
        );
        Ok(price)
    }

    async fn update(
        &self,
        id: i64,
        changes: ClientPriceChanges,
        old_price_usd: f64,
        actor_id: i64,
    ) -> Result<Option<ClientPrice>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.client_prices.iter().position(|cp| cp.id == id) else {
            return Ok(None);
        };
        tables.ensure_above_base(tables.client_prices[idx].product_id, changes.custom_price_usd)?;
        let price = &mut tables.client_prices[idx];
        price.custom_price_usd = Some(changes.custom_price_usd);
        price.markup_percentage = changes.markup_percentage;
        price.discount_percentage = None;
        price.updated_at = Utc::now();
        let updated = price.clone();

        tables.append_history(
            updated.product_id,
            Some(updated.user_id),
            Some(old_price_usd),
            changes.custom_price_usd,
            ChangeType::ClientPrice,
            actor_id,
        );
        Ok(Some(updated))
    }

    async fn upsert_custom_price(
        &self,
        user_id: i64,
        product_id: i64,
        old_price_usd: f64,
        new_price_usd: f64,
        change_type: ChangeType,
        actor_id: i64,
    ) -> Result<ClientPrice, AppError> {
        let mut tables = self.tables.write().await;
        tables.ensure_above_base(product_id, new_price_usd)?;
        let now = Utc::now();

        let existing = tables
            .client_prices
            .iter()
            .position(|cp| cp.user_id == user_id && cp.product_id == product_id);

        let price = match existing {
            Some(idx) => {
                let existing = &mut tables.client_prices[idx];
                existing.custom_price_usd = Some(new_price_usd);
                existing.markup_percentage = None;
                existing.discount_percentage = None;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let price = ClientPrice {
                    id: tables.next_id(),
                    user_id,
                    product_id,
                    custom_price_usd: Some(new_price_usd),
                    markup_percentage: None,
                    discount_percentage: None,
                    created_at: now,
                    updated_at: now,
                };
                tables.client_prices.push(price.clone());
                price
            }
        };

        tables.append_history(product_id, Some(user_id), Some(old_price_usd), new_price_usd, change_type, actor_id);
        Ok(price)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.client_prices.len();
        tables.client_prices.retain(|cp| cp.id != id);
        Ok(tables.client_prices.len() < before)
    }
}

#[async_trait]
impl PriceHistoryService for MemoryStore {
    async fn list(&self, filter: &PriceHistoryFilter) -> Result<Vec<PriceHistory>, AppError> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(tables
            .history
            .iter()
            .rev()
            .filter(|h| filter.product_id.is_none_or(|p| h.product_id == p))
            .filter(|h| filter.user_id.is_none_or(|u| h.user_id == Some(u)))
            .filter(|h| filter.change_type.is_none_or(|t| h.change_type == t.as_str()))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserService for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<UserProfile>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_by_invite_token(&self, token: &str) -> Result<Option<UserProfile>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.invite_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list(&self, status: Option<UserStatus>) -> Result<Vec<UserProfile>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .rev()
            .filter(|u| status.is_none_or(|s| u.status == s.as_str()))
            .cloned()
            .collect())
    }

    async fn any_admin(&self) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().any(|u| u.is_admin))
    }

    async fn create(&self, new: NewUser) -> Result<UserProfile, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&new.email)) {
            return Err(AppError::validation("A user with this email already exists"));
        }
        let now = Utc::now();
        let user = UserProfile {
            id: tables.next_id(),
            email: new.email,
            company_name: new.company_name,
            is_admin: new.is_admin,
            status: new.status.as_str().to_string(),
            password_hash: new.password_hash,
            invite_token: new.invite_token,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<Option<UserProfile>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.status = status.as_str().to_string();
            if status != UserStatus::Active {
                user.invite_token = None;
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn accept_invite(&self, id: i64, password_hash: &str) -> Result<Option<UserProfile>, AppError> {
        let mut tables = self.tables.write().await;
        let redeemable = |u: &UserProfile| {
            u.id == id
                && u.invite_token.is_some()
                && matches!(u.status(), UserStatus::Pending | UserStatus::Active)
        };
        Ok(tables.users.iter_mut().find(|u| redeemable(&**u)).map(|user| {
            user.password_hash = Some(password_hash.to_string());
            user.status = UserStatus::Active.as_str().to_string();
            user.invite_token = None;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(code: &str, price: f64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: "Widget".to_string(),
            description: None,
            category_id: None,
            base_price_usd: price,
            active: true,
        }
    }

    #[tokio::test]
    async fn base_price_change_appends_single_history_row() {
        let store = MemoryStore::new();
        let product = ProductService::create(&store, widget("W-1", 10.0)).await.unwrap();

        let changes = ProductChanges { base_price_usd: Some(12.5), ..Default::default() };
        ProductService::update(&store, product.id, changes, 99).await.unwrap().unwrap();

        let rename = ProductChanges { name: Some("Gadget".into()), ..Default::default() };
        ProductService::update(&store, product.id, rename, 99).await.unwrap().unwrap();

        let filter = PriceHistoryFilter { product_id: Some(product.id), limit: 10, ..Default::default() };
        let history = PriceHistoryService::list(&store, &filter).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_price_usd, Some(10.0));
        assert_eq!(history[0].new_price_usd, 12.5);
        assert_eq!(history[0].change_type, "base_price");
    }

    #[tokio::test]
    async fn upsert_clears_markup_and_discount() {
        let store = MemoryStore::new();
        let product = ProductService::create(&store, widget("W-2", 50.0)).await.unwrap();
        let new = NewClientPrice { user_id: 5, product_id: product.id, custom_price_usd: 60.0, markup_percentage: Some(20.0) };
        let created = ClientPriceService::create(&store, new, 1).await.unwrap();
        assert_eq!(created.markup_percentage, Some(20.0));

        let upserted = store
            .upsert_custom_price(5, product.id, 60.0, 66.0, ChangeType::BulkAdjust, 1)
            .await
            .unwrap();
        assert_eq!(upserted.id, created.id);
        assert_eq!(upserted.custom_price_usd, Some(66.0));
        assert_eq!(upserted.markup_percentage, None);
    }

    #[tokio::test]
    async fn products_with_history_are_not_deleted() {
        let store = MemoryStore::new();
        let product = ProductService::create(&store, widget("W-3", 5.0)).await.unwrap();
        store.upsert_custom_price(3, product.id, 5.0, 6.0, ChangeType::BulkAdjust, 1).await.unwrap();

        let err = ProductService::delete(&store, product.id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(ProductService::get(&store, product.id).await.unwrap().is_some());
        let history = PriceHistoryService::list(&store, &PriceHistoryFilter { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let unpriced = ProductService::create(&store, widget("W-4", 5.0)).await.unwrap();
        assert!(ProductService::delete(&store, unpriced.id).await.unwrap());
        assert!(!ProductService::delete(&store, unpriced.id).await.unwrap());
    }

    #[tokio::test]
    async fn base_price_raise_cannot_strand_custom_prices() {
        let store = MemoryStore::new();
        let product = ProductService::create(&store, widget("W-5", 20.0)).await.unwrap();
        store.upsert_custom_price(7, product.id, 20.0, 22.0, ChangeType::ClientPrice, 1).await.unwrap();

        let raise = ProductChanges { base_price_usd: Some(25.0), ..Default::default() };
        let err = ProductService::update(&store, product.id, raise, 1).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        let unchanged = ProductService::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.base_price_usd, 20.0);

        let low = store.upsert_custom_price(7, product.id, 22.0, 19.99, ChangeType::ClientPrice, 1).await;
        assert!(matches!(low, Err(AppError::ValidationError(_))));

        let up_to_floor = ProductChanges { base_price_usd: Some(22.0), ..Default::default() };
        assert!(ProductService::update(&store, product.id, up_to_floor, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let store = MemoryStore::new();
        let new = |email: &str| NewUser {
            email: email.to_string(),
            company_name: "Acme".into(),
            is_admin: false,
            status: UserStatus::Pending,
            password_hash: None,
            invite_token: None,
        };
        UserService::create(&store, new("buyer@acme.test")).await.unwrap();
        let err = UserService::create(&store, new("Buyer@Acme.test")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
