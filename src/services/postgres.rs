// src/services/postgres.rs
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use crate::error::{map_foreign_key_violation, map_unique_violation, AppError};
use crate::models::category::{CategoryChanges, ProductCategory};
use crate::models::client_price::{ClientPrice, ClientPriceChanges, ClientPriceFilter, NewClientPrice};
use crate::models::price_history::{ChangeType, PriceHistory, PriceHistoryFilter};
use crate::models::product::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::models::user::{NewUser, UserProfile, UserStatus};
use crate::services::{
    below_base_price, stranded_client_prices, CategoryService, ClientPriceService, PriceHistoryService,
    ProductService, UserService, PRODUCT_HAS_HISTORY,
};

const PRODUCT_COLUMNS: &str = "id, code, name, description, category_id,
    base_price_usd::FLOAT8 AS base_price_usd, active, created_at, updated_at";

const CLIENT_PRICE_COLUMNS: &str = "id, user_id, product_id,
    custom_price_usd::FLOAT8    AS custom_price_usd,
    markup_percentage::FLOAT8   AS markup_percentage,
    discount_percentage::FLOAT8 AS discount_percentage,
    created_at, updated_at";

const HISTORY_COLUMNS: &str = "id, product_id, user_id,
    old_price_usd::FLOAT8 AS old_price_usd,
    new_price_usd::FLOAT8 AS new_price_usd,
    change_type, changed_by, created_at";

const USER_COLUMNS: &str =
    "id, email, company_name, is_admin, status, password_hash, invite_token, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, description, created_at";

/// sqlx-backed implementation of every service trait.
#[derive(Clone)]
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

async fn append_history(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    user_id: Option<i64>,
    old_price_usd: Option<f64>,
    new_price_usd: f64,
    change_type: ChangeType,
    actor_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO price_history (product_id, user_id, old_price_usd, new_price_usd, change_type, changed_by)
         VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5, $6)",
    )
    .bind(product_id)
    .bind(user_id)
    .bind(old_price_usd)
    .bind(new_price_usd)
    .bind(change_type.as_str())
    .bind(actor_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Share-locks the product row so a concurrent base price raise waits for
/// this write, then checks `price_usd` against the current base price.
async fn ensure_above_base(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    price_usd: f64,
) -> Result<(), AppError> {
    let base_price_usd: Option<f64> =
        sqlx::query_scalar("SELECT base_price_usd::FLOAT8 FROM products WHERE id = $1 FOR SHARE")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;
    let base_price_usd = base_price_usd.ok_or_else(|| AppError::not_found("Product not found"))?;
    if price_usd < base_price_usd {
        return Err(below_base_price(price_usd, base_price_usd));
    }
    Ok(())
}

#[async_trait]
impl ProductService for PgStore {
    #[instrument(skip(self))]
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"));

        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(active) = filter.active {
            query.push(" AND active = ").push_bind(active);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query.push(" ORDER BY code");

        Ok(query.build_query_as::<Product>().fetch_all(&self.db_pool).await?)
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(product)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(product)
    }

    #[instrument(skip(self, new), fields(code = %new.code))]
    async fn create(&self, new: NewProduct) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (code, name, description, category_id, base_price_usd, active)
             VALUES ($1, $2, $3, $4, $5::FLOAT8, $6)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.code)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(new.base_price_usd)
        .bind(new.active)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_unique_violation(e, "Product code already exists"))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: i64, changes: ProductChanges, actor_id: i64) -> Result<Option<Product>, AppError> {
        let mut tx = self.db_pool.begin().await?;

        let Some(current) = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        if let Some(new_base) = changes.base_price_usd.filter(|p| *p > current.base_price_usd) {
            let stranded: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM client_prices
                 WHERE product_id = $1 AND custom_price_usd IS NOT NULL AND custom_price_usd < $2::FLOAT8",
            )
            .bind(id)
            .bind(new_base)
            .fetch_one(&mut *tx)
            .await?;
            if stranded > 0 {
                return Err(stranded_client_prices(stranded));
            }
        }

        let updated = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                code = COALESCE($1, code),
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                base_price_usd = COALESCE($5::FLOAT8, base_price_usd),
                active = COALESCE($6, active),
                updated_at = NOW()
             WHERE id = $7
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(changes.code)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.category_id)
        .bind(changes.base_price_usd)
        .bind(changes.active)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Product code already exists"))?;

        if updated.base_price_usd != current.base_price_usd {
            append_history(
                &mut tx,
                id,
                None,
                Some(current.base_price_usd),
                updated.base_price_usd,
                ChangeType::BasePrice,
                actor_id,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await
            .map_err(|e| map_foreign_key_violation(e, PRODUCT_HAS_HISTORY))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryService for PgStore {
    async fn list(&self) -> Result<Vec<ProductCategory>, AppError> {
        let categories = sqlx::query_as::<_, ProductCategory>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM product_categories ORDER BY name"
        ))
        .fetch_all(&self.db_pool)
        .await?;
        Ok(categories)
    }

    async fn get(&self, id: i64) -> Result<Option<ProductCategory>, AppError> {
        let category = sqlx::query_as::<_, ProductCategory>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM product_categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(category)
    }

    async fn create(&self, name: &str, description: Option<&str>) -> Result<ProductCategory, AppError> {
        sqlx::query_as::<_, ProductCategory>(&format!(
            "INSERT INTO product_categories (name, description) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_unique_violation(e, "Category name already exists"))
    }

    async fn update(&self, id: i64, changes: CategoryChanges) -> Result<Option<ProductCategory>, AppError> {
        sqlx::query_as::<_, ProductCategory>(&format!(
            "UPDATE product_categories SET
                name = COALESCE($1, name),
                description = COALESCE($2, description)
             WHERE id = $3
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(changes.name)
        .bind(changes.description)
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| map_unique_violation(e, "Category name already exists"))
    }

    async fn product_count(&self, id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.db_pool)
            .await?;
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM product_categories WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ClientPriceService for PgStore {
    async fn list(&self, filter: &ClientPriceFilter) -> Result<Vec<ClientPrice>, AppError> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {CLIENT_PRICE_COLUMNS} FROM client_prices WHERE 1=1"));
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        query.push(" ORDER BY user_id, product_id");

        Ok(query.build_query_as::<ClientPrice>().fetch_all(&self.db_pool).await?)
    }

    async fn get(&self, id: i64) -> Result<Option<ClientPrice>, AppError> {
        let price = sqlx::query_as::<_, ClientPrice>(&format!(
            "SELECT {CLIENT_PRICE_COLUMNS} FROM client_prices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(price)
    }

    async fn find(&self, user_id: i64, product_id: i64) -> Result<Option<ClientPrice>, AppError> {
        let price = sqlx::query_as::<_, ClientPrice>(&format!(
            "SELECT {CLIENT_PRICE_COLUMNS} FROM client_prices WHERE user_id = $1 AND product_id = $2"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(price)
    }

    #[instrument(skip(self, new), fields(user_id = new.user_id, product_id = new.product_id))]
    async fn create(&self, new: NewClientPrice, actor_id: i64) -> Result<ClientPrice, AppError> {
        let mut tx = self.db_pool.begin().await?;
        ensure_above_base(&mut tx, new.product_id, new.custom_price_usd).await?;

        let price = sqlx::query_as::<_, ClientPrice>(&format!(
            "INSERT INTO client_prices (user_id, product_id, custom_price_usd, markup_percentage)
             VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8)
             RETURNING {CLIENT_PRICE_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.product_id)
        .bind(new.custom_price_usd)
        .bind(new.markup_percentage)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Client price for this product already exists"))?;

        append_history(
            &mut tx,
            new.product_id,
            Some(new.user_id),
            None,
            new.custom_price_usd,
            ChangeType::ClientPrice,
            actor_id,
        )
        .await?;

        tx.commit().await?;
        Ok(price)
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        id: i64,
        changes: ClientPriceChanges,
        old_price_usd: f64,
        actor_id: i64,
    ) -> Result<Option<ClientPrice>, AppError> {
        let mut tx = self.db_pool.begin().await?;

        let Some(price) = sqlx::query_as::<_, ClientPrice>(&format!(
            "UPDATE client_prices SET
                custom_price_usd = $1::FLOAT8,
                markup_percentage = $2::FLOAT8,
                discount_percentage = NULL,
                updated_at = NOW()
             WHERE id = $3
             RETURNING {CLIENT_PRICE_COLUMNS}"
        ))
        .bind(changes.custom_price_usd)
        .bind(changes.markup_percentage)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };
        ensure_above_base(&mut tx, price.product_id, changes.custom_price_usd).await?;

        append_history(
            &mut tx,
            price.product_id,
            Some(price.user_id),
            Some(old_price_usd),
            changes.custom_price_usd,
            ChangeType::ClientPrice,
            actor_id,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(price))
    }

    #[instrument(skip(self))]
    async fn upsert_custom_price(
        &self,
        user_id: i64,
        product_id: i64,
        old_price_usd: f64,
        new_price_usd: f64,
        change_type: ChangeType,
        actor_id: i64,
    ) -> Result<ClientPrice, AppError> {
        let mut tx = self.db_pool.begin().await?;
        ensure_above_base(&mut tx, product_id, new_price_usd).await?;

        let price = sqlx::query_as::<_, ClientPrice>(&format!(
            "INSERT INTO client_prices (user_id, product_id, custom_price_usd)
             VALUES ($1, $2, $3::FLOAT8)
             ON CONFLICT ON CONSTRAINT client_prices_user_product_key DO UPDATE SET
                custom_price_usd = EXCLUDED.custom_price_usd,
                markup_percentage = NULL,
                discount_percentage = NULL,
                updated_at = NOW()
             RETURNING {CLIENT_PRICE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(new_price_usd)
        .fetch_one(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            product_id,
            Some(user_id),
            Some(old_price_usd),
            new_price_usd,
            change_type,
            actor_id,
        )
        .await?;

        tx.commit().await?;
        Ok(price)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM client_prices WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PriceHistoryService for PgStore {
    async fn list(&self, filter: &PriceHistoryFilter) -> Result<Vec<PriceHistory>, AppError> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {HISTORY_COLUMNS} FROM price_history WHERE 1=1"));
        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(change_type) = filter.change_type {
            query.push(" AND change_type = ").push_bind(change_type.as_str());
        }
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit);

        Ok(query.build_query_as::<PriceHistory>().fetch_all(&self.db_pool).await?)
    }
}

#[async_trait]
impl UserService for PgStore {
    async fn get(&self, id: i64) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn find_by_invite_token(&self, token: &str) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE invite_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn list(&self, status: Option<UserStatus>) -> Result<Vec<UserProfile>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1"));
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        Ok(query.build_query_as::<UserProfile>().fetch_all(&self.db_pool).await?)
    }

    async fn any_admin(&self) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE is_admin)")
            .fetch_one(&self.db_pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self, new), fields(email = %new.email))]
    async fn create(&self, new: NewUser) -> Result<UserProfile, AppError> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO users (email, company_name, is_admin, status, password_hash, invite_token)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.company_name)
        .bind(new.is_admin)
        .bind(new.status.as_str())
        .bind(&new.password_hash)
        .bind(&new.invite_token)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_unique_violation(e, "A user with this email already exists"))
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE users SET
                status = $1,
                invite_token = CASE WHEN $1 = 'active' THEN invite_token ELSE NULL END,
                updated_at = NOW()
             WHERE id = $2
             RETURNING {USER_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn accept_invite(&self, id: i64, password_hash: &str) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE users SET
                password_hash = $1,
                status = 'active',
                invite_token = NULL,
                updated_at = NOW()
             WHERE id = $2
               AND invite_token IS NOT NULL
               AND status IN ('pending', 'active')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }
}
