//! Request payload checks. Every failure is a 400 with a readable message.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::dtos::auth::{AcceptInviteRequest, InviteRequest, LoginRequest, RegisterRequest, UpdateUserStatusRequest};
use crate::dtos::category::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::dtos::client_price::{BulkAdjustRequest, CreateClientPriceRequest, UpdateClientPriceRequest};
use crate::dtos::product::{CreateProductRequest, UpdateProductRequest};
use crate::error::AppError;
use crate::models::user::UserStatus;
use crate::pricing::round_cents;

pub const MAX_PRICE_USD: f64 = 1_000_000_000.0;
pub const MIN_PASSWORD_LEN: usize = 8;

pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// JSON body that has been deserialized and validated. Malformed bodies are
/// reported as 400 rather than axum's default 422.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub fn product_code(raw: &str) -> Result<(), AppError> {
    let code = normalize_code(raw);
    if !(2..=32).contains(&code.len()) {
        return Err(AppError::validation("Product code must be 2 to 32 characters"));
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(AppError::validation(
            "Product code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::validation(format!("{field} must be at most {max_len} characters")));
    }
    Ok(())
}

/// Prices are stored in cents, so anything that rounds to zero is rejected.
pub fn price(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || round_cents(value) <= 0.0 {
        return Err(AppError::validation(format!("{field} must be at least 0.01")));
    }
    if value > MAX_PRICE_USD {
        return Err(AppError::validation(format!("{field} is too large")));
    }
    Ok(())
}

pub fn markup(value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(0.0..=1000.0).contains(&value) {
        return Err(AppError::validation("markup_percentage must be between 0 and 1000"));
    }
    Ok(())
}

pub fn adjustment_percentage(value: f64) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation("percentage must be a number"));
    }
    if value <= -100.0 || value > 1000.0 {
        return Err(AppError::validation("percentage must be greater than -100 and at most 1000"));
    }
    Ok(())
}

pub fn email(raw: &str) -> Result<(), AppError> {
    let email = raw.trim();
    let valid = email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !valid {
        return Err(AppError::validation("A valid email address is required"));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn positive_id(field: &str, value: i64) -> Result<(), AppError> {
    if value <= 0 {
        return Err(AppError::validation(format!("{field} must be a positive id")));
    }
    Ok(())
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() {
            return Err(AppError::validation("Email required"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("Password required"));
        }
        Ok(())
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        email(&self.email)?;
        password(&self.password)?;
        required_text("company_name", &self.company_name, 200)
    }
}

impl Validate for InviteRequest {
    fn validate(&self) -> Result<(), AppError> {
        email(&self.email)?;
        required_text("company_name", &self.company_name, 200)
    }
}

impl Validate for AcceptInviteRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.token.trim().is_empty() {
            return Err(AppError::validation("Invite token required"));
        }
        password(&self.password)
    }
}

impl Validate for UpdateUserStatusRequest {
    fn validate(&self) -> Result<(), AppError> {
        UserStatus::parse(&self.status)
            .map(|_| ())
            .ok_or_else(|| AppError::validation("Invalid status. Use: pending, active, rejected, or suspended"))
    }
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        product_code(&self.code)?;
        required_text("name", &self.name, 200)?;
        price("base_price_usd", self.base_price_usd)?;
        if let Some(category_id) = self.category_id {
            positive_id("category_id", category_id)?;
        }
        Ok(())
    }
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(code) = &self.code {
            product_code(code)?;
        }
        if let Some(name) = &self.name {
            required_text("name", name, 200)?;
        }
        if let Some(base_price) = self.base_price_usd {
            price("base_price_usd", base_price)?;
        }
        if let Some(category_id) = self.category_id {
            positive_id("category_id", category_id)?;
        }
        Ok(())
    }
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_text("name", &self.name, 100)
    }
}

impl Validate for UpdateCategoryRequest {
    fn validate(&self) -> Result<(), AppError> {
        match &self.name {
            Some(name) => required_text("name", name, 100),
            None => Ok(()),
        }
    }
}

fn custom_or_markup(custom_price_usd: Option<f64>, markup_percentage: Option<f64>) -> Result<(), AppError> {
    match (custom_price_usd, markup_percentage) {
        (Some(_), Some(_)) => Err(AppError::validation(
            "Provide either custom_price_usd or markup_percentage, not both",
        )),
        (None, None) => Err(AppError::validation("custom_price_usd or markup_percentage is required")),
        (Some(custom), None) => price("custom_price_usd", custom),
        (None, Some(pct)) => markup(pct),
    }
}

impl Validate for CreateClientPriceRequest {
    fn validate(&self) -> Result<(), AppError> {
        positive_id("user_id", self.user_id)?;
        positive_id("product_id", self.product_id)?;
        custom_or_markup(self.custom_price_usd, self.markup_percentage)
    }
}

impl Validate for UpdateClientPriceRequest {
    fn validate(&self) -> Result<(), AppError> {
        custom_or_markup(self.custom_price_usd, self.markup_percentage)
    }
}

impl Validate for BulkAdjustRequest {
    fn validate(&self) -> Result<(), AppError> {
        positive_id("user_id", self.user_id)?;
        adjustment_percentage(self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_codes() {
        assert!(product_code("ab-12").is_ok());
        assert!(product_code(" SKU_9 ").is_ok());
        assert!(product_code("A").is_err());
        assert!(product_code("has space").is_err());
        assert!(product_code(&"X".repeat(33)).is_err());
        assert_eq!(normalize_code(" ab-12 "), "AB-12");
    }

    #[test]
    fn prices_must_be_positive_and_finite() {
        assert!(price("p", 0.01).is_ok());
        assert!(price("p", 0.0).is_err());
        assert!(price("p", 0.004).is_err());
        assert!(price("p", -5.0).is_err());
        assert!(price("p", f64::NAN).is_err());
        assert!(price("p", f64::INFINITY).is_err());
        assert!(price("p", MAX_PRICE_USD * 2.0).is_err());
    }

    #[test]
    fn emails() {
        assert!(email("buyer@acme.test").is_ok());
        assert!(email("buyer@localhost").is_err());
        assert!(email("@acme.test").is_err());
        assert!(email("a b@acme.test").is_err());
        assert!(email("a@b@acme.test").is_err());
        assert_eq!(normalize_email(" Buyer@ACME.test "), "buyer@acme.test");
    }

    #[test]
    fn adjustment_percentage_bounds() {
        assert!(adjustment_percentage(10.0).is_ok());
        assert!(adjustment_percentage(-99.5).is_ok());
        assert!(adjustment_percentage(-100.0).is_err());
        assert!(adjustment_percentage(1000.5).is_err());
    }

    #[test]
    fn client_price_needs_exactly_one_pricing_mode() {
        let both = CreateClientPriceRequest { user_id: 1, product_id: 2, custom_price_usd: Some(5.0), markup_percentage: Some(5.0) };
        let neither = CreateClientPriceRequest { user_id: 1, product_id: 2, custom_price_usd: None, markup_percentage: None };
        let markup_only = CreateClientPriceRequest { user_id: 1, product_id: 2, custom_price_usd: None, markup_percentage: Some(15.0) };
        assert!(both.validate().is_err());
        assert!(neither.validate().is_err());
        assert!(markup_only.validate().is_ok());
    }

    #[test]
    fn status_values() {
        assert!(UpdateUserStatusRequest { status: "suspended".into() }.validate().is_ok());
        assert!(UpdateUserStatusRequest { status: "banned".into() }.validate().is_err());
    }
}
