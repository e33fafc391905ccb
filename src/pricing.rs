//! Price arithmetic shared by the catalog views and the bulk adjustment.

use std::collections::HashMap;

use crate::models::client_price::ClientPrice;
use crate::models::product::Product;

/// Rounds a USD amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Price a client actually pays for a product.
///
/// A custom price wins; otherwise a legacy discount is applied to the base
/// price; otherwise the base price stands.
pub fn effective_price(base_price_usd: f64, client_price: Option<&ClientPrice>) -> f64 {
    match client_price {
        Some(ClientPrice { custom_price_usd: Some(custom), .. }) => *custom,
        Some(ClientPrice { discount_percentage: Some(discount), .. }) => {
            round_cents(base_price_usd * (1.0 - discount / 100.0))
        }
        _ => base_price_usd,
    }
}

/// Custom price implied by a markup over base.
pub fn price_from_markup(base_price_usd: f64, markup_percentage: f64) -> f64 {
    round_cents(base_price_usd * (1.0 + markup_percentage / 100.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub product_id: i64,
    pub product_code: String,
    pub old_price_usd: f64,
    pub new_price_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkPlan {
    pub updates: Vec<PlannedUpdate>,
    pub errors: Vec<String>,
}

/// Computes the bulk adjustment for one client without touching storage.
///
/// Inactive products are ignored. Results below a product's base price are
/// skipped and reported, never clamped.
pub fn plan_bulk_adjustment(products: &[Product], client_prices: &[ClientPrice], percentage: f64) -> BulkPlan {
    let by_product: HashMap<i64, &ClientPrice> =
        client_prices.iter().map(|cp| (cp.product_id, cp)).collect();

    let mut active: Vec<&Product> = products.iter().filter(|p| p.active).collect();
    active.sort_by(|a, b| a.code.cmp(&b.code));

    let factor = 1.0 + percentage / 100.0;
    let mut plan = BulkPlan::default();

    for product in active {
        let current = effective_price(product.base_price_usd, by_product.get(&product.id).copied());
        let next = round_cents(current * factor);

        if next < product.base_price_usd {
            plan.errors.push(format!(
                "{}: new price {:.2} is below base price {:.2}",
                product.code, next, product.base_price_usd
            ));
            continue;
        }

        plan.updates.push(PlannedUpdate {
            product_id: product.id,
            product_code: product.code.clone(),
            old_price_usd: current,
            new_price_usd: next,
        });
    }

    plan
}
