// DTO modules
pub mod auth;
pub mod category;
pub mod client_price;
pub mod price_history;
pub mod product;
