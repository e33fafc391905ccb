use bcrypt::{hash, verify};
use crate::error::AppError;

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::internal(format!("Hash error: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash).map_err(|e| AppError::internal(format!("Password verify error: {e}")))
}

/// Opaque single-use token for invitation links.
pub fn generate_invite_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
