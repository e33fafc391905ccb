use tracing::info;

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::models::user::{NewUser, UserStatus};
use crate::state::AppState;
use crate::validation::{self, normalize_email};

/// Creates the first admin account when none exists yet.
///
/// Returns `true` if an account was created.
pub async fn ensure_admin(state: &AppState) -> Result<bool, AppError> {
    let Some(admin) = state.config.bootstrap_admin.clone() else {
        return Ok(false);
    };
    if state.users.any_admin().await? {
        return Ok(false);
    }

    validation::email(&admin.email)?;
    validation::password(&admin.password)?;

    let email = normalize_email(&admin.email);
    let password_hash = hash_password(&admin.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            email,
            company_name: "Administrator".to_string(),
            is_admin: true,
            status: UserStatus::Active,
            password_hash: Some(password_hash),
            invite_token: None,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "Bootstrap admin created");
    Ok(true)
}
