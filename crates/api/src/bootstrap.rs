//! Startup tasks that run before the server accepts requests.

use pollsite_core::roles::ROLE_ADMIN;
use pollsite_db::models::user::CreateUser;
use pollsite_db::repositories::UserRepo;
use pollsite_db::DbPool;

use crate::auth::password::hash_password;
use crate::config::BootstrapAdmin;
use crate::error::{AppError, AppResult};

/// Create the configured admin account if no user with that name exists.
///
/// Returns `true` when an account was created. The password policy is not
/// applied here; the operator chose the value in the environment.
pub async fn ensure_admin(pool: &DbPool, admin: &BootstrapAdmin) -> AppResult<bool> {
    if UserRepo::find_by_username(pool, &admin.username)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: admin.username.clone(),
            email: format!("{}@localhost", admin.username),
            password_hash,
            role: ROLE_ADMIN.to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
    Ok(true)
}
