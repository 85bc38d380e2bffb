//! Handlers for `/admin/users`. Admin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pollsite_core::audit::{action_types, entity_types};
use pollsite_core::error::CoreError;
use pollsite_core::roles::VALID_ROLES;
use pollsite_core::types::DbId;
use pollsite_db::models::user::{CreateUser, UserResponse};
use pollsite_db::repositories::{SessionRepo, UserRepo};
use serde::Deserialize;

use crate::audit_trail;
use crate::auth::password::{check_password_policy, hash_password};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Username must not be empty".into(),
        )));
    }
    if !VALID_ROLES.contains(&input.role.as_str()) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role '{}'. Expected one of: {}",
            input.role,
            VALID_ROLES.join(", ")
        ))));
    }
    check_password_policy(&input.password)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            email: input.email.trim().to_string(),
            password_hash,
            role: input.role,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, admin_id = admin.user_id, "User created");
    audit_trail::record(
        &state,
        Some(admin.user_id),
        action_types::ENTITY_CREATE,
        Some(entity_types::USER),
        Some(user.id),
        Some(serde_json::json!({ "username": user.username, "role": user.role })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(DataResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// DELETE /api/admin/users/{id}
///
/// Soft delete: the account is deactivated and its sessions revoked.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "Administrators cannot deactivate their own account".into(),
        )));
    }

    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    tracing::info!(user_id = id, admin_id = admin.user_id, "User deactivated");
    audit_trail::record(
        &state,
        Some(admin.user_id),
        action_types::ENTITY_DELETE,
        Some(entity_types::USER),
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
