//! Role gates for handlers.
//!
//! Each wrapper resolves [`AuthUser`] first (401 on a missing or bad token)
//! and then rejects with 403 when the role is insufficient. Taking one of
//! these as a handler argument is the whole authorization check; there is no
//! route-level auth layer.
//!
//! | Extractor       | Roles            | Used by                              |
//! |-----------------|------------------|--------------------------------------|
//! | `RequireAdmin`  | admin            | users, audit log, backup and restore |
//! | `RequireEditor` | editor, admin    | geo, committee and center writes     |
//! | `RequireAuth`   | any              | reads, chain validation, `/auth/me`  |

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pollsite_core::error::CoreError;
use pollsite_core::roles::{can_edit, ROLE_ADMIN};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn export_backup(RequireAdmin(admin): RequireAdmin) -> AppResult<Response> {
///     tracing::info!(admin_id = admin.user_id, "exporting");
///     // ...
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires `editor` or `admin` (see [`can_edit`]). Rejects with 403 Forbidden
/// otherwise. Viewers hitting a write endpoint land here.
///
/// ```ignore
/// async fn delete_unit(
///     RequireEditor(user): RequireEditor,
///     Path(id): Path<DbId>,
/// ) -> AppResult<StatusCode> {
///     // user.role is "editor" or "admin"
///     Ok(StatusCode::NO_CONTENT)
/// }
/// ```
pub struct RequireEditor(pub AuthUser);

impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_edit(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Editor or Admin role required".into(),
            )));
        }
        Ok(RequireEditor(user))
    }
}

/// Requires any authenticated user, whatever the role.
///
/// Equivalent to taking [`AuthUser`] directly; the name makes read endpoints
/// say that they are not public.
///
/// ```ignore
/// async fn get_unit(RequireAuth(_user): RequireAuth) -> AppResult<Json<DataResponse<GeoUnit>>> {
///     // ...
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state)
            .await
            .map(RequireAuth)
    }
}
