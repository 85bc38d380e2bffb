//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check constraint in
//! `20260301000001_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_VIEWER: &str = "viewer";

/// All assignable roles.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_EDITOR, ROLE_VIEWER];

/// Whether `role` may create or modify reference data.
pub fn can_edit(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_EDITOR
}
