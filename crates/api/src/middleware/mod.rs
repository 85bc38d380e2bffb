//! Request extractors for authentication and role checks.
//!
//! - [`auth::AuthUser`]: the caller, decoded from a Bearer token.
//! - [`rbac::RequireAdmin`], [`rbac::RequireEditor`], [`rbac::RequireAuth`]:
//!   role gates built on top of it.

pub mod auth;
pub mod rbac;
