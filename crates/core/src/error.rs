//! Cross-cutting domain errors. Geo and backup rules have their own enums
//! in [`crate::geo`], [`crate::geo_chain`] and [`crate::backup`].

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: DbId },

    /// Caller-correctable input problem (bad enum value, weak password, ...).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    /// Infrastructure failure surfaced through a core trait (e.g. a lookup).
    #[error("Internal error: {0}")]
    Internal(String),
}
