use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pollsite_core::backup::BackupError;
use pollsite_core::error::CoreError;
use pollsite_core::geo::GeoError;
use pollsite_core::geo_chain::GeoChainError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of `pollsite_core` and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce `{ "error", "code" }`
/// JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A broken geo-chain rule on a committee or center write.
    #[error(transparent)]
    GeoChain(#[from] GeoChainError),

    /// A geo tree mutation rule violation.
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body larger than `MAX_UPLOAD_BYTES`.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Map an extractor rejection, keeping 413 distinct from other bad input.
    pub fn from_rejection(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(message)
        } else {
            AppError::BadRequest(message)
        }
    }
}

type Mapped = (StatusCode, &'static str, String);

fn internal(what: &str, detail: &dyn std::fmt::Display) -> Mapped {
    tracing::error!(error = %detail, "{what}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::GeoChain(err) => match err {
                GeoChainError::Lookup(msg) => internal("Geo lookup failed", msg),
                other => (StatusCode::BAD_REQUEST, "INVALID_GEO_CHAIN", other.to_string()),
            },
            AppError::Geo(err) => classify_geo_error(err),
            AppError::Backup(err) => match err {
                BackupError::InvalidSnapshot(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_SNAPSHOT", err.to_string())
                }
                BackupError::Decode(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_SNAPSHOT", err.to_string())
                }
                BackupError::UnknownCollection(_) => {
                    (StatusCode::BAD_REQUEST, "UNKNOWN_COLLECTION", err.to_string())
                }
                BackupError::Encode(_) | BackupError::Store(_) => internal("Backup error", err),
            },
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::InternalError(msg) => internal("Internal error", msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> Mapped {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => internal("Internal core error", msg),
    }
}

fn classify_geo_error(err: &GeoError) -> Mapped {
    let (status, code) = match err {
        GeoError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE"),
        GeoError::HasChildren { .. } => (StatusCode::CONFLICT, "HAS_CHILDREN"),
        GeoError::InUse { .. } => (StatusCode::CONFLICT, "IN_USE"),
        GeoError::InvalidPlacement { .. } => (StatusCode::BAD_REQUEST, "INVALID_PLACEMENT"),
        GeoError::Cycle { .. } => (StatusCode::BAD_REQUEST, "CYCLE"),
        GeoError::NotSiblings { .. } => (StatusCode::BAD_REQUEST, "NOT_SIBLINGS"),
        GeoError::Invalid(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
    };
    (status, code, err.to_string())
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations on `uq_`-prefixed constraints map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Mapped {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            internal("Database error", db_err)
        }
        other => internal("Database error", other),
    }
}
