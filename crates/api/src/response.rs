//! Shared response envelope.
//!
//! Entity endpoints answer with `{ "data": ... }`. Backup restore answers with
//! its report unwrapped, and export with the file itself.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
