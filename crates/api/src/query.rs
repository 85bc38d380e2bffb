//! Shared query-string helpers.

use pollsite_core::flag::parse_flag;
use serde::{Deserialize, Deserializer};

/// `deserialize_with` adapter for [`parse_flag`], for use with
/// `#[serde(default, deserialize_with = "flag")]`.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid flag value '{raw}'")))
}
