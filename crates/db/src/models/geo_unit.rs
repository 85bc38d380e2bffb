//! Geo unit rows and DTOs.

use pollsite_core::geo::GeoRecord;
use pollsite_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `geo_units`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeoUnit {
    pub id: DbId,
    pub unit_type: String,
    pub name: String,
    pub slug: String,
    pub code: Option<String>,
    pub parent_id: Option<DbId>,
    /// Root-first ids of every ancestor.
    pub ancestors: Vec<DbId>,
    pub sort: i32,
    pub active: bool,
    pub shape: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GeoRecord for GeoUnit {
    fn id(&self) -> DbId {
        self.id
    }
    fn unit_type(&self) -> &str {
        &self.unit_type
    }
    fn parent_id(&self) -> Option<DbId> {
        self.parent_id
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn ancestors(&self) -> &[DbId] {
        &self.ancestors
    }
}

/// Insert DTO. `slug` and `ancestors` are derived by the caller.
#[derive(Debug, Clone)]
pub struct NewGeoUnit {
    pub unit_type: String,
    pub name: String,
    pub slug: String,
    pub code: Option<String>,
    pub parent_id: Option<DbId>,
    pub ancestors: Vec<DbId>,
    pub sort: i32,
    pub active: bool,
    pub shape: Option<serde_json::Value>,
}

/// Patch DTO. Placement changes go through re-parent instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGeoUnit {
    pub name: Option<String>,
    #[serde(skip)]
    pub slug: Option<String>,
    pub code: Option<String>,
    pub sort: Option<i32>,
    pub active: Option<bool>,
    pub shape: Option<serde_json::Value>,
}

/// List filters for `GET /api/geo/units`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoUnitFilter {
    #[serde(rename = "type")]
    pub unit_type: Option<String>,
    pub parent_id: Option<DbId>,
    #[serde(default)]
    pub root_only: bool,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Filters for entities that carry geo references (committees, centers).
///
/// Kept flat rather than flattening `GeoChainInput`, since query-string
/// decoding cannot parse numbers through `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoRefFilter {
    pub city_id: Option<DbId>,
    pub upazila_id: Option<DbId>,
    pub union_id: Option<DbId>,
    pub ward_id: Option<DbId>,
    #[serde(default)]
    pub include_inactive: bool,
}
