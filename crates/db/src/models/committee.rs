//! Committee rows and DTOs.

use pollsite_core::geo_chain::GeoChainInput;
use pollsite_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Committee {
    pub id: DbId,
    pub name: String,
    pub committee_type: String,
    pub city_id: Option<DbId>,
    pub upazila_id: Option<DbId>,
    pub union_id: Option<DbId>,
    pub ward_id: Option<DbId>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Committee {
    pub fn geo_chain(&self) -> GeoChainInput {
        GeoChainInput {
            city_id: self.city_id,
            upazila_id: self.upazila_id,
            union_id: self.union_id,
            ward_id: self.ward_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommittee {
    pub name: String,
    pub committee_type: Option<String>,
    #[serde(flatten)]
    pub geo: GeoChainInput,
    pub active: Option<bool>,
}

/// Patch DTO. Geo ids are applied as a whole chain: the handler merges the
/// patch with the stored ids, validates, and writes all four.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommittee {
    pub name: Option<String>,
    pub committee_type: Option<String>,
    #[serde(flatten)]
    pub geo: GeoChainInput,
    pub active: Option<bool>,
}
