//! Voting center rows and DTOs.

use pollsite_core::geo_chain::GeoChainInput;
use pollsite_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Center {
    pub id: DbId,
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub voter_count: Option<i32>,
    pub city_id: Option<DbId>,
    pub upazila_id: Option<DbId>,
    pub union_id: Option<DbId>,
    pub ward_id: Option<DbId>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Center {
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
pub struct CreateCenter {
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub voter_count: Option<i32>,
    #[serde(flatten)]
    pub geo: GeoChainInput,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCenter {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub voter_count: Option<i32>,
    #[serde(flatten)]
    pub geo: GeoChainInput,
    pub active: Option<bool>,
}
