//! Geo-chain validation.
//!
//! Entities such as committees and voting centers carry up to four geo
//! references (`city_id`, `upazila_id`, `union_id`, `ward_id`). Before they
//! are persisted, [`validate_geo_chain`] checks that the supplied ids form a
//! single coherent path through the unit tree and hands back the resolved
//! records.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::{descends_from, GeoRecord, GeoUnitType};
use crate::types::DbId;

/// Candidate geo references. Absent ids mean "not specified".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoChainInput {
    pub city_id: Option<DbId>,
    pub upazila_id: Option<DbId>,
    pub union_id: Option<DbId>,
    pub ward_id: Option<DbId>,
}

impl GeoChainInput {
    /// True when no slot is filled.
    pub fn is_empty(&self) -> bool {
        self.city_id.is_none()
            && self.upazila_id.is_none()
            && self.union_id.is_none()
            && self.ward_id.is_none()
    }

    /// Chain to validate for a partial update of an entity stored with
    /// `self`. A patch naming any geo id replaces the whole chain, so moving
    /// from the city branch to the upazila branch does not leave a stale
    /// city id behind; an empty patch keeps the stored chain.
    pub fn merged_with(&self, patch: &GeoChainInput) -> GeoChainInput {
        if patch.is_empty() {
            *self
        } else {
            *patch
        }
    }
}

/// The resolved units of a valid chain, `None` where not supplied.
#[derive(Debug, Clone, Serialize)]
pub struct GeoChain<U> {
    pub city: Option<U>,
    pub upazila: Option<U>,
    pub union: Option<U>,
    pub ward: Option<U>,
}

/// Why a chain was rejected. Everything except `Lookup` is caller-correctable.
#[derive(Debug, thiserror::Error)]
pub enum GeoChainError {
    #[error("Geo unit {id} is a {actual}, not a {}", .expected.label())]
    TypeMismatch {
        expected: GeoUnitType,
        id: DbId,
        actual: String,
    },

    #[error("A city corporation and an upazila cannot both be selected")]
    ConflictingBranches,

    #[error("A {} cannot be selected together with a {}", .slot.label(), .branch.label())]
    InvalidForBranch {
        slot: GeoUnitType,
        branch: GeoUnitType,
    },

    #[error("{} {id} does not belong to {} {ancestor_id}", capitalize(.slot.label()), .ancestor.label())]
    NotDescendant {
        slot: GeoUnitType,
        id: DbId,
        ancestor: GeoUnitType,
        ancestor_id: DbId,
    },

    #[error("Either a city corporation or an upazila must be selected")]
    MissingRoot,

    #[error("Geo unit {0} not found")]
    NotFound(DbId),

    #[error("Geo unit lookup failed: {0}")]
    Lookup(String),
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Point lookups of geo units by id.
pub trait GeoUnitLookup: Send + Sync {
    type Unit: GeoRecord + Send;

    fn find_unit(
        &self,
        id: DbId,
    ) -> impl Future<Output = Result<Option<Self::Unit>, CoreError>> + Send;
}

/// Check that `input` describes one valid path through the geo tree.
///
/// Rules, in order:
/// 1. City and upazila are mutually exclusive (`ConflictingBranches`).
/// 2. One of them must be present (`MissingRoot`).
/// 3. A union is only valid on the upazila branch (`InvalidForBranch`).
/// 4. Every supplied id must exist and have the type of its slot.
/// 5. Union must sit under the upazila; ward under the city, or under the
///    upazila and (when given) the union (`NotDescendant`).
///
/// The presence-only rules run before any lookup, so e.g. supplying both a
/// city and an upazila fails the same way whatever the other ids are. The
/// remaining lookups are independent and run concurrently.
pub async fn validate_geo_chain<L: GeoUnitLookup>(
    lookup: &L,
    input: &GeoChainInput,
) -> Result<GeoChain<L::Unit>, GeoChainError> {
    if input.city_id.is_some() && input.upazila_id.is_some() {
        return Err(GeoChainError::ConflictingBranches);
    }
    if input.city_id.is_none() && input.upazila_id.is_none() {
        return Err(GeoChainError::MissingRoot);
    }
    if input.city_id.is_some() && input.union_id.is_some() {
        return Err(GeoChainError::InvalidForBranch {
            slot: GeoUnitType::Union,
            branch: GeoUnitType::CityCorporation,
        });
    }

    let (city, upazila, union, ward) = futures::try_join!(
        load_slot(lookup, input.city_id, GeoUnitType::CityCorporation),
        load_slot(lookup, input.upazila_id, GeoUnitType::Upazila),
        load_slot(lookup, input.union_id, GeoUnitType::Union),
        load_slot(lookup, input.ward_id, GeoUnitType::Ward),
    )?;

    if let Some(city) = &city {
        if let Some(ward) = &ward {
            require_descent(ward, GeoUnitType::Ward, city, GeoUnitType::CityCorporation)?;
        }
    }

    if let Some(upazila) = &upazila {
        if let Some(union) = &union {
            require_descent(union, GeoUnitType::Union, upazila, GeoUnitType::Upazila)?;
        }
        if let Some(ward) = &ward {
            require_descent(ward, GeoUnitType::Ward, upazila, GeoUnitType::Upazila)?;
            if let Some(union) = &union {
                require_descent(ward, GeoUnitType::Ward, union, GeoUnitType::Union)?;
            }
        }
    }

    Ok(GeoChain {
        city,
        upazila,
        union,
        ward,
    })
}

async fn load_slot<L: GeoUnitLookup>(
    lookup: &L,
    id: Option<DbId>,
    expected: GeoUnitType,
) -> Result<Option<L::Unit>, GeoChainError> {
    let Some(id) = id else {
        return Ok(None);
    };
    let unit = lookup
        .find_unit(id)
        .await
        .map_err(|e| GeoChainError::Lookup(e.to_string()))?
        .ok_or(GeoChainError::NotFound(id))?;
    if unit.unit_type() != expected.as_str() {
        return Err(GeoChainError::TypeMismatch {
            expected,
            id,
            actual: unit.unit_type().to_string(),
        });
    }
    Ok(Some(unit))
}

fn require_descent<U: GeoRecord>(
    unit: &U,
    slot: GeoUnitType,
    ancestor: &U,
    ancestor_slot: GeoUnitType,
) -> Result<(), GeoChainError> {
    if descends_from(unit, ancestor.id()) {
        Ok(())
    } else {
        Err(GeoChainError::NotDescendant {
            slot,
            id: unit.id(),
            ancestor: ancestor_slot,
            ancestor_id: ancestor.id(),
        })
    }
}
