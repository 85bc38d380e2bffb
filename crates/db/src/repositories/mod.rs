//! Repository layer.
//!
//! Each repository is a zero-sized struct whose async methods take `&PgPool`
//! first and return `sqlx::Error` untouched; mapping to HTTP happens in the
//! API crate.

pub mod audit_repo;
pub mod center_repo;
pub mod committee_repo;
pub mod geo_unit_repo;
pub mod session_repo;
pub mod user_repo;

pub use audit_repo::AuditLogRepo;
pub use center_repo::CenterRepo;
pub use committee_repo::CommitteeRepo;
pub use geo_unit_repo::GeoUnitRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;

use pollsite_core::types::DbId;

use crate::models::geo_unit::GeoRefFilter;

/// WHERE clause and bind values for a [`GeoRefFilter`] over a table with
/// `city_id`, `upazila_id`, `union_id`, `ward_id` and `active` columns.
pub(crate) fn geo_ref_conditions(filter: &GeoRefFilter) -> (String, Vec<DbId>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<DbId> = Vec::new();

    let slots = [
        ("city_id", filter.city_id),
        ("upazila_id", filter.upazila_id),
        ("union_id", filter.union_id),
        ("ward_id", filter.ward_id),
    ];
    for (column, value) in slots {
        if let Some(id) = value {
            binds.push(id);
            conditions.push(format!("{column} = ${}", binds.len()));
        }
    }
    if !filter.include_inactive {
        conditions.push("active = true".to_string());
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), binds)
    }
}
