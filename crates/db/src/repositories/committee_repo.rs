//! Repository for the `committees` table.

use pollsite_core::types::DbId;
use sqlx::PgPool;

use crate::models::committee::{Committee, CreateCommittee, UpdateCommittee};
use crate::models::geo_unit::GeoRefFilter;
use crate::repositories::geo_ref_conditions;

const COLUMNS: &str = "id, name, committee_type, city_id, upazila_id, union_id, ward_id, \
                       active, created_at, updated_at";

pub struct CommitteeRepo;

impl CommitteeRepo {
    pub async fn create(pool: &PgPool, input: &CreateCommittee) -> Result<Committee, sqlx::Error> {
        let query = format!(
            "INSERT INTO committees
                (name, committee_type, city_id, upazila_id, union_id, ward_id, active)
             VALUES ($1, COALESCE($2, 'general'), $3, $4, $5, $6, COALESCE($7, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Committee>(&query)
            .bind(&input.name)
            .bind(&input.committee_type)
            .bind(input.geo.city_id)
            .bind(input.geo.upazila_id)
            .bind(input.geo.union_id)
            .bind(input.geo.ward_id)
            .bind(input.active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Committee>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM committees WHERE id = $1");
        sqlx::query_as::<_, Committee>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &GeoRefFilter) -> Result<Vec<Committee>, sqlx::Error> {
        let (where_clause, binds) = geo_ref_conditions(filter);
        let query = format!("SELECT {COLUMNS} FROM committees {where_clause} ORDER BY name, id");
        let mut q = sqlx::query_as::<_, Committee>(&query);
        for id in binds {
            q = q.bind(id);
        }
        q.fetch_all(pool).await
    }

    /// Apply an update whose geo ids are already the full, validated chain.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCommittee,
    ) -> Result<Option<Committee>, sqlx::Error> {
        let query = format!(
            "UPDATE committees SET
                name = COALESCE($2, name),
                committee_type = COALESCE($3, committee_type),
                city_id = $4,
                upazila_id = $5,
                union_id = $6,
                ward_id = $7,
                active = COALESCE($8, active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Committee>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.committee_type)
            .bind(input.geo.city_id)
            .bind(input.geo.upazila_id)
            .bind(input.geo.union_id)
            .bind(input.geo.ward_id)
            .bind(input.active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM committees WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
