//! Repository for the `centers` table.

use pollsite_core::types::DbId;
use sqlx::PgPool;

use crate::models::center::{Center, CreateCenter, UpdateCenter};
use crate::models::geo_unit::GeoRefFilter;
use crate::repositories::geo_ref_conditions;

const COLUMNS: &str = "id, name, code, address, voter_count, city_id, upazila_id, union_id, \
                       ward_id, active, created_at, updated_at";

pub struct CenterRepo;

impl CenterRepo {
    pub async fn create(pool: &PgPool, input: &CreateCenter) -> Result<Center, sqlx::Error> {
        let query = format!(
            "INSERT INTO centers
                (name, code, address, voter_count, city_id, upazila_id, union_id, ward_id, active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Center>(&query)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.address)
            .bind(input.voter_count)
            .bind(input.geo.city_id)
            .bind(input.geo.upazila_id)
            .bind(input.geo.union_id)
            .bind(input.geo.ward_id)
            .bind(input.active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Center>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM centers WHERE id = $1");
        sqlx::query_as::<_, Center>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &GeoRefFilter) -> Result<Vec<Center>, sqlx::Error> {
        let (where_clause, binds) = geo_ref_conditions(filter);
        let query = format!("SELECT {COLUMNS} FROM centers {where_clause} ORDER BY name, id");
        let mut q = sqlx::query_as::<_, Center>(&query);
        for id in binds {
            q = q.bind(id);
        }
        q.fetch_all(pool).await
    }

    /// Apply an update whose geo ids are already the full, validated chain.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCenter,
    ) -> Result<Option<Center>, sqlx::Error> {
        let query = format!(
            "UPDATE centers SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                address = COALESCE($4, address),
                voter_count = COALESCE($5, voter_count),
                city_id = $6,
                upazila_id = $7,
                union_id = $8,
                ward_id = $9,
                active = COALESCE($10, active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Center>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.address)
            .bind(input.voter_count)
            .bind(input.geo.city_id)
            .bind(input.geo.upazila_id)
            .bind(input.geo.union_id)
            .bind(input.geo.ward_id)
            .bind(input.active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM centers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
