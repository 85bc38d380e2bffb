//! Repository for the `geo_units` table.

use pollsite_core::types::DbId;
use sqlx::PgPool;

use crate::models::geo_unit::{GeoUnit, GeoUnitFilter, NewGeoUnit, UpdateGeoUnit};

const COLUMNS: &str = "id, unit_type, name, slug, code, parent_id, ancestors, sort, active, \
                       shape, created_at, updated_at";

pub struct GeoUnitRepo;

impl GeoUnitRepo {
    pub async fn create(pool: &PgPool, input: &NewGeoUnit) -> Result<GeoUnit, sqlx::Error> {
        let query = format!(
            "INSERT INTO geo_units
                (unit_type, name, slug, code, parent_id, ancestors, sort, active, shape)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeoUnit>(&query)
            .bind(&input.unit_type)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.code)
            .bind(input.parent_id)
            .bind(&input.ancestors)
            .bind(input.sort)
            .bind(input.active)
            .bind(&input.shape)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GeoUnit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM geo_units WHERE id = $1");
        sqlx::query_as::<_, GeoUnit>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the unit occupying a `(type, parent, slug)` slot, if any.
    pub async fn find_by_slot(
        pool: &PgPool,
        unit_type: &str,
        parent_id: Option<DbId>,
        slug: &str,
    ) -> Result<Option<GeoUnit>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM geo_units
             WHERE unit_type = $1 AND parent_id IS NOT DISTINCT FROM $2 AND slug = $3"
        );
        sqlx::query_as::<_, GeoUnit>(&query)
            .bind(unit_type)
            .bind(parent_id)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// List units matching `filter`, ordered by `sort, name`.
    pub async fn list(pool: &PgPool, filter: &GeoUnitFilter) -> Result<Vec<GeoUnit>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx = 1u32;

        if filter.unit_type.is_some() {
            conditions.push(format!("unit_type = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.parent_id.is_some() {
            conditions.push(format!("parent_id = ${bind_idx}"));
        }
        if filter.root_only {
            conditions.push("parent_id IS NULL".to_string());
        }
        if !filter.include_inactive {
            conditions.push("active = true".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let query = format!("SELECT {COLUMNS} FROM geo_units {where_clause} ORDER BY sort, name, id");

        let mut q = sqlx::query_as::<_, GeoUnit>(&query);
        if let Some(ref unit_type) = filter.unit_type {
            q = q.bind(unit_type);
        }
        if let Some(parent_id) = filter.parent_id {
            q = q.bind(parent_id);
        }
        q.fetch_all(pool).await
    }

    /// Every unit, active or not. Used when planning bulk uploads.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<GeoUnit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM geo_units ORDER BY id");
        sqlx::query_as::<_, GeoUnit>(&query).fetch_all(pool).await
    }

    pub async fn children(pool: &PgPool, id: DbId) -> Result<Vec<GeoUnit>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM geo_units WHERE parent_id = $1 ORDER BY sort, name, id");
        sqlx::query_as::<_, GeoUnit>(&query)
            .bind(id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_children(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM geo_units WHERE parent_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Committees and centers whose geo chain mentions `id` in any slot.
    pub async fn count_references(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT
                (SELECT COUNT(*) FROM committees
                  WHERE $1 IN (city_id, upazila_id, union_id, ward_id))
              + (SELECT COUNT(*) FROM centers
                  WHERE $1 IN (city_id, upazila_id, union_id, ward_id))",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Committees and centers whose chain mentions `id` or any unit beneath it.
    ///
    /// A non-zero count means moving `id` would invalidate stored chains.
    pub async fn count_subtree_references(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "WITH subtree AS (
                SELECT id FROM geo_units WHERE id = $1 OR $1 = ANY(ancestors)
             )
             SELECT
                (SELECT COUNT(*) FROM committees c
                  WHERE EXISTS (SELECT 1 FROM subtree s
                                 WHERE s.id IN (c.city_id, c.upazila_id, c.union_id, c.ward_id)))
              + (SELECT COUNT(*) FROM centers v
                  WHERE EXISTS (SELECT 1 FROM subtree s
                                 WHERE s.id IN (v.city_id, v.upazila_id, v.union_id, v.ward_id)))",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Apply non-`None` fields. Returns `None` if the unit does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGeoUnit,
    ) -> Result<Option<GeoUnit>, sqlx::Error> {
        let query = format!(
            "UPDATE geo_units SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                code = COALESCE($4, code),
                sort = COALESCE($5, sort),
                active = COALESCE($6, active),
                shape = COALESCE($7, shape)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeoUnit>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.code)
            .bind(input.sort)
            .bind(input.active)
            .bind(&input.shape)
            .fetch_optional(pool)
            .await
    }

    /// Move `id` under `new_parent_id` and rewrite the ancestor path of every
    /// descendant, in one transaction.
    ///
    /// `new_ancestors` is the moved unit's new path (the new parent's path
    /// plus the parent itself). Placement and cycle checks are the caller's.
    pub async fn reparent(
        pool: &PgPool,
        id: DbId,
        new_parent_id: Option<DbId>,
        new_ancestors: &[DbId],
    ) -> Result<Option<GeoUnit>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let old_depth: Option<i32> = sqlx::query_scalar(
            "SELECT COALESCE(array_length(ancestors, 1), 0)
             FROM geo_units WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(old_depth) = old_depth else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE geo_units SET parent_id = $2, ancestors = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let moved = sqlx::query_as::<_, GeoUnit>(&query)
            .bind(id)
            .bind(new_parent_id)
            .bind(new_ancestors)
            .fetch_one(&mut *tx)
            .await?;

        // A descendant's path is <old path of id> ++ [id] ++ <tail>; keep the
        // tail and swap the prefix.
        let mut prefix = new_ancestors.to_vec();
        prefix.push(id);
        let tail_start = old_depth + 2;
        let rewritten = sqlx::query(
            "UPDATE geo_units
             SET ancestors = $2::BIGINT[] || COALESCE(ancestors[$3:array_length(ancestors, 1)], '{}')
             WHERE $1 = ANY(ancestors)",
        )
        .bind(id)
        .bind(&prefix)
        .bind(tail_start)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(
            unit_id = id,
            descendants = rewritten.rows_affected(),
            "Geo unit re-parented",
        );
        Ok(Some(moved))
    }

    /// Exchange the `sort` values of two units. Returns both rows, `a` first.
    pub async fn swap_sort(
        pool: &PgPool,
        a: &GeoUnit,
        b: &GeoUnit,
    ) -> Result<Vec<GeoUnit>, sqlx::Error> {
        let query = format!(
            "UPDATE geo_units
             SET sort = CASE id WHEN $1 THEN $4 ELSE $3 END
             WHERE id IN ($1, $2)
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, GeoUnit>(&query)
            .bind(a.id)
            .bind(b.id)
            .bind(a.sort)
            .bind(b.sort)
            .fetch_all(pool)
            .await?;
        rows.sort_by_key(|u| u.id != a.id);
        Ok(rows)
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM geo_units WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
