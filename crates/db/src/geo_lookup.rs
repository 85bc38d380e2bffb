use pollsite_core::error::CoreError;
use pollsite_core::geo_chain::GeoUnitLookup;
use pollsite_core::types::DbId;
use sqlx::PgPool;

use crate::models::geo_unit::GeoUnit;
use crate::repositories::GeoUnitRepo;

/// [`GeoUnitLookup`] over the `geo_units` table.
pub struct PgGeoLookup<'a> {
    pool: &'a PgPool,
}

impl<'a> PgGeoLookup<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl GeoUnitLookup for PgGeoLookup<'_> {
    type Unit = GeoUnit;

    async fn find_unit(&self, id: DbId) -> Result<Option<GeoUnit>, CoreError> {
        GeoUnitRepo::find_by_id(self.pool, id)
            .await
            .map_err(|e| CoreError::Internal(format!("geo unit lookup: {e}")))
    }
}
