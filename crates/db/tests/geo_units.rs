//! Integration tests for the geo unit repository.

use pollsite_core::geo::{compute_ancestors, generate_slug};
use pollsite_core::geo_chain::{validate_geo_chain, GeoChainError, GeoChainInput};
use pollsite_db::geo_lookup::PgGeoLookup;
use pollsite_db::models::committee::CreateCommittee;
use pollsite_db::models::geo_unit::{GeoUnit, GeoUnitFilter, NewGeoUnit, UpdateGeoUnit};
use pollsite_db::repositories::{CommitteeRepo, GeoUnitRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn add(pool: &PgPool, unit_type: &str, name: &str, parent: Option<&GeoUnit>) -> GeoUnit {
    let input = NewGeoUnit {
        unit_type: unit_type.to_string(),
        name: name.to_string(),
        slug: generate_slug(name),
        code: None,
        parent_id: parent.map(|p| p.id),
        ancestors: compute_ancestors(parent),
        sort: 0,
        active: true,
        shape: None,
    };
    GeoUnitRepo::create(pool, &input).await.unwrap()
}

async fn reload(pool: &PgPool, id: i64) -> GeoUnit {
    GeoUnitRepo::find_by_id(pool, id).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_stores_ancestor_path(pool: PgPool) {
    let upazila = add(&pool, "upazila", "Savar", None).await;
    let union = add(&pool, "union", "Ashulia", Some(&upazila)).await;
    let ward = add(&pool, "ward", "Ward 1", Some(&union)).await;

    assert_eq!(upazila.ancestors, Vec::<i64>::new());
    assert_eq!(union.ancestors, vec![upazila.id]);
    assert_eq!(ward.ancestors, vec![upazila.id, union.id]);
    assert_eq!(ward.slug, "ward-1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_slot_violates_unique_index(pool: PgPool) {
    let upazila = add(&pool, "upazila", "Savar", None).await;
    add(&pool, "union", "Ashulia", Some(&upazila)).await;

    let dup = NewGeoUnit {
        unit_type: "union".into(),
        name: "ASHULIA".into(),
        slug: generate_slug("ASHULIA"),
        code: None,
        parent_id: Some(upazila.id),
        ancestors: vec![upazila.id],
        sort: 0,
        active: true,
        shape: None,
    };
    let err = GeoUnitRepo::create(&pool, &dup).await.unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_geo_units_type_parent_slug"));

    // Two roots with the same slug collide too.
    let root_dup = NewGeoUnit {
        unit_type: "upazila".into(),
        name: "Savar".into(),
        slug: "savar".into(),
        code: None,
        parent_id: None,
        ancestors: vec![],
        sort: 0,
        active: true,
        shape: None,
    };
    assert!(GeoUnitRepo::create(&pool, &root_dup).await.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_by_slot(pool: PgPool) {
    let city = add(&pool, "city_corporation", "Dhaka North", None).await;
    let found = GeoUnitRepo::find_by_slot(&pool, "city_corporation", None, "dhaka-north")
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(city.id));

    let missing = GeoUnitRepo::find_by_slot(&pool, "upazila", None, "dhaka-north")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters(pool: PgPool) {
    let upazila = add(&pool, "upazila", "Savar", None).await;
    add(&pool, "city_corporation", "Dhaka South", None).await;
    let union = add(&pool, "union", "Ashulia", Some(&upazila)).await;
    GeoUnitRepo::update(
        &pool,
        union.id,
        &UpdateGeoUnit { active: Some(false), ..Default::default() },
    )
    .await
    .unwrap();

    let roots = GeoUnitRepo::list(&pool, &GeoUnitFilter { root_only: true, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(roots.len(), 2);

    let children = GeoUnitRepo::list(
        &pool,
        &GeoUnitFilter { parent_id: Some(upazila.id), ..Default::default() },
    )
    .await
    .unwrap();
    assert!(children.is_empty(), "inactive units are hidden by default");

    let children = GeoUnitRepo::list(
        &pool,
        &GeoUnitFilter {
            parent_id: Some(upazila.id),
            include_inactive: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(children.len(), 1);

    let typed = GeoUnitRepo::list(
        &pool,
        &GeoUnitFilter { unit_type: Some("upazila".into()), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(typed.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reparent_rewrites_descendant_paths(pool: PgPool) {
    let savar = add(&pool, "upazila", "Savar", None).await;
    let dhamrai = add(&pool, "upazila", "Dhamrai", None).await;
    let union = add(&pool, "union", "Ashulia", Some(&savar)).await;
    let ward = add(&pool, "ward", "Ward 3", Some(&union)).await;

    let new_ancestors = compute_ancestors(Some(&dhamrai));
    let moved = GeoUnitRepo::reparent(&pool, union.id, Some(dhamrai.id), &new_ancestors)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(moved.parent_id, Some(dhamrai.id));
    assert_eq!(moved.ancestors, vec![dhamrai.id]);

    let ward = reload(&pool, ward.id).await;
    assert_eq!(ward.parent_id, Some(union.id));
    assert_eq!(ward.ancestors, vec![dhamrai.id, union.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reparent_missing_unit_returns_none(pool: PgPool) {
    let result = GeoUnitRepo::reparent(&pool, 999_999, None, &[]).await.unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_swap_sort(pool: PgPool) {
    let a = add(&pool, "upazila", "Savar", None).await;
    let b = add(&pool, "upazila", "Dhamrai", None).await;
    GeoUnitRepo::update(&pool, b.id, &UpdateGeoUnit { sort: Some(5), ..Default::default() })
        .await
        .unwrap();
    let b = reload(&pool, b.id).await;

    let rows = GeoUnitRepo::swap_sort(&pool, &a, &b).await.unwrap();
    assert_eq!(rows[0].id, a.id);
    assert_eq!(rows[0].sort, 5);
    assert_eq!(rows[1].sort, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_children_and_references(pool: PgPool) {
    let upazila = add(&pool, "upazila", "Savar", None).await;
    let union = add(&pool, "union", "Ashulia", Some(&upazila)).await;

    assert_eq!(GeoUnitRepo::count_children(&pool, upazila.id).await.unwrap(), 1);
    assert_eq!(GeoUnitRepo::children(&pool, upazila.id).await.unwrap()[0].id, union.id);
    assert_eq!(GeoUnitRepo::count_references(&pool, union.id).await.unwrap(), 0);

    CommitteeRepo::create(
        &pool,
        &CreateCommittee {
            name: "Ashulia committee".into(),
            committee_type: None,
            geo: GeoChainInput {
                upazila_id: Some(upazila.id),
                union_id: Some(union.id),
                ..Default::default()
            },
            active: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(GeoUnitRepo::count_references(&pool, union.id).await.unwrap(), 1);
    assert_eq!(GeoUnitRepo::count_references(&pool, upazila.id).await.unwrap(), 1);

    assert!(GeoUnitRepo::delete(&pool, union.id).await.unwrap());
    assert!(!GeoUnitRepo::delete(&pool, union.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_subtree_references_include_descendants(pool: PgPool) {
    let upazila = add(&pool, "upazila", "Savar", None).await;
    let union = add(&pool, "union", "Ashulia", Some(&upazila)).await;
    let sibling = add(&pool, "union", "Birulia", Some(&upazila)).await;
    let ward = add(&pool, "ward", "Ward 1", Some(&union)).await;

    CommitteeRepo::create(
        &pool,
        &CreateCommittee {
            name: "Ward 1 committee".into(),
            committee_type: None,
            geo: GeoChainInput {
                upazila_id: Some(upazila.id),
                union_id: Some(union.id),
                ward_id: Some(ward.id),
                ..Default::default()
            },
            active: None,
        },
    )
    .await
    .unwrap();

    // One committee, counted once even though it names three units of the subtree.
    assert_eq!(GeoUnitRepo::count_subtree_references(&pool, upazila.id).await.unwrap(), 1);
    assert_eq!(GeoUnitRepo::count_subtree_references(&pool, union.id).await.unwrap(), 1);
    assert_eq!(GeoUnitRepo::count_subtree_references(&pool, ward.id).await.unwrap(), 1);
    assert_eq!(GeoUnitRepo::count_subtree_references(&pool, sibling.id).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_chain_validation_against_database(pool: PgPool) {
    let savar = add(&pool, "upazila", "Savar", None).await;
    let union = add(&pool, "union", "Ashulia", Some(&savar)).await;
    let ward = add(&pool, "ward", "Ward 1", Some(&union)).await;
    let other = add(&pool, "upazila", "Dhamrai", None).await;

    let lookup = PgGeoLookup::new(&pool);
    let chain = validate_geo_chain(
        &lookup,
        &GeoChainInput {
            upazila_id: Some(savar.id),
            union_id: Some(union.id),
            ward_id: Some(ward.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(chain.ward.map(|w| w.id), Some(ward.id));

    let err = validate_geo_chain(
        &lookup,
        &GeoChainInput {
            upazila_id: Some(other.id),
            ward_id: Some(ward.id),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GeoChainError::NotDescendant { .. }));

    let err = validate_geo_chain(&lookup, &GeoChainInput { ward_id: Some(ward.id), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, GeoChainError::MissingRoot));
}
