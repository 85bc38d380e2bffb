//! Geo unit tree, chain validation and bulk upload over HTTP.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete_auth, get_auth, post_json_auth, post_multipart_auth,
    put_json_auth, token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create_unit(pool: &PgPool, token: &str, body: Value) -> Value {
    let response = post_json_auth(build_test_app(pool.clone()), "/api/geo/units", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

fn id(unit: &Value) -> i64 {
    unit["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_derives_slug_and_ancestors(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let upazila = create_unit(&pool, &token, json!({ "type": "upazila", "name": "Savar Upazila" })).await;
    let union = create_unit(
        &pool,
        &token,
        json!({ "type": "union", "name": "Ashulia  Union", "parent_id": id(&upazila) }),
    )
    .await;

    assert_eq!(upazila["slug"], "savar-upazila");
    assert_eq!(union["slug"], "ashulia-union");
    assert_eq!(union["ancestors"], json!([id(&upazila)]));
    assert_eq!(union["active"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn placement_and_duplicate_rules_are_enforced(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let city = create_unit(&pool, &token, json!({ "type": "city_corporation", "name": "Dhaka North" })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/geo/units",
        &token,
        json!({ "type": "union", "name": "Nowhere", "parent_id": id(&city) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_PLACEMENT");

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/geo/units",
        &token,
        json!({ "type": "city_corporation", "name": "DHAKA north" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "DUPLICATE");

    let response = post_json_auth(
        build_test_app(pool),
        "/api/geo/units",
        &token,
        json!({ "type": "ward", "name": "Ward 1", "parent_id": 999999 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn viewers_can_read_but_not_write(pool: PgPool) {
    let viewer = token_for(&pool, "v", "viewer").await;
    let response = get_auth(build_test_app(pool.clone()), "/api/geo/units", &viewer).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        build_test_app(pool),
        "/api/geo/units",
        &viewer,
        json!({ "type": "upazila", "name": "Savar" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rename_recomputes_slug(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let a = create_unit(&pool, &token, json!({ "type": "upazila", "name": "Savar" })).await;
    create_unit(&pool, &token, json!({ "type": "upazila", "name": "Keraniganj" })).await;

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/geo/units/{}", id(&a)),
        &token,
        json!({ "name": "Savar Sadar" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["slug"], "savar-sadar");

    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/geo/units/{}", id(&a)),
        &token,
        json!({ "name": "Keraniganj" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reparent_moves_subtree_and_rejects_cycles(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let up_a = create_unit(&pool, &token, json!({ "type": "upazila", "name": "A" })).await;
    let up_b = create_unit(&pool, &token, json!({ "type": "upazila", "name": "B" })).await;
    let union = create_unit(&pool, &token, json!({ "type": "union", "name": "U", "parent_id": id(&up_a) })).await;
    let ward = create_unit(&pool, &token, json!({ "type": "ward", "name": "W", "parent_id": id(&union) })).await;

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/geo/units/{}/parent", id(&union)),
        &token,
        json!({ "parent_id": id(&up_b) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/geo/units/{}", id(&ward)),
        &token,
    )
    .await;
    let moved_ward = body_json(response).await["data"].clone();
    assert_eq!(moved_ward["ancestors"], json!([id(&up_b), id(&union)]));

    // A union cannot go to the top level.
    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/geo/units/{}/parent", id(&union)),
        &token,
        json!({ "parent_id": null }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reparent_is_refused_while_a_committee_uses_the_subtree(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let savar = create_unit(&pool, &token, json!({ "type": "upazila", "name": "Savar" })).await;
    let dhamrai = create_unit(&pool, &token, json!({ "type": "upazila", "name": "Dhamrai" })).await;
    let union = create_unit(&pool, &token, json!({ "type": "union", "name": "Pathalia", "parent_id": id(&savar) })).await;
    let other_union = create_unit(&pool, &token, json!({ "type": "union", "name": "Birulia", "parent_id": id(&savar) })).await;
    let ward = create_unit(&pool, &token, json!({ "type": "ward", "name": "Ward 3", "parent_id": id(&union) })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/committees",
        &token,
        json!({
            "name": "Pathalia Ward 3",
            "committee_type": "ward",
            "upazila_id": id(&savar),
            "union_id": id(&union),
            "ward_id": id(&ward),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let committee = body_json(response).await["data"]["id"].as_i64().unwrap();

    // The referenced ward itself, and the union above it, both stay put.
    for (unit, target) in [(&ward, &other_union), (&union, &dhamrai)] {
        let response = put_json_auth(
            build_test_app(pool.clone()),
            &format!("/api/geo/units/{}/parent", id(unit)),
            &token,
            json!({ "parent_id": id(target) }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "IN_USE");
    }

    // The stored chain still validates on a name-only update.
    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/committees/{committee}"),
        &token,
        json!({ "name": "Pathalia Ward 3 Committee" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // An unreferenced union can still move.
    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/geo/units/{}/parent", id(&other_union)),
        &token,
        json!({ "parent_id": id(&dhamrai) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn swap_sort_exchanges_sibling_positions(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let a = create_unit(&pool, &token, json!({ "type": "upazila", "name": "A", "sort": 1 })).await;
    let b = create_unit(&pool, &token, json!({ "type": "upazila", "name": "B", "sort": 2 })).await;
    let c = create_unit(&pool, &token, json!({ "type": "city_corporation", "name": "C" })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/geo/units/swap-sort",
        &token,
        json!({ "a_id": id(&a), "b_id": id(&b) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rows = body_json(response).await["data"].clone();
    assert_eq!(rows[0]["sort"], 2);
    assert_eq!(rows[1]["sort"], 1);

    let response = post_json_auth(
        build_test_app(pool),
        "/api/geo/units/swap-sort",
        &token,
        json!({ "a_id": id(&a), "b_id": id(&c) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_refuses_parents_and_referenced_units(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let city = create_unit(&pool, &token, json!({ "type": "city_corporation", "name": "Gazipur" })).await;
    let ward = create_unit(&pool, &token, json!({ "type": "ward", "name": "Ward 5", "parent_id": id(&city) })).await;

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!("/api/geo/units/{}", id(&city)),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "HAS_CHILDREN");

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/committees",
        &token,
        json!({ "name": "Ward 5 committee", "city_id": id(&city), "ward_id": id(&ward) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = delete_auth(
        build_test_app(pool),
        &format!("/api/geo/units/{}", id(&ward)),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "IN_USE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn validate_chain_returns_resolved_units(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;
    let upazila = create_unit(&pool, &token, json!({ "type": "upazila", "name": "Savar" })).await;
    let union = create_unit(&pool, &token, json!({ "type": "union", "name": "Tetuljhora", "parent_id": id(&upazila) })).await;
    let other = create_unit(&pool, &token, json!({ "type": "upazila", "name": "Dhamrai" })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/geo/validate-chain",
        &token,
        json!({ "upazila_id": id(&upazila), "union_id": id(&union) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let chain = body_json(response).await["data"].clone();
    assert_eq!(chain["union"]["name"], "Tetuljhora");
    assert!(chain["city"].is_null());

    let response = post_json_auth(
        build_test_app(pool),
        "/api/geo/validate-chain",
        &token,
        json!({ "upazila_id": id(&other), "union_id": id(&union) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_GEO_CHAIN");
    assert_eq!(
        json["error"],
        format!("Union {} does not belong to upazila {}", id(&union), id(&other))
    );
}

const UPLOAD_CSV: &str = "\
Type,Name,ParentType,ParentName,Code,Sort,Active
Ward,Ward 1,Union,Kaundia,,1,yes
Union,Kaundia,Upazila,Savar,U-01,,
Upazila,Savar,,,,,
Ward,Ward 9,Union,Missing Union,,,
";

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_dry_run_plans_without_writing(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;

    let response = post_multipart_auth(
        build_test_app(pool.clone()),
        "/api/geo/upload?dry=1",
        &token,
        "file",
        "units.csv",
        UPLOAD_CSV.as_bytes(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await["data"].clone();
    assert_eq!(result["dry_run"], true);
    assert_eq!(result["plan"]["total"], 4);
    assert_eq!(result["plan"]["to_create"], 3);
    assert_eq!(result["plan"]["rejected"], 1);
    assert_eq!(result["created"], 0);

    let response = get_auth(build_test_app(pool), "/api/geo/units", &token).await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_commit_creates_rows_parents_first(pool: PgPool) {
    let token = token_for(&pool, "ed", "editor").await;

    let response = post_multipart_auth(
        build_test_app(pool.clone()),
        "/api/geo/upload?dry=0",
        &token,
        "file",
        "units.csv",
        UPLOAD_CSV.as_bytes(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await["data"].clone();
    assert_eq!(result["created"], 3);
    assert!(result["failures"].as_array().unwrap().is_empty());

    let response = get_auth(build_test_app(pool.clone()), "/api/geo/units?type=ward", &token).await;
    let wards = body_json(response).await["data"].clone();
    assert_eq!(wards.as_array().unwrap().len(), 1);
    assert_eq!(wards[0]["ancestors"].as_array().unwrap().len(), 2);

    // Re-uploading the same file skips everything already present.
    let response = post_multipart_auth(
        build_test_app(pool),
        "/api/geo/upload",
        &token,
        "file",
        "units.csv",
        UPLOAD_CSV.as_bytes(),
    )
    .await;
    let result = body_json(response).await["data"].clone();
    assert_eq!(result["created"], 0);
    assert_eq!(result["plan"]["skipped"], 3);
}
