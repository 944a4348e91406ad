//! Organization scoping and role rules as seen from the HTTP surface.

use hyper::StatusCode;
use serde_json::json;

use fleet_types::UserRole;

use crate::common::TestApp;

#[tokio::test]
async fn other_orgs_records_are_invisible() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let globex = app.org("Globex");
    let owner = app.admin(acme.id);
    let intruder = app.admin(globex.id);
    let vehicle = app.vehicle(&owner.token, "Volvo").await;
    let item = format!("/api/vehicles/{vehicle}");

    let listed = app.get("/api/vehicles", &intruder.token).await;
    assert!(listed.data().as_array().unwrap().is_empty());

    let get = app.get(&item, &intruder.token).await;
    assert_eq!(get.status, StatusCode::NOT_FOUND);
    let put = app.put(&item, &intruder.token, json!({"make": "Scania"})).await;
    assert_eq!(put.status, StatusCode::NOT_FOUND);
    let delete = app.delete(&item, &intruder.token).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let still_there = app.get(&item, &owner.token).await;
    assert_eq!(still_there.data()["make"], "Volvo");
}

#[tokio::test]
async fn foreign_references_are_rejected() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let globex = app.org("Globex");
    let owner = app.admin(acme.id);
    let other = app.admin(globex.id);
    let vehicle = app.vehicle(&owner.token, "Volvo").await;
    let driver = app.driver(&other.token, "Ivan").await;

    let trip = app
        .post(
            "/api/trips",
            &other.token,
            json!({"vehicleId": vehicle, "driverId": driver, "startAt": "2024-05-01"}),
        )
        .await;
    assert_eq!(trip.status, StatusCode::BAD_REQUEST);
    assert_eq!(trip.body["message"], "Vehicle not found");
}

#[tokio::test]
async fn auditors_read_but_never_write() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let auditor = app.session(Some(acme.id), UserRole::Auditor);
    let vehicle = app.vehicle(&admin.token, "Volvo").await;

    let listed = app.get("/api/vehicles", &auditor.token).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let create = app
        .post("/api/vehicles", &auditor.token, json!({"make": "Scania", "model": "R"}))
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
    assert_eq!(create.code(), "FORBIDDEN");

    let delete = app
        .delete(&format!("/api/vehicles/{vehicle}"), &auditor.token)
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn drivers_may_record_trips() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let member = app.session(Some(acme.id), UserRole::Driver);
    let vehicle = app.vehicle(&admin.token, "Volvo").await;
    let driver = app.driver(&admin.token, "Marko").await;

    let trip = app
        .post(
            "/api/trips",
            &member.token,
            json!({"vehicleId": vehicle, "driverId": driver, "startAt": "2024-05-01"}),
        )
        .await;
    assert_eq!(trip.status, StatusCode::CREATED, "{}", trip.body);
}

#[tokio::test]
async fn users_without_an_org_see_nothing() {
    let app = TestApp::new();
    let orphan = app.session(None, UserRole::Admin);

    let listed = app.get("/api/trailers", &orphan.token).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.data(), &json!([]));

    let create = app
        .post("/api/trailers", &orphan.token, json!({"make": "Krone", "model": "Box"}))
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
    assert_eq!(create.code(), "ORG_REQUIRED");

    let summary = app.get("/api/reports/summary", &orphan.token).await;
    assert_eq!(summary.data()["vehicles"], 0);
}

#[tokio::test]
async fn path_ids_must_be_uuids() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);

    let reply = app.get("/api/vehicles/not-a-uuid", &admin.token).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.code(), "VALIDATION");
    assert_eq!(
        reply.body["errors"],
        json!([{"field": "id", "message": "Valid vehicle ID is required"}])
    );
}
