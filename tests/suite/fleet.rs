//! Record CRUD over HTTP: payload shapes, defaults, validation and status codes.

use hyper::{Method, StatusCode};
use serde_json::json;
use sha2::{Digest, Sha256};
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

use fleet_types::UserRole;

use crate::common::{TestApp, id_of};

#[tokio::test]
async fn vehicle_lifecycle() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);

    let created = app
        .post(
            "/api/vehicles",
            &admin.token,
            json!({"make": " Volvo ", "model": "FH16", "vin": "VIN-1", "purchaseDate": "2023-04-01"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let vehicle = created.data();
    assert_eq!(vehicle["make"], "Volvo");
    assert_eq!(vehicle["mileage"], 0);
    assert_eq!(vehicle["status"], "ACTIVE");
    assert_eq!(vehicle["orgId"], acme.id.to_string());
    assert!(vehicle["purchaseDate"].as_str().unwrap().starts_with("2023-04-01T00:00:00"));
    let id = id_of(vehicle);

    let updated = app
        .put(
            &format!("/api/vehicles/{id}"),
            &admin.token,
            json!({"vin": "", "mileage": 1200, "status": "IN_SERVICE", "purchaseDate": null}),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["vin"], serde_json::Value::Null);
    assert_eq!(updated.data()["purchaseDate"], serde_json::Value::Null);
    assert_eq!(updated.data()["mileage"], 1200);
    assert_eq!(updated.data()["model"], "FH16");

    let listed = app.get("/api/vehicles", &admin.token).await;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let deleted = app.delete(&format!("/api/vehicles/{id}"), &admin.token).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.data(), &json!({"ok": true}));

    let gone = app.get(&format!("/api/vehicles/{id}"), &admin.token).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "Vehicle not found");
}

#[tokio::test]
async fn vehicle_validation_and_duplicate_vin() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);

    let invalid = app
        .post(
            "/api/vehicles",
            &admin.token,
            json!({"model": "FH16", "mileage": -5, "status": "SCRAPPED"}),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        invalid.body["errors"],
        json!([
            {"field": "make", "message": "Make is required"},
            {"field": "mileage", "message": "Mileage must be a non-negative integer"},
            {"field": "status", "message": "Invalid status"},
        ])
    );

    let body = json!({"make": "Volvo", "model": "FH16", "vin": "VIN-9"});
    let first = app.post("/api/vehicles", &admin.token, body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let second = app.post("/api/vehicles", &admin.token, body).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.code(), "DUPLICATE_VIN");
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);

    let array = app.post("/api/trailers", &admin.token, json!([1, 2])).await;
    assert_eq!(array.status, StatusCode::BAD_REQUEST);
    assert_eq!(array.body["message"], "Request body must be a JSON object");

    let reply = app
        .send(Method::PUT, "/api/fuel-records/abc", Some(&admin.token), None)
        .await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.headers["allow"], "GET, DELETE");
}

#[tokio::test]
async fn trailers_and_drivers() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);

    let trailer = app
        .post(
            "/api/trailers",
            &admin.token,
            json!({"make": "Krone", "model": "Profi Liner", "registration": "BG-123"}),
        )
        .await;
    assert_eq!(trailer.status, StatusCode::CREATED);
    assert_eq!(trailer.data()["registration"], "BG-123");

    let driver = app
        .post(
            "/api/drivers",
            &admin.token,
            json!({"name": "Marko", "userId": admin.user.id.to_string(), "licenseExpiry": "2027-01-31"}),
        )
        .await;
    assert_eq!(driver.status, StatusCode::CREATED, "{}", driver.body);
    assert_eq!(driver.data()["user"]["email"], admin.user.email);

    let stranger = app.session(None, UserRole::Driver);
    let foreign = app
        .post(
            "/api/drivers",
            &admin.token,
            json!({"name": "Ivan", "userId": stranger.user.id.to_string()}),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);
    assert_eq!(foreign.code(), "VALIDATION");

    let id = id_of(driver.data());
    let cleared = app
        .put(&format!("/api/drivers/{id}"), &admin.token, json!({"userId": null}))
        .await;
    assert_eq!(cleared.data()["userId"], serde_json::Value::Null);
}

#[tokio::test]
async fn trips_embed_vehicle_and_driver() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let vehicle = app.vehicle(&admin.token, "Volvo").await;
    let driver = app.driver(&admin.token, "Marko").await;

    let created = app
        .post(
            "/api/trips",
            &admin.token,
            json!({
                "vehicleId": vehicle,
                "driverId": driver,
                "startAt": "2024-05-01T06:00:00Z",
                "startMileage": 1000,
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let trip = created.data();
    assert_eq!(trip["status"], "PRE_TRIP");
    assert_eq!(trip["vehicle"]["make"], "Volvo");
    assert_eq!(trip["driver"]["name"], "Marko");
    let id = id_of(trip);

    let backwards = app
        .put(
            &format!("/api/trips/{id}"),
            &admin.token,
            json!({"endMileage": 900}),
        )
        .await;
    assert_eq!(backwards.status, StatusCode::BAD_REQUEST);
    assert_eq!(backwards.body["errors"][0]["field"], "endMileage");

    let finished = app
        .put(
            &format!("/api/trips/{id}"),
            &admin.token,
            json!({"endMileage": 1350, "endAt": "2024-05-01T18:30:00Z", "status": "COMPLETED"}),
        )
        .await;
    assert_eq!(finished.status, StatusCode::OK);
    assert_eq!(finished.data()["status"], "COMPLETED");
    assert_eq!(finished.data()["endMileage"], 1350);

    let missing = app
        .post(
            "/api/trips",
            &admin.token,
            json!({"vehicleId": uuid_like(), "driverId": driver, "startAt": "2024-05-02"}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Vehicle not found");
}

#[tokio::test]
async fn fuel_records_link_trips() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let vehicle = app.vehicle(&admin.token, "Volvo").await;
    let driver = app.driver(&admin.token, "Marko").await;
    let trip = app
        .post(
            "/api/trips",
            &admin.token,
            json!({"vehicleId": vehicle, "driverId": driver, "startAt": "2024-05-01"}),
        )
        .await;
    let trip_id = id_of(trip.data());

    let record = app
        .post(
            "/api/fuel-records",
            &admin.token,
            json!({"vehicleId": vehicle, "tripId": trip_id, "amountLiters": 310.5, "costCents": 52000}),
        )
        .await;
    assert_eq!(record.status, StatusCode::CREATED, "{}", record.body);
    assert_eq!(record.data()["amountLiters"], 310.5);
    assert_eq!(record.data()["trip"]["id"], trip_id.as_str());
    assert!(record.data()["recordedAt"].is_string());

    let negative = app
        .post(
            "/api/fuel-records",
            &admin.token,
            json!({"vehicleId": vehicle, "amountLiters": -2}),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
    assert_eq!(negative.body["errors"][0]["message"], "Amount must be >= 0");

    let id = id_of(record.data());
    let deleted = app
        .delete(&format!("/api/fuel-records/{id}"), &admin.token)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
}

#[tokio::test]
async fn locations_filter_by_type() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    for (name, kind) in [("Yard B", "PARKING"), ("Workshop", "SERVICE"), ("Yard A", "PARKING")] {
        let reply = app
            .post(
                "/api/locations",
                &admin.token,
                json!({"name": name, "type": kind}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let parking = app.get("/api/locations?type=PARKING", &admin.token).await;
    let names: Vec<&str> = parking
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Yard A", "Yard B"]);

    let bad = app.get("/api/locations?type=GARAGE", &admin.token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let invalid = app
        .post("/api/locations", &admin.token, json!({"name": "Depot"}))
        .await;
    assert_eq!(
        invalid.body["errors"][0]["message"],
        "Type must be PARKING or SERVICE"
    );
}

#[tokio::test]
async fn documents_verify_integrity() {
    const FILE: &[u8] = b"CMR consignment note 2024-0042";
    let files = MockServer::start().await;
    Mock::given(path("/cmr.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FILE.to_vec()))
        .mount(&files)
        .await;

    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let vehicle = app.vehicle(&admin.token, "Volvo").await;

    let hash = format!("{:x}", Sha256::digest(FILE));
    let created = app
        .post(
            "/api/documents",
            &admin.token,
            json!({
                "entityType": "VEHICLE",
                "entityId": vehicle,
                "fileName": "cmr.pdf",
                "fileUrl": format!("{}/cmr.pdf", files.uri()),
                "contentHash": hash.to_uppercase(),
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.data()["contentHash"], hash.as_str());
    assert_eq!(created.data()["uploadedBy"], admin.user.id.to_string());
    let id = id_of(created.data());

    let verified = app
        .get(&format!("/api/documents/{id}/verify-integrity"), &admin.token)
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(
        verified.data(),
        &json!({"ok": true, "tampered": false, "message": "File integrity verified. Hash matches."})
    );

    let filtered = app
        .get(
            &format!("/api/documents?entityType=VEHICLE&entityId={vehicle}"),
            &admin.token,
        )
        .await;
    assert_eq!(filtered.data().as_array().unwrap().len(), 1);
    let other = app.get("/api/documents?entityType=TRIP", &admin.token).await;
    assert!(other.data().as_array().unwrap().is_empty());
}

fn uuid_like() -> String {
    "7d0c1a52-3b0f-4f4e-9d57-0f3f0c2b9e11".to_string()
}
