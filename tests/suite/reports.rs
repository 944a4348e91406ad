//! Aggregate reports and the GPS feed.

use hyper::StatusCode;
use serde_json::json;

use crate::common::{Session, TestApp};

async fn trip(app: &TestApp, admin: &Session, vehicle: &str, driver: &str, start: &str, status: &str) {
    let reply = app
        .post(
            "/api/trips",
            &admin.token,
            json!({"vehicleId": vehicle, "driverId": driver, "startAt": start, "status": status}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
}

async fn refuel(app: &TestApp, admin: &Session, vehicle: &str, liters: f64, cost: i64, at: &str) {
    let reply = app
        .post(
            "/api/fuel-records",
            &admin.token,
            json!({"vehicleId": vehicle, "amountLiters": liters, "costCents": cost, "recordedAt": at}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
}

#[tokio::test]
async fn summary_counts_honour_the_range() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let volvo = app.vehicle(&admin.token, "Volvo").await;
    let marko = app.driver(&admin.token, "Marko").await;
    trip(&app, &admin, &volvo, &marko, "2024-05-01T06:00:00Z", "COMPLETED").await;
    trip(&app, &admin, &volvo, &marko, "2024-06-10T06:00:00Z", "IN_PROGRESS").await;
    refuel(&app, &admin, &volvo, 100.0, 15000, "2024-05-02T10:00:00Z").await;

    let all = app.get("/api/reports/summary", &admin.token).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(
        all.data(),
        &json!({"vehicles": 1, "drivers": 1, "trips": 2, "fuelRecords": 1, "locations": 0})
    );

    let june = app
        .get("/api/reports/summary?from=2024-06-01&to=2024-06-30", &admin.token)
        .await;
    assert_eq!(june.data()["trips"], 1);
    assert_eq!(june.data()["fuelRecords"], 0);
    assert_eq!(june.data()["vehicles"], 1);

    let bad = app.get("/api/reports/summary?from=yesterday", &admin.token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["errors"][0]["message"], "Invalid date");
}

#[tokio::test]
async fn trips_report_groups_by_status() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let volvo = app.vehicle(&admin.token, "Volvo").await;
    let marko = app.driver(&admin.token, "Marko").await;
    trip(&app, &admin, &volvo, &marko, "2024-05-01", "COMPLETED").await;
    trip(&app, &admin, &volvo, &marko, "2024-05-02", "COMPLETED").await;
    trip(&app, &admin, &volvo, &marko, "2024-05-03", "PRE_TRIP").await;

    let report = app.get("/api/reports/trips", &admin.token).await;
    let data = report.data();
    assert_eq!(data["total"], 3);
    assert_eq!(
        data["byStatus"],
        json!([{"status": "PRE_TRIP", "count": 1}, {"status": "COMPLETED", "count": 2}])
    );
    assert_eq!(data["perOrg"][0]["orgName"], "Acme");
    assert_eq!(data["perOrg"][0]["total"], 3);
}

#[tokio::test]
async fn fuel_report_totals_per_vehicle() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let volvo = app.vehicle(&admin.token, "Volvo").await;
    let man = app.vehicle(&admin.token, "MAN").await;
    refuel(&app, &admin, &volvo, 100.0, 15000, "2024-05-02").await;
    refuel(&app, &admin, &volvo, 50.5, 7000, "2024-05-09").await;
    refuel(&app, &admin, &man, 20.0, 3000, "2024-05-03").await;

    let report = app.get("/api/reports/fuel", &admin.token).await;
    let rows = report.data().as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["vehicleId"], man.as_str());
    assert_eq!(rows[1]["vehicleMake"], "Volvo");
    assert_eq!(rows[1]["totalLiters"], 150.5);
    assert_eq!(rows[1]["totalCostCents"], 22000);
    assert_eq!(rows[1]["recordCount"], 2);
    assert_eq!(rows[1]["orgName"], "Acme");

    let early = app
        .get("/api/reports/fuel?to=2024-05-05", &admin.token)
        .await;
    let rows = early.data().as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["totalLiters"], 100.0);
}

#[tokio::test]
async fn locations_report_orders_by_type_then_name() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    for (name, kind) in [("Workshop", "SERVICE"), ("Yard B", "PARKING"), ("Yard A", "PARKING")] {
        app.post("/api/locations", &admin.token, json!({"name": name, "type": kind}))
            .await;
    }

    let report = app.get("/api/reports/locations", &admin.token).await;
    let names: Vec<&str> = report
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Yard A", "Yard B", "Workshop"]);
    assert_eq!(report.data()[0]["orgName"], "Acme");
}

#[tokio::test]
async fn gps_tracks_active_vehicles_only() {
    let app = TestApp::new();
    let acme = app.org("Acme");
    let admin = app.admin(acme.id);
    let volvo = app.vehicle(&admin.token, "Volvo").await;
    let parked = app.vehicle(&admin.token, "MAN").await;
    app.put(
        &format!("/api/vehicles/{parked}"),
        &admin.token,
        json!({"status": "PAUSED"}),
    )
    .await;

    let reply = app.get("/api/gps/positions", &admin.token).await;
    assert_eq!(reply.status, StatusCode::OK);
    let positions = reply.data().as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["vehicleId"], volvo.as_str());
    assert_eq!(positions[0]["lat"], 44.8);
    assert_eq!(positions[0]["lng"], 20.455);
}
