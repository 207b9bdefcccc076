mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ASSEMBLY_URL};
use serde_json::json;

#[tokio::test]
async fn bom_dictionary_round_trips_through_restore() {
    let app = TestApp::new().await;
    let token = app.register_team(254).await;
    let robot_id = app.create_robot(&token, "Comp").await;
    let system_id = app.create_system(&token, robot_id, "Drivetrain").await;

    app.send(
        Method::PUT,
        &format!("/api/systems/{system_id}/bom"),
        Some(json!({"parts": [{
            "Part Name": "Bellypan",
            "Quantity": "1",
            "Pre Process": "Router",
            "partId": "BP",
            "preProcessQuantity": 1
        }]})),
        Some(&token),
    )
    .await;

    let admin = app.site_admin_token().await;
    let (status, body) = app
        .send(Method::GET, "/api/admin/bom_dict", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let dict = body["data"].clone();
    assert_eq!(dict["254"]["Comp"]["Drivetrain"][0]["partId"], "BP");

    // Wipe the snapshot, then restore it from the dump
    app.send(
        Method::DELETE,
        &format!("/api/systems/{system_id}/bom"),
        None,
        Some(&token),
    )
    .await;

    let (status, body) = app
        .send(Method::POST, "/api/admin/bom_dict", Some(dict), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["teams_updated"], 1);
    assert_eq!(body["data"]["systems_updated"], 1);
    assert_eq!(body["data"]["systems_created"], 0);

    let (_, body) = app
        .send(
            Method::GET,
            &format!("/api/systems/{system_id}/bom"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(body["data"]["parts"][0]["preProcessQuantity"], 1);
    assert_eq!(body["data"]["parts"][0]["progress"]["status"], "completed");
}

#[tokio::test]
async fn restore_creates_missing_robots_and_skips_unknown_teams() {
    let app = TestApp::new().await;
    let token = app.register_team(1678).await;
    let admin = app.site_admin_token().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin/bom_dict",
            Some(json!({
                "1678": {"Offseason": {"Turret": [{"Part Name": "Ring", "partId": "R1"}]}},
                "9999": {"Ghost": {"Nothing": []}}
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["robots_created"], 1);
    assert_eq!(body["data"]["systems_created"], 1);
    assert_eq!(body["data"]["skipped_teams"], json!(["9999"]));

    let (_, body) = app.send(Method::GET, "/api/robots", None, Some(&token)).await;
    assert_eq!(body["data"][0]["name"], "Offseason");

    let (status, body) = app
        .send(Method::GET, "/api/admin/teams/1678/bom", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let ring = &body["data"]["Offseason"]["Turret"][0];
    assert_eq!(ring["Part Name"], "Ring");
    assert_eq!(ring["Quantity"], "N/A");
}

#[tokio::test]
async fn settings_dictionary_carries_keys() {
    let app = TestApp::new().await;
    let token = app.register_team(118).await;
    let robot_id = app.create_robot(&token, "Comp").await;
    app.create_system(&token, robot_id, "Elevator").await;
    let admin = app.site_admin_token().await;

    let (status, body) = app
        .send(Method::GET, "/api/admin/settings_dict", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let elevator = &body["data"]["118"]["Comp"]["Elevator"];
    assert_eq!(elevator["assembly_url"], ASSEMBLY_URL);
    assert_eq!(elevator["access_key"], "access");
    assert_eq!(elevator["secret_key"], "secret");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin/settings_dict",
            Some(json!({"118": {"Comp": {"Elevator": {
                "assembly_url": ASSEMBLY_URL,
                "part_studio_urls": [],
                "access_key": "rotated",
                "secret_key": ""
            }}}})),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["systems_updated"], 1);

    let (_, body) = app
        .send(Method::GET, "/api/admin/settings_dict", None, Some(&admin))
        .await;
    let elevator = &body["data"]["118"]["Comp"]["Elevator"];
    assert_eq!(elevator["access_key"], "rotated");
    assert!(elevator["secret_key"].is_null());
    assert_eq!(elevator["part_studio_urls"], json!([]));
}

#[tokio::test]
async fn restore_rejects_invalid_names_before_writing() {
    let app = TestApp::new().await;
    app.register_team(2910).await;
    let admin = app.site_admin_token().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin/bom_dict",
            Some(json!({"2910": {"   ": {"Intake": []}}})),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .send(Method::GET, "/api/admin/teams", None, Some(&admin))
        .await;
    assert_eq!(body["data"][0]["robot_count"], 0);
}

#[tokio::test]
async fn team_bom_of_unregistered_team_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.site_admin_token().await;

    let (status, _) = app
        .send(Method::GET, "/api/admin/teams/5940/bom", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
