mod common;

use axum::body::to_bytes;
use axum::http::{header, Method, StatusCode};
use common::{TestApp, ASSEMBLY_URL, PART_STUDIO_URL};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const PARTS_PATH: &str = "/api/parts/d/doc1/w/ws1/e/ps1";
const STUDIO_TRANSLATION_PATH: &str = "/api/partstudios/d/doc1/w/ws1/e/ps1/translations";
const ASSEMBLY_TRANSLATION_PATH: &str = "/api/assemblies/d/doc1/w/ws1/e/ps1/translations";
const STATUS_PATH: &str = "/api/translations/tr1";
const DOWNLOAD_PATH: &str = "/api/documents/d/doc1/externaldata/ext1";
const SECOND_STUDIO_URL: &str = "https://cad.onshape.com/documents/doc1/w/ws1/e/ps2";
const SECOND_PARTS_PATH: &str = "/api/parts/d/doc1/w/ws1/e/ps2";

struct Fixture {
    token: String,
    robot_id: Uuid,
    system_id: Uuid,
}

async fn fixture(app: &TestApp, team_number: i32) -> Fixture {
    let token = app.register_team(team_number).await;
    let robot_id = app.create_robot(&token, "Comp").await;
    let system_id = app.create_system(&token, robot_id, "Intake").await;

    Mock::given(method("GET"))
        .and(path(PARTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"partId": "P1", "name": "Roller plate"},
            {"partId": "P2", "name": "Hex shaft"}
        ])))
        .mount(&app.onshape)
        .await;

    Fixture {
        token,
        robot_id,
        system_id,
    }
}

/// System with an explicit part studio list instead of the default fixture.
async fn system_with_studios(app: &TestApp, token: &str, studios: &[&str]) -> Uuid {
    let robot_id = app.create_robot(token, "Comp").await;
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/robots/{robot_id}/systems"),
            Some(json!({
                "name": "Shooter",
                "assembly_url": ASSEMBLY_URL,
                "part_studio_urls": studios,
                "access_key": "access",
                "secret_key": "secret",
            })),
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    common::id_of(&body)
}

async fn mount_translation_start(app: &TestApp, route: &str, format: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(body_partial_json(json!({
            "formatName": format,
            "partIds": "P1",
            "storeInDocument": false,
            "linkDocumentId": "doc1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tr1",
            "requestState": "ACTIVE"
        })))
        .expect(1)
        .mount(&app.onshape)
        .await;
}

async fn mount_finished_translation(app: &TestApp) {
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tr1",
            "requestState": "DONE",
            "resultExternalDataIds": ["ext1"]
        })))
        .mount(&app.onshape)
        .await;
    Mock::given(method("GET"))
        .and(path(DOWNLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"ISO-10303-21;".to_vec(), "model/step"))
        .mount(&app.onshape)
        .await;
}

#[tokio::test]
async fn export_link_uses_machine_format() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 254).await;
    let machine_id = app.create_machine(&fx.token, fx.robot_id, "Printer", "STL").await;

    mount_translation_start(&app, STUDIO_TRANSLATION_PATH, "STL").await;
    mount_finished_translation(&app).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"part_id": "P1", "machine_id": machine_id})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["format"], "STL");
    assert_eq!(body["data"]["part_id"], "P1");
    assert_eq!(
        body["data"]["download_url"],
        format!("{}{}", app.onshape.uri(), DOWNLOAD_PATH)
    );
}

#[tokio::test]
async fn export_streams_file_as_attachment() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 1678).await;

    mount_translation_start(&app, STUDIO_TRANSLATION_PATH, "STEP").await;
    mount_finished_translation(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"partId": "P1", "delivery": "stream"})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "model/step");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"P1.step\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ISO-10303-21;");
}

#[tokio::test]
async fn stuck_translation_times_out() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 118).await;

    mount_translation_start(&app, STUDIO_TRANSLATION_PATH, "STEP").await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tr1",
            "requestState": "ACTIVE"
        })))
        .expect(3)
        .mount(&app.onshape)
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"part_id": "P1"})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["message"], "CAD export timed out");
}

#[tokio::test]
async fn failed_translation_reports_reason() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 971).await;

    mount_translation_start(&app, STUDIO_TRANSLATION_PATH, "STEP").await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tr1",
            "requestState": "FAILED",
            "failureReason": "Unsupported geometry"
        })))
        .expect(1)
        .mount(&app.onshape)
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"part_id": "P1"})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], "Unsupported geometry");
}

#[tokio::test]
async fn rejected_part_studio_translation_falls_back_to_assembly() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 2056).await;

    Mock::given(method("POST"))
        .and(path(STUDIO_TRANSLATION_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("not a part studio"))
        .expect(1)
        .mount(&app.onshape)
        .await;
    mount_translation_start(&app, ASSEMBLY_TRANSLATION_PATH, "STEP").await;
    mount_finished_translation(&app).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"part_id": "P1"})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["format"], "STEP");
}

#[tokio::test]
async fn unknown_part_is_not_found() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 4414).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"part_id": "ZZ"})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().is_some_and(|m| m.contains("ZZ")));
}

#[tokio::test]
async fn explicit_format_is_validated_before_calling_onshape() {
    let app = TestApp::new().await;
    let token = app.register_team(1114).await;
    let robot_id = app.create_robot(&token, "Comp").await;
    let system_id = app.create_system(&token, robot_id, "Arm").await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/export"),
            Some(json!({"part_id": "P1", "format": "dwg"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let received = app.onshape.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn machine_of_another_robot_is_rejected() {
    let app = TestApp::new().await;
    let fx = fixture(&app, 33).await;
    let other_robot = app.create_robot(&fx.token, "Practice").await;
    let machine_id = app.create_machine(&fx.token, other_robot, "Mill", "STEP").await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/systems/{}/export", fx.system_id),
            Some(json!({"part_id": "P1", "machine_id": machine_id})),
            Some(&fx.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn system_without_part_studios_exports_from_assembly() {
    let app = TestApp::new().await;
    let token = app.register_team(6328).await;
    let system_id = system_with_studios(&app, &token, &[]).await;

    Mock::given(method("POST"))
        .and(path("/api/partstudios/d/doc1/w/ws1/e/asm1/translations"))
        .respond_with(ResponseTemplate::new(400).set_body_string("element is an assembly"))
        .expect(1)
        .mount(&app.onshape)
        .await;
    mount_translation_start(&app, "/api/assemblies/d/doc1/w/ws1/e/asm1/translations", "STEP")
        .await;
    mount_finished_translation(&app).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/export"),
            Some(json!({"part_id": "P1"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["part_id"], "P1");

    // No part listing is needed when the assembly is the source
    let received = app.onshape.received_requests().await.unwrap_or_default();
    assert!(received.iter().all(|r| !r.url.path().starts_with("/api/parts/")));
}

#[tokio::test]
async fn part_is_searched_across_part_studios() {
    let app = TestApp::new().await;
    let token = app.register_team(1690).await;
    let system_id = system_with_studios(&app, &token, &[PART_STUDIO_URL, SECOND_STUDIO_URL]).await;

    Mock::given(method("GET"))
        .and(path(PARTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"partId": "P1", "name": "Roller plate"}
        ])))
        .expect(1)
        .mount(&app.onshape)
        .await;
    Mock::given(method("GET"))
        .and(path(SECOND_PARTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"partId": "Q7", "name": "Flywheel hub"}
        ])))
        .expect(1)
        .mount(&app.onshape)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/partstudios/d/doc1/w/ws1/e/ps2/translations"))
        .and(body_partial_json(json!({"formatName": "STEP", "partIds": "Q7"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tr1",
            "requestState": "ACTIVE"
        })))
        .expect(1)
        .mount(&app.onshape)
        .await;
    mount_finished_translation(&app).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/export"),
            Some(json!({"part_id": "Q7"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["part_id"], "Q7");
}
