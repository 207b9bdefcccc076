mod common;

use axum::http::{Method, StatusCode};
use common::{bom_table, TestApp, ASSEMBLY_URL, MEMBER_PASSWORD};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const BOM_PATH: &str = "/api/assemblies/d/doc1/w/ws1/e/asm1/bom";
// base64("access:secret")
const BASIC_AUTH: &str = "Basic YWNjZXNzOnNlY3JldA==";

async fn mount_bom(app: &TestApp, table: Value) {
    app.onshape.reset().await;
    Mock::given(method("GET"))
        .and(path(BOM_PATH))
        .and(query_param("indented", "false"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(table))
        .mount(&app.onshape)
        .await;
}

/// Team admin token plus a system wired to the mock assembly.
async fn team_with_system(app: &TestApp, team_number: i32) -> (String, Uuid) {
    let token = app.register_team(team_number).await;
    let robot_id = app.create_robot(&token, "Comp").await;
    let system_id = app.create_system(&token, robot_id, "Drivetrain").await;
    (token, system_id)
}

fn part<'a>(parts: &'a Value, part_id: &str) -> Option<&'a Value> {
    parts
        .as_array()?
        .iter()
        .find(|p| p["partId"] == part_id)
}

#[tokio::test]
async fn fetch_bom_normalizes_columns() {
    let app = TestApp::new().await;
    let (token, _) = team_with_system(&app, 254).await;

    let table = json!({
        "headers": [
            {"name": "Name", "id": "h1"},
            {"name": "Material", "id": "h2"},
            {"name": "Process 2", "id": "h3"}
        ],
        "rows": [{
            "headerIdToValue": {
                "h1": "Gusset",
                "h2": {"displayName": "Polycarbonate"},
                "h3": null
            },
            "itemSource": {"partId": "JFD"}
        }]
    });
    mount_bom(&app, table).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/bom",
            Some(json!({
                "document_url": ASSEMBLY_URL,
                "access_key": "access",
                "secret_key": "secret",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let gusset = &body["data"]["bom_data"][0];
    assert_eq!(gusset["Part Name"], "Gusset");
    assert_eq!(gusset["Description"], "Unknown");
    assert_eq!(gusset["Quantity"], "N/A");
    assert_eq!(gusset["Material"], "Polycarbonate");
    assert_eq!(gusset["materialBOM"], "Polycarbonate");
    assert_eq!(gusset["Process 2"], "Unknown");
    assert_eq!(gusset["partId"], "JFD");
    assert_eq!(gusset["preProcessQuantity"], 0);
}

#[tokio::test]
async fn reimport_carries_counters_by_part_id() {
    let app = TestApp::new().await;
    let (token, system_id) = team_with_system(&app, 1678).await;

    mount_bom(&app, bom_table(&[("P1", "Bracket", "4"), ("P2", "Spacer", "2")])).await;
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/bom/import"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 2);

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/systems/{system_id}/bom/parts/P1"),
            Some(json!({"preProcessQuantity": 3, "process1Quantity": 10})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let updated = &body["data"];
    assert_eq!(updated["preProcessQuantity"], 3);
    // Clamped to the part quantity
    assert_eq!(updated["process1Quantity"], 4);
    assert_eq!(updated["progress"]["status"], "in-progress");
    assert_eq!(updated["progress"]["currentProcess"], "pre-process");
    assert_eq!(updated["progress"]["remaining"], 1);

    mount_bom(&app, bom_table(&[("P1", "Bracket v2", "4"), ("P3", "Axle", "1")])).await;
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/bom/import"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let parts = &body["data"]["parts"];
    let bracket = part(parts, "P1").expect("P1 kept");
    assert_eq!(bracket["Part Name"], "Bracket v2");
    assert_eq!(bracket["preProcessQuantity"], 3);
    assert_eq!(bracket["process1Quantity"], 4);

    let axle = part(parts, "P3").expect("P3 added");
    assert_eq!(axle["preProcessQuantity"], 0);
    assert_eq!(axle["progress"]["status"], "not-started");

    assert!(part(parts, "P2").is_none());

    let (_, body) = app
        .send(Method::GET, &format!("/api/systems/{system_id}"), None, Some(&token))
        .await;
    assert_eq!(body["data"]["part_count"], 2);
    assert!(body["data"]["bom_updated_at"].is_string());
}

#[tokio::test]
async fn bom_filters_select_parts() {
    let app = TestApp::new().await;
    let (token, system_id) = team_with_system(&app, 118).await;

    mount_bom(&app, bom_table(&[("P1", "Bracket", "2"), ("P2", "Spacer", "2")])).await;
    app.send(
        Method::POST,
        &format!("/api/systems/{system_id}/bom/import"),
        None,
        Some(&token),
    )
    .await;
    app.send(
        Method::PATCH,
        &format!("/api/systems/{system_id}/bom/parts/P1"),
        Some(json!({"preProcessQuantity": 2, "process1Quantity": 2})),
        Some(&token),
    )
    .await;

    let cases = [
        ("completed", vec!["P1"]),
        ("not-started", vec!["P2"]),
        ("pre-process", vec!["P2"]),
        ("Mill", vec!["P1", "P2"]),
        ("cots", vec![]),
        ("all", vec!["P1", "P2"]),
    ];
    for (filter, expected) in cases {
        let (status, body) = app
            .send(
                Method::GET,
                &format!("/api/systems/{system_id}/bom?filter={filter}"),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 2);
        let ids: Vec<&str> = body["data"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["partId"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(ids, expected, "filter {filter}");
    }
}

#[tokio::test]
async fn saved_bom_counters_are_clamped_and_clearable() {
    let app = TestApp::new().await;
    let (token, system_id) = team_with_system(&app, 2767).await;

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/systems/{system_id}/bom"),
            Some(json!({"parts": [{
                "Part Name": "Plate",
                "Quantity": "2",
                "Pre Process": "Laser",
                "partId": "X1",
                "preProcessQuantity": 7
            }]})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let plate = &body["data"]["parts"][0];
    assert_eq!(plate["preProcessQuantity"], 2);
    assert_eq!(plate["Material"], "Unknown");
    assert_eq!(plate["progress"]["status"], "completed");

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/systems/{system_id}/bom"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn progress_for_unknown_part_is_not_found() {
    let app = TestApp::new().await;
    let (token, system_id) = team_with_system(&app, 3539).await;

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/systems/{system_id}/bom/parts/missing"),
            Some(json!({"process2Quantity": 1})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/systems/{system_id}/bom/parts/missing"),
            Some(json!({})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_requires_configured_credentials() {
    let app = TestApp::new().await;
    let token = app.register_team(4911).await;
    let robot_id = app.create_robot(&token, "Comp").await;

    let (_, body) = app
        .send(
            Method::POST,
            &format!("/api/robots/{robot_id}/systems"),
            Some(json!({"name": "Climber", "assembly_url": ASSEMBLY_URL})),
            Some(&token),
        )
        .await;
    let system_id = common::id_of(&body);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/bom/import"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.contains("not configured")));
}

#[tokio::test]
async fn onshape_rejection_is_reported() {
    let app = TestApp::new().await;
    let (token, system_id) = team_with_system(&app, 1538).await;

    Mock::given(method("GET"))
        .and(path(BOM_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad API keys"))
        .expect(1)
        .mount(&app.onshape)
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/bom/import"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("401"), "{message}");
    assert!(message.contains("bad API keys"), "{message}");

    // The stored snapshot is untouched
    let (_, body) = app
        .send(Method::GET, &format!("/api/systems/{system_id}"), None, Some(&token))
        .await;
    assert_eq!(body["data"]["part_count"], 0);
}

#[tokio::test]
async fn members_record_progress_but_cannot_import() {
    let app = TestApp::new().await;
    let (admin, system_id) = team_with_system(&app, 973).await;

    mount_bom(&app, bom_table(&[("P1", "Bracket", "4")])).await;
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/bom/import"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let member = app.login(973, MEMBER_PASSWORD).await;
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/systems/{system_id}/bom/parts/P1"),
            Some(json!({"preProcessQuantity": 1})),
            Some(&member),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/systems/{system_id}/bom/import"),
            None,
            Some(&member),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/systems/{system_id}/bom"),
            None,
            Some(&member),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
