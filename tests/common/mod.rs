#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use frcbom_api::{
    app_router,
    auth::hash_password,
    config::{AppConfig, OnshapeConfig, DEV_DEFAULT_JWT_SECRET},
    db,
    onshape::OnshapeClient,
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

pub const SITE_ADMIN_PASSWORD: &str = "site-admin-password";
pub const MEMBER_PASSWORD: &str = "pit-crew";
pub const TEAM_ADMIN_PASSWORD: &str = "lead-mentor";

/// Assembly URL whose document, workspace and element ids the mocks match on.
pub const ASSEMBLY_URL: &str = "https://cad.onshape.com/documents/doc1/w/ws1/e/asm1";
pub const PART_STUDIO_URL: &str = "https://cad.onshape.com/documents/doc1/w/ws1/e/ps1";

/// Full application over a file-backed SQLite database, with Onshape
/// replaced by a wiremock server.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub onshape: MockServer,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_poll(3, 10).await
    }

    /// Same as [`TestApp::new`] with a custom export poll budget.
    pub async fn with_poll(max_attempts: u32, interval_ms: u64) -> Self {
        let onshape = MockServer::start().await;
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("frcbom_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            DEV_DEFAULT_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.admin_password_hash =
            Some(hash_password(SITE_ADMIN_PASSWORD).expect("hash admin password"));
        cfg.onshape = OnshapeConfig {
            base_url: onshape.uri(),
            request_timeout_secs: 5,
            export_poll_interval_ms: interval_ms,
            export_max_attempts: max_attempts,
        };

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let vendor = OnshapeClient::new(&cfg.onshape).expect("build Onshape client");
        let state = AppState::new(Arc::new(pool), cfg, Arc::new(vendor));
        let router = app_router(state.clone());

        Self {
            router,
            state,
            onshape,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and decodes the JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    /// Registers a team and returns its team-admin token.
    pub async fn register_team(&self, team_number: i32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/register",
                Some(json!({
                    "team_name": format!("Team {team_number}"),
                    "team_number": team_number,
                    "password": MEMBER_PASSWORD,
                    "admin_password": TEAM_ADMIN_PASSWORD,
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        token_of(&body["data"]["token"])
    }

    pub async fn login(&self, team_number: i32, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/login",
                Some(json!({"team_number": team_number, "password": password})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        token_of(&body["data"])
    }

    pub async fn site_admin_token(&self) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/admin/login",
                Some(json!({"password": SITE_ADMIN_PASSWORD})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        token_of(&body["data"])
    }

    pub async fn create_robot(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/robots",
                Some(json!({"name": name, "year": 2024})),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create robot failed: {body}");
        id_of(&body)
    }

    /// Creates a system wired to the mock Onshape document.
    pub async fn create_system(&self, token: &str, robot_id: Uuid, name: &str) -> Uuid {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/robots/{robot_id}/systems"),
                Some(json!({
                    "name": name,
                    "assembly_url": ASSEMBLY_URL,
                    "part_studio_urls": [PART_STUDIO_URL],
                    "access_key": "access",
                    "secret_key": "secret",
                })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create system failed: {body}");
        id_of(&body)
    }

    pub async fn create_machine(&self, token: &str, robot_id: Uuid, name: &str, format: &str) -> Uuid {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/robots/{robot_id}/machines"),
                Some(json!({"name": name, "output_format": format})),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create machine failed: {body}");
        id_of(&body)
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

fn token_of(token: &Value) -> String {
    token["access_token"]
        .as_str()
        .expect("access_token in response")
        .to_string()
}

pub fn id_of(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("id in response data")
}

/// BOM table in Onshape's shape, one row per `(part_id, name, quantity)`.
pub fn bom_table(rows: &[(&str, &str, &str)]) -> Value {
    json!({
        "headers": [
            {"name": "Name", "id": "h-name"},
            {"name": "Quantity", "id": "h-qty"},
            {"name": "Material", "id": "h-mat"},
            {"name": "Pre Process", "id": "h-pre"},
            {"name": "Process 1", "id": "h-p1"}
        ],
        "rows": rows.iter().map(|(part_id, name, qty)| json!({
            "headerIdToValue": {
                "h-name": name,
                "h-qty": qty,
                "h-mat": {"displayName": "Aluminum 6061", "id": "al6061"},
                "h-pre": "Saw",
                "h-p1": "Mill"
            },
            "itemSource": {"partId": part_id}
        })).collect::<Vec<_>>()
    })
}
