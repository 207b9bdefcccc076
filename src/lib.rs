//! FRC BOM Tracker API Library
//!
//! Team accounts, robots and Onshape-backed BOM snapshots with per-part
//! manufacturing progress, plus CAD export through Onshape translations.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod models;
pub mod onshape;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    response::Json,
    routing::{get, patch, post},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService, Role};
use crate::onshape::CadVendor;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service from a connection, a config and a CAD vendor.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        vendor: Arc<dyn CadVendor>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(auth::AuthConfig::from(&config)));
        let services = handlers::AppServices::new(db.clone(), auth.clone(), vendor, &config);
        Self {
            db,
            config,
            auth,
            services,
        }
    }

    pub fn team_service(&self) -> Arc<services::teams::TeamService> {
        self.services.teams.clone()
    }

    pub fn robot_service(&self) -> Arc<services::robots::RobotService> {
        self.services.robots.clone()
    }

    pub fn system_service(&self) -> Arc<services::systems::SystemService> {
        self.services.systems.clone()
    }

    pub fn machine_service(&self) -> Arc<services::machines::MachineService> {
        self.services.machines.clone()
    }

    pub fn bom_service(&self) -> Arc<services::bom::BomService> {
        self.services.bom.clone()
    }

    pub fn export_service(&self) -> Arc<services::export::ExportService> {
        self.services.export.clone()
    }

    pub fn admin_service(&self) -> Arc<services::admin::AdminService> {
        self.services.admin.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api` route, grouped by the role it requires.
pub fn api_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/admin/login", post(handlers::auth::admin_login))
        .route("/team_exists", get(handlers::auth::team_exists))
        .route("/status", get(api_status));

    let session = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .with_auth();

    // Any signed-in team member
    let member = Router::new()
        .route("/teams/me", get(handlers::teams::get_current_team))
        .route("/robots", get(handlers::robots::list_robots))
        .route("/robots/:robot_id", get(handlers::robots::get_robot))
        .route(
            "/robots/:robot_id/systems",
            get(handlers::systems::list_systems),
        )
        .route(
            "/robots/:robot_id/machines",
            get(handlers::machines::list_machines),
        )
        .route("/systems/:system_id", get(handlers::systems::get_system))
        .route(
            "/machines/:machine_id",
            get(handlers::machines::get_machine),
        )
        .route(
            "/systems/:system_id/bom",
            get(handlers::bom::get_system_bom).put(handlers::bom::save_system_bom),
        )
        .route(
            "/systems/:system_id/bom/parts/:part_id",
            patch(handlers::bom::update_part_progress),
        )
        .with_role(Role::Member);

    let team_admin = Router::new()
        .route(
            "/teams/me",
            patch(handlers::teams::update_current_team)
                .delete(handlers::teams::delete_current_team),
        )
        .route("/robots", post(handlers::robots::create_robot))
        .route(
            "/robots/:robot_id",
            patch(handlers::robots::update_robot).delete(handlers::robots::delete_robot),
        )
        .route(
            "/robots/:robot_id/systems",
            post(handlers::systems::create_system),
        )
        .route(
            "/robots/:robot_id/machines",
            post(handlers::machines::create_machine),
        )
        .route(
            "/systems/:system_id",
            patch(handlers::systems::update_system).delete(handlers::systems::delete_system),
        )
        .route(
            "/machines/:machine_id",
            patch(handlers::machines::update_machine)
                .delete(handlers::machines::delete_machine),
        )
        .route("/bom", post(handlers::bom::fetch_bom))
        .route(
            "/systems/:system_id/bom",
            axum::routing::delete(handlers::bom::clear_system_bom),
        )
        .route(
            "/systems/:system_id/bom/import",
            post(handlers::bom::import_system_bom),
        )
        .route(
            "/systems/:system_id/export",
            post(handlers::export::export_part),
        )
        .with_role(Role::TeamAdmin);

    let admin = Router::new()
        .route("/admin/teams", get(handlers::admin::list_teams))
        .route(
            "/admin/teams/:team_number/bom",
            get(handlers::admin::get_team_bom),
        )
        .route(
            "/admin/bom_dict",
            get(handlers::admin::get_bom_dict).post(handlers::admin::restore_bom_dict),
        )
        .route(
            "/admin/settings_dict",
            get(handlers::admin::get_settings_dict).post(handlers::admin::restore_settings_dict),
        )
        .with_role(Role::Admin);

    Router::new()
        .merge(public)
        .merge(session)
        .merge(member)
        .merge(team_admin)
        .merge(admin)
}

/// Builds the CORS layer, or `None` when the config allows no origins.
pub fn cors_layer(cfg: &config::AppConfig) -> Option<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        let layer = CorsLayer::new().allow_origin(origins);
        // Wildcards are rejected alongside credentials, so mirror instead
        Some(if cfg.cors_allow_credentials {
            layer
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        } else {
            layer.allow_methods(Any).allow_headers(Any)
        })
    } else if cfg.should_allow_permissive_cors() {
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

/// The complete application: API, health probes, Swagger UI and middleware.
pub fn app_router(state: AppState) -> Router {
    let mut app = Router::<AppState>::new()
        .nest("/api", api_routes())
        .nest("/health", health::health_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        // Auth middleware reads the service from request extensions
        .layer(Extension(state.auth.clone()))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ));

    if let Some(cors) = cors_layer(&state.config) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

async fn api_status(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "frcbom-api",
        "environment": state.config.environment,
        "onshape": state.config.onshape.base_url,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}
