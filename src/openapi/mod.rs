use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FRC BOM Tracker API",
        version = "1.0.0",
        description = r#"
# FRC BOM Tracker API

Tracks the bill of materials of FIRST Robotics Competition robots and how far
each part has moved through the team's shop.

## Features

- **Teams**: Register a team number with a member password and an admin password
- **Robots, Systems and Machines**: Organize a season's robot into Onshape-backed systems
- **BOM Sync**: Pull an assembly's bill of materials from Onshape, keeping progress counters
- **Progress Tracking**: Count parts through pre-process, process 1 and process 2
- **CAD Export**: Translate a part to STEP, STL and other formats for a machine
- **Admin Dump/Restore**: Move every team's BOMs and settings between deployments

## Authentication

Log in with a team number and password to get a JWT, then send it on every request:

```
Authorization: Bearer <your-jwt-token>
```

The member password grants read access and progress updates. The admin password
grants full control of the team's data.

## Error Handling

Failures share one body shape:

```json
{
  "error": "Not Found",
  "message": "Not found: System 550e8400-e29b-41d4-a716-446655440000 not found",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "teams", description = "The signed-in team"),
        (name = "robots", description = "Robots of a team"),
        (name = "systems", description = "Onshape-backed subsystems of a robot"),
        (name = "machines", description = "Shop machines and their export formats"),
        (name = "bom", description = "BOM snapshots and part progress"),
        (name = "export", description = "CAD export through Onshape translations"),
        (name = "admin", description = "Site administration")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::admin_login,
        crate::handlers::auth::logout,
        crate::handlers::auth::team_exists,

        // Teams
        crate::handlers::teams::get_current_team,
        crate::handlers::teams::update_current_team,
        crate::handlers::teams::delete_current_team,

        // Robots
        crate::handlers::robots::list_robots,
        crate::handlers::robots::create_robot,
        crate::handlers::robots::get_robot,
        crate::handlers::robots::update_robot,
        crate::handlers::robots::delete_robot,

        // Systems
        crate::handlers::systems::list_systems,
        crate::handlers::systems::create_system,
        crate::handlers::systems::get_system,
        crate::handlers::systems::update_system,
        crate::handlers::systems::delete_system,

        // Machines
        crate::handlers::machines::list_machines,
        crate::handlers::machines::create_machine,
        crate::handlers::machines::get_machine,
        crate::handlers::machines::update_machine,
        crate::handlers::machines::delete_machine,

        // BOM
        crate::handlers::bom::fetch_bom,
        crate::handlers::bom::get_system_bom,
        crate::handlers::bom::save_system_bom,
        crate::handlers::bom::clear_system_bom,
        crate::handlers::bom::import_system_bom,
        crate::handlers::bom::update_part_progress,

        // Export
        crate::handlers::export::export_part,

        // Admin
        crate::handlers::admin::list_teams,
        crate::handlers::admin::get_team_bom,
        crate::handlers::admin::get_bom_dict,
        crate::handlers::admin::restore_bom_dict,
        crate::handlers::admin::get_settings_dict,
        crate::handlers::admin::restore_settings_dict,
    ),
    components(
        schemas(
            crate::models::Part,
            crate::models::PartProgress,
            crate::models::PartStatus,
            crate::models::Stage,
            crate::auth::Role,
            crate::services::export::ExportDelivery,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
