use std::{env, fs, path::PathBuf};

use frcbom_api::openapi::ApiDocV1;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi/frcbom-api.v1.json";

/// Writes the OpenAPI document; the first argument overrides the output path.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let openapi = ApiDocV1::openapi();
    let route_count = openapi.paths.paths.len();
    let json = serde_json::to_string_pretty(&openapi)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_path, json)?;

    println!(
        "Wrote {} ({} paths) to {}",
        openapi.info.title,
        route_count,
        output_path.display()
    );
    Ok(())
}
