use std::{fs, path::PathBuf};

use cart_api::openapi::ApiDocV1;
use utoipa::OpenApi;

/// Writes the OpenAPI document to `openapi/cart-api.v1.json`, or to the path given as the first argument.
fn main() -> anyhow::Result<()> {
    let openapi = ApiDocV1::openapi();
    let json = serde_json::to_string_pretty(&openapi)?;

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi").join("cart-api.v1.json"));
    if let Some(dir) = output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    fs::write(&output_path, json)?;

    println!("OpenAPI spec written to {}", output_path.display());
    Ok(())
}
