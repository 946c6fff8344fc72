//! JSON endpoints. Every response is a `{"success": bool, ...}` envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::AppState;
use crate::error::ImagegenError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateForm {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    api_key: String,
}

/// handles GET /get-api-key
pub(crate) async fn get_api_key_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ImagegenError> {
    let api_key = state.keys.load().ok_or(ImagegenError::MissingApiKey)?;
    Ok(Json(json!({"success": true, "api_key": api_key})))
}

/// handles POST /generate
#[instrument(skip_all)]
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    form: Result<Json<GenerateForm>, JsonRejection>,
) -> Result<Json<Value>, ImagegenError> {
    let Json(form) = form.map_err(|err| ImagegenError::BadRequest(err.body_text()))?;
    let prompt = form.prompt.trim();
    let api_key = form.api_key.trim();
    if prompt.is_empty() {
        return Err(ImagegenError::BadRequest("Please enter a prompt.".to_string()));
    }
    if api_key.is_empty() {
        return Err(ImagegenError::BadRequest(
            "Please enter an API key.".to_string(),
        ));
    }

    info!("Generating image for prompt {:?}", prompt);
    let image = state.gemini.generate(prompt, api_key).await?;
    let record = state.store.save(&image, prompt).await?;

    Ok(Json(json!({
        "success": true,
        "filename": record.filename,
        "path": format!("/image/{}", record.filename),
        "size": record.file_size,
    })))
}

/// handles GET /images
pub(crate) async fn images_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ImagegenError> {
    let images = state.catalog.list().await?;
    Ok(Json(json!({"success": true, "images": images})))
}

/// handles DELETE /delete/{filename}
pub(crate) async fn delete_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ImagegenError> {
    state.store.delete(&filename).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{filename} deleted"),
    })))
}

/// handles GET /metadata
pub(crate) async fn metadata_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ImagegenError> {
    let data = state.catalog.raw_metadata().await?;
    Ok(Json(json!({"success": true, "data": data})))
}

/// handles GET /reconcile
pub(crate) async fn reconcile_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ImagegenError> {
    let report = state.catalog.reconcile().await?;
    Ok(Json(json!({
        "success": true,
        "consistent": report.is_consistent(),
        "orphan_files": report.orphan_files,
        "dangling_records": report.dangling_records,
    })))
}
