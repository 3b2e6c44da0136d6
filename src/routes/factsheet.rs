use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::models::FactsheetPreview;
use crate::services::factsheet_service::{generate_factsheet, preview_factsheet};
use crate::services::template_service::{template_csv, TEMPLATE_CONTENT_TYPE, TEMPLATE_FILE_NAME};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generate))
        .route("/preview", post(preview))
        .route("/template", get(download_template))
}

/// Fields of the upload form.
#[derive(Debug)]
struct FactsheetUpload {
    file: Vec<u8>,
    logo: Option<Vec<u8>>,
}

async fn read_upload(mut multipart: Multipart) -> Result<FactsheetUpload, AppError> {
    let mut file = None;
    let mut logo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        match name.as_str() {
            "file" => file = Some(bytes.to_vec()),
            // Browsers send an empty part when no logo was chosen.
            "logo" if !bytes.is_empty() => logo = Some(bytes.to_vec()),
            "logo" => {}
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    let file = file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::Upload("no table was uploaded in the 'file' field".to_string()))?;

    Ok(FactsheetUpload { file, logo })
}

pub async fn generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/factsheet - Generating factsheet");

    let upload = read_upload(multipart).await?;
    let config = state.config.clone();

    let factsheet = tokio::task::spawn_blocking(move || {
        generate_factsheet(&upload.file, upload.logo.as_deref(), &config)
    })
    .await
    .map_err(|e| {
        error!("Factsheet task failed: {}", e);
        AppError::Internal(e.to_string())
    })??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, factsheet.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", factsheet.file_name),
            ),
        ],
        factsheet.bytes,
    ))
}

pub async fn preview(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FactsheetPreview>, AppError> {
    info!("POST /api/factsheet/preview - Previewing upload");

    let upload = read_upload(multipart).await?;
    let config = state.config.clone();

    let preview = tokio::task::spawn_blocking(move || {
        preview_factsheet(&upload.file, upload.logo.as_deref(), &config)
    })
    .await
    .map_err(|e| {
        error!("Preview task failed: {}", e);
        AppError::Internal(e.to_string())
    })??;

    Ok(Json(preview))
}

pub async fn download_template(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    info!("GET /api/factsheet/template - Downloading template");

    let csv = template_csv(&state.config.schema).map_err(|e| {
        error!("Failed to build template: {}", e);
        e
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, TEMPLATE_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", TEMPLATE_FILE_NAME),
            ),
        ],
        csv,
    ))
}
