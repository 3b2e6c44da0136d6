//! Drives the HTTP router in-process with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use factsheet::app::create_app;
use factsheet::config::{FactsheetConfig, FactsheetSchema};
use factsheet::models::ChartOptions;
use factsheet::state::AppState;

const BOUNDARY: &str = "factsheet-test-boundary";
const MONTHLY_CSV: &[u8] = b"Month,Portfolio Performance,Holdings\nJan,1.5,A\nFeb,2.3,B\nMar,3.8,C\n";

fn app(schema: FactsheetSchema) -> Router {
    let config = FactsheetConfig {
        schema,
        line_chart: ChartOptions { width: 4.0, height: 2.0, dpi: 60 },
        pie_chart: ChartOptions { width: 3.0, height: 3.0, dpi: 60 },
        ..FactsheetConfig::default()
    };
    create_app(AppState::new(config, 10 * 1024 * 1024))
}

/// (field name, file name, content type, bytes)
fn multipart(parts: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(uri: &str, parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart(parts)))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(FactsheetSchema::wide())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn index_serves_upload_page() {
    let response = app(FactsheetSchema::wide())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("/api/factsheet/template"));
}

#[tokio::test]
async fn template_download_is_a_csv_attachment() {
    let first = app(FactsheetSchema::wide())
        .oneshot(Request::get("/api/factsheet/template").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        first.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"factsheet_template.csv\""
    );
    let first = body_bytes(first).await;
    assert!(first.starts_with(b"Fund Name,"));

    let second = app(FactsheetSchema::wide())
        .oneshot(Request::get("/api/factsheet/template").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_bytes(second).await, first);
}

#[tokio::test]
async fn generate_returns_pdf_attachment() {
    let request = upload_request(
        "/api/factsheet",
        &[("file", "fund.csv", "text/csv", MONTHLY_CSV)],
    );
    let response = app(FactsheetSchema::monthly()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"factsheet.pdf\""
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn generate_accepts_empty_logo_field() {
    let request = upload_request(
        "/api/factsheet",
        &[
            ("file", "fund.csv", "text/csv", MONTHLY_CSV),
            ("logo", "", "application/octet-stream", b""),
        ],
    );
    let response = app(FactsheetSchema::monthly()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn template_upload_round_trips_over_http() {
    let template = body_bytes(
        app(FactsheetSchema::wide())
            .oneshot(Request::get("/api/factsheet/template").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    )
    .await;

    let request = upload_request(
        "/api/factsheet",
        &[("file", "factsheet_template.csv", "text/csv", &template)],
    );
    let response = app(FactsheetSchema::wide()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn missing_columns_return_error_message_instead_of_pdf() {
    let request = upload_request(
        "/api/factsheet",
        &[("file", "fund.csv", "text/csv", b"Month,Holdings\nJan,A\n")],
    );
    let response = app(FactsheetSchema::monthly()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["step"], "validation");
    assert_eq!(body["missing_columns"], serde_json::json!(["Portfolio Performance"]));
    assert!(body["message"].as_str().unwrap().contains("Portfolio Performance"));
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let request = upload_request(
        "/api/factsheet",
        &[("logo", "logo.png", "image/png", b"\x89PNG")],
    );
    let response = app(FactsheetSchema::monthly()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["step"], "upload");
}

#[tokio::test]
async fn preview_returns_table_and_chart() {
    let request = upload_request(
        "/api/factsheet/preview",
        &[("file", "fund.csv", "text/csv", MONTHLY_CSV)],
    );
    let response = app(FactsheetSchema::monthly()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["table"]["headers"][0], "Month");
    assert_eq!(body["table"]["rows"].as_array().unwrap().len(), 3);
    assert_eq!(body["input"]["holdings"], serde_json::json!(["A", "B", "C"]));
    assert!(body["performance_chart"].as_str().unwrap().len() > 100);
    assert!(body["sector_chart"].is_null());
    assert_eq!(body["has_logo"], false);
}
