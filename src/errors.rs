use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures of a single factsheet pipeline run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FactsheetError {
    #[error("Could not read the uploaded table: {0}")]
    Parse(String),
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Required fields are empty: {}", .0.join(", "))]
    EmptyFields(Vec<String>),
    #[error("Column '{column}' (row {row}) is not a valid number: '{value}'")]
    NumericFormat {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl FactsheetError {
    /// Name of the pipeline step that failed, shown to the user.
    pub fn step(&self) -> &'static str {
        match self {
            FactsheetError::Parse(_) => "table loading",
            FactsheetError::MissingColumns(_) | FactsheetError::EmptyFields(_) => "validation",
            FactsheetError::NumericFormat { .. } => "numeric parsing",
            FactsheetError::Render(_) => "rendering",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Factsheet {} failed: {}", .0.step(), .0)]
    Factsheet(#[from] FactsheetError),
    #[error("Invalid upload: {0}")]
    Upload(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, step) = match &self {
            AppError::Factsheet(e) => {
                let status = match e {
                    FactsheetError::Parse(_) => StatusCode::BAD_REQUEST,
                    FactsheetError::MissingColumns(_)
                    | FactsheetError::EmptyFields(_)
                    | FactsheetError::NumericFormat { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    FactsheetError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.step())
            }
            AppError::Upload(_) => (StatusCode::BAD_REQUEST, "upload"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let mut body = json!({
            "step": step,
            "message": self.to_string(),
        });
        if let AppError::Factsheet(FactsheetError::MissingColumns(columns)) = &self {
            body["missing_columns"] = json!(columns);
        }

        (status, Json(body)).into_response()
    }
}
