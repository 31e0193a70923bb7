use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Contact errors
    #[error("Contact not found")]
    ContactNotFound,

    // Spreadsheet errors
    #[error("No data to export")]
    NoDataToExport,
    #[error("{0}")]
    InvalidSpreadsheet(String),

    // Validation errors
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Spreadsheet backend errors
    #[error("Failed to read spreadsheet: {0}")]
    SpreadsheetRead(#[from] calamine::Error),
    #[error("Failed to write spreadsheet: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::NoDataToExport
            | AppError::InvalidSpreadsheet(_) => StatusCode::BAD_REQUEST,

            AppError::ContactNotFound => StatusCode::NOT_FOUND,

            AppError::Database(_) | AppError::SpreadsheetRead(_) | AppError::SpreadsheetWrite(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        // 500 Internal Server Error
        if status.is_server_error() {
            tracing::error!("{}", message);
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
