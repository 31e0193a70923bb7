use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    services::spreadsheet::{SpreadsheetService, EXPORT_FILE_NAME, XLSX_CONTENT_TYPE},
    AppState,
};

use super::contacts::MessageResponse;

pub async fn export_contacts(State(state): State<AppState>) -> AppResult<Response> {
    let spreadsheet_service = SpreadsheetService::new(state.db);
    let workbook = spreadsheet_service.export().await?;

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
        ),
    ];

    Ok((headers, workbook).into_response())
}

pub async fn import_contacts(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<MessageResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        if field.file_name().map_or(true, str::is_empty) {
            return Err(AppError::BadRequest("No file selected".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

        let spreadsheet_service = SpreadsheetService::new(state.db);
        let count = spreadsheet_service.import(data).await?;

        return Ok(Json(MessageResponse {
            message: format!("Successfully imported {} contacts", count),
        }));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}
