use std::{collections::HashMap, io::Cursor};

use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{method_type::SPREADSHEET_COLUMNS, Contact, ContactDetail},
    services::contacts::{insert_contact, insert_details, NewDetail},
};

pub const EXPORT_FILE_NAME: &str = "contacts_export.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Contacts";
const NAME_COLUMN: &str = "Name";
const FAVORITE_COLUMN: &str = "Is Favorite";
const EXPORT_SEPARATOR: &str = "; ";

/// One contact flattened into a sheet row. `methods` follows
/// `SPREADSHEET_COLUMNS` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub name: String,
    pub is_favorite: bool,
    pub methods: [String; 4],
}

/// One sheet row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub name: String,
    pub details: Vec<NewDetail>,
}

pub struct SpreadsheetService {
    db: SqlitePool,
}

impl SpreadsheetService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Export every contact as an xlsx workbook.
    pub async fn export(&self) -> AppResult<Vec<u8>> {
        let mut conn = self.db.acquire().await?;

        let contacts: Vec<Contact> =
            sqlx::query_as("SELECT id, name, is_favorite FROM contacts ORDER BY id")
                .fetch_all(&mut *conn)
                .await?;

        if contacts.is_empty() {
            return Err(AppError::NoDataToExport);
        }

        let details: Vec<ContactDetail> = sqlx::query_as(
            "SELECT id, contact_id, method_type, value FROM contact_details ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;

        let rows = export_rows(&contacts, &details);
        let bytes = write_workbook(&rows)?;

        tracing::info!("Exported {} contacts ({} bytes)", rows.len(), bytes.len());
        Ok(bytes)
    }

    /// Import a workbook, returning how many contacts were created. Either
    /// every row lands or none does.
    pub async fn import(&self, bytes: Bytes) -> AppResult<usize> {
        let rows = read_workbook(bytes)?;

        let mut tx = self.db.begin().await?;
        for row in &rows {
            let id = insert_contact(&mut tx, &row.name, false).await?;
            insert_details(&mut tx, id, &row.details).await?;
        }
        tx.commit().await?;

        tracing::info!("Imported {} contacts", rows.len());
        Ok(rows.len())
    }
}

/// Pivot details into one row per contact. Values of the same type are
/// joined into one cell; types without a column are dropped.
pub fn export_rows(contacts: &[Contact], details: &[ContactDetail]) -> Vec<ExportRow> {
    let mut by_contact: HashMap<i64, Vec<&ContactDetail>> = HashMap::new();
    for detail in details {
        by_contact.entry(detail.contact_id).or_default().push(detail);
    }

    contacts
        .iter()
        .map(|contact| {
            let own = by_contact.get(&contact.id).map(Vec::as_slice).unwrap_or(&[]);
            let methods = SPREADSHEET_COLUMNS.map(|kind| {
                own.iter()
                    .filter(|d| d.method_type == kind)
                    .map(|d| d.value.as_str())
                    .collect::<Vec<_>>()
                    .join(EXPORT_SEPARATOR)
            });

            ExportRow {
                name: contact.name.clone(),
                is_favorite: contact.is_favorite,
                methods,
            }
        })
        .collect()
}

pub fn write_workbook(rows: &[ExportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let headers = [NAME_COLUMN, FAVORITE_COLUMN]
        .into_iter()
        .chain(SPREADSHEET_COLUMNS);
    for (col, header) in headers.enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        worksheet.set_column_width(col as u16, 24)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        worksheet.write_string(r, 0, row.name.as_str())?;
        worksheet.write_string(r, 1, if row.is_favorite { "Yes" } else { "No" })?;
        for (j, value) in row.methods.iter().enumerate() {
            worksheet.write_string(r, j as u16 + 2, value.as_str())?;
        }
    }

    workbook.save_to_buffer()
}

/// Parse the first worksheet. The header row must have a `Name` column;
/// rows with a blank name are skipped. `Is Favorite` is export-only and
/// ignored here.
pub fn read_workbook(bytes: Bytes) -> AppResult<Vec<ImportRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        AppError::InvalidSpreadsheet("Spreadsheet has no worksheets".to_string())
    })??;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();
    let column = |title: &str| header.iter().position(|h| h == title);

    let name_col = column(NAME_COLUMN).ok_or_else(|| {
        AppError::InvalidSpreadsheet(
            "Excel format incorrect. Must have \"Name\" column.".to_string(),
        )
    })?;
    let method_cols: Vec<(&str, usize)> = SPREADSHEET_COLUMNS
        .iter()
        .filter_map(|&kind| column(kind).map(|idx| (kind, idx)))
        .collect();

    let mut parsed = Vec::new();
    for cells in rows {
        let text_at = |idx: usize| cells.get(idx).map(cell_text).unwrap_or_default();

        let name = text_at(name_col).trim().to_string();
        if name.is_empty() {
            continue;
        }

        let details = method_cols
            .iter()
            .flat_map(|&(kind, idx)| {
                split_cell(&text_at(idx))
                    .into_iter()
                    .map(move |value| NewDetail::new(kind, value))
            })
            .collect();

        parsed.push(ImportRow { name, details });
    }

    Ok(parsed)
}

/// Split a multi-value cell on `;`, trimming fragments and dropping empties.
pub fn split_cell(cell: &str) -> Vec<String> {
    cell.split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // f64's Display drops the ".0" of whole numbers, so phone numbers
        // stored as numbers come back as plain digits.
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}
