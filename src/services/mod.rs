pub mod contacts;
pub mod spreadsheet;
