//! Sample credential sheet
//!
//! Writes a styled workbook with the expected header and a few example rows,
//! as a starting point for `database_credentials.xlsx`.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, Workbook};
use std::path::Path;

pub const TEMPLATE_FILE: &str = "database_credentials_SAMPLE.xlsx";
pub const SHEET_NAME: &str = "Database Credentials";

pub const HEADERS: [&str; 4] = ["database_name", "username", "password", "host"];

pub const SAMPLE_ROWS: [[&str; 4]; 3] = [
    ["myapp_db", "myapp_user", "secure_password_123", "localhost"],
    ["analytics_db", "analytics_user", "another_password_456", "localhost"],
    ["staging_db", "staging_user", "staging_pass_789", "localhost"],
];

const COLUMN_WIDTHS: [f64; 4] = [20.0, 20.0, 25.0, 15.0];

/// Write the sample sheet to `path`, replacing any existing file.
pub fn write_template(path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4));

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, header, &header_format)?;
    }
    for (row, values) in (1u32..).zip(SAMPLE_ROWS) {
        for (col, value) in (0u16..).zip(values) {
            sheet.write_string(row, col, value)?;
        }
    }
    for (col, width) in (0u16..).zip(COLUMN_WIDTHS) {
        sheet.set_column_width(col, width)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
