//! Credential sheet loading
//!
//! The sheet has a header row followed by one row per database with the
//! columns `database_name, username, password, host`. Spreadsheets
//! (`.xlsx`, `.xls`, `.ods`) are read with calamine, `.csv` files with csv.

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::Path;

pub const DEFAULT_HOST: &str = "localhost";

/// One database to migrate.
pub struct DatabaseRecord {
    pub name: String,
    pub username: String,
    pub password: SecretString,
    pub host: String,
}

impl DatabaseRecord {
    /// Build a record, trimming every field and defaulting a blank host.
    pub fn new(name: &str, username: &str, password: &str, host: &str) -> Self {
        let host = host.trim();
        Self {
            name: name.trim().to_string(),
            username: username.trim().to_string(),
            password: SecretString::new(password.trim().to_string()),
            host: if host.is_empty() {
                DEFAULT_HOST.to_string()
            } else {
                host.to_string()
            },
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for DatabaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseRecord")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .finish()
    }
}

/// Turn data rows (header already removed) into records.
///
/// Rows with an empty or missing first cell are skipped; order is kept.
pub fn normalize_rows<I, R>(rows: I) -> Vec<DatabaseRecord>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = Option<String>>,
{
    rows.into_iter()
        .filter_map(|row| {
            let cells: Vec<Option<String>> = row.into_iter().take(4).collect();
            let cell = |idx: usize| cells.get(idx).cloned().flatten().unwrap_or_default();

            let name = cell(0);
            if name.trim().is_empty() {
                return None;
            }
            Some(DatabaseRecord::new(&name, &cell(1), &cell(2), &cell(3)))
        })
        .collect()
}

/// Load the credential sheet at `path`.
pub fn load_credentials(path: &Path) -> Result<Vec<DatabaseRecord>> {
    if !path.exists() {
        bail!("Credentials file not found: {}", path.display());
    }

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let records = if is_csv {
        read_csv(path)
    } else {
        read_workbook(path)
    };
    records.with_context(|| format!("Error reading credentials file {}", path.display()))
}

fn read_csv(path: &Path) -> Result<Vec<DatabaseRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| Some(field.to_string()))
                .collect::<Vec<_>>(),
        );
    }

    Ok(normalize_rows(rows))
}

fn read_workbook(path: &Path) -> Result<Vec<DatabaseRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    // Always the first sheet in tab order, whichever one was active on save.
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no worksheets"))??;

    let rows = range
        .rows()
        .skip(1)
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());

    Ok(normalize_rows(rows))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        // Whole numbers typed into a sheet are read back as floats.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_rows_keep_order_and_skip_blank_names() {
        let records = normalize_rows(vec![
            row(&[Some("sales"), Some("alice"), Some("pw1"), Some("localhost")]),
            row(&[None, Some("ghost"), Some("x"), None]),
            row(&[Some("   "), Some("ghost"), Some("x"), None]),
            row(&[Some(" hr "), Some(" bob "), Some(" pw2 "), Some(" 10.0.0.5 ")]),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "sales");
        assert_eq!(records[0].password(), "pw1");
        assert_eq!(records[1].name, "hr");
        assert_eq!(records[1].username, "bob");
        assert_eq!(records[1].password(), "pw2");
        assert_eq!(records[1].host, "10.0.0.5");
    }

    #[test]
    fn test_missing_cells_default() {
        let records = normalize_rows(vec![
            row(&[Some("analytics")]),
            row(&[Some("staging"), Some("stage"), None, Some("  ")]),
        ]);

        assert_eq!(records[0].username, "");
        assert_eq!(records[0].password(), "");
        assert_eq!(records[0].host, DEFAULT_HOST);
        assert_eq!(records[1].username, "stage");
        assert_eq!(records[1].host, DEFAULT_HOST);
    }

    #[test]
    fn test_debug_redacts_password() {
        let record = DatabaseRecord::new("sales", "alice", "hunter2", "");
        let debug = format!("{:?}", record);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_numeric_cells_render_as_text() {
        assert_eq!(cell_text(&Data::Float(1234.0)), Some("1234".to_string()));
        assert_eq!(cell_text(&Data::Float(12.5)), Some("12.5".to_string()));
        assert_eq!(cell_text(&Data::Int(7)), Some("7".to_string()));
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn test_load_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database_credentials.csv");
        std::fs::write(
            &path,
            "database_name,username,password,host\n\
             sales,alice,pw1,localhost\n\
             ,nobody,nothing,\n\
             hr,bob,pw2\n",
        )
        .unwrap();

        let records = load_credentials(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "sales");
        assert_eq!(records[1].name, "hr");
        assert_eq!(records[1].host, DEFAULT_HOST);
    }

    #[test]
    fn test_load_xlsx() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database_credentials.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in (0u16..).zip(["database_name", "username", "password", "host"]) {
            sheet.write_string(0, col, header).unwrap();
        }
        sheet.write_string(1, 0, "sales").unwrap();
        sheet.write_string(1, 1, "alice").unwrap();
        sheet.write_number(1, 2, 1234.0).unwrap();
        sheet.write_string(2, 1, "ghost").unwrap();
        sheet.write_string(3, 0, " hr ").unwrap();
        sheet.write_string(3, 1, "bob").unwrap();
        sheet.write_string(3, 2, "pw2").unwrap();
        sheet.write_string(3, 3, "10.0.0.5").unwrap();
        workbook.save(&path).unwrap();

        let records = load_credentials(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "sales");
        assert_eq!(records[0].password(), "1234");
        assert_eq!(records[0].host, DEFAULT_HOST);
        assert_eq!(records[1].name, "hr");
        assert_eq!(records[1].host, "10.0.0.5");
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.csv");
        std::fs::write(&path, "database_name,username,password,host\n").unwrap();

        assert!(load_credentials(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_credentials(Path::new("/nonexistent/database_credentials.xlsx"))
            .unwrap_err();
        assert!(err.to_string().contains("Credentials file not found"));
    }

    #[test]
    fn test_unparseable_workbook_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database_credentials.xlsx");
        std::fs::write(&path, "this is not a spreadsheet").unwrap();

        let err = load_credentials(&path).unwrap_err();
        assert!(err.to_string().contains("database_credentials.xlsx"));
    }
}
