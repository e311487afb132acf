//! Narrow seam to the spreadsheet backend.
//!
//! The store adapter only ever needs four primitives: read a whole tab
//! as a string grid, append one row, overwrite one cell, and write a
//! header row. Everything defensive (alias resolution, retries, raw
//! scans) lives above this trait; everything transport-ish (auth,
//! ranges, JSON shapes) lives below it. Tests substitute an in-memory
//! implementation.

use async_trait::async_trait;
use serde_json::json;

use crate::core::config::{network, Config};
use crate::core::error::{AppError, AppResult};

/// Row-oriented access to one spreadsheet.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Entire grid of a tab, header row first, cells as strings.
    /// Trailing empty cells may be absent per row.
    async fn read_grid(&self, tab: &str) -> AppResult<Vec<Vec<String>>>;

    /// Appends one row after the last non-empty row of the tab.
    async fn append_row(&self, tab: &str, row: Vec<String>) -> AppResult<()>;

    /// Overwrites a single cell. Zero-based row and column.
    async fn update_cell(&self, tab: &str, row: usize, col: usize, value: &str) -> AppResult<()>;

    /// Overwrites the header row of the tab.
    async fn write_header_row(&self, tab: &str, headers: &[&str]) -> AppResult<()>;
}

/// Google Sheets v4 `values` client. The API protocol itself is not
/// this system's concern; this is the thinnest workable binding.
pub struct HttpSheets {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl HttpSheets {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(network::timeout())
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            http,
            base: format!(
                "https://sheets.googleapis.com/v4/spreadsheets/{}",
                config.spreadsheet_id
            ),
            token: config.sheets_token.clone(),
        })
    }

    /// Test-only constructor pointing at an arbitrary base URL.
    pub fn with_base(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
            token: token.into(),
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!("{}/values/{}{}", self.base, urlencoding::encode(range), suffix)
    }

    async fn check(resp: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(AppError::Store(format!("{} failed ({}): {}", what, status, body)))
        }
    }
}

/// Spreadsheet column index as an A1 letter run (0 -> A, 26 -> AA).
fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

#[async_trait]
impl SheetsApi for HttpSheets {
    async fn read_grid(&self, tab: &str) -> AppResult<Vec<Vec<String>>> {
        let url = self.values_url(tab, "?valueRenderOption=UNFORMATTED_VALUE");
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let body: serde_json::Value = Self::check(resp, "values read").await?.json().await?;
        let rows = body
            .get("values")
            .and_then(|v| v.as_array())
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_to_string).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn append_row(&self, tab: &str, row: Vec<String>) -> AppResult<()> {
        let url = self.values_url(
            &format!("{}!A1", tab),
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        Self::check(resp, "row append").await?;
        Ok(())
    }

    async fn update_cell(&self, tab: &str, row: usize, col: usize, value: &str) -> AppResult<()> {
        let a1 = format!("{}!{}{}", tab, column_letter(col), row + 1);
        let url = self.values_url(&a1, "?valueInputOption=RAW");
        let resp = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": [[value]] }))
            .send()
            .await?;
        Self::check(resp, "cell update").await?;
        Ok(())
    }

    async fn write_header_row(&self, tab: &str, headers: &[&str]) -> AppResult<()> {
        let a1 = format!("{}!A1", tab);
        let url = self.values_url(&a1, "?valueInputOption=RAW");
        let resp = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": [headers] }))
            .send()
            .await?;
        Self::check(resp, "header write").await?;
        Ok(())
    }
}

/// The API returns numbers unquoted under UNFORMATTED_VALUE; ids that
/// came back as floats must not grow a ".0" suffix.
fn cell_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 9e15 {
                    (f as i64).to_string()
                } else {
                    f.to_string()
                }
            } else {
                n.to_string()
            }
        }
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(8), "I");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[test]
    fn numeric_cells_keep_integer_shape() {
        assert_eq!(cell_to_string(&serde_json::json!(1700000000000_i64)), "1700000000000");
        assert_eq!(cell_to_string(&serde_json::json!(1700000000000.0)), "1700000000000");
        assert_eq!(cell_to_string(&serde_json::json!("text")), "text");
        assert_eq!(cell_to_string(&serde_json::Value::Null), "");
    }
}
