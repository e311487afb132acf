//! Common test utilities: an in-memory spreadsheet fake and Telegram
//! API fixtures shared across integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use rabotka::core::error::{AppError, AppResult};
use rabotka::core::Config;
use rabotka::sheets::SheetsApi;

/// In-memory stand-in for the spreadsheet backend.
///
/// Supports the two failure modes the adapter is built around:
/// read-after-write lag (`set_read_lag`) and transient append failures
/// (`fail_next_appends`).
#[derive(Default)]
pub struct FakeSheets {
    tabs: Mutex<HashMap<String, Vec<Vec<String>>>>,
    pending: Mutex<HashMap<String, Vec<Vec<String>>>>,
    /// Reads left before pending appends become visible
    read_lag: AtomicU32,
    /// Appends left that fail with a store error
    failing_appends: AtomicU32,
}

impl FakeSheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a tab with rows (header first).
    pub fn seed(&self, tab: &str, rows: Vec<Vec<&str>>) {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect();
        self.tabs.lock().unwrap().insert(tab.to_string(), rows);
    }

    /// Makes rows appended from now on invisible for the next `reads`
    /// grid reads.
    pub fn set_read_lag(&self, reads: u32) {
        self.read_lag.store(reads, Ordering::SeqCst);
    }

    /// Fails the next `n` appends with a store error.
    pub fn fail_next_appends(&self, n: u32) {
        self.failing_appends.store(n, Ordering::SeqCst);
    }

    /// Current visible grid of a tab (pending appends excluded).
    pub fn grid(&self, tab: &str) -> Vec<Vec<String>> {
        self.tabs.lock().unwrap().get(tab).cloned().unwrap_or_default()
    }

    /// Number of visible data rows (header excluded).
    pub fn data_rows(&self, tab: &str) -> usize {
        self.grid(tab).len().saturating_sub(1)
    }

    fn flush_pending(&self, tab: &str) {
        let mut pending = self.pending.lock().unwrap();
        if let Some(rows) = pending.remove(tab) {
            let mut tabs = self.tabs.lock().unwrap();
            tabs.entry(tab.to_string()).or_default().extend(rows);
        }
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn read_grid(&self, tab: &str) -> AppResult<Vec<Vec<String>>> {
        let lag = self.read_lag.load(Ordering::SeqCst);
        if lag > 0 {
            self.read_lag.store(lag - 1, Ordering::SeqCst);
        } else {
            self.flush_pending(tab);
        }
        Ok(self.grid(tab))
    }

    async fn append_row(&self, tab: &str, row: Vec<String>) -> AppResult<()> {
        let failing = self.failing_appends.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_appends.store(failing - 1, Ordering::SeqCst);
            return Err(AppError::Store("append rejected".into()));
        }
        if self.read_lag.load(Ordering::SeqCst) > 0 {
            self.pending
                .lock()
                .unwrap()
                .entry(tab.to_string())
                .or_default()
                .push(row);
        } else {
            self.tabs
                .lock()
                .unwrap()
                .entry(tab.to_string())
                .or_default()
                .push(row);
        }
        Ok(())
    }

    async fn update_cell(&self, tab: &str, row: usize, col: usize, value: &str) -> AppResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.entry(tab.to_string()).or_default();
        let target = grid
            .get_mut(row)
            .ok_or_else(|| AppError::Store(format!("row {} out of range", row)))?;
        if target.len() <= col {
            target.resize(col + 1, String::new());
        }
        target[col] = value.to_string();
        Ok(())
    }

    async fn write_header_row(&self, tab: &str, headers: &[&str]) -> AppResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.entry(tab.to_string()).or_default();
        let row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        if grid.is_empty() {
            grid.push(row);
        } else {
            grid[0] = row;
        }
        Ok(())
    }
}

pub const TEST_BOT_TOKEN: &str = "123456:TEST-TOKEN";
pub const TEST_ADMIN_ID: i64 = 424242;

/// Config pointing every external collaborator at test doubles.
pub fn test_config() -> Config {
    Config {
        bot_token: TEST_BOT_TOKEN.to_string(),
        bot_api_url: None,
        admin_id: TEST_ADMIN_ID,
        channel: "-1003779130300".to_string(),
        bot_username: "jobboardbot".to_string(),
        webhook_secret: "hooksecret".to_string(),
        public_url: None,
        worker_url: None,
        spreadsheet_id: "sheet-test".to_string(),
        sheets_token: "token-test".to_string(),
        port: 0,
        log_file: "test.log".to_string(),
    }
}

/// Canonical Jobs header row for seeding.
pub fn jobs_header() -> Vec<&'static str> {
    vec![
        "ID",
        "Employer",
        "Title",
        "Category",
        "Salary",
        "Description",
        "Status",
        "Created_At",
        "Expires_At",
    ]
}

/// One seeded job row in canonical column order.
pub fn job_row<'a>(id: &'a str, employer: &'a str, title: &'a str, status: &'a str) -> Vec<&'a str> {
    vec![
        id,
        employer,
        title,
        "IT",
        "$90k",
        "Build and run services",
        status,
        "2023-11-14T00:00:00Z",
        "2023-12-14T00:00:00Z",
    ]
}

/// Signs an init-data payload the way Telegram's client does, so the
/// verifier accepts it.
pub fn signed_init_data(pairs: &[(&str, &str)], bot_token: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    type HmacSha256 = Hmac<Sha256>;

    let mut check: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    check.sort();
    let data_check_string = check.join("\n");

    let mut secret = HmacSha256::new_from_slice(b"WebAppData").unwrap();
    secret.update(bot_token.as_bytes());
    let secret = secret.finalize().into_bytes();
    let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
    mac.update(data_check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    encoded.push(format!("hash={}", hash));
    encoded.join("&")
}

/// Telegram sendMessage success body.
pub fn send_message_response() -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "result": {
            "message_id": 42,
            "from": {"id": 987654321, "is_bot": true, "first_name": "JobBot", "username": "jobboardbot"},
            "chat": {"id": 424242, "first_name": "Admin", "type": "private"},
            "date": 1700000000,
            "text": "ok"
        }
    })
}

/// Telegram sendDocument success body carrying a file id.
pub fn send_document_response(file_id: &str) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "result": {
            "message_id": 43,
            "from": {"id": 987654321, "is_bot": true, "first_name": "JobBot", "username": "jobboardbot"},
            "chat": {"id": 555, "first_name": "Employer", "type": "private"},
            "date": 1700000000,
            "document": {
                "file_id": file_id,
                "file_unique_id": "unique-1",
                "file_name": "cv.pdf",
                "file_size": 1024
            }
        }
    })
}

/// A callback-query update as Telegram delivers it.
pub fn callback_query_json(from_id: i64, data: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "cbq-1",
        "from": {"id": from_id, "is_bot": false, "first_name": "Tester", "username": "tester"},
        "chat_instance": "ci-1",
        "data": data,
        "message": {
            "message_id": 42,
            "from": {"id": 987654321, "is_bot": true, "first_name": "JobBot", "username": "jobboardbot"},
            "chat": {"id": 424242, "first_name": "Admin", "type": "private"},
            "date": 1700000000,
            "text": "New Job: Backend Engineer by @boss"
        }
    })
}
