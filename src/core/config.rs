use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Runtime configuration, read once at startup and passed by reference
/// into every component. No global client handles.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token (BOT_TOKEN or TELOXIDE_TOKEN)
    pub bot_token: String,
    /// Custom Bot API server URL (BOT_API_URL), if any
    pub bot_api_url: Option<String>,
    /// Telegram user id of the moderating admin (ADMIN_ID)
    pub admin_id: i64,
    /// Destination channel: numeric chat id or @handle (CHANNEL_ID)
    pub channel: String,
    /// Bot username without @, used to build Mini App deep links (BOT_USERNAME)
    pub bot_username: String,
    /// Shared secret guarding the webhook and internal endpoints (WEBHOOK_SECRET)
    pub webhook_secret: String,
    /// Public base URL of this service, used to register the webhook (PUBLIC_URL)
    pub public_url: Option<String>,
    /// Moderation worker endpoint (WORKER_URL); inline fallback when unset
    pub worker_url: Option<String>,
    /// Google spreadsheet id or full URL (SPREADSHEET_ID)
    pub spreadsheet_id: String,
    /// Bearer token for the Sheets API (SHEETS_TOKEN)
    pub sheets_token: String,
    /// HTTP listen port (PORT, default 8080)
    pub port: u16,
    /// Log file path (LOG_FILE_PATH, default rabotka.log)
    pub log_file: String,
}

impl Config {
    /// Reads configuration from the environment. Fails fast on anything
    /// the service cannot run without.
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN")
            .or_else(|_| env::var("TELOXIDE_TOKEN"))
            .context("BOT_TOKEN is not set")?;

        let admin_id: i64 = env::var("ADMIN_ID")
            .context("ADMIN_ID is not set")?
            .trim()
            .parse()
            .context("ADMIN_ID is not a number")?;

        let channel = env::var("CHANNEL_ID").context("CHANNEL_ID is not set")?;
        if channel.trim().is_empty() {
            bail!("CHANNEL_ID is empty");
        }

        let bot_username = env::var("BOT_USERNAME")
            .context("BOT_USERNAME is not set")?
            .trim_start_matches('@')
            .to_string();

        let spreadsheet_id = normalize_spreadsheet_id(
            &env::var("SPREADSHEET_ID").context("SPREADSHEET_ID is not set")?,
        )
        .context("SPREADSHEET_ID is not a valid spreadsheet id or URL")?;

        Ok(Self {
            bot_token,
            bot_api_url: env::var("BOT_API_URL").ok(),
            admin_id,
            channel: channel.trim().to_string(),
            bot_username,
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            public_url: env::var("PUBLIC_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string()),
            worker_url: env::var("WORKER_URL").ok().filter(|u| !u.trim().is_empty()),
            spreadsheet_id,
            sheets_token: env::var("SHEETS_TOKEN").context("SHEETS_TOKEN is not set")?,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            log_file: env::var("LOG_FILE_PATH").unwrap_or_else(|_| "rabotka.log".to_string()),
        })
    }
}

/// Accepts either a bare spreadsheet id or a full
/// `https://docs.google.com/spreadsheets/d/<id>/...` URL, with stray
/// backticks from copy-pasted configs stripped.
pub fn normalize_spreadsheet_id(input: &str) -> Option<String> {
    let s = input.trim().trim_matches('`');
    if s.is_empty() {
        return None;
    }
    if let Some(pos) = s.find("/spreadsheets/d/") {
        let rest = &s[pos + "/spreadsheets/d/".len()..];
        let id: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        return if id.is_empty() { None } else { Some(id) };
    }
    Some(s.to_string())
}

/// Row-store retry configuration.
///
/// The backing spreadsheet has read-after-write lag; a row appended by
/// `create_job` may not be visible to the next read. Retries are
/// bounded and fixed-interval.
pub mod store {
    use super::Duration;

    /// Interval between lookup retries (in milliseconds)
    pub const RETRY_INTERVAL_MS: u64 = 250;

    /// Re-read attempts for plain lookups
    pub const LOOKUP_RETRIES: u32 = 40;

    /// Re-read attempts for status updates (the admin is waiting on these)
    pub const UPDATE_RETRIES: u32 = 12;

    /// Lookup retry interval duration
    pub fn retry_interval() -> Duration {
        Duration::from_millis(RETRY_INTERVAL_MS)
    }
}

/// Moderation workflow timeouts.
pub mod moderation {
    use super::Duration;

    /// Deadline for delegating a transition to the worker endpoint (in seconds)
    pub const WORKER_TIMEOUT_SECS: u64 = 3;

    /// Deadline for the inline fallback path (in seconds)
    pub const INLINE_TIMEOUT_SECS: u64 = 30;

    /// Worker delegation deadline
    pub fn worker_timeout() -> Duration {
        Duration::from_secs(WORKER_TIMEOUT_SECS)
    }

    /// Inline fallback deadline
    pub fn inline_timeout() -> Duration {
        Duration::from_secs(INLINE_TIMEOUT_SECS)
    }
}

/// Network configuration.
pub mod network {
    use super::Duration;

    /// Request timeout for outbound HTTP calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Job content configuration.
pub mod jobs {
    /// Days until a posting shows as expired (display-only, not enforced)
    pub const EXPIRY_DAYS: i64 = 30;

    /// Description cut-off in the admin alert (in characters)
    pub const ADMIN_PREVIEW_CHARS: usize = 200;

    /// Maximum accepted CV upload size (20 MB)
    pub const MAX_CV_SIZE_BYTES: usize = 20 * 1024 * 1024;
}
