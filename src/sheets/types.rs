use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Moderation state of a job posting.
///
/// `pending` on creation; the moderation workflow moves it to `active`
/// or `rejected`. Rows with a blank or unrecognized status cell read
/// back as `pending` so the enum invariant holds on every code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Active,
    Rejected,
}

impl JobStatus {
    /// Lenient parse for status cells coming back from the sheet.
    pub fn from_cell(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(JobStatus::Pending)
    }
}

/// One row of the Jobs sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unix-millisecond id assigned at creation
    pub id: String,
    pub employer_id: String,
    pub employer_username: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub salary: Option<String>,
    pub status: JobStatus,
    pub created_at: String,
    /// Display-only; no automatic status change on expiry
    pub expires_at: String,
}

/// Submission fields for a new job; the store assigns id, status and
/// the timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub employer_id: String,
    pub employer_username: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub salary: Option<String>,
}

/// One row of the Applications sheet. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub job_id: String,
    pub seeker_username: String,
    pub cv_file_id: String,
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        assert_eq!(JobStatus::Active.to_string(), "active");
        assert_eq!(JobStatus::from_cell("Active"), JobStatus::Active);
        assert_eq!(JobStatus::from_cell(" rejected "), JobStatus::Rejected);
    }

    #[test]
    fn blank_or_junk_status_reads_as_pending() {
        assert_eq!(JobStatus::from_cell(""), JobStatus::Pending);
        assert_eq!(JobStatus::from_cell("archived"), JobStatus::Pending);
    }
}
