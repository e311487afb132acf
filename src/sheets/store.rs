//! Job store adapter over the spreadsheet backend.
//!
//! The backing store is a third-party spreadsheet: no transactions,
//! header layouts that have drifted across deployments, and visible
//! read-after-write lag. Every lookup is therefore defensive —
//! normalize the id, resolve header aliases, re-read on a fixed
//! interval, and finally fall back to an exhaustive cell scan before
//! declaring the row missing.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use crate::core::config::store as store_config;
use crate::core::error::{AppError, AppResult};
use crate::core::retry::{retry_until_some, FixedRetry};
use crate::sheets::api::SheetsApi;
use crate::sheets::schema::{
    header_is_blank, HeaderIndex, JobField, APPLICATIONS_HEADERS, JOBS_HEADERS,
};
use crate::sheets::types::{Application, Job, JobStatus, NewJob};

/// Jobs tab name
pub const JOBS_TAB: &str = "Jobs";
/// Applications tab name
pub const APPLICATIONS_TAB: &str = "Applications";

/// Read/write access to Jobs and Applications rows.
pub struct JobStore {
    api: Arc<dyn SheetsApi>,
    lookup_retry: FixedRetry,
    update_retry: FixedRetry,
}

/// Strips formatting noise from caller-supplied job ids: everything
/// but ASCII digits.
pub fn normalize_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Id-cell comparison tolerant of the shapes the sheet hands back:
/// exact string, digit-extracted, or a numeric value that lost its
/// integer formatting.
fn id_matches(cell: &str, wanted: &str) -> bool {
    let raw = cell.trim();
    if raw == wanted {
        return true;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() && digits == wanted {
        return true;
    }
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() && format!("{}", n.trunc() as i64) == wanted {
            return true;
        }
    }
    false
}

struct RowHit {
    /// Zero-based grid row (header is row 0)
    row_index: usize,
    index: HeaderIndex,
    row: Vec<String>,
}

impl JobStore {
    pub fn new(api: Arc<dyn SheetsApi>) -> Self {
        Self {
            api,
            lookup_retry: FixedRetry::new(
                store_config::LOOKUP_RETRIES,
                store_config::retry_interval(),
            ),
            update_retry: FixedRetry::new(
                store_config::UPDATE_RETRIES,
                store_config::retry_interval(),
            ),
        }
    }

    /// Overrides the retry policies. Used by tests to keep the
    /// convergence paths fast.
    pub fn with_retry(mut self, lookup: FixedRetry, update: FixedRetry) -> Self {
        self.lookup_retry = lookup;
        self.update_retry = update;
        self
    }

    /// Appends a new Job row with a fresh id and `pending` status.
    ///
    /// If the sheet's header row is absent or blank, writes the
    /// expected header once and retries the append exactly once more.
    pub async fn create_job(&self, new: NewJob) -> AppResult<Job> {
        let now = Utc::now();
        let expires = now + ChronoDuration::days(crate::core::config::jobs::EXPIRY_DAYS);
        let job = Job {
            id: now.timestamp_millis().to_string(),
            employer_id: new.employer_id,
            employer_username: new.employer_username,
            title: new.title,
            description: new.description,
            category: new.category,
            salary: new.salary,
            status: JobStatus::Pending,
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        };

        let index = self.jobs_header_healed().await?;
        let row = job_to_row(&index, &job);

        if let Err(first_err) = self.api.append_row(JOBS_TAB, row.clone()).await {
            // Header may have vanished between the read and the append
            // (another writer clearing the sheet). Re-seed it and try
            // the append once more; any other failure propagates.
            log::warn!("job append failed, re-writing header and retrying once: {}", first_err);
            self.api.write_header_row(JOBS_TAB, &JOBS_HEADERS).await?;
            self.api.append_row(JOBS_TAB, row).await?;
        }

        log::info!("created job {} ({})", job.id, job.title);
        Ok(job)
    }

    /// Looks up a job by id, absorbing read-after-write lag with
    /// bounded fixed-interval re-reads and a final raw cell scan.
    pub async fn get_job_by_id(&self, raw_id: &str) -> AppResult<Job> {
        let hit = self.find_row(raw_id, self.lookup_retry).await?;
        Ok(build_job(&hit.index, &hit.row))
    }

    /// Sets the status column of a job row, touching nothing else.
    /// Re-setting the same status is a no-op success.
    pub async fn update_job_status(&self, raw_id: &str, status: JobStatus) -> AppResult<Job> {
        let hit = self.find_row(raw_id, self.update_retry).await?;

        match hit.index.col(JobField::Status) {
            Some(col) => {
                self.api
                    .update_cell(JOBS_TAB, hit.row_index, col, &status.to_string())
                    .await?;
            }
            // Sheets predating the Status column: nothing to write to.
            // Surface the record with the requested status so callers
            // can proceed; the drift is logged for the operator.
            None => log::warn!(
                "Jobs sheet has no status column; status '{}' for job {} not persisted",
                status,
                raw_id
            ),
        }

        let mut job = build_job(&hit.index, &hit.row);
        job.status = status;
        log::info!("job {} status -> {}", job.id, status);
        Ok(job)
    }

    /// Appends one Application row. Deliberately does not check the
    /// job's current status; that policy belongs to callers.
    pub async fn record_application(&self, application: &Application) -> AppResult<()> {
        let grid = self.api.read_grid(APPLICATIONS_TAB).await?;
        if header_is_blank(grid.first()) {
            self.api
                .write_header_row(APPLICATIONS_TAB, &APPLICATIONS_HEADERS)
                .await?;
        }
        self.api
            .append_row(
                APPLICATIONS_TAB,
                vec![
                    application.job_id.clone(),
                    application.seeker_username.clone(),
                    application.cv_file_id.clone(),
                    application.applied_at.to_rfc3339(),
                ],
            )
            .await?;
        log::info!(
            "recorded application for job {} from @{}",
            application.job_id,
            application.seeker_username
        );
        Ok(())
    }

    /// Reads the Jobs grid and returns its header index, seeding the
    /// canonical header row first when the sheet has none.
    async fn jobs_header_healed(&self) -> AppResult<HeaderIndex> {
        let grid = self.api.read_grid(JOBS_TAB).await?;
        if header_is_blank(grid.first()) {
            log::warn!("Jobs sheet header row missing, writing canonical headers");
            self.api.write_header_row(JOBS_TAB, &JOBS_HEADERS).await?;
            return Ok(HeaderIndex::resolve(
                &JOBS_HEADERS.map(String::from),
            ));
        }
        Ok(HeaderIndex::resolve(&grid[0]))
    }

    /// Multi-strategy row lookup: id-column match per re-read, then a
    /// raw scan of every cell of the final grid.
    async fn find_row(&self, raw_id: &str, policy: FixedRetry) -> AppResult<RowHit> {
        let wanted = normalize_id(raw_id);
        if wanted.is_empty() {
            return Err(AppError::NotFound);
        }

        let scanned = retry_until_some(policy, || {
            let wanted = wanted.clone();
            async move {
                match self.scan_by_id_column(&wanted).await {
                    Ok(Some(hit)) => Some(Ok(hit)),
                    Ok(None) => None,
                    // Hard read errors are not visibility lag; stop retrying.
                    Err(e) => Some(Err(e)),
                }
            }
        })
        .await;

        match scanned {
            Some(result) => result,
            None => {
                log::warn!(
                    "job {} not visible after {} re-reads, falling back to raw cell scan",
                    wanted,
                    policy.attempts
                );
                self.scan_all_cells(&wanted).await?.ok_or(AppError::NotFound)
            }
        }
    }

    /// One pass over the materialized rows, matching the id column
    /// (or, failing that, any cell of the row — legacy sheets had the
    /// id under unexpected columns).
    async fn scan_by_id_column(&self, wanted: &str) -> AppResult<Option<RowHit>> {
        let grid = self.api.read_grid(JOBS_TAB).await?;
        let Some(header) = grid.first() else {
            return Ok(None);
        };
        let index = HeaderIndex::resolve(header);
        let id_col = index.col(JobField::Id);

        for (row_index, row) in grid.iter().enumerate().skip(1) {
            let by_id = id_col
                .and_then(|c| row.get(c))
                .map(|cell| id_matches(cell, wanted))
                .unwrap_or(false);
            if by_id || row.iter().any(|cell| id_matches(cell, wanted)) {
                return Ok(Some(RowHit {
                    row_index,
                    index: HeaderIndex::resolve(header),
                    row: row.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// Last resort: walk the raw cell grid without trusting any header
    /// mapping at all.
    async fn scan_all_cells(&self, wanted: &str) -> AppResult<Option<RowHit>> {
        let grid = self.api.read_grid(JOBS_TAB).await?;
        let Some(header) = grid.first() else {
            return Ok(None);
        };
        let index = HeaderIndex::resolve(header);
        for (row_index, row) in grid.iter().enumerate().skip(1) {
            if row.iter().any(|cell| id_matches(cell, wanted)) {
                return Ok(Some(RowHit {
                    row_index,
                    index,
                    row: row.clone(),
                }));
            }
        }
        Ok(None)
    }
}

/// Lays a Job out in the column order the sheet's header dictates.
fn job_to_row(index: &HeaderIndex, job: &Job) -> Vec<String> {
    let width = index.width().max(JOBS_HEADERS.len());
    let mut row = vec![String::new(); width];
    let mut put = |field: JobField, value: &str| {
        if let Some(col) = index.col(field) {
            if col < row.len() {
                row[col] = value.to_string();
            }
        }
    };
    put(JobField::Id, &job.id);
    put(JobField::Employer, &job.employer_id);
    put(JobField::Title, &job.title);
    put(JobField::Category, job.category.as_deref().unwrap_or(""));
    put(JobField::Salary, job.salary.as_deref().unwrap_or(""));
    put(JobField::Description, &job.description);
    put(JobField::Status, &job.status.to_string());
    put(JobField::CreatedAt, &job.created_at);
    put(JobField::ExpiresAt, &job.expires_at);
    row
}

/// Materializes a Job from one grid row, preferring named columns and
/// accepting the canonical positions for cells the header missed.
fn build_job(index: &HeaderIndex, row: &[String]) -> Job {
    let pick = |field: JobField| -> String {
        if let Some(v) = index.cell(row, field) {
            return v.trim().to_string();
        }
        field
            .positional_fallback()
            .and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    let optional = |field: JobField| -> Option<String> {
        let v = pick(field);
        if v.is_empty() { None } else { Some(v) }
    };

    Job {
        id: normalize_id(&pick(JobField::Id)),
        employer_id: pick(JobField::Employer),
        employer_username: String::new(),
        title: pick(JobField::Title),
        description: pick(JobField::Description),
        category: optional(JobField::Category),
        salary: optional(JobField::Salary),
        status: JobStatus::from_cell(&pick(JobField::Status)),
        created_at: pick(JobField::CreatedAt),
        expires_at: pick(JobField::ExpiresAt),
    }
}
