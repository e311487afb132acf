//! Application relay: forwards an uploaded CV to the employer and
//! records the application.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::InputFile;

use crate::core::error::{AppError, AppResult};
use crate::sheets::{Application, JobStore};

/// Sends the CV as a document to the employer's chat and appends the
/// Application row.
///
/// Atomic in the only way that matters here: the row is written after
/// the send succeeds, so a delivery failure leaves no partial record.
pub async fn forward_cv(
    bot: &Bot,
    store: &JobStore,
    job_id: &str,
    seeker_username: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> AppResult<()> {
    let job = store.get_job_by_id(job_id).await?;

    let employer_chat: i64 = job
        .employer_id
        .trim()
        .parse()
        .map_err(|_| AppError::Store(format!("job {} has no usable employer id", job.id)))?;

    let display_name = if seeker_username.is_empty() {
        "unknown"
    } else {
        seeker_username
    };
    let caption = format!("New applicant for {}\nContact: @{}", job.title, display_name);

    let document = InputFile::memory(bytes).file_name(file_name.to_string());
    let sent = bot
        .send_document(ChatId(employer_chat), document)
        .caption(caption)
        .await
        .map_err(|e| AppError::Delivery(format!("CV send to employer failed: {}", e)))?;

    let cv_file_id = sent
        .document()
        .map(|d| d.file.id.0.clone())
        .unwrap_or_default();

    store
        .record_application(&Application {
            job_id: job.id.clone(),
            seeker_username: seeker_username.to_string(),
            cv_file_id,
            applied_at: Utc::now(),
        })
        .await?;

    log::info!("relayed CV for job {} to employer {}", job.id, employer_chat);
    Ok(())
}
