//! Moderation workflow: admin-gated approve/reject with a dual
//! execution path.
//!
//! A button tap is acknowledged immediately, then the actual state
//! transition is delegated to the out-of-process worker endpoint under
//! a short deadline. When no worker is configured, or delegation fails
//! for any reason before a success acknowledgment, the transition runs
//! inline under a longer deadline. Exactly one of the two paths
//! performs the mutation.

use std::str::FromStr;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MessageId};

use crate::core::config::{moderation as timeouts, Config};
use crate::core::error::{AppError, AppResult};
use crate::sheets::{normalize_id, JobStatus, JobStore};
use crate::telegram::notifications::post_approved;

/// A moderation instruction decoded from a button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    fn target_status(self) -> JobStatus {
        match self {
            ModerationAction::Approve => JobStatus::Active,
            ModerationAction::Reject => JobStatus::Rejected,
        }
    }
}

impl FromStr for ModerationAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            _ => Err(()),
        }
    }
}

/// Decodes `approve:<id>` / `reject:<id>` button payloads. The id
/// suffix is reduced to its digits; an empty result is a decode
/// failure.
pub fn parse_callback_data(data: &str) -> Option<(ModerationAction, String)> {
    let (action, id_part) = data.split_once(':')?;
    let action = action.parse().ok()?;
    let id = normalize_id(id_part);
    if id.is_empty() {
        return None;
    }
    Some((action, id))
}

/// Body of the delegation call to the worker endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerJob {
    pub action: ModerationAction,
    pub job_id: String,
    pub admin_chat_id: i64,
    pub admin_message_id: i32,
}

/// Process-local in-flight guard, keyed by job id.
///
/// Closes the double-tap race within one process: the second tap on a
/// job whose transition is still running is answered and dropped.
/// Racing across replicas remains last-writer-wins.
#[derive(Default)]
pub struct InflightGuard {
    inflight: DashMap<String, ()>,
}

impl InflightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a job id; `None` when a transition is already running.
    pub fn begin(&self, job_id: &str) -> Option<InflightClaim<'_>> {
        use dashmap::mapref::entry::Entry;
        match self.inflight.entry(job_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InflightClaim {
                    guard: self,
                    job_id: job_id.to_string(),
                })
            }
        }
    }
}

/// RAII claim; releases the job id on drop.
pub struct InflightClaim<'a> {
    guard: &'a InflightGuard,
    job_id: String,
}

impl Drop for InflightClaim<'_> {
    fn drop(&mut self) {
        self.guard.inflight.remove(&self.job_id);
    }
}

/// Entry point for a callback-query update.
///
/// Authorization, decoding and the in-flight claim happen here; the
/// transition itself goes through [`delegate_or_run`].
pub async fn handle_callback(
    bot: &Bot,
    store: &JobStore,
    config: &Config,
    http: &reqwest::Client,
    guard: &InflightGuard,
    q: CallbackQuery,
) -> AppResult<()> {
    if q.from.id.0 as i64 != config.admin_id {
        log::warn!("moderation attempt from non-admin user {}", q.from.id);
        let _ = bot.answer_callback_query(q.id).text("Not allowed").await;
        return Ok(());
    }

    let Some((action, job_id)) = q.data.as_deref().and_then(parse_callback_data) else {
        let _ = bot.answer_callback_query(q.id).text("Invalid").await;
        return Ok(());
    };

    let Some(message) = q.message.as_ref() else {
        let _ = bot.answer_callback_query(q.id).text("Invalid").await;
        return Ok(());
    };
    let admin_chat_id = message.chat().id;
    let admin_message_id = message.id();

    let Some(_claim) = guard.begin(&job_id) else {
        log::info!("job {} already being moderated, dropping duplicate tap", job_id);
        let _ = bot.answer_callback_query(q.id).text("Already processing").await;
        return Ok(());
    };

    // Ack now so the admin's client stops spinning; the outcome lands
    // in the message edit, not here.
    let _ = bot.answer_callback_query(q.id).await;

    delegate_or_run(
        bot,
        store,
        config,
        http,
        WorkerJob {
            action,
            job_id,
            admin_chat_id: admin_chat_id.0,
            admin_message_id: admin_message_id.0,
        },
    )
    .await
}

/// Two-branch strategy: worker delegation under a short deadline, then
/// the inline path. Delegation counts as done only on a 2xx before the
/// deadline; on anything else the inline path runs deterministically.
pub async fn delegate_or_run(
    bot: &Bot,
    store: &JobStore,
    config: &Config,
    http: &reqwest::Client,
    work: WorkerJob,
) -> AppResult<()> {
    if let Some(ref worker_url) = config.worker_url {
        match delegate(http, worker_url, &config.webhook_secret, &work).await {
            Ok(()) => {
                log::info!("job {} {:?} delegated to worker", work.job_id, work.action);
                return Ok(());
            }
            Err(e) => {
                log::warn!(
                    "worker delegation for job {} failed ({}), running inline",
                    work.job_id,
                    e
                );
            }
        }
    }

    match tokio::time::timeout(timeouts::inline_timeout(), run_transition(bot, store, config, &work))
        .await
    {
        Ok(result) => result,
        Err(_) => {
            let detail = "moderation timed out".to_string();
            edit_admin_message_best_effort(bot, &work, &error_text(work.action, &detail)).await;
            Err(AppError::Store(detail))
        }
    }
}

async fn delegate(
    http: &reqwest::Client,
    worker_url: &str,
    secret: &str,
    work: &WorkerJob,
) -> AppResult<()> {
    let resp = http
        .post(worker_url)
        .query(&[("secret", secret)])
        .json(work)
        .timeout(timeouts::worker_timeout())
        .send()
        .await?;
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(AppError::Delivery(format!(
            "worker answered {}",
            resp.status()
        )))
    }
}

/// The actual state transition plus side effects. Runs either in the
/// worker endpoint or inline as the fallback.
pub async fn run_transition(
    bot: &Bot,
    store: &JobStore,
    config: &Config,
    work: &WorkerJob,
) -> AppResult<()> {
    let outcome = apply(bot, store, config, work).await;

    match &outcome {
        Ok(text) => edit_admin_message_best_effort(bot, work, text).await,
        Err(e) => {
            edit_admin_message_best_effort(bot, work, &error_text(work.action, &e.to_string()))
                .await
        }
    }

    outcome.map(|_| ())
}

/// Performs the status write and, on approval, the channel post.
/// Returns the text the admin message should be edited to.
async fn apply(
    bot: &Bot,
    store: &JobStore,
    config: &Config,
    work: &WorkerJob,
) -> AppResult<String> {
    store
        .update_job_status(&work.job_id, work.action.target_status())
        .await?;

    match work.action {
        ModerationAction::Approve => {
            // Re-fetch for the post: the row is the source of truth for
            // title/category/salary, not whatever the alert carried.
            let job = store.get_job_by_id(&work.job_id).await?;
            post_approved(bot, config, &job).await?;
            Ok(format!("✅ Approved: {}", job.title))
        }
        ModerationAction::Reject => Ok("❌ This job post was rejected.".to_string()),
    }
}

fn error_text(action: ModerationAction, detail: &str) -> String {
    match action {
        ModerationAction::Approve => format!("❗ Error approving: {}", detail),
        ModerationAction::Reject => format!("❗ Error rejecting: {}", detail),
    }
}

/// The transition already succeeded or failed on its own terms; a
/// failure to edit the originating message is only logged.
async fn edit_admin_message_best_effort(bot: &Bot, work: &WorkerJob, text: &str) {
    if let Err(e) = bot
        .edit_message_text(
            ChatId(work.admin_chat_id),
            MessageId(work.admin_message_id),
            text,
        )
        .await
    {
        log::warn!(
            "failed to edit admin message {} in chat {}: {}",
            work.admin_message_id,
            work.admin_chat_id,
            e
        );
    }
}
