//! Admin alerts and channel posts for job postings.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config::{jobs, Config};
use crate::core::error::{AppError, AppResult};
use crate::sheets::Job;
use crate::telegram::bot::resolve_channel;

/// Deep link that reopens the Mini App pre-seeded with a job id.
pub fn deep_link(bot_username: &str, job_id: &str) -> String {
    format!("https://t.me/{}?startapp=jobId_{}", bot_username, job_id)
}

/// Character-safe truncation for the admin preview.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Inline controls carrying the encoded moderation instructions. The
/// `approve:<id>` / `reject:<id>` payloads are the only channel through
/// which a button tap names its job and action.
pub fn moderation_keyboard(job_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", format!("approve:{}", job_id)),
        InlineKeyboardButton::callback("❌ Reject", format!("reject:{}", job_id)),
    ]])
}

/// Text of the "new job" admin alert.
pub fn admin_alert_text(job: &Job) -> String {
    let username = if job.employer_username.is_empty() {
        "unknown"
    } else {
        &job.employer_username
    };
    format!(
        "New Job: {} by @{}\n{}",
        job.title,
        username,
        truncate_chars(&job.description, jobs::ADMIN_PREVIEW_CHARS)
    )
}

/// Sends the "new job" alert to the admin with approve/reject buttons.
pub async fn notify_admin(bot: &Bot, config: &Config, job: &Job) -> AppResult<()> {
    bot.send_message(ChatId(config.admin_id), admin_alert_text(job))
        .reply_markup(moderation_keyboard(&job.id))
        .await?;
    log::info!("admin alerted about job {}", job.id);
    Ok(())
}

/// Text of the channel post for an approved job.
pub fn channel_post_text(job: &Job) -> String {
    let details: Vec<String> = [
        job.category.as_ref().map(|c| format!("Category: {}", c)),
        job.salary.as_ref().map(|s| format!("Salary: {}", s)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if details.is_empty() {
        format!("💼 {}\n\n{}\n\nApply via Mini App", job.title, job.description)
    } else {
        format!(
            "💼 {}\n{}\n\n{}\n\nApply via Mini App",
            job.title,
            details.join("\n"),
            job.description
        )
    }
}

/// Posts an approved job to the configured channel with its deep link.
pub async fn post_approved(bot: &Bot, config: &Config, job: &Job) -> AppResult<()> {
    let link = deep_link(&config.bot_username, &job.id);
    let url = url::Url::parse(&link)
        .map_err(|e| AppError::Delivery(format!("bad deep link {}: {}", link, e)))?;
    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        "💼 Apply via Mini App",
        url,
    )]]);

    let channel = resolve_channel(bot, &config.channel).await;
    bot.send_message(channel, channel_post_text(job))
        .reply_markup(keyboard)
        .await?;
    log::info!("job {} posted to channel {}", job.id, config.channel);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::JobStatus;

    fn job() -> Job {
        Job {
            id: "1700000000000".into(),
            employer_id: "42".into(),
            employer_username: "boss".into(),
            title: "Backend Engineer".into(),
            description: "Build services".into(),
            category: Some("IT".into()),
            salary: Some("$90k".into()),
            status: JobStatus::Pending,
            created_at: "2023-11-14T00:00:00Z".into(),
            expires_at: "2023-12-14T00:00:00Z".into(),
        }
    }

    #[test]
    fn deep_link_format() {
        assert_eq!(
            deep_link("jobboardbot", "1700000000000"),
            "https://t.me/jobboardbot?startapp=jobId_1700000000000"
        );
    }

    #[test]
    fn admin_alert_truncates_description() {
        let mut j = job();
        j.description = "x".repeat(500);
        let text = admin_alert_text(&j);
        assert!(text.starts_with("New Job: Backend Engineer by @boss\n"));
        assert!(text.ends_with(&"x".repeat(200)));
        assert_eq!(text.matches('x').count(), 200);
    }

    #[test]
    fn admin_alert_handles_missing_username() {
        let mut j = job();
        j.employer_username = String::new();
        assert!(admin_alert_text(&j).contains("by @unknown"));
    }

    #[test]
    fn channel_post_includes_details_when_present() {
        let text = channel_post_text(&job());
        assert!(text.contains("💼 Backend Engineer"));
        assert!(text.contains("Category: IT"));
        assert!(text.contains("Salary: $90k"));
        assert!(text.ends_with("Apply via Mini App"));
    }

    #[test]
    fn channel_post_skips_empty_details() {
        let mut j = job();
        j.category = None;
        j.salary = None;
        let text = channel_post_text(&j);
        assert!(!text.contains("Category:"));
        assert_eq!(text, "💼 Backend Engineer\n\nBuild services\n\nApply via Mini App");
    }

    #[test]
    fn moderation_keyboard_encodes_action_and_id() {
        let kb = moderation_keyboard("1700000000000");
        let row = &kb.inline_keyboard[0];
        assert_eq!(row.len(), 2);
    }
}
