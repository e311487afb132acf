//! Telegram integration: bot client, init-data auth, moderation and
//! notifications.

pub mod auth;
pub mod bot;
pub mod moderation;
pub mod notifications;
pub mod relay;

// Re-exports for convenience
pub use bot::{create_bot, resolve_channel};
pub use moderation::{handle_callback, InflightGuard, ModerationAction, WorkerJob};
pub use notifications::{notify_admin, post_approved};
