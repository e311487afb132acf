use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;

use teloxide::prelude::Requester;

use rabotka::cli::{Cli, Commands};
use rabotka::core::{init_logger, Config};
use rabotka::sheets::{HttpSheets, JobStore};
use rabotka::telegram::create_bot;
use rabotka::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = Arc::new(Config::from_env()?);
    init_logger(&config.log_file)?;

    match cli.command {
        None => run(config, true).await,
        Some(Commands::Run { webhook }) => run(config, webhook).await,
        Some(Commands::SetWebhook) => {
            let bot = create_bot(&config)?;
            let url = web::register_webhook(&bot, &config).await?;
            log::info!("webhook set to {}", url);
            Ok(())
        }
        Some(Commands::WebhookInfo) => {
            let bot = create_bot(&config)?;
            let info = bot.get_webhook_info().await?;
            log::info!(
                "webhook: url={:?} pending={} last_error={:?}",
                info.url.as_ref().map(|u| u.to_string()),
                info.pending_update_count,
                info.last_error_message
            );
            Ok(())
        }
    }
}

async fn run(config: Arc<Config>, register_webhook: bool) -> Result<()> {
    log::info!("Starting job board service...");

    let bot = create_bot(&config)?;
    let sheets = Arc::new(HttpSheets::new(&config)?);
    let store = Arc::new(JobStore::new(sheets));

    if register_webhook {
        match web::register_webhook(&bot, &config).await {
            Ok(url) => log::info!("Telegram webhook registered at {}", url),
            // A missing PUBLIC_URL is a normal local-dev setup; the
            // server still serves the Mini App API without a webhook.
            Err(e) => log::warn!("webhook registration skipped: {}", e),
        }
    }

    let state = AppState::new(Arc::clone(&config), bot, store)?;
    web::run_server(state).await
}
