use clap::{Parser, Subcommand};

/// Command line interface for the job board service.
#[derive(Parser, Debug)]
#[command(name = "rabotka", version, about = "Telegram job board bot and API server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the API server and bot webhook (default)
    Run {
        /// Register the Telegram webhook on startup
        #[arg(long, default_value_t = true)]
        webhook: bool,
    },
    /// Register the Telegram webhook and exit
    SetWebhook,
    /// Print the current webhook registration and exit
    WebhookInfo,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
