//! Visa Slot Bot - CLI entry point
//!
//! Signs in, then polls the consulate facility for an appointment date
//! earlier than the currently booked one and books it (with the ASC leg
//! when configured). Runs until a booking succeeds or an error surfaces.

use clap::Parser;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::info;

use visa_slot_bot::bot::{Bot, BotOptions};
use visa_slot_bot::client::VisaHttpClient;
use visa_slot_bot::{init_logging, log_dir, BotConfig};

#[derive(Debug, Parser)]
#[command(name = "visa-slot-bot")]
#[command(about = "Automated visa appointment rescheduling on ais.usvisa-info.com", version)]
struct Cli {
    /// Config file path (default: the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run every check but only log what would be booked
    #[arg(long)]
    dry_run: bool,

    /// Single availability check instead of polling
    #[arg(long)]
    once: bool,

    /// Enable debug-level logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose);

    info!("Starting Visa Slot Bot");
    if let Some(dir) = log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let config = match &cli.config {
        Some(path) => BotConfig::load_from(path)?,
        None => BotConfig::load(),
    };
    config.validate()?;

    if cli.dry_run {
        info!("Dry-run mode: no booking will be committed");
    }

    let client = VisaHttpClient::new(&config.country_code, &config.email, &config.password)?;

    let poll = config.poll.clone();
    let current_booked_date = config.current_booked_date;
    let min_date = config.min_date;
    let bot = Bot::new(config, client, BotOptions { dry_run: cli.dry_run });

    let session = bot.initialize().await?;
    info!("Watching for dates earlier than {}", current_booked_date);

    loop {
        if let Some(date) = bot
            .check_available_date(&session, current_booked_date, min_date)
            .await?
        {
            if bot.book_appointment(&session, date).await? {
                info!("Done: appointment moved to {}", date);
                return Ok(());
            }
            // The slot vanished between the date and time checks; keep watching
        }

        if cli.once {
            info!("Single check finished, nothing booked");
            return Ok(());
        }

        let delay = poll.next_delay();
        info!("Next check in {}s", delay.as_secs());
        sleep(delay).await;
    }
}
