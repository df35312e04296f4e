//! Dry-run availability check against the live scheduling site
//!
//! Run with: cargo run --example dry_run_check

use visa_slot_bot::bot::{Bot, BotOptions};
use visa_slot_bot::client::VisaHttpClient;
use visa_slot_bot::BotConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Debug-level logging for the HTTP layer
    tracing_subscriber::fmt()
        .with_env_filter("info,visa_slot_bot::client=debug")
        .init();

    let config = BotConfig::load();
    config.validate()?;

    println!("=== Visa Slot Bot Dry Run ===\n");

    let current_booked_date = config.current_booked_date;
    let min_date = config.min_date;

    println!("Step 1: Signing in as {}...", config.email);
    let client = VisaHttpClient::new(&config.country_code, &config.email, &config.password)?;
    let bot = Bot::new(config, client, BotOptions { dry_run: true });
    let session = bot.initialize().await?;
    println!("  Signed in\n");

    println!("Step 2: Checking available dates...");
    match bot
        .check_available_date(&session, current_booked_date, min_date)
        .await?
    {
        Some(date) => {
            println!("  Best candidate: {}\n", date);

            println!("Step 3: Walking the booking flow (dry run)...");
            let bookable = bot.book_appointment(&session, date).await?;
            println!(
                "  Result: {}",
                if bookable {
                    "slot is bookable"
                } else {
                    "slot vanished before a time was found"
                }
            );
        }
        None => {
            println!("  Nothing earlier than {} right now", current_booked_date);
        }
    }

    Ok(())
}
