use std::io;
use std::sync::Arc;

use smscast::{BroadcastRequest, Broadcaster, Config, InMemoryCampaignStore, InputMode};
use tracing_subscriber::EnvFilter;

/// Broadcasts to the numbers in `SMS_CSV_FILE` and prints the campaign statistics.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env()?;
    let path = std::env::var("SMS_CSV_FILE").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMS_CSV_FILE environment variable is required",
        )
    })?;
    let csv = std::fs::read_to_string(path)?;

    let store = Arc::new(InMemoryCampaignStore::new());
    let broadcaster = Broadcaster::from_config(&config)?.with_store(store.clone());

    let request = BroadcastRequest::new("Hello from the smscast demo.", csv)
        .with_mode(InputMode::Tabular);
    if let Err(err) = broadcaster.broadcast(request).await {
        eprintln!("broadcast rejected: {err}");
    }

    for campaign in store.recent_campaigns(5) {
        println!(
            "campaign {}: {:?}, {} sent, {} failed, cost {}",
            campaign.id,
            campaign.status,
            campaign.successful_sends,
            campaign.failed_sends,
            campaign.total_cost
        );
    }
    for day in store.daily_statistics(7) {
        println!("{}: {} messages, {} failed", day.date, day.total_messages_sent, day.total_failed);
    }
    println!("{}", serde_json::to_string_pretty(&store.overall_statistics())?);

    Ok(())
}
