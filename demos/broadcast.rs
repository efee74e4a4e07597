use std::io;
use std::sync::Arc;

use smscast::numbers::format_for_display;
use smscast::{BroadcastRequest, Broadcaster, Config, InMemoryCampaignStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env()?;
    let recipients = std::env::var("SMS_RECIPIENTS").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMS_RECIPIENTS environment variable is required",
        )
    })?;
    let message = std::env::var("SMS_MESSAGE")
        .unwrap_or_else(|_| "Hello from the smscast demo.".to_owned());

    let store = Arc::new(InMemoryCampaignStore::new());
    let broadcaster = Broadcaster::from_config(&config)?.with_store(store.clone());

    match broadcaster
        .broadcast(BroadcastRequest::new(message, recipients))
        .await
    {
        Ok(report) => {
            for outcome in &report.details {
                eprintln!(
                    "{:<18} {:?} {}",
                    format_for_display(outcome.recipient().as_str()),
                    outcome.status(),
                    outcome.error().unwrap_or_default(),
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_failure())?);
            std::process::exit(i32::from(err.status_code() / 100));
        }
    }

    Ok(())
}
