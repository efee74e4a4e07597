//! Bulk SMS broadcasting over the Africa's Talking HTTP API.
//!
//! The crate is layered the usual way: a domain layer of strong types, a transport
//! layer for wire-format quirks, a gateway client, and on top of those the number
//! handling, the sequential dispatcher and the campaign bookkeeping that make up a
//! broadcast.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use smscast::{BroadcastRequest, Broadcaster, Config, InMemoryCampaignStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let broadcaster = Broadcaster::from_config(&config)?
//!         .with_store(Arc::new(InMemoryCampaignStore::new()));
//!
//!     let request = BroadcastRequest::new("Service update tonight", "0241234567,0551234567");
//!     let report = broadcaster.broadcast(request).await?;
//!     println!("{} sent, {} failed", report.successful_sends, report.failed_sends);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod campaign;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod numbers;
pub mod parse;
pub mod segments;
pub mod service;
mod transport;

pub use campaign::{
    Campaign, CampaignCheckpoint, CampaignId, CampaignStore, DailyStatistics,
    InMemoryCampaignStore, OverallStatistics,
};
pub use client::{AfricasTalkingClient, AfricasTalkingClientBuilder, Auth, Gateway, GatewayError};
pub use config::{Config, ConfigError};
pub use dispatch::{CheckpointSink, DispatchConfig, Dispatcher};
pub use domain::{
    BroadcastRequest, BulkResult, CountryProfile, InputMode, Limits, MessageText,
    NormalizedNumber, PhoneNumbersInput, SendOutcome, SendStatus, ValidationError,
};
pub use numbers::NumberValidator;
pub use service::{BroadcastError, BroadcastReport, Broadcaster};
