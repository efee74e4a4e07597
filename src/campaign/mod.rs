//! Campaign persistence seam.
//!
//! The dispatcher only knows [`CheckpointSink`]; [`CampaignCheckpoint`] adapts a
//! [`CampaignStore`] and campaign id into one, so dispatch never depends on storage.

mod memory;

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::dispatch::{CheckpointSink, SinkError};
use crate::domain::{BulkResult, SendOutcome, SendStatus};

pub use memory::InMemoryCampaignStore;

pub type StoreError = Box<dyn StdError + Send + Sync>;

/// Reason recorded for numbers rejected by validation.
pub const INVALID_FORMAT_REASON: &str = "Invalid format";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CampaignId(u64);

impl CampaignId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input metadata of a campaign, known before the first send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDraft {
    pub message: String,
    /// Recipient tokens parsed from the request, valid or not.
    pub total_recipients: usize,
    /// Numbers that will be dispatched to.
    pub valid_recipients: usize,
    /// Rejected inputs as typed.
    pub invalid_numbers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidNumber {
    pub phone_number: String,
    pub reason: String,
}

/// One broadcast as persisted: input metadata plus its finished [`BulkResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub message: String,
    pub total_recipients: usize,
    pub valid_recipients: usize,
    pub successful_sends: usize,
    pub failed_sends: usize,
    pub total_cost: Decimal,
    /// `Pending` while sending; `Success` when closed with no failed or skipped send.
    pub status: SendStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-recipient outcomes made durable by a checkpoint, in dispatch order.
    pub records: Vec<SendOutcome>,
    pub invalid_numbers: Vec<InvalidNumber>,
}

/// Totals for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub total_campaigns: usize,
    pub total_messages_sent: usize,
    pub total_successful: usize,
    pub total_failed: usize,
    pub total_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Totals across every stored campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStatistics {
    pub total_campaigns: usize,
    pub total_messages: usize,
    pub total_successful: usize,
    pub total_failed: usize,
    pub total_cost: Decimal,
    /// Percentage of messages sent successfully, `0.0` when nothing was sent.
    pub success_rate: f64,
}

/// Durable home of campaigns, their per-recipient records and daily statistics.
pub trait CampaignStore: Send + Sync {
    fn open_campaign(&self, draft: CampaignDraft) -> BoxFuture<'_, Result<CampaignId, StoreError>>;

    /// Stage one outcome; it becomes durable at the next checkpoint.
    fn record_outcome<'a>(
        &'a self,
        id: CampaignId,
        outcome: &'a SendOutcome,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Commit staged outcomes and the partial counters.
    fn checkpoint<'a>(
        &'a self,
        id: CampaignId,
        progress: &'a BulkResult,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Finalize the campaign and fold it into the daily statistics.
    fn close_campaign<'a>(
        &'a self,
        id: CampaignId,
        result: &'a BulkResult,
    ) -> BoxFuture<'a, Result<Campaign, StoreError>>;
}

/// [`CheckpointSink`] writing into one campaign of a [`CampaignStore`].
pub struct CampaignCheckpoint<'s> {
    store: &'s dyn CampaignStore,
    id: CampaignId,
}

impl<'s> CampaignCheckpoint<'s> {
    pub fn new(store: &'s dyn CampaignStore, id: CampaignId) -> Self {
        Self { store, id }
    }
}

impl CheckpointSink for CampaignCheckpoint<'_> {
    fn record_outcome<'a>(
        &'a mut self,
        outcome: &'a SendOutcome,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        self.store.record_outcome(self.id, outcome)
    }

    fn checkpoint<'a>(
        &'a mut self,
        progress: &'a BulkResult,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        self.store.checkpoint(self.id, progress)
    }
}
