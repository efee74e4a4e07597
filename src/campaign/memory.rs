use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rust_decimal::Decimal;

use super::{
    Campaign, CampaignDraft, CampaignId, CampaignStore, DailyStatistics, INVALID_FORMAT_REASON,
    InvalidNumber, OverallStatistics, StoreError,
};
use crate::domain::{BulkResult, SendOutcome, SendStatus, add_cost};

#[derive(Debug, thiserror::Error)]
enum MemoryStoreError {
    #[error("unknown campaign: {0}")]
    UnknownCampaign(CampaignId),
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    campaigns: BTreeMap<CampaignId, Entry>,
    daily: BTreeMap<chrono::NaiveDate, DailyStatistics>,
}

#[derive(Debug)]
struct Entry {
    campaign: Campaign,
    staged: Vec<SendOutcome>,
}

/// Process-local [`CampaignStore`]. Staged outcomes are committed by checkpoints.
pub struct InMemoryCampaignStore {
    state: Mutex<State>,
    clock: Clock,
}

impl Default for InMemoryCampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use `clock` for timestamps and to pick the statistics day.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock: Box::new(clock),
        }
    }

    pub fn campaign(&self, id: CampaignId) -> Option<Campaign> {
        self.lock()
            .campaigns
            .get(&id)
            .map(|entry| entry.campaign.clone())
    }

    /// Most recent campaigns first.
    pub fn recent_campaigns(&self, limit: usize) -> Vec<Campaign> {
        self.lock()
            .campaigns
            .values()
            .rev()
            .take(limit)
            .map(|entry| entry.campaign.clone())
            .collect()
    }

    /// Most recent days first.
    pub fn daily_statistics(&self, limit: usize) -> Vec<DailyStatistics> {
        self.lock().daily.values().rev().take(limit).cloned().collect()
    }

    pub fn overall_statistics(&self) -> OverallStatistics {
        let state = self.lock();
        let mut stats = OverallStatistics {
            total_campaigns: state.campaigns.len(),
            total_messages: 0,
            total_successful: 0,
            total_failed: 0,
            total_cost: Decimal::ZERO,
            success_rate: 0.0,
        };
        for entry in state.campaigns.values() {
            let campaign = &entry.campaign;
            stats.total_successful += campaign.successful_sends;
            stats.total_failed += campaign.failed_sends;
            stats.total_cost = add_cost(stats.total_cost, campaign.total_cost);
        }
        stats.total_messages = stats.total_successful + stats.total_failed;
        if stats.total_messages > 0 {
            stats.success_rate = stats.total_successful as f64 / stats.total_messages as f64 * 100.0;
        }
        stats
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, draft: CampaignDraft) -> CampaignId {
        let now = (self.clock)();
        let mut state = self.lock();
        state.next_id += 1;
        let id = CampaignId::new(state.next_id);
        let invalid_numbers = draft
            .invalid_numbers
            .into_iter()
            .map(|phone_number| InvalidNumber {
                phone_number,
                reason: INVALID_FORMAT_REASON.to_owned(),
            })
            .collect();
        let campaign = Campaign {
            id,
            message: draft.message,
            total_recipients: draft.total_recipients,
            valid_recipients: draft.valid_recipients,
            successful_sends: 0,
            failed_sends: 0,
            total_cost: Decimal::ZERO,
            status: SendStatus::Pending,
            created_at: now,
            completed_at: None,
            records: Vec::new(),
            invalid_numbers,
        };
        state.campaigns.insert(
            id,
            Entry {
                campaign,
                staged: Vec::new(),
            },
        );
        tracing::debug!(campaign = %id, "campaign opened");
        id
    }

    fn stage(&self, id: CampaignId, outcome: &SendOutcome) -> Result<(), StoreError> {
        let mut state = self.lock();
        let entry = state
            .campaigns
            .get_mut(&id)
            .ok_or(MemoryStoreError::UnknownCampaign(id))?;
        entry.staged.push(outcome.clone());
        Ok(())
    }

    fn commit(&self, id: CampaignId, progress: &BulkResult) -> Result<(), StoreError> {
        let mut state = self.lock();
        let entry = state
            .campaigns
            .get_mut(&id)
            .ok_or(MemoryStoreError::UnknownCampaign(id))?;
        commit_entry(entry, progress);
        Ok(())
    }

    fn close(&self, id: CampaignId, result: &BulkResult) -> Result<Campaign, StoreError> {
        let now = (self.clock)();
        let mut state = self.lock();
        let entry = state
            .campaigns
            .get_mut(&id)
            .ok_or(MemoryStoreError::UnknownCampaign(id))?;
        commit_entry(entry, result);

        let campaign = &mut entry.campaign;
        campaign.status = if result.failed_count() == 0 && !result.cancelled() {
            SendStatus::Success
        } else {
            SendStatus::Failed
        };
        campaign.completed_at = Some(now);
        let closed = campaign.clone();

        let date = now.date_naive();
        let daily = state.daily.entry(date).or_insert_with(|| DailyStatistics {
            date,
            total_campaigns: 0,
            total_messages_sent: 0,
            total_successful: 0,
            total_failed: 0,
            total_cost: Decimal::ZERO,
            updated_at: now,
        });
        daily.total_campaigns += 1;
        daily.total_messages_sent += result.processed();
        daily.total_successful += result.successful_count();
        daily.total_failed += result.failed_count();
        daily.total_cost = add_cost(daily.total_cost, result.total_cost());
        daily.updated_at = now;

        tracing::debug!(campaign = %id, status = ?closed.status, "campaign closed");
        Ok(closed)
    }
}

fn commit_entry(entry: &mut Entry, progress: &BulkResult) {
    entry.campaign.records.append(&mut entry.staged);
    entry.campaign.successful_sends = progress.successful_count();
    entry.campaign.failed_sends = progress.failed_count();
    entry.campaign.total_cost = progress.total_cost();
}

impl CampaignStore for InMemoryCampaignStore {
    fn open_campaign(&self, draft: CampaignDraft) -> BoxFuture<'_, Result<CampaignId, StoreError>> {
        Box::pin(async move { Ok(self.open(draft)) })
    }

    fn record_outcome<'a>(
        &'a self,
        id: CampaignId,
        outcome: &'a SendOutcome,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move { self.stage(id, outcome) })
    }

    fn checkpoint<'a>(
        &'a self,
        id: CampaignId,
        progress: &'a BulkResult,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move { self.commit(id, progress) })
    }

    fn close_campaign<'a>(
        &'a self,
        id: CampaignId,
        result: &'a BulkResult,
    ) -> BoxFuture<'a, Result<Campaign, StoreError>> {
        Box::pin(async move { self.close(id, result) })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::campaign::CampaignCheckpoint;
    use crate::dispatch::CheckpointSink;
    use crate::domain::{CountryProfile, NormalizedNumber};
    use crate::numbers::NumberValidator;

    use super::*;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 9, 30, 0).unwrap()
    }

    fn numbers(count: usize) -> Vec<NormalizedNumber> {
        let raw: Vec<String> = (0..count).map(|i| format!("055{:07}", i)).collect();
        NumberValidator::new(CountryProfile::ghana())
            .validate(&raw)
            .valid
    }

    fn draft(valid: usize) -> CampaignDraft {
        CampaignDraft {
            message: "hello".to_owned(),
            total_recipients: valid + 1,
            valid_recipients: valid,
            invalid_numbers: vec!["12345".to_owned()],
        }
    }

    fn result_with(successes: usize, failures: usize) -> BulkResult {
        let mut result = BulkResult::new();
        for (i, number) in numbers(successes + failures).into_iter().enumerate() {
            if i < successes {
                result.push(SendOutcome::success(number, None, Some(Decimal::new(8, 1))));
            } else {
                result.push(SendOutcome::failure(number, "rejected"));
            }
        }
        result
    }

    #[tokio::test]
    async fn staged_outcomes_become_durable_at_checkpoints() {
        let store = InMemoryCampaignStore::with_clock(fixed_clock);
        let id = store.open_campaign(draft(2)).await.unwrap();
        let result = result_with(2, 0);

        let mut sink = CampaignCheckpoint::new(&store, id);
        sink.record_outcome(&result.details()[0]).await.unwrap();
        assert!(store.campaign(id).unwrap().records.is_empty());

        sink.checkpoint(&result).await.unwrap();
        let campaign = store.campaign(id).unwrap();
        assert_eq!(campaign.records.len(), 1);
        assert_eq!(campaign.successful_sends, 2);
        assert_eq!(campaign.status, SendStatus::Pending);
        assert_eq!(campaign.invalid_numbers[0].reason, "Invalid format");
    }

    #[tokio::test]
    async fn close_sets_status_and_rolls_daily_statistics() {
        let store = InMemoryCampaignStore::with_clock(fixed_clock);

        let first = store.open_campaign(draft(2)).await.unwrap();
        let closed = store
            .close_campaign(first, &result_with(2, 0))
            .await
            .unwrap();
        assert_eq!(closed.status, SendStatus::Success);
        assert_eq!(closed.completed_at, Some(fixed_clock()));

        let second = store.open_campaign(draft(3)).await.unwrap();
        let closed = store
            .close_campaign(second, &result_with(1, 2))
            .await
            .unwrap();
        assert_eq!(closed.status, SendStatus::Failed);

        let daily = store.daily_statistics(30);
        assert_eq!(daily.len(), 1);
        let today = &daily[0];
        assert_eq!(today.date, fixed_clock().date_naive());
        assert_eq!(today.total_campaigns, 2);
        assert_eq!(today.total_messages_sent, 5);
        assert_eq!(today.total_successful, 3);
        assert_eq!(today.total_failed, 2);
        assert_eq!(today.total_cost, Decimal::new(24, 1));

        let overall = store.overall_statistics();
        assert_eq!(overall.total_campaigns, 2);
        assert_eq!(overall.total_messages, 5);
        assert!((overall.success_rate - 60.0).abs() < f64::EPSILON);

        let recent = store.recent_campaigns(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, second);
    }

    #[tokio::test]
    async fn unknown_campaign_is_an_error() {
        let store = InMemoryCampaignStore::new();
        let err = store
            .checkpoint(CampaignId::new(42), &BulkResult::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown campaign: 42");
    }

    #[tokio::test]
    async fn statistics_survive_cost_totals_beyond_decimal_range() {
        let store = InMemoryCampaignStore::with_clock(fixed_clock);
        let mut result = BulkResult::new();
        result.push(SendOutcome::success(numbers(1).remove(0), None, Some(Decimal::MAX)));

        for _ in 0..2 {
            let id = store.open_campaign(draft(1)).await.unwrap();
            store.close_campaign(id, &result).await.unwrap();
        }

        assert_eq!(store.daily_statistics(1)[0].total_campaigns, 2);
        assert_eq!(store.daily_statistics(1)[0].total_cost, Decimal::MAX);
        let overall = store.overall_statistics();
        assert_eq!(overall.total_successful, 2);
        assert_eq!(overall.total_cost, Decimal::MAX);
    }

    #[test]
    fn overall_statistics_of_empty_store() {
        let overall = InMemoryCampaignStore::new().overall_statistics();
        assert_eq!(overall.total_campaigns, 0);
        assert_eq!(overall.success_rate, 0.0);
    }
}
