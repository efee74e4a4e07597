use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::value::NormalizedNumber;

/// Lifecycle of one recipient's send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Pending,
    Success,
    Failed,
}

/// Result of exactly one dispatch attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    #[serde(rename = "phone_number")]
    recipient: NormalizedNumber,
    status: SendStatus,
    #[serde(rename = "message_id", skip_serializing_if = "Option::is_none")]
    provider_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SendOutcome {
    pub fn success(
        recipient: NormalizedNumber,
        provider_message_id: Option<String>,
        cost: Option<Decimal>,
    ) -> Self {
        Self {
            recipient,
            status: SendStatus::Success,
            provider_message_id,
            cost,
            error: None,
        }
    }

    pub fn failure(recipient: NormalizedNumber, error: impl Into<String>) -> Self {
        Self {
            recipient,
            status: SendStatus::Failed,
            provider_message_id: None,
            cost: None,
            error: Some(error.into()),
        }
    }

    pub fn recipient(&self) -> &NormalizedNumber {
        &self.recipient
    }

    pub fn status(&self) -> SendStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }

    pub fn provider_message_id(&self) -> Option<&str> {
        self.provider_message_id.as_deref()
    }

    pub fn cost(&self) -> Option<Decimal> {
        self.cost
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Aggregate of a bulk send, built incrementally in dispatch order.
///
/// Invariant: `successful_count + failed_count == details.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    successful_count: usize,
    failed_count: usize,
    total_cost: Decimal,
    details: Vec<SendOutcome>,
    cancelled: bool,
}

/// `total + cost`, or `total` unchanged when the sum does not fit a [`Decimal`].
pub(crate) fn add_cost(total: Decimal, cost: Decimal) -> Decimal {
    match total.checked_add(cost) {
        Some(sum) => sum,
        None => {
            tracing::warn!(%total, %cost, "cost total overflowed, counting cost as zero");
            total
        }
    }
}

impl BulkResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, outcome: SendOutcome) {
        if outcome.is_success() {
            self.successful_count += 1;
            if let Some(cost) = outcome.cost {
                self.total_cost = add_cost(self.total_cost, cost);
            }
        } else {
            self.failed_count += 1;
        }
        self.details.push(outcome);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn successful_count(&self) -> usize {
        self.successful_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Number of recipients processed so far.
    pub fn processed(&self) -> usize {
        self.details.len()
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    pub fn details(&self) -> &[SendOutcome] {
        &self.details
    }

    /// `true` when dispatch stopped early because of a cancellation request.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}
