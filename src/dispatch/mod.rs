//! Sequential bulk dispatch: one gateway call per recipient, partial-failure accounting,
//! pacing between sends and periodic checkpoints.

use std::any::Any;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::client::Gateway;
use crate::domain::{
    BulkResult, DeliveryStatus, MessageText, NormalizedNumber, SendOutcome, SendSmsResponse,
};

pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;

/// Currency tokens stripped from gateway cost strings before decimal parsing.
pub const KNOWN_CURRENCIES: &[&str] = &[
    "KES", "USD", "GHS", "UGX", "TZS", "NGN", "RWF", "MWK", "ZMW", "ETB", "XOF",
];

const INVALID_RESPONSE: &str = "Invalid response from SMS service";

pub type SinkError = Box<dyn StdError + Send + Sync>;

/// Durable destination for in-progress batch results.
///
/// The dispatcher is the only writer for the duration of a batch.
pub trait CheckpointSink: Send {
    /// Called once per recipient, in dispatch order, as soon as its outcome exists.
    fn record_outcome<'a>(
        &'a mut self,
        outcome: &'a SendOutcome,
    ) -> BoxFuture<'a, Result<(), SinkError>>;

    /// Make everything recorded so far durable. `progress` is the partial aggregate.
    fn checkpoint<'a>(&'a mut self, progress: &'a BulkResult)
    -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Wait inserted between consecutive sends.
pub trait Pacing: Send + Sync {
    fn pause(&self) -> BoxFuture<'_, ()>;
}

/// Sleep a fixed duration on the tokio timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl Pacing for FixedDelay {
    fn pause(&self) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(self.0))
    }
}

/// No wait at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDelay;

impl Pacing for NoDelay {
    fn pause(&self) -> BoxFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub send_delay: Duration,
    /// Checkpoint after this many processed recipients; `0` keeps only the final flush.
    pub checkpoint_every: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_delay: DEFAULT_SEND_DELAY,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

/// Sends one message to many recipients, strictly one at a time.
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    pacing: Arc<dyn Pacing>,
    checkpoint_every: usize,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn Gateway>, config: DispatchConfig) -> Self {
        Self {
            gateway,
            pacing: Arc::new(FixedDelay(config.send_delay)),
            checkpoint_every: config.checkpoint_every,
        }
    }

    /// Replace the inter-send wait, e.g. with [`NoDelay`] in tests.
    pub fn with_pacing(mut self, pacing: Arc<dyn Pacing>) -> Self {
        self.pacing = pacing;
        self
    }

    /// Call the gateway once for `recipient` and map the reply to an outcome.
    ///
    /// Never fails: gateway errors, rejections and malformed replies all become a
    /// failed [`SendOutcome`].
    pub async fn send_one(
        &self,
        message: &MessageText,
        recipient: &NormalizedNumber,
    ) -> SendOutcome {
        match self
            .gateway
            .send(message, std::slice::from_ref(recipient))
            .await
        {
            Ok(response) => outcome_from_response(recipient, response),
            Err(err) => {
                tracing::error!(recipient = %recipient, error = %err, "gateway call failed");
                SendOutcome::failure(recipient.clone(), err.to_string())
            }
        }
    }

    /// Send `message` to every recipient in order. See [`Dispatcher::send_bulk_with_cancel`].
    pub async fn send_bulk(
        &self,
        message: &MessageText,
        recipients: &[NormalizedNumber],
        checkpoint: Option<&mut dyn CheckpointSink>,
    ) -> BulkResult {
        self.send_bulk_with_cancel(message, recipients, checkpoint, None)
            .await
    }

    /// Send `message` to every recipient in order, one gateway call at a time.
    ///
    /// A failing recipient is recorded and skipped; it never aborts the batch. The
    /// configured pause runs between sends but not after the last one. With a sink,
    /// every outcome is recorded as it is produced, a checkpoint is taken every
    /// `checkpoint_every` recipients, and once more after the loop.
    ///
    /// When `cancel` turns `true` the remaining recipients are skipped and the partial
    /// result is returned with [`BulkResult::cancelled`] set.
    pub async fn send_bulk_with_cancel(
        &self,
        message: &MessageText,
        recipients: &[NormalizedNumber],
        mut checkpoint: Option<&mut dyn CheckpointSink>,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> BulkResult {
        let total = recipients.len();
        let mut result = BulkResult::new();
        tracing::info!(recipients = total, "starting bulk send");

        for (index, recipient) in recipients.iter().enumerate() {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                result.mark_cancelled();
                break;
            }

            let outcome = self.send_guarded(message, recipient).await;
            if let Some(sink) = checkpoint.as_deref_mut() {
                if let Err(err) = sink.record_outcome(&outcome).await {
                    tracing::warn!(recipient = %recipient, error = %err, "failed to record outcome");
                }
            }
            result.push(outcome);

            let processed = index + 1;
            if self.checkpoint_every > 0 && processed % self.checkpoint_every == 0 {
                tracing::info!(processed, total, "bulk send progress");
                if let Some(sink) = checkpoint.as_deref_mut() {
                    flush(sink, &result).await;
                }
            }

            if processed < total && self.pause(cancel.as_mut()).await {
                result.mark_cancelled();
                break;
            }
        }

        if let Some(sink) = checkpoint.as_deref_mut() {
            flush(sink, &result).await;
        }

        if result.cancelled() {
            tracing::warn!(
                processed = result.processed(),
                remaining = total - result.processed(),
                "bulk send cancelled"
            );
        }
        tracing::info!(
            successful = result.successful_count(),
            failed = result.failed_count(),
            total_cost = %result.total_cost(),
            "bulk send completed"
        );
        result
    }

    /// [`Dispatcher::send_one`], with a panic inside the gateway turned into a failure.
    async fn send_guarded(
        &self,
        message: &MessageText,
        recipient: &NormalizedNumber,
    ) -> SendOutcome {
        match AssertUnwindSafe(self.send_one(message, recipient))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(recipient = %recipient, reason = %reason, "unexpected error while sending");
                SendOutcome::failure(recipient.clone(), format!("unexpected error: {reason}"))
            }
        }
    }

    /// Run the pacing wait. Returns `true` if cancellation was requested meanwhile.
    async fn pause(&self, cancel: Option<&mut watch::Receiver<bool>>) -> bool {
        let mut pause = self.pacing.pause();
        let Some(rx) = cancel else {
            pause.await;
            return false;
        };

        loop {
            let changed = tokio::select! {
                _ = &mut pause => return false,
                changed = rx.changed() => changed,
            };
            if changed.is_err() {
                // Sender gone: nobody can cancel any more.
                pause.await;
                return false;
            }
            if *rx.borrow_and_update() {
                return true;
            }
        }
    }
}

/// Amount in a gateway cost string such as `"KES 0.8000"`.
///
/// A known currency token is stripped from either end before parsing. Returns `None`
/// when no decimal amount remains.
pub fn parse_cost(raw: &str) -> Option<Decimal> {
    let value = raw.trim();
    let amount = KNOWN_CURRENCIES
        .iter()
        .find_map(|currency| value.strip_prefix(currency))
        .or_else(|| {
            KNOWN_CURRENCIES
                .iter()
                .find_map(|currency| value.strip_suffix(currency))
        })
        .unwrap_or(value)
        .trim();
    Decimal::from_str(amount).ok()
}

fn outcome_from_response(recipient: &NormalizedNumber, response: SendSmsResponse) -> SendOutcome {
    let mut entries = response.recipients;
    let index = entries
        .iter()
        .position(|entry| entry.number == recipient.as_str())
        .unwrap_or(0);
    if index >= entries.len() {
        tracing::error!(recipient = %recipient, summary = ?response.summary, "gateway reply has no recipients");
        return SendOutcome::failure(recipient.clone(), INVALID_RESPONSE);
    }
    let entry = entries.swap_remove(index);

    match entry.status {
        DeliveryStatus::Success => {
            let cost = entry.cost.as_deref().and_then(|raw| {
                let parsed = parse_cost(raw);
                if parsed.is_none() {
                    tracing::warn!(recipient = %recipient, cost = raw, "unparseable cost, counting as zero");
                }
                parsed
            });
            SendOutcome::success(recipient.clone(), entry.message_id, cost)
        }
        DeliveryStatus::Other(status) => {
            tracing::error!(recipient = %recipient, status = %status, "gateway rejected message");
            SendOutcome::failure(
                recipient.clone(),
                format!("SMS failed with status: {status}"),
            )
        }
    }
}

async fn flush(sink: &mut dyn CheckpointSink, progress: &BulkResult) {
    if let Err(err) = sink.checkpoint(progress).await {
        tracing::warn!(processed = progress.processed(), error = %err, "checkpoint failed");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_owned()
    }
}
