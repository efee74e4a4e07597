//! Caller-facing broadcast operation: limits, parsing, validation, dispatch and
//! campaign bookkeeping behind one call.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;

use crate::campaign::{CampaignCheckpoint, CampaignDraft, CampaignId, CampaignStore, StoreError};
use crate::client::Gateway;
use crate::config::{Config, ConfigError};
use crate::dispatch::{DispatchConfig, Dispatcher, panic_message};
use crate::domain::{
    BroadcastRequest, BulkResult, CountryProfile, Limits, MessageText, SendOutcome,
};
use crate::numbers::{NumberValidator, dedup_numbers};
use crate::parse::parse_recipients;
use crate::segments::segment_count;

/// Invalid inputs echoed back in a successful report.
pub const INVALID_PREVIEW_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Message is required")]
    EmptyMessage,

    #[error("Message is too long: {actual} characters (max {max})")]
    MessageTooLong { max: usize, actual: usize },

    #[error("No phone numbers provided")]
    NoRecipients,

    #[error("Too many phone numbers. Maximum allowed is {max}, but {actual} were provided.")]
    TooManyRecipients { max: usize, actual: usize },

    #[error("No valid phone numbers found")]
    NoValidNumbers { invalid: Vec<String> },

    #[error("campaign store error: {0}")]
    Store(#[source] StoreError),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl BroadcastError {
    /// HTTP-style status: `400` for rejected input, `500` otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyMessage
            | Self::MessageTooLong { .. }
            | Self::NoRecipients
            | Self::TooManyRecipients { .. }
            | Self::NoValidNumbers { .. } => 400,
            Self::Store(_) | Self::Unexpected(_) => 500,
        }
    }

    pub fn to_failure(&self) -> BroadcastFailure {
        BroadcastFailure {
            success: false,
            error: self.to_string(),
            invalid_numbers: match self {
                Self::NoValidNumbers { invalid } => Some(invalid.clone()),
                _ => None,
            },
        }
    }
}

/// Wire shape of a rejected broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_numbers: Option<Vec<String>>,
}

/// Outcome of an accepted broadcast. Individual sends may still have failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastReport {
    pub success: bool,
    /// `None` when no campaign store is attached.
    pub campaign_id: Option<CampaignId>,
    /// Recipient tokens after parsing, valid or not.
    pub total_numbers: usize,
    pub valid_numbers: usize,
    pub invalid_numbers: usize,
    pub invalid_numbers_list: Vec<String>,
    pub duplicates_removed: usize,
    pub successful_sends: usize,
    pub failed_sends: usize,
    pub total_cost: Decimal,
    pub message_length: usize,
    pub segments: usize,
    pub cancelled: bool,
    pub details: Vec<SendOutcome>,
}

/// Ties number handling, the dispatcher and an optional campaign store together.
pub struct Broadcaster {
    validator: NumberValidator,
    dispatcher: Dispatcher,
    limits: Limits,
    allow_duplicates: bool,
    store: Option<Arc<dyn CampaignStore>>,
}

impl Broadcaster {
    /// Default limits and pacing, duplicates allowed, no store.
    pub fn new(gateway: Arc<dyn Gateway>, profile: CountryProfile) -> Self {
        Self {
            validator: NumberValidator::new(profile),
            dispatcher: Dispatcher::new(gateway, DispatchConfig::default()),
            limits: Limits::default(),
            allow_duplicates: true,
            store: None,
        }
    }

    /// Wire the HTTP client and settings from `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let gateway: Arc<dyn Gateway> = Arc::new(config.client()?);
        Ok(Self {
            validator: NumberValidator::new(config.country.clone()),
            dispatcher: Dispatcher::new(gateway, config.dispatch),
            limits: config.limits,
            allow_duplicates: config.allow_duplicates,
            store: None,
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CampaignStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn validator(&self) -> &NumberValidator {
        &self.validator
    }

    pub async fn broadcast(
        &self,
        request: BroadcastRequest,
    ) -> Result<BroadcastReport, BroadcastError> {
        self.broadcast_with_cancel(request, None).await
    }

    /// Run one broadcast. Input errors are returned before any gateway call.
    ///
    /// A panic anywhere in the pipeline is reported as [`BroadcastError::Unexpected`].
    pub async fn broadcast_with_cancel(
        &self,
        request: BroadcastRequest,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<BroadcastReport, BroadcastError> {
        let result = match AssertUnwindSafe(self.run(request, cancel))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(BroadcastError::Unexpected(panic_message(panic.as_ref()))),
        };
        if let Err(err) = &result {
            tracing::error!(error = %err, status = err.status_code(), "broadcast rejected");
        }
        result
    }

    async fn run(
        &self,
        request: BroadcastRequest,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<BroadcastReport, BroadcastError> {
        let message = request.message.trim();
        let message_length = message.chars().count();
        if message_length > self.limits.max_message_chars {
            return Err(BroadcastError::MessageTooLong {
                max: self.limits.max_message_chars,
                actual: message_length,
            });
        }
        let message = MessageText::new(message).map_err(|_| BroadcastError::EmptyMessage)?;

        let parsed = parse_recipients(
            &request.phone_numbers,
            request.mode,
            self.validator.profile(),
        );
        if parsed.is_empty() {
            return Err(BroadcastError::NoRecipients);
        }
        if parsed.len() > self.limits.max_recipients {
            return Err(BroadcastError::TooManyRecipients {
                max: self.limits.max_recipients,
                actual: parsed.len(),
            });
        }

        let partition = self.validator.validate(&parsed);
        if partition.valid.is_empty() {
            return Err(BroadcastError::NoValidNumbers {
                invalid: partition.invalid,
            });
        }
        let valid_numbers = partition.valid.len();
        let mut recipients = partition.valid;
        let duplicates_removed = if self.allow_duplicates {
            0
        } else {
            dedup_numbers(&mut recipients)
        };

        tracing::info!(
            total = parsed.len(),
            valid = valid_numbers,
            invalid = partition.invalid.len(),
            duplicates_removed,
            "broadcast accepted"
        );

        let (campaign_id, result) = match self.store.as_deref() {
            Some(store) => {
                let id = store
                    .open_campaign(CampaignDraft {
                        message: message.as_str().to_owned(),
                        total_recipients: parsed.len(),
                        valid_recipients: recipients.len(),
                        invalid_numbers: partition.invalid.clone(),
                    })
                    .await
                    .map_err(BroadcastError::Store)?;

                let mut sink = CampaignCheckpoint::new(store, id);
                let result = self
                    .dispatcher
                    .send_bulk_with_cancel(&message, &recipients, Some(&mut sink), cancel)
                    .await;

                if let Err(err) = store.close_campaign(id, &result).await {
                    tracing::error!(campaign = %id, error = %err, "failed to close campaign");
                }
                (Some(id), result)
            }
            None => {
                let result = self
                    .dispatcher
                    .send_bulk_with_cancel(&message, &recipients, None, cancel)
                    .await;
                (None, result)
            }
        };

        Ok(report(
            campaign_id,
            parsed.len(),
            valid_numbers,
            partition.invalid,
            duplicates_removed,
            &message,
            result,
        ))
    }
}

fn report(
    campaign_id: Option<CampaignId>,
    total_numbers: usize,
    valid_numbers: usize,
    invalid: Vec<String>,
    duplicates_removed: usize,
    message: &MessageText,
    result: BulkResult,
) -> BroadcastReport {
    BroadcastReport {
        success: true,
        campaign_id,
        total_numbers,
        valid_numbers,
        invalid_numbers: invalid.len(),
        invalid_numbers_list: invalid.into_iter().take(INVALID_PREVIEW_LEN).collect(),
        duplicates_removed,
        successful_sends: result.successful_count(),
        failed_sends: result.failed_count(),
        total_cost: result.total_cost(),
        message_length: message.char_count(),
        segments: segment_count(message.as_str()),
        cancelled: result.cancelled(),
        details: result.details().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::campaign::InMemoryCampaignStore;
    use crate::client::GatewayError;
    use crate::dispatch::NoDelay;
    use crate::domain::{
        DeliveryStatus, InputMode, NormalizedNumber, RecipientResult, SendSmsResponse, SendStatus,
    };

    /// Accepts every number except those listed in `reject`.
    struct StubGateway {
        reject: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn new(reject: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                reject,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Gateway for StubGateway {
        fn send<'a>(
            &'a self,
            _message: &'a MessageText,
            recipients: &'a [NormalizedNumber],
        ) -> BoxFuture<'a, Result<SendSmsResponse, GatewayError>> {
            Box::pin(async move {
                let number = recipients[0].as_str().to_owned();
                self.calls.lock().unwrap().push(number.clone());
                let status = if self.reject.contains(&number.as_str()) {
                    DeliveryStatus::Other("InvalidPhoneNumber".to_owned())
                } else {
                    DeliveryStatus::Success
                };
                Ok(SendSmsResponse {
                    summary: None,
                    recipients: vec![RecipientResult {
                        message_id: Some(format!("ATXid_{number}")),
                        number,
                        status,
                        status_code: None,
                        cost: Some("GHS 0.0300".to_owned()),
                    }],
                })
            })
        }
    }

    fn broadcaster(gateway: Arc<StubGateway>) -> Broadcaster {
        let dispatcher = Dispatcher::new(gateway.clone(), DispatchConfig::default())
            .with_pacing(Arc::new(NoDelay));
        Broadcaster::new(gateway, CountryProfile::ghana()).with_dispatcher(dispatcher)
    }

    fn numbers(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("024{:07}", i)).collect()
    }

    #[tokio::test]
    async fn end_to_end_with_store() {
        let gateway = StubGateway::new(vec!["+233551234567"]);
        let store = Arc::new(InMemoryCampaignStore::new());
        let broadcaster = broadcaster(gateway.clone()).with_store(store.clone());

        let request = BroadcastRequest::new(
            "  Service update tonight  ",
            "+233241234567\n0551234567,12345\n",
        );
        let report = broadcaster.broadcast(request).await.unwrap();

        assert!(report.success);
        assert_eq!(report.total_numbers, 3);
        assert_eq!(report.valid_numbers, 2);
        assert_eq!(report.invalid_numbers, 1);
        assert_eq!(report.invalid_numbers_list, vec!["12345"]);
        assert_eq!(report.successful_sends, 1);
        assert_eq!(report.failed_sends, 1);
        assert_eq!(report.total_cost, Decimal::new(300, 4));
        assert_eq!(report.message_length, 22);
        assert_eq!(report.segments, 1);
        assert_eq!(
            report.details[1].error(),
            Some("SMS failed with status: InvalidPhoneNumber")
        );
        assert_eq!(gateway.calls(), vec!["+233241234567", "+233551234567"]);

        let campaign = store.campaign(report.campaign_id.unwrap()).unwrap();
        assert_eq!(campaign.status, SendStatus::Failed);
        assert_eq!(campaign.message, "Service update tonight");
        assert_eq!(campaign.records.len(), 2);
        assert_eq!(campaign.invalid_numbers.len(), 1);
    }

    #[tokio::test]
    async fn three_hundred_recipients_are_accepted() {
        let gateway = StubGateway::new(Vec::new());
        let report = broadcaster(gateway.clone())
            .broadcast(BroadcastRequest::new("hi", numbers(300)))
            .await
            .unwrap();
        assert_eq!(report.successful_sends, 300);
        assert_eq!(gateway.calls().len(), 300);
    }

    #[tokio::test]
    async fn three_hundred_and_one_recipients_are_rejected_before_sending() {
        let gateway = StubGateway::new(Vec::new());
        let err = broadcaster(gateway.clone())
            .broadcast(BroadcastRequest::new("hi", numbers(301)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BroadcastError::TooManyRecipients {
                max: 300,
                actual: 301
            }
        ));
        assert_eq!(err.status_code(), 400);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn message_limits() {
        let gateway = StubGateway::new(Vec::new());
        let broadcaster = broadcaster(gateway.clone());

        let err = broadcaster
            .broadcast(BroadcastRequest::new("   ", "0241234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, BroadcastError::EmptyMessage));
        assert_eq!(err.to_string(), "Message is required");

        let ok = broadcaster
            .broadcast(BroadcastRequest::new("a".repeat(1600), "0241234567"))
            .await
            .unwrap();
        assert_eq!(ok.segments, 10);

        let err = broadcaster
            .broadcast(BroadcastRequest::new("a".repeat(1601), "0241234567"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BroadcastError::MessageTooLong {
                max: 1600,
                actual: 1601
            }
        ));
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn no_valid_numbers_lists_the_rejects() {
        let gateway = StubGateway::new(Vec::new());
        let err = broadcaster(gateway.clone())
            .broadcast(BroadcastRequest::new("hi", vec!["123".to_owned(), "abc".to_owned()]))
            .await
            .unwrap_err();

        let failure = err.to_failure();
        assert!(!failure.success);
        assert_eq!(failure.error, "No valid phone numbers found");
        assert_eq!(
            failure.invalid_numbers,
            Some(vec!["123".to_owned(), "abc".to_owned()])
        );
        assert!(gateway.calls().is_empty());

        let json = serde_json::to_value(BroadcastError::NoRecipients.to_failure()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "No phone numbers provided"})
        );
    }

    #[tokio::test]
    async fn empty_recipient_field() {
        let gateway = StubGateway::new(Vec::new());
        let err = broadcaster(gateway)
            .broadcast(BroadcastRequest::new("hi", "  ").with_mode(InputMode::Single))
            .await
            .unwrap_err();
        assert!(matches!(err, BroadcastError::NoRecipients));
    }

    #[tokio::test]
    async fn duplicates_are_sent_unless_disabled() {
        let input = vec!["0241234567".to_owned(), "+233241234567".to_owned()];

        let gateway = StubGateway::new(Vec::new());
        let report = broadcaster(gateway.clone())
            .broadcast(BroadcastRequest::new("hi", input.clone()))
            .await
            .unwrap();
        assert_eq!(report.successful_sends, 2);
        assert_eq!(report.duplicates_removed, 0);

        let gateway = StubGateway::new(Vec::new());
        let report = broadcaster(gateway.clone())
            .with_allow_duplicates(false)
            .broadcast(BroadcastRequest::new("hi", input))
            .await
            .unwrap();
        assert_eq!(report.valid_numbers, 2);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(gateway.calls(), vec!["+233241234567"]);
    }

    #[tokio::test]
    async fn invalid_preview_is_capped() {
        let mut input: Vec<String> = (0..12).map(|i| format!("bad-{i}")).collect();
        input.push("0241234567".to_owned());

        let report = broadcaster(StubGateway::new(Vec::new()))
            .broadcast(BroadcastRequest::new("hi", input))
            .await
            .unwrap();
        assert_eq!(report.invalid_numbers, 12);
        assert_eq!(report.invalid_numbers_list.len(), INVALID_PREVIEW_LEN);
        assert_eq!(report.invalid_numbers_list[0], "bad-0");
    }

    #[tokio::test]
    async fn cancelled_broadcast_reports_partial_result() {
        let gateway = StubGateway::new(Vec::new());
        let (tx, rx) = watch::channel(true);
        let report = broadcaster(gateway.clone())
            .broadcast_with_cancel(BroadcastRequest::new("hi", numbers(3)), Some(rx))
            .await
            .unwrap();
        drop(tx);
        assert!(report.cancelled);
        assert!(report.details.is_empty());
        assert!(gateway.calls().is_empty());
    }
}
