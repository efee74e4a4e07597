//! Gateway seam and its Africa's Talking implementation.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::domain::{
    ApiKey, MessageText, NormalizedNumber, SendSmsResponse, SenderId, Username, ValidationError,
};

pub const PRODUCTION_ENDPOINT: &str = "https://api.africastalking.com/version1/messaging";
pub const SANDBOX_ENDPOINT: &str = "https://api.sandbox.africastalking.com/version1/messaging";

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: String,
}

trait HttpTransport: Send + Sync {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        headers: Vec<(String, String)>,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        headers: Vec<(String, String)>,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let mut request = self.client.post(url);
            for (name, value) in headers {
                request = request.header(name, value);
            }
            let response = request.form(&params).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

/// The single-send seam the dispatcher talks to.
///
/// Implemented by [`AfricasTalkingClient`]; tests and other vendors plug in their own.
pub trait Gateway: Send + Sync {
    /// Send `message` to every recipient in one gateway call.
    fn send<'a>(
        &'a self,
        message: &'a MessageText,
        recipients: &'a [NormalizedNumber],
    ) -> BoxFuture<'a, Result<SendSmsResponse, GatewayError>>;
}

#[derive(Debug, Clone)]
/// Credentials for the Africa's Talking messaging API.
pub struct Auth {
    username: Username,
    api_key: ApiKey,
}

impl Auth {
    /// Validate that both parts are non-empty after trimming.
    pub fn new(
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            username: Username::new(username)?,
            api_key: ApiKey::new(api_key)?,
        })
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (ApiKey::HEADER.to_owned(), self.api_key.as_str().to_owned()),
            ("Accept".to_owned(), "application/json".to_owned()),
        ]
    }

    fn push_form_params(&self, params: &mut Vec<(String, String)>) {
        params.push((
            Username::FIELD.to_owned(),
            self.username.as_str().to_owned(),
        ));
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`Gateway::send`].
///
/// The dispatcher records these on the failing recipient; they never abort a batch.
pub enum GatewayError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// The endpoint answered outside 2xx; `body` is kept when non-blank.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// A 2xx body that is not the `SMSMessageData` JSON document.
    #[error("parse error: {0}")]
    Parse(#[source] Box<dyn StdError + Send + Sync>),

    /// Rejected before any request was made.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Which Africa's Talking environment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

/// Configuration summary for health reporting. Never contains secrets.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ServiceStatus {
    pub environment: Environment,
    pub username: String,
    pub endpoint: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone)]
/// Builder for [`AfricasTalkingClient`].
///
/// Use this when you need to customize the endpoint, sender id, timeout, or user-agent.
pub struct AfricasTalkingClientBuilder {
    auth: Auth,
    endpoint: Option<String>,
    sender_id: Option<SenderId>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl AfricasTalkingClientBuilder {
    /// Create a builder; the endpoint defaults from the username (sandbox or production).
    pub fn new(auth: Auth) -> Self {
        Self {
            auth,
            endpoint: None,
            sender_id: None,
            timeout: None,
            user_agent: None,
        }
    }

    /// Override the messaging endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Send from a registered sender id or short code.
    pub fn sender_id(mut self, sender_id: SenderId) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    /// Per-request timeout, connect through body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build an [`AfricasTalkingClient`].
    pub fn build(self) -> Result<AfricasTalkingClient, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|err| GatewayError::Transport(Box::new(err)))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| default_endpoint(self.auth.username()).to_owned());

        Ok(AfricasTalkingClient {
            auth: self.auth,
            endpoint,
            sender_id: self.sender_id,
            http: Arc::new(ReqwestTransport { client }),
        })
    }
}

#[derive(Clone)]
/// Africa's Talking SMS client.
///
/// This type orchestrates form encoding, the HTTP call, and response parsing.
/// The `sandbox` username talks to the sandbox endpoint, every other username to
/// production, unless overridden through the builder.
pub struct AfricasTalkingClient {
    auth: Auth,
    endpoint: String,
    sender_id: Option<SenderId>,
    http: Arc<dyn HttpTransport>,
}

impl AfricasTalkingClient {
    /// Create a client using the default endpoint for the credentials.
    ///
    /// For more customization, use [`AfricasTalkingClient::builder`].
    pub fn new(auth: Auth) -> Self {
        let endpoint = default_endpoint(auth.username()).to_owned();
        Self {
            auth,
            endpoint,
            sender_id: None,
            http: Arc::new(ReqwestTransport {
                client: reqwest::Client::new(),
            }),
        }
    }

    pub fn builder(auth: Auth) -> AfricasTalkingClientBuilder {
        AfricasTalkingClientBuilder::new(auth)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Environment and credential presence, for health checks.
    pub fn service_status(&self) -> ServiceStatus {
        ServiceStatus {
            environment: if self.auth.username().is_sandbox() {
                Environment::Sandbox
            } else {
                Environment::Production
            },
            username: self.auth.username().as_str().to_owned(),
            endpoint: self.endpoint.clone(),
            api_key_configured: !self.auth.api_key().is_placeholder(),
        }
    }

    /// Send one message to the given recipients.
    ///
    /// Errors:
    /// - [`GatewayError::Transport`] when the request could not be completed,
    /// - [`GatewayError::HttpStatus`] for non-2xx HTTP responses,
    /// - [`GatewayError::Parse`] when the body is not the expected JSON shape.
    ///
    /// Per-recipient rejections are not errors; they are reported in the response.
    pub async fn send_sms(
        &self,
        message: &MessageText,
        recipients: &[NormalizedNumber],
    ) -> Result<SendSmsResponse, GatewayError> {
        if recipients.is_empty() {
            return Err(ValidationError::Empty {
                field: NormalizedNumber::FIELD,
            }
            .into());
        }

        let mut params = Vec::<(String, String)>::new();
        self.auth.push_form_params(&mut params);
        params.extend(crate::transport::encode_send_sms_form(
            message,
            recipients,
            self.sender_id.as_ref(),
        ));

        let response = self
            .http
            .post_form(&self.endpoint, self.auth.headers(), params)
            .await
            .map_err(GatewayError::Transport)?;

        if !(200..=299).contains(&response.status) {
            let body = if response.body.trim().is_empty() {
                None
            } else {
                Some(response.body)
            };
            return Err(GatewayError::HttpStatus {
                status: response.status,
                body,
            });
        }

        crate::transport::decode_send_sms_json_response(&response.body)
            .map_err(|err| GatewayError::Parse(Box::new(err)))
    }
}

impl Gateway for AfricasTalkingClient {
    fn send<'a>(
        &'a self,
        message: &'a MessageText,
        recipients: &'a [NormalizedNumber],
    ) -> BoxFuture<'a, Result<SendSmsResponse, GatewayError>> {
        Box::pin(self.send_sms(message, recipients))
    }
}

fn default_endpoint(username: &Username) -> &'static str {
    if username.is_sandbox() {
        SANDBOX_ENDPOINT
    } else {
        PRODUCTION_ENDPOINT
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::domain::{CountryProfile, DeliveryStatus};
    use crate::numbers::NumberValidator;

    use super::*;

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug)]
    struct FakeTransportState {
        last_url: Option<String>,
        last_headers: Vec<(String, String)>,
        last_params: Vec<(String, String)>,
        response_status: u16,
        response_body: String,
    }

    impl FakeTransport {
        fn new(response_status: u16, response_body: impl Into<String>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    last_url: None,
                    last_headers: Vec::new(),
                    last_params: Vec::new(),
                    response_status,
                    response_body: response_body.into(),
                })),
            }
        }

        fn last_request(&self) -> (Option<String>, Vec<(String, String)>, Vec<(String, String)>) {
            let state = self.state.lock().unwrap();
            (
                state.last_url.clone(),
                state.last_headers.clone(),
                state.last_params.clone(),
            )
        }
    }

    impl HttpTransport for FakeTransport {
        fn post_form<'a>(
            &'a self,
            url: &'a str,
            headers: Vec<(String, String)>,
            params: Vec<(String, String)>,
        ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
            Box::pin(async move {
                let (status, body) = {
                    let mut state = self.state.lock().unwrap();
                    state.last_url = Some(url.to_owned());
                    state.last_headers = headers;
                    state.last_params = params;
                    (state.response_status, state.response_body.clone())
                };
                Ok(HttpResponse { status, body })
            })
        }
    }

    fn assert_param(params: &[(String, String)], key: &str, value: &str) {
        assert!(
            params.iter().any(|(k, v)| k == key && v == value),
            "missing param {key}={value}; got: {params:?}"
        );
    }

    fn make_client(transport: FakeTransport) -> AfricasTalkingClient {
        AfricasTalkingClient {
            auth: Auth::new("sandbox", "test_key").unwrap(),
            endpoint: "https://example.invalid/version1/messaging".to_owned(),
            sender_id: None,
            http: Arc::new(transport),
        }
    }

    fn recipients() -> Vec<NormalizedNumber> {
        NumberValidator::new(CountryProfile::ghana())
            .validate(&["0241234567"])
            .valid
    }

    fn message() -> MessageText {
        MessageText::new("hello").unwrap()
    }

    #[tokio::test]
    async fn send_sms_includes_credentials_and_parses_ok_response() {
        let json = r#"
        {
          "SMSMessageData": {
            "Message": "Sent to 1/1 Total Cost: KES 0.8000",
            "Recipients": [
              {
                "statusCode": 101,
                "number": "+233241234567",
                "status": "Success",
                "cost": "KES 0.8000",
                "messageId": "ATXid_abc"
              }
            ]
          }
        }
        "#;

        let transport = FakeTransport::new(201, json);
        let client = make_client(transport.clone());

        let response = client.send_sms(&message(), &recipients()).await.unwrap();
        assert_eq!(response.recipients.len(), 1);
        assert_eq!(response.recipients[0].status, DeliveryStatus::Success);
        assert_eq!(response.recipients[0].message_id.as_deref(), Some("ATXid_abc"));

        let (url, headers, params) = transport.last_request();
        assert_eq!(
            url.as_deref(),
            Some("https://example.invalid/version1/messaging")
        );
        assert_param(&headers, "apiKey", "test_key");
        assert_param(&headers, "Accept", "application/json");
        assert_param(&params, "username", "sandbox");
        assert_param(&params, "to", "+233241234567");
        assert_param(&params, "message", "hello");
    }

    #[tokio::test]
    async fn send_sms_includes_sender_id_when_configured() {
        let transport = FakeTransport::new(201, r#"{"SMSMessageData": {"Recipients": []}}"#);
        let mut client = make_client(transport.clone());
        client.sender_id = Some(SenderId::new("ACME").unwrap());

        client.send_sms(&message(), &recipients()).await.unwrap();

        let (_, _, params) = transport.last_request();
        assert_param(&params, "from", "ACME");
    }

    #[tokio::test]
    async fn send_sms_maps_non_success_http_status() {
        let transport = FakeTransport::new(401, "The supplied authentication is invalid");
        let client = make_client(transport);

        let err = client.send_sms(&message(), &recipients()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::HttpStatus {
                status: 401,
                body: Some(_)
            }
        ));
    }

    #[tokio::test]
    async fn send_sms_maps_empty_http_body_to_none() {
        let transport = FakeTransport::new(503, "   ");
        let client = make_client(transport);

        let err = client.send_sms(&message(), &recipients()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::HttpStatus {
                status: 503,
                body: None
            }
        ));
    }

    #[tokio::test]
    async fn send_sms_maps_invalid_json_to_parse_error() {
        let transport = FakeTransport::new(200, "{ not json }");
        let client = make_client(transport);

        let err = client.send_sms(&message(), &recipients()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }

    #[tokio::test]
    async fn send_sms_rejects_empty_recipient_list() {
        let transport = FakeTransport::new(200, "{}");
        let client = make_client(transport.clone());

        let err = client.send_sms(&message(), &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert!(transport.last_request().0.is_none());
    }

    #[tokio::test]
    async fn gateway_trait_delegates_to_send_sms() {
        let transport = FakeTransport::new(201, r#"{"SMSMessageData": {"Recipients": []}}"#);
        let client = make_client(transport.clone());
        let gateway: &dyn Gateway = &client;

        let response = gateway.send(&message(), &recipients()).await.unwrap();
        assert!(response.recipients.is_empty());
        assert!(transport.last_request().0.is_some());
    }

    #[test]
    fn auth_constructor_validates_inputs() {
        assert!(Auth::new("   ", "key").is_err());
        assert!(Auth::new("user", "").is_err());
    }

    #[test]
    fn endpoint_defaults_follow_username() {
        let sandbox = AfricasTalkingClient::new(Auth::new("sandbox", "key").unwrap());
        assert_eq!(sandbox.endpoint(), SANDBOX_ENDPOINT);
        assert_eq!(sandbox.service_status().environment, Environment::Sandbox);

        let live = AfricasTalkingClient::builder(Auth::new("acme", "key").unwrap())
            .build()
            .unwrap();
        assert_eq!(live.endpoint(), PRODUCTION_ENDPOINT);
        let status = live.service_status();
        assert_eq!(status.environment, Environment::Production);
        assert_eq!(status.username, "acme");
        assert!(status.api_key_configured);

        let template =
            AfricasTalkingClient::new(Auth::new("sandbox", ApiKey::PLACEHOLDER).unwrap());
        assert!(!template.service_status().api_key_configured);
    }

    #[test]
    fn builder_endpoint_override_is_applied() {
        let client = AfricasTalkingClient::builder(Auth::new("sandbox", "key").unwrap())
            .endpoint("https://example.invalid/messaging")
            .sender_id(SenderId::new("ACME").unwrap())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.endpoint(), "https://example.invalid/messaging");
        assert_eq!(client.sender_id.as_ref().map(SenderId::as_str), Some("ACME"));
    }
}
