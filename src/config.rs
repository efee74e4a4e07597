//! Environment-driven configuration.
//!
//! `Config::from_env` loads a `.env` file when one exists and then reads process
//! variables. Everything except the API key has a default.

use std::time::Duration;

use crate::client::{AfricasTalkingClient, Auth, GatewayError};
use crate::dispatch::DispatchConfig;
use crate::domain::{
    CountryProfile, DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_MAX_RECIPIENTS, Limits, SenderId, Username,
};

pub const AT_USERNAME: &str = "AT_USERNAME";
pub const AT_API_KEY: &str = "AT_API_KEY";
pub const AT_SENDER_ID: &str = "AT_SENDER_ID";
pub const AT_ENDPOINT: &str = "AT_ENDPOINT";
pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const SMS_COUNTRY_CODE: &str = "SMS_COUNTRY_CODE";
pub const SMS_TRUNK_PREFIX: &str = "SMS_TRUNK_PREFIX";
pub const SMS_LOCAL_NUMBER_LENGTH: &str = "SMS_LOCAL_NUMBER_LENGTH";
pub const SMS_LEADING_DIGITS: &str = "SMS_LEADING_DIGITS";
pub const SEND_DELAY_MS: &str = "SEND_DELAY_MS";
pub const CHECKPOINT_EVERY: &str = "CHECKPOINT_EVERY";
pub const MAX_RECIPIENTS: &str = "MAX_RECIPIENTS";
pub const MAX_MESSAGE_CHARS: &str = "MAX_MESSAGE_CHARS";
pub const ALLOW_DUPLICATES: &str = "ALLOW_DUPLICATES";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("failed to build gateway client: {0}")]
    Client(#[source] GatewayError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything needed to wire a [`crate::service::Broadcaster`].
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub api_key: String,
    pub sender_id: Option<String>,
    /// Messaging endpoint override; derived from the username when absent.
    pub endpoint: Option<String>,
    pub request_timeout: Option<Duration>,
    pub country: CountryProfile,
    pub dispatch: DispatchConfig,
    pub limits: Limits,
    /// Send repeated numbers once per occurrence (`true`) or once in total.
    pub allow_duplicates: bool,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// Required: `AT_API_KEY`. Optional: `AT_USERNAME` (default `sandbox`),
    /// `AT_SENDER_ID`, `AT_ENDPOINT`, `REQUEST_TIMEOUT_SECS`, `SMS_COUNTRY_CODE`
    /// (233), `SMS_TRUNK_PREFIX` (0), `SMS_LOCAL_NUMBER_LENGTH` (9),
    /// `SMS_LEADING_DIGITS` (2345), `SEND_DELAY_MS` (100), `CHECKPOINT_EVERY` (10),
    /// `MAX_RECIPIENTS` (300), `MAX_MESSAGE_CHARS` (1600), `ALLOW_DUPLICATES` (true).
    pub fn from_env() -> ConfigResult<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let api_key = vars.get(AT_API_KEY).ok_or(ConfigError::MissingVar(AT_API_KEY))?;
        let username = vars
            .get(AT_USERNAME)
            .unwrap_or_else(|| Username::SANDBOX.to_owned());
        let sender_id = vars.get(AT_SENDER_ID);
        if let Some(sender_id) = &sender_id {
            SenderId::new(sender_id.as_str()).map_err(|err| ConfigError::InvalidValue {
                var: AT_SENDER_ID,
                reason: err.to_string(),
            })?;
        }

        let endpoint = vars.get(AT_ENDPOINT);
        if let Some(endpoint) = &endpoint {
            validate_endpoint(endpoint)?;
        }

        let request_timeout = vars
            .parse::<u64>(REQUEST_TIMEOUT_SECS)?
            .map(Duration::from_secs);

        let ghana = CountryProfile::ghana();
        let country = CountryProfile::new(
            vars.get(SMS_COUNTRY_CODE)
                .unwrap_or_else(|| ghana.country_code().to_owned()),
            vars.get(SMS_TRUNK_PREFIX)
                .unwrap_or_else(|| ghana.trunk_prefix().to_owned()),
            vars.parse(SMS_LOCAL_NUMBER_LENGTH)?
                .unwrap_or(ghana.local_length()),
            vars.get(SMS_LEADING_DIGITS)
                .unwrap_or_else(|| ghana.leading_digits().to_owned()),
        )
        .map_err(|err| ConfigError::InvalidValue {
            var: "SMS_*",
            reason: err.to_string(),
        })?;

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            send_delay: vars
                .parse::<u64>(SEND_DELAY_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.send_delay),
            checkpoint_every: vars
                .parse(CHECKPOINT_EVERY)?
                .unwrap_or(defaults.checkpoint_every),
        };

        let limits = Limits {
            max_recipients: vars
                .parse(MAX_RECIPIENTS)?
                .unwrap_or(DEFAULT_MAX_RECIPIENTS),
            max_message_chars: vars
                .parse(MAX_MESSAGE_CHARS)?
                .unwrap_or(DEFAULT_MAX_MESSAGE_CHARS),
        };
        if limits.max_recipients == 0 {
            return Err(ConfigError::InvalidValue {
                var: MAX_RECIPIENTS,
                reason: "must be at least 1".to_owned(),
            });
        }

        let allow_duplicates = match vars.get(ALLOW_DUPLICATES) {
            None => true,
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                var: ALLOW_DUPLICATES,
                reason: format!("expected true or false, got: {value}"),
            })?,
        };

        Ok(Self {
            username,
            api_key,
            sender_id,
            endpoint,
            request_timeout,
            country,
            dispatch,
            limits,
            allow_duplicates,
        })
    }

    /// Build the HTTP gateway client described by this configuration.
    pub fn client(&self) -> ConfigResult<AfricasTalkingClient> {
        let auth = Auth::new(self.username.as_str(), self.api_key.as_str()).map_err(|err| {
            ConfigError::InvalidValue {
                var: AT_API_KEY,
                reason: err.to_string(),
            }
        })?;

        let mut builder = AfricasTalkingClient::builder(auth);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint.as_str());
        }
        if let Some(sender_id) = &self.sender_id {
            let sender_id =
                SenderId::new(sender_id.as_str()).map_err(|err| ConfigError::InvalidValue {
                    var: AT_SENDER_ID,
                    reason: err.to_string(),
                })?;
            builder = builder.sender_id(sender_id);
        }
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .user_agent(concat!("smscast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::Client)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, name: &'static str) -> ConfigResult<Option<T>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    var: name,
                    reason: format!("must be a non-negative number, got: {value}"),
                }),
        }
    }
}

fn validate_endpoint(endpoint: &str) -> ConfigResult<()> {
    let parsed = url::Url::parse(endpoint).map_err(|err| ConfigError::InvalidValue {
        var: AT_ENDPOINT,
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidValue {
            var: AT_ENDPOINT,
            reason: format!("unsupported scheme: {other}"),
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
