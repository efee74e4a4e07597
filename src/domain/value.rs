use serde::Serialize;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Africa's Talking application username (`username`).
///
/// Invariant: non-empty after trimming. The literal `sandbox` selects the sandbox environment.
pub struct Username(String);

impl Username {
    /// Form field name used by Africa's Talking (`username`).
    pub const FIELD: &'static str = "username";

    /// Username reserved for the Africa's Talking sandbox.
    pub const SANDBOX: &'static str = "sandbox";

    /// Create a validated [`Username`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated username.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this username targets the sandbox environment.
    pub fn is_sandbox(&self) -> bool {
        self.0 == Self::SANDBOX
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
/// Africa's Talking API key, sent in the `apiKey` header.
///
/// Invariant: non-empty after trimming. `Debug` output is redacted.
pub struct ApiKey(String);

impl ApiKey {
    /// Header name used by Africa's Talking (`apiKey`).
    pub const HEADER: &'static str = "apiKey";

    /// Sample value shipped in configuration templates; never a working key.
    pub const PLACEHOLDER: &'static str = "your-api-key-here";

    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::HEADER });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the template placeholder rather than a real key.
    pub fn is_placeholder(&self) -> bool {
        self.0 == Self::PLACEHOLDER
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Registered sender id or short code (`from`).
///
/// Invariant: non-empty after trimming, at most [`SenderId::MAX_CHARS`] characters.
pub struct SenderId(String);

impl SenderId {
    /// Form field name used by Africa's Talking (`from`).
    pub const FIELD: &'static str = "from";

    /// Longest alphanumeric sender id carriers accept.
    pub const MAX_CHARS: usize = 11;

    /// Create a validated [`SenderId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let actual = trimmed.chars().count();
        if actual > Self::MAX_CHARS {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::MAX_CHARS,
                actual,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated sender id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// SMS message text (`message`).
///
/// Invariant: non-empty after trimming. The original value (including whitespace) is preserved.
pub struct MessageText(String);

impl MessageText {
    /// Form field name used by Africa's Talking (`message`).
    pub const FIELD: &'static str = "message";

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters (Unicode scalar values), as counted for limits and segments.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
/// Phone number in canonical `+<country code><local number>` form.
///
/// Only produced by [`crate::numbers::NumberValidator`], so every value matched the
/// active country pattern when it was created. Used as the dispatch key.
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    /// Form field name used by Africa's Talking (`to`).
    pub const FIELD: &'static str = "to";

    pub(crate) fn from_validated(value: String) -> Self {
        Self(value)
    }

    /// Borrow the canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Per-recipient status code returned by Africa's Talking (`statusCode`).
///
/// This value is preserved as-is even when the code is unknown to this crate.
pub struct StatusCode(i32);

impl StatusCode {
    /// Construct a status code from its integer representation.
    pub fn new(code: i32) -> Self {
        Self(code)
    }

    /// Get the integer code as provided by the gateway.
    pub fn as_i32(self) -> i32 {
        self.0
    }

    /// Map this code to a known status code variant, if one exists.
    pub fn known_kind(self) -> Option<KnownStatusCode> {
        KnownStatusCode::from_code(self.0)
    }

    /// Returns `true` if the gateway accepted the message for delivery.
    pub fn is_accepted(self) -> bool {
        matches!(self.known_kind(), Some(kind) if kind.is_accepted())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
/// Known Africa's Talking per-recipient status codes.
pub enum KnownStatusCode {
    Processed,
    Sent,
    Queued,
    RiskHold,
    InvalidSenderId,
    InvalidPhoneNumber,
    UnsupportedNumberType,
    InsufficientBalance,
    UserInBlacklist,
    CouldNotRoute,
    DoNotDisturbRejection,
    InternalServerError,
    GatewayError,
    RejectedByGateway,
}

impl KnownStatusCode {
    /// Convert a raw integer code into a known variant.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            100 => Self::Processed,
            101 => Self::Sent,
            102 => Self::Queued,
            401 => Self::RiskHold,
            402 => Self::InvalidSenderId,
            403 => Self::InvalidPhoneNumber,
            404 => Self::UnsupportedNumberType,
            405 => Self::InsufficientBalance,
            406 => Self::UserInBlacklist,
            407 => Self::CouldNotRoute,
            409 => Self::DoNotDisturbRejection,
            500 => Self::InternalServerError,
            501 => Self::GatewayError,
            502 => Self::RejectedByGateway,
            _ => return None,
        })
    }

    /// Whether the gateway took the message (processed, sent or queued).
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Processed | Self::Sent | Self::Queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_newtypes_trim_or_validate() {
        let username = Username::new("  sandbox ").unwrap();
        assert_eq!(username.as_str(), "sandbox");
        assert!(username.is_sandbox());
        assert!(Username::new("  ").is_err());
        assert!(!Username::new("acme").unwrap().is_sandbox());

        let key = ApiKey::new(" atsk_123 ").unwrap();
        assert_eq!(key.as_str(), "atsk_123");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("").is_err());

        let sender = SenderId::new(" ACME ").unwrap();
        assert_eq!(sender.as_str(), "ACME");
        assert!(SenderId::new("ACME-ALERTS1").is_err());

        let msg = MessageText::new(" hi ").unwrap();
        assert_eq!(msg.as_str(), " hi ");
        assert!(MessageText::new(" \n ").is_err());
    }

    #[test]
    fn message_char_count_uses_scalar_values() {
        let msg = MessageText::new("héllo 😀").unwrap();
        assert_eq!(msg.char_count(), 7);
    }

    #[test]
    fn status_code_known_mapping() {
        assert_eq!(
            StatusCode::new(101).known_kind(),
            Some(KnownStatusCode::Sent)
        );
        assert!(StatusCode::new(102).is_accepted());
        assert!(!StatusCode::new(405).is_accepted());

        let unknown = StatusCode::new(9999);
        assert_eq!(unknown.known_kind(), None);
        assert!(!unknown.is_accepted());
    }
}
