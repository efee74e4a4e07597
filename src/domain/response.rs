use crate::domain::value::StatusCode;

/// Per-recipient delivery status string reported by the gateway (`status`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Success,
    Other(String),
}

impl DeliveryStatus {
    /// Gateway wording for an accepted message.
    pub const SUCCESS: &'static str = "Success";

    pub fn parse(value: &str) -> Self {
        if value == Self::SUCCESS {
            Self::Success
        } else {
            Self::Other(value.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => Self::SUCCESS,
            Self::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSmsResponse {
    /// Human-readable summary, e.g. `Sent to 1/1 Total Cost: KES 0.8000`.
    pub summary: Option<String>,
    pub recipients: Vec<RecipientResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientResult {
    pub number: String,
    pub status: DeliveryStatus,
    pub status_code: Option<StatusCode>,
    pub message_id: Option<String>,
    /// Cost as reported, currency token included (`KES 0.8000`).
    pub cost: Option<String>,
}
