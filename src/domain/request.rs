use serde::Deserialize;

/// Default cap on parsed recipients per broadcast.
pub const DEFAULT_MAX_RECIPIENTS: usize = 300;
/// Default cap on message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 1600;

/// How a textual recipient field should be split into phone numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Guess from content: delimited text is manual when a line starts with the
    /// international prefix, tabular otherwise; undelimited text is one number.
    #[default]
    Auto,
    /// Comma and newline separated list.
    Manual,
    /// CSV rows, first phone-like cell per row.
    Tabular,
    /// The whole field is one number.
    Single,
}

/// Recipient field as submitted by a caller: free text or an already split list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PhoneNumbersInput {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for PhoneNumbersInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PhoneNumbersInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for PhoneNumbersInput {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// One broadcast: a message and the raw recipient field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
    pub phone_numbers: PhoneNumbersInput,
    #[serde(default)]
    pub mode: InputMode,
}

impl BroadcastRequest {
    pub fn new(message: impl Into<String>, phone_numbers: impl Into<PhoneNumbersInput>) -> Self {
        Self {
            message: message.into(),
            phone_numbers: phone_numbers.into(),
            mode: InputMode::Auto,
        }
    }

    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Hard limits checked before any dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_recipients: usize,
    pub max_message_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_recipients: DEFAULT_MAX_RECIPIENTS,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}
