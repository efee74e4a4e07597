use serde::Deserialize;

use super::cost::deserialize_cost;
use crate::domain::{
    DeliveryStatus, MessageText, NormalizedNumber, RecipientResult, SendSmsResponse, SenderId,
    StatusCode,
};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct SendSmsJsonResponse {
    #[serde(rename = "SMSMessageData")]
    data: SmsMessageData,
}

#[derive(Debug, Clone, Deserialize)]
struct SmsMessageData {
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<RecipientJsonResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipientJsonResult {
    #[serde(default)]
    status_code: Option<i32>,
    #[serde(default)]
    number: String,
    status: String,
    #[serde(default, deserialize_with = "deserialize_cost")]
    cost: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
}

pub fn encode_send_sms_form(
    message: &MessageText,
    recipients: &[NormalizedNumber],
    sender: Option<&SenderId>,
) -> Vec<(String, String)> {
    let to = recipients
        .iter()
        .map(NormalizedNumber::as_str)
        .collect::<Vec<_>>()
        .join(",");

    let mut params = vec![
        (NormalizedNumber::FIELD.to_owned(), to),
        (MessageText::FIELD.to_owned(), message.as_str().to_owned()),
    ];
    if let Some(sender) = sender {
        params.push((SenderId::FIELD.to_owned(), sender.as_str().to_owned()));
    }
    params
}

pub fn decode_send_sms_json_response(json: &str) -> Result<SendSmsResponse, TransportError> {
    let parsed: SendSmsJsonResponse = serde_json::from_str(json)?;

    let recipients = parsed
        .data
        .recipients
        .into_iter()
        .map(|recipient| RecipientResult {
            number: recipient.number.trim().to_owned(),
            status: DeliveryStatus::parse(recipient.status.trim()),
            status_code: recipient.status_code.map(StatusCode::new),
            message_id: recipient.message_id.filter(|id| !id.trim().is_empty()),
            cost: recipient.cost,
        })
        .collect();

    Ok(SendSmsResponse {
        summary: parsed.data.message,
        recipients,
    })
}
