//! Wire format of the messaging endpoint: form fields out, JSON in.

mod cost;
mod send_sms;

pub use send_sms::{TransportError, decode_send_sms_json_response, encode_send_sms_form};
