use serde::Deserializer;
use serde::de::{Deserialize, Error as DeError};
use serde_json::value::RawValue;

/// `cost` arrives as `"KES 0.8000"`, as a bare JSON number, or as `null`.
///
/// The text is kept as sent: a string loses only its quotes and a number keeps its
/// exact token, so `0.80` is not reformatted to `0.8`.
pub(super) fn deserialize_cost<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    let token = raw.get().trim();

    match token.as_bytes().first() {
        Some(b'"') => {
            let text: String = serde_json::from_str(token).map_err(D::Error::custom)?;
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_owned()))
        }
        Some(b'-' | b'0'..=b'9') => Ok(Some(token.to_owned())),
        _ if token == "null" => Ok(None),
        _ => Err(D::Error::custom("cost must be a string, a number or null")),
    }
}
