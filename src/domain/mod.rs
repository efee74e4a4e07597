//! Domain layer: strong types with validation and invariants (no I/O).

mod country;
mod outcome;
mod request;
mod response;
mod validation;
mod value;

pub use country::CountryProfile;
pub(crate) use outcome::add_cost;
pub use outcome::{BulkResult, SendOutcome, SendStatus};
pub use request::{
    BroadcastRequest, DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_MAX_RECIPIENTS, InputMode, Limits,
    PhoneNumbersInput,
};
pub use response::{DeliveryStatus, RecipientResult, SendSmsResponse};
pub use validation::ValidationError;
pub use value::{
    ApiKey, KnownStatusCode, MessageText, NormalizedNumber, SenderId, StatusCode,
    Username,
};
