use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    TooLong { field: &'static str, max: usize, actual: usize },
    InvalidCountryProfile { field: &'static str, value: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max, actual } => {
                write!(f, "{field} is too long: {actual} characters (max {max})")
            }
            Self::InvalidCountryProfile { field, value } => {
                write!(f, "invalid country profile {field}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::ValidationError;

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::Empty { field: "message" };
        assert_eq!(err.to_string(), "message must not be empty");

        let err = ValidationError::TooLong {
            field: "from",
            max: 11,
            actual: 12,
        };
        assert_eq!(err.to_string(), "from is too long: 12 characters (max 11)");

        let err = ValidationError::InvalidCountryProfile {
            field: "country_code",
            value: "+2x".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid country profile country_code: \"+2x\""
        );
    }
}
