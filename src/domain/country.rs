use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Numbering rules for the single market a broadcaster targets.
///
/// Invariants:
/// - `country_code` is 1..=3 ASCII digits,
/// - `trunk_prefix` is empty or ASCII digits,
/// - `local_length` is at least 2,
/// - `leading_digits` is a non-empty set of ASCII digits.
pub struct CountryProfile {
    country_code: String,
    trunk_prefix: String,
    local_length: usize,
    leading_digits: String,
}

impl CountryProfile {
    /// Create a validated profile.
    ///
    /// `local_length` counts the national significant number without the trunk prefix
    /// (9 for Ghana: `24 123 4567`).
    pub fn new(
        country_code: impl Into<String>,
        trunk_prefix: impl Into<String>,
        local_length: usize,
        leading_digits: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let country_code = country_code.into().trim().trim_start_matches('+').to_owned();
        if country_code.is_empty() || country_code.len() > 3 || !is_digits(&country_code) {
            return Err(ValidationError::InvalidCountryProfile {
                field: "country_code",
                value: country_code,
            });
        }

        let trunk_prefix = trunk_prefix.into().trim().to_owned();
        if !is_digits(&trunk_prefix) {
            return Err(ValidationError::InvalidCountryProfile {
                field: "trunk_prefix",
                value: trunk_prefix,
            });
        }

        if local_length < 2 {
            return Err(ValidationError::InvalidCountryProfile {
                field: "local_length",
                value: local_length.to_string(),
            });
        }

        let mut leading: Vec<char> = leading_digits
            .into()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .collect();
        leading.sort_unstable();
        leading.dedup();
        let leading_digits: String = leading.into_iter().collect();
        if leading_digits.is_empty() || !is_digits(&leading_digits) {
            return Err(ValidationError::InvalidCountryProfile {
                field: "leading_digits",
                value: leading_digits,
            });
        }

        Ok(Self {
            country_code,
            trunk_prefix,
            local_length,
            leading_digits,
        })
    }

    /// Ghana: `+233`, trunk `0`, nine local digits starting with 2..=5.
    pub fn ghana() -> Self {
        Self {
            country_code: "233".to_owned(),
            trunk_prefix: "0".to_owned(),
            local_length: 9,
            leading_digits: "2345".to_owned(),
        }
    }

    /// Country calling code digits, without `+`.
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// International prefix, `+` followed by the country code.
    pub fn international_prefix(&self) -> String {
        format!("+{}", self.country_code)
    }

    pub fn trunk_prefix(&self) -> &str {
        &self.trunk_prefix
    }

    pub fn local_length(&self) -> usize {
        self.local_length
    }

    /// Sorted, de-duplicated set of digits a local number may start with.
    pub fn leading_digits(&self) -> &str {
        &self.leading_digits
    }
}

impl Default for CountryProfile {
    fn default() -> Self {
        Self::ghana()
    }
}

fn is_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}
