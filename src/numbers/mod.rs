//! Phone-number normalization and validation for a single [`CountryProfile`].

use std::collections::HashSet;

use crate::domain::{CountryProfile, NormalizedNumber};

/// Valid/invalid split of a batch, both halves in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Normalized form of every accepted input.
    pub valid: Vec<NormalizedNumber>,
    /// Rejected inputs exactly as the operator typed them.
    pub invalid: Vec<String>,
}

/// Normalizes raw numbers into `+<cc><local>` form and checks them against the
/// profile's canonical pattern `^\+<cc>[<leading>]\d{local_length - 1}$`.
#[derive(Debug, Clone, Default)]
pub struct NumberValidator {
    profile: CountryProfile,
}

impl NumberValidator {
    pub fn new(profile: CountryProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CountryProfile {
        &self.profile
    }

    /// The canonical pattern, rendered as a regular expression for diagnostics.
    pub fn pattern(&self) -> String {
        format!(
            r"^\+{}[{}]\d{{{}}}$",
            self.profile.country_code(),
            self.profile.leading_digits(),
            self.profile.local_length() - 1
        )
    }

    /// Rewrite `raw` into canonical form where the profile rules allow it.
    ///
    /// Never fails: inputs that cannot be rewritten come back cleaned but otherwise
    /// unchanged, and are rejected later by [`NumberValidator::is_valid`].
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = clean(raw);
        if cleaned.is_empty() {
            return cleaned;
        }

        let country_code = self.profile.country_code();
        let trunk_prefix = self.profile.trunk_prefix();

        if !trunk_prefix.is_empty() {
            if let Some(rest) = cleaned.strip_prefix(trunk_prefix) {
                return format!("+{country_code}{rest}");
            }
        }
        if cleaned.starts_with(country_code) {
            return format!("+{cleaned}");
        }
        if !cleaned.starts_with('+') && cleaned.len() == self.profile.local_length() {
            return format!("+{country_code}{cleaned}");
        }
        cleaned
    }

    /// Check an already-normalized number against the canonical pattern.
    pub fn is_valid(&self, number: &str) -> bool {
        let Some(rest) = number.strip_prefix('+') else {
            return false;
        };
        let Some(local) = rest.strip_prefix(self.profile.country_code()) else {
            return false;
        };
        let mut digits = local.chars();
        let Some(first) = digits.next() else {
            return false;
        };
        self.profile.leading_digits().contains(first)
            && local.len() == self.profile.local_length()
            && digits.all(|c| c.is_ascii_digit())
    }

    /// Normalize one raw input and keep it only if it validates.
    pub fn parse(&self, raw: &str) -> Option<NormalizedNumber> {
        let normalized = self.normalize(raw);
        self.is_valid(&normalized)
            .then(|| NormalizedNumber::from_validated(normalized))
    }

    /// Split a batch into normalized valid numbers and original invalid inputs.
    ///
    /// Blank entries carry no recipient and are skipped. Duplicates are kept.
    pub fn validate<S: AsRef<str>>(&self, numbers: &[S]) -> Partition {
        let mut partition = Partition::default();
        for number in numbers {
            let number = number.as_ref();
            if number.trim().is_empty() {
                continue;
            }
            match self.parse(number) {
                Some(valid) => partition.valid.push(valid),
                None => partition.invalid.push(number.to_owned()),
            }
        }
        partition
    }
}

/// Keep the first occurrence of every number. Returns the number of repeats removed.
pub fn dedup_numbers(numbers: &mut Vec<NormalizedNumber>) -> usize {
    let before = numbers.len();
    let mut seen = HashSet::with_capacity(before);
    numbers.retain(|number| seen.insert(number.clone()));
    before - numbers.len()
}

/// Render a number in international format for operator-facing output.
///
/// Inputs the `phonenumber` crate cannot parse are returned unchanged.
pub fn format_for_display(number: &str) -> String {
    match phonenumber::parse(None, number) {
        Ok(parsed) => phonenumber::format(&parsed)
            .mode(phonenumber::Mode::International)
            .to_string(),
        Err(_) => number.to_owned(),
    }
}

/// Digits only, plus `+` when it precedes the first digit.
fn clean(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '+' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }
    if cleaned == "+" {
        cleaned.clear();
    }
    cleaned
}
