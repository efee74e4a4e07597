//! Extraction of candidate phone-number strings from operator input.
//!
//! Nothing here validates numbers; every function returns raw tokens for
//! [`crate::numbers::NumberValidator`] to judge.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{CountryProfile, InputMode, PhoneNumbersInput};

/// Fewest digits a cell or text run must carry to be taken as a phone number.
pub const MIN_PHONE_DIGITS: usize = 9;

static PHONE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?[\d\s\-()]{9,}").expect("phone run regex compiles"));

/// Split on newlines, then commas. Tokens are trimmed, empty ones dropped;
/// order and duplicates are preserved.
pub fn parse_manual(text: &str) -> Vec<String> {
    text.lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Take the first phone-like cell of every CSV row (at most one number per row).
///
/// Rows may have any number of cells and there is no header handling: header cells
/// simply never look like phone numbers. If the content cannot be decoded as CSV
/// (for example invalid UTF-8), the partial result is discarded and every raw line is
/// scanned for its first run of digits, spaces, hyphens and parentheses instead.
pub fn parse_tabular(content: impl AsRef<[u8]>) -> Vec<String> {
    let bytes = content.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut numbers = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "tabular input is not valid CSV, scanning raw lines");
                return scan_lines(&String::from_utf8_lossy(bytes));
            }
        };
        if let Some(cell) = record
            .iter()
            .find(|cell| digit_count(cell) >= MIN_PHONE_DIGITS)
        {
            numbers.push(cell.to_owned());
        }
    }
    numbers
}

/// Resolve [`InputMode::Auto`] for a text field.
///
/// Delimited text (commas or newlines) is treated as a manual list when any line
/// starts with the profile's international prefix, and as CSV otherwise.
/// Undelimited text is a single number. Explicit modes are returned unchanged.
pub fn detect_mode(text: &str, mode: InputMode, profile: &CountryProfile) -> InputMode {
    if mode != InputMode::Auto {
        return mode;
    }
    if !text.contains(',') && !text.contains('\n') {
        return InputMode::Single;
    }
    let prefix = profile.international_prefix();
    if text.lines().any(|line| line.trim().starts_with(&prefix)) {
        InputMode::Manual
    } else {
        InputMode::Tabular
    }
}

/// Turn a request's recipient field into raw tokens using `mode`.
pub fn parse_recipients(
    input: &PhoneNumbersInput,
    mode: InputMode,
    profile: &CountryProfile,
) -> Vec<String> {
    match input {
        PhoneNumbersInput::List(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
        PhoneNumbersInput::Text(text) => match detect_mode(text, mode, profile) {
            InputMode::Manual => parse_manual(text),
            InputMode::Tabular => parse_tabular(text),
            InputMode::Single | InputMode::Auto => {
                let single = text.trim();
                if single.is_empty() {
                    Vec::new()
                } else {
                    vec![single.to_owned()]
                }
            }
        },
    }
}

fn scan_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            PHONE_RUN
                .find_iter(line)
                .map(|run| run.as_str().trim())
                .find(|run| digit_count(run) >= MIN_PHONE_DIGITS)
                .map(str::to_owned)
        })
        .collect()
}

fn digit_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}
