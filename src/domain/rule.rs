use std::sync::LazyLock;

use regex::Regex;

use crate::domain::validation::ValidationError;

/// Everything that is not a digit or `+`.
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d+]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
/// Recipient format check applied at the request boundary.
///
/// Input is normalized first (everything except digits and `+` is dropped), then it must read
/// `+<country code><mobile prefix><subscriber digits>` with a fixed national length. Spaces,
/// dashes, dots and parentheses therefore never change the verdict.
pub struct RecipientRule {
    country_code: String,
    mobile_prefix: char,
    national_digits: usize,
}

impl RecipientRule {
    /// Nepal mobile numbers: `+977` followed by ten digits starting with `9`.
    pub const NEPAL_COUNTRY_CODE: u16 = 977;

    /// Build a rule for `+<country_code>` numbers whose national part has `national_digits`
    /// digits and starts with `mobile_prefix`.
    ///
    /// Returns `None` when `mobile_prefix` is not a single decimal digit.
    pub fn new(country_code: u16, mobile_prefix: u8, national_digits: usize) -> Option<Self> {
        let mobile_prefix = char::from_digit(u32::from(mobile_prefix), 10)?;
        Some(Self {
            country_code: country_code.to_string(),
            mobile_prefix,
            national_digits,
        })
    }

    pub fn nepal() -> Self {
        Self {
            country_code: Self::NEPAL_COUNTRY_CODE.to_string(),
            mobile_prefix: '9',
            national_digits: 10,
        }
    }

    /// Strip human punctuation, keeping digits and `+`.
    pub fn normalize(input: &str) -> String {
        PUNCTUATION.replace_all(input, "").into_owned()
    }

    pub fn is_valid(&self, input: &str) -> bool {
        self.check(input).is_ok()
    }

    /// Validate and return the canonical (normalized) form.
    pub fn check(&self, input: &str) -> Result<String, ValidationError> {
        let normalized = Self::normalize(input);
        let invalid = || ValidationError::InvalidPhoneNumber {
            input: input.to_owned(),
        };

        let national = normalized
            .strip_prefix('+')
            .and_then(|rest| rest.strip_prefix(self.country_code.as_str()))
            .ok_or_else(invalid)?;

        if national.len() != self.national_digits
            || !national.starts_with(self.mobile_prefix)
            || !national.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        Ok(normalized)
    }

    /// Message shown to users when a recipient is rejected.
    pub fn message(&self, attribute: &str) -> String {
        format!(
            "The {attribute} must be a valid mobile phone number starting with +{} followed by {} digits beginning with {}.",
            self.country_code, self.national_digits, self.mobile_prefix
        )
    }
}

impl Default for RecipientRule {
    fn default() -> Self {
        Self::nepal()
    }
}
