//! Phone Number Value Object
//!
//! Mobile-money numbers in international form without the `+`
//! (e.g. `254712345678`). Local trunk-prefixed input (`0712 345 678`) is
//! rewritten to the configured country code.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize user input to `<country_code><subscriber>`
    ///
    /// Spaces, dashes and a leading `+` are dropped; a single leading `0`
    /// becomes `country_code`. The result must be all digits and exactly
    /// `country_code.len() + subscriber_digits` long.
    pub fn normalize(
        raw: &str,
        country_code: &str,
        subscriber_digits: usize,
    ) -> BoardResult<Self> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        let compact = compact.strip_prefix('+').unwrap_or(&compact);

        let normalized = match compact.strip_prefix('0') {
            Some(rest) => format!("{country_code}{rest}"),
            None => compact.to_string(),
        };

        if normalized.len() != country_code.len() + subscriber_digits
            || !normalized.starts_with(country_code)
            || !normalized.chars().all(|c| c.is_ascii_digit())
        {
            return Err(BoardError::InvalidPhone);
        }

        Ok(Self(normalized))
    }

    /// Rehydrate a stored, already-normalized number
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
