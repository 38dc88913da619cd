//! Proposal serial numbers.
//!
//! A serial number is the human-readable identifier stamped on a proposal at
//! submission: `<prefix><year>-<zero-padded sequence>`, e.g. `CW2026-0041`.
//! The sequence itself is allocated by the store's atomic per-year counter
//! (see [`crate::store::ProposalStore::next_serial_seq`]); this module only
//! owns the formatting and parsing.

use serde::{Deserialize, Serialize};

/// A formatted proposal serial number.
///
/// Immutable once assigned and unique across all proposals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Formats a serial number from its parts.
    ///
    /// `pad_width` is the minimum digit count of the sequence component;
    /// sequences wider than the pad are rendered unpadded rather than
    /// truncated.
    #[must_use]
    pub fn format(prefix: &str, year: i32, seq: u64, pad_width: usize) -> Self {
        Self(format!("{prefix}{year}-{seq:0pad_width$}"))
    }

    /// Returns the serial number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the creation year, if the serial matches the
    /// `<prefix><year>-<seq>` shape with a four-digit year.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        let (head, _) = self.0.split_once('-')?;
        head.get(head.len().checked_sub(4)?..)?.parse().ok()
    }

    /// Extracts the sequence component, if present.
    #[must_use]
    pub fn seq(&self) -> Option<u64> {
        let (_, tail) = self.0.split_once('-')?;
        tail.parse().ok()
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SerialNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}
