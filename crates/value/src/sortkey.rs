//! Sort keys for prefix range lookups.

use std::fmt;

/// A byte-ordered key. Not necessarily valid UTF-8.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey(Vec<u8>);

impl SortKey {
    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the key, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SortKey({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for SortKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Builds an exclusive upper bound from a string with a numeric suffix.
///
/// The trailing ASCII digits are parsed as a `u64`, incremented, and
/// appended to the non-numeric prefix as 8 big-endian bytes. Without
/// trailing digits the prefix is returned unchanged.
///
/// The increment wraps at `u64::MAX`; a digit run too long for `u64`
/// encodes as zero.
#[must_use]
pub fn sort_string_with_number(v: &str) -> SortKey {
    let prefix = v.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &v[prefix.len()..];

    let mut key = prefix.as_bytes().to_vec();
    if digits.is_empty() {
        return SortKey(key);
    }

    // Known boundary: a digit run longer than u64 encodes as zero, so its
    // key sorts below every shorter numeral with the same prefix.
    let next = digits.parse::<u64>().map_or(0, |n| n.wrapping_add(1));
    key.extend_from_slice(&next.to_be_bytes());
    SortKey(key)
}
