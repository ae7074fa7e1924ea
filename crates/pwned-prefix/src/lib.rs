#![forbid(unsafe_code)]

//! Conversions between the 5-hex-character Pwned prefix and its integer
//! index, and the generalized `index <-> zero-padded hex` mapping used
//! throughout the dataset layout (prefixes, and file-group codes).

use thiserror::Error;

/// Number of possible 5-hex-character prefixes: `16^5`.
pub const PWNED_PREFIX_CAPACITY: usize = 16usize.pow(5);
/// Length, in hex characters, of a Pwned prefix.
pub const PWNED_PREFIX_LENGTH: usize = 5;
/// Length, in hex characters, of a full SHA-1 hash.
pub const SHA1_HASH_LENGTH: usize = 40;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefixError {
    #[error("hash prefix must be {PWNED_PREFIX_LENGTH} hex characters, got {0:?}")]
    InvalidPrefix(String),
    #[error("index {index} does not fit in capacity {capacity}")]
    OutOfRange { index: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, PrefixError>;

/// Validates and normalizes a hash prefix to uppercase.
///
/// Fails with [`PrefixError::InvalidPrefix`] unless `text` is exactly
/// [`PWNED_PREFIX_LENGTH`] characters, each an ASCII hex digit.
pub fn normalize_prefix(text: &str) -> Result<String> {
    if text.chars().count() != PWNED_PREFIX_LENGTH || !text.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(PrefixError::InvalidPrefix(text.to_owned()));
    }
    Ok(text.to_ascii_uppercase())
}

/// Converts a validated prefix to its integer index in `[0, PWNED_PREFIX_CAPACITY)`.
pub fn prefix_to_index(text: &str) -> Result<usize> {
    let normalized = normalize_prefix(text)?;
    usize::from_str_radix(&normalized, 16).map_err(|_| PrefixError::InvalidPrefix(text.to_owned()))
}

/// Converts an index in `[0, capacity)` to its uppercase, zero-padded hex
/// form with the minimal width sufficient for `capacity - 1`.
pub fn index_to_prefix(index: usize, capacity: usize) -> Result<String> {
    if capacity == 0 || index >= capacity {
        return Err(PrefixError::OutOfRange { index, capacity });
    }
    let width = hex_code_width(capacity);
    Ok(format!("{index:0width$X}", width = width))
}

/// The number of hex digits needed to represent every index in `[0, capacity)`.
pub fn hex_code_width(capacity: usize) -> usize {
    let mut remaining = capacity.saturating_sub(1);
    let mut width = 0;
    while remaining > 0 {
        width += 1;
        remaining /= 16;
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_case() {
        assert_eq!(normalize_prefix("faded").unwrap(), "FADED");
        assert_eq!(normalize_prefix("FADED").unwrap(), "FADED");
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            prefix_to_index("FADE"),
            Err(PrefixError::InvalidPrefix("FADE".into()))
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(prefix_to_index("FADEG").is_err());
    }

    #[test]
    fn boundary_prefixes() {
        assert_eq!(prefix_to_index("00000").unwrap(), 0);
        assert_eq!(prefix_to_index("FFFFF").unwrap(), PWNED_PREFIX_CAPACITY - 1);
    }

    #[test]
    fn out_of_range_index() {
        assert!(index_to_prefix(PWNED_PREFIX_CAPACITY, PWNED_PREFIX_CAPACITY).is_err());
    }

    #[test]
    fn width_for_group_codes() {
        // 4096 groups -> 3 hex digit codes, matching the compact binary layout.
        assert_eq!(hex_code_width(4096), 3);
        assert_eq!(hex_code_width(1), 0);
    }

    proptest! {
        #[test]
        fn prefix_index_round_trip(i in 0usize..PWNED_PREFIX_CAPACITY) {
            let text = index_to_prefix(i, PWNED_PREFIX_CAPACITY).unwrap();
            prop_assert_eq!(prefix_to_index(&text).unwrap(), i);
        }
    }
}
