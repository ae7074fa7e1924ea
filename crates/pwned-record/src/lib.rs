#![forbid(unsafe_code)]

//! Text and (optionally) compact binary codecs for Pwned password leak
//! records.
//!
//! A record pairs a 35-hex-character SHA-1 suffix with a non-negative leak
//! count. The text form, `SUFFIX35:COUNT`, is what upstream providers
//! return; records of one prefix are joined by a single `\n` with no
//! trailing newline.

use pwned_prefix::PWNED_PREFIX_LENGTH;
use thiserror::Error;

#[cfg(feature = "binary-layout")]
pub mod binary;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("malformed record row: {0:?}")]
    Malformed(String),
    #[cfg(feature = "binary-layout")]
    #[error("record byte buffer has length {actual}, expected {expected}")]
    WrongSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, RecordError>;

/// One Pwned password leak record: a 35-hex suffix and its leak count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub suffix: String,
    pub count: u64,
}

impl Record {
    pub fn new(suffix: impl Into<String>, count: u64) -> Self {
        Self {
            suffix: suffix.into(),
            count,
        }
    }

    /// Parses one `SUFFIX35:COUNT` row.
    pub fn parse(row: &str) -> Result<Self> {
        let (suffix, count) = row
            .split_once(':')
            .ok_or_else(|| RecordError::Malformed(row.to_owned()))?;
        let count: u64 = count
            .parse()
            .map_err(|_| RecordError::Malformed(row.to_owned()))?;
        Ok(Record::new(suffix.to_ascii_uppercase(), count))
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.suffix, self.count)
    }
}

/// Parses a range body (possibly empty) into its ordered records.
///
/// Accepts either `\n`- or `\r\n`-separated input; callers that already
/// normalized line endings (as [`pwned-provider`] does) pay nothing extra.
pub fn parse_range_text(text: &str) -> Result<Vec<Record>> {
    text.replace("\r\n", "\n")
        .lines()
        .filter(|line| !line.is_empty())
        .map(Record::parse)
        .collect()
}

/// Joins records back into the canonical range body: `\n`-separated, no
/// trailing newline.
pub fn format_range_text(records: &[Record]) -> String {
    records
        .iter()
        .map(Record::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full length, in hex characters, of a SHA-1 hash.
pub const SHA1_HEX_LENGTH: usize = pwned_prefix::SHA1_HASH_LENGTH;
/// Length of the record suffix portion in hex characters.
pub const SUFFIX_HEX_LENGTH: usize = SHA1_HEX_LENGTH - PWNED_PREFIX_LENGTH;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_round_trip() {
        let text = "A8FF7FCD473D321E0146AFD9E26DF395147:273646\n0000000000000000000000000000000000:1";
        let records = parse_range_text(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].count, 273646);
        assert_eq!(format_range_text(&records), text);
    }

    #[test]
    fn normalizes_crlf() {
        let text = "A8FF7FCD473D321E0146AFD9E26DF395147:273646\r\n0000000000000000000000000000000000:1";
        let records = parse_range_text(text).unwrap();
        assert_eq!(
            records,
            vec![
                Record::new("A8FF7FCD473D321E0146AFD9E26DF395147", 273646),
                Record::new("0000000000000000000000000000000000", 1),
            ]
        );
    }

    #[test]
    fn empty_range_round_trips_to_empty_string() {
        assert_eq!(parse_range_text("").unwrap(), vec![]);
        assert_eq!(format_range_text(&[]), "");
    }

    #[test]
    fn rejects_malformed_row() {
        assert!(Record::parse("not-a-record").is_err());
    }
}
