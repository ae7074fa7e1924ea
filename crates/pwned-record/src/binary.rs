//! Compact packed-binary record codec, used by the compact Dataset Layout
//! variant to support on-disk binary search across file-group files.
//!
//! Grounded on the original `PwnedRecordConverter`: given a dropped-prefix
//! length `D` (the file-group code width) and a count byte width `W`, a
//! record is stored as `hex_bytes || count_bytes`, where `hex_bytes` is the
//! remaining `40 - D` hex nibbles of the full hash (right-padded with one
//! zero nibble if that length is odd) and `count_bytes` is the leak count
//! clamped to `2^(8W) - 1` and serialized little-endian in `W` bytes.

use crate::{Record, RecordError, Result, SHA1_HEX_LENGTH};
use pwned_prefix::PWNED_PREFIX_LENGTH;

/// Valid widths for the little-endian count field, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountByteWidth {
    One = 1,
    Two = 2,
    Four = 4,
}

impl CountByteWidth {
    fn bytes(self) -> usize {
        self as usize
    }

    fn max_value(self) -> u64 {
        match self {
            CountByteWidth::One => u8::MAX as u64,
            CountByteWidth::Two => u16::MAX as u64,
            CountByteWidth::Four => u32::MAX as u64,
        }
    }
}

/// Encodes and decodes records for one file-group configuration.
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    dropped_prefix_length: usize,
    count_width: CountByteWidth,
    stored_suffix_odd: bool,
    stored_suffix_bytes: usize,
}

impl RecordCodec {
    pub fn new(dropped_prefix_length: usize, count_width: CountByteWidth) -> Self {
        assert!(dropped_prefix_length <= PWNED_PREFIX_LENGTH);
        let remaining_hex = SHA1_HEX_LENGTH - dropped_prefix_length;
        Self {
            dropped_prefix_length,
            count_width,
            stored_suffix_odd: remaining_hex % 2 != 0,
            stored_suffix_bytes: remaining_hex.div_ceil(2),
        }
    }

    pub fn dropped_prefix_length(&self) -> usize {
        self.dropped_prefix_length
    }

    /// Total on-disk width of one encoded record, in bytes.
    pub fn record_size(&self) -> usize {
        self.stored_suffix_bytes + self.count_width.bytes()
    }

    /// Encodes one record given its text form and the full 5-hex prefix it
    /// was returned under.
    pub fn encode(&self, record: &Record, full_prefix: &str) -> Result<Vec<u8>> {
        let full_hex = format!("{full_prefix}{}", record.suffix);
        let mut remaining = full_hex[self.dropped_prefix_length..].to_owned();
        if remaining.len() % 2 != 0 {
            remaining.push('0');
        }
        let hash_bytes = hex::decode(&remaining)
            .map_err(|_| RecordError::Malformed(record.to_string()))?;
        let count = record.count.min(self.count_width.max_value());
        let mut count_bytes = count.to_le_bytes()[..self.count_width.bytes()].to_vec();
        let mut out = hash_bytes;
        out.append(&mut count_bytes);
        Ok(out)
    }

    /// Decodes one record, given the file-group code it was stored under
    /// (the dropped prefix), back into its text form (`SUFFIX35:COUNT`).
    pub fn decode(&self, bytes: &[u8], group_code: &str) -> Result<Record> {
        if bytes.len() != self.record_size() {
            return Err(RecordError::WrongSize {
                expected: self.record_size(),
                actual: bytes.len(),
            });
        }
        let (hash_bytes, count_bytes) = bytes.split_at(self.stored_suffix_bytes);
        let mut hex_hash = hex::encode_upper(hash_bytes);
        if self.stored_suffix_odd {
            hex_hash.pop();
        }
        let mut count_buf = [0u8; 8];
        count_buf[..count_bytes.len()].copy_from_slice(count_bytes);
        let count = u64::from_le_bytes(count_buf);

        let full_hash = format!("{group_code}{hex_hash}");
        let suffix = full_hash[PWNED_PREFIX_LENGTH..].to_owned();
        Ok(Record::new(suffix, count))
    }

    /// Whether the *desired* search prefix (longer than the group code)
    /// leaves an odd number of hex nibbles once the group code is dropped —
    /// used by the binary-search boundary comparison to mask the trailing
    /// nibble of the in-memory key before comparing.
    pub fn has_odd_search_prefix(&self, full_desired_prefix: &str) -> bool {
        (full_desired_prefix.len() - self.dropped_prefix_length) % 2 != 0
    }

    /// The desired search prefix, re-encoded as the bytes a stored record's
    /// leading bytes would need to match (or exceed, for a right boundary).
    pub fn desired_prefix_bytes(&self, full_desired_prefix: &str) -> Result<Vec<u8>> {
        let mut stripped = full_desired_prefix[self.dropped_prefix_length..].to_owned();
        if stripped.len() % 2 != 0 {
            stripped.push('0');
        }
        hex::decode(&stripped).map_err(|_| RecordError::Malformed(full_desired_prefix.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> RecordCodec {
        RecordCodec::new(3, CountByteWidth::Four)
    }

    #[test]
    fn round_trips_suffix_and_count() {
        let codec = codec();
        let full_prefix = "2AA60";
        let record = Record::new("A8FF7FCD473D321E0146AFD9E26DF395147", 273646);
        let bytes = codec.encode(&record, full_prefix).unwrap();
        assert_eq!(bytes.len(), codec.record_size());
        let group_code = &full_prefix[..codec.dropped_prefix_length()];
        let decoded = codec.decode(&bytes, group_code).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn clamps_count_to_width() {
        let codec = RecordCodec::new(3, CountByteWidth::One);
        let record = Record::new("A8FF7FCD473D321E0146AFD9E26DF395147", 9999);
        let bytes = codec.encode(&record, "2AA60").unwrap();
        let decoded = codec.decode(&bytes, "2AA").unwrap();
        assert_eq!(decoded.count, u8::MAX as u64);
    }

    #[test]
    fn wrong_size_buffer_is_rejected() {
        let codec = codec();
        assert!(codec.decode(&[0u8; 3], "2AA").is_err());
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            suffix_seed in 0u64..u64::MAX,
            count in 0u64..=u32::MAX as u64,
        ) {
            let codec = RecordCodec::new(3, CountByteWidth::Four);
            let suffix = format!("{suffix_seed:035X}");
            let record = Record::new(suffix, count);
            let bytes = codec.encode(&record, "ABCDE").unwrap();
            let decoded = codec.decode(&bytes, "ABC").unwrap();
            prop_assert_eq!(decoded, record);
        }
    }
}
