use crate::{ProviderError, RangeProvider, Result};
use async_trait::async_trait;
use pwned_record::{format_range_text, Record};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::Arc;

const RECORD_QUANTITY: usize = 1009;

/// Passwords always injected into the mock dataset, with their leak counts.
const INCLUDED_PASSWORDS: &[(&str, u64)] = &[
    ("hello", 273_646),
    ("hello12345678901", 10),
    ("superstronger", 1),
    ("123_56789", 3),
];

fn sha1_hex(text: &str) -> String {
    let digest = Sha1::digest(text.as_bytes());
    hex::encode_upper(digest)
}

/// Deterministic mock range provider used by the mirror CLI's `--mocked`
/// flag and by the integration test suite. Reproduces the fixed
/// pseudo-random dataset of the original test harness exactly, so that
/// specific prefixes (and the known leaked passwords) always resolve to the
/// same records.
pub struct MockProvider {
    records: Vec<Record>,
    extra: HashMap<String, Vec<Record>>,
    fallback: Option<Arc<dyn RangeProvider>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_fallback(None)
    }

    pub fn with_fallback(fallback: Option<Arc<dyn RangeProvider>>) -> Self {
        let mut records: Vec<Record> = (0..RECORD_QUANTITY)
            .map(|index| {
                let suffix_source = sha1_hex(&(index * 397 + 124).to_string());
                let suffix = suffix_source[5..].to_owned();
                let count_digest = sha1_hex(&(index * 82 + 59).to_string());
                let first_nibble = count_digest.chars().next().unwrap();
                let count = first_nibble.to_digit(16).unwrap() as u64 + 1;
                Record::new(suffix, count)
            })
            .collect();
        records.sort_by(|a, b| a.to_string().cmp(&b.to_string()));

        let mut extra: HashMap<String, Vec<Record>> = HashMap::new();
        for (password, count) in INCLUDED_PASSWORDS {
            let full_hash = sha1_hex(password);
            let prefix = full_hash[..5].to_owned();
            let suffix = full_hash[5..].to_owned();
            extra
                .entry(prefix)
                .or_default()
                .push(Record::new(suffix, *count));
        }
        for records in extra.values_mut() {
            records.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        }

        Self {
            records,
            extra,
            fallback,
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RangeProvider for MockProvider {
    async fn get_range(&self, prefix: &str) -> Result<String> {
        let prefix = prefix.to_ascii_uppercase();
        if prefix == "00000" {
            return match &self.fallback {
                Some(fallback) => fallback.get_range(&prefix).await,
                None => Ok(String::new()),
            };
        }

        let n = u32::from_str_radix(&prefix, 16)
            .map_err(|_| ProviderError::Unavailable(format!("invalid mock prefix {prefix}")))?
            as u64;
        let offset = (n + 3234) % 54347 % ((RECORD_QUANTITY as u64 * 9 / 11) + 1) + 1;
        let amount = ((n + 2832) % 71203) % 8235 % 4 + 1;

        let start = (offset as usize).min(self.records.len());
        let end = (start + amount as usize).min(self.records.len());
        let mut selected: Vec<Record> = self.records[start..end].to_vec();

        if let Some(extra) = self.extra.get(&prefix) {
            selected.extend(extra.iter().cloned());
            selected.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        }

        Ok(format_range_text(&selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_leak_lookup() {
        let provider = MockProvider::new();
        let hello_hash = sha1_hex("hello");
        assert_eq!(&hello_hash[..5], "2AA60");
        let range = provider.get_range("2AA60").await.unwrap();
        assert!(range
            .lines()
            .any(|line| line == "A8FF7FCD473D321E0146AFD9E26DF395147:273646"));
    }

    #[tokio::test]
    async fn neighboring_prefix_has_no_injected_record() {
        let provider = MockProvider::new();
        let range = provider.get_range("2AA61").await.unwrap();
        assert!(!range.contains("273646"));
    }

    #[tokio::test]
    async fn prefix_00000_without_fallback_is_empty() {
        let provider = MockProvider::new();
        assert_eq!(provider.get_range("00000").await.unwrap(), "");
    }

    #[tokio::test]
    async fn amount_is_always_in_one_to_four() {
        let provider = MockProvider::new();
        for n in [0x00001u32, 0x12345, 0xABCDE, 0xFFFFE] {
            let prefix = format!("{n:05X}");
            let range = provider.get_range(&prefix).await.unwrap();
            let lines = range.lines().count();
            assert!((1..=8).contains(&lines), "{prefix} had {lines} lines");
        }
    }
}
