//! Compact binary-variant Dataset Layout: one `<GROUP>.dat` file per
//! file-group, storing the concatenation of encoded records for every
//! prefix sharing that group's leading hex digits, in ascending prefix then
//! suffix order, searchable by on-disk binary search.
//!
//! Writer note: this layout assumes the Mirror Engine's worker partition
//! never splits one file-group across two workers (true whenever the
//! configured worker count and group count both evenly divide the prefix
//! capacity, which holds for the documented defaults of 64 workers / 4096
//! groups). Under that assumption each group file is produced by exactly
//! one worker, written once, and never reopened for append.

use crate::{DatasetError, Result};
use pwned_record::binary::RecordCodec;
use pwned_record::Record;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

fn group_file_path(dataset_dir: &Path, group_code: &str) -> PathBuf {
    dataset_dir.join(format!("{group_code}.dat"))
}

/// Accumulates encoded records for one worker's contiguous prefix range and
/// flushes each file-group once its leading prefixes are exhausted.
pub struct GroupDatasetWriter {
    dataset_dir: PathBuf,
    codec: RecordCodec,
    current_group: Option<String>,
    buffer: Vec<u8>,
}

impl GroupDatasetWriter {
    pub fn new(dataset_dir: impl Into<PathBuf>, codec: RecordCodec) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            codec,
            current_group: None,
            buffer: Vec::new(),
        }
    }

    /// Appends one prefix's already-parsed records to the writer, flushing
    /// the previous group's file when the group code changes.
    pub async fn write_prefix(&mut self, prefix: &str, records: &[Record]) -> Result<()> {
        let group_code = prefix[..self.codec.dropped_prefix_length()].to_owned();
        if self.current_group.as_deref() != Some(group_code.as_str()) {
            self.flush().await?;
            self.current_group = Some(group_code);
        }
        for record in records {
            self.buffer
                .extend(self.codec.encode(record, prefix).map_err(DatasetError::from)?);
        }
        Ok(())
    }

    /// Flushes any buffered group to disk. Must be called once after the
    /// worker's last prefix.
    pub async fn flush(&mut self) -> Result<()> {
        if let Some(group_code) = self.current_group.take() {
            let path = group_file_path(&self.dataset_dir, &group_code);
            let buffer = std::mem::take(&mut self.buffer);
            tokio::fs::write(path, buffer).await?;
        } else {
            self.buffer.clear();
        }
        Ok(())
    }
}

/// Binary-searches one file-group for a (possibly narrower) hash prefix and
/// returns its matching records as a formatted range body.
pub async fn read_prefix(
    dataset_dir: &Path,
    codec: &RecordCodec,
    prefix: &str,
) -> Result<String> {
    let group_code = prefix[..codec.dropped_prefix_length()].to_owned();
    let path = group_file_path(dataset_dir, &group_code);
    let codec = *codec;
    let prefix = prefix.to_owned();
    tokio::task::spawn_blocking(move || search_group_file(&path, &codec, &prefix, &group_code))
        .await
        .map_err(|e| DatasetError::Corrupted(e.to_string()))?
}

fn search_group_file(
    path: &Path,
    codec: &RecordCodec,
    prefix: &str,
    group_code: &str,
) -> Result<String> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => return Err(DatasetError::Corrupted(format!("{}: {e}", path.display()))),
    };
    let file_len = file
        .metadata()
        .map_err(|e| DatasetError::Corrupted(e.to_string()))?
        .len();
    let record_size = codec.record_size() as u64;
    let total_records = if record_size == 0 {
        0
    } else {
        file_len / record_size
    };

    let desired_bytes = codec
        .desired_prefix_bytes(prefix)
        .map_err(DatasetError::from)?;
    let mask_last_nibble = codec.has_odd_search_prefix(prefix);

    let left = find_boundary(
        &mut file,
        record_size,
        total_records,
        &desired_bytes,
        mask_last_nibble,
        false,
    )?;
    let right = find_boundary(
        &mut file,
        record_size,
        total_records,
        &desired_bytes,
        mask_last_nibble,
        true,
    )?;

    let mut rows = Vec::with_capacity((right - left) as usize);
    for index in left..right {
        file.seek(SeekFrom::Start(index * record_size))
            .map_err(|e| DatasetError::Corrupted(e.to_string()))?;
        let mut buf = vec![0u8; record_size as usize];
        file.read_exact(&mut buf)
            .map_err(|e| DatasetError::Corrupted(e.to_string()))?;
        let record = codec.decode(&buf, group_code).map_err(DatasetError::from)?;
        rows.push(record.to_string());
    }
    Ok(rows.join("\n"))
}

/// Half-open `[left, right)` boundary search. `inclusive` selects the right
/// boundary (`<=`) versus the left boundary (`<`).
fn find_boundary(
    file: &mut std::fs::File,
    record_size: u64,
    total_records: u64,
    desired: &[u8],
    mask_last_nibble: bool,
    inclusive: bool,
) -> Result<u64> {
    let (mut left, mut right) = (0u64, total_records);
    while left < right {
        let mid = left + (right - left) / 2;
        file.seek(SeekFrom::Start(mid * record_size))
            .map_err(|e| DatasetError::Corrupted(e.to_string()))?;
        let mut beginning = vec![0u8; desired.len()];
        file.read_exact(&mut beginning)
            .map_err(|e| DatasetError::Corrupted(e.to_string()))?;
        if mask_last_nibble {
            if let Some(last) = beginning.last_mut() {
                *last &= 0xF0;
            }
        }
        let shift_left = if inclusive {
            beginning.as_slice() <= desired
        } else {
            beginning.as_slice() < desired
        };
        if shift_left {
            left = mid + 1;
        } else {
            right = mid;
        }
    }
    Ok(left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwned_record::binary::CountByteWidth;

    #[tokio::test]
    async fn writer_and_reader_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let codec = RecordCodec::new(3, CountByteWidth::Four);
        let mut writer = GroupDatasetWriter::new(tmp.path(), codec);

        writer
            .write_prefix("2AA60", &[Record::new("A8FF7FCD473D321E0146AFD9E26DF395147", 273646)])
            .await
            .unwrap();
        writer
            .write_prefix("2AA61", &[Record::new("B000000000000000000000000000000000", 1)])
            .await
            .unwrap();
        writer.flush().await.unwrap();

        let range = read_prefix(tmp.path(), &codec, "2AA60").await.unwrap();
        assert_eq!(range, "A8FF7FCD473D321E0146AFD9E26DF395147:273646");

        let range = read_prefix(tmp.path(), &codec, "2AA61").await.unwrap();
        assert_eq!(range, "B000000000000000000000000000000000:1");
    }

    #[tokio::test]
    async fn empty_group_file_yields_empty_range() {
        let tmp = tempfile::tempdir().unwrap();
        let codec = RecordCodec::new(3, CountByteWidth::Four);
        tokio::fs::write(tmp.path().join("2AA.dat"), b"").await.unwrap();
        let range = read_prefix(tmp.path(), &codec, "2AA99").await.unwrap();
        assert_eq!(range, "");
    }
}
