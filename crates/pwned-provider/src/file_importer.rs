use crate::{ProviderError, RangeProvider, Result};
use async_trait::async_trait;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Imports ranges from a single sorted bulk file whose lines are
/// `HASH40:COUNT\n`, ascending by `HASH40`. Uses byte-offset binary search
/// rather than loading the file into memory.
pub struct FileRangeImporter {
    path: PathBuf,
}

impl FileRangeImporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RangeProvider for FileRangeImporter {
    async fn get_range(&self, prefix: &str) -> Result<String> {
        let path = self.path.clone();
        let prefix = prefix.to_owned();
        tokio::task::spawn_blocking(move || import_range(&path, &prefix))
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
    }
}

fn import_range(path: &Path, prefix: &str) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let start_offset = find_prefix_offset(&mut reader, prefix, file_len)?;
    reader.seek(SeekFrom::Start(start_offset))?;
    if start_offset != 0 {
        let mut discard = String::new();
        reader.read_line(&mut discard)?;
    }

    let mut results = Vec::new();
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() || !line.starts_with(prefix) {
            break;
        }
        results.push(line[prefix.len()..].to_owned());
    }
    Ok(results.join("\n"))
}

/// Binary-searches for the byte offset of the first full line whose
/// 5-hex prefix is `>= prefix`.
fn find_prefix_offset(
    reader: &mut BufReader<std::fs::File>,
    prefix: &str,
    file_len: u64,
) -> Result<u64> {
    let (mut start, mut end) = (0u64, file_len);
    while start + 1 < end {
        let mid = (start + end) / 2;
        reader.seek(SeekFrom::Start(mid))?;
        let mut discard = String::new();
        reader.read_line(&mut discard)?; // skip possibly partial line

        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break; // reached EOF while searching
        }
        let line_prefix = &line[..prefix.len().min(line.len())];
        if line_prefix < prefix {
            start = mid;
        } else {
            end = mid;
        }
    }
    Ok(if start != 0 { end } else { start })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // 3 lines in prefix "00000", one in "00001", one in "FFFFF".
        writeln!(file, "00000AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA:1").unwrap();
        writeln!(file, "00000BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB:2").unwrap();
        writeln!(file, "00000CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC:3").unwrap();
        writeln!(file, "00001DDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD:4").unwrap();
        write!(file, "FFFFFEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE:5").unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn finds_matching_prefix_group() {
        let file = sample_file();
        let importer = FileRangeImporter::new(file.path());
        let range = importer.get_range("00000").await.unwrap();
        let lines: Vec<_> = range.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("AAAA"));
    }

    #[tokio::test]
    async fn first_prefix_of_file() {
        let file = sample_file();
        let importer = FileRangeImporter::new(file.path());
        let range = importer.get_range("00000").await.unwrap();
        assert!(range.contains("AAAA"));
    }

    #[tokio::test]
    async fn last_prefix_of_file_without_trailing_newline() {
        let file = sample_file();
        let importer = FileRangeImporter::new(file.path());
        let range = importer.get_range("FFFFF").await.unwrap();
        assert_eq!(range, "EEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE:5");
    }

    #[tokio::test]
    async fn neighboring_prefix_with_no_entries_is_empty() {
        let file = sample_file();
        let importer = FileRangeImporter::new(file.path());
        let range = importer.get_range("00002").await.unwrap();
        assert_eq!(range, "");
    }
}
