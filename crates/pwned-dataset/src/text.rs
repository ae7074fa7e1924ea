//! Text-variant Dataset Layout: one `<PREFIX>.txt` file per prefix,
//! containing the verbatim (post-normalization) provider output.

use crate::{DatasetError, Result};
use std::path::Path;

fn prefix_file_path(dataset_dir: &Path, prefix: &str) -> std::path::PathBuf {
    dataset_dir.join(format!("{prefix}.txt"))
}

/// Writes one prefix's range body to its file, creating parent directories
/// as needed (the dataset directory itself is created up front by
/// [`crate::ensure_empty_dir`]).
pub async fn write_prefix(dataset_dir: &Path, prefix: &str, body: &str) -> Result<()> {
    let path = prefix_file_path(dataset_dir, prefix);
    tokio::fs::write(path, body).await?;
    Ok(())
}

/// Reads one prefix's range body. Missing or unreadable files surface as
/// [`DatasetError::Corrupted`] per the Reader contract.
pub async fn read_prefix(dataset_dir: &Path, prefix: &str) -> Result<String> {
    let path = prefix_file_path(dataset_dir, prefix);
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(body),
        Err(e) => Err(DatasetError::Corrupted(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_empty_body() {
        let tmp = tempfile::tempdir().unwrap();
        write_prefix(tmp.path(), "00000", "").await.unwrap();
        let body = read_prefix(tmp.path(), "00000").await.unwrap();
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn missing_file_is_corrupted() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_prefix(tmp.path(), "FFFFF").await.unwrap_err();
        assert!(matches!(err, DatasetError::Corrupted(_)));
    }
}
