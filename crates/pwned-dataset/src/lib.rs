#![forbid(unsafe_code)]

//! On-disk Dataset Layout: one immutable snapshot of all 1,048,576 prefix
//! ranges, one file per prefix (text variant) or one file per file-group
//! (compact binary variant), plus the crash-safe Control File naming the
//! currently active dataset.

pub mod control;
#[cfg(feature = "binary-layout")]
pub mod group;
pub mod text;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset file is unreadable or corrupted: {0}")]
    Corrupted(String),
    #[cfg(feature = "binary-layout")]
    #[error(transparent)]
    Record(#[from] pwned_record::RecordError),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Identifies one of the two dataset slots an engine swaps between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetId {
    A,
    B,
}

impl DatasetId {
    pub fn other(self) -> Self {
        match self {
            DatasetId::A => DatasetId::B,
            DatasetId::B => DatasetId::A,
        }
    }

    /// Stable on-disk directory name, e.g. `hashes-a`.
    pub fn dir_name(self) -> &'static str {
        match self {
            DatasetId::A => "hashes-a",
            DatasetId::B => "hashes-b",
        }
    }

    /// Serialized control-file value, e.g. `"a"`.
    pub fn tag(self) -> &'static str {
        match self {
            DatasetId::A => "a",
            DatasetId::B => "b",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "a" => Some(DatasetId::A),
            "b" => Some(DatasetId::B),
            _ => None,
        }
    }
}

/// Directory path for a dataset under a resource root.
pub fn dataset_dir(resource_dir: &std::path::Path, id: DatasetId) -> std::path::PathBuf {
    resource_dir.join(id.dir_name())
}

/// Ensures `dir` exists and is empty, removing any stale contents from a
/// previous interrupted attempt.
pub async fn ensure_empty_dir(dir: &std::path::Path) -> Result<()> {
    if dir.exists() {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Best-effort removal of a dataset directory; errors are swallowed per the
/// propagation policy (purges never fail the caller).
pub async fn remove_dataset_best_effort(dir: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("best-effort removal of {} failed: {e}", dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_toggles() {
        assert_eq!(DatasetId::A.other(), DatasetId::B);
        assert_eq!(DatasetId::B.other(), DatasetId::A);
    }

    #[test]
    fn tags_round_trip() {
        for id in [DatasetId::A, DatasetId::B] {
            assert_eq!(DatasetId::from_tag(id.tag()), Some(id));
        }
    }

    #[tokio::test]
    async fn ensure_empty_dir_clears_stale_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("hashes-a");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("stale.txt"), b"old").await.unwrap();
        ensure_empty_dir(&dir).await.unwrap();
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
