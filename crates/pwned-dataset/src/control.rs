//! The Control File: a small persisted record naming the currently active
//! dataset and a torn-write flag. Written in two phases around any change
//! to the active dataset so a crash mid-swap never leaves a stale pointer.

use crate::{DatasetId, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ControlFileDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    ignore: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

pub fn state_file_path(resource_dir: &Path) -> std::path::PathBuf {
    resource_dir.join(STATE_FILE_NAME)
}

/// Loads the currently active dataset, per the load rule: a missing,
/// unparseable, non-object, or `ignore: true` file all yield "no active
/// dataset".
pub async fn load_active_dataset(resource_dir: &Path) -> Option<DatasetId> {
    let path = state_file_path(resource_dir);
    let contents = tokio::fs::read_to_string(&path).await.ok()?;
    let doc: ControlFileDocument = serde_json::from_str(&contents).ok()?;
    if doc.ignore {
        return None;
    }
    doc.dataset.as_deref().and_then(DatasetId::from_tag)
}

/// Writes the control file. Pass `dataset = None` only together with
/// `ignore = true` (the first phase of the swap); the second phase always
/// names the new dataset with `ignore = false`.
pub async fn write_control_file(
    resource_dir: &Path,
    dataset: Option<DatasetId>,
    ignore: bool,
) -> Result<()> {
    let doc = ControlFileDocument {
        dataset: dataset.map(|d| d.tag().to_owned()),
        ignore,
    };
    let contents = serde_json::to_string(&doc).expect("control file document always serializes");
    let path = state_file_path(resource_dir);
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_has_no_active_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(load_active_dataset(tmp.path()).await, None);
    }

    #[tokio::test]
    async fn round_trips_active_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        write_control_file(tmp.path(), Some(DatasetId::A), false)
            .await
            .unwrap();
        assert_eq!(load_active_dataset(tmp.path()).await, Some(DatasetId::A));
        let raw = tokio::fs::read_to_string(state_file_path(tmp.path()))
            .await
            .unwrap();
        assert_eq!(raw, r#"{"dataset":"a"}"#);
    }

    #[tokio::test]
    async fn torn_write_is_treated_as_no_active_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        write_control_file(tmp.path(), Some(DatasetId::A), false)
            .await
            .unwrap();
        // Simulate a crash between the two swap-write phases: only the
        // ignore=true marker made it to disk.
        write_control_file(tmp.path(), None, true).await.unwrap();
        assert_eq!(load_active_dataset(tmp.path()).await, None);
    }

    #[tokio::test]
    async fn unparseable_file_is_treated_as_no_active_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(state_file_path(tmp.path()), b"not json")
            .await
            .unwrap();
        assert_eq!(load_active_dataset(tmp.path()).await, None);
    }

    #[tokio::test]
    async fn non_object_json_is_treated_as_no_active_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(state_file_path(tmp.path()), b"[1,2,3]")
            .await
            .unwrap();
        assert_eq!(load_active_dataset(tmp.path()).await, None);
    }
}
