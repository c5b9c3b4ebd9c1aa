// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-temp-then-rename persistence, grounded on the teacher's
//! `credential::persist` helper. Used by every durable document in this
//! crate (`state.json`, the project registry, the agent registry) so a
//! crash between "begin write" and "rename" always leaves the previous
//! snapshot intact (spec invariant 6).

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

/// Serialize `value` and atomically replace the file at `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and parse a JSON document. Returns `Ok(None)` if the file is
/// absent (first run); returns `Err` on a parse failure so the caller can
/// decide how to recover (see `store::project_store`'s corrupted-state
/// handling).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rename a corrupted file aside with a timestamp suffix so the error
/// path never silently discards data the operator might want to inspect.
pub fn quarantine(path: &Path, now_compact: &str) -> anyhow::Result<()> {
    if path.exists() {
        let quarantined = path.with_file_name(format!(
            "{}.corrupt-{now_compact}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("state.json")
        ));
        std::fs::rename(path, quarantined)?;
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("state");
    path.with_file_name(format!("{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        n: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/doc.json");
        write_json(&path, &Doc { n: 7 }).unwrap();
        let back: Option<Doc> = read_json(&path).unwrap();
        assert_eq!(back, Some(Doc { n: 7 }));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let back: Option<Doc> = read_json(&path).unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn no_tmp_file_left_behind_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json(&path, &Doc { n: 1 }).unwrap();
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn quarantine_moves_aside_without_losing_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        quarantine(&path, "20260101T000000Z").unwrap();
        assert!(!path.exists());
        assert!(dir.path().join("state.json.corrupt-20260101T000000Z").exists());
    }
}
