//! On-disk state helpers shared by every crate that persists JSON, JSONL, or
//! plain-text state files outside process memory.
//!
//! Per §9 Open Question 4, transcript and state paths are sometimes reported
//! tilde-prefixed and sometimes absolute; [`expand_path`] is the single
//! choke point every crate routes file paths through before doing I/O.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rotate a JSONL log once it exceeds this many bytes.
pub const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
/// How many rotated predecessors to keep (`.1`, `.2`, ...).
pub const ROTATE_KEEP: u32 = 2;

/// Expand a leading `~` or `~/` to the user's home directory. Paths without
/// a leading `~` are returned unchanged.
pub fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

/// Resolve the daemon's state directory, defaulting to `~/.hearth`.
pub fn state_dir(override_dir: Option<&str>) -> PathBuf {
    let raw = override_dir.unwrap_or("~/.hearth");
    PathBuf::from(expand_path(raw))
}

/// Append one JSON-serializable record as a line to `path`, creating parent
/// directories as needed and rotating the file first if it has grown past
/// [`ROTATE_AT_BYTES`].
pub fn append_jsonl<T: serde::Serialize>(path: &Path, record: &T) -> crate::error::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_if_oversized(path)?;

    let line = serde_json::to_string(record)?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

fn rotate_if_oversized(path: &Path) -> crate::error::Result<()> {
    let len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(()),
    };
    if len < ROTATE_AT_BYTES {
        return Ok(());
    }

    for gen in (1..ROTATE_KEEP).rev() {
        let from = rotated_path(path, gen);
        let to = rotated_path(path, gen + 1);
        if from.exists() {
            let _ = fs::rename(&from, &to);
        }
    }
    let first = rotated_path(path, 1);
    fs::rename(path, first)?;
    Ok(())
}

fn rotated_path(path: &Path, gen: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{gen}"));
    PathBuf::from(name)
}

/// Read a persisted JSON state file, tolerating absence (returns `default`)
/// but treating malformed content as [`crate::error::HearthError::StateCorruption`].
///
/// On corruption the caller is expected to rename the offending file aside
/// (`quarantine_corrupt_file`) and proceed with defaults, per §7's
/// StateCorruption policy.
pub fn read_json_state<T: serde::de::DeserializeOwned>(
    path: &Path,
    default: T,
) -> crate::error::Result<T> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
            crate::error::HearthError::StateCorruption {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default),
        Err(e) => Err(e.into()),
    }
}

/// Rename a corrupted state file aside with a `.bad.<timestamp>` suffix so a
/// fresh default can take its place, per §7's StateCorruption policy.
pub fn quarantine_corrupt_file(path: &Path) -> crate::error::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let timestamp = chrono::Utc::now().timestamp();
    let mut quarantined = path.as_os_str().to_owned();
    quarantined.push(format!(".bad.{timestamp}"));
    fs::rename(path, PathBuf::from(quarantined))?;
    Ok(())
}

/// Write a JSON state file atomically: write to a sibling `.tmp` file, then
/// rename over the target so readers never observe a partial write.
pub fn write_json_state_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> crate::error::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let body = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn expand_path_resolves_tilde() {
        let home = std::env::var("HOME").unwrap_or_default();
        let expanded = expand_path("~/.hearth/hearth.toml");
        assert!(expanded.starts_with(&home));
    }

    #[test]
    fn append_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delivery.jsonl");
        append_jsonl(&path, &Sample { n: 1 }).unwrap();
        append_jsonl(&path, &Sample { n: 2 }).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn missing_state_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let value: Sample = read_json_state(&path, Sample { n: 7 }).unwrap();
        assert_eq!(value, Sample { n: 7 });
    }

    #[test]
    fn corrupt_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_json_state::<Sample>(&path, Sample { n: 0 }).unwrap_err();
        assert_eq!(err.code(), "STATE_CORRUPTION");
    }

    #[test]
    fn quarantine_renames_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        quarantine_corrupt_file(&path).unwrap();
        assert!(!path.exists());
        let has_quarantined = fs::read_dir(dir.path())
            .unwrap()
            .any(|e| e.unwrap().file_name().to_string_lossy().contains(".bad."));
        assert!(has_quarantined);
    }

    #[test]
    fn atomic_write_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_json_state_atomic(&path, &Sample { n: 42 }).unwrap();
        let value: Sample = read_json_state(&path, Sample { n: 0 }).unwrap();
        assert_eq!(value, Sample { n: 42 });
    }
}
