//! Locating and reading export snapshots.

use crate::error::{MeltError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `classroom_data_YYYYMMDD_HHMMSS.json`, as written by the export job
static SNAPSHOT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^classroom_data_\d{8}_\d{6}\.json$").unwrap());

pub fn is_snapshot_name(name: &str) -> bool {
    SNAPSHOT_NAME_REGEX.is_match(name)
}

/// Newest snapshot in `dir`. The timestamp in the name sorts lexically,
/// so the greatest name wins.
pub fn latest_snapshot<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let mut newest: Option<PathBuf> = None;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_snapshot_name(name) || !path.is_file() {
            continue;
        }
        if newest.as_ref().map_or(true, |current| path > *current) {
            newest = Some(path);
        }
    }

    newest.ok_or_else(|| MeltError::NoSnapshot {
        dir: dir.to_path_buf(),
    })
}

/// Read a whole snapshot document.
///
/// Tries SIMD parsing first and falls back to serde_json, which also gives
/// the better error message when the input is broken.
pub fn read_snapshot<R: Read>(reader: R) -> Result<Value> {
    let mut content = Vec::new();
    BufReader::new(reader).read_to_end(&mut content)?;

    // simd-json parses in place, so keep the original bytes for the fallback
    let mut scratch = content.clone();
    let value = match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(value) => value,
        Err(error) => {
            debug!(error = %error, "SIMD parse failed, retrying with serde_json");
            serde_json::from_slice(&content).map_err(|e| MeltError::Parse(e.to_string()))?
        }
    };

    if !value.is_object() {
        return Err(MeltError::InvalidRoot);
    }
    Ok(value)
}

pub fn read_snapshot_file<P: AsRef<Path>>(path: P) -> Result<Value> {
    let file = std::fs::File::open(path.as_ref())?;
    read_snapshot(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_names() {
        assert!(is_snapshot_name("classroom_data_20250830_192744.json"));
        assert!(!is_snapshot_name("classroom_data_latest.json"));
        assert!(!is_snapshot_name("classroom_data_20250830_192744.json.bak"));
        assert!(!is_snapshot_name("courses.jsonl"));
    }

    #[test]
    fn test_read_snapshot() {
        let input = br#"{"exportTimestamp": "2025-08-30T19:27:44", "courses": []}"#;
        let value = read_snapshot(&input[..]).unwrap();
        assert_eq!(value["courses"], serde_json::json!([]));
    }

    #[test]
    fn test_read_snapshot_rejects_garbage() {
        assert!(matches!(
            read_snapshot(&b"{\"courses\": ["[..]),
            Err(MeltError::Parse(_))
        ));
        assert!(matches!(
            read_snapshot(&b"[1, 2, 3]"[..]),
            Err(MeltError::InvalidRoot)
        ));
    }
}
