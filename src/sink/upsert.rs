//! Keyed upsert store backed by one JSON Lines file per collection.
//!
//! Mirrors a document store with a unique index on each collection's key:
//! an incoming row whose key already exists has its columns set over the
//! stored row, anything else is inserted.

use crate::error::{MeltError, Result};
use crate::extractor::Normalized;
use crate::sink::writer::RowWriter;
use crate::types::{Collection, RecordKey};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

pub struct CollectionStore {
    collection: Collection,
    path: PathBuf,
    rows: BTreeMap<RecordKey, Map<String, Value>>,
}

impl CollectionStore {
    /// Open `<dir>/<collection>.jsonl`, loading whatever it already holds
    pub fn open<P: AsRef<Path>>(dir: P, collection: Collection) -> Result<Self> {
        let path = dir.as_ref().join(format!("{}.jsonl", collection.name()));
        let mut rows = BTreeMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let row: Map<String, Value> = serde_json::from_str(&line).map_err(|e| {
                    MeltError::Parse(format!("{}:{}: {}", path.display(), line_no + 1, e))
                })?;
                let key = RecordKey::from_row(collection, &row)
                    .map_err(|field| MeltError::IncompleteRow { collection, field })?;
                rows.insert(key, row);
            }
        }

        Ok(CollectionStore {
            collection,
            path,
            rows,
        })
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Map<String, Value>> {
        self.rows.get(key)
    }

    /// Upsert rows by key. Rows without a complete key are logged and counted
    /// as rejected; the rest of the batch still goes in.
    pub fn upsert<I>(&mut self, rows: I) -> UpsertSummary
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut summary = UpsertSummary::default();

        for row in rows {
            let key = match RecordKey::from_row(self.collection, &row) {
                Ok(key) => key,
                Err(field) => {
                    let error = MeltError::IncompleteRow {
                        collection: self.collection,
                        field,
                    };
                    warn!(error = %error, "rejecting row");
                    summary.rejected += 1;
                    continue;
                }
            };

            match self.rows.get_mut(&key) {
                Some(stored) => {
                    stored.extend(row);
                    summary.updated += 1;
                }
                None => {
                    self.rows.insert(key, row);
                    summary.inserted += 1;
                }
            }
        }

        summary
    }

    /// Rewrite the backing file, rows ordered by key.
    ///
    /// Rows go to a sibling `.tmp` file that is renamed over the collection
    /// file once complete, so a failed write leaves the old file intact.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("jsonl.tmp");
        let written = self.write_rows(&staging);
        if let Err(error) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(error);
        }
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn write_rows(&self, path: &Path) -> Result<()> {
        let mut writer = RowWriter::new(BufWriter::new(File::create(path)?));
        for row in self.rows.values() {
            writer.write_row(self.collection, row)?;
        }
        writer.flush()
    }
}

/// Upsert every collection of a melted snapshot into `dir` and flush.
pub fn store_all<P: AsRef<Path>>(
    dir: P,
    normalized: &Normalized,
) -> Result<Vec<(Collection, UpsertSummary)>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut summaries = Vec::with_capacity(Collection::ALL.len());
    for table in normalized.tables() {
        let mut store = CollectionStore::open(dir, table.collection())?;
        let summary = store.upsert(table.rows());
        store.flush()?;

        info!(
            collection = %table.collection(),
            inserted = summary.inserted,
            updated = summary.updated,
            rejected = summary.rejected,
            total = store.len(),
            "stored collection"
        );
        summaries.push((table.collection(), summary));
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyPart;
    use serde_json::json;
    use tempfile::tempdir;

    fn row(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_insert_then_update_keeps_other_columns() {
        let dir = tempdir().unwrap();
        let mut store = CollectionStore::open(dir.path(), Collection::Students).unwrap();

        let summary = store.upsert(vec![
            row(json!({"courseId": "c1", "userId": "u1", "name": "Ada", "note": "keep"})),
            row(json!({"courseId": "c1", "userId": "u2", "name": "Bo"})),
        ]);
        assert_eq!(
            summary,
            UpsertSummary {
                inserted: 2,
                updated: 0,
                rejected: 0
            }
        );

        let summary = store.upsert(vec![row(json!({
            "courseId": "c1",
            "userId": "u1",
            "name": "Ada L."
        }))]);
        assert_eq!(summary.updated, 1);
        assert_eq!(store.len(), 2);

        let key = RecordKey(vec!["c1".into(), "u1".into()]);
        let stored = store.get(&key).unwrap();
        assert_eq!(stored.get("name"), Some(&json!("Ada L.")));
        assert_eq!(stored.get("note"), Some(&json!("keep")));
    }

    #[test]
    fn test_numeric_and_string_ids_stay_distinct() {
        let dir = tempdir().unwrap();
        let mut store = CollectionStore::open(dir.path(), Collection::Courses).unwrap();

        let summary = store.upsert(vec![
            row(json!({"courseId": 1, "name": "numeric"})),
            row(json!({"courseId": "1", "name": "text"})),
        ]);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.updated, 0);
        assert_eq!(store.len(), 2);

        let numeric = store.get(&RecordKey(vec![KeyPart::Num("1".into())])).unwrap();
        assert_eq!(numeric.get("name"), Some(&json!("numeric")));

        store.flush().unwrap();
        let reopened = CollectionStore::open(dir.path(), Collection::Courses).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn test_rows_without_key_are_rejected() {
        let dir = tempdir().unwrap();
        let mut store = CollectionStore::open(dir.path(), Collection::Submissions).unwrap();

        let summary = store.upsert(vec![
            row(json!({"assignmentId": "a1", "submissionId": "s1"})),
            row(json!({"assignmentId": "a1", "submissionId": null})),
        ]);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempdir().unwrap();
        let mut store = CollectionStore::open(dir.path(), Collection::Courses).unwrap();
        store.upsert(vec![
            row(json!({"courseId": "c2", "name": "B"})),
            row(json!({"courseId": "c1", "name": "A"})),
        ]);
        store.flush().unwrap();

        let first = std::fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = first.lines().collect();
        assert_eq!(
            lines,
            vec![r#"{"courseId":"c1","name":"A"}"#, r#"{"courseId":"c2","name":"B"}"#]
        );
        assert!(!dir.path().join("courses.jsonl.tmp").exists());

        let reopened = CollectionStore::open(dir.path(), Collection::Courses).unwrap();
        assert_eq!(reopened.len(), 2);
        reopened.flush().unwrap();
        assert_eq!(std::fs::read_to_string(reopened.path()).unwrap(), first);
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let contents = "{\"courseId\": \"c1\"}\nnot json\n";
        std::fs::write(dir.path().join("courses.jsonl"), contents).unwrap();
        let err = CollectionStore::open(dir.path(), Collection::Courses).err().unwrap();
        assert!(err.to_string().contains("courses.jsonl:2"));
    }
}
