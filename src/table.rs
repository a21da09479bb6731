//! Tabular view over a collection's records.
//!
//! Records coming out of the melter only carry the columns their source
//! object had. A table fixes the column set to the union over all records
//! and pads the gaps with `null`, which is what the persistence side sees.

use crate::types::{Collection, Record};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    collection: Collection,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    pub fn from_records(collection: Collection, records: Vec<Record>) -> Self {
        let columns: BTreeSet<&String> = records.iter().flat_map(|r| r.data.keys()).collect();
        let columns = columns.into_iter().cloned().collect();
        Table {
            collection,
            columns,
            records,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Sorted union of every record's columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows with every column present, missing ones set to `null`
    pub fn rows(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        self.records.iter().map(move |record| {
            self.columns
                .iter()
                .map(|column| {
                    let value = record.data.get(column).cloned().unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::new(
            Collection::Students,
            serde_json::from_value(value).unwrap(),
        )
    }

    #[test]
    fn test_columns_are_union() {
        let table = Table::from_records(
            Collection::Students,
            vec![
                record(json!({"courseId": "c1", "userId": "u1", "profile.name.fullName": "Ada"})),
                record(json!({"courseId": "c1", "userId": "u2", "profile.emailAddress": "b@x"})),
            ],
        );
        assert_eq!(
            table.columns(),
            &["courseId", "profile.emailAddress", "profile.name.fullName", "userId"]
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_rows_pad_missing_with_null() {
        let table = Table::from_records(
            Collection::Students,
            vec![
                record(json!({"courseId": "c1", "userId": "u1", "a": 1})),
                record(json!({"courseId": "c1", "userId": "u2", "b": 2})),
            ],
        );
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("b"), Some(&Value::Null));
        assert_eq!(rows[1].get("a"), Some(&Value::Null));
        assert_eq!(rows[1].get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_empty_table() {
        let table = Table::from_records(Collection::Courses, vec![]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert_eq!(table.rows().count(), 0);
    }
}
