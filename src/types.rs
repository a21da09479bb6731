use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The five flat collections a snapshot melts into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Courses,
    Students,
    Teachers,
    Assignments,
    Submissions,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Courses,
        Collection::Students,
        Collection::Teachers,
        Collection::Assignments,
        Collection::Submissions,
    ];

    /// Collection (and file stem) name
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Courses => "courses",
            Collection::Students => "students",
            Collection::Teachers => "teachers",
            Collection::Assignments => "assignments",
            Collection::Submissions => "submissions",
        }
    }

    /// Columns that together identify a row for upserts
    pub fn key_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Courses => &["courseId"],
            Collection::Students | Collection::Teachers => &["courseId", "userId"],
            Collection::Assignments => &["courseId", "assignmentId"],
            Collection::Submissions => &["assignmentId", "submissionId"],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One component of a row key. The JSON type is part of the identity,
/// so `1` and `"1"` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyPart {
    Num(String),
    Str(String),
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_string())
    }
}

/// Identifies a row within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(pub Vec<KeyPart>);

impl RecordKey {
    /// Build the key for `collection` from a row, or name the first missing field.
    pub fn from_row(
        collection: Collection,
        row: &Map<String, Value>,
    ) -> Result<Self, &'static str> {
        collection
            .key_fields()
            .iter()
            .map(|field| key_component(row.get(*field)).ok_or(*field))
            .collect::<Result<Vec<_>, _>>()
            .map(RecordKey)
    }
}

/// Ids are strings in the Classroom API, but numeric ids are tolerated.
pub fn key_component(value: Option<&Value>) -> Option<KeyPart> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(KeyPart::Str(s.clone())),
        Value::Number(n) => Some(KeyPart::Num(n.to_string())),
        _ => None,
    }
}

/// One flat row of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The collection (table) this row belongs to
    pub collection: Collection,

    /// Flattened column values
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(collection: Collection, data: Map<String, Value>) -> Self {
        Record { collection, data }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }
}

/// Submission columns kept after projection, in the order they are documented.
pub const SUBMISSION_COLUMNS: &[&str] = &[
    "submissionId",
    "courseId",
    "assignmentId",
    "assignmentTitle",
    "userId",
    "state",
    "creationTime",
    "updateTime",
    "late",
    "draftGrade",
    "pointsEarned_latest",
    "attachments",
    "alternateLink",
];

/// Configuration for the melting process
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Separator joining nested object keys into column names
    pub separator: String,

    /// Columns retained on submission rows; everything else is dropped
    pub submission_columns: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        NormalizeConfig {
            separator: String::from("."),
            submission_columns: SUBMISSION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_key_from_row() {
        let data = row(json!({"courseId": "c1", "userId": 42, "name": "x"}));
        let key = RecordKey::from_row(Collection::Students, &data).unwrap();
        assert_eq!(
            key,
            RecordKey(vec![KeyPart::Str("c1".into()), KeyPart::Num("42".into())])
        );
    }

    #[test]
    fn test_key_keeps_json_type() {
        let numeric = RecordKey::from_row(Collection::Courses, &row(json!({"courseId": 1})));
        let text = RecordKey::from_row(Collection::Courses, &row(json!({"courseId": "1"})));
        assert_ne!(numeric, text);
    }

    #[test]
    fn test_key_reports_missing_field() {
        let data = row(json!({"courseId": "c1", "submissionId": null}));
        assert_eq!(
            RecordKey::from_row(Collection::Submissions, &data),
            Err("assignmentId")
        );
        let data = row(json!({"assignmentId": "a1", "submissionId": ""}));
        assert_eq!(
            RecordKey::from_row(Collection::Submissions, &data),
            Err("submissionId")
        );
    }

    #[test]
    fn test_default_config() {
        let config = NormalizeConfig::default();
        assert_eq!(config.separator, ".");
        assert_eq!(config.submission_columns.len(), 13);
        assert!(config.submission_columns.iter().any(|c| c == "pointsEarned_latest"));
    }
}
