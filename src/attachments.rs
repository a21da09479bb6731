//! Drive-file attachment extraction for student submissions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flattened attachment descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub thumb: Option<String>,
}

/// Where the drive-file payload was found inside an attachment entry.
///
/// Exports carry both `{"driveFile": {...}}` and the double-wrapped
/// `{"driveFile": {"driveFile": {...}, "shareMode": ...}}` shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveFilePayload<'a> {
    Direct(&'a Map<String, Value>),
    DoubleWrapped(&'a Map<String, Value>),
}

impl<'a> DriveFilePayload<'a> {
    /// Unwrap the known envelope around a drive file, if there is one.
    pub fn unwrap_envelope(entry: &'a Value) -> Option<Self> {
        let outer = entry.get("driveFile")?.as_object()?;
        let payload = match outer.get("driveFile") {
            Some(Value::Object(inner)) => DriveFilePayload::DoubleWrapped(inner),
            _ => DriveFilePayload::Direct(outer),
        };
        if payload.file().is_empty() {
            return None;
        }
        Some(payload)
    }

    pub fn file(&self) -> &'a Map<String, Value> {
        match *self {
            DriveFilePayload::Direct(file) | DriveFilePayload::DoubleWrapped(file) => file,
        }
    }

    pub fn to_attachment(&self) -> Attachment {
        let file = self.file();
        let text = |key: &str| file.get(key).and_then(Value::as_str).map(str::to_string);
        Attachment {
            id: text("id"),
            title: text("title"),
            link: text("alternateLink"),
            thumb: text("thumbnailUrl"),
        }
    }
}

/// Extract drive-file descriptors from a raw attachment list.
///
/// Returns `None` both when there is nothing to read and when no entry
/// resolved to a drive file; callers can't tell those apart.
pub fn extract_attachments(raw: Option<&Value>) -> Option<Vec<Attachment>> {
    let entries = raw?.as_array()?;
    let attachments: Vec<Attachment> = entries
        .iter()
        .filter_map(DriveFilePayload::unwrap_envelope)
        .map(|payload| payload.to_attachment())
        .collect();

    if attachments.is_empty() {
        None
    } else {
        Some(attachments)
    }
}

/// Column value for the `attachments` field of a submission row.
pub fn attachments_value(raw: Option<&Value>) -> Value {
    match extract_attachments(raw) {
        Some(attachments) => Value::Array(
            attachments
                .iter()
                .map(|a| serde_json::to_value(a).unwrap_or(Value::Null))
                .collect(),
        ),
        None => Value::Null,
    }
}
