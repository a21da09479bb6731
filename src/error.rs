//! Error types for snapshot melting.

use crate::types::Collection;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where in a snapshot a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub course: usize,
    pub assignment: Option<usize>,
    pub record: Option<usize>,
}

impl Location {
    pub fn course(course: usize) -> Self {
        Location {
            course,
            assignment: None,
            record: None,
        }
    }

    pub fn assignment(course: usize, assignment: usize) -> Self {
        Location {
            course,
            assignment: Some(assignment),
            record: None,
        }
    }

    pub fn with_record(mut self, record: usize) -> Self {
        self.record = Some(record);
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "course #{}", self.course)?;
        if let Some(assignment) = self.assignment {
            write!(f, ", assignment #{}", assignment)?;
        }
        if let Some(record) = self.record {
            write!(f, ", record #{}", record)?;
        }
        Ok(())
    }
}

/// Errors raised while loading, melting or storing a snapshot.
#[derive(Debug, Error)]
pub enum MeltError {
    #[error("failed to parse snapshot: {0}")]
    Parse(String),

    #[error("expected {what} to be a JSON object at {location}")]
    NotAnObject {
        what: &'static str,
        location: Location,
    },

    #[error("snapshot root is not a JSON object")]
    InvalidRoot,

    #[error("course block has no course_info object at {location}")]
    MissingCourseInfo { location: Location },

    #[error("{collection} record is missing key field `{field}` at {location}")]
    MissingKey {
        collection: Collection,
        field: &'static str,
        location: Location,
    },

    #[error("{collection} row is missing key field `{field}`")]
    IncompleteRow {
        collection: Collection,
        field: &'static str,
    },

    #[error("no snapshot matching classroom_data_*.json in {}", .dir.display())]
    NoSnapshot { dir: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience Result alias that defaults to [`MeltError`].
pub type Result<T> = std::result::Result<T, MeltError>;
