//! # classroom-melt - Classroom export flattening
//!
//! Melts a classroom export snapshot (courses with nested rosters,
//! coursework and student submissions) into five flat record collections
//! ready for keyed upserts.
//!
//! ## Modules
//!
//! - **extractor**: the snapshot melter and record flattening
//! - **timestamp**, **attachments**, **grades**: per-field normalization
//! - **table**: column-padded tabular view over a collection
//! - **snapshot**: locating and reading snapshot files
//! - **sink**: JSON Lines output and the keyed upsert store
//!
//! ## Quick Start
//!
//! ```rust
//! use classroom_melt::{NormalizeConfig, SnapshotMelter};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let snapshot = json!({
//!     "exportTimestamp": "2025-08-30T19:27:44.005Z",
//!     "courses": [{
//!         "course_info": {"id": "c1", "name": "Biology"},
//!         "students": [{"userId": "s1", "profile": {"name": {"fullName": "Ada"}}}],
//!         "assignments": [{"id": "a1", "title": "Cells", "submissions": [{"id": "sub1"}]}]
//!     }]
//! });
//!
//! let melter = SnapshotMelter::new(NormalizeConfig::default());
//! let melted = melter.melt(&snapshot)?;
//!
//! assert_eq!(melted.students[0].get("profile.name.fullName").unwrap(), "Ada");
//! assert_eq!(melted.submissions[0].get("assignmentId").unwrap(), "a1");
//! # Ok(())
//! # }
//! ```

use std::io::Read;

pub mod attachments;
pub mod config;
pub mod error;
pub mod extractor;
pub mod grades;
pub mod sink;
pub mod snapshot;
pub mod table;
pub mod timestamp;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Location, MeltError, Result};
pub use extractor::{flatten_record, Normalized, SnapshotMelter};
pub use sink::{store_all, CollectionStore, RowWriter, UpsertSummary};
pub use table::Table;
pub use types::{Collection, KeyPart, NormalizeConfig, Record, RecordKey};

/// Main entry point: read one snapshot document and melt it
pub fn melt_snapshot<R: Read>(reader: R, config: NormalizeConfig) -> Result<Normalized> {
    let snapshot = snapshot::read_snapshot(reader)?;
    SnapshotMelter::new(config).melt(&snapshot)
}
