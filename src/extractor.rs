use crate::attachments::attachments_value;
use crate::error::{Location, MeltError, Result};
use crate::grades::latest_points;
use crate::table::Table;
use crate::timestamp::{instant_value, unify, unify_due};
use crate::types::{key_component, Collection, NormalizeConfig, Record};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Timestamp columns converted on courses, assignments and submissions
const TIMESTAMP_COLUMNS: [&str; 2] = ["creationTime", "updateTime"];

/// The five collections melted out of one snapshot
#[derive(Debug, Default)]
pub struct Normalized {
    /// When the snapshot was exported, if it says so
    pub export_timestamp: Option<DateTime<Utc>>,
    pub courses: Vec<Record>,
    pub students: Vec<Record>,
    pub teachers: Vec<Record>,
    pub assignments: Vec<Record>,
    pub submissions: Vec<Record>,

    /// Records left out, with where they sat in the snapshot
    pub skipped: Vec<MeltError>,
}

impl Normalized {
    pub fn records(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Courses => &self.courses,
            Collection::Students => &self.students,
            Collection::Teachers => &self.teachers,
            Collection::Assignments => &self.assignments,
            Collection::Submissions => &self.submissions,
        }
    }

    /// Tabular view of every collection, in [`Collection::ALL`] order
    pub fn tables(&self) -> Vec<Table> {
        Collection::ALL
            .iter()
            .map(|c| Table::from_records(*c, self.records(*c).to_vec()))
            .collect()
    }

    pub fn total_records(&self) -> usize {
        Collection::ALL.iter().map(|c| self.records(*c).len()).sum()
    }

    fn push(&mut self, record: Record) {
        match record.collection {
            Collection::Courses => self.courses.push(record),
            Collection::Students => self.students.push(record),
            Collection::Teachers => self.teachers.push(record),
            Collection::Assignments => self.assignments.push(record),
            Collection::Submissions => self.submissions.push(record),
        }
    }

    fn skip(&mut self, error: MeltError) {
        warn!(error = %error, "skipping record");
        self.skipped.push(error);
    }
}

/// Melts a classroom export snapshot into flat records
pub struct SnapshotMelter {
    config: NormalizeConfig,
}

impl SnapshotMelter {
    pub fn new(config: NormalizeConfig) -> Self {
        SnapshotMelter { config }
    }

    /// Melt a snapshot document.
    ///
    /// Only a root that isn't an object fails the whole call. Problems with
    /// individual course blocks or records are collected in
    /// [`Normalized::skipped`] and the rest of the snapshot is still melted.
    pub fn melt(&self, snapshot: &Value) -> Result<Normalized> {
        let root = snapshot.as_object().ok_or(MeltError::InvalidRoot)?;

        let export_timestamp = root
            .get("exportTimestamp")
            .or_else(|| root.get("export_timestamp"));

        let mut out = Normalized {
            export_timestamp: unify(export_timestamp),
            ..Normalized::default()
        };

        for (course_index, block) in list_field(root, "courses").iter().enumerate() {
            self.melt_course(block, course_index, &mut out);
        }

        debug!(
            courses = out.courses.len(),
            students = out.students.len(),
            teachers = out.teachers.len(),
            assignments = out.assignments.len(),
            submissions = out.submissions.len(),
            skipped = out.skipped.len(),
            "melted snapshot"
        );

        Ok(out)
    }

    fn melt_course(&self, block: &Value, course_index: usize, out: &mut Normalized) {
        let location = Location::course(course_index);
        let Some(block) = block.as_object() else {
            out.skip(MeltError::NotAnObject {
                what: "course block",
                location,
            });
            return;
        };

        let Some(course_info) = block.get("course_info").and_then(Value::as_object) else {
            out.skip(MeltError::MissingCourseInfo { location });
            return;
        };

        let mut course = self.flatten(course_info);
        rename_column(&mut course, "id", "courseId");
        let Some(course_id) = course.get("courseId").filter(|v| key_component(Some(*v)).is_some())
        else {
            out.skip(MeltError::MissingKey {
                collection: Collection::Courses,
                field: "courseId",
                location,
            });
            return;
        };
        let course_id = course_id.clone();
        unify_columns(&mut course);
        out.push(Record::new(Collection::Courses, course));

        for collection in [Collection::Students, Collection::Teachers] {
            for (index, raw) in list_field(block, collection.name()).iter().enumerate() {
                let location = location.with_record(index);
                match self.roster_record(collection, raw, &course_id, location) {
                    Ok(record) => out.push(record),
                    Err(error) => out.skip(error),
                }
            }
        }

        for (index, raw) in list_field(block, "assignments").iter().enumerate() {
            self.melt_assignment(raw, &course_id, Location::assignment(course_index, index), out);
        }
    }

    fn roster_record(
        &self,
        collection: Collection,
        raw: &Value,
        course_id: &Value,
        location: Location,
    ) -> Result<Record> {
        let raw = raw.as_object().ok_or(MeltError::NotAnObject {
            what: "roster entry",
            location,
        })?;

        let mut data = self.flatten(raw);
        data.insert("courseId".to_string(), course_id.clone());
        require_key(collection, &data, "userId", location)?;

        Ok(Record::new(collection, data))
    }

    fn melt_assignment(
        &self,
        raw: &Value,
        course_id: &Value,
        location: Location,
        out: &mut Normalized,
    ) {
        let Some(raw) = raw.as_object() else {
            out.skip(MeltError::NotAnObject {
                what: "assignment",
                location,
            });
            return;
        };

        let mut data = self.flatten(raw);
        data.remove("submissions");
        rename_column(&mut data, "id", "assignmentId");
        data.insert("courseId".to_string(), course_id.clone());
        if let Err(error) = require_key(Collection::Assignments, &data, "assignmentId", location) {
            out.skip(error);
            return;
        }

        // Due parts come from the raw object; flattening splits them into dotted columns
        data.insert("dueDateTime".to_string(), instant_value(unify_due(raw)));
        unify_columns(&mut data);

        let assignment_id = data.get("assignmentId").cloned().unwrap_or(Value::Null);
        let title = raw.get("title").cloned().unwrap_or(Value::Null);
        out.push(Record::new(Collection::Assignments, data));

        let parent = SubmissionParent {
            course_id,
            assignment_id: &assignment_id,
            title: &title,
        };
        for (index, submission) in list_field(raw, "submissions").iter().enumerate() {
            match self.submission_record(submission, &parent, location.with_record(index)) {
                Ok(record) => out.push(record),
                Err(error) => out.skip(error),
            }
        }
    }

    fn submission_record(
        &self,
        raw: &Value,
        parent: &SubmissionParent<'_>,
        location: Location,
    ) -> Result<Record> {
        let raw = raw.as_object().ok_or(MeltError::NotAnObject {
            what: "submission",
            location,
        })?;

        let mut data = self.flatten(raw);
        rename_column(&mut data, "id", "submissionId");
        data.insert("courseId".to_string(), parent.course_id.clone());
        data.insert("assignmentId".to_string(), parent.assignment_id.clone());
        data.insert("assignmentTitle".to_string(), parent.title.clone());
        require_key(Collection::Submissions, &data, "submissionId", location)?;

        unify_columns(&mut data);

        let attachments = raw
            .get("assignmentSubmission")
            .and_then(|s| s.get("attachments"));
        data.insert("attachments".to_string(), attachments_value(attachments));
        data.insert(
            "pointsEarned_latest".to_string(),
            latest_points(raw.get("submissionHistory")).unwrap_or(Value::Null),
        );
        let late = matches!(raw.get("late"), Some(Value::Bool(true)));
        data.insert("late".to_string(), Value::Bool(late));

        data.retain(|column, _| self.config.submission_columns.iter().any(|c| c == column));

        Ok(Record::new(Collection::Submissions, data))
    }

    fn flatten(&self, obj: &Map<String, Value>) -> Map<String, Value> {
        flatten_record(obj, &self.config.separator)
    }
}

/// Parent ids copied onto every submission row
struct SubmissionParent<'a> {
    course_id: &'a Value,
    assignment_id: &'a Value,
    title: &'a Value,
}

/// Flatten nested objects into dotted columns.
///
/// Arrays and scalars are kept as column values; empty objects contribute
/// no column at all.
pub fn flatten_record(obj: &Map<String, Value>, separator: &str) -> Map<String, Value> {
    let mut columns = Map::new();
    flatten_into(obj, None, separator, &mut columns);
    columns
}

fn flatten_into(
    obj: &Map<String, Value>,
    prefix: Option<&str>,
    separator: &str,
    columns: &mut Map<String, Value>,
) {
    for (key, value) in obj {
        let column = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, separator, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => {
                flatten_into(nested, Some(column.as_str()), separator, columns)
            }
            _ => {
                columns.insert(column, value.clone());
            }
        }
    }
}

/// A list-valued field; missing, null or non-list all read as empty.
fn list_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match obj.get(key) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

fn rename_column(data: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = data.remove(from) {
        data.insert(to.to_string(), value);
    }
}

fn unify_columns(data: &mut Map<String, Value>) {
    for column in TIMESTAMP_COLUMNS {
        if let Some(raw) = data.get(column) {
            let unified = instant_value(unify(Some(raw)));
            data.insert(column.to_string(), unified);
        }
    }
}

fn require_key(
    collection: Collection,
    data: &Map<String, Value>,
    field: &'static str,
    location: Location,
) -> Result<()> {
    if key_component(data.get(field)).is_some() {
        Ok(())
    } else {
        Err(MeltError::MissingKey {
            collection,
            field,
            location,
        })
    }
}
