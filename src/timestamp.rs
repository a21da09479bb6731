//! Timestamp unification.
//!
//! Classroom data carries time in two shapes: ISO-8601 strings
//! (`creationTime`, `updateTime`) and structured date/time parts
//! (`dueDate` + `dueTime` on coursework). Both end up as a UTC instant,
//! or nothing at all when the input can't be understood.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

/// Offset layouts accepted after RFC 3339 fails: minute precision and `+hhmm` offsets.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

/// Naive layouts tried last. Offset-less values are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// The shapes a timestamp can arrive in
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput<'a> {
    /// An ISO-8601 date-time string
    Iso(&'a str),
    /// `{year, month, day}` with optional `{hours, minutes}`
    Parts {
        date: &'a Map<String, Value>,
        time: Option<&'a Map<String, Value>>,
    },
    /// Missing, null, or a shape we don't recognise
    Absent,
}

impl<'a> TimestampInput<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(s)) => TimestampInput::Iso(s),
            Some(Value::Object(obj)) => {
                // Either {dueDate, dueTime} or a bare {year, month, day}
                let date = match obj.get("dueDate") {
                    Some(Value::Object(date)) => date,
                    Some(_) => return TimestampInput::Absent,
                    None => obj,
                };
                if !has_date_parts(date) {
                    return TimestampInput::Absent;
                }
                let time = obj.get("dueTime").and_then(Value::as_object);
                TimestampInput::Parts { date, time }
            }
            _ => TimestampInput::Absent,
        }
    }

    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            TimestampInput::Iso(s) => parse_iso(s),
            TimestampInput::Parts { date, time } => from_parts(date, *time),
            TimestampInput::Absent => None,
        }
    }
}

/// Unify any supported timestamp shape into a UTC instant.
pub fn unify(value: Option<&Value>) -> Option<DateTime<Utc>> {
    TimestampInput::classify(value).resolve()
}

/// Unify an assignment's `dueDate`/`dueTime` pair.
pub fn unify_due(assignment: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let date = assignment.get("dueDate")?.as_object()?;
    if !has_date_parts(date) {
        return None;
    }
    let time = assignment.get("dueTime").and_then(Value::as_object);
    from_parts(date, time)
}

/// Render an instant the way every output column stores it.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn instant_value(instant: Option<DateTime<Utc>>) -> Value {
    match instant {
        Some(instant) => Value::String(format_instant(&instant)),
        None => Value::Null,
    }
}

fn has_date_parts(date: &Map<String, Value>) -> bool {
    ["year", "month", "day"].iter().all(|k| date.contains_key(*k))
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // A trailing `Z` is spelled out so the offset layouts can read it
    let zoned = match raw.strip_suffix(['Z', 'z']) {
        Some(local) => format!("{local}+00:00"),
        None => raw.to_string(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&zoned, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn from_parts(
    date: &Map<String, Value>,
    time: Option<&Map<String, Value>>,
) -> Option<DateTime<Utc>> {
    let year = i32::try_from(int_part(date.get("year"))?).ok()?;
    let month = u32::try_from(int_part(date.get("month"))?).ok()?;
    let day = u32::try_from(int_part(date.get("day"))?).ok()?;

    let (hours, minutes) = match time {
        Some(time) => (
            optional_int_part(time.get("hours"))?,
            optional_int_part(time.get("minutes"))?,
        ),
        None => (0, 0),
    };
    let hours = u32::try_from(hours).ok()?;
    let minutes = u32::try_from(minutes).ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hours, minutes, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn int_part(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Missing or null means zero; anything else must be an integer.
fn optional_int_part(value: Option<&Value>) -> Option<i64> {
    match value {
        None | Some(Value::Null) => Some(0),
        Some(_) => int_part(value),
    }
}
