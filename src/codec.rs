//! Wire format for tasks exchanged with the remote store.
//!
//! Records are taskwarrior export objects. Named fields map onto `Task`
//! members, every other key lands in `Task::others` so that nothing the
//! store knows about is dropped on the way back.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::task::{self, Task, STATUS_PENDING};

/// Compact ISO-8601 basic format used by the store, always UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const FIELD_DESCRIPTION: &str = "description";
const FIELD_UUID: &str = "uuid";
const FIELD_PROJECT: &str = "project";
const FIELD_STATUS: &str = "status";
const FIELD_PRIORITY: &str = "priority";
const FIELD_DUE: &str = "due";
const FIELD_WAIT: &str = "wait";
const FIELD_MODIFIED: &str = "modified";
const FIELD_END: &str = "end";
const FIELD_CREATED: &str = "created";
const FIELD_TAGS: &str = "tags";

/// Keys with a named `Task` field. Attribute bag entries never override them.
pub const NAMED_FIELDS: [&str; 11] = [
    FIELD_DESCRIPTION,
    FIELD_UUID,
    FIELD_PROJECT,
    FIELD_STATUS,
    FIELD_PRIORITY,
    FIELD_DUE,
    FIELD_WAIT,
    FIELD_MODIFIED,
    FIELD_END,
    FIELD_CREATED,
    FIELD_TAGS,
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no uuid")]
    MissingUuid,

    #[error("invalid uuid '{0}'")]
    InvalidUuid(String),

    #[error("invalid timestamp in '{field}': {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("invalid value for '{field}'")]
    InvalidField { field: &'static str },
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Encode a task as a wire record.
pub fn encode(task: &Task) -> Value {
    let mut out = Map::new();
    out.insert(FIELD_DESCRIPTION.into(), Value::String(task.name.clone()));
    out.insert(FIELD_UUID.into(), Value::String(task.id.to_string()));
    out.insert(FIELD_STATUS.into(), Value::String(task.status.clone()));
    if let Some(project) = &task.project {
        out.insert(FIELD_PROJECT.into(), Value::String(project.clone()));
    }
    if let Some(priority) = &task.priority {
        out.insert(FIELD_PRIORITY.into(), Value::String(priority.clone()));
    }

    let stamps = [
        (FIELD_DUE, task.due.as_ref()),
        (FIELD_WAIT, task.wait.as_ref()),
        (FIELD_MODIFIED, task.modified.as_ref()),
        (FIELD_END, task.end.as_ref()),
        (FIELD_CREATED, Some(&task.created)),
    ];
    for (field, stamp) in stamps {
        if let Some(stamp) = stamp {
            out.insert(field.into(), Value::String(format_timestamp(stamp)));
        }
    }

    if !task.tags.is_empty() {
        let tags = task.tags.iter().cloned().map(Value::String).collect();
        out.insert(FIELD_TAGS.into(), Value::Array(tags));
    }

    for (key, value) in &task.others {
        if NAMED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        out.insert(key.clone(), Value::String(value.clone()));
    }

    Value::Object(out)
}

pub fn encode_to_string(task: &Task) -> String {
    encode(task).to_string()
}

/// Encode tasks as a JSON array, the shape the store's `import` accepts.
pub fn encode_batch(tasks: &[Task]) -> String {
    Value::Array(tasks.iter().map(encode).collect()).to_string()
}

/// Decode one raw wire record.
pub fn decode(raw: &str) -> std::result::Result<Task, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    decode_value(value)
}

pub fn decode_value(value: Value) -> std::result::Result<Task, DecodeError> {
    let mut obj = match value {
        Value::Object(obj) => obj,
        _ => return Err(DecodeError::NotAnObject),
    };

    let id = match obj.remove(FIELD_UUID) {
        None | Some(Value::Null) => return Err(DecodeError::MissingUuid),
        Some(Value::String(raw)) => {
            Uuid::parse_str(raw.trim()).map_err(|_| DecodeError::InvalidUuid(raw.clone()))?
        }
        Some(other) => return Err(DecodeError::InvalidUuid(other.to_string())),
    };

    let mut out = Task::with_id(id, take_string(&mut obj, FIELD_DESCRIPTION)?.unwrap_or_default());
    out.status =
        take_string(&mut obj, FIELD_STATUS)?.unwrap_or_else(|| STATUS_PENDING.to_string());
    out.project = take_string(&mut obj, FIELD_PROJECT)?;
    out.priority = take_string(&mut obj, FIELD_PRIORITY)?;
    out.due = take_timestamp(&mut obj, FIELD_DUE)?;
    out.wait = take_timestamp(&mut obj, FIELD_WAIT)?;
    out.modified = take_timestamp(&mut obj, FIELD_MODIFIED)?;
    out.end = take_timestamp(&mut obj, FIELD_END)?;
    out.created = take_timestamp(&mut obj, FIELD_CREATED)?.unwrap_or_else(task::now);
    out.tags = take_tags(&mut obj)?;

    for (key, value) in obj {
        match value {
            Value::Null => {}
            Value::String(text) => {
                out.others.insert(key, text);
            }
            other => {
                out.others.insert(key, other.to_string());
            }
        }
    }

    Ok(out)
}

fn take_string(
    obj: &mut Map<String, Value>,
    field: &'static str,
) -> std::result::Result<Option<String>, DecodeError> {
    match obj.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(DecodeError::InvalidField { field }),
    }
}

fn take_timestamp(
    obj: &mut Map<String, Value>,
    field: &'static str,
) -> std::result::Result<Option<DateTime<Utc>>, DecodeError> {
    let raw = match take_string(obj, field)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    parse_timestamp(&raw)
        .map(Some)
        .map_err(|_| DecodeError::InvalidTimestamp { field, value: raw })
}

fn take_tags(obj: &mut Map<String, Value>) -> std::result::Result<Vec<String>, DecodeError> {
    let items = match obj.remove(FIELD_TAGS) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(DecodeError::InvalidField { field: FIELD_TAGS }),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(tag) => Ok(tag),
            _ => Err(DecodeError::InvalidField { field: FIELD_TAGS }),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedRecord>,
}

/// Decode a batch of raw records, skipping the ones that fail.
pub fn import_batch<I, S>(records: I) -> ImportReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ImportReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match decode(record.as_ref()) {
            Ok(task) => report.tasks.push(task),
            Err(err) => skip(&mut report, index, err),
        }
    }
    report
}

/// Decode store output: a JSON array, or one record per line.
///
/// A record that fails to decode is skipped on its own and the rest of the
/// batch still loads.
pub fn parse_export(text: &str) -> ImportReport {
    let trimmed = text.trim();
    if let Ok(Value::Array(values)) = serde_json::from_str::<Value>(trimmed) {
        let mut report = ImportReport::default();
        for (index, value) in values.into_iter().enumerate() {
            match decode_value(value) {
                Ok(task) => report.tasks.push(task),
                Err(err) => skip(&mut report, index, err),
            }
        }
        return report;
    }

    // A broken array, or older stores printing one object per line with a
    // trailing comma. Nesting is tracked per line so an unbalanced record
    // cannot swallow the lines after it.
    import_batch(trimmed.lines().flat_map(split_records))
}

/// Top-level elements of one line of export text, without the outer
/// brackets and separating commas.
fn split_records(line: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (at, ch) in line.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' if depth == 0 && line[start..at].trim().is_empty() => start = at + 1,
            '{' | '[' => depth += 1,
            '}' | ']' if depth > 0 => depth -= 1,
            ',' | ']' => {
                records.push(&line[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    records.push(&line[start..]);

    records
        .into_iter()
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .collect()
}

fn skip(report: &mut ImportReport, index: usize, err: DecodeError) {
    tracing::warn!(index, error = %err, "skipping task import");
    report.skipped.push(SkippedRecord {
        index,
        reason: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{"description":"Buy milk","uuid":"5f1c1c4e-8a0b-4c3e-9d44-1f6a2b7c9e01","status":"pending","project":"home","tags":["errand","store"],"created":"20240102T030405Z","urgency":4.2,"estimate":"2h"}"#;

    #[test]
    fn decode_reads_named_fields() {
        let task = decode(RECORD).expect("decode");
        assert_eq!(task.name, "Buy milk");
        assert_eq!(task.project.as_deref(), Some("home"));
        assert_eq!(task.tags, vec!["errand", "store"]);
        assert_eq!(format_timestamp(&task.created), "20240102T030405Z");
        assert!(task.priority.is_none());
    }

    #[test]
    fn decode_keeps_unknown_fields() {
        let task = decode(RECORD).expect("decode");
        assert_eq!(task.others.get("estimate").map(String::as_str), Some("2h"));
        assert_eq!(task.others.get("urgency").map(String::as_str), Some("4.2"));
        assert!(!task.others.contains_key("uuid"));
    }

    #[test]
    fn decode_defaults_missing_optional_fields() {
        let task = decode(r#"{"uuid":"5f1c1c4e-8a0b-4c3e-9d44-1f6a2b7c9e01"}"#).expect("decode");
        assert_eq!(task.name, "");
        assert_eq!(task.status, STATUS_PENDING);
        assert!(task.project.is_none());
        assert!(task.tags.is_empty());
    }

    #[test]
    fn decode_rejects_missing_or_bad_uuid() {
        assert!(matches!(
            decode(r#"{"description":"x"}"#),
            Err(DecodeError::MissingUuid)
        ));
        assert!(matches!(
            decode(r#"{"uuid":"not-a-uuid"}"#),
            Err(DecodeError::InvalidUuid(_))
        ));
    }

    #[test]
    fn decode_rejects_malformed_timestamp() {
        let err = decode(r#"{"uuid":"5f1c1c4e-8a0b-4c3e-9d44-1f6a2b7c9e01","due":"2024-01-01"}"#)
            .expect_err("bad due");
        assert!(matches!(
            err,
            DecodeError::InvalidTimestamp { field: "due", .. }
        ));
    }

    #[test]
    fn decode_rejects_non_objects() {
        assert!(matches!(decode("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode("{oops"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn encode_omits_unset_fields() {
        let task = Task::new("write report");
        let value = encode(&task);
        let obj = value.as_object().expect("object");
        assert!(obj.contains_key("created"));
        assert!(!obj.contains_key("due"));
        assert!(!obj.contains_key("tags"));
        assert!(!obj.contains_key("project"));
        assert_eq!(obj["status"], "pending");
    }

    #[test]
    fn encode_never_lets_attributes_shadow_named_fields() {
        let mut task = Task::new("real");
        task.others.insert("description".to_string(), "fake".to_string());
        let value = encode(&task);
        assert_eq!(value["description"], "real");
    }

    #[test]
    fn parse_export_accepts_arrays_and_lines() {
        let array = format!("[{RECORD},{RECORD}]");
        assert_eq!(parse_export(&array).tasks.len(), 2);

        let lines = format!("[\n{RECORD},\n{RECORD}\n]");
        assert_eq!(parse_export(&lines).tasks.len(), 2);
    }

    #[test]
    fn split_records_respects_nesting_and_strings() {
        let line = r#"[{"a":[1,2]},{"b":"x,]}"},{"c":"\\"}]"#;
        assert_eq!(
            split_records(line),
            vec![r#"{"a":[1,2]}"#, r#"{"b":"x,]}"}"#, r#"{"c":"\\"}"#]
        );
        assert!(split_records("[").is_empty());
        assert!(split_records("]").is_empty());
        assert_eq!(split_records(r#"{"d":1},"#), vec![r#"{"d":1}"#]);
    }
}
