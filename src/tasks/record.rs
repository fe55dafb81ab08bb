//! # JSON export and import of tasks.
//!
//! [`TaskRecord`] is the serialized shape of a [`Task`]:
//!
//! ```text
//! {
//!   "id": "K3ZQ1AB",            always
//!   "parent_id": "...",         omitted when absent
//!   "purpose": "...",           omitted when absent
//!   "status": "Succeed",        always
//!   "start_time": "...",        omitted when absent (RFC 3339)
//!   "end_time": "...",          omitted when absent (RFC 3339)
//!   "warnings": [...],          always
//!   "errors": [...],            always
//!   "args": [...] | null,       always
//!   "kwargs": {...} | null,     always
//!   "return_value": ...,        omitted when absent
//!   "exception": "..."          omitted when absent
//! }
//! ```
//!
//! Import accepts RFC 3339 timestamps as well as the space-separated
//! `YYYY-MM-DD HH:MM:SS[.ffffff]` form, read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::LifecycleError;
use crate::tasks::id::TaskId;
use crate::tasks::status::Status;
use crate::tasks::task::{Task, TaskParts};

/// Serialized form of a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Identity token.
    pub id: TaskId,
    /// Causally enclosing task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    /// What the task does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub status: Status,
    /// Entry into `Run`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub start_time: Option<DateTime<Utc>>,
    /// Entry into a terminal status.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub end_time: Option<DateTime<Utc>>,
    /// Recorded warnings.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<String>,
    /// Recorded error messages.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<String>,
    /// Captured positional arguments.
    #[serde(default)]
    pub args: Option<Vec<Value>>,
    /// Captured keyword arguments.
    #[serde(default)]
    pub kwargs: Option<Map<String, Value>>,
    /// Success value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl Task {
    /// Snapshot of this task in its serialized shape.
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id().clone(),
            parent_id: self.parent_id().cloned(),
            purpose: self.purpose().map(str::to_owned),
            status: self.status(),
            start_time: self.start_time(),
            end_time: self.end_time(),
            warnings: self.warnings().to_vec(),
            errors: self.errors().to_vec(),
            args: self.args().map(<[Value]>::to_vec),
            kwargs: self.kwargs().cloned(),
            return_value: self.return_value().cloned(),
            exception: self.exception().map(str::to_owned),
        }
    }

    /// Snapshot of this task as JSON.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.to_record()).unwrap_or_default()
    }

    /// Rebuilds a task (without listeners or sink) from a record.
    pub fn from_record(record: TaskRecord) -> Self {
        Task::from_parts(TaskParts {
            id: record.id,
            parent_id: record.parent_id,
            purpose: record.purpose,
            status: record.status,
            start_time: record.start_time,
            end_time: record.end_time,
            warnings: record.warnings,
            errors: record.errors,
            args: record.args,
            kwargs: record.kwargs,
            return_value: record.return_value,
            exception: record.exception,
        })
    }

    /// Rebuilds a task from its JSON shape.
    pub fn from_json(value: &Value) -> Result<Self, LifecycleError> {
        let record = TaskRecord::deserialize(value)?;
        Ok(Self::from_record(record))
    }

    /// Rebuilds a task from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, LifecycleError> {
        let record: TaskRecord = serde_json::from_str(text)?;
        Ok(Self::from_record(record))
    }
}

/// Parses an RFC 3339 or space-separated timestamp (the latter read as UTC).
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, LifecycleError> {
    let trimmed = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(ts) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    Err(LifecycleError::InvalidTimestamp {
        value: text.to_owned(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|text| parse_timestamp(&text).map_err(serde::de::Error::custom))
        .transpose()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Invocation;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_export_omits_absent_scalars_only() {
        let task = Task::new("fresh");
        let json = task.to_json();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("id"));
        assert_eq!(obj["status"], json!("Unknown"));
        assert_eq!(obj["warnings"], json!([]));
        assert_eq!(obj["errors"], json!([]));
        assert_eq!(obj["args"], Value::Null);
        assert_eq!(obj["kwargs"], Value::Null);
        for absent in ["parent_id", "start_time", "end_time", "return_value", "exception"] {
            assert!(!obj.contains_key(absent), "{absent} should be omitted");
        }
    }

    #[test]
    fn test_export_then_import_keeps_fields() {
        let mut task = Task::new("sum").with_invocation(Invocation::from_args([1, 2]));
        task.on_start().unwrap();
        task.warning("slow");
        task.on_success(Some(json!(3))).unwrap();

        let back = Task::from_json(&task.to_json()).unwrap();
        assert_eq!(back.to_record(), task.to_record());
        assert_eq!(back.status(), crate::Status::Succeed);
        assert_eq!(back.listener_count(), 0);
    }

    #[test]
    fn test_import_accepts_space_separated_timestamps() {
        let value = json!({
            "id": "ABC1234",
            "purpose": "legacy",
            "status": "Fail",
            "start_time": "2024-03-01 10:15:30.250000",
            "end_time": "2024-03-01T10:15:31Z",
            "warnings": null,
            "args": null,
            "kwargs": null,
            "exception": "division by zero"
        });
        let task = Task::from_json(&value).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(task.start_time(), Some(start));
        assert_eq!(task.duration(), Some(std::time::Duration::from_millis(750)));
        assert!(task.warnings().is_empty());
        assert_eq!(task.exception(), Some("division by zero"));
    }

    #[test]
    fn test_import_rejects_garbage_timestamp() {
        let err = Task::from_json_str(r#"{"id":"X","start_time":"yesterday"}"#).unwrap_err();
        assert_eq!(err.as_label(), "record_invalid");
        assert!(err.to_string().contains("yesterday"));
        assert!(parse_timestamp("yesterday").is_err());
    }
}
