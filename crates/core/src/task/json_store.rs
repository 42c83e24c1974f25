//! JSON file task store
//!
//! The whole collection is one JSON array of task records.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::file_store::{ensure_file_exists, read_file, write_file};
use super::model::{NewTask, Task};
use super::repository::TaskRepository;
use crate::error::FileFormat;
use crate::{Error, Result};

const EMPTY_COLLECTION: &str = "[]";

/// On-disk form of a task
#[derive(Debug, Serialize, Deserialize)]
struct TaskRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    due_date: Option<NaiveDateTime>,
    completed: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            due_date: task.due_date(),
            completed: task.is_completed(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

impl TaskRecord {
    fn into_task(self) -> std::result::Result<Task, Vec<String>> {
        NewTask::new(self.title)
            .with_id(self.id)
            .with_optional_description(self.description)
            .with_optional_due_date(self.due_date)
            .with_completed(self.completed)
            .with_created_at(self.created_at)
            .with_updated_at(self.updated_at)
            .restore()
    }
}

/// File-based task store using JSON
pub struct JsonTaskStore {
    /// Path to the JSON file
    path: PathBuf,
}

impl JsonTaskStore {
    /// Create a new JsonTaskStore
    ///
    /// A missing or zero-length file is initialized as an empty array.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_file_exists(&path, EMPTY_COLLECTION)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the raw records
    ///
    /// Valid JSON that is not an array counts as an empty collection.
    fn load(&self) -> Result<Vec<Value>> {
        let content = read_file(&self.path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| Error::Format {
            format: FileFormat::Json,
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        match value {
            Value::Array(records) => Ok(records),
            _ => {
                debug!(
                    "Task file {} does not hold an array, treating as empty",
                    self.path.display()
                );
                Ok(Vec::new())
            }
        }
    }

    /// Persist the records to disk
    fn persist(&self, records: &[Value]) -> Result<()> {
        let content = serde_json::to_string_pretty(records)
            .map_err(|e| Error::conversion("collection", e))?;
        write_file(&self.path, &content)
    }

    fn position(records: &[Value], id: Uuid) -> Option<usize> {
        records.iter().position(|record| record_id(record) == Some(id))
    }
}

fn record_id(record: &Value) -> Option<Uuid> {
    record
        .get("id")
        .and_then(Value::as_str)
        .and_then(|text| Uuid::parse_str(text).ok())
}

fn record_label(record: &Value, index: usize) -> String {
    match record.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => format!("#{}", index),
    }
}

fn to_value(task: &Task) -> Result<Value> {
    serde_json::to_value(TaskRecord::from(task))
        .map_err(|e| Error::conversion(task.id().to_string(), e))
}

fn to_task(record: &Value, index: usize) -> Result<Task> {
    let label = || record_label(record, index);
    let parsed: TaskRecord =
        serde_json::from_value(record.clone()).map_err(|e| Error::conversion(label(), e))?;
    parsed
        .into_task()
        .map_err(|violations| Error::conversion(label(), violations.join("; ")))
}

impl TaskRepository for JsonTaskStore {
    fn save(&self, task: &Task) -> Result<()> {
        let mut records = self.load()?;
        let value = to_value(task)?;

        match Self::position(&records, task.id()) {
            Some(index) => records[index] = value,
            None => records.push(value),
        }

        self.persist(&records)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let records = self.load()?;
        Self::position(&records, id)
            .map(|index| to_task(&records[index], index))
            .transpose()
    }

    fn find_all(&self) -> Result<Vec<Task>> {
        let records = self.load()?;
        records
            .iter()
            .enumerate()
            .map(|(index, record)| to_task(record, index))
            .collect()
    }

    fn update(&self, task: &Task) -> Result<()> {
        let mut records = self.load()?;
        let index =
            Self::position(&records, task.id()).ok_or(Error::TaskNotFound(task.id()))?;

        records[index] = to_value(task)?;
        self.persist(&records)
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        let mut records = self.load()?;
        let index = Self::position(&records, id).ok_or(Error::TaskNotFound(id))?;

        records.remove(index);
        self.persist(&records)
    }

    fn exists(&self, id: Uuid) -> Result<bool> {
        let records = self.load()?;
        Ok(Self::position(&records, id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskUpdate;
    use chrono::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonTaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        let store = JsonTaskStore::new(&path).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_new_store_initializes_empty_array() {
        let (store, _temp) = create_test_store();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
        assert!(store.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_find_round_trip() {
        let (store, _temp) = create_test_store();

        let due = crate::task::now() + Duration::days(3);
        let task = NewTask::new("Round trip")
            .with_description("All fields")
            .with_due_date(due)
            .build()
            .unwrap();
        store.save(&task).unwrap();

        let found = store.find_by_id(task.id()).unwrap().unwrap();
        assert_eq!(found, task);
    }

    #[test]
    fn test_find_missing_is_none() {
        let (store, _temp) = create_test_store();
        store.save(&Task::new("Present").unwrap()).unwrap();

        assert!(store.find_by_id(Uuid::new_v4()).unwrap().is_none());
        assert!(!store.exists(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn test_save_upserts() {
        let (store, _temp) = create_test_store();

        let mut task = Task::new("First version").unwrap();
        store.save(&task).unwrap();
        task.update_details(TaskUpdate::new().with_title("Second version"))
            .unwrap();
        store.save(&task).unwrap();

        let all = store.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title(), "Second version");
    }

    #[test]
    fn test_find_all_keeps_file_order() {
        let (store, _temp) = create_test_store();
        for title in ["one", "two", "three"] {
            store.save(&Task::new(title).unwrap()).unwrap();
        }

        let titles: Vec<String> = store
            .find_all()
            .unwrap()
            .iter()
            .map(|t| t.title().to_string())
            .collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_update_nonexistent_task() {
        let (store, _temp) = create_test_store();
        store.save(&Task::new("Existing").unwrap()).unwrap();

        let stranger = Task::new("Never saved").unwrap();
        match store.update(&stranger).unwrap_err() {
            Error::TaskNotFound(id) => assert_eq!(id, stranger.id()),
            e => panic!("Expected TaskNotFound error, got: {:?}", e),
        }
        assert_eq!(store.find_all().unwrap().len(), 1);
        assert!(!store.exists(stranger.id()).unwrap());
    }

    #[test]
    fn test_update_replaces_record() {
        let (store, _temp) = create_test_store();
        let mut task = Task::new("Before").unwrap();
        store.save(&task).unwrap();

        task.mark_completed();
        store.update(&task).unwrap();

        let found = store.find_by_id(task.id()).unwrap().unwrap();
        assert!(found.is_completed());
        assert_eq!(found.updated_at(), task.updated_at());
    }

    #[test]
    fn test_delete_task() {
        let (store, _temp) = create_test_store();
        let keep = Task::new("Keep").unwrap();
        let drop = Task::new("Drop").unwrap();
        store.save(&keep).unwrap();
        store.save(&drop).unwrap();

        store.delete(drop.id()).unwrap();

        let remaining = store.find_all().unwrap();
        assert_eq!(remaining, vec![keep]);

        match store.delete(drop.id()).unwrap_err() {
            Error::TaskNotFound(_) => {}
            e => panic!("Expected TaskNotFound error, got: {:?}", e),
        }
    }

    #[test]
    fn test_invalid_json_is_format_error() {
        let (store, _temp) = create_test_store();
        fs::write(store.path(), "not valid json").unwrap();

        match store.find_all().unwrap_err() {
            Error::Format { format, .. } => assert_eq!(format, FileFormat::Json),
            e => panic!("Expected Format error, got: {:?}", e),
        }
    }

    #[test]
    fn test_non_array_json_is_empty() {
        let (store, _temp) = create_test_store();
        fs::write(store.path(), r#"{"not":"a list"}"#).unwrap();

        assert!(store.find_all().unwrap().is_empty());
        assert!(!store.exists(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn test_malformed_records_are_conversion_errors() {
        let (store, _temp) = create_test_store();
        let id = Uuid::new_v4();

        let cases = [
            // missing title
            format!(
                r#"[{{"id":"{}","completed":false,"created_at":"2024-01-01T10:00:00","updated_at":"2024-01-01T10:00:00"}}]"#,
                id
            ),
            // bad uuid
            r#"[{"id":"nope","title":"t","completed":false,"created_at":"2024-01-01T10:00:00","updated_at":"2024-01-01T10:00:00"}]"#.to_string(),
            // bad timestamp
            format!(
                r#"[{{"id":"{}","title":"t","completed":false,"created_at":"yesterday","updated_at":"2024-01-01T10:00:00"}}]"#,
                id
            ),
            // wrong type
            format!(
                r#"[{{"id":"{}","title":"t","completed":"no","created_at":"2024-01-01T10:00:00","updated_at":"2024-01-01T10:00:00"}}]"#,
                id
            ),
        ];

        for content in cases {
            fs::write(store.path(), &content).unwrap();
            match store.find_all().unwrap_err() {
                Error::Conversion { .. } => {}
                e => panic!("Expected Conversion error for {}, got: {:?}", content, e),
            }
        }
    }

    #[test]
    fn test_reads_records_without_fractional_seconds() {
        let (store, _temp) = create_test_store();
        let id = Uuid::new_v4();
        fs::write(
            store.path(),
            format!(
                r#"[{{"id":"{}","title":"Legacy","description":null,"due_date":"2020-06-01T09:30:00","completed":true,"created_at":"2020-01-01T10:00:00","updated_at":"2020-01-02T10:00:00.250000"}}]"#,
                id
            ),
        )
        .unwrap();

        // An expired due date does not block reading
        let task = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(task.title(), "Legacy");
        assert!(task.is_completed());
        assert!(task.due_date().is_some());
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("tasks.json");

        let first = JsonTaskStore::new(&path).unwrap();
        let second = JsonTaskStore::new(&path).unwrap();

        let task = NewTask::new("Persistent task")
            .with_description("Should survive reload")
            .build()
            .unwrap();
        first.save(&task).unwrap();

        let found = second.find_by_id(task.id()).unwrap().unwrap();
        assert_eq!(found.description(), Some("Should survive reload"));
    }
}
