//! Task model definitions
//!
//! A [`Task`] can only be obtained through validation: [`NewTask::build`] for
//! fresh tasks and [`NewTask::restore`] for records read back from storage.
//! After that, the only mutations are [`Task::update_details`] and
//! [`Task::mark_completed`].

use chrono::{Duration, Local, NaiveDateTime};
use uuid::Uuid;

use crate::{Error, Result};

/// Maximum title length, counted in characters after trimming
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Current wall-clock time as naive local time
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// A todo item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: Uuid,
    title: String,
    description: Option<String>,
    due_date: Option<NaiveDateTime>,
    completed: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl Task {
    /// Create a new task with the given title and defaults for everything else
    pub fn new(title: impl Into<String>) -> Result<Self> {
        NewTask::new(title).build()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.due_date
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    /// True when an open task's due date has passed
    pub fn is_overdue(&self) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now())
    }

    /// Mark the task as completed
    ///
    /// Calling this on an already completed task only re-stamps `updated_at`.
    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.touch();
    }

    /// Apply a partial update
    ///
    /// The current values overlaid with the supplied ones are validated as a
    /// whole before anything is assigned, so on error the task is unchanged.
    pub fn update_details(&mut self, update: TaskUpdate) -> Result<()> {
        let title = match &update.title {
            Some(title) => title.trim().to_string(),
            None => self.title.clone(),
        };
        let description = match &update.description {
            Some(description) => description.clone(),
            None => self.description.clone(),
        };
        let due_date = match update.due_date {
            Some(due_date) => due_date,
            None => self.due_date,
        };

        let mut violations = field_violations(&title, description.as_deref());
        violations.extend(due_date_violation(due_date, now()));
        if !violations.is_empty() {
            return Err(Error::Validation(violations));
        }

        if update.title.is_some() {
            self.title = title;
        }
        if update.description.is_some() {
            self.description = description;
        }
        if update.due_date.is_some() {
            self.due_date = due_date;
        }
        self.touch();
        Ok(())
    }

    // Keeps updated_at strictly increasing even when the clock has not moved.
    fn touch(&mut self) {
        let now = now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::nanoseconds(1)
        };
    }
}

/// Input for creating or restoring a [`Task`]
#[derive(Debug, Clone)]
pub struct NewTask {
    title: String,
    description: Option<String>,
    due_date: Option<NaiveDateTime>,
    completed: bool,
    id: Option<Uuid>,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            completed: false,
            id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set or clear the description
    pub fn with_optional_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, due_date: NaiveDateTime) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Set or clear the due date
    pub fn with_optional_due_date(mut self, due_date: Option<NaiveDateTime>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: NaiveDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Validate every field and create the task
    pub fn build(self) -> Result<Task> {
        let now = now();
        let due_violation = due_date_violation(self.due_date, now);
        self.finish(now, due_violation).map_err(Error::Validation)
    }

    /// Rebuild a task from stored values
    ///
    /// Same rules as [`NewTask::build`] except the due date, which was checked
    /// when it was written and may legitimately have passed since.
    pub fn restore(self) -> std::result::Result<Task, Vec<String>> {
        self.finish(now(), None)
    }

    fn finish(
        self,
        now: NaiveDateTime,
        due_violation: Option<String>,
    ) -> std::result::Result<Task, Vec<String>> {
        let title = self.title.trim().to_string();
        let created_at = self.created_at.unwrap_or(now);
        let updated_at = self.updated_at.unwrap_or(created_at);

        let mut violations = field_violations(&title, self.description.as_deref());
        violations.extend(due_violation);
        if updated_at < created_at {
            violations.push("Updated timestamp cannot be earlier than creation timestamp".to_string());
        }
        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(Task {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            title,
            description: self.description,
            due_date: self.due_date,
            completed: self.completed,
            created_at,
            updated_at,
        })
    }
}

/// Partial update for [`Task::update_details`]
///
/// `None` leaves a field alone. For `description` and `due_date`,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDateTime>>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDateTime) -> Self {
        self.due_date = Some(Some(due_date));
        self
    }

    pub fn clear_due_date(mut self) -> Self {
        self.due_date = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }
}

// `title` is expected to be trimmed already.
fn field_violations(title: &str, description: Option<&str>) -> Vec<String> {
    let mut violations = Vec::new();

    if title.is_empty() {
        violations.push("Title cannot be empty or whitespace only".to_string());
    } else if title.chars().count() > MAX_TITLE_LEN {
        violations.push(format!(
            "Title cannot be longer than {} characters",
            MAX_TITLE_LEN
        ));
    }

    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            violations.push(format!(
                "Description cannot be longer than {} characters",
                MAX_DESCRIPTION_LEN
            ));
        }
    }

    violations
}

fn due_date_violation(due_date: Option<NaiveDateTime>, now: NaiveDateTime) -> Option<String> {
    match due_date {
        Some(due) if due < now => Some("Due date cannot be in the past".to_string()),
        _ => None,
    }
}
