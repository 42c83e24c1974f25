//! Task repository trait
//!
//! Defines the interface for task storage operations.

use uuid::Uuid;

use super::model::Task;
use crate::Result;

/// Repository interface for task persistence
///
/// Implementations read the backing store on every call; nothing is cached
/// between calls.
pub trait TaskRepository: Send + Sync {
    /// Insert the task, or replace the stored task with the same ID
    fn save(&self, task: &Task) -> Result<()>;

    /// Get a task by ID
    fn find_by_id(&self, id: Uuid) -> Result<Option<Task>>;

    /// Get all tasks in storage order
    fn find_all(&self) -> Result<Vec<Task>>;

    /// Replace an existing task
    ///
    /// Fails with [`crate::Error::TaskNotFound`] instead of inserting.
    fn update(&self, task: &Task) -> Result<()>;

    /// Delete a task by ID, failing with [`crate::Error::TaskNotFound`] if absent
    fn delete(&self, id: Uuid) -> Result<()>;

    /// Check whether a task with this ID is stored
    fn exists(&self, id: Uuid) -> Result<bool>;
}
