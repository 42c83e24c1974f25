//! Todo use cases on top of a [`TaskRepository`]

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use crate::task::{NewTask, Task, TaskRepository, TaskUpdate};
use crate::{Error, Result};

pub struct TodoService {
    repository: Box<dyn TaskRepository>,
}

impl TodoService {
    pub fn new(repository: Box<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &dyn TaskRepository {
        self.repository.as_ref()
    }

    /// Validate and store a new task
    pub fn create_todo(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        due_date: Option<NaiveDateTime>,
    ) -> Result<Task> {
        let task = NewTask::new(title)
            .with_optional_description(description)
            .with_optional_due_date(due_date)
            .build()?;
        self.repository.save(&task)?;
        info!("Created task {}", task.id());
        Ok(task)
    }

    pub fn get_all_todos(&self) -> Result<Vec<Task>> {
        self.repository.find_all()
    }

    /// All tasks, dated ones first by due date, then undated in stored order
    pub fn get_todos_sorted_by_due_date(&self) -> Result<Vec<Task>> {
        let mut tasks = self.repository.find_all()?;
        // Stable sort keeps storage order among equal keys
        tasks.sort_by_key(|task| (task.due_date().is_none(), task.due_date()));
        Ok(tasks)
    }

    pub fn get_todo(&self, id: Uuid) -> Result<Task> {
        self.repository
            .find_by_id(id)?
            .ok_or(Error::TaskNotFound(id))
    }

    pub fn update_todo(&self, id: Uuid, update: TaskUpdate) -> Result<Task> {
        let mut task = self.get_todo(id)?;
        task.update_details(update)?;
        self.repository.update(&task)?;
        info!("Updated task {}", id);
        Ok(task)
    }

    pub fn complete_todo(&self, id: Uuid) -> Result<Task> {
        let mut task = self.get_todo(id)?;
        task.mark_completed();
        self.repository.update(&task)?;
        info!("Completed task {}", id);
        Ok(task)
    }

    pub fn delete_todo(&self, id: Uuid) -> Result<()> {
        self.repository.delete(id)?;
        info!("Deleted task {}", id);
        Ok(())
    }
}
