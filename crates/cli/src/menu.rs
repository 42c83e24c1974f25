//! Interactive console menu
//!
//! Generic over its input and output so the whole loop can be driven from
//! tests with in-memory buffers.

use std::io::{BufRead, Write};

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use colored::Colorize;
use uuid::Uuid;

use todo_core::task::{Task, TaskUpdate};
use todo_core::{Error, TodoService};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Typed at an update prompt to clear an optional field
const CLEAR_MARKER: &str = "-";

const MENU_ITEMS: [(&str, &str); 6] = [
    ("1", "Add todo"),
    ("2", "List todos"),
    ("3", "Update todo"),
    ("4", "Complete todo"),
    ("5", "Delete todo"),
    ("6", "Exit"),
];

/// What to do after a menu action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct Menu<'a, R, W> {
    service: &'a TodoService,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(service: &'a TodoService, input: R, output: W) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    /// Run until the user exits or input ends
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "{}", "Todo Manager".bold().cyan())?;

        loop {
            self.show_menu()?;
            let Some(choice) = self.prompt("Enter your choice [6]")? else {
                break;
            };

            let flow = match choice.as_str() {
                "1" => self.add_todo()?,
                "2" => self.list_todos()?,
                "3" => self.update_todo()?,
                "4" => self.complete_todo()?,
                "5" => self.delete_todo()?,
                "6" | "" => Flow::Exit,
                _ => {
                    writeln!(
                        self.output,
                        "{}",
                        "Invalid choice! Please select a valid option.".red()
                    )?;
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        writeln!(self.output, "{}", "Goodbye!".green())?;
        Ok(())
    }

    fn show_menu(&mut self) -> Result<()> {
        writeln!(self.output)?;
        for (key, label) in MENU_ITEMS {
            writeln!(self.output, "  {}. {}", key, label)?;
        }
        Ok(())
    }

    /// Print `label`, read one line and trim it; `None` at end of input
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}: ", label.bold())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until the answer is blank or a valid date; `None` at end of input
    fn prompt_due_date(&mut self, label: &str) -> Result<Option<DueDateInput>> {
        loop {
            let Some(raw) = self.prompt(label)? else {
                return Ok(None);
            };
            match parse_due_date_input(&raw) {
                Ok(parsed) => return Ok(Some(parsed)),
                Err(message) => writeln!(self.output, "{}", message.yellow())?,
            }
        }
    }

    /// Ask for a task ID; `Ok(None)` when the answer was unusable
    fn prompt_id(&mut self) -> Result<Option<Option<Uuid>>> {
        let Some(raw) = self.prompt("Enter todo ID")? else {
            return Ok(None);
        };
        if raw.is_empty() {
            writeln!(self.output, "{}", "Todo ID is required.".red())?;
            return Ok(Some(None));
        }
        match Uuid::parse_str(&raw) {
            Ok(id) => Ok(Some(Some(id))),
            Err(_) => {
                writeln!(
                    self.output,
                    "{}",
                    "Invalid ID format. Please enter a valid UUID.".red()
                )?;
                Ok(Some(None))
            }
        }
    }

    fn add_todo(&mut self) -> Result<Flow> {
        writeln!(self.output, "{}", "Add New Todo".bold().cyan())?;

        let Some(title) = self.prompt("Enter todo title")? else {
            return Ok(Flow::Exit);
        };
        let Some(description) = self.prompt("Enter description (optional)")? else {
            return Ok(Flow::Exit);
        };
        let Some(due_date) =
            self.prompt_due_date("Enter due date (YYYY-MM-DD [HH:MM], optional)")?
        else {
            return Ok(Flow::Exit);
        };

        let description = Some(description).filter(|d| !d.is_empty());
        let due_date = match due_date {
            DueDateInput::Set(date) => Some(date),
            DueDateInput::Keep | DueDateInput::Clear => None,
        };

        match self.service.create_todo(title, description, due_date) {
            Ok(task) => {
                writeln!(self.output, "{}", "Todo created successfully!".green())?;
                self.show_task(&task)?;
            }
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn list_todos(&mut self) -> Result<Flow> {
        writeln!(self.output, "{}", "Todo List".bold().cyan())?;

        let tasks = match self.service.get_todos_sorted_by_due_date() {
            Ok(tasks) => tasks,
            Err(err) => {
                self.report(&err)?;
                return Ok(Flow::Continue);
            }
        };

        if tasks.is_empty() {
            writeln!(
                self.output,
                "{}",
                "No todos yet. Choose 'Add todo' to create one.".yellow()
            )?;
            return Ok(Flow::Continue);
        }

        for task in &tasks {
            let status = if task.is_completed() {
                "COMPLETED".green()
            } else if task.is_overdue() {
                "OVERDUE".red()
            } else {
                "PENDING".yellow()
            };
            writeln!(
                self.output,
                "{}  [{}]  {}  due: {}",
                task.id().to_string().dimmed(),
                status,
                task.title().bold(),
                format_due_date(task.due_date()),
            )?;
            if let Some(description) = task.description() {
                writeln!(self.output, "    {}", description)?;
            }
        }
        writeln!(self.output, "{} todo(s)", tasks.len())?;
        Ok(Flow::Continue)
    }

    fn update_todo(&mut self) -> Result<Flow> {
        writeln!(self.output, "{}", "Update Todo".bold().cyan())?;

        let Some(id) = self.prompt_id()? else {
            return Ok(Flow::Exit);
        };
        let Some(id) = id else {
            return Ok(Flow::Continue);
        };

        let current = match self.service.get_todo(id) {
            Ok(task) => task,
            Err(err) => {
                self.report(&err)?;
                return Ok(Flow::Continue);
            }
        };

        self.show_task(&current)?;
        writeln!(
            self.output,
            "{}",
            format!(
                "Leave fields empty to keep current values, '{}' clears optional ones",
                CLEAR_MARKER
            )
            .dimmed()
        )?;

        let Some(title) = self.prompt("Enter new title")? else {
            return Ok(Flow::Exit);
        };
        let Some(description) = self.prompt("Enter new description")? else {
            return Ok(Flow::Exit);
        };
        let Some(due_date) = self.prompt_due_date("Enter new due date")? else {
            return Ok(Flow::Exit);
        };

        let mut update = TaskUpdate::new();
        if !title.is_empty() && title != current.title() {
            update = update.with_title(title);
        }
        match description.as_str() {
            "" => {}
            CLEAR_MARKER => update = update.clear_description(),
            text if Some(text) != current.description() => {
                update = update.with_description(text)
            }
            _ => {}
        }
        match due_date {
            DueDateInput::Keep => {}
            DueDateInput::Clear => update = update.clear_due_date(),
            DueDateInput::Set(date) => update = update.with_due_date(date),
        }

        if update.is_empty() {
            writeln!(self.output, "{}", "Nothing to update.".yellow())?;
            return Ok(Flow::Continue);
        }

        match self.service.update_todo(id, update) {
            Ok(task) => {
                writeln!(self.output, "{}", "Todo updated successfully!".green())?;
                self.show_task(&task)?;
            }
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn complete_todo(&mut self) -> Result<Flow> {
        writeln!(self.output, "{}", "Complete Todo".bold().cyan())?;

        let Some(id) = self.prompt_id()? else {
            return Ok(Flow::Exit);
        };
        if let Some(id) = id {
            match self.service.complete_todo(id) {
                Ok(task) => writeln!(
                    self.output,
                    "{} {}",
                    "Todo completed:".green(),
                    task.title()
                )?,
                Err(err) => self.report(&err)?,
            }
        }
        Ok(Flow::Continue)
    }

    fn delete_todo(&mut self) -> Result<Flow> {
        writeln!(self.output, "{}", "Delete Todo".bold().cyan())?;

        let Some(id) = self.prompt_id()? else {
            return Ok(Flow::Exit);
        };
        if let Some(id) = id {
            match self.service.delete_todo(id) {
                Ok(()) => writeln!(self.output, "{}", "Todo deleted.".green())?,
                Err(err) => self.report(&err)?,
            }
        }
        Ok(Flow::Continue)
    }

    fn show_task(&mut self, task: &Task) -> Result<()> {
        writeln!(self.output, "  ID:          {}", task.id())?;
        writeln!(self.output, "  Title:       {}", task.title())?;
        writeln!(
            self.output,
            "  Description: {}",
            task.description().unwrap_or("No description")
        )?;
        writeln!(self.output, "  Due date:    {}", format_due_date(task.due_date()))?;
        writeln!(
            self.output,
            "  Status:      {}",
            if task.is_completed() { "Completed" } else { "Pending" }
        )?;
        Ok(())
    }

    fn report(&mut self, err: &Error) -> Result<()> {
        match err {
            Error::Validation(violations) => {
                writeln!(self.output, "{}", "Validation Error:".red().bold())?;
                for violation in violations {
                    writeln!(self.output, "  - {}", violation)?;
                }
                writeln!(self.output, "Please try again with valid input.")?;
            }
            Error::TaskNotFound(_) => writeln!(
                self.output,
                "{} Please check the ID and try again.",
                "Todo not found.".red()
            )?,
            other => {
                tracing::error!("Operation failed: {}", other);
                writeln!(self.output, "{} {}", "Error:".red().bold(), other)?;
            }
        }
        Ok(())
    }
}

/// Parsed answer to a due date prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueDateInput {
    Keep,
    Clear,
    Set(NaiveDateTime),
}

/// Blank keeps, `-` clears; a bare date means the end of that day
fn parse_due_date_input(raw: &str) -> std::result::Result<DueDateInput, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DueDateInput::Keep);
    }
    if raw == CLEAR_MARKER {
        return Ok(DueDateInput::Clear);
    }
    if let Ok(date_time) = NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT) {
        return Ok(DueDateInput::Set(date_time));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(DueDateInput::Set)
        .ok_or_else(|| {
            "Invalid date format. Please use YYYY-MM-DD or YYYY-MM-DD HH:MM.".to_string()
        })
}

fn format_due_date(due_date: Option<NaiveDateTime>) -> String {
    match due_date {
        Some(date) => date.format(DATE_TIME_FORMAT).to_string(),
        None => "No due date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use todo_core::task::JsonTaskStore;

    fn create_test_service() -> (TodoService, TempDir) {
        colored::control::set_override(false);
        let temp_dir = TempDir::new().unwrap();
        let store = JsonTaskStore::new(temp_dir.path().join("todos.json")).unwrap();
        (TodoService::new(Box::new(store)), temp_dir)
    }

    fn run_script(service: &TodoService, script: &str) -> String {
        let mut output = Vec::new();
        Menu::new(service, Cursor::new(script.as_bytes()), &mut output)
            .run()
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_due_date_input() {
        assert_eq!(parse_due_date_input("  ").unwrap(), DueDateInput::Keep);
        assert_eq!(parse_due_date_input("-").unwrap(), DueDateInput::Clear);
        assert_eq!(
            parse_due_date_input("2031-05-04").unwrap(),
            DueDateInput::Set(
                NaiveDate::from_ymd_opt(2031, 5, 4)
                    .unwrap()
                    .and_hms_opt(23, 59, 59)
                    .unwrap()
            )
        );
        assert_eq!(
            parse_due_date_input("2031-05-04 08:15").unwrap(),
            DueDateInput::Set(
                NaiveDate::from_ymd_opt(2031, 5, 4)
                    .unwrap()
                    .and_hms_opt(8, 15, 0)
                    .unwrap()
            )
        );
        assert!(parse_due_date_input("04/05/2031").is_err());
    }

    #[test]
    fn test_add_then_list() {
        let (service, _temp) = create_test_service();

        let output = run_script(&service, "1\nBuy milk\n\n\n2\n6\n");

        assert!(output.contains("Todo created successfully!"));
        assert!(output.contains("Buy milk"));
        assert!(output.contains("PENDING"));
        assert!(output.contains("1 todo(s)"));
        assert!(output.contains("Goodbye!"));
        assert_eq!(service.get_all_todos().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_date_is_asked_again() {
        let (service, _temp) = create_test_service();

        let output = run_script(&service, "1\nDated\n\nsoon\n2099-01-01\n6\n");

        assert!(output.contains("Invalid date format"));
        let tasks = service.get_all_todos().unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].due_date().is_some());
    }

    #[test]
    fn test_validation_errors_are_listed() {
        let (service, _temp) = create_test_service();

        let output = run_script(&service, "1\n   \n\n2000-01-01\n6\n");

        assert!(output.contains("Validation Error:"));
        assert!(output.contains("Title cannot be empty or whitespace only"));
        assert!(output.contains("Due date cannot be in the past"));
        assert!(service.get_all_todos().unwrap().is_empty());
    }

    #[test]
    fn test_update_complete_delete_flow() {
        let (service, _temp) = create_test_service();
        let task = service
            .create_todo("Original", Some("old notes".to_string()), None)
            .unwrap();
        let id = task.id();

        run_script(&service, &format!("3\n{}\nRenamed\n-\n\n6\n", id));
        let updated = service.get_todo(id).unwrap();
        assert_eq!(updated.title(), "Renamed");
        assert!(updated.description().is_none());

        let output = run_script(&service, &format!("4\n{}\n6\n", id));
        assert!(output.contains("Todo completed: Renamed"));
        assert!(service.get_todo(id).unwrap().is_completed());

        run_script(&service, &format!("5\n{}\n6\n", id));
        assert!(service.get_all_todos().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_and_malformed_ids() {
        let (service, _temp) = create_test_service();

        let output = run_script(
            &service,
            &format!("4\nnot-an-id\n5\n{}\n6\n", Uuid::new_v4()),
        );

        assert!(output.contains("Invalid ID format"));
        assert!(output.contains("Todo not found."));
    }

    #[test]
    fn test_invalid_choice_and_end_of_input() {
        let (service, _temp) = create_test_service();

        let output = run_script(&service, "9\n");

        assert!(output.contains("Invalid choice!"));
        assert!(output.contains("Goodbye!"));
    }
}
