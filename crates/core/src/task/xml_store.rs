//! XML file task store
//!
//! Document layout:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <todos>
//!   <todo>
//!     <id>…</id>
//!     <title>…</title>
//!     <description>…</description>   <!-- omitted when absent -->
//!     <due_date>…</due_date>         <!-- omitted when absent -->
//!     <completed>true|false</completed>
//!     <created_at>…</created_at>
//!     <updated_at>…</updated_at>
//!   </todo>
//! </todos>
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use uuid::Uuid;

use super::file_store::{ensure_file_exists, read_file, write_file};
use super::model::{NewTask, Task};
use super::repository::TaskRepository;
use crate::error::FileFormat;
use crate::{Error, Result};

const ROOT_TAG: &str = "todos";
const TASK_TAG: &str = "todo";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const EMPTY_DOCUMENT: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<todos/>\n";

/// One child element of a `<todo>`
#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlField {
    name: String,
    /// `None` for `<tag/>` and `<tag></tag>`
    text: Option<String>,
}

/// One `<todo>` element, children kept in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct XmlRecord {
    fields: Vec<XmlField>,
}

impl XmlRecord {
    fn from_task(task: &Task) -> Self {
        let mut record = Self::default();
        record.push("id", task.id().to_string());
        record.push("title", task.title().to_string());
        if let Some(description) = task.description() {
            record.push("description", description.to_string());
        }
        if let Some(due_date) = task.due_date() {
            record.push("due_date", format_timestamp(due_date));
        }
        record.push("completed", task.is_completed().to_string());
        record.push("created_at", format_timestamp(task.created_at()));
        record.push("updated_at", format_timestamp(task.updated_at()));
        record
    }

    fn push(&mut self, name: &str, text: String) {
        self.fields.push(XmlField {
            name: name.to_string(),
            text: Some(text),
        });
    }

    fn field(&self, name: &str) -> Option<&XmlField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Text of an optional child; an empty element counts as absent
    fn optional_text(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(|field| field.text.as_deref())
            .filter(|text| !text.is_empty())
    }

    fn required_text(&self, name: &str) -> std::result::Result<&str, String> {
        let field = self
            .field(name)
            .ok_or_else(|| format!("Missing required '{}' element", name))?;
        field
            .text
            .as_deref()
            .filter(|text| !text.is_empty())
            .ok_or_else(|| format!("Missing text content in '{}' element", name))
    }

    fn id(&self) -> Option<Uuid> {
        self.optional_text("id")
            .and_then(|text| Uuid::parse_str(text.trim()).ok())
    }

    fn label(&self, index: usize) -> String {
        match self.optional_text("id") {
            Some(id) => id.to_string(),
            None => format!("#{}", index),
        }
    }

    fn to_task(&self, index: usize) -> Result<Task> {
        self.convert()
            .map_err(|message| Error::conversion(self.label(index), message))
    }

    fn convert(&self) -> std::result::Result<Task, String> {
        let id_text = self.required_text("id")?;
        let title = self.required_text("title")?;
        let completed = self.required_text("completed")?;
        let created_at = self.required_text("created_at")?;
        let updated_at = self.required_text("updated_at")?;

        let id = Uuid::parse_str(id_text.trim())
            .map_err(|e| format!("Invalid 'id' value '{}': {}", id_text, e))?;
        let due_date = self
            .optional_text("due_date")
            .map(|text| parse_timestamp("due_date", text))
            .transpose()?;

        NewTask::new(title)
            .with_id(id)
            .with_optional_description(self.optional_text("description").map(str::to_string))
            .with_optional_due_date(due_date)
            .with_completed(completed.trim().eq_ignore_ascii_case("true"))
            .with_created_at(parse_timestamp("created_at", created_at)?)
            .with_updated_at(parse_timestamp("updated_at", updated_at)?)
            .restore()
            .map_err(|violations| violations.join("; "))
    }
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(field: &str, text: &str) -> std::result::Result<NaiveDateTime, String> {
    text.trim()
        .parse::<NaiveDateTime>()
        .map_err(|e| format!("Invalid '{}' value '{}': {}", field, text, e))
}

fn element_name(start: &BytesStart<'_>) -> std::result::Result<String, String> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| format!("Element name is not UTF-8: {}", e))
}

/// Parse a document into its `<todo>` records
///
/// Children of the root other than `<todo>` are skipped, as is anything
/// nested inside a field element.
fn parse_document(content: &str) -> std::result::Result<Vec<XmlRecord>, String> {
    let mut reader = Reader::from_str(content);
    let mut records = Vec::new();
    let mut current: Option<XmlRecord> = None;
    let mut field: Option<XmlField> = None;
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{} (at byte {})", e, reader.buffer_position()))?;

        match event {
            Event::Start(start) => {
                let name = element_name(&start)?;
                match depth {
                    0 if seen_root => return Err("Multiple root elements".to_string()),
                    0 => seen_root = true,
                    1 if name == TASK_TAG => current = Some(XmlRecord::default()),
                    2 if current.is_some() => field = Some(XmlField { name, text: None }),
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                match depth {
                    0 if seen_root => return Err("Multiple root elements".to_string()),
                    0 => seen_root = true,
                    1 if name == TASK_TAG => records.push(XmlRecord::default()),
                    2 => {
                        if let Some(record) = current.as_mut() {
                            record.fields.push(XmlField { name, text: None });
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "Closing tag without an open element".to_string())?;
                match depth {
                    1 => {
                        if let Some(record) = current.take() {
                            records.push(record);
                        }
                    }
                    2 => {
                        if let (Some(done), Some(record)) = (field.take(), current.as_mut()) {
                            record.fields.push(done);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err("Text outside of the root element".to_string());
                }
                if depth == 3 {
                    if let Some(open) = field.as_mut() {
                        open.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            Event::CData(data) => {
                if depth == 0 {
                    return Err("CDATA outside of the root element".to_string());
                }
                if depth == 3 {
                    if let Some(open) = field.as_mut() {
                        let text = std::str::from_utf8(&data)
                            .map_err(|e| format!("CDATA is not UTF-8: {}", e))?;
                        open.text.get_or_insert_with(String::new).push_str(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err("Missing root element".to_string());
    }
    if depth != 0 {
        return Err("Unexpected end of document, unclosed elements".to_string());
    }
    Ok(records)
}

fn render_document(records: &[XmlRecord]) -> quick_xml::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    if records.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(ROOT_TAG)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(ROOT_TAG)))?;
        for record in records {
            writer.write_event(Event::Start(BytesStart::new(TASK_TAG)))?;
            for field in &record.fields {
                let name = field.name.as_str();
                match &field.text {
                    Some(text) => {
                        writer.write_event(Event::Start(BytesStart::new(name)))?;
                        writer.write_event(Event::Text(BytesText::new(text)))?;
                        writer.write_event(Event::End(BytesEnd::new(name)))?;
                    }
                    None => writer.write_event(Event::Empty(BytesStart::new(name)))?,
                }
            }
            writer.write_event(Event::End(BytesEnd::new(TASK_TAG)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;
    }

    let mut content = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    content.push('\n');
    Ok(content)
}

/// File-based task store using XML
pub struct XmlTaskStore {
    /// Path to the XML file
    path: PathBuf,
}

impl XmlTaskStore {
    /// Create a new XmlTaskStore
    ///
    /// A missing or zero-length file is initialized with an empty root element.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_file_exists(&path, EMPTY_DOCUMENT)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<XmlRecord>> {
        let content = read_file(&self.path)?;
        parse_document(&content).map_err(|message| Error::Format {
            format: FileFormat::Xml,
            path: self.path.clone(),
            message,
        })
    }

    fn persist(&self, records: &[XmlRecord]) -> Result<()> {
        let content = render_document(records).map_err(|e| Error::Format {
            format: FileFormat::Xml,
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        write_file(&self.path, &content)
    }

    fn position(records: &[XmlRecord], id: Uuid) -> Option<usize> {
        records.iter().position(|record| record.id() == Some(id))
    }
}

impl TaskRepository for XmlTaskStore {
    fn save(&self, task: &Task) -> Result<()> {
        let mut records = self.load()?;
        let record = XmlRecord::from_task(task);

        match Self::position(&records, task.id()) {
            Some(index) => records[index] = record,
            None => records.push(record),
        }

        self.persist(&records)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let records = self.load()?;
        Self::position(&records, id)
            .map(|index| records[index].to_task(index))
            .transpose()
    }

    fn find_all(&self) -> Result<Vec<Task>> {
        let records = self.load()?;
        records
            .iter()
            .enumerate()
            .map(|(index, record)| record.to_task(index))
            .collect()
    }

    fn update(&self, task: &Task) -> Result<()> {
        let mut records = self.load()?;
        let index =
            Self::position(&records, task.id()).ok_or(Error::TaskNotFound(task.id()))?;

        records[index] = XmlRecord::from_task(task);
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
