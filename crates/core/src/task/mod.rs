//! Task module
//!
//! This module contains the task entity, the repository contract and the
//! file-backed repository implementations.

mod file_store;
mod json_store;
mod model;
mod repository;
mod xml_store;

pub use json_store::JsonTaskStore;
pub use model::*;
pub use repository::TaskRepository;
pub use xml_store::XmlTaskStore;
