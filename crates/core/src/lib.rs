//! Core library for the file-backed todo manager
//!
//! This crate contains:
//! - The task entity and its validation rules
//! - The task repository contract with JSON and XML file stores
//! - Storage settings and repository selection
//! - The todo application service

pub mod config;
pub mod error;
pub mod service;
pub mod task;

pub use config::{create_repository, Settings, StorageType};
pub use error::Error;
pub use service::TodoService;
pub type Result<T> = std::result::Result<T, Error>;
