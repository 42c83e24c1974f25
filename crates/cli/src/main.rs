//! Console entry point for the todo manager
//!
//! Exit codes: 0 normal exit, 1 configuration error, 2 storage could not be
//! opened, 3 anything failing while the menu runs.

mod menu;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_core::config::{DEFAULT_CONFIG_FILE, STORAGE_FILE_ENV, STORAGE_TYPE_ENV};
use todo_core::{create_repository, Settings, StorageType, TodoService};

use crate::menu::Menu;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage todo items stored in a JSON or XML file")]
struct Cli {
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE, help = "Path to the JSON config file")]
    config: PathBuf,

    #[arg(long, env = STORAGE_TYPE_ENV, help = "Storage backend (json or xml), overrides the config file")]
    storage_type: Option<StorageType>,

    #[arg(long, env = STORAGE_FILE_ENV, help = "Storage file path, overrides the config file")]
    storage_file: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> todo_core::Result<Settings> {
        let mut settings = Settings::load(&self.config)?;
        if let Some(storage_type) = self.storage_type {
            settings.storage_type = storage_type;
        }
        if let Some(storage_file) = &self.storage_file {
            settings.storage_file = storage_file.clone();
        }
        Ok(settings)
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo=info,todo_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{} {}", "Configuration error:".red(), err);
            return ExitCode::from(1);
        }
    };

    tracing::info!(
        "Using {} storage at {}",
        settings.storage_type,
        settings.storage_file.display()
    );

    let repository = match create_repository(&settings) {
        Ok(repository) => repository,
        Err(err) => {
            eprintln!("{} {}", "Repository creation failed:".red(), err);
            return ExitCode::from(2);
        }
    };

    let service = TodoService::new(repository);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut menu = Menu::new(&service, stdin.lock(), stdout.lock());

    match menu.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Console failed: {:#}", err);
            eprintln!("{} {:#}", "System error:".red(), err);
            ExitCode::from(3)
        }
    }
}
