//! CLI command implementations

pub mod check_config;
pub mod login;
pub mod user;
pub mod users;

use crate::OutputFormat;
use anyhow::{Context, Result};
use archiva_core::ArchivaConfig;
use archiva_metadata::MetadataStore;

/// Context passed to all commands
pub struct CommandContext {
    pub config: ArchivaConfig,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg);
    }

    /// Open the local user store
    pub async fn open_store(&self) -> Result<MetadataStore> {
        let db = &self.config.database;
        MetadataStore::new(&db.url, db.max_connections)
            .await
            .with_context(|| format!("Failed to open database {}", db.url))
    }
}
