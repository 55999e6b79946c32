//! Configuration type definitions for a copy job description.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of rows per committed insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default number of rows per source fetch (row-set buffer size).
pub const DEFAULT_FETCH_SIZE: usize = 10_000;

/// Default cap, in bytes, for a single text cell in the source row-set buffer.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 65_536;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Process-wide options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalConfig>,

    /// Destination database configuration.
    pub export: DestinationConfig,

    /// Source databases, processed in declared order.
    pub databases: Vec<SourceDatabase>,
}

/// Process-wide options applied once at start-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Directories appended to the executable search path (e.g. driver manager libs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_supplement: Option<String>,
}

/// Destination database configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationConfig {
    /// ODBC driver name (e.g. "PostgreSQL Unicode", "SQLite3").
    pub driver: String,

    /// Leading part of the connection string.
    #[serde(default)]
    pub url_protocol: String,

    /// Trailing part of the connection string.
    #[serde(default)]
    pub url_options: String,

    /// Folder for file-based destinations; one database per source entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,

    /// Username.
    #[serde(default)]
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SQL executed once right after connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_setup_commands: Option<String>,

    /// Rows per committed insert batch (default: 10000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_batch_size: Option<usize>,
}

impl DestinationConfig {
    /// Effective batch size for an import: the import override, else this
    /// destination's batch size, else the default.
    pub fn batch_size_for(&self, import: &ImportJob) -> usize {
        import
            .batch_size
            .or(self.export_batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Output folder, treating an empty string as unset.
    pub fn output_folder(&self) -> Option<&str> {
        self.output_folder.as_deref().filter(|f| !f.is_empty())
    }
}

impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("driver", &self.driver)
            .field("url_protocol", &self.url_protocol)
            .field("url_options", &self.url_options)
            .field("output_folder", &self.output_folder)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("sql_setup_commands", &self.sql_setup_commands)
            .field("export_batch_size", &self.export_batch_size)
            .finish()
    }
}

/// A named source database and what to copy out of it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDatabase {
    /// Entry name; also names the per-entry destination file.
    pub name: String,

    /// ODBC driver name.
    pub driver: String,

    /// Connection string (without driver and credentials).
    pub url: String,

    /// Username.
    #[serde(default)]
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SQL executed once right after connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_setup_commands: Option<String>,

    /// Default fetch size for this entry's imports (default: 10000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_size: Option<usize>,

    /// Cap for a single text cell in the row-set buffer (default: 65536 bytes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_text_length: Option<usize>,

    /// Tables to copy, in order.
    pub imports: Vec<ImportJob>,

    /// Scripts run against the destination after all imports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_scripts: Vec<PostScript>,
}

impl SourceDatabase {
    /// Effective fetch size for an import.
    pub fn fetch_size_for(&self, import: &ImportJob) -> usize {
        import
            .fetch_size
            .or(self.fetch_size)
            .unwrap_or(DEFAULT_FETCH_SIZE)
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length.unwrap_or(DEFAULT_MAX_TEXT_LENGTH)
    }
}

impl fmt::Debug for SourceDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDatabase")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("sql_setup_commands", &self.sql_setup_commands)
            .field("fetch_size", &self.fetch_size)
            .field("max_text_length", &self.max_text_length)
            .field("imports", &self.imports)
            .field("post_scripts", &self.post_scripts)
            .finish()
    }
}

/// One table to copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    /// Table name, used verbatim on both sides.
    pub table: String,

    /// Custom source query (default: every column of `table`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Source fetch size override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_size: Option<usize>,

    /// Destination batch size override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

impl ImportJob {
    /// Create an import of every column of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            query: None,
            fetch_size: None,
            batch_size: None,
        }
    }

    /// The query streamed from the source.
    pub fn select_sql(&self) -> String {
        match &self.query {
            Some(query) if !query.trim().is_empty() => query.clone(),
            _ => format!("SELECT * FROM {}", self.table),
        }
    }
}

/// A labeled SQL statement run after the imports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostScript {
    /// Shown in progress output.
    pub label: String,

    /// Statement executed against the destination.
    pub sql: String,
}
