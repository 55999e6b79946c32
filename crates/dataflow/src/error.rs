//! Error types for the copy pipeline.

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Configuration error (invalid file, missing fields, bad sizes, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opening a connection failed
    #[error("Connection to {target} failed: {message}")]
    Connection { target: String, message: String },

    /// A setup SQL statement failed right after connecting
    #[error("Setup SQL on {target} failed: {message}")]
    Setup { target: String, message: String },

    /// Destination table could not be described or created
    #[error("Schema error for table {table}: {message}")]
    Schema { table: String, message: String },

    /// Streaming or batch insert failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// A post-copy script failed
    #[error("Post script '{label}' failed: {message}")]
    PostScript { label: String, message: String },

    /// Driver manager or driver error without more specific context
    #[error("ODBC error: {0}")]
    Odbc(#[from] odbc_api::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// Create a Connection error for the given target description.
    pub fn connection(target: impl Into<String>, message: impl ToString) -> Self {
        FlowError::Connection {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a Setup error.
    pub fn setup(target: impl Into<String>, message: impl ToString) -> Self {
        FlowError::Setup {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a Schema error.
    pub fn schema(table: impl Into<String>, message: impl ToString) -> Self {
        FlowError::Schema {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transfer error.
    pub fn transfer(table: impl Into<String>, message: impl ToString) -> Self {
        FlowError::Transfer {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a PostScript error.
    pub fn post_script(label: impl Into<String>, message: impl ToString) -> Self {
        FlowError::PostScript {
            label: label.into(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            FlowError::Config(_) | FlowError::Yaml(_) | FlowError::Json(_) => 1,
            FlowError::Connection { .. } | FlowError::Setup { .. } => 2,
            FlowError::Schema { .. } => 3,
            FlowError::Transfer { .. } => 4,
            FlowError::PostScript { .. } => 5,
            FlowError::Odbc(_) => 6,
            FlowError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FlowError>;
