//! Configuration validation.

use super::PipelineConfig;
use crate::error::{FlowError, Result};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &PipelineConfig) -> Result<()> {
    // Destination validation
    if config.export.driver.trim().is_empty() {
        return Err(FlowError::Config("export.driver is required".into()));
    }
    if config.export.url_protocol.is_empty() && config.export.url_options.is_empty() {
        return Err(FlowError::Config(
            "export.urlProtocol or export.urlOptions is required".into(),
        ));
    }
    if let Some(0) = config.export.export_batch_size {
        return Err(FlowError::Config(
            "export.exportBatchSize must be at least 1".into(),
        ));
    }

    if config.databases.is_empty() {
        return Err(FlowError::Config(
            "at least one entry in databases is required".into(),
        ));
    }

    let mut names = HashSet::new();
    for db in &config.databases {
        validate_database(db)?;

        // Per-entry destination files are derived from the name
        let key = db.name.to_lowercase().replace(' ', "_");
        if !names.insert(key) {
            return Err(FlowError::Config(format!(
                "duplicate database name '{}'",
                db.name
            )));
        }
    }

    Ok(())
}

fn validate_database(db: &super::SourceDatabase) -> Result<()> {
    if db.name.trim().is_empty() {
        return Err(FlowError::Config("databases[].name is required".into()));
    }
    if db.driver.trim().is_empty() {
        return Err(FlowError::Config(format!(
            "databases.{}.driver is required",
            db.name
        )));
    }
    if db.url.trim().is_empty() {
        return Err(FlowError::Config(format!(
            "databases.{}.url is required",
            db.name
        )));
    }
    if let Some(0) = db.fetch_size {
        return Err(FlowError::Config(format!(
            "databases.{}.fetchSize must be at least 1",
            db.name
        )));
    }
    if let Some(0) = db.max_text_length {
        return Err(FlowError::Config(format!(
            "databases.{}.maxTextLength must be at least 1",
            db.name
        )));
    }
    if db.imports.is_empty() {
        return Err(FlowError::Config(format!(
            "databases.{}.imports must not be empty",
            db.name
        )));
    }

    for import in &db.imports {
        if import.table.trim().is_empty() {
            return Err(FlowError::Config(format!(
                "databases.{}.imports[].table is required",
                db.name
            )));
        }
        if let Some(0) = import.fetch_size {
            return Err(FlowError::Config(format!(
                "databases.{}.imports.{}.fetchSize must be at least 1",
                db.name, import.table
            )));
        }
        if let Some(0) = import.batch_size {
            return Err(FlowError::Config(format!(
                "databases.{}.imports.{}.batchSize must be at least 1",
                db.name, import.table
            )));
        }
    }

    for script in &db.post_scripts {
        if script.label.trim().is_empty() {
            return Err(FlowError::Config(format!(
                "databases.{}.postScripts[].label is required",
                db.name
            )));
        }
        if script.sql.trim().is_empty() {
            return Err(FlowError::Config(format!(
                "databases.{}.postScripts.{}.sql is required",
                db.name, script.label
            )));
        }
    }

    Ok(())
}
