//! Labeled SQL scripts run against the destination after all imports.

use tracing::info;

use crate::config::PostScript;
use crate::core::Connection;
use crate::error::{FlowError, Result};
use crate::progress::{ProgressEvent, ProgressSink};

/// Runs post scripts in list order.
pub struct PostScriptRunner<'a> {
    destination: &'a dyn Connection,
    progress: &'a dyn ProgressSink,
}

impl<'a> PostScriptRunner<'a> {
    pub fn new(destination: &'a dyn Connection, progress: &'a dyn ProgressSink) -> Self {
        Self {
            destination,
            progress,
        }
    }

    /// Execute each script. The first failure stops the run and the
    /// remaining scripts are skipped. Returns how many scripts ran.
    pub fn run(&self, scripts: &[PostScript]) -> Result<usize> {
        for script in scripts {
            info!("Running post script: {}", script.label);
            self.progress.report(&ProgressEvent::ScriptStarted {
                label: script.label.clone(),
            });

            self.destination
                .execute(&script.sql)
                .map_err(|e| FlowError::post_script(&script.label, e))?;

            self.progress.report(&ProgressEvent::ScriptFinished {
                label: script.label.clone(),
            });
        }
        Ok(scripts.len())
    }
}
