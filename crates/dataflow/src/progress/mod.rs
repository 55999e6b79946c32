//! Progress reporting for copy runs.
//!
//! The engine emits [`ProgressEvent`]s to a [`ProgressSink`]. The console
//! sink renders them for humans on stdout; the JSON sink writes one object
//! per line, suitable for piping to other tools.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};

use serde::Serialize;
use tracing::warn;

/// Something that happened during a copy run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Source database identified.
    DatabaseInfo {
        database: String,
        product: String,
        version: Option<String>,
    },
    /// A table copy is starting.
    TableStarted { table: String },
    /// The destination table was created.
    TableCreated { table: String, ddl: String },
    /// A batch was committed; `rows` is the running total for the table.
    BatchCommitted { table: String, rows: u64 },
    /// A table copy finished.
    TableFinished { table: String, rows: u64 },
    /// A post script is starting.
    ScriptStarted { label: String },
    /// A post script finished.
    ScriptFinished { label: String },
}

/// Receives progress events.
pub trait ProgressSink {
    fn report(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

/// Format a count with thousands separators (`25000` -> `25,000`).
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Human-readable progress. Running counts overwrite one line using a
/// carriage return.
pub struct ConsoleProgress<W: Write = io::Stdout> {
    out: RefCell<W>,
    mid_line: Cell<bool>,
}

impl ConsoleProgress<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            mid_line: Cell::new(false),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn line(&self, out: &mut W, text: &str) -> io::Result<()> {
        if self.mid_line.replace(false) {
            writeln!(out)?;
        }
        writeln!(out, "{}", text)
    }

    fn render(&self, event: &ProgressEvent) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        match event {
            ProgressEvent::DatabaseInfo {
                product, version, ..
            } => {
                self.line(&mut out, &format!("Database product: {}", product))?;
                if let Some(version) = version {
                    self.line(&mut out, &format!("Database version: {}", version))?;
                }
            }
            ProgressEvent::TableStarted { table } => {
                self.line(&mut out, &format!("Importing {}...", table))?;
            }
            ProgressEvent::TableCreated { table, .. } => {
                self.line(&mut out, &format!("Created table {}", table))?;
            }
            ProgressEvent::BatchCommitted { rows, .. } => {
                write!(out, "\rExported {} records so far...", format_count(*rows))?;
                self.mid_line.set(true);
            }
            ProgressEvent::TableFinished { table, rows } => {
                self.line(
                    &mut out,
                    &format!("Processed {} record(s) from {}", format_count(*rows), table),
                )?;
            }
            ProgressEvent::ScriptStarted { label } => {
                self.line(&mut out, &format!("Running script: {}...", label))?;
            }
            ProgressEvent::ScriptFinished { label } => {
                self.line(&mut out, &format!("{} complete", label))?;
            }
        }
        out.flush()
    }
}

impl<W: Write> ProgressSink for ConsoleProgress<W> {
    fn report(&self, event: &ProgressEvent) {
        if let Err(e) = self.render(event) {
            warn!("Failed to write progress: {}", e);
        }
    }
}

/// JSON lines progress, one event object per line.
pub struct JsonProgress<W: Write = io::Stderr> {
    out: RefCell<W>,
}

impl JsonProgress<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> ProgressSink for JsonProgress<W> {
    fn report(&self, event: &ProgressEvent) {
        let mut out = self.out.borrow_mut();
        let result = serde_json::to_string(event)
            .map_err(io::Error::from)
            .and_then(|json| writeln!(out, "{}", json));
        if let Err(e) = result {
            warn!("Failed to write progress: {}", e);
        }
    }
}
