//! Connection management for one source entry and the destination.
//!
//! [`ConnectionManager`] resolves the destination address for a source entry,
//! opens both connections through a [`Connector`] and runs the configured
//! setup SQL. The resulting [`ConnectionPair`] owns both connections; they
//! are closed when it is dropped.

pub mod odbc;

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::config::{DestinationConfig, SourceDatabase};
use crate::core::{Connection, Connector};
use crate::error::{FlowError, Result};

/// Address and credentials of one database.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Driver name as registered with the driver manager.
    pub driver: String,

    /// Connection string attributes (`Key=Value;...`) without driver and credentials.
    pub url: String,

    pub username: String,
    pub password: String,
}

impl Endpoint {
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            url: url.into(),
            username: String::new(),
            password: String::new(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Full ODBC connection string: driver, then the URL attributes, then
    /// credentials when set.
    pub fn connection_string(&self) -> String {
        let mut out = format!("Driver={};", braced(&self.driver));
        let url = self.url.trim();
        if !url.is_empty() {
            out.push_str(url);
            if !url.ends_with(';') {
                out.push(';');
            }
        }
        if !self.username.is_empty() {
            out.push_str(&format!("UID={};", attribute_value(&self.username)));
        }
        if !self.password.is_empty() {
            out.push_str(&format!("PWD={};", attribute_value(&self.password)));
        }
        out
    }

    /// Description safe to show in logs and errors.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.driver, self.url)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Wrap a value in braces, doubling any closing brace.
fn braced(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

/// Brace a connection string attribute value only when it needs it.
fn attribute_value(value: &str) -> String {
    let needs_braces = value.contains([';', '{', '}', '='])
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_braces {
        braced(value)
    } else {
        value.to_string()
    }
}

/// Destination connection string attributes for a source entry.
///
/// With an output folder each source entry gets its own destination:
/// `protocol + folder + lowercase(name with spaces as underscores) + "-import" + options`.
/// Without one every entry shares `protocol + options`.
pub fn destination_url(destination: &DestinationConfig, source_name: &str) -> String {
    match destination.output_folder() {
        Some(folder) => format!(
            "{}{}{}-import{}",
            destination.url_protocol,
            folder,
            source_name.to_lowercase().replace(' ', "_"),
            destination.url_options
        ),
        None => format!("{}{}", destination.url_protocol, destination.url_options),
    }
}

/// Both open connections for one source entry.
pub struct ConnectionPair {
    pub source: Box<dyn Connection>,
    pub destination: Box<dyn Connection>,
    /// Resolved destination connection string attributes.
    pub destination_url: String,
}

impl fmt::Debug for ConnectionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPair")
            .field("destination_url", &self.destination_url)
            .finish_non_exhaustive()
    }
}

/// Opens connection pairs for source entries.
pub struct ConnectionManager<'a> {
    connector: &'a dyn Connector,
    destination: &'a DestinationConfig,
}

impl<'a> ConnectionManager<'a> {
    /// Create a manager, creating the destination output folder when one is configured.
    pub fn new(connector: &'a dyn Connector, destination: &'a DestinationConfig) -> Result<Self> {
        if let Some(folder) = destination.output_folder() {
            if !Path::new(folder).is_dir() {
                debug!("Creating output folder {}", folder);
            }
            std::fs::create_dir_all(folder)?;
        }
        Ok(Self {
            connector,
            destination,
        })
    }

    /// Destination endpoint for a source entry.
    pub fn destination_endpoint(&self, source_name: &str) -> Endpoint {
        Endpoint::new(
            &self.destination.driver,
            destination_url(self.destination, source_name),
        )
        .with_credentials(&self.destination.username, &self.destination.password)
    }

    /// Open the source then the destination, then run source setup SQL then
    /// destination setup SQL.
    pub fn open(&self, source: &SourceDatabase) -> Result<ConnectionPair> {
        let source_endpoint = source_endpoint(source);
        let destination_endpoint = self.destination_endpoint(&source.name);

        let source_conn = self
            .connector
            .connect(&source_endpoint)
            .map_err(|e| FlowError::connection(format!("source '{}'", source.name), e))?;
        info!("Connected to source {}", source_endpoint.describe());

        let destination_conn = self
            .connector
            .connect(&destination_endpoint)
            .map_err(|e| FlowError::connection("destination", e))?;
        info!("Connected to destination {}", destination_endpoint.describe());

        run_setup(
            source_conn.as_ref(),
            source.sql_setup_commands.as_deref(),
            &format!("source '{}'", source.name),
        )?;
        run_setup(
            destination_conn.as_ref(),
            self.destination.sql_setup_commands.as_deref(),
            "destination",
        )?;

        Ok(ConnectionPair {
            source: source_conn,
            destination: destination_conn,
            destination_url: destination_endpoint.url,
        })
    }
}

/// Endpoint of a source entry.
pub fn source_endpoint(source: &SourceDatabase) -> Endpoint {
    Endpoint::new(&source.driver, &source.url).with_credentials(&source.username, &source.password)
}

fn run_setup(conn: &dyn Connection, sql: Option<&str>, target: &str) -> Result<()> {
    let Some(sql) = sql.filter(|s| !s.trim().is_empty()) else {
        return Ok(());
    };
    debug!("Running setup SQL on {}", target);
    conn.execute(sql).map_err(|e| FlowError::setup(target, e))
}
