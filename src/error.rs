//! Error type shared by the device adapter, the data layer and the plotter.
//!
//! Library code returns [`Result`]; the loaders and binaries wrap it in
//! `anyhow` with file-level context.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The automation layer rejected a call.
    #[error("Driver error during {operation}: {message}")]
    Driver {
        operation: &'static str,
        message: String,
    },

    #[error("No driver registered for program id '{0}'")]
    DriverNotFound(String),

    /// The busy flag never cleared within the bounded wait.
    #[error("Device unresponsive: still busy after {waited:?}")]
    DeviceUnresponsive { waited: Duration },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown colormap '{name}' (known: {known})")]
    UnknownColormap { name: String, known: String },

    #[error("Incorrect data format: {0}")]
    DataFormat(String),

    #[error("Scan '{scan_id}' has no recognized data field (tried {tried})")]
    NoRecognizedDataField { scan_id: String, tried: String },

    #[error("Scan '{scan_id}' has no numeric value at '{path}'")]
    MissingSweepValue { scan_id: String, path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn driver(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Driver {
            operation,
            message: message.into(),
        }
    }
}
