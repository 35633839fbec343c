//! Error types for the S.M.A.R.T. collector

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while collecting S.M.A.R.T. telemetry
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Diagnostic Tool Errors
    // =========================================================================
    /// The diagnostic tool could not be run or exited without output
    #[error("Failed to execute smartctl: {0}")]
    Execution(String),

    /// The diagnostic tool did not answer within the configured timeout
    #[error("smartctl '{args}' timed out after {seconds}s")]
    Timeout { args: String, seconds: u64 },

    /// Tool output did not match the expected JSON shape
    #[error("Cannot unmarshal JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The tool ran but reported an internal failure in its JSON status block
    #[error("Smartctl failed to get device data: {0}")]
    ToolReported(String),

    /// Device enumeration failed
    #[error("Failed to scan for {scope}devices: {source}")]
    Scan {
        scope: &'static str,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Version Gate Errors
    // =========================================================================
    /// The tool reported an empty version sequence
    #[error("Invalid smartctl version")]
    InvalidVersion,

    /// The installed tool is older than the supported minimum
    #[error("Incorrect smartctl version {found}, must be {minimum} or higher")]
    UnsupportedVersion { found: String, minimum: String },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an enumeration failure for the unrestricted scan.
    pub(crate) fn scan(source: Error) -> Self {
        Error::Scan {
            scope: "",
            source: Box::new(source),
        }
    }

    /// Wrap an enumeration failure for the `sat`-restricted scan.
    pub(crate) fn sat_scan(source: Error) -> Self {
        Error::Scan {
            scope: "sat ",
            source: Box::new(source),
        }
    }

    /// Check whether this error originated from the version gate.
    pub fn is_version_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidVersion | Error::UnsupportedVersion { .. }
        )
    }
}
