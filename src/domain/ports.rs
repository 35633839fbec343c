//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the abstractions the collector depends on.
//! Infrastructure adapters implement these traits to provide concrete
//! implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │        DiagnosticExecutor │ Clock                    │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │     SmartctlExecutor │ ScriptedExecutor              │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// Device identifier as reported by enumeration (e.g. `/dev/sda`).
///
/// Equality is by name. Identity for deduplication is the serial number
/// reported once the device has been queried.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle {
    pub name: String,
}

impl DeviceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<String> for DeviceHandle {
    fn from(name: String) -> Self {
        Self { name }
    }
}

impl From<&str> for DeviceHandle {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

// =============================================================================
// Diagnostic Executor Port
// =============================================================================

/// Port for running the external diagnostic tool.
///
/// `args` is the whitespace-separated argument string passed to the tool
/// (e.g. `-a /dev/sda -d megaraid,0 -j`). Implementations return the raw
/// tool output on success. Process exit codes are not interpreted by the
/// collector; the tool's JSON status block is.
///
/// # Example
///
/// ```ignore
/// struct RemoteExecutor { /* ... */ }
///
/// #[async_trait]
/// impl DiagnosticExecutor for RemoteExecutor {
///     async fn execute(&self, args: &str, suppress_error_log: bool) -> Result<Vec<u8>> {
///         // Run smartctl somewhere and return its stdout
///     }
/// }
/// ```
#[async_trait]
pub trait DiagnosticExecutor: Send + Sync {
    /// Run the tool with `args` and return its raw output.
    ///
    /// When `suppress_error_log` is set, failures are expected by the caller
    /// and should not be logged above debug level.
    async fn execute(&self, args: &str, suppress_error_log: bool) -> Result<Vec<u8>>;
}

// =============================================================================
// Clock Port
// =============================================================================

/// Source of wall-clock time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
