//! smartctl Process Adapter
//!
//! Implements the `DiagnosticExecutor` port by spawning the `smartctl`
//! binary from smartmontools.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::domain::ports::DiagnosticExecutor;
use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the smartctl executor
#[derive(Debug, Clone)]
pub struct SmartctlConfig {
    /// Path to the smartctl binary
    pub path: String,

    /// Per-invocation timeout
    pub timeout: Duration,

    /// Run through `sudo -n`
    pub use_sudo: bool,
}

impl Default for SmartctlConfig {
    fn default() -> Self {
        Self {
            path: "smartctl".to_string(),
            timeout: Duration::from_secs(30),
            use_sudo: false,
        }
    }
}

impl SmartctlConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::Config("smartctl path must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config(
                "smartctl timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Runs smartctl as a child process.
///
/// smartctl reports most conditions through a bitmask exit status while still
/// printing a complete JSON document, so a non-zero exit is only treated as a
/// failure when nothing was written to stdout.
#[derive(Debug, Clone)]
pub struct SmartctlExecutor {
    config: SmartctlConfig,
}

impl SmartctlExecutor {
    /// Create a new executor
    pub fn new(config: SmartctlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the executor configuration
    pub fn config(&self) -> &SmartctlConfig {
        &self.config
    }

    /// Build the program and argument vector for one invocation.
    fn command_line(&self, args: &str) -> (String, Vec<String>) {
        let tool_args = args.split_whitespace().map(str::to_string);

        if self.config.use_sudo {
            let mut argv = vec!["-n".to_string(), self.config.path.clone()];
            argv.extend(tool_args);
            ("sudo".to_string(), argv)
        } else {
            (self.config.path.clone(), tool_args.collect())
        }
    }

    async fn run(&self, args: &str) -> Result<Vec<u8>> {
        let (program, argv) = self.command_line(args);
        trace!("executing smartctl command: {} {}", program, argv.join(" "));

        let child = Command::new(&program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.timeout, child)
            .await
            .map_err(|_| Error::Timeout {
                args: args.to_string(),
                seconds: self.config.timeout.as_secs(),
            })?
            .map_err(|e| Error::Execution(format!("cannot run {}: {}", program, e)))?;

        if !output.status.success() && output.stdout.is_empty() {
            return Err(Error::Execution(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        trace!(
            "smartctl '{}' returned {} bytes (status {})",
            args,
            output.stdout.len(),
            output.status
        );

        Ok(output.stdout)
    }
}

#[async_trait]
impl DiagnosticExecutor for SmartctlExecutor {
    async fn execute(&self, args: &str, suppress_error_log: bool) -> Result<Vec<u8>> {
        let result = self.run(args).await;

        if let Err(ref e) = result {
            if suppress_error_log {
                debug!("smartctl '{}' failed: {}", args, e);
            } else {
                warn!("smartctl '{}' failed: {}", args, e);
            }
        }

        result
    }
}
