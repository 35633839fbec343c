//! smartctl Version Gate
//!
//! Re-validates at most once per check window that the installed smartctl
//! meets the minimum supported version.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use super::types::VersionResponse;
use crate::domain::ports::{Clock, DiagnosticExecutor, SystemClock};
use crate::error::{Error, Result};

/// Minimum supported smartctl release as (major, minor)
pub const MINIMUM_VERSION: (u32, u32) = (7, 1);

/// Hours between version checks
pub const CHECK_INTERVAL_HOURS: i64 = 24;

const VERSION_ARGS: &str = "-j -V";

static GLOBAL: Lazy<Arc<VersionGate>> =
    Lazy::new(|| Arc::new(VersionGate::new(Arc::new(SystemClock))));

/// Cached smartctl version check
pub struct VersionGate {
    clock: Arc<dyn Clock>,
    interval: Duration,
    last_check: Mutex<Option<DateTime<Utc>>>,
}

impl VersionGate {
    /// Create a gate that has never checked.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            interval: Duration::hours(CHECK_INTERVAL_HOURS),
            last_check: Mutex::new(None),
        }
    }

    /// Create a gate whose last check happened at `last_check`.
    pub fn with_last_check(clock: Arc<dyn Clock>, last_check: DateTime<Utc>) -> Self {
        let gate = Self::new(clock);
        *gate.last_check.lock() = Some(last_check);
        gate
    }

    /// Process-wide gate backed by the system clock.
    pub fn global() -> Arc<VersionGate> {
        Arc::clone(&GLOBAL)
    }

    /// When the last check attempt started
    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        *self.last_check.lock()
    }

    /// Returns true, and marks the gate as checked now, if a check is due.
    pub fn check_needed(&self) -> bool {
        let now = self.clock.now();
        let mut last_check = self.last_check.lock();

        let due = match *last_check {
            None => true,
            Some(last) => now > last + self.interval,
        };

        if due {
            *last_check = Some(now);
        }

        due
    }

    /// Verify the installed smartctl version if the cached result is stale.
    #[instrument(skip(self, executor))]
    pub async fn ensure_version(&self, executor: &dyn DiagnosticExecutor) -> Result<()> {
        if !self.check_needed() {
            return Ok(());
        }

        let raw = executor.execute(VERSION_ARGS, true).await?;
        let response: VersionResponse = serde_json::from_slice(&raw)?;

        debug!("smartctl reports version {:?}", response.smartctl.version);
        evaluate_version(&response.smartctl.version)
    }
}

impl std::fmt::Debug for VersionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionGate")
            .field("interval", &self.interval)
            .field("last_check", &self.last_check())
            .finish()
    }
}

/// Check the version digits against [`MINIMUM_VERSION`].
///
/// A single digit is read as `major.0`.
pub fn evaluate_version(digits: &[u32]) -> Result<()> {
    let (major, minor) = match digits {
        [] => return Err(Error::InvalidVersion),
        [major] => (*major, None),
        [major, minor, ..] => (*major, Some(*minor)),
    };

    if (major, minor.unwrap_or(0)) < MINIMUM_VERSION {
        let found = match minor {
            Some(minor) => format!("{}.{}", major, minor),
            None => major.to_string(),
        };
        return Err(Error::UnsupportedVersion {
            found,
            minimum: format!("{}.{}", MINIMUM_VERSION.0, MINIMUM_VERSION.1),
        });
    }

    Ok(())
}
