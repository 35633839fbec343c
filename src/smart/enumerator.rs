//! Device Enumerator
//!
//! Discovers devices with two smartctl scans: an unrestricted one, and one
//! restricted to the `sat` interface. Names only the restricted scan finds
//! are candidates for RAID member probing.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::types::ScanResponse;
use crate::domain::ports::{DeviceHandle, DiagnosticExecutor};
use crate::error::{Error, Result};

const SCAN_ARGS: &str = "--scan -j";
const SAT_SCAN_ARGS: &str = "--scan -d sat -j";

/// Output of device enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Devices found by the unrestricted scan
    pub basic: Vec<DeviceHandle>,
    /// Devices only the `sat` scan found
    pub raid_candidates: Vec<DeviceHandle>,
}

/// Enumerates devices through smartctl scans
pub struct DeviceEnumerator {
    executor: Arc<dyn DiagnosticExecutor>,
}

impl DeviceEnumerator {
    pub fn new(executor: Arc<dyn DiagnosticExecutor>) -> Self {
        Self { executor }
    }

    /// Run both scans. Any invocation or decode failure aborts enumeration.
    #[instrument(skip(self))]
    pub async fn enumerate(&self) -> Result<Enumeration> {
        let basic = self.scan(SCAN_ARGS).await.map_err(Error::scan)?;
        let hinted = self.scan(SAT_SCAN_ARGS).await.map_err(Error::sat_scan)?;
        let raid_candidates = exclude_known(&basic, hinted);

        debug!(
            "enumerated {} devices, {} RAID candidates",
            basic.len(),
            raid_candidates.len()
        );

        Ok(Enumeration {
            basic,
            raid_candidates,
        })
    }

    async fn scan(&self, args: &str) -> Result<Vec<DeviceHandle>> {
        let raw = self.executor.execute(args, false).await?;
        let response: ScanResponse = serde_json::from_slice(&raw)?;

        Ok(response
            .devices
            .into_iter()
            .map(|device| DeviceHandle::from(device.name))
            .collect())
    }
}

impl std::fmt::Debug for DeviceEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEnumerator").finish_non_exhaustive()
    }
}

/// Remove from `hinted` every name already present in `basic`.
pub fn exclude_known(basic: &[DeviceHandle], hinted: Vec<DeviceHandle>) -> Vec<DeviceHandle> {
    let known: HashSet<&str> = basic.iter().map(DeviceHandle::as_str).collect();
    hinted
        .into_iter()
        .filter(|device| !known.contains(device.as_str()))
        .collect()
}
