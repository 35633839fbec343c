//! Result Aggregator
//!
//! Shared accumulator for both query passes. One mutex guards the result
//! container, the serial-number dedup set and the incomplete list.

use std::collections::{BTreeMap, HashSet};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::types::DeviceRecord;
use crate::domain::ports::DeviceHandle;

// =============================================================================
// Output Mode & Result Set
// =============================================================================

/// What the caller wants back from a collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Parsed device records
    #[default]
    Records,
    /// Raw smartctl output keyed by display name
    Raw,
}

/// Aggregated telemetry from one collection cycle
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultSet {
    /// Parsed records, one per serial number in the basic pass
    Records(Vec<DeviceRecord>),
    /// Raw responses keyed by device name or `"<base> <dialect>,<index>"`
    Raw(BTreeMap<String, String>),
}

impl ResultSet {
    /// Create an empty result set for `mode`
    pub fn new(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Records => ResultSet::Records(Vec::new()),
            OutputMode::Raw => ResultSet::Raw(BTreeMap::new()),
        }
    }

    pub fn mode(&self) -> OutputMode {
        match self {
            ResultSet::Records(_) => OutputMode::Records,
            ResultSet::Raw(_) => OutputMode::Raw,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResultSet::Records(records) => records.len(),
            ResultSet::Raw(raw) => raw.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parsed records, if collected in [`OutputMode::Records`]
    pub fn records(&self) -> Option<&[DeviceRecord]> {
        match self {
            ResultSet::Records(records) => Some(records),
            ResultSet::Raw(_) => None,
        }
    }

    /// Raw responses, if collected in [`OutputMode::Raw`]
    pub fn raw(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ResultSet::Records(_) => None,
            ResultSet::Raw(raw) => Some(raw),
        }
    }

    fn insert(&mut self, key: String, record: DeviceRecord, raw: &[u8]) {
        match self {
            ResultSet::Records(records) => records.push(record),
            ResultSet::Raw(map) => {
                map.insert(key, String::from_utf8_lossy(raw).into_owned());
            }
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// How the basic pass filed a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicOutcome {
    /// Added to the result set
    Added,
    /// Serial number already recorded
    Duplicate,
    /// Flagged incomplete, queued for RAID probing
    Incomplete,
    /// No health verdict; dropped
    NoVerdict,
}

#[derive(Debug)]
struct AggregatorState {
    results: ResultSet,
    found: HashSet<String>,
    incomplete: Vec<DeviceHandle>,
}

/// Thread-safe accumulator shared by every worker of both passes
#[derive(Debug)]
pub struct Aggregator {
    mode: OutputMode,
    state: Mutex<AggregatorState>,
}

impl Aggregator {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            state: Mutex::new(AggregatorState {
                results: ResultSet::new(mode),
                found: HashSet::new(),
                incomplete: Vec::new(),
            }),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// File a basic-pass response for `device`.
    pub fn record_basic(&self, device: &DeviceHandle, record: DeviceRecord, raw: &[u8]) -> BasicOutcome {
        if !record.has_health_verdict() {
            debug!("{}: no health verdict, skipping", device);
            return BasicOutcome::NoVerdict;
        }

        let mut state = self.state.lock();

        if !state.found.insert(record.serial_number.clone()) {
            debug!(
                "{}: serial '{}' already recorded",
                device, record.serial_number
            );
            return BasicOutcome::Duplicate;
        }

        if record.is_incomplete() {
            debug!("{}: incomplete data, queued for RAID probing", device);
            state.incomplete.push(device.clone());
            return BasicOutcome::Incomplete;
        }

        state.results.insert(device.name.clone(), record, raw);
        BasicOutcome::Added
    }

    /// Append a RAID member found under `member_name`.
    ///
    /// Returns `false` when the record carries no health verdict.
    pub fn record_raid(&self, member_name: String, mut record: DeviceRecord, raw: &[u8]) -> bool {
        if !record.has_health_verdict() {
            return false;
        }

        record.info.name = member_name.clone();
        self.state.lock().results.insert(member_name, record, raw);
        true
    }

    /// Drain the devices flagged incomplete so far.
    pub fn take_incomplete(&self) -> Vec<DeviceHandle> {
        std::mem::take(&mut self.state.lock().incomplete)
    }

    /// Number of entries in the result set
    pub fn len(&self) -> usize {
        self.state.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current result set
    pub fn snapshot(&self) -> ResultSet {
        self.state.lock().results.clone()
    }

    /// Consume the aggregator, returning its result set.
    pub fn into_results(self) -> ResultSet {
        self.state.into_inner().results
    }
}
