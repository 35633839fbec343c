//! SMART Telemetry Collection
//!
//! Runs smartctl against every storage device on the host, including disks
//! hidden behind hardware RAID controllers, and aggregates the results.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          SmartCollector                              │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐  │
//! │  │ Version Gate │──▶│  Enumerator  │──▶│  SmartRunner             │  │
//! │  │ (24h window) │   │ (2 scans)    │   │  basic pass ▶ RAID pass  │  │
//! │  └──────────────┘   └──────────────┘   └────────────┬─────────────┘  │
//! │                                                     │                │
//! │                                          ┌──────────┴──────────┐     │
//! │                                          │     Aggregator      │     │
//! │                                          │ (dedup by serial)   │     │
//! │                                          └─────────────────────┘     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Version Gate** (`version.rs`): checks smartctl is at least 7.1, at
//!   most once per 24 hours.
//!
//! - **Enumerator** (`enumerator.rs`): unrestricted scan plus a `sat` scan;
//!   names only the latter finds become RAID candidates.
//!
//! - **Runner** (`runner.rs`): bounded worker pools for the basic and RAID
//!   passes. The basic pass aborts on the first fatal error.
//!
//! - **RAID Dialects** (`raid.rs`): per-dialect index policy for member
//!   probing (`3ware`, `areca`, `cciss`, `megaraid`, `sat`).
//!
//! - **Aggregator** (`aggregator.rs`): one lock over results, seen serials
//!   and the incomplete list.
//!
//! - **Discovery** (`discovery.rs`): flattened device and attribute listings
//!   for monitoring templates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use smartscan::adapters::{SmartctlConfig, SmartctlExecutor};
//! use smartscan::smart::{OutputMode, RunnerConfig, SmartCollector};
//!
//! let executor = Arc::new(SmartctlExecutor::new(SmartctlConfig::default())?);
//! let collector = SmartCollector::new(executor, RunnerConfig::default())?;
//!
//! let results = collector.collect(OutputMode::Records).await?;
//! println!("{}", serde_json::to_string(&results)?);
//! ```

pub mod aggregator;
pub mod collector;
pub mod discovery;
pub mod enumerator;
pub mod raid;
pub mod runner;
pub mod types;
pub mod version;

mod proptest;

pub use aggregator::{Aggregator, BasicOutcome, OutputMode, ResultSet};
pub use collector::SmartCollector;
pub use discovery::{
    discover_attributes, discover_devices, DiscoveredAttribute, DiscoveredDevice, DiskType,
};
pub use enumerator::{exclude_known, DeviceEnumerator, Enumeration};
pub use raid::{DialectPolicy, RaidDialect, RaidProbeTask};
pub use runner::{RunnerConfig, SmartRunner};
pub use types::{DeviceRecord, SmartStatus, SmartctlStatus};
pub use version::{evaluate_version, VersionGate, MINIMUM_VERSION};
