//! smartscan - SMART Telemetry Collector
//!
//! Collects S.M.A.R.T. health data from every storage device on a host by
//! orchestrating concurrent `smartctl` invocations, including disks hidden
//! behind hardware RAID controllers.
//!
//! # Architecture
//!
//! ```text
//! Version Gate → Enumerator → Basic Pass → RAID Pass → Result Set
//! ```
//!
//! Every smartctl call goes through the [`domain::DiagnosticExecutor`] port,
//! so the orchestration can run against the real binary or a scripted fake.
//!
//! # Modules
//!
//! - [`adapters`] - smartctl process executor and a scripted test executor
//! - [`domain`] - Ports shared by the collection pipeline
//! - [`error`] - Error types
//! - [`smart`] - Enumeration, worker pools, aggregation and discovery views

pub mod adapters;
pub mod domain;
pub mod error;
pub mod smart;

// Re-export commonly used types
pub use domain::{DeviceHandle, DiagnosticExecutor};
pub use error::{Error, Result};
pub use smart::{OutputMode, ResultSet, RunnerConfig, SmartCollector};
