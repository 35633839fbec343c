//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │                DiagnosticExecutor │ Clock                   │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │         SmartctlExecutor │ ScriptedExecutor                │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use smartscan::adapters::{SmartctlConfig, SmartctlExecutor};
//! use smartscan::domain::DiagnosticExecutor;
//!
//! let executor = SmartctlExecutor::new(SmartctlConfig::default())?;
//! let scan = executor.execute("--scan -j", false).await?;
//! ```

mod scripted;
mod smartctl;

pub use scripted::{scan_json, DeviceFixture, ScriptedExecutor};
pub use smartctl::{SmartctlConfig, SmartctlExecutor};
