//! Domain Layer
//!
//! # Architecture
//!
//! The domain layer holds the abstractions the collector is written against:
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for the diagnostic tool and the clock
//!
//! # Usage
//!
//! ```ignore
//! use smartscan::domain::{DeviceHandle, DiagnosticExecutor};
//!
//! async fn health_json<E: DiagnosticExecutor>(executor: &E, device: &DeviceHandle) -> Result<Vec<u8>> {
//!     executor.execute(&format!("-a {} -j", device), false).await
//! }
//! ```

pub mod ports;

pub use ports::{Clock, DeviceHandle, DiagnosticExecutor, SystemClock};
