//! smartctl JSON Response Types
//!
//! Typed views of the smartctl `--json` output. Every field defaults when
//! absent, matching smartctl's habit of omitting blocks it could not fill.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// smartctl exit status signalling an internal tool failure.
pub const EXIT_STATUS_TOOL_FAILURE: i32 = 2;

/// smartctl exit status signalling incomplete or ambiguous device data,
/// usually a RAID virtual disk that needs member probing.
pub const EXIT_STATUS_INCOMPLETE: i32 = 4;

// =============================================================================
// Scan Response
// =============================================================================

/// `smartctl --scan -j` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

/// Device name and interface type as reported by smartctl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub dev_type: String,
}

// =============================================================================
// Tool Status Block
// =============================================================================

/// The `smartctl` block embedded in every JSON response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartctlStatus {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub exit_status: i32,
    #[serde(default)]
    pub version: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "string", default)]
    pub text: String,
}

/// `smartctl -j -V` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionResponse {
    #[serde(default)]
    pub smartctl: SmartctlStatus,
}

// =============================================================================
// Device Record
// =============================================================================

/// Parsed `smartctl -a <device> -j` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub rotation_rate: u32,
    #[serde(rename = "device", default)]
    pub info: DeviceInfo,
    #[serde(default)]
    pub smartctl: SmartctlStatus,
    /// Present only when smartctl could produce a health verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_status: Option<SmartStatus>,
    #[serde(rename = "ata_smart_attributes", default)]
    pub smart_attributes: SmartAttributes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartStatus {
    #[serde(default)]
    pub passed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartAttributes {
    #[serde(default)]
    pub table: Vec<AttributeRow>,
}

/// One row of the ATA attribute table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub thresh: i32,
}

impl DeviceRecord {
    /// Decode a device query response.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Check whether smartctl produced a health verdict for this device.
    pub fn has_health_verdict(&self) -> bool {
        self.smart_status.is_some()
    }

    /// Check whether smartctl flagged the data as incomplete.
    pub fn is_incomplete(&self) -> bool {
        self.smartctl.exit_status == EXIT_STATUS_INCOMPLETE
    }

    /// Surface a tool-level failure embedded in the JSON status block.
    pub fn check_tool_error(&self) -> Result<()> {
        self.smartctl.check_tool_error()
    }
}

impl SmartctlStatus {
    /// Fail when the tool reported an internal error, joining its messages.
    pub fn check_tool_error(&self) -> Result<()> {
        if self.exit_status != EXIT_STATUS_TOOL_FAILURE {
            return Ok(());
        }

        let joined = self
            .messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        if joined.is_empty() {
            Err(Error::ToolReported("unknown error from smartctl".to_string()))
        } else {
            Err(Error::ToolReported(joined))
        }
    }
}
