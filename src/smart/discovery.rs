//! Discovery Views
//!
//! Flattened low-level-discovery listings derived from parsed device
//! records: one entry per device, and one per ATA attribute row.

use std::fmt;

use serde::Serialize;

use super::types::DeviceRecord;

/// Coarse device class reported in discovery output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Nvme,
    Ssd,
    Hdd,
    Unknown,
}

impl DiskType {
    /// Classify from smartctl's device type and rotation rate.
    pub fn classify(dev_type: &str, rotation_rate: u32) -> Self {
        match dev_type {
            "nvme" => DiskType::Nvme,
            "unknown" => DiskType::Unknown,
            _ if rotation_rate == 0 => DiskType::Ssd,
            _ => DiskType::Hdd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiskType::Nvme => "nvme",
            DiskType::Ssd => "ssd",
            DiskType::Hdd => "hdd",
            DiskType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device discovery entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    #[serde(rename = "{#NAME}")]
    pub name: String,
    #[serde(rename = "{#DISKTYPE}")]
    pub disk_type: DiskType,
    #[serde(rename = "{#MODEL}")]
    pub model: String,
    #[serde(rename = "{#SN}")]
    pub serial: String,
}

/// Attribute discovery entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredAttribute {
    #[serde(rename = "{#NAME}")]
    pub name: String,
    #[serde(rename = "{#DISKTYPE}")]
    pub disk_type: DiskType,
    #[serde(rename = "{#ID}")]
    pub id: i32,
    #[serde(rename = "{#ATTRNAME}")]
    pub attribute: String,
    #[serde(rename = "{#THRESH}")]
    pub threshold: i32,
}

/// Strip a leading `/dev/` from a device name.
pub fn cut_prefix(name: &str) -> &str {
    name.strip_prefix("/dev/").unwrap_or(name)
}

fn disk_type(record: &DeviceRecord) -> DiskType {
    DiskType::classify(&record.info.dev_type, record.rotation_rate)
}

/// One entry per device record.
pub fn discover_devices(records: &[DeviceRecord]) -> Vec<DiscoveredDevice> {
    records
        .iter()
        .map(|record| DiscoveredDevice {
            name: cut_prefix(&record.info.name).to_string(),
            disk_type: disk_type(record),
            model: record.model_name.clone(),
            serial: record.serial_number.clone(),
        })
        .collect()
}

/// One entry per attribute row across all device records.
pub fn discover_attributes(records: &[DeviceRecord]) -> Vec<DiscoveredAttribute> {
    records
        .iter()
        .flat_map(|record| {
            let name = cut_prefix(&record.info.name).to_string();
            let disk_type = disk_type(record);
            record
                .smart_attributes
                .table
                .iter()
                .map(move |row| DiscoveredAttribute {
                    name: name.clone(),
                    disk_type,
                    id: row.id,
                    attribute: row.name.clone(),
                    threshold: row.thresh,
                })
        })
        .collect()
}
