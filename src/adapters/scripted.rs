//! Scripted Executor Adapter
//!
//! In-memory `DiagnosticExecutor` that answers from a table of canned
//! responses. Used by tests and dry runs in place of a real smartctl.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::json;

use crate::domain::ports::DiagnosticExecutor;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum ScriptedResponse {
    Output { body: Vec<u8>, delay: Duration },
    Failure { message: String, delay: Duration },
}

/// Executor that replays scripted responses.
///
/// Arguments are matched after collapsing whitespace, so `"-a  /dev/sda -j "`
/// and `"-a /dev/sda -j"` hit the same entry. Calls without a scripted
/// response fail with [`Error::Execution`].
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: RwLock<HashMap<String, ScriptedResponse>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Create an executor with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(args: &str) -> String {
        args.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Answer `args` with `body`.
    pub fn respond(&self, args: &str, body: impl Into<Vec<u8>>) -> &Self {
        self.respond_after(args, body, Duration::ZERO)
    }

    /// Answer `args` with `body` after sleeping for `delay`.
    pub fn respond_after(&self, args: &str, body: impl Into<Vec<u8>>, delay: Duration) -> &Self {
        self.responses.write().insert(
            Self::normalize(args),
            ScriptedResponse::Output {
                body: body.into(),
                delay,
            },
        );
        self
    }

    /// Fail `args` with an execution error.
    pub fn fail(&self, args: &str, message: &str) -> &Self {
        self.fail_after(args, message, Duration::ZERO)
    }

    /// Fail `args` with an execution error after sleeping for `delay`.
    pub fn fail_after(&self, args: &str, message: &str, delay: Duration) -> &Self {
        self.responses.write().insert(
            Self::normalize(args),
            ScriptedResponse::Failure {
                message: message.to_string(),
                delay,
            },
        );
        self
    }

    /// Script the unrestricted and `sat`-restricted scans.
    pub fn scan(&self, basic: &[&str], sat: &[&str]) -> &Self {
        self.respond("--scan -j", scan_json(basic, "scsi"));
        self.respond("--scan -d sat -j", scan_json(sat, "sat"))
    }

    /// Script the basic device query for a fixture.
    pub fn device(&self, fixture: &DeviceFixture) -> &Self {
        self.respond(&format!("-a {} -j", fixture.name), fixture.to_json())
    }

    /// Script a RAID member query (`<base> -d <target>`) with a fixture.
    pub fn raid_member(&self, base: &str, target: &str, fixture: &DeviceFixture) -> &Self {
        self.respond(&format!("-a {} -d {} -j", base, target), fixture.to_json())
    }

    /// Script the version query.
    pub fn version(&self, digits: &[u32]) -> &Self {
        let body = json!({
            "json_format_version": [1, 0],
            "smartctl": { "version": digits, "exit_status": 0, "messages": [] },
        });
        self.respond("-j -V", body.to_string())
    }

    /// All argument strings received, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls received for exactly `args`.
    pub fn call_count(&self, args: &str) -> usize {
        let args = Self::normalize(args);
        self.calls.lock().iter().filter(|c| **c == args).count()
    }

    /// Calls whose argument string contains `needle`.
    pub fn calls_containing(&self, needle: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.contains(needle))
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping scripted responses.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl DiagnosticExecutor for ScriptedExecutor {
    async fn execute(&self, args: &str, _suppress_error_log: bool) -> Result<Vec<u8>> {
        let args = Self::normalize(args);
        self.calls.lock().push(args.clone());

        let response = self.responses.read().get(&args).cloned();
        match response {
            Some(ScriptedResponse::Output { body, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(body)
            }
            Some(ScriptedResponse::Failure { message, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Err(Error::Execution(message))
            }
            None => Err(Error::Execution(format!(
                "no scripted response for '{}'",
                args
            ))),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Build a `--scan -j` response listing `names`.
pub fn scan_json(names: &[&str], dev_type: &str) -> String {
    let devices: Vec<_> = names
        .iter()
        .map(|name| json!({ "name": name, "info_name": name, "type": dev_type, "protocol": "ATA" }))
        .collect();

    json!({
        "json_format_version": [1, 0],
        "smartctl": { "version": [7, 2], "exit_status": 0 },
        "devices": devices,
    })
    .to_string()
}

/// Builder for a per-device smartctl JSON response.
#[derive(Debug, Clone)]
pub struct DeviceFixture {
    pub name: String,
    pub dev_type: String,
    pub model: String,
    pub serial: String,
    pub rotation_rate: u32,
    pub exit_status: i32,
    pub messages: Vec<String>,
    pub passed: Option<bool>,
    pub attributes: Vec<(i32, String, i32)>,
}

impl DeviceFixture {
    /// A healthy ATA disk named `name` with serial `serial`.
    pub fn new(name: &str, serial: &str) -> Self {
        Self {
            name: name.to_string(),
            dev_type: "sat".to_string(),
            model: "TEST DISK".to_string(),
            serial: serial.to_string(),
            rotation_rate: 7200,
            exit_status: 0,
            messages: Vec::new(),
            passed: Some(true),
            attributes: vec![(5, "Reallocated_Sector_Ct".to_string(), 10)],
        }
    }

    pub fn dev_type(mut self, dev_type: &str) -> Self {
        self.dev_type = dev_type.to_string();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn rotation_rate(mut self, rate: u32) -> Self {
        self.rotation_rate = rate;
        self
    }

    pub fn exit_status(mut self, status: i32) -> Self {
        self.exit_status = status;
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.messages.push(message.to_string());
        self
    }

    /// Drop the `smart_status` block, as smartctl does for devices it cannot verdict.
    pub fn without_health(mut self) -> Self {
        self.passed = None;
        self
    }

    pub fn failing(mut self) -> Self {
        self.passed = Some(false);
        self
    }

    pub fn attribute(mut self, id: i32, name: &str, thresh: i32) -> Self {
        self.attributes.push((id, name.to_string(), thresh));
        self
    }

    /// Render the smartctl `-a -j` JSON document.
    pub fn to_json(&self) -> String {
        let messages: Vec<_> = self
            .messages
            .iter()
            .map(|m| json!({ "string": m, "severity": "error" }))
            .collect();
        let table: Vec<_> = self
            .attributes
            .iter()
            .map(|(id, name, thresh)| json!({ "id": id, "name": name, "thresh": thresh }))
            .collect();

        let mut doc = json!({
            "json_format_version": [1, 0],
            "smartctl": {
                "version": [7, 2],
                "exit_status": self.exit_status,
                "messages": messages,
            },
            "device": { "name": self.name, "type": self.dev_type },
            "model_name": self.model,
            "serial_number": self.serial,
            "rotation_rate": self.rotation_rate,
            "ata_smart_attributes": { "table": table },
        });

        if let Some(passed) = self.passed {
            doc["smart_status"] = json!({ "passed": passed });
        }

        doc.to_string()
    }
}
