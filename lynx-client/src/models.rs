// Copyright 2025 IoT Open.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Registry entities and the telemetry message as they appear on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form string metadata attached to devices and functions.
pub type Meta = BTreeMap<String, String>;

/// Metadata key/value pairs a registry listing must match.
pub type Filter = BTreeMap<String, String>;

/// Display name.
pub const META_NAME: &str = "name";
/// Owning device ID of a function, as a decimal string.
pub const META_DEVICE_ID: &str = "device_id";
/// Topic a function's readings are published on.
pub const META_TOPIC_READ: &str = "topic_read";

fn is_unassigned(id: &i64) -> bool {
    *id == 0
}

/// A registered endpoint within an installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Assigned by the platform; zero until created.
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub installation_id: i64,
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub created: i64,
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub updated: i64,
    #[serde(default)]
    pub meta: Meta,
}

impl Device {
    pub fn new(kind: impl Into<String>, installation_id: i64) -> Self {
        Self {
            id: 0,
            kind: kind.into(),
            installation_id,
            created: 0,
            updated: 0,
            meta: Meta::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.meta.get(META_NAME).map(String::as_str)
    }
}

/// A telemetry channel. Linked to its device through the `device_id` meta key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub installation_id: i64,
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub created: i64,
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub updated: i64,
    #[serde(default)]
    pub meta: Meta,
}

impl Function {
    pub fn new(kind: impl Into<String>, installation_id: i64) -> Self {
        Self {
            id: 0,
            kind: kind.into(),
            installation_id,
            created: 0,
            updated: 0,
            meta: Meta::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.meta.get(META_NAME).map(String::as_str)
    }

    pub fn topic_read(&self) -> Option<&str> {
        self.meta
            .get(META_TOPIC_READ)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Owning device, if the `device_id` meta key holds a valid ID.
    pub fn device_id(&self) -> Option<i64> {
        self.meta.get(META_DEVICE_ID)?.parse().ok()
    }
}

/// A tenant scope grouping devices and functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: i64,
    /// Prefix of every topic published within this installation.
    pub client_id: i64,
    #[serde(default)]
    pub name: String,
}

/// A single telemetry reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub value: f64,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl Message {
    pub fn new(value: f64, timestamp: i64) -> Self {
        Self { value, timestamp }
    }

    /// Serialize into the JSON payload published on the broker.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_device_from_registry_json() {
        let body = json!({
            "id": 17,
            "type": "virtual",
            "installation_id": 3,
            "created": 1700000000,
            "updated": 1700000100,
            "meta": { "name": "lynx-manager-example", "example.type": "lynx-manager" }
        });
        let device: Device = serde_json::from_value(body).unwrap();

        assert_eq!(device.id, 17);
        assert_eq!(device.kind, "virtual");
        assert_eq!(device.name(), Some("lynx-manager-example"));
    }

    #[test]
    fn test_new_device_omits_unassigned_fields() {
        let device = Device::new("virtual", 3).with_meta("name", "example");
        let value = serde_json::to_value(&device).unwrap();

        assert!(value.get("id").is_none());
        assert!(value.get("created").is_none());
        assert_eq!(value["type"], "virtual");
        assert_eq!(value["meta"]["name"], "example");
    }

    #[test]
    fn test_function_missing_meta_defaults_empty() {
        let body = json!({ "id": 5, "type": "temperature", "installation_id": 3 });
        let function: Function = serde_json::from_value(body).unwrap();

        assert!(function.meta.is_empty());
        assert_eq!(function.topic_read(), None);
        assert_eq!(function.device_id(), None);
    }

    #[test]
    fn test_function_meta_accessors() {
        let function = Function::new("temperature", 3)
            .with_meta(META_DEVICE_ID, "17")
            .with_meta(META_TOPIC_READ, "obj/example/temperature");

        assert_eq!(function.device_id(), Some(17));
        assert_eq!(function.topic_read(), Some("obj/example/temperature"));
    }

    #[test]
    fn test_message_payload() {
        let bytes = Message::new(12.5, 1700000000).to_payload().unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed["value"], 12.5);
        assert_eq!(parsed["timestamp"], 1700000000);
    }
}
