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

//! Configuration types for device registration.

use lynx_client::Filter;

/// Type of the device created for this application.
pub const DEVICE_TYPE: &str = "virtual";
/// Type of the telemetry function attached to the device.
pub const FUNCTION_TYPE: &str = "temperature";
/// Topic the temperature function publishes on, before any namespacing.
pub const TEMPERATURE_TOPIC: &str = "obj/example/temperature";

/// Metadata tag that identifies this application's own devices and functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub key: String,
    pub value: String,
}

impl Marker {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A filter matching only marker-tagged entities.
    pub fn filter(&self) -> Filter {
        Filter::from([(self.key.clone(), self.value.clone())])
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new("example.type", "lynx-manager")
    }
}

/// Configuration for the [`Registrar`](crate::Registrar).
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Installation the device lives in.
    pub installation_id: i64,
    /// Tag used to find previously registered entities.
    pub marker: Marker,
    /// Display name given to a newly created device (default: `"lynx-manager-example"`).
    pub device_name: String,
    /// Topic stored on a newly created function (default: [`TEMPERATURE_TOPIC`]).
    pub topic: String,
}

impl RegistrationConfig {
    /// Start building a new config with the required fields.
    pub fn builder(installation_id: i64) -> RegistrationConfigBuilder {
        RegistrationConfigBuilder {
            installation_id,
            marker: Marker::default(),
            device_name: "lynx-manager-example".to_string(),
            topic: TEMPERATURE_TOPIC.to_string(),
        }
    }
}

/// Builder for [`RegistrationConfig`].
pub struct RegistrationConfigBuilder {
    installation_id: i64,
    marker: Marker,
    device_name: String,
    topic: String,
}

impl RegistrationConfigBuilder {
    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Build the config.
    pub fn build(self) -> RegistrationConfig {
        RegistrationConfig {
            installation_id: self.installation_id,
            marker: self.marker,
            device_name: self.device_name,
            topic: self.topic,
        }
    }
}
