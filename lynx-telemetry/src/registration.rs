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

//! Get-or-create registration of the application's device and function.
//!
//! Nothing is cached locally: every call re-derives the registry state from
//! the marker tag, so running it on each startup never duplicates entities.
//! There is no rollback. A device whose function could not be created stays
//! registered and gets its function on the next successful run.

use log::{info, warn};
use thiserror::Error;

use lynx_client::models::{META_DEVICE_ID, META_NAME, META_TOPIC_READ};
use lynx_client::{Device, Filter, Function, PlatformClient, PlatformError};

use crate::config::{RegistrationConfig, DEVICE_TYPE, FUNCTION_TYPE};

/// Registry failures during startup. None of these are retried.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("failed to look up devices in installation {installation_id}")]
    LookupDevices {
        installation_id: i64,
        #[source]
        source: PlatformError,
    },

    #[error("failed to create device in installation {installation_id}")]
    CreateDevice {
        installation_id: i64,
        #[source]
        source: PlatformError,
    },

    #[error("failed to look up functions of device {device_id}")]
    LookupFunctions {
        device_id: i64,
        #[source]
        source: PlatformError,
    },

    #[error("failed to create function for device {device_id}")]
    CreateFunction {
        device_id: i64,
        #[source]
        source: PlatformError,
    },

    #[error("failed to look up installation {installation_id}")]
    LookupInstallation {
        installation_id: i64,
        #[source]
        source: PlatformError,
    },

    #[error("function {function_id} has no topic to publish on")]
    MissingTopic { function_id: i64 },
}

/// The device and telemetry function owned by this application.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub device: Device,
    pub function: Function,
    /// True when this run created the device.
    pub created: bool,
}

/// Ensures exactly one marker-tagged device and function exist.
pub struct Registrar<'a> {
    client: &'a dyn PlatformClient,
    config: RegistrationConfig,
}

impl<'a> Registrar<'a> {
    pub fn new(client: &'a dyn PlatformClient, config: RegistrationConfig) -> Self {
        Self { client, config }
    }

    /// Return the first marker-tagged device, creating it together with its
    /// telemetry function if none exists.
    pub async fn get_or_create_device(&self) -> Result<Device, RegistrationError> {
        self.find_or_create().await.map(|(device, _)| device)
    }

    /// Return the device's telemetry function, creating one if the device
    /// was left without it.
    pub async fn telemetry_function(&self, device: &Device) -> Result<Function, RegistrationError> {
        let filter = device_filter(&self.config, device.id);
        let functions = self
            .client
            .get_functions(self.config.installation_id, &filter)
            .await
            .map_err(|source| RegistrationError::LookupFunctions {
                device_id: device.id,
                source,
            })?;

        match functions.into_iter().next() {
            Some(function) => Ok(function),
            None => {
                warn!("Device {} has no telemetry function; creating one", device.id);
                self.create_function(device).await
            }
        }
    }

    /// Resolve both entities in one go.
    pub async fn register(&self) -> Result<Registration, RegistrationError> {
        let (device, created_function) = self.find_or_create().await?;
        let created = created_function.is_some();
        let function = match created_function {
            Some(function) => function,
            None => self.telemetry_function(&device).await?,
        };

        Ok(Registration {
            device,
            function,
            created,
        })
    }

    /// The function is returned only when it was created here.
    async fn find_or_create(&self) -> Result<(Device, Option<Function>), RegistrationError> {
        let installation_id = self.config.installation_id;
        let devices = self
            .client
            .get_devices(installation_id, &self.config.marker.filter())
            .await
            .map_err(|source| RegistrationError::LookupDevices {
                installation_id,
                source,
            })?;

        if let Some(device) = devices.into_iter().next() {
            info!("Using existing device {} in installation {installation_id}", device.id);
            return Ok((device, None));
        }

        let marker = &self.config.marker;
        let device = Device::new(DEVICE_TYPE, installation_id)
            .with_meta(META_NAME, &self.config.device_name)
            .with_meta(&marker.key, &marker.value);

        let device = self
            .client
            .create_device(&device)
            .await
            .map_err(|source| RegistrationError::CreateDevice {
                installation_id,
                source,
            })?;
        info!("Created device {} in installation {installation_id}", device.id);

        let function = self.create_function(&device).await?;
        Ok((device, Some(function)))
    }

    async fn create_function(&self, device: &Device) -> Result<Function, RegistrationError> {
        let marker = &self.config.marker;
        let function = Function::new(FUNCTION_TYPE, self.config.installation_id)
            .with_meta(META_NAME, format!("{} - temperature", device.id))
            .with_meta(META_DEVICE_ID, device.id.to_string())
            .with_meta(META_TOPIC_READ, &self.config.topic)
            .with_meta(&marker.key, &marker.value);

        let function = self
            .client
            .create_function(&function)
            .await
            .map_err(|source| RegistrationError::CreateFunction {
                device_id: device.id,
                source,
            })?;
        info!("Created function {} for device {}", function.id, device.id);
        Ok(function)
    }
}

/// Build the marker filter used for function lookups of one device.
pub fn device_filter(registration: &RegistrationConfig, device_id: i64) -> Filter {
    let mut filter = registration.marker.filter();
    filter.insert(META_DEVICE_ID.to_string(), device_id.to_string());
    filter
}
