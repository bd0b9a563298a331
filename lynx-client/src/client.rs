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

//! The [`PlatformClient`] trait and its Lynx implementation.

use async_trait::async_trait;
use log::info;
use rumqttc::QoS;

use crate::api::RegistryApi;
use crate::broker::Broker;
use crate::config::LynxClientConfig;
use crate::error::PlatformError;
use crate::models::{Device, Filter, Function, Installation, Message};

/// Operations the platform offers: registry CRUD over REST and publishing
/// over a persistent broker session.
///
/// Implementations serialize their own internal access, so a single handle
/// can be shared behind an `Arc` between tasks.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// List devices of an installation whose meta matches every filter pair.
    async fn get_devices(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Device>, PlatformError>;

    /// Create a device; the returned copy carries the assigned ID.
    async fn create_device(&self, device: &Device) -> Result<Device, PlatformError>;

    /// List functions of an installation whose meta matches every filter pair.
    async fn get_functions(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Function>, PlatformError>;

    /// Create a function; the returned copy carries the assigned ID.
    async fn create_function(&self, function: &Function) -> Result<Function, PlatformError>;

    async fn get_installation(&self, installation_id: i64) -> Result<Installation, PlatformError>;

    /// Make a single attempt to open the broker session.
    async fn connect(&self) -> Result<(), PlatformError>;

    async fn publish(&self, topic: &str, message: &Message, qos: QoS) -> Result<(), PlatformError>;

    async fn disconnect(&self) -> Result<(), PlatformError>;
}

/// Lynx platform client backed by `reqwest` and `rumqttc`.
pub struct LynxClient {
    api: RegistryApi,
    broker: Broker,
}

impl LynxClient {
    /// Create a new client. No network I/O happens until the first call.
    pub fn new(config: LynxClientConfig) -> Result<Self, PlatformError> {
        let api = RegistryApi::new(&config)?;
        let broker = Broker::new(&config);

        info!(
            "[{}] Lynx client created (api={}, broker={})",
            config.client_id, config.api_base, config.broker
        );

        Ok(Self { api, broker })
    }
}

#[async_trait]
impl PlatformClient for LynxClient {
    async fn get_devices(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Device>, PlatformError> {
        self.api.get_devices(installation_id, filter).await
    }

    async fn create_device(&self, device: &Device) -> Result<Device, PlatformError> {
        self.api.create_device(device).await
    }

    async fn get_functions(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Function>, PlatformError> {
        self.api.get_functions(installation_id, filter).await
    }

    async fn create_function(&self, function: &Function) -> Result<Function, PlatformError> {
        self.api.create_function(function).await
    }

    async fn get_installation(&self, installation_id: i64) -> Result<Installation, PlatformError> {
        self.api.get_installation(installation_id).await
    }

    async fn connect(&self) -> Result<(), PlatformError> {
        self.broker.connect().await
    }

    async fn publish(&self, topic: &str, message: &Message, qos: QoS) -> Result<(), PlatformError> {
        self.broker.publish(topic, message, qos).await
    }

    async fn disconnect(&self) -> Result<(), PlatformError> {
        self.broker.disconnect().await
    }
}
