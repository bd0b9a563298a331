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

//! Client for the IoT Open Lynx platform.
//!
//! Talks to the Lynx REST registry (devices, functions, installations) and
//! publishes telemetry over a persistent MQTT session. Callers program
//! against the [`PlatformClient`] trait; [`LynxClient`] is the concrete
//! implementation.
//!
//! # Example
//!
//! ```ignore
//! use lynx_client::{LynxClient, LynxClientConfig, PlatformClient};
//!
//! let config = LynxClientConfig::builder(
//!     "https://lynx.example.com".parse()?,
//!     "secret",
//!     "tcp://lynx.example.com:1883".parse()?,
//! )
//! .client_id("lynx-manager-example")
//! .build();
//!
//! let client = LynxClient::new(config)?;
//! client.connect().await?;
//! ```

mod api;
mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::{LynxClient, PlatformClient};
pub use config::{BrokerAddress, BrokerAddressError, LynxClientConfig, LynxClientConfigBuilder};
pub use error::PlatformError;
pub use models::{Device, Filter, Function, Installation, Message, Meta};
pub use rumqttc::QoS;

#[cfg(any(test, feature = "testing"))]
pub use client::MockPlatformClient;
