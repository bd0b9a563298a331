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

//! Device registration and telemetry publishing on top of
//! [`lynx_client::PlatformClient`].
//!
//! Registers one marker-tagged virtual device with a temperature function,
//! then publishes a synthetic reading to the function's topic once per
//! interval until cancelled.
//!
//! # Example
//!
//! ```ignore
//! use lynx_telemetry::{Registrar, RegistrationConfig, TelemetryLoop, TopicScheme};
//!
//! let config = RegistrationConfig::builder(installation_id).build();
//! let registration = Registrar::new(client.as_ref(), config).register().await?;
//! let scheme = TopicScheme::resolve(client.as_ref(), installation_id, false).await?;
//! let topic = scheme.topic_for(&registration.function)?;
//!
//! let report = TelemetryLoop::new(client, topic).run(shutdown).await;
//! ```

pub mod config;
pub mod registration;
pub mod retry;
pub mod telemetry;
pub mod topic;

pub use config::{Marker, RegistrationConfig, RegistrationConfigBuilder};
pub use registration::{Registrar, Registration, RegistrationError};
pub use retry::{Backoff, RetryPolicy};
pub use telemetry::{synthetic_temperature, LoopReport, TelemetryLoop};
pub use topic::TopicScheme;
