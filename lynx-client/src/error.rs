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

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`PlatformClient`](crate::PlatformClient) operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("API base URL '{0}' cannot carry a path")]
    InvalidBaseUrl(String),

    #[error("MQTT connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("MQTT connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("MQTT session is not connected")]
    NotConnected,

    #[error("MQTT request failed: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
