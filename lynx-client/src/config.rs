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

//! Configuration types for the Lynx client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Port used when the broker address does not name one.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Configuration for [`LynxClient`](crate::LynxClient).
#[derive(Debug, Clone)]
pub struct LynxClientConfig {
    /// Base URL of the Lynx REST API (e.g. `https://lynx.example.com`).
    pub api_base: Url,
    /// API key, used for both the REST API and the broker session.
    pub api_key: String,
    /// MQTT broker address.
    pub broker: BrokerAddress,
    /// MQTT client ID. Defaults to `"lynx-client"`.
    pub client_id: String,
    /// Log broker connection events at info level instead of debug.
    pub log_connection: bool,
    /// Timeout for a single broker connect attempt (default: 1s).
    pub connect_timeout: Duration,
    /// MQTT keep-alive interval (default: 30s).
    pub keep_alive: Duration,
    /// Timeout applied to every REST request (default: 30s).
    pub request_timeout: Duration,
}

impl LynxClientConfig {
    /// Start building a new config with the required fields.
    pub fn builder(
        api_base: Url,
        api_key: impl Into<String>,
        broker: BrokerAddress,
    ) -> LynxClientConfigBuilder {
        LynxClientConfigBuilder {
            api_base,
            api_key: api_key.into(),
            broker,
            client_id: "lynx-client".to_string(),
            log_connection: false,
            connect_timeout: Duration::from_secs(1),
            keep_alive: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builder for [`LynxClientConfig`].
pub struct LynxClientConfigBuilder {
    api_base: Url,
    api_key: String,
    broker: BrokerAddress,
    client_id: String,
    log_connection: bool,
    connect_timeout: Duration,
    keep_alive: Duration,
    request_timeout: Duration,
}

impl LynxClientConfigBuilder {
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn log_connection(mut self, enabled: bool) -> Self {
        self.log_connection = enabled;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the config.
    pub fn build(self) -> LynxClientConfig {
        LynxClientConfig {
            api_base: self.api_base,
            api_key: self.api_key,
            broker: self.broker,
            client_id: self.client_id,
            log_connection: self.log_connection,
            connect_timeout: self.connect_timeout,
            keep_alive: self.keep_alive,
            request_timeout: self.request_timeout,
        }
    }
}

/// Errors produced when parsing a [`BrokerAddress`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerAddressError {
    #[error("invalid broker address '{address}': {reason}")]
    Invalid { address: String, reason: String },
    #[error("unsupported broker scheme '{0}' (expected tcp or mqtt)")]
    UnsupportedScheme(String),
    #[error("broker address '{0}' has no host")]
    MissingHost(String),
}

/// Plain-TCP MQTT broker endpoint, written as `tcp://host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for BrokerAddress {
    type Err = BrokerAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(|e| BrokerAddressError::Invalid {
            address: s.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            other => return Err(BrokerAddressError::UnsupportedScheme(other.to_string())),
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BrokerAddressError::MissingHost(s.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            port: url.port().unwrap_or(DEFAULT_BROKER_PORT),
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_address() {
        let addr: BrokerAddress = "tcp://lynx.example.com:8883".parse().unwrap();
        assert_eq!(addr, BrokerAddress::new("lynx.example.com", 8883));
        assert_eq!(addr.to_string(), "tcp://lynx.example.com:8883");
    }

    #[test]
    fn test_parse_defaults_port() {
        let addr: BrokerAddress = "mqtt://localhost".parse().unwrap();
        assert_eq!(addr.port, DEFAULT_BROKER_PORT);
        assert_eq!(addr.host, "localhost");
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let err = "ws://localhost:80".parse::<BrokerAddress>().unwrap_err();
        assert_eq!(err, BrokerAddressError::UnsupportedScheme("ws".into()));
    }

    #[test]
    fn test_rejects_placeholder_port() {
        let err = "tcp://domain.tld:port".parse::<BrokerAddress>().unwrap_err();
        assert!(matches!(err, BrokerAddressError::Invalid { .. }));
    }

    #[test]
    fn test_builder_defaults() {
        let config = LynxClientConfig::builder(
            "https://lynx.example.com".parse().unwrap(),
            "secret",
            BrokerAddress::new("localhost", 1883),
        )
        .client_id("lynx-manager-example")
        .build();

        assert_eq!(config.client_id, "lynx-manager-example");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert!(!config.log_connection);
    }
}
