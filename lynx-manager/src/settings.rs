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

//! YAML settings file.
//!
//! A missing file is created with defaults and reported as an error so the
//! operator can fill in real credentials. Keys absent from an existing file
//! take their default values.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use lynx_client::{BrokerAddress, BrokerAddressError, LynxClientConfig};
use lynx_telemetry::RegistrationConfig;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "LYNX_MANAGER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "lynx-manager.yml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no configuration found; defaults written to {}, edit it and restart", .path.display())]
    Created { path: PathBuf },

    #[error("failed to write default configuration to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid api.base '{value}'")]
    ApiBase {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid api.broker")]
    Broker(#[from] BrokerAddressError),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("telemetry.interval_secs must be at least 1")]
    ZeroInterval,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub lynx: LynxSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base: String,
    pub key: String,
    pub broker: String,
    pub client_id: String,
    pub log_connection: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base: "https://domain.tld".to_string(),
            key: "secret".to_string(),
            broker: "tcp://domain.tld:1883".to_string(),
            client_id: "lynx-manager-example".to_string(),
            log_connection: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LynxSettings {
    pub installation_id: i64,
    /// Prefix topics with the installation's client ID.
    pub namespaced_topics: bool,
}

impl Default for LynxSettings {
    fn default() -> Self {
        Self {
            installation_id: 1,
            namespaced_topics: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub interval_secs: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Settings path from [`CONFIG_ENV`], or [`DEFAULT_CONFIG_FILE`] in the
/// working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Self::default().write_new(path)?;
                return Err(SettingsError::Created {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: Settings = if contents.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Write to `path`, never replacing an existing file.
    pub fn write_new(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        let yaml = serde_yaml::to_string(self).map_err(|e| write_err(io::Error::other(e)))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(yaml.as_bytes()).map_err(write_err)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.api.client_id.trim().is_empty() {
            return Err(SettingsError::Empty("api.client_id"));
        }
        if self.api.key.is_empty() {
            return Err(SettingsError::Empty("api.key"));
        }
        if self.telemetry.interval_secs == 0 {
            return Err(SettingsError::ZeroInterval);
        }
        Ok(())
    }

    pub fn client_config(&self) -> Result<LynxClientConfig, SettingsError> {
        let api_base = Url::parse(&self.api.base).map_err(|source| SettingsError::ApiBase {
            value: self.api.base.clone(),
            source,
        })?;
        let broker: BrokerAddress = self.api.broker.parse()?;

        Ok(LynxClientConfig::builder(api_base, &self.api.key, broker)
            .client_id(&self.api.client_id)
            .log_connection(self.api.log_connection)
            .build())
    }

    pub fn registration_config(&self) -> RegistrationConfig {
        RegistrationConfig::builder(self.lynx.installation_id).build()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.telemetry.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Created { .. }));
        assert!(path.exists());

        let written = Settings::load(&path).unwrap();
        assert_eq!(written, Settings::default());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.yml");
        fs::write(
            &path,
            "api:\n  base: https://lynx.example.com\n  key: abc123\nlynx:\n  installation_id: 42\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.api.base, "https://lynx.example.com");
        assert_eq!(settings.api.key, "abc123");
        assert_eq!(settings.api.broker, ApiSettings::default().broker);
        assert_eq!(settings.lynx.installation_id, 42);
        assert!(!settings.lynx.namespaced_topics);
        assert_eq!(settings.interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.yml");
        fs::write(&path, "lynx:\n  installation_id: 7\n").unwrap();

        let err = Settings::default().write_new(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Write { .. }));
        assert_eq!(Settings::load(&path).unwrap().lynx.installation_id, 7);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        fs::write(&path, "lynx: [unterminated\n").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.yml");
        fs::write(&path, "telemetry:\n  interval_secs: 0\n").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::ZeroInterval)
        ));
    }

    #[test]
    fn test_client_config_from_settings() {
        let mut settings = Settings::default();
        settings.api.base = "https://lynx.example.com".into();
        settings.api.broker = "tcp://lynx.example.com:8883".into();
        settings.api.log_connection = true;

        let config = settings.client_config().unwrap();
        assert_eq!(config.broker, BrokerAddress::new("lynx.example.com", 8883));
        assert_eq!(config.client_id, "lynx-manager-example");
        assert!(config.log_connection);
    }

    #[test]
    fn test_bad_broker_is_a_settings_error() {
        let mut settings = Settings::default();
        settings.api.broker = "tcp://domain.tld:port".into();

        assert!(matches!(
            settings.client_config(),
            Err(SettingsError::Broker(_))
        ));
    }
}
