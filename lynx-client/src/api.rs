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

//! REST access to the Lynx registry.

use log::debug;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::LynxClientConfig;
use crate::error::PlatformError;
use crate::models::{Device, Filter, Function, Installation};

/// Username paired with the API key in basic auth and MQTT credentials.
pub(crate) const API_KEY_USER: &str = "apikey";

pub(crate) struct RegistryApi {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl RegistryApi {
    pub(crate) fn new(config: &LynxClientConfig) -> Result<Self, PlatformError> {
        if config.api_base.cannot_be_a_base() {
            return Err(PlatformError::InvalidBaseUrl(config.api_base.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("lynx-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base: config.api_base.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub(crate) async fn get_devices(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Device>, PlatformError> {
        let url = self.endpoint(&["devicex", installation_id.to_string().as_str()])?;
        self.send(self.http.get(url).query(filter)).await
    }

    pub(crate) async fn create_device(&self, device: &Device) -> Result<Device, PlatformError> {
        let url = self.endpoint(&["devicex", device.installation_id.to_string().as_str()])?;
        self.send(self.http.post(url).json(device)).await
    }

    pub(crate) async fn get_functions(
        &self,
        installation_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Function>, PlatformError> {
        let url = self.endpoint(&["functionx", installation_id.to_string().as_str()])?;
        self.send(self.http.get(url).query(filter)).await
    }

    pub(crate) async fn create_function(
        &self,
        function: &Function,
    ) -> Result<Function, PlatformError> {
        let url = self.endpoint(&["functionx", function.installation_id.to_string().as_str()])?;
        self.send(self.http.post(url).json(function)).await
    }

    pub(crate) async fn get_installation(
        &self,
        installation_id: i64,
    ) -> Result<Installation, PlatformError> {
        let url = self.endpoint(&["installation", installation_id.to_string().as_str()])?;
        self.send(self.http.get(url)).await
    }

    /// Resolve `api/v2/<segments>` against the configured base.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(["api", "v2"])
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PlatformError> {
        let response = request
            .basic_auth(API_KEY_USER, Some(&self.api_key))
            .send()
            .await?;

        let status = response.status();
        let url = response.url().to_string();
        debug!("{url} -> {status}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Status { url, status, body });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerAddress;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn api(base: &str) -> RegistryApi {
        let config = LynxClientConfig::builder(
            base.parse().unwrap(),
            "secret",
            BrokerAddress::new("localhost", 1883),
        )
        .build();
        RegistryApi::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_from_bare_host() {
        let url = api("https://lynx.example.com").endpoint(&["devicex", "3"]).unwrap();
        assert_eq!(url.as_str(), "https://lynx.example.com/api/v2/devicex/3");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = api("https://example.com/lynx/")
            .endpoint(&["installation", "7"])
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/lynx/api/v2/installation/7");
    }

    #[test]
    fn test_rejects_non_base_url() {
        let config = LynxClientConfig::builder(
            "mailto:ops@example.com".parse().unwrap(),
            "secret",
            BrokerAddress::new("localhost", 1883),
        )
        .build();
        assert!(matches!(
            RegistryApi::new(&config),
            Err(PlatformError::InvalidBaseUrl(_))
        ));
    }

    /// Serve one canned response on a local port. The handle yields the raw
    /// request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let (base, server) = serve_once("404 Not Found", r#"{"error":"not found"}"#).await;

        let err = api(&base).get_installation(9).await.unwrap_err();
        match err {
            PlatformError::Status { url, status, body } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(url.ends_with("/api/v2/installation/9"));
                assert_eq!(body, r#"{"error":"not found"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_device_lookup_sends_filter_and_credentials() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":5,"type":"virtual","installation_id":3,"meta":{}}]"#,
        )
        .await;
        let filter = Filter::from([("example.type".to_string(), "lynx-manager".to_string())]);

        let devices = api(&base).get_devices(3, &filter).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, 5);
        assert_eq!(devices[0].kind, "virtual");

        let request = server.await.unwrap();
        assert!(
            request.starts_with("GET /api/v2/devicex/3?example.type=lynx-manager "),
            "{request}"
        );
        let authorization = request.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("authorization").then(|| value.trim())
        });
        // base64("apikey:secret")
        assert_eq!(authorization, Some("Basic YXBpa2V5OnNlY3JldA=="));
    }
}
