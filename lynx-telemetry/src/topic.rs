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

//! Publish topic construction.

use lynx_client::{Function, PlatformClient};

use crate::registration::RegistrationError;

/// How a function's stored topic maps onto the broker topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicScheme {
    /// The stored topic as-is.
    Verbatim,
    /// Prefixed with the installation's client ID.
    Namespaced { client_id: i64 },
}

impl TopicScheme {
    pub fn apply(&self, topic: &str) -> String {
        match self {
            TopicScheme::Verbatim => topic.to_string(),
            TopicScheme::Namespaced { client_id } => format!("{client_id}/{topic}"),
        }
    }

    /// Broker topic for a function's readings.
    pub fn topic_for(&self, function: &Function) -> Result<String, RegistrationError> {
        function
            .topic_read()
            .map(|topic| self.apply(topic))
            .ok_or(RegistrationError::MissingTopic {
                function_id: function.id,
            })
    }

    /// Pick the scheme, looking up the installation when namespacing.
    pub async fn resolve(
        client: &dyn PlatformClient,
        installation_id: i64,
        namespaced: bool,
    ) -> Result<Self, RegistrationError> {
        if !namespaced {
            return Ok(TopicScheme::Verbatim);
        }

        let installation = client
            .get_installation(installation_id)
            .await
            .map_err(|source| RegistrationError::LookupInstallation {
                installation_id,
                source,
            })?;
        Ok(TopicScheme::Namespaced {
            client_id: installation.client_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lynx_client::models::META_TOPIC_READ;
    use lynx_client::{Installation, MockPlatformClient};

    fn function() -> Function {
        let mut function =
            Function::new("temperature", 3).with_meta(META_TOPIC_READ, "obj/example/temperature");
        function.id = 99;
        function
    }

    #[test]
    fn test_verbatim_topic() {
        let topic = TopicScheme::Verbatim.topic_for(&function()).unwrap();
        assert_eq!(topic, "obj/example/temperature");
    }

    #[test]
    fn test_namespaced_topic() {
        let topic = TopicScheme::Namespaced { client_id: 42 }
            .topic_for(&function())
            .unwrap();
        assert_eq!(topic, "42/obj/example/temperature");
    }

    #[test]
    fn test_missing_topic() {
        let err = TopicScheme::Verbatim
            .topic_for(&Function::new("temperature", 3))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingTopic { .. }));
    }

    #[tokio::test]
    async fn test_resolve_namespaced_uses_installation_client_id() {
        let mut client = MockPlatformClient::new();
        client
            .expect_get_installation()
            .withf(|id| *id == 3)
            .times(1)
            .returning(|id| {
                Ok(Installation {
                    id,
                    client_id: 42,
                    name: "Example".into(),
                })
            });

        let scheme = TopicScheme::resolve(&client, 3, true).await.unwrap();
        assert_eq!(scheme, TopicScheme::Namespaced { client_id: 42 });
    }

    #[tokio::test]
    async fn test_resolve_verbatim_skips_lookup() {
        let mut client = MockPlatformClient::new();
        client.expect_get_installation().never();

        let scheme = TopicScheme::resolve(&client, 3, false).await.unwrap();
        assert_eq!(scheme, TopicScheme::Verbatim);
    }
}
