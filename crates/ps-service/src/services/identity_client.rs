//! HTTP client for the external identity provider.
//!
//! One call: look a user up by id with the platform API key. Any failure —
//! network, non-2xx, malformed payload — collapses to "unknown user"; the
//! caller decides whether that is a 401.

use crate::config::IdentityProviderConfig;
use crate::errors::PsError;
use common::secret::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Request timeout for identity lookups.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection timeout for identity lookups.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Profile fields the service consumes from the provider.
#[derive(Debug, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
}

pub struct IdentityClient {
    http: reqwest::Client,
    config: IdentityProviderConfig,
}

impl IdentityClient {
    pub fn new(config: IdentityProviderConfig) -> Result<Self, PsError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PsError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Verify a user id against the provider.
    ///
    /// Returns `None` for any failure — an unknown user and an unreachable
    /// provider are indistinguishable to callers by design.
    pub async fn verify_user(&self, user_id: &str) -> Option<UserProfile> {
        let url = format!("{}/users/{}", self.config.api_url, user_id);

        let response = self
            .http
            .get(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => resp.json::<UserProfile>().await.ok(),
            Ok(resp) => {
                debug!(
                    target: "ps.services.identity",
                    status = %resp.status(),
                    "Identity lookup returned non-success status"
                );
                None
            }
            Err(e) => {
                debug!(
                    target: "ps.services.identity",
                    error = %e,
                    "Identity lookup failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server_uri: String) -> IdentityClient {
        IdentityClient::new(IdentityProviderConfig {
            api_url: server_uri,
            api_key: SecretString::from("platform-key"),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_user_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/12345"))
            .and(header("x-api-key", "platform-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Ada"
            })))
            .mount(&server)
            .await;

        let profile = client_for(server.uri()).verify_user("12345").await;
        assert_eq!(profile.unwrap().name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_verify_user_not_found_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/404404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let profile = client_for(server.uri()).verify_user("404404").await;
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn test_verify_user_unreachable_provider_is_none() {
        // Nothing listening on this port.
        let profile = client_for("http://127.0.0.1:9".to_string())
            .verify_user("12345")
            .await;
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn test_verify_user_malformed_payload_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/12345"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let profile = client_for(server.uri()).verify_user("12345").await;
        assert!(profile.is_none());
    }
}
