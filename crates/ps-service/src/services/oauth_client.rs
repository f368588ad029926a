//! Authorization-code exchange with the external identity provider.
//!
//! Two server-to-server calls back the handoff flow: the code-for-token
//! exchange and the profile (userinfo) lookup. Failures carry the upstream
//! status and a best-effort detail string; nothing is staged on failure.
//!
//! The provider also offers identity claims inside a signed id-token, which
//! would save the userinfo round trip — deliberately not used here, because
//! the decoded payload would be trusted without signature verification.

use crate::config::OAuthConfig;
use crate::errors::PsError;
use common::secret::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Request timeout for provider calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection timeout for provider calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on upstream detail strings surfaced to clients.
const MAX_DETAIL_LEN: usize = 256;

/// Token endpoint response. Only the access token is consumed.
#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: Option<String>,
}

/// Userinfo endpoint response.
#[derive(Debug, Deserialize)]
pub struct OAuthProfile {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl OAuthProfile {
    /// Display name, preferring `name` over `preferred_username`, falling
    /// back to the subject id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.preferred_username.as_deref())
            .unwrap_or(&self.sub)
    }
}

pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self, PsError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PsError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// URL of the provider's authorization endpoint with this service's
    /// client id and callback target baked in.
    pub fn authorize_redirect_url(&self) -> Result<String, PsError> {
        let url = reqwest::Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", "openid profile"),
            ],
        )
        .map_err(|e| PsError::Internal(format!("invalid authorize URL: {e}")))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, PsError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                (
                    "client_secret",
                    self.config.client_secret.expose_secret(),
                ),
            ])
            .send()
            .await
            .map_err(|e| upstream_transport_error("token exchange", &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = truncate(&response.text().await.unwrap_or_default());
            debug!(
                target: "ps.services.oauth",
                status = %status,
                "Token exchange rejected"
            );
            return Err(PsError::Upstream {
                status: status.as_u16(),
                detail: format!("token exchange failed: {detail}"),
            });
        }

        let payload: TokenExchangeResponse = response.json().await.map_err(|e| {
            PsError::Upstream {
                status: 502,
                detail: format!("malformed token response: {e}"),
            }
        })?;

        payload.access_token.ok_or(PsError::Upstream {
            status: 502,
            detail: "token response carried no access token".to_string(),
        })
    }

    /// Resolve the authenticated user's profile from an access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, PsError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| upstream_transport_error("profile lookup", &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = truncate(&response.text().await.unwrap_or_default());
            return Err(PsError::Upstream {
                status: status.as_u16(),
                detail: format!("profile lookup failed: {detail}"),
            });
        }

        response.json().await.map_err(|e| PsError::Upstream {
            status: 502,
            detail: format!("malformed profile response: {e}"),
        })
    }
}

fn upstream_transport_error(operation: &str, error: &reqwest::Error) -> PsError {
    PsError::Upstream {
        status: 502,
        detail: format!("{operation} transport error: {error}"),
    }
}

fn truncate(detail: &str) -> String {
    detail.chars().take(MAX_DETAIL_LEN).collect()
}
