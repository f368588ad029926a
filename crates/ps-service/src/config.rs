use crate::services::attenuation::AttenuationPolicy;
use base64::{engine::general_purpose, Engine as _};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Minimum length of the session cookie signing key in bytes.
///
/// The signed cookie jar requires a full 512-bit key; shorter keys are a
/// configuration error rather than a silent downgrade.
const COOKIE_KEY_MIN_BYTES: usize = 64;

/// Default staged-session lifetime (five minutes).
const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 300;

/// Default `/auth` rate limit: 10 requests per minute per client.
const DEFAULT_AUTH_RATE_LIMIT_MAX: u32 = 10;
const DEFAULT_AUTH_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// Default voice-session token lifetime.
const DEFAULT_VOICE_TOKEN_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,

    /// Shared secret for the trusted position-ingestion channel. When unset,
    /// `POST /position` is open (development mode).
    pub ingest_secret: Option<SecretString>,

    /// Which attenuation policy every volume computation uses.
    pub attenuation_policy: AttenuationPolicy,

    /// Signing key for the staged-session cookies. Always at least
    /// `COOKIE_KEY_MIN_BYTES` long; generated at startup when not configured
    /// (staged sessions then simply do not survive a restart, which is fine
    /// for a minutes-lived credential).
    pub session_cookie_key: Vec<u8>,

    /// Max-age of the staged-session cookies, in seconds.
    pub session_max_age_seconds: i64,

    /// Fixed-window rate limit for `POST /auth`.
    pub auth_rate_limit_max: u32,
    pub auth_rate_limit_window_seconds: u64,

    /// External identity verification (`None` until configured; the endpoints
    /// that need it answer 500 rather than taking the process down).
    pub identity: Option<IdentityProviderConfig>,

    /// Authorization-code handoff endpoints and client credentials.
    pub oauth: Option<OAuthConfig>,

    /// Voice-session credential issuer.
    pub voice: Option<VoiceIssuerConfig>,
}

#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    pub api_url: String,
    pub api_key: SecretString,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct VoiceIssuerConfig {
    pub api_key: String,
    pub api_secret: SecretString,
    pub url: String,
    pub room: String,
    pub token_ttl_seconds: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: expected a number")]
    InvalidNumber(String),

    #[error("Invalid session cookie key: {0}")]
    InvalidCookieKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Unknown attenuation policy: {0}")]
    InvalidPolicy(String),

    #[error("Failed to generate session cookie key")]
    KeyGeneration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    ///
    /// Credential groups (identity, oauth, voice) are all-or-none: the group
    /// is `Some` only when every required variable is present. A missing
    /// group is not a startup failure — the endpoints that depend on it
    /// report `CONFIG_MISSING` while the rest of the surface stays usable.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let ingest_secret = vars
            .get("PS_INGEST_SECRET")
            .map(|s| SecretString::from(s.clone()));

        let attenuation_policy = match vars.get("PS_ATTENUATION_POLICY").map(String::as_str) {
            None | Some("speaker-quadratic") => AttenuationPolicy::SpeakerQuadratic,
            Some("listener-linear") => AttenuationPolicy::ListenerLinear,
            Some(other) => return Err(ConfigError::InvalidPolicy(other.to_string())),
        };

        let session_cookie_key = match vars.get("SESSION_COOKIE_KEY") {
            Some(encoded) => {
                let key = general_purpose::STANDARD.decode(encoded)?;
                if key.len() < COOKIE_KEY_MIN_BYTES {
                    return Err(ConfigError::InvalidCookieKey(format!(
                        "Expected at least {} bytes, got {}",
                        COOKIE_KEY_MIN_BYTES,
                        key.len()
                    )));
                }
                key
            }
            None => generate_cookie_key()?,
        };

        let session_max_age_seconds = parse_or_default(
            vars,
            "SESSION_MAX_AGE_SECONDS",
            DEFAULT_SESSION_MAX_AGE_SECONDS,
        )?;

        let auth_rate_limit_max =
            parse_or_default(vars, "AUTH_RATE_LIMIT_MAX", DEFAULT_AUTH_RATE_LIMIT_MAX)?;
        let auth_rate_limit_window_seconds = parse_or_default(
            vars,
            "AUTH_RATE_LIMIT_WINDOW_SECONDS",
            DEFAULT_AUTH_RATE_LIMIT_WINDOW_SECONDS,
        )?;

        let identity = match (vars.get("IDENTITY_API_URL"), vars.get("IDENTITY_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(IdentityProviderConfig {
                api_url: api_url.clone(),
                api_key: SecretString::from(api_key.clone()),
            }),
            _ => None,
        };

        let oauth = match (
            vars.get("OAUTH_CLIENT_ID"),
            vars.get("OAUTH_CLIENT_SECRET"),
            vars.get("OAUTH_AUTHORIZE_URL"),
            vars.get("OAUTH_TOKEN_URL"),
            vars.get("OAUTH_USERINFO_URL"),
            vars.get("OAUTH_REDIRECT_URI"),
        ) {
            (
                Some(client_id),
                Some(client_secret),
                Some(authorize_url),
                Some(token_url),
                Some(userinfo_url),
                Some(redirect_uri),
            ) => Some(OAuthConfig {
                client_id: client_id.clone(),
                client_secret: SecretString::from(client_secret.clone()),
                authorize_url: authorize_url.clone(),
                token_url: token_url.clone(),
                userinfo_url: userinfo_url.clone(),
                redirect_uri: redirect_uri.clone(),
            }),
            _ => None,
        };

        let voice = match (
            vars.get("VOICE_API_KEY"),
            vars.get("VOICE_API_SECRET"),
            vars.get("VOICE_URL"),
        ) {
            (Some(api_key), Some(api_secret), Some(url)) => Some(VoiceIssuerConfig {
                api_key: api_key.clone(),
                api_secret: SecretString::from(api_secret.clone()),
                url: url.clone(),
                room: vars
                    .get("VOICE_ROOM")
                    .cloned()
                    .unwrap_or_else(|| "main-room".to_string()),
                token_ttl_seconds: parse_or_default(
                    vars,
                    "VOICE_TOKEN_TTL_SECONDS",
                    DEFAULT_VOICE_TOKEN_TTL_SECONDS,
                )?,
            }),
            _ => None,
        };

        Ok(Config {
            bind_address,
            ingest_secret,
            attenuation_policy,
            session_cookie_key,
            session_max_age_seconds,
            auth_rate_limit_max,
            auth_rate_limit_window_seconds,
            identity,
            oauth,
            voice,
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(name.to_string())),
        None => Ok(default),
    }
}

/// Generate a random cookie signing key via the OS CSPRNG.
fn generate_cookie_key() -> Result<Vec<u8>, ConfigError> {
    use ring::rand::{SecureRandom, SystemRandom};

    let rng = SystemRandom::new();
    let mut key = vec![0u8; COOKIE_KEY_MIN_BYTES];
    rng.fill(&mut key).map_err(|_| ConfigError::KeyGeneration)?;
    Ok(key)
}
