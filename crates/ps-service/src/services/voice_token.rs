//! Voice-session credential minting.
//!
//! The voice issuer accepts HS256 JWTs signed with the API secret: `iss` is
//! the API key, `sub` the participant identity, and the `video` claim carries
//! the room grants. The token is the only thing the downstream media server
//! ever sees — this service never touches audio itself.

use crate::config::VoiceIssuerConfig;
use crate::errors::PsError;
use common::secret::ExposeSecret;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Room grants embedded in the voice token.
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoGrant {
    pub room: String,
    #[serde(rename = "roomJoin")]
    pub room_join: bool,
    #[serde(rename = "canPublish")]
    pub can_publish: bool,
    #[serde(rename = "canSubscribe")]
    pub can_subscribe: bool,
}

/// Claims of the voice-session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// Mint a voice-session token for `identity` joining the configured room
/// with full publish/subscribe grants.
pub fn mint_voice_token(
    config: &VoiceIssuerConfig,
    identity: &str,
    display_name: &str,
) -> Result<String, PsError> {
    let now = chrono::Utc::now().timestamp();

    let claims = VoiceClaims {
        iss: config.api_key.clone(),
        sub: identity.to_string(),
        name: display_name.to_string(),
        nbf: now,
        exp: now + config.token_ttl_seconds,
        video: VideoGrant {
            room: config.room.clone(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
        },
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.api_secret.expose_secret().as_bytes()),
    )
    .map_err(|e| PsError::Internal(format!("voice token signing failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn test_config() -> VoiceIssuerConfig {
        VoiceIssuerConfig {
            api_key: "issuer-key".to_string(),
            api_secret: SecretString::from("issuer-secret"),
            url: "wss://voice.example.com".to_string(),
            room: "plaza".to_string(),
            token_ttl_seconds: 600,
        }
    }

    fn decode_claims(token: &str) -> VoiceClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        decode::<VoiceClaims>(
            token,
            &DecodingKey::from_secret(b"issuer-secret"),
            &validation,
        )
        .expect("token should verify against the issuer secret")
        .claims
    }

    #[test]
    fn test_token_carries_identity_and_grants() {
        let token = mint_voice_token(&test_config(), "12345", "Ada").unwrap();
        let claims = decode_claims(&token);

        assert_eq!(claims.iss, "issuer-key");
        assert_eq!(claims.sub, "12345");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.video.room, "plaza");
        assert!(claims.video.room_join);
        assert!(claims.video.can_publish);
        assert!(claims.video.can_subscribe);
    }

    #[test]
    fn test_token_expiry_matches_configured_ttl() {
        let token = mint_voice_token(&test_config(), "12345", "Ada").unwrap();
        let claims = decode_claims(&token);

        let lifetime = claims.exp - claims.nbf;
        assert_eq!(lifetime, 600);
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = mint_voice_token(&test_config(), "12345", "Ada").unwrap();

        let result = decode::<VoiceClaims>(
            &token,
            &DecodingKey::from_secret(b"some-other-secret"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }
}
