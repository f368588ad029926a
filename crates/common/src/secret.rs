//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types
//! for all sensitive values like shared secrets, API keys, bearer tokens,
//! and OAuth client secrets.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while holding one gets safe logging behavior for free.
//! Secrets are zeroized on drop. To read the actual value you must call
//! `expose_secret()` explicitly.
//!
//! # Constant-Time Comparison
//!
//! [`verify_shared_secret`] compares a presented credential against the
//! configured one without leaking match position through timing. A length
//! mismatch is an ordinary `false`, never an error or a panic.

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Compare a presented secret against the expected secret in constant time.
///
/// Returns `true` only when the two byte strings are equal. Unequal lengths
/// compare unequal without examining content — `ring::constant_time` rejects
/// them up front, which is a handled mismatch rather than an exceptional one.
#[must_use]
pub fn verify_shared_secret(expected: &SecretString, presented: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(
        expected.expose_secret().as_bytes(),
        presented.as_bytes(),
    )
    .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("hunter2");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("password123");
        assert_eq!(secret.expose_secret(), "password123");
    }

    #[test]
    fn test_deserialize() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Credentials {
            client_id: String,
            client_secret: SecretString,
        }

        let json = r#"{"client_id": "svc-123", "client_secret": "my-secret-value"}"#;
        let creds: Credentials = serde_json::from_str(json).expect("deserialize");

        assert_eq!(creds.client_secret.expose_secret(), "my-secret-value");

        let debug = format!("{creds:?}");
        assert!(!debug.contains("my-secret-value"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_verify_shared_secret_match() {
        let expected = SecretString::from("trusted-ingest-secret");
        assert!(verify_shared_secret(&expected, "trusted-ingest-secret"));
    }

    #[test]
    fn test_verify_shared_secret_mismatch() {
        let expected = SecretString::from("trusted-ingest-secret");
        assert!(!verify_shared_secret(&expected, "trusted-ingest-secreX"));
    }

    #[test]
    fn test_verify_shared_secret_shorter_is_rejected_not_thrown() {
        let expected = SecretString::from("trusted-ingest-secret");
        assert!(!verify_shared_secret(&expected, "trusted-ingest-secre"));
    }

    #[test]
    fn test_verify_shared_secret_longer_is_rejected_not_thrown() {
        let expected = SecretString::from("trusted-ingest-secret");
        assert!(!verify_shared_secret(&expected, "trusted-ingest-secret1"));
    }

    #[test]
    fn test_verify_shared_secret_empty_presented() {
        let expected = SecretString::from("trusted-ingest-secret");
        assert!(!verify_shared_secret(&expected, ""));
    }
}
