//! Service layer for the proximity state engine.
//!
//! # Components
//!
//! - `attenuation` - Pairwise volume computation (both historical policies)
//! - `identity_client` - HTTP client for external identity verification
//! - `oauth_client` - Authorization-code exchange and profile lookup
//! - `rate_limit` - In-memory fixed-window rate limiter
//! - `voice_token` - Voice-session credential minting

pub mod attenuation;
pub mod identity_client;
pub mod oauth_client;
pub mod rate_limit;
pub mod voice_token;

pub use identity_client::IdentityClient;
pub use oauth_client::OAuthClient;
pub use rate_limit::FixedWindowLimiter;
