//! Proximity State (PS) Service Library
//!
//! This library provides the proximity voice state engine for Earshot:
//! per-participant spatial state, pairwise audio attenuation, push/pull
//! state synchronization, and the one-time voice-credential handoff.
//!
//! # Modules
//!
//! - `actors` - Room actor owning all mutable state and push fan-out
//! - `config` - Service configuration
//! - `errors` - Error types
//! - `handlers` - HTTP and WebSocket request handlers
//! - `models` - Data models and wire shapes
//! - `observability` - Metrics recorder and helpers
//! - `routes` - Router assembly and application state
//! - `services` - Attenuation math, upstream clients, token minting

pub mod actors;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
