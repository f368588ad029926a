//! Test utilities for the PS service.
//!
//! Provides `TestPsServer` for spawning real server instances in tests.

pub mod server_harness;

pub use server_harness::TestPsServer;
