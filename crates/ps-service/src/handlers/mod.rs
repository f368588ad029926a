//! HTTP and WebSocket request handlers.

pub mod auth_handler;
pub mod health;
pub mod ingest_handler;
pub mod metrics_handler;
pub mod session_handler;
pub mod state_handler;
pub mod ws_handler;

pub use auth_handler::issue_voice_session;
pub use health::{health_check, readiness_check};
pub use ingest_handler::{get_speaking, report_position, report_speaking};
pub use metrics_handler::metrics_handler;
pub use session_handler::{claim_session, login, oauth_callback};
pub use state_handler::{get_connected, get_listener_state, get_state_all, get_volumes};
pub use ws_handler::ws_upgrade;
