//! Actor-owned mutable state.
//!
//! All mutations to participant state, the connection registry, and the
//! connected set are serialized through one `RoomActor` mailbox, so
//! concurrent network events cannot tear a participant's composite state.

pub mod messages;
pub mod room;

pub use messages::{ClientEvent, ConnectionId, EventSender, RoomMessage, ServerEvent};
pub use room::{RoomActor, RoomHandle};
