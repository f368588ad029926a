//! Mailbox messages for the room actor, and the realtime wire events.

use crate::models::{ListenerState, Mode, Position, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Identifier of one transport connection.
pub type ConnectionId = Uuid;

/// Sender half used to push events to one connected client.
///
/// Sends are best-effort and never awaited: a handle whose receiver is gone
/// is a no-op target, not an error.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Server→client events on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Targeted: the recipient's own mute state changed (or is being forced
    /// on a fresh connection).
    #[serde(rename = "muteState")]
    MuteState { muted: bool },

    /// Broadcast to every handle, anonymous observers included.
    #[serde(rename = "connectedCount")]
    ConnectedCount { count: usize },

    /// Broadcast to identified handles after each state-mutating ingestion.
    #[serde(rename = "state-all")]
    StateAll(StateSnapshot),
}

/// Client→server events on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "speaking")]
    Speaking { speaking: bool },
}

/// Messages handled by the room actor.
#[derive(Debug)]
pub enum RoomMessage {
    ReportPosition {
        user_id: String,
        position: Position,
        mode: Mode,
        respond_to: oneshot::Sender<()>,
    },
    ReportSpeaking {
        user_id: String,
        speaking: bool,
        respond_to: oneshot::Sender<()>,
    },
    Connect {
        user_id: Option<String>,
        sender: EventSender,
        respond_to: oneshot::Sender<ConnectionId>,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    GetSpeaking {
        user_id: String,
        respond_to: oneshot::Sender<bool>,
    },
    GetVolumes {
        user_id: String,
        respond_to: oneshot::Sender<HashMap<String, f64>>,
    },
    GetListenerState {
        user_id: String,
        respond_to: oneshot::Sender<ListenerState>,
    },
    GetStateAll {
        respond_to: oneshot::Sender<StateSnapshot>,
    },
    GetConnectedCount {
        respond_to: oneshot::Sender<usize>,
    },
}
