//! `RoomActor` - single actor that owns the shared spatial state.
//!
//! The actor owns:
//! - participant state (position/mode/speaking, latest-value only)
//! - the connection registry (at most one live handle per identity)
//! - the connected set, whose cardinality is broadcast on every change
//!
//! Reads return point-in-time copies; pushes are fire-and-forget. Polling is
//! the correctness fallback for clients that miss a push.

use crate::errors::PsError;
use crate::models::{ListenerState, Mode, ParticipantState, Position, StateSnapshot};
use crate::observability::metrics;
use crate::services::attenuation::{self, AttenuationPolicy};

use super::messages::{ConnectionId, EventSender, RoomMessage, ServerEvent};

use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Default channel buffer size for the room mailbox.
const ROOM_CHANNEL_BUFFER: usize = 500;

/// Handle to the `RoomActor`.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
}

impl RoomHandle {
    /// Overwrite a participant's position and mode.
    pub async fn report_position(
        &self,
        user_id: String,
        position: Position,
        mode: Mode,
    ) -> Result<(), PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::ReportPosition {
                user_id,
                position,
                mode,
                respond_to: tx,
            })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    /// Overwrite a participant's speaking flag.
    pub async fn report_speaking(&self, user_id: String, speaking: bool) -> Result<(), PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::ReportSpeaking {
                user_id,
                speaking,
                respond_to: tx,
            })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    /// Register a transport handle, optionally bound to an identity.
    pub async fn connect(
        &self,
        user_id: Option<String>,
        sender: EventSender,
    ) -> Result<ConnectionId, PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Connect {
                user_id,
                sender,
                respond_to: tx,
            })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    /// Deregister a transport handle.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), PsError> {
        self.sender
            .send(RoomMessage::Disconnect { connection_id })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))
    }

    pub async fn speaking_state(&self, user_id: String) -> Result<bool, PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetSpeaking {
                user_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn volumes_for(&self, user_id: String) -> Result<HashMap<String, f64>, PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetVolumes {
                user_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn listener_state(&self, user_id: String) -> Result<ListenerState, PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetListenerState {
                user_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn state_all(&self) -> Result<StateSnapshot, PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetStateAll { respond_to: tx })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn connected_count(&self) -> Result<usize, PsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetConnectedCount { respond_to: tx })
            .await
            .map_err(|e| PsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PsError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the room actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// One registered transport handle.
struct Connection {
    user_id: Option<String>,
    sender: EventSender,
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    /// Message receiver.
    receiver: mpsc::Receiver<RoomMessage>,
    /// Cancellation token.
    cancel_token: CancellationToken,
    /// Latest-value participant state by user id.
    participants: HashMap<String, ParticipantState>,
    /// All live transport handles (identified and anonymous observers).
    connections: HashMap<ConnectionId, Connection>,
    /// Current connection per identity. Insertion replaces: the previous
    /// socket stays registered for global broadcasts but becomes unreachable
    /// for targeted pushes.
    user_index: HashMap<String, ConnectionId>,
    /// Attenuation policy used for snapshots pushed from here.
    policy: AttenuationPolicy,
}

impl RoomActor {
    /// Spawn the room actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        policy: AttenuationPolicy,
        cancel_token: CancellationToken,
    ) -> (RoomHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);

        let actor = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            participants: HashMap::new(),
            connections: HashMap::new(),
            user_index: HashMap::new(),
            policy,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomHandle {
            sender,
            cancel_token,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "ps.actor.room")]
    async fn run(mut self) {
        info!(target: "ps.actor.room", "RoomActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: "ps.actor.room", "RoomActor received cancellation signal");
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!(target: "ps.actor.room", "RoomActor channel closed, exiting");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "ps.actor.room",
            participants = self.participants.len(),
            connections = self.connections.len(),
            "RoomActor stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::ReportPosition {
                user_id,
                position,
                mode,
                respond_to,
            } => {
                self.handle_report_position(&user_id, position, mode);
                let _ = respond_to.send(());
            }

            RoomMessage::ReportSpeaking {
                user_id,
                speaking,
                respond_to,
            } => {
                self.handle_report_speaking(&user_id, speaking);
                let _ = respond_to.send(());
            }

            RoomMessage::Connect {
                user_id,
                sender,
                respond_to,
            } => {
                let connection_id = self.handle_connect(user_id, sender);
                let _ = respond_to.send(connection_id);
            }

            RoomMessage::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id);
            }

            RoomMessage::GetSpeaking {
                user_id,
                respond_to,
            } => {
                let speaking = self
                    .participants
                    .get(&user_id)
                    .is_some_and(|p| p.speaking);
                let _ = respond_to.send(speaking);
            }

            RoomMessage::GetVolumes {
                user_id,
                respond_to,
            } => {
                let volumes =
                    attenuation::volumes_for(self.policy, &user_id, &self.participants);
                let _ = respond_to.send(volumes);
            }

            RoomMessage::GetListenerState {
                user_id,
                respond_to,
            } => {
                let state = ListenerState {
                    speaking: self
                        .participants
                        .get(&user_id)
                        .is_some_and(|p| p.speaking),
                    volumes: attenuation::volumes_for(self.policy, &user_id, &self.participants),
                };
                let _ = respond_to.send(state);
            }

            RoomMessage::GetStateAll { respond_to } => {
                let snapshot = attenuation::build_state_snapshot(self.policy, &self.participants);
                let _ = respond_to.send(snapshot);
            }

            RoomMessage::GetConnectedCount { respond_to } => {
                let _ = respond_to.send(self.user_index.len());
            }
        }
    }

    fn handle_report_position(&mut self, user_id: &str, position: Position, mode: Mode) {
        let entry = self.participants.entry(user_id.to_string()).or_default();
        let was_muted = entry.mode.is_muted();

        entry.position = Some(position);
        entry.mode = mode;

        metrics::record_position_update();

        // Targeted mute sync: only when the mode crosses the muted/unmuted
        // boundary, and only to the participant's own handle.
        if was_muted != mode.is_muted() {
            self.notify_user(user_id, ServerEvent::MuteState {
                muted: mode.is_muted(),
            });
        }

        self.broadcast_snapshot();
    }

    fn handle_report_speaking(&mut self, user_id: &str, speaking: bool) {
        let entry = self.participants.entry(user_id.to_string()).or_default();
        entry.speaking = speaking;

        metrics::record_speaking_update();

        self.broadcast_snapshot();
    }

    fn handle_connect(&mut self, user_id: Option<String>, sender: EventSender) -> ConnectionId {
        let connection_id = Uuid::new_v4();

        match user_id {
            Some(uid) => {
                debug!(
                    target: "ps.actor.room",
                    connection_id = %connection_id,
                    user_id = %uid,
                    "Identified connection registered"
                );

                self.connections.insert(
                    connection_id,
                    Connection {
                        user_id: Some(uid.clone()),
                        sender,
                    },
                );
                self.user_index.insert(uid, connection_id);

                self.broadcast_connected_count();

                // Safety default: force mute until the first authoritative
                // mode sync arrives from the trusted ingestion source.
                self.notify_connection(connection_id, ServerEvent::MuteState { muted: true });
            }
            None => {
                debug!(
                    target: "ps.actor.room",
                    connection_id = %connection_id,
                    "Anonymous observer registered"
                );

                // Observers get the current count immediately and only ever
                // see count broadcasts, never state or volume data.
                let count = self.user_index.len();
                let _ = sender.send(ServerEvent::ConnectedCount { count });

                self.connections.insert(
                    connection_id,
                    Connection {
                        user_id: None,
                        sender,
                    },
                );
            }
        }

        metrics::record_connected_count(self.user_index.len());
        connection_id
    }

    fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        let Some(connection) = self.connections.remove(&connection_id) else {
            return;
        };

        if let Some(uid) = connection.user_id {
            // Identity cleanup only while this connection still owns the
            // mapping; a stale socket's disconnect must not kick a newer
            // connection out of the connected set.
            if self.user_index.get(&uid) == Some(&connection_id) {
                self.user_index.remove(&uid);

                // Speaking is ephemeral; last-known position is sticky and
                // stays recoverable on reconnect. An entry that never held a
                // position carries nothing worth keeping.
                let drop_entry = match self.participants.get_mut(&uid) {
                    Some(participant) => {
                        participant.speaking = false;
                        participant.position.is_none()
                    }
                    None => false,
                };
                if drop_entry {
                    self.participants.remove(&uid);
                }

                debug!(
                    target: "ps.actor.room",
                    connection_id = %connection_id,
                    user_id = %uid,
                    "Identified connection deregistered"
                );

                self.broadcast_connected_count();
                metrics::record_connected_count(self.user_index.len());
            }
        }
    }

    /// Send an event to one user's current handle, best-effort.
    fn notify_user(&self, user_id: &str, event: ServerEvent) {
        if let Some(connection_id) = self.user_index.get(user_id) {
            self.notify_connection(*connection_id, event);
        }
    }

    /// Send an event to one connection, best-effort.
    fn notify_connection(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(connection) = self.connections.get(&connection_id) {
            metrics::record_push_event(event_kind(&event));
            let _ = connection.sender.send(event);
        }
    }

    /// Broadcast the connected-set cardinality to every handle, anonymous
    /// observers included.
    fn broadcast_connected_count(&self) {
        let count = self.user_index.len();
        for connection in self.connections.values() {
            metrics::record_push_event("connectedCount");
            let _ = connection.sender.send(ServerEvent::ConnectedCount { count });
        }
    }

    /// Broadcast the full state snapshot to identified handles.
    fn broadcast_snapshot(&self) {
        let snapshot = attenuation::build_state_snapshot(self.policy, &self.participants);
        for connection in self.connections.values() {
            if connection.user_id.is_some() {
                metrics::record_push_event("state-all");
                let _ = connection.sender.send(ServerEvent::StateAll(snapshot.clone()));
            }
        }
    }
}

fn event_kind(event: &ServerEvent) -> &'static str {
    match event {
        ServerEvent::MuteState { .. } => "muteState",
        ServerEvent::ConnectedCount { .. } => "connectedCount",
        ServerEvent::StateAll(_) => "state-all",
    }
}
