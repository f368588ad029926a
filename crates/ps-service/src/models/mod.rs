//! Data models and wire shapes for the proximity state engine.
//!
//! The wire field names (`userId`, `lx`, `muteState`, ...) are fixed by the
//! deployed game and browser clients; serde renames keep the Rust side
//! idiomatic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default audible range in studs, used for modes without their own entry.
pub const DEFAULT_RANGE: f64 = 25.0;

/// Communication mode: a named range/privacy tier.
///
/// Unrecognized wire values land on `Unknown` — an explicit arm rather than
/// a silent string-keyed fallback, so unknown-mode handling is testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    Whisper,
    Talk,
    Shout,
    Mute,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Mode {
    /// Maximum audible range for a participant in this mode.
    ///
    /// `Mute` never reaches a range lookup in the speaker-gated policy (it is
    /// gated to zero volume first); the legacy listener policy falls back to
    /// the default range for it, matching the historical behavior.
    #[must_use]
    pub fn max_range(self) -> f64 {
        match self {
            Mode::Whisper => 10.0,
            Mode::Talk => 25.0,
            Mode::Shout => 60.0,
            Mode::Mute | Mode::Unknown => DEFAULT_RANGE,
        }
    }

    /// Whether this mode silences the participant entirely.
    #[must_use]
    pub fn is_muted(self) -> bool {
        self == Mode::Mute
    }
}

/// A participant's reported world position, with optional look direction.
///
/// Stored flat because that is the wire shape the game reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lz: Option<f64>,
}

impl Position {
    /// Euclidean distance between two positions.
    #[must_use]
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Latest-value state for one participant.
///
/// A participant may have `speaking` set with no position, or a position with
/// no speaking report; both are ordinary states, not errors. Position data
/// survives disconnects (it is orphaned, recoverable on reconnect); the
/// speaking flag does not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParticipantState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub mode: Mode,
    pub speaking: bool,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /position`.
#[derive(Debug, Deserialize)]
pub struct PositionReport {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub lx: Option<f64>,
    #[serde(default)]
    pub ly: Option<f64>,
    #[serde(default)]
    pub lz: Option<f64>,
    #[serde(default)]
    pub mode: Mode,
}

impl PositionReport {
    /// The position carried by this report.
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
            z: self.z,
            lx: self.lx,
            ly: self.ly,
            lz: self.lz,
        }
    }
}

/// Body of `POST /speaking`.
#[derive(Debug, Deserialize)]
pub struct SpeakingReport {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub speaking: bool,
}

/// Body of `POST /auth`.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
}

// ============================================================================
// Response bodies
// ============================================================================

/// Generic mutation acknowledgement.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Response of `POST /auth` and `GET /auth/session`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceSessionResponse {
    pub token: String,
    pub url: String,
    pub username: String,
}

/// Response of `GET /auth/session`: the staged credential, claimable once.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaimResponse {
    pub token: String,
    pub url: String,
    pub username: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Response of `GET /speaking/:user_id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakingResponse {
    pub speaking: bool,
}

/// Response of `GET /connected`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectedResponse {
    pub count: usize,
}

/// Response of `GET /state/:user_id`: the caller's own combined state.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListenerState {
    pub speaking: bool,
    pub volumes: HashMap<String, f64>,
}

/// Per-participant entry in the full snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub speaking: bool,
    pub volumes: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Response of `GET /state-all` and payload of the `state-all` push event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub players: HashMap<String, PlayerState>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_deserializes_known_values() {
        assert_eq!(serde_json::from_str::<Mode>("\"Whisper\"").unwrap(), Mode::Whisper);
        assert_eq!(serde_json::from_str::<Mode>("\"Talk\"").unwrap(), Mode::Talk);
        assert_eq!(serde_json::from_str::<Mode>("\"Shout\"").unwrap(), Mode::Shout);
        assert_eq!(serde_json::from_str::<Mode>("\"Mute\"").unwrap(), Mode::Mute);
    }

    #[test]
    fn test_mode_unrecognized_falls_back_to_unknown() {
        let mode: Mode = serde_json::from_str("\"Yodel\"").unwrap();
        assert_eq!(mode, Mode::Unknown);
        assert!((mode.max_range() - DEFAULT_RANGE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mode_ranges() {
        assert!((Mode::Whisper.max_range() - 10.0).abs() < f64::EPSILON);
        assert!((Mode::Talk.max_range() - 25.0).abs() < f64::EPSILON);
        assert!((Mode::Shout.max_range() - 60.0).abs() < f64::EPSILON);
        assert!((Mode::Mute.max_range() - DEFAULT_RANGE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_mute_is_muted() {
        assert!(Mode::Mute.is_muted());
        assert!(!Mode::Whisper.is_muted());
        assert!(!Mode::Talk.is_muted());
        assert!(!Mode::Shout.is_muted());
        assert!(!Mode::Unknown.is_muted());
    }

    #[test]
    fn test_position_distance() {
        let a = Position { x: 0.0, y: 0.0, z: 0.0, lx: None, ly: None, lz: None };
        let b = Position { x: 3.0, y: 4.0, z: 0.0, lx: None, ly: None, lz: None };
        assert!((a.distance_to(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_position_report_accepts_missing_mode_and_look() {
        let report: PositionReport =
            serde_json::from_str(r#"{"userId":"12345","x":1.0,"y":2.0,"z":3.0}"#).unwrap();
        assert_eq!(report.mode, Mode::Unknown);
        assert_eq!(report.position().lx, None);
    }

    #[test]
    fn test_participant_state_defaults() {
        let state = ParticipantState::default();
        assert!(state.position.is_none());
        assert_eq!(state.mode, Mode::Unknown);
        assert!(!state.speaking);
    }

    #[test]
    fn test_snapshot_omits_missing_position() {
        let mut snapshot = StateSnapshot::default();
        snapshot.players.insert(
            "7".to_string(),
            PlayerState { speaking: true, volumes: HashMap::new(), position: None },
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("position"));
    }
}
