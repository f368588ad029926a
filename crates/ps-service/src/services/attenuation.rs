//! Pairwise audio attenuation.
//!
//! Two policies exist across deployed server generations and both are kept,
//! selected by configuration and never blended within one response:
//!
//! - [`AttenuationPolicy::SpeakerQuadratic`] (canonical): the speaker's mode
//!   sets the range — the speaker controls their own loudness — with
//!   quadratic falloff and hard gating on mute/silence.
//! - [`AttenuationPolicy::ListenerLinear`] (legacy): the listener's mode sets
//!   the range, linear falloff, symmetric, not speaking/mute aware.
//!
//! All functions are pure and run over a point-in-time snapshot; results are
//! always in `[0, 1]` and never NaN.

use crate::models::{ParticipantState, PlayerState, StateSnapshot};
use std::collections::HashMap;

/// Which volume curve the service applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttenuationPolicy {
    /// Speaker-mode range, quadratic falloff, gated on speaking/mute.
    SpeakerQuadratic,
    /// Listener-mode range, linear falloff, ungated.
    ListenerLinear,
}

/// Volume of `speaker` as heard by `listener` under the given policy.
#[must_use]
pub fn volume(
    policy: AttenuationPolicy,
    listener: &ParticipantState,
    speaker: &ParticipantState,
) -> f64 {
    match policy {
        AttenuationPolicy::SpeakerQuadratic => speaker_quadratic(listener, speaker),
        AttenuationPolicy::ListenerLinear => listener_linear(listener, speaker),
    }
}

/// Canonical policy: silent or muted speakers contribute zero volume, the
/// speaker's mode sets the audible range, and falloff is quadratic so
/// attenuation stays smooth near the range edge.
#[must_use]
pub fn speaker_quadratic(listener: &ParticipantState, speaker: &ParticipantState) -> f64 {
    if !speaker.speaking || speaker.mode.is_muted() {
        return 0.0;
    }

    let (Some(listener_pos), Some(speaker_pos)) = (listener.position, speaker.position) else {
        return 0.0;
    };

    let distance = listener_pos.distance_to(&speaker_pos);
    // Guard against a zero range: divide by at least 1.
    let range = speaker.mode.max_range().max(1.0);

    if distance > range {
        return 0.0;
    }

    (1.0 - distance / range).powi(2)
}

/// Legacy policy: the listener's mode sets the range, decay is linear, and
/// speaking/mute state is ignored.
#[must_use]
pub fn listener_linear(listener: &ParticipantState, speaker: &ParticipantState) -> f64 {
    let (Some(listener_pos), Some(speaker_pos)) = (listener.position, speaker.position) else {
        return 0.0;
    };

    let distance = listener_pos.distance_to(&speaker_pos);
    let range = listener.mode.max_range().max(1.0);

    if distance > range {
        return 0.0;
    }

    1.0 - distance / range
}

/// Volumes of every other known participant as heard by `listener_id`.
///
/// Returns an empty map when the listener is unknown or has not yet reported
/// a position — absence is an ordinary state, not an error.
#[must_use]
pub fn volumes_for(
    policy: AttenuationPolicy,
    listener_id: &str,
    participants: &HashMap<String, ParticipantState>,
) -> HashMap<String, f64> {
    let Some(listener) = participants.get(listener_id) else {
        return HashMap::new();
    };
    if listener.position.is_none() {
        return HashMap::new();
    }

    participants
        .iter()
        .filter(|(id, _)| id.as_str() != listener_id)
        .map(|(id, speaker)| (id.clone(), volume(policy, listener, speaker)))
        .collect()
}

/// Full snapshot: for every known participant, their speaking flag, last
/// position, and the volume of every other participant as they hear it.
#[must_use]
pub fn build_state_snapshot(
    policy: AttenuationPolicy,
    participants: &HashMap<String, ParticipantState>,
) -> StateSnapshot {
    let players = participants
        .iter()
        .map(|(id, me)| {
            let volumes = participants
                .iter()
                .filter(|(other_id, _)| other_id.as_str() != id.as_str())
                .map(|(other_id, other)| (other_id.clone(), volume(policy, me, other)))
                .collect();

            (
                id.clone(),
                PlayerState {
                    speaking: me.speaking,
                    volumes,
                    position: me.position,
                },
            )
        })
        .collect();

    StateSnapshot { players }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{Mode, Position};

    fn at(x: f64, y: f64, z: f64) -> Option<Position> {
        Some(Position { x, y, z, lx: None, ly: None, lz: None })
    }

    fn participant(pos: Option<Position>, mode: Mode, speaking: bool) -> ParticipantState {
        ParticipantState { position: pos, mode, speaking }
    }

    #[test]
    fn test_quadratic_talk_at_ten_studs_is_0_36() {
        let speaker = participant(at(0.0, 0.0, 0.0), Mode::Talk, true);
        let listener = participant(at(10.0, 0.0, 0.0), Mode::Talk, false);

        let v = speaker_quadratic(&listener, &speaker);
        assert!((v - 0.36).abs() < 1e-12, "expected 0.36, got {v}");
    }

    #[test]
    fn test_quadratic_silent_speaker_is_zero_regardless_of_distance() {
        let speaker = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);

        assert_eq!(speaker_quadratic(&listener, &speaker), 0.0);
    }

    #[test]
    fn test_quadratic_muted_speaker_is_zero_at_point_blank() {
        let speaker = participant(at(0.0, 0.0, 0.0), Mode::Mute, true);
        let listener = participant(at(0.1, 0.0, 0.0), Mode::Talk, false);

        assert_eq!(speaker_quadratic(&listener, &speaker), 0.0);
    }

    #[test]
    fn test_quadratic_zero_at_and_beyond_range_boundary() {
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);

        let at_boundary = participant(at(25.0, 0.0, 0.0), Mode::Talk, true);
        assert_eq!(speaker_quadratic(&listener, &at_boundary), 0.0);

        let beyond = participant(at(30.0, 0.0, 0.0), Mode::Talk, true);
        assert_eq!(speaker_quadratic(&listener, &beyond), 0.0);
    }

    #[test]
    fn test_quadratic_full_volume_at_zero_distance() {
        let speaker = participant(at(5.0, 5.0, 5.0), Mode::Shout, true);
        let listener = participant(at(5.0, 5.0, 5.0), Mode::Whisper, false);

        let v = speaker_quadratic(&listener, &speaker);
        assert!((v - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quadratic_monotonically_non_increasing_in_distance() {
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);
        let mut prev = f64::INFINITY;

        for step in 0..70 {
            let d = f64::from(step);
            let speaker = participant(at(d, 0.0, 0.0), Mode::Shout, true);
            let v = speaker_quadratic(&listener, &speaker);
            assert!(v <= prev, "volume increased at distance {d}");
            assert!((0.0..=1.0).contains(&v));
            prev = v;
        }
    }

    #[test]
    fn test_quadratic_missing_position_either_side_is_zero() {
        let placed = participant(at(0.0, 0.0, 0.0), Mode::Talk, true);
        let unplaced = participant(None, Mode::Talk, true);

        assert_eq!(speaker_quadratic(&placed, &unplaced), 0.0);
        assert_eq!(speaker_quadratic(&unplaced, &placed), 0.0);
    }

    #[test]
    fn test_quadratic_speaker_mode_sets_range_not_listener() {
        // Whispering speaker at 15 studs is out of range even for a shouting
        // listener; the speaker controls their own loudness.
        let speaker = participant(at(15.0, 0.0, 0.0), Mode::Whisper, true);
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Shout, false);

        assert_eq!(speaker_quadratic(&listener, &speaker), 0.0);
    }

    #[test]
    fn test_quadratic_unknown_mode_uses_default_range() {
        let speaker = participant(at(10.0, 0.0, 0.0), Mode::Unknown, true);
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);

        // Default range 25 → same curve as Talk.
        let v = speaker_quadratic(&listener, &speaker);
        assert!((v - 0.36).abs() < 1e-12);
    }

    #[test]
    fn test_linear_midpoint_is_half() {
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);
        let speaker = participant(at(12.5, 0.0, 0.0), Mode::Whisper, false);

        let v = listener_linear(&listener, &speaker);
        assert!((v - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_linear_uses_listener_mode_and_ignores_speaking() {
        // Whispering listener: range 10, so a speaker at 12 studs is silent
        // even though the speaker is shouting.
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Whisper, false);
        let speaker = participant(at(12.0, 0.0, 0.0), Mode::Shout, false);

        assert_eq!(listener_linear(&listener, &speaker), 0.0);

        // And a silent speaker in range is still audible under this policy.
        let near = participant(at(5.0, 0.0, 0.0), Mode::Talk, false);
        assert!(listener_linear(&listener, &near) > 0.0);
    }

    #[test]
    fn test_policy_dispatch() {
        let listener = participant(at(0.0, 0.0, 0.0), Mode::Talk, false);
        let speaker = participant(at(10.0, 0.0, 0.0), Mode::Talk, false);

        // Not speaking: gated under the canonical policy, audible under legacy.
        assert_eq!(volume(AttenuationPolicy::SpeakerQuadratic, &listener, &speaker), 0.0);
        assert!(volume(AttenuationPolicy::ListenerLinear, &listener, &speaker) > 0.0);
    }

    #[test]
    fn test_volumes_for_unknown_listener_is_empty() {
        let mut participants = HashMap::new();
        participants.insert(
            "1".to_string(),
            participant(at(0.0, 0.0, 0.0), Mode::Talk, true),
        );

        let volumes = volumes_for(AttenuationPolicy::SpeakerQuadratic, "999", &participants);
        assert!(volumes.is_empty());
    }

    #[test]
    fn test_volumes_for_positionless_listener_is_empty() {
        let mut participants = HashMap::new();
        participants.insert("1".to_string(), participant(None, Mode::Talk, true));
        participants.insert(
            "2".to_string(),
            participant(at(0.0, 0.0, 0.0), Mode::Talk, true),
        );

        let volumes = volumes_for(AttenuationPolicy::SpeakerQuadratic, "1", &participants);
        assert!(volumes.is_empty());
    }

    #[test]
    fn test_volumes_for_excludes_self() {
        let mut participants = HashMap::new();
        participants.insert(
            "1".to_string(),
            participant(at(0.0, 0.0, 0.0), Mode::Talk, true),
        );
        participants.insert(
            "2".to_string(),
            participant(at(10.0, 0.0, 0.0), Mode::Talk, true),
        );

        let volumes = volumes_for(AttenuationPolicy::SpeakerQuadratic, "1", &participants);
        assert!(!volumes.contains_key("1"));
        assert!((volumes.get("2").unwrap() - 0.36).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_covers_union_of_known_ids() {
        let mut participants = HashMap::new();
        participants.insert(
            "1".to_string(),
            participant(at(0.0, 0.0, 0.0), Mode::Talk, true),
        );
        // Speaking-only participant with no position yet.
        participants.insert("2".to_string(), participant(None, Mode::Unknown, true));

        let snapshot = build_state_snapshot(AttenuationPolicy::SpeakerQuadratic, &participants);
        assert_eq!(snapshot.players.len(), 2);

        let two = snapshot.players.get("2").unwrap();
        assert!(two.speaking);
        assert!(two.position.is_none());
        // Position-less on both sides of the pair computes to zero.
        assert_eq!(*two.volumes.get("1").unwrap(), 0.0);
    }

    #[test]
    fn test_snapshot_is_listener_specific() {
        let mut participants = HashMap::new();
        participants.insert(
            "near".to_string(),
            participant(at(0.0, 0.0, 0.0), Mode::Talk, true),
        );
        participants.insert(
            "far".to_string(),
            participant(at(20.0, 0.0, 0.0), Mode::Whisper, true),
        );

        let snapshot = build_state_snapshot(AttenuationPolicy::SpeakerQuadratic, &participants);

        // near hears far at 20 studs against far's Whisper range (10): zero.
        let near = snapshot.players.get("near").unwrap();
        assert_eq!(*near.volumes.get("far").unwrap(), 0.0);

        // far hears near at 20 studs against near's Talk range (25): audible.
        let far = snapshot.players.get("far").unwrap();
        assert!(*far.volumes.get("near").unwrap() > 0.0);
    }
}
