//! Last-known rotation timestamp of the rotation-tracked secret.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Monotonic record of the newest rotation the manager has observed.
///
/// The timestamp never moves backward: stale or skewed reads are ignored.
/// Alongside it sits the newest rotation a refresh has been attempted for,
/// applied or not, so a failing rotation is retried by the fallback timer
/// rather than on every drift poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RotationState {
    last_known_rotation: Option<DateTime<Utc>>,
    last_attempted_rotation: Option<DateTime<Utc>>,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_known_rotation(&self) -> Option<DateTime<Utc>> {
        self.last_known_rotation
    }

    /// Whether `observed` is strictly newer than the recorded rotation.
    ///
    /// With nothing recorded yet, any observed timestamp counts as newer.
    pub fn is_newer(&self, observed: DateTime<Utc>) -> bool {
        match self.last_known_rotation {
            Some(known) => observed > known,
            None => true,
        }
    }

    /// Record `observed` if it is strictly newer. Returns whether it moved.
    pub fn advance(&mut self, observed: DateTime<Utc>) -> bool {
        self.record_attempt(observed);
        if self.is_newer(observed) {
            self.last_known_rotation = Some(observed);
            true
        } else {
            false
        }
    }

    pub fn last_attempted_rotation(&self) -> Option<DateTime<Utc>> {
        self.last_attempted_rotation
    }

    /// Note that a refresh ran against `observed`, whatever its outcome.
    pub fn record_attempt(&mut self, observed: DateTime<Utc>) {
        match self.last_attempted_rotation {
            Some(attempted) if observed <= attempted => {}
            _ => self.last_attempted_rotation = Some(observed),
        }
    }

    /// Whether a refresh already ran for `observed` (or a later rotation).
    pub fn was_attempted(&self, observed: DateTime<Utc>) -> bool {
        self.last_attempted_rotation.is_some_and(|attempted| observed <= attempted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_observation_is_recorded() {
        let mut state = RotationState::new();
        let t = Utc::now();
        assert!(state.is_newer(t));
        assert!(state.advance(t));
        assert_eq!(state.last_known_rotation(), Some(t));
    }

    #[test]
    fn test_equal_timestamp_is_not_newer() {
        let t = Utc::now();
        let mut state = RotationState::new();
        state.advance(t);

        assert!(!state.is_newer(t));
        assert!(!state.advance(t));
    }

    #[test]
    fn test_never_moves_backward() {
        let t = Utc::now();
        let mut state = RotationState::new();
        state.advance(t);

        assert!(!state.advance(t - Duration::seconds(30)));
        assert_eq!(state.last_known_rotation(), Some(t));

        assert!(state.advance(t + Duration::seconds(1)));
        assert_eq!(state.last_known_rotation(), Some(t + Duration::seconds(1)));
    }

    #[test]
    fn test_attempt_does_not_advance_known_rotation() {
        let t = Utc::now();
        let mut state = RotationState::new();
        state.record_attempt(t);

        assert!(state.was_attempted(t));
        assert!(state.was_attempted(t - Duration::seconds(1)));
        assert!(!state.was_attempted(t + Duration::seconds(1)));
        assert!(state.is_newer(t));
        assert_eq!(state.last_known_rotation(), None);

        state.record_attempt(t - Duration::minutes(5));
        assert_eq!(state.last_attempted_rotation(), Some(t));

        state.advance(t);
        assert_eq!(state.last_known_rotation(), Some(t));
    }

    #[test]
    fn test_monotonic_over_arbitrary_sequence() {
        let base = Utc::now();
        let offsets = [5, -3, 0, 12, 7, 12, -40, 13, 1];
        let mut state = RotationState::new();
        let mut previous = None;

        for offset in offsets {
            state.advance(base + Duration::seconds(offset));
            let current = state.last_known_rotation();
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, Some(base + Duration::seconds(13)));
    }
}
