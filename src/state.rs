// Facade playback state tracking

use parking_lot::RwLock;
use std::sync::Arc;

/// Facade-visible playback state.
///
/// Prepared is only ever entered through the engine's prepared event; the
/// facade does not guess at it. Released is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No source set yet
    Idle,
    /// A data source has been handed to the engine
    SourceSet,
    /// prepare() issued, waiting for the prepared event
    Preparing,
    /// The engine signaled readiness
    Prepared,
    Playing,
    Paused,
    /// Playback ran to the end
    Completed,
    /// Torn down; no further transition is possible
    Released,
}

/// Thread-safe state cell shared between the facade and the delivery worker.
#[derive(Clone)]
pub struct PlayerStateCell {
    state: Arc<RwLock<PlayerState>>,
}

impl PlayerStateCell {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PlayerState::Idle)),
        }
    }

    pub fn get(&self) -> PlayerState {
        *self.state.read()
    }

    /// Moves to `next`. Released is sticky: once set, later writes are
    /// dropped so a late event cannot resurrect a torn-down facade's state.
    pub fn set(&self, next: PlayerState) {
        let mut state = self.state.write();
        if *state == PlayerState::Released {
            return;
        }
        *state = next;
        log::debug!("player state -> {:?}", next);
    }

    /// Moves to `to` only when the current state is `from`. Used for the
    /// event-driven Preparing -> Prepared edge, which must not clobber a
    /// state the caller has already advanced past.
    pub fn set_if(&self, from: PlayerState, to: PlayerState) -> bool {
        let mut state = self.state.write();
        if *state != from {
            return false;
        }
        *state = to;
        log::debug!("player state -> {:?}", to);
        true
    }

    /// Like [`set_if`](Self::set_if) but accepts any of several source
    /// states.
    pub fn set_any(&self, from: &[PlayerState], to: PlayerState) -> bool {
        let mut state = self.state.write();
        if !from.contains(&*state) {
            return false;
        }
        *state = to;
        log::debug!("player state -> {:?}", to);
        true
    }
}

impl Default for PlayerStateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_is_terminal() {
        let cell = PlayerStateCell::new();
        cell.set(PlayerState::Playing);
        cell.set(PlayerState::Released);
        cell.set(PlayerState::Prepared);
        assert_eq!(cell.get(), PlayerState::Released);
    }

    #[test]
    fn test_set_if_requires_matching_state() {
        let cell = PlayerStateCell::new();
        cell.set(PlayerState::Preparing);
        assert!(cell.set_if(PlayerState::Preparing, PlayerState::Prepared));
        assert!(!cell.set_if(PlayerState::Preparing, PlayerState::Prepared));
        assert_eq!(cell.get(), PlayerState::Prepared);
    }

    #[test]
    fn test_set_any_requires_listed_state() {
        let cell = PlayerStateCell::new();
        assert!(!cell.set_any(
            &[PlayerState::Prepared, PlayerState::Paused],
            PlayerState::Playing
        ));
        assert_eq!(cell.get(), PlayerState::Idle);

        cell.set(PlayerState::Paused);
        assert!(cell.set_any(
            &[PlayerState::Prepared, PlayerState::Paused],
            PlayerState::Playing
        ));
        assert_eq!(cell.get(), PlayerState::Playing);
    }
}
