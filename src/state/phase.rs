use thiserror::Error;

use crate::dao::models::{GameState, LobbyStatus};

/// Combined coarse/fine state a lobby can be in at any time. The pair is
/// persisted on the lobby record; this module owns which transitions between
/// pairs are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyPhase {
    /// Coarse lifecycle status.
    pub status: LobbyStatus,
    /// Fine-grained presentation state.
    pub game_state: GameState,
}

impl LobbyPhase {
    /// Phase of a freshly created lobby.
    pub fn initial() -> Self {
        Self {
            status: LobbyStatus::Waiting,
            game_state: GameState::Lobby,
        }
    }

    /// Whether a question is currently live and answerable.
    pub fn question_live(&self) -> bool {
        self.status == LobbyStatus::InProgress && self.game_state == GameState::Question
    }
}

/// Host- or timer-driven events applied to the lobby phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Host begins the pre-question countdown.
    StartCountdown,
    /// Countdown reached zero or the host starts a question directly.
    StartQuestion,
    /// The deadline timer fired or the host ended the question early.
    EndQuestion,
    /// Host switches to a different round.
    ChangeRound,
    /// Host ends the game; the final leaderboard is archived.
    EndGame,
    /// Lobby returns to defaults after the game archive is written.
    Reset,
}

/// Error returned when an event cannot be applied to the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// The phase the lobby was in when the invalid event was received.
    pub from: LobbyPhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

/// Compute the phase that follows `event`, or reject it.
///
/// Host commands are deliberately permissive — a host may restart a countdown
/// or jump straight to a question from almost anywhere — while the two
/// correctness-critical gates stay strict: a question can only end while one
/// is live, and a completed game must be reset before anything else happens.
pub fn compute_transition(
    from: LobbyPhase,
    event: PhaseEvent,
) -> Result<LobbyPhase, InvalidTransition> {
    use GameState::*;
    use LobbyStatus::*;

    let next = match (from.status, from.game_state, event) {
        (Completed, _, PhaseEvent::Reset) => LobbyPhase {
            status: Waiting,
            game_state: Lobby,
        },
        (Completed, _, _) | (_, _, PhaseEvent::Reset) => {
            return Err(InvalidTransition { from, event });
        }
        (_, _, PhaseEvent::StartCountdown) => LobbyPhase {
            status: Countdown,
            game_state: Lobby,
        },
        (_, _, PhaseEvent::StartQuestion) => LobbyPhase {
            status: InProgress,
            game_state: Question,
        },
        (InProgress, Question, PhaseEvent::EndQuestion) => LobbyPhase {
            status: Waiting,
            game_state: Results,
        },
        (_, _, PhaseEvent::EndQuestion) => return Err(InvalidTransition { from, event }),
        (_, _, PhaseEvent::ChangeRound) => LobbyPhase {
            status: Waiting,
            game_state: Lobby,
        },
        (_, _, PhaseEvent::EndGame) => LobbyPhase {
            status: Completed,
            game_state: Lobby,
        },
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: LobbyPhase, event: PhaseEvent) -> LobbyPhase {
        compute_transition(phase, event).unwrap()
    }

    #[test]
    fn initial_phase_is_waiting_lobby() {
        let phase = LobbyPhase::initial();
        assert_eq!(phase.status, LobbyStatus::Waiting);
        assert_eq!(phase.game_state, GameState::Lobby);
        assert!(!phase.question_live());
    }

    #[test]
    fn full_happy_path_through_a_round() {
        let mut phase = LobbyPhase::initial();

        phase = apply(phase, PhaseEvent::StartCountdown);
        assert_eq!(phase.status, LobbyStatus::Countdown);

        phase = apply(phase, PhaseEvent::StartQuestion);
        assert!(phase.question_live());

        phase = apply(phase, PhaseEvent::EndQuestion);
        assert_eq!(phase.status, LobbyStatus::Waiting);
        assert_eq!(phase.game_state, GameState::Results);

        phase = apply(phase, PhaseEvent::StartCountdown);
        assert_eq!(phase.status, LobbyStatus::Countdown);

        phase = apply(phase, PhaseEvent::EndGame);
        assert_eq!(phase.status, LobbyStatus::Completed);

        phase = apply(phase, PhaseEvent::Reset);
        assert_eq!(phase, LobbyPhase::initial());
    }

    #[test]
    fn end_question_requires_a_live_question() {
        let err = compute_transition(LobbyPhase::initial(), PhaseEvent::EndQuestion).unwrap_err();
        assert_eq!(err.from, LobbyPhase::initial());
        assert_eq!(err.event, PhaseEvent::EndQuestion);

        let results = LobbyPhase {
            status: LobbyStatus::Waiting,
            game_state: GameState::Results,
        };
        assert!(compute_transition(results, PhaseEvent::EndQuestion).is_err());
    }

    #[test]
    fn host_can_skip_a_running_countdown() {
        let counting = apply(LobbyPhase::initial(), PhaseEvent::StartCountdown);
        let live = apply(counting, PhaseEvent::StartQuestion);
        assert!(live.question_live());

        // Restarting a countdown mid-countdown is also a host prerogative.
        let restarted = apply(counting, PhaseEvent::StartCountdown);
        assert_eq!(restarted.status, LobbyStatus::Countdown);
    }

    #[test]
    fn change_round_lands_back_in_the_lobby_screen() {
        let live = apply(LobbyPhase::initial(), PhaseEvent::StartQuestion);
        let switched = apply(live, PhaseEvent::ChangeRound);
        assert_eq!(switched.status, LobbyStatus::Waiting);
        assert_eq!(switched.game_state, GameState::Lobby);
    }

    #[test]
    fn completed_lobby_only_accepts_reset() {
        let completed = apply(LobbyPhase::initial(), PhaseEvent::EndGame);
        assert!(compute_transition(completed, PhaseEvent::StartCountdown).is_err());
        assert!(compute_transition(completed, PhaseEvent::StartQuestion).is_err());
        assert!(compute_transition(completed, PhaseEvent::Reset).is_ok());
    }
}
