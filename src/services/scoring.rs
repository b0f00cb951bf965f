//! Answer acceptance and time-decayed scoring.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    dto::{
        lobby::{AnswerAck, AnsweredCount, ScoreUpdated},
        ws::SubmitAnswerRequest,
    },
    error::ServiceError,
    services::{events, lobby_manager},
    state::{SharedState, lobby::LobbySession, phase::LobbyPhase},
};

/// Fraction of the base points a correct answer always earns, no matter how
/// late within the window it lands.
const MIN_SPEED_FRACTION: f64 = 0.1;

/// Points for a correct answer submitted `elapsed` seconds into a question
/// with the given limit and base points.
///
/// The speed factor is `1 - (t/L)^2`: an instant answer earns full points,
/// decay is gentle early and steep late, and a correct answer never earns
/// less than `floor(base * 0.1)`. Elapsed time is clamped into `[0, limit]`
/// first, and the payout truncates toward zero.
pub fn compute_points(base: u32, elapsed: f64, limit_secs: u64) -> u32 {
    let minimum = (f64::from(base) * MIN_SPEED_FRACTION).floor() as u32;
    if limit_secs == 0 {
        return minimum;
    }
    let t = elapsed.clamp(0.0, limit_secs as f64);
    let ratio = t / limit_secs as f64;
    let factor = 1.0 - ratio * ratio;
    let decayed = (f64::from(base) * factor).floor() as u32;
    decayed.max(minimum)
}

/// Result of an accepted answer submission.
pub struct SubmitOutcome {
    /// Private acknowledgement for the submitting connection.
    pub ack: AnswerAck,
}

/// Validate, score, and persist one player's answer to the live question.
///
/// Runs entirely under the session gate, so the read-modify-write over the
/// player list is serialized against every other operation on this lobby.
/// Rejections are ordered: phase first, then question identity, then the
/// duplicate check, then the deadline. A submission that fails any check
/// leaves the record untouched.
pub async fn submit_answer(
    state: &SharedState,
    session: &Arc<LobbySession>,
    user_id: &str,
    request: SubmitAnswerRequest,
) -> Result<SubmitOutcome, ServiceError> {
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, session).await?;

    let phase = LobbyPhase {
        status: lobby.status,
        game_state: lobby.game_state,
    };
    if !phase.question_live() {
        return Err(ServiceError::InvalidState(
            "no question is currently accepting answers".into(),
        ));
    }

    let snapshot = lobby.current_question.clone().ok_or_else(|| {
        ServiceError::InvalidState("lobby has no live question snapshot".into())
    })?;
    if snapshot.question_id != request.question_id {
        return Err(ServiceError::InvalidState(format!(
            "answer targets question `{}` but `{}` is live",
            request.question_id, snapshot.question_id
        )));
    }

    {
        let player = lobby.player(user_id).ok_or_else(|| {
            ServiceError::NotFound(format!("player `{user_id}` is not in this lobby"))
        })?;
        if player.has_answered_current_question {
            return Err(ServiceError::InvalidState(
                "answer already recorded for this question".into(),
            ));
        }
    }

    // The armed deadline is authoritative for elapsed time. No deadline
    // means the window has closed (or never opened in this process).
    let elapsed = state.timers().elapsed(&session.id).ok_or_else(|| {
        ServiceError::InvalidState("the answer window for this question has closed".into())
    })?;
    if elapsed > snapshot.time_limit as f64 {
        return Err(ServiceError::InvalidState(
            "the answer window for this question has closed".into(),
        ));
    }

    let is_correct = request.answer.trim() == snapshot.correct_answer;
    let points = if is_correct {
        compute_points(snapshot.points, elapsed, snapshot.time_limit)
    } else {
        0
    };

    let (score, round_score, name) = {
        let player = lobby
            .player_mut(user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("player `{user_id}` vanished")))?;
        player.has_answered_current_question = true;
        player.last_answer = Some(request.answer.clone());
        player.last_answer_correct = Some(is_correct);
        player.last_answer_time = Some(elapsed);
        if points > 0 {
            player.add_points(&snapshot.round_id, points);
        }
        (
            player.score,
            player.round_score(&snapshot.round_id),
            player.name.clone(),
        )
    };

    let answered = lobby
        .players
        .iter()
        .filter(|p| p.has_answered_current_question)
        .count() as u32;
    let total_players = lobby.players.len() as u32;

    lobby_manager::persist(state, session, lobby).await?;

    if is_correct {
        info!(
            lobby_id = %session.id,
            user_id,
            points,
            elapsed = format!("{elapsed:.2}"),
            "correct answer scored"
        );
    } else {
        debug!(lobby_id = %session.id, user_id, "incorrect answer recorded");
    }

    events::broadcast_score_updated(
        &session.room,
        &ScoreUpdated {
            user_id: user_id.to_owned(),
            name,
            score,
            round_score,
        },
    );
    events::broadcast_answered_count(
        &session.room,
        &AnsweredCount {
            answered,
            total_players,
        },
    );

    Ok(SubmitOutcome {
        ack: AnswerAck {
            success: true,
            is_correct,
            points_earned: points,
            time_taken: elapsed,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_answer_earns_full_points() {
        assert_eq!(compute_points(100, 0.0, 30), 100);
    }

    #[test]
    fn decay_is_quadratic_in_elapsed_time() {
        // Halfway through: 1 - 0.25 = 0.75.
        assert_eq!(compute_points(100, 15.0, 30), 75);
        // 90% through the payout truncates: floor(100 * (1 - 0.81)).
        assert_eq!(compute_points(100, 27.0, 30), 18);
        // Monotone non-increasing as time passes.
        assert!(compute_points(100, 10.0, 30) >= compute_points(100, 20.0, 30));
    }

    #[test]
    fn minimum_is_ten_percent_of_base() {
        // At the limit the raw factor is zero; the minimum applies.
        assert_eq!(compute_points(100, 30.0, 30), 10);
        assert_eq!(compute_points(250, 30.0, 30), 25);
        // The minimum truncates too: floor(55 * 0.1) = 5.
        assert_eq!(compute_points(55, 30.0, 30), 5);
        // Past-limit and negative inputs clamp into the window.
        assert_eq!(compute_points(100, 45.0, 30), 10);
        assert_eq!(compute_points(100, -2.0, 30), 100);
    }

    #[test]
    fn zero_limit_pays_the_floor() {
        assert_eq!(compute_points(100, 0.0, 0), 10);
    }
}
