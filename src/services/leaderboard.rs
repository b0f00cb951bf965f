//! Leaderboard ranking and per-question answer analytics.

use indexmap::IndexMap;

use crate::{
    dao::models::{LobbyEntity, PlayerEntity, SessionPlayerEntity},
    dto::lobby::{LeaderboardEntry, QuestionAnalytics},
};

/// Rank players by total score, best first. Ties share a rank and the next
/// distinct score skips past them (1, 2, 2, 4). Within a tie, earlier
/// joiners sort first so the display order is stable across refreshes.
///
/// When `round_id` is given, each entry is annotated with that round's
/// sub-score; the ranking itself stays on the total.
pub fn game_leaderboard(lobby: &LobbyEntity, round_id: Option<&str>) -> Vec<LeaderboardEntry> {
    ranked(&lobby.players, |p| p.score)
        .into_iter()
        .map(|(player, rank)| LeaderboardEntry {
            user_id: player.user_id.clone(),
            name: player.name.clone(),
            score: player.score,
            rank,
            round_score: round_id.map(|id| player.round_score(id)),
        })
        .collect()
}

/// Rank players by their sub-score within one round only.
pub fn round_leaderboard(lobby: &LobbyEntity, round_id: &str) -> Vec<LeaderboardEntry> {
    ranked(&lobby.players, |p| p.round_score(round_id))
        .into_iter()
        .map(|(player, rank)| LeaderboardEntry {
            user_id: player.user_id.clone(),
            name: player.name.clone(),
            score: player.round_score(round_id),
            rank,
            round_score: Some(player.round_score(round_id)),
        })
        .collect()
}

/// Final leaderboard in archival form.
pub fn session_players(lobby: &LobbyEntity) -> Vec<SessionPlayerEntity> {
    ranked(&lobby.players, |p| p.score)
        .into_iter()
        .map(|(player, rank)| SessionPlayerEntity {
            user_id: player.user_id.clone(),
            name: player.name.clone(),
            score: player.score,
            rank,
            round_scores: player.round_scores.clone(),
        })
        .collect()
}

/// Tally the live question's answers: how many players answered, and votes
/// per choice. Every defined choice appears in the tally even at zero, in
/// choice order, so clients can render bars without merging keys.
pub fn question_analytics(lobby: &LobbyEntity, choices: &[String]) -> QuestionAnalytics {
    let mut choice_tallies: IndexMap<String, u32> =
        choices.iter().map(|c| (c.clone(), 0)).collect();
    let mut answered_count = 0;

    for player in &lobby.players {
        if !player.has_answered_current_question {
            continue;
        }
        answered_count += 1;
        if let Some(answer) = &player.last_answer
            && let Some(tally) = choice_tallies.get_mut(answer.trim())
        {
            *tally += 1;
        }
    }

    QuestionAnalytics {
        answered_count,
        choice_tallies,
    }
}

/// Sort players by a score projection (descending, ties by join time) and
/// assign standard competition ranks.
fn ranked<'a, F>(players: &'a [PlayerEntity], score_of: F) -> Vec<(&'a PlayerEntity, u32)>
where
    F: Fn(&PlayerEntity) -> u32,
{
    let mut sorted: Vec<&PlayerEntity> = players.iter().collect();
    sorted.sort_by(|a, b| {
        score_of(b)
            .cmp(&score_of(a))
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });

    let mut out = Vec::with_capacity(sorted.len());
    let mut last_score = None;
    let mut last_rank = 0;
    for (position, player) in sorted.into_iter().enumerate() {
        let score = score_of(player);
        let rank = match last_score {
            Some(prev) if prev == score => last_rank,
            _ => position as u32 + 1,
        };
        last_score = Some(score);
        last_rank = rank;
        out.push((player, rank));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::LobbyEntity;

    fn player(user_id: &str, score: u32, joined_at: i64) -> PlayerEntity {
        let mut p = PlayerEntity::new(user_id.into(), user_id.to_uppercase(), None, "s".into());
        p.score = score;
        p.joined_at = joined_at;
        p
    }

    fn lobby_with(players: Vec<PlayerEntity>) -> LobbyEntity {
        let mut lobby = LobbyEntity::with_defaults("main".into(), 50);
        lobby.players = players;
        lobby
    }

    #[test]
    fn ties_share_a_rank_and_the_next_score_skips() {
        let lobby = lobby_with(vec![
            player("a", 50, 1),
            player("b", 80, 2),
            player("c", 80, 3),
            player("d", 20, 4),
        ]);

        let board = game_leaderboard(&lobby, None);
        let ranks: Vec<(&str, u32)> = board
            .iter()
            .map(|e| (e.user_id.as_str(), e.rank))
            .collect();
        assert_eq!(ranks, vec![("b", 1), ("c", 1), ("a", 3), ("d", 4)]);
    }

    #[test]
    fn round_annotation_does_not_change_the_ranking() {
        let mut first = player("a", 0, 1);
        first.add_points("round-a", 30);
        let mut second = player("b", 0, 2);
        second.add_points("round-b", 90);
        let lobby = lobby_with(vec![first, second]);

        let board = game_leaderboard(&lobby, Some("round-a"));
        assert_eq!(board[0].user_id, "b");
        assert_eq!(board[0].round_score, Some(0));
        assert_eq!(board[1].user_id, "a");
        assert_eq!(board[1].round_score, Some(30));
    }

    #[test]
    fn round_leaderboard_ranks_on_sub_scores_only() {
        let mut first = player("a", 500, 1);
        first.score = 500;
        first.add_points("round-b", 10);
        let mut second = player("b", 0, 2);
        second.add_points("round-b", 60);
        let lobby = lobby_with(vec![first, second]);

        let board = round_leaderboard(&lobby, "round-b");
        assert_eq!(board[0].user_id, "b");
        assert_eq!(board[0].score, 60);
        assert_eq!(board[0].rank, 1);
    }

    #[test]
    fn analytics_zero_fill_every_choice() {
        let choices = vec!["Red".to_string(), "Blue".to_string()];
        let mut answered = player("a", 0, 1);
        answered.has_answered_current_question = true;
        answered.last_answer = Some("Blue".into());
        let silent = player("b", 0, 2);
        let lobby = lobby_with(vec![answered, silent]);

        let analytics = question_analytics(&lobby, &choices);
        assert_eq!(analytics.answered_count, 1);
        assert_eq!(analytics.choice_tallies.get("Red"), Some(&0));
        assert_eq!(analytics.choice_tallies.get("Blue"), Some(&1));
        // Order follows the choice definition, not the vote order.
        let keys: Vec<&String> = analytics.choice_tallies.keys().collect();
        assert_eq!(keys, vec!["Red", "Blue"]);
    }
}
