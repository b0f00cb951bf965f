//! End-to-end lifecycle tests driving the orchestrator over the in-memory
//! store: question flow, scoring, round resume, archiving, and reconnects.

use std::{sync::Arc, time::Duration};

use trivia_back::{
    config::AppConfig,
    dao::{
        lobby_store::memory::MemoryLobbyStore,
        models::{
            GameState, LobbyStatus, QuestionEntity, QuestionSnapshotEntity, RoundEntity,
            now_millis,
        },
    },
    dto::ws::{
        ChangeRoundRequest, JoinRequest, JoinRole, StartCountdownRequest, StartQuestionRequest,
        SubmitAnswerRequest,
    },
    error::ServiceError,
    services::orchestrator,
    services::rounds,
    services::scoring,
    state::{AppState, SharedState},
};

fn round(id: &str, order: u32, total_questions: u32) -> RoundEntity {
    RoundEntity {
        id: id.into(),
        name: format!("Round {order}"),
        description: String::new(),
        order,
        is_active: false,
        total_questions,
    }
}

fn question(id: &str, round_id: &str, round_index: u32, correct: usize) -> QuestionEntity {
    QuestionEntity {
        id: id.into(),
        text: format!("Question {id}"),
        choices: vec!["Paris".into(), "Berlin".into(), "Madrid".into()],
        correct_index: Some(correct),
        correct_answers: None,
        time_limit: 30,
        points: 100,
        is_active: true,
        round_id: round_id.into(),
        round_index,
    }
}

fn join(lobby_id: &str, user_id: &str, role: JoinRole) -> JoinRequest {
    JoinRequest {
        lobby_id: lobby_id.into(),
        user_id: user_id.into(),
        name: user_id.to_uppercase(),
        email: None,
        role,
    }
}

async fn setup() -> (SharedState, MemoryLobbyStore) {
    let state = AppState::new(AppConfig::default());
    let store = MemoryLobbyStore::new();
    store.seed_round(round("r1", 1, 2));
    store.seed_round(round("r2", 2, 1));
    store.seed_question(question("q1", "r1", 1, 0));
    store.seed_question(question("q2", "r1", 2, 1));
    store.seed_question(question("q3", "r2", 1, 2));
    state.set_store(Arc::new(store.clone())).await;
    (state, store)
}

async fn fetch_lobby(store: &MemoryLobbyStore, id: &str) -> trivia_back::dao::models::LobbyEntity {
    use trivia_back::dao::lobby_store::LobbyStore;
    store.find_lobby(id.into()).await.unwrap().unwrap()
}

#[tokio::test]
async fn questions_resolve_by_one_based_position() {
    let (state, _store) = setup().await;

    let first = rounds::question_at(&state, "r1", 1).await.unwrap();
    assert_eq!(first.id, "q1");
    let second = rounds::question_at(&state, "r1", 2).await.unwrap();
    assert_eq!(second.id, "q2");

    // Repeated reads with no state change return the same question.
    let again = rounds::question_at(&state, "r1", 1).await.unwrap();
    assert_eq!(again.id, first.id);

    // Position 0 is a caller error, past-the-end is a lookup miss.
    let zero = rounds::question_at(&state, "r1", 0).await;
    assert!(matches!(zero, Err(ServiceError::InvalidInput(_))));
    let past = rounds::question_at(&state, "r1", 3).await;
    assert!(matches!(past, Err(ServiceError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn countdown_rejects_an_unrepresentable_question_index() {
    let (state, store) = setup().await;
    let session = state.session("main");
    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();

    let result = orchestrator::start_countdown(
        &state,
        StartCountdownRequest {
            lobby_id: "main".into(),
            countdown_seconds: Some(1),
            question_index: u32::MAX,
            round_id: Some("r1".into()),
        },
    )
    .await;
    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));

    let lobby = fetch_lobby(&store, "main").await;
    assert_ne!(lobby.status, LobbyStatus::Countdown);
}

#[tokio::test(start_paused = true)]
async fn question_flow_scores_and_tracks_progress() {
    let (state, store) = setup().await;
    let session = state.session("main");

    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();
    orchestrator::player_connect(&state, &session, "s1", &join("main", "ada", JoinRole::Player))
        .await
        .unwrap();
    orchestrator::player_connect(&state, &session, "s2", &join("main", "bob", JoinRole::Player))
        .await
        .unwrap();

    orchestrator::start_question(
        &state,
        StartQuestionRequest {
            lobby_id: "main".into(),
            question_index: 0,
            round_id: Some("r1".into()),
        },
    )
    .await
    .unwrap();

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.status, LobbyStatus::InProgress);
    assert_eq!(lobby.game_state, GameState::Question);
    let snapshot = lobby.current_question.as_ref().unwrap();
    assert_eq!(snapshot.question_id, "q1");
    assert_eq!(snapshot.correct_answer, "Paris");

    // Instant correct answer earns full base points.
    let outcome = scoring::submit_answer(
        &state,
        &session,
        "ada",
        SubmitAnswerRequest {
            question_id: "q1".into(),
            answer: "Paris".into(),
        },
    )
    .await
    .unwrap();
    assert!(outcome.ack.is_correct);
    assert_eq!(outcome.ack.points_earned, 100);

    // Duplicate submissions are rejected and do not double-score.
    let duplicate = scoring::submit_answer(
        &state,
        &session,
        "ada",
        SubmitAnswerRequest {
            question_id: "q1".into(),
            answer: "Paris".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(ServiceError::InvalidState(_))));

    // Wrong answers are recorded without points.
    let wrong = scoring::submit_answer(
        &state,
        &session,
        "bob",
        SubmitAnswerRequest {
            question_id: "q1".into(),
            answer: "Berlin".into(),
        },
    )
    .await
    .unwrap();
    assert!(!wrong.ack.is_correct);
    assert_eq!(wrong.ack.points_earned, 0);

    orchestrator::end_question(&state, "main").await.unwrap();

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.game_state, GameState::Results);
    let progress = lobby.progress_for("r1").unwrap();
    assert_eq!(progress.next_question_index, 1);
    assert!(!progress.is_completed);
    assert_eq!(lobby.player("ada").unwrap().score, 100);
    assert_eq!(lobby.player("ada").unwrap().round_score("r1"), 100);
    assert_eq!(lobby.player("bob").unwrap().score, 0);
}

#[tokio::test(start_paused = true)]
async fn countdown_leads_into_the_question() {
    let (state, store) = setup().await;
    let session = state.session("main");
    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();

    orchestrator::start_countdown(
        &state,
        StartCountdownRequest {
            lobby_id: "main".into(),
            countdown_seconds: Some(2),
            question_index: 0,
            round_id: Some("r1".into()),
        },
    )
    .await
    .unwrap();

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.status, LobbyStatus::Countdown);
    assert_eq!(lobby.countdown, 2);

    // Let the countdown expire and the spawned question start settle.
    tokio::time::sleep(Duration::from_secs(3)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.status, LobbyStatus::InProgress);
    assert_eq!(lobby.game_state, GameState::Question);
    assert_eq!(lobby.current_question.unwrap().question_id, "q1");
}

#[tokio::test(start_paused = true)]
async fn starting_with_no_round_selected_uses_the_first_round() {
    let (state, store) = setup().await;
    let session = state.session("main");
    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();

    orchestrator::start_countdown(
        &state,
        StartCountdownRequest {
            lobby_id: "main".into(),
            countdown_seconds: Some(1),
            question_index: 0,
            round_id: None,
        },
    )
    .await
    .unwrap();

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.status, LobbyStatus::Countdown);
    assert_eq!(lobby.current_round, 0);
    assert_eq!(lobby.total_questions_in_round, 2);
}

#[tokio::test(start_paused = true)]
async fn deadline_closes_the_answer_window() {
    let (state, store) = setup().await;
    let session = state.session("main");
    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();
    orchestrator::player_connect(&state, &session, "s1", &join("main", "ada", JoinRole::Player))
        .await
        .unwrap();

    orchestrator::start_question(
        &state,
        StartQuestionRequest {
            lobby_id: "main".into(),
            question_index: 0,
            round_id: Some("r1".into()),
        },
    )
    .await
    .unwrap();

    // Ride past the 30 second limit; the server ends the question itself.
    tokio::time::sleep(Duration::from_secs(31)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.game_state, GameState::Results);

    let late = scoring::submit_answer(
        &state,
        &session,
        "ada",
        SubmitAnswerRequest {
            question_id: "q1".into(),
            answer: "Paris".into(),
        },
    )
    .await;
    assert!(matches!(late, Err(ServiceError::InvalidState(_))));
}

#[tokio::test(start_paused = true)]
async fn completed_rounds_cannot_be_replayed() {
    let (state, store) = setup().await;
    let session = state.session("main");
    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();

    // Play both questions of round 1 to completion.
    for index in 0..2 {
        orchestrator::start_question(
            &state,
            StartQuestionRequest {
                lobby_id: "main".into(),
                question_index: index,
                round_id: Some("r1".into()),
            },
        )
        .await
        .unwrap();
        orchestrator::end_question(&state, "main").await.unwrap();
    }

    let lobby = fetch_lobby(&store, "main").await;
    let progress = lobby.progress_for("r1").unwrap();
    assert_eq!(progress.next_question_index, 2);
    assert!(progress.is_completed);

    // Move on to round 2.
    orchestrator::change_round(
        &state,
        ChangeRoundRequest {
            lobby_id: "main".into(),
            round_id: "r2".into(),
            round_index: 1,
            round_name: "Round 2".into(),
        },
    )
    .await
    .unwrap();

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.current_round, 1);
    assert_eq!(lobby.current_question_index, 0);

    // Switching back into the finished round is rejected and the current
    // round's bookkeeping is untouched.
    let rejected = orchestrator::change_round(
        &state,
        ChangeRoundRequest {
            lobby_id: "main".into(),
            round_id: "r1".into(),
            round_index: 0,
            round_name: "Round 1".into(),
        },
    )
    .await;
    assert!(matches!(rejected, Err(ServiceError::InvalidState(_))));

    // Starting a question addressed at the finished round fails the same way.
    let rejected = orchestrator::start_question(
        &state,
        StartQuestionRequest {
            lobby_id: "main".into(),
            question_index: 0,
            round_id: Some("r1".into()),
        },
    )
    .await;
    assert!(matches!(rejected, Err(ServiceError::InvalidState(_))));

    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.current_round, 1);
    assert_eq!(lobby.current_question_index, 0);
    assert!(lobby.progress_for("r1").unwrap().is_completed);
}

#[tokio::test(start_paused = true)]
async fn end_game_archives_then_resets() {
    let (state, store) = setup().await;
    let session = state.session("main");
    orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();
    orchestrator::player_connect(&state, &session, "s1", &join("main", "ada", JoinRole::Player))
        .await
        .unwrap();

    orchestrator::start_question(
        &state,
        StartQuestionRequest {
            lobby_id: "main".into(),
            question_index: 0,
            round_id: Some("r1".into()),
        },
    )
    .await
    .unwrap();
    scoring::submit_answer(
        &state,
        &session,
        "ada",
        SubmitAnswerRequest {
            question_id: "q1".into(),
            answer: "Paris".into(),
        },
    )
    .await
    .unwrap();
    orchestrator::end_question(&state, "main").await.unwrap();

    orchestrator::end_game(&state, "main").await.unwrap();

    assert_eq!(store.session_count(), 1);
    let lobby = fetch_lobby(&store, "main").await;
    assert_eq!(lobby.status, LobbyStatus::Waiting);
    assert_eq!(lobby.game_state, GameState::Lobby);
    assert_eq!(lobby.current_round, -1);
    assert!(lobby.round_progress.is_empty());
    // Players are gone; the host identity stays with its binding cleared.
    assert!(lobby.players.is_empty());
    let host = lobby.host.as_ref().unwrap();
    assert_eq!(host.user_id, "host");
    assert!(host.socket_id.is_none());
    // The room was emptied along with the record.
    assert!(session.room.is_empty());
}

#[tokio::test]
async fn host_seat_is_exclusive() {
    let (state, _store) = setup().await;
    let session = state.session("main");

    orchestrator::host_connect(&state, &session, "h1", &join("main", "host", JoinRole::Host))
        .await
        .unwrap();
    let usurper =
        orchestrator::host_connect(&state, &session, "h2", &join("main", "other", JoinRole::Host))
            .await;
    assert!(matches!(usurper, Err(ServiceError::Unauthorized(_))));

    // The rightful host reconnecting is fine.
    let back =
        orchestrator::host_connect(&state, &session, "h3", &join("main", "host", JoinRole::Host))
            .await
            .unwrap();
    assert!(back.is_reconnect);
}

#[tokio::test(start_paused = true)]
async fn reconnecting_host_recovers_remaining_time() {
    let (state, store) = setup().await;
    use trivia_back::dao::lobby_store::LobbyStore;

    // A previous process left a live question behind 10 seconds ago.
    let mut lobby = trivia_back::dao::models::LobbyEntity::with_defaults("main".into(), 50);
    lobby.status = LobbyStatus::InProgress;
    lobby.game_state = GameState::Question;
    lobby.current_round = 0;
    lobby.total_questions_in_round = 2;
    lobby.start_time = Some(now_millis() - 10_000);
    lobby.current_question = Some(QuestionSnapshotEntity {
        question_id: "q1".into(),
        text: "Question q1".into(),
        choices: vec!["Paris".into(), "Berlin".into(), "Madrid".into()],
        correct_answer: "Paris".into(),
        time_limit: 30,
        points: 100,
        round_id: "r1".into(),
    });
    store.save_lobby(lobby).await.unwrap();

    let session = state.session("main");
    let joined =
        orchestrator::host_connect(&state, &session, "hs", &join("main", "host", JoinRole::Host))
            .await
            .unwrap();

    assert!(joined.game_in_progress);
    assert_eq!(joined.remaining_time, Some(20));
    // The deadline was re-armed from the durable record.
    assert!(state.timers().elapsed("main").is_some());
    // The host view carries the answer key for recovery.
    let snapshot = joined.lobby.current_question.unwrap();
    assert_eq!(snapshot.correct_answer.as_deref(), Some("Paris"));

    // A second reconnect measures against the re-armed deadline, not the
    // question's full limit.
    let again =
        orchestrator::host_connect(&state, &session, "hs2", &join("main", "host", JoinRole::Host))
            .await
            .unwrap();
    assert_eq!(again.remaining_time, Some(20));
}
