use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    dao::models::QuestionEntity,
    dto::lobby::{PublicQuestion, RoundSummary},
    error::AppError,
    services::rounds,
    state::SharedState,
};

/// Optional round filter for the count endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CountQuery {
    /// Narrow the count to one round.
    #[serde(default)]
    pub round_id: Option<String>,
}

/// Count response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionCount {
    /// Number of active questions in scope.
    pub count: u64,
}

#[utoipa::path(
    get,
    path = "/rounds",
    tag = "questions",
    responses((status = 200, description = "All rounds in canonical order", body = [RoundSummary]))
)]
/// The round catalogue in play order.
pub async fn list_rounds(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    let rounds = rounds::rounds_ordered(&state).await?;
    Ok(Json(rounds.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/rounds/{id}/questions/{position}",
    tag = "questions",
    params(
        ("id" = String, Path, description = "Round identifier"),
        ("position" = u32, Path, description = "1-based position among the round's active questions"),
    ),
    responses(
        (status = 200, description = "Sanitized question", body = PublicQuestion),
        (status = 404, description = "Round or position not found"),
    )
)]
/// The question at a position within a round, answer key stripped.
pub async fn get_question_at(
    State(state): State<SharedState>,
    Path((id, position)): Path<(String, u32)>,
) -> Result<Json<PublicQuestion>, AppError> {
    let question = rounds::question_at(&state, &id, position).await?;
    Ok(Json((&question).into()))
}

#[utoipa::path(
    get,
    path = "/questions/count",
    tag = "questions",
    params(CountQuery),
    responses((status = 200, description = "Active question count", body = QuestionCount))
)]
/// Count active questions, optionally narrowed to one round.
pub async fn count_questions(
    State(state): State<SharedState>,
    Query(query): Query<CountQuery>,
) -> Result<Json<QuestionCount>, AppError> {
    let count = rounds::count_questions(&state, query.round_id.as_deref()).await?;
    Ok(Json(QuestionCount { count }))
}

#[utoipa::path(
    get,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = String, Path, description = "Question identifier")),
    responses(
        (status = 200, description = "Full question, answer key included", body = QuestionEntity),
        (status = 404, description = "Question not found"),
    )
)]
/// Full question record for host tooling; carries the answer key.
pub async fn get_question(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionEntity>, AppError> {
    let question = rounds::question_by_id(&state, &id).await?;
    Ok(Json(question))
}

/// Configure the round and question catalogue subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/rounds", get(list_rounds))
        .route("/rounds/{id}/questions/{position}", get(get_question_at))
        .route("/questions/count", get(count_questions))
        .route("/questions/{id}", get(get_question))
}
