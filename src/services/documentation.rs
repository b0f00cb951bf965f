use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobby::get_lobby,
        crate::routes::lobby::get_leaderboard,
        crate::routes::lobby::get_session,
        crate::routes::questions::list_rounds,
        crate::routes::questions::get_question_at,
        crate::routes::questions::count_questions,
        crate::routes::questions::get_question,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::lobby::LobbySnapshot,
            crate::dto::lobby::LeaderboardEntry,
            crate::dto::lobby::PublicQuestion,
            crate::dto::lobby::RoundSummary,
            crate::dto::lobby::SessionView,
            crate::dto::ws::ClientMessage,
            crate::dao::models::GameState,
            crate::dao::models::LobbyStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobby", description = "Lobby state, leaderboards, and archived sessions"),
        (name = "questions", description = "Round and question catalogue"),
        (name = "websocket", description = "Real-time lobby channel"),
    )
)]
pub struct ApiDoc;
