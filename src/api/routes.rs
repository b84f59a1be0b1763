use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/questions", get(handlers::get_questions))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", delete(handlers::delete_session))
        // Quiz
        .route("/sessions/:id/quiz", get(handlers::get_quiz))
        .route("/sessions/:id/quiz/toggle", post(handlers::toggle_selection))
        .route("/sessions/:id/quiz/next", post(handlers::next_question))
        .route("/sessions/:id/quiz/back", post(handlers::previous_question))
        .route("/sessions/:id/quiz/skip", post(handlers::skip_question))
        .route("/sessions/:id/quiz/restart", post(handlers::restart_quiz))
        // Recommendations and ratings
        .route(
            "/sessions/:id/recommendations",
            get(handlers::get_session_recommendations)
                .post(handlers::create_session_recommendations),
        )
        .route(
            "/sessions/:id/ratings",
            get(handlers::get_ratings).put(handlers::rate_movie),
        )
        // Chat
        .route(
            "/sessions/:id/chat",
            get(handlers::get_chat).post(handlers::send_chat_message),
        )
        // Stateless
        .route("/recommendations", post(handlers::recommend))
        .route("/viewing-tips", get(handlers::get_viewing_tips))
}
