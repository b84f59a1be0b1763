use std::convert::Infallible;

use async_stream::stream;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{AnswerMatrix, ChatMessage, MovieRecommendation, Question, UserRatingMap};
use crate::services::{
    quiz::{QuizProgress, QuizSession},
    recommendations, viewing_tips,
};

use super::state::Session;
use super::AppState;

// Request/Response types

/// The question currently shown to the user
#[derive(Debug, Serialize)]
pub struct QuizView {
    pub index: usize,
    pub total: usize,
    pub is_last: bool,
    pub question: Question,
    pub selected: Vec<String>,
}

impl QuizView {
    fn new(quiz: &QuizSession, questions: &[Question]) -> AppResult<Self> {
        let question = questions
            .get(quiz.current_index())
            .cloned()
            .ok_or_else(|| AppError::Internal("Quiz index outside question bank".to_string()))?;

        Ok(Self {
            index: quiz.current_index(),
            total: quiz.question_count(),
            is_last: quiz.is_last_question(),
            question,
            selected: quiz.current_selections().iter().cloned().collect(),
        })
    }
}

/// Outcome of a quiz navigation request
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuizStepResponse {
    InProgress { quiz: QuizView },
    Completed { answers: AnswerMatrix },
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub quiz: QuizView,
}

#[derive(Debug, Deserialize)]
pub struct ToggleSelectionRequest {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswersRequest {
    pub answers: Vec<Vec<String>>,
}

/// A recommendation together with the user's rating for it
#[derive(Debug, Serialize)]
pub struct RatedRecommendation {
    #[serde(flatten)]
    pub movie: MovieRecommendation,
    pub rating: u8,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<RatedRecommendation>,
}

impl RecommendationsResponse {
    fn new(movies: &[MovieRecommendation], ratings: &UserRatingMap) -> Self {
        Self {
            recommendations: movies
                .iter()
                .map(|movie| RatedRecommendation {
                    rating: ratings.rating_for(&movie.title),
                    movie: movie.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RateMovieRequest {
    pub title: String,
    pub rating: u8,
}

#[derive(Debug, Deserialize)]
pub struct ViewingTipsQuery {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ViewingTipsResponse {
    pub title: String,
    pub tips: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// The question bank, in quiz order
pub async fn get_questions(State(state): State<AppState>) -> Json<Vec<Question>> {
    Json(state.questions.as_ref().clone())
}

/// Starts a new quiz session
pub async fn create_session(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<(StatusCode, Json<CreateSessionResponse>)> {
    let session_id = state.create_session().await?;
    let quiz = state
        .with_session(session_id, |session| {
            QuizView::new(&session.quiz, &state.questions)
        })
        .await?;

    tracing::info!(request_id = %request_id, session_id = %session_id, "Quiz started");
    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id, quiz })))
}

/// Ends a session and discards its state
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.remove_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The current question and its in-progress selections
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<QuizView>> {
    let view = state
        .with_session(session_id, |session| {
            QuizView::new(&session.quiz, &state.questions)
        })
        .await?;
    Ok(Json(view))
}

/// Selects or deselects one answer of the current question
pub async fn toggle_selection(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ToggleSelectionRequest>,
) -> AppResult<Json<QuizView>> {
    let view = state
        .with_session(session_id, |session| {
            let offered = state
                .questions
                .get(session.quiz.current_index())
                .is_some_and(|q| q.offers(&request.value));
            if !offered {
                return Err(AppError::InvalidInput(format!(
                    "'{}' is not an answer to the current question",
                    request.value
                )));
            }

            session.quiz.toggle_selection(&request.value);
            QuizView::new(&session.quiz, &state.questions)
        })
        .await?;
    Ok(Json(view))
}

async fn navigate(
    state: &AppState,
    session_id: Uuid,
    step: fn(&mut QuizSession) -> QuizProgress,
) -> AppResult<Json<QuizStepResponse>> {
    let response = state
        .with_session(session_id, |session| match step(&mut session.quiz) {
            QuizProgress::AtQuestion(_) => Ok(QuizStepResponse::InProgress {
                quiz: QuizView::new(&session.quiz, &state.questions)?,
            }),
            QuizProgress::Completed(answers) => {
                tracing::info!(
                    session_id = %session_id,
                    answered = answers.flattened().len(),
                    "Quiz completed"
                );
                session.answers = Some(answers.clone());
                Ok(QuizStepResponse::Completed { answers })
            }
        })
        .await?;
    Ok(Json(response))
}

/// Saves the current selections and moves to the next question (or finishes)
pub async fn next_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<QuizStepResponse>> {
    navigate(&state, session_id, QuizSession::go_next).await
}

/// Saves the current selections and moves back one question
pub async fn previous_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<QuizStepResponse>> {
    navigate(&state, session_id, QuizSession::go_back).await
}

/// Clears the current question and moves on (or finishes)
pub async fn skip_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<QuizStepResponse>> {
    navigate(&state, session_id, QuizSession::skip).await
}

/// Starts the quiz over; ratings are kept
pub async fn restart_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<QuizView>> {
    let view = state
        .with_session(session_id, |session| {
            session.restart_quiz();
            QuizView::new(&session.quiz, &state.questions)
        })
        .await?;
    Ok(Json(view))
}

/// Asks the model for recommendations matching the completed quiz
pub async fn create_session_recommendations(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<RecommendationsResponse>> {
    let answers = state
        .with_session(session_id, |session| {
            session.answers.clone().ok_or_else(|| {
                AppError::InvalidInput("The quiz has not been completed yet".to_string())
            })
        })
        .await?;

    tracing::info!(
        request_id = %request_id,
        session_id = %session_id,
        "Processing recommendation request"
    );

    let movies = recommendations::get_recommendations(state.model.as_ref(), &answers).await?;

    let response = state
        .with_session(session_id, |session: &mut Session| {
            session.recommendations = movies;
            Ok(RecommendationsResponse::new(
                &session.recommendations,
                &session.ratings,
            ))
        })
        .await?;

    Ok(Json(response))
}

/// The latest recommendations for a session, with ratings
pub async fn get_session_recommendations(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<RecommendationsResponse>> {
    let response = state
        .with_session(session_id, |session| {
            Ok(RecommendationsResponse::new(
                &session.recommendations,
                &session.ratings,
            ))
        })
        .await?;
    Ok(Json(response))
}

/// Recommendations for answers collected by the caller
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<AnswersRequest>,
) -> AppResult<Json<Vec<MovieRecommendation>>> {
    let answers = AnswerMatrix::from_entries(request.answers, state.question_count())?;

    tracing::info!(request_id = %request_id, "Processing stateless recommendation request");

    let movies = recommendations::get_recommendations(state.model.as_ref(), &answers).await?;
    Ok(Json(movies))
}

/// All ratings the user has given in this session
pub async fn get_ratings(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<UserRatingMap>> {
    let ratings = state
        .with_session(session_id, |session| Ok(session.ratings.clone()))
        .await?;
    Ok(Json(ratings))
}

/// Rates a movie
pub async fn rate_movie(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RateMovieRequest>,
) -> AppResult<Json<UserRatingMap>> {
    let ratings = state
        .with_session(session_id, |session| {
            session.ratings.rate(&request.title, request.rating)?;
            Ok(session.ratings.clone())
        })
        .await?;
    Ok(Json(ratings))
}

/// Spoiler-free viewing tips for a movie, generated once per title
pub async fn get_viewing_tips(
    State(state): State<AppState>,
    Query(query): Query<ViewingTipsQuery>,
) -> AppResult<Json<ViewingTipsResponse>> {
    let title = query.title.trim().to_string();

    if let Some(tips) = state.viewing_tips.read().await.get(&title).cloned() {
        tracing::debug!(title = %title, "Viewing tips served from cache");
        return Ok(Json(ViewingTipsResponse { title, tips }));
    }

    let tips = viewing_tips::get_viewing_tips(state.model.as_ref(), &title).await?;
    state
        .viewing_tips
        .write()
        .await
        .insert(title.clone(), tips.clone());

    Ok(Json(ViewingTipsResponse { title, tips }))
}

/// The chat history as the user sees it
pub async fn get_chat(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ChatHistoryResponse>> {
    let chat = state.chat_for(session_id).await?;
    let chat = chat
        .try_lock()
        .map_err(|_| AppError::Conflict("A reply is being generated".to_string()))?;

    Ok(Json(ChatHistoryResponse {
        messages: chat.history().to_vec(),
    }))
}

fn chat_event(kind: &'static str, payload: serde_json::Value) -> Result<Event, Infallible> {
    let event = Event::default()
        .event(kind)
        .json_data(payload)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode chat event");
            Event::default().event("error").data("event encoding failed")
        });
    Ok(event)
}

fn chat_error_event(error: &AppError) -> Result<Event, Infallible> {
    chat_event(
        "error",
        json!({ "error": error.to_string(), "kind": error.kind() }),
    )
}

/// Sends a chat message and streams the reply as server-sent events
///
/// Emits a `fragment` event per received piece of text, then `done` with
/// the full reply, or `error` if the reply failed. The chat stays locked
/// until the stream ends, so replies within a session never overlap.
pub async fn send_chat_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChatMessageRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let chat = state.chat_for(session_id).await?;
    let mut chat = chat
        .try_lock_owned()
        .map_err(|_| AppError::Conflict("A reply is already being generated".to_string()))?;

    // Holding the lock means no stream is running; a pending reply was cut off.
    if chat.is_replying() {
        tracing::warn!(session_id = %session_id, "Closing interrupted chat reply");
        chat.fail_reply();
    }

    let chat_request = chat.begin_reply(&request.message)?;
    let mut fragments = match state.model.generate_stream(chat_request).await {
        Ok(fragments) => fragments,
        Err(e) => {
            chat.fail_reply();
            return Err(e);
        }
    };

    let events = stream! {
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => {
                    if let Err(e) = chat.apply_fragment(&fragment) {
                        yield chat_error_event(&e);
                        return;
                    }
                    yield chat_event("fragment", json!({ "text": fragment }));
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Chat stream failed");
                    chat.fail_reply();
                    yield chat_error_event(&e);
                    return;
                }
            }
        }

        match chat.finish_reply() {
            Ok(text) => yield chat_event("done", json!({ "text": text })),
            Err(e) => yield chat_error_event(&e),
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
