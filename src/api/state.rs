use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{AnswerMatrix, MovieRecommendation, Question, UserRatingMap};
use crate::services::{chat::ChatSession, providers::LanguageModel, quiz::QuizSession};

const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_VIEWING_TIPS_CAPACITY: usize = 256;

/// Everything one user accumulates while using the app
pub struct Session {
    pub quiz: QuizSession,
    /// Set once the quiz completes; cleared on restart
    pub answers: Option<AnswerMatrix>,
    pub recommendations: Vec<MovieRecommendation>,
    /// Kept across quiz restarts
    pub ratings: UserRatingMap,
    /// Locked for the whole duration of a streamed reply
    pub chat: Arc<Mutex<ChatSession>>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(question_count: usize) -> AppResult<Self> {
        Ok(Self {
            quiz: QuizSession::new(question_count)?,
            answers: None,
            recommendations: Vec::new(),
            ratings: UserRatingMap::new(),
            chat: Arc::new(Mutex::new(ChatSession::new())),
            last_active_at: Utc::now(),
        })
    }

    /// Starts the quiz over, dropping answers and recommendations
    pub fn restart_quiz(&mut self) {
        self.quiz.restart();
        self.answers = None;
        self.recommendations.clear();
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

/// Viewing tips keyed by title, evicting the oldest entry when full
#[derive(Debug)]
pub struct ViewingTipsCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ViewingTipsCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn get(&self, title: &str) -> Option<&String> {
        self.entries.get(title)
    }

    pub fn insert(&mut self, title: String, tips: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(title.clone(), tips).is_some() {
            return;
        }

        self.order.push_back(title);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(title = %oldest, "Viewing tips evicted");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn LanguageModel>,
    pub questions: Arc<Vec<Question>>,
    pub sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    pub viewing_tips: Arc<RwLock<ViewingTipsCache>>,
    session_ttl: chrono::Duration,
}

impl AppState {
    /// Creates the state around an explicitly constructed model client
    pub fn new(model: Arc<dyn LanguageModel>, questions: Vec<Question>) -> AppResult<Self> {
        if questions.is_empty() {
            return Err(AppError::InvalidInput(
                "Question bank must contain at least one question".to_string(),
            ));
        }

        Ok(Self {
            model,
            questions: Arc::new(questions),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            viewing_tips: Arc::new(RwLock::new(ViewingTipsCache::new(
                DEFAULT_VIEWING_TIPS_CAPACITY,
            ))),
            session_ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS as i64),
        })
    }

    /// Sets how long a session may sit idle before it is discarded
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self
    }

    /// Sets how many titles' viewing tips are kept
    pub fn with_viewing_tips_capacity(mut self, capacity: usize) -> Self {
        self.viewing_tips = Arc::new(RwLock::new(ViewingTipsCache::new(capacity)));
        self
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Creates a new session and returns its ID
    pub async fn create_session(&self) -> AppResult<Uuid> {
        let session = Session::new(self.question_count())?;
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, session);
        tracing::info!(session_id = %id, "Session created");
        Ok(id)
    }

    pub async fn remove_session(&self, id: Uuid) -> AppResult<()> {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(_) => {
                tracing::info!(session_id = %id, "Session removed");
                Ok(())
            }
            None => Err(session_not_found(id)),
        }
    }

    /// Drops sessions idle for at least the session TTL; returns how many
    pub async fn remove_expired_sessions(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_active_at < self.session_ttl);

        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, remaining = sessions.len(), "Expired sessions removed");
        }
        expired
    }

    /// Periodically removes expired sessions until the runtime shuts down
    pub fn spawn_session_reaper(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                state.remove_expired_sessions().await;
            }
        })
    }

    /// Runs `f` against a session under the write lock
    ///
    /// `f` must not await; model calls happen outside the lock.
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> AppResult<R>,
    ) -> AppResult<R> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
        session.touch();
        f(session)
    }

    /// Handle to a session's chat, usable after the sessions lock is released
    pub async fn chat_for(&self, id: Uuid) -> AppResult<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
        session.touch();
        Ok(session.chat.clone())
    }
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_questions;
    use crate::services::providers::MockLanguageModel;

    fn state() -> AppState {
        AppState::new(Arc::new(MockLanguageModel::new()), default_questions()).unwrap()
    }

    #[test]
    fn test_tips_cache_evicts_oldest_title() {
        let mut cache = ViewingTipsCache::new(2);
        cache.insert("Heat".to_string(), "a".to_string());
        cache.insert("Alien".to_string(), "b".to_string());
        cache.insert("Heat".to_string(), "c".to_string());
        cache.insert("Léon".to_string(), "d".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("Heat"), None);
        assert_eq!(cache.get("Alien").map(String::as_str), Some("b"));
        assert_eq!(cache.get("Léon").map(String::as_str), Some("d"));
    }

    #[test]
    fn test_zero_capacity_cache_stores_nothing() {
        let mut cache = ViewingTipsCache::new(0);
        cache.insert("Heat".to_string(), "a".to_string());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let state = state().with_session_ttl(Duration::ZERO);
        let id = state.create_session().await.unwrap();

        assert_eq!(state.remove_expired_sessions().await, 1);
        assert!(matches!(
            state.with_session(id, |_| Ok(())).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_active_sessions_survive_sweep() {
        let state = state();
        let id = state.create_session().await.unwrap();

        assert_eq!(state.remove_expired_sessions().await, 0);
        assert!(state.chat_for(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_restart_keeps_ratings() {
        let state = state();
        let id = state.create_session().await.unwrap();

        let ratings = state
            .with_session(id, |session| {
                session.ratings.rate("Heat", 4)?;
                session.restart_quiz();
                Ok(session.ratings.clone())
            })
            .await
            .unwrap();
        assert_eq!(ratings.rating_for("Heat"), 4);
    }
}
