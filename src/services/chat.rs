use futures::StreamExt;

use crate::{
    error::{AppError, AppResult},
    models::{ChatMessage, ChatRole},
    services::{
        prompts::GURU_SYSTEM_INSTRUCTION,
        providers::{ChatRequest, LanguageModel},
    },
};

/// First message shown in every chat
pub const GURU_GREETING: &str = "Budimo realni, you've come to the right place. I'm Kazo, your personal movie guru. Ask me anything, I've probably seen it twice.";

/// Shown in place of a reply that failed
pub const REPLY_FAILED_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Concatenates streamed fragments in arrival order
#[derive(Debug, Clone, Default)]
pub struct ReplyBuffer {
    text: String,
}

impl ReplyBuffer {
    /// Appends a fragment and returns everything received so far
    pub fn push(&mut self, fragment: &str) -> &str {
        self.text.push_str(fragment);
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Conversation with the movie guru
///
/// `history` is what the user sees, greeting and error notices included.
/// `turns` is what the model sees: only completed user/model exchanges plus
/// the user message currently being answered.
#[derive(Debug, Clone)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    turns: Vec<ChatMessage>,
    pending: Option<ReplyBuffer>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            history: vec![ChatMessage::model(GURU_GREETING)],
            turns: Vec::new(),
            pending: None,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_replying(&self) -> bool {
        self.pending.is_some()
    }

    /// Records the user's message and an empty reply placeholder
    ///
    /// Returns the request to stream the reply for.
    pub fn begin_reply(&mut self, message: &str) -> AppResult<ChatRequest> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput(
                "Chat message cannot be empty".to_string(),
            ));
        }
        if self.is_replying() {
            return Err(AppError::Conflict(
                "A reply is already being generated".to_string(),
            ));
        }

        let user_message = ChatMessage::user(message);
        self.history.push(user_message.clone());
        self.turns.push(user_message);
        self.history.push(ChatMessage::model(""));
        self.pending = Some(ReplyBuffer::default());

        Ok(ChatRequest {
            system_instruction: Some(GURU_SYSTEM_INSTRUCTION.to_string()),
            messages: self.turns.clone(),
        })
    }

    /// Adds a fragment to the reply and swaps it in as the last history entry
    pub fn apply_fragment(&mut self, fragment: &str) -> AppResult<String> {
        let buffer = self
            .pending
            .as_mut()
            .ok_or_else(|| AppError::Internal("No reply in progress".to_string()))?;
        let text = buffer.push(fragment).to_string();
        self.replace_last_reply(text.clone());
        Ok(text)
    }

    /// Closes the reply; an empty reply counts as a failure
    pub fn finish_reply(&mut self) -> AppResult<String> {
        let buffer = self
            .pending
            .take()
            .ok_or_else(|| AppError::Internal("No reply in progress".to_string()))?;

        if buffer.is_empty() {
            self.pending = Some(buffer);
            self.fail_reply();
            return Err(AppError::ExternalApi(
                "Model finished without replying".to_string(),
            ));
        }

        let text = buffer.into_string();
        self.turns.push(ChatMessage::model(text.clone()));
        Ok(text)
    }

    /// Abandons the reply, leaving an error notice in the history
    ///
    /// Text already received stays visible; the notice fills an empty
    /// placeholder or is appended after partial text.
    pub fn fail_reply(&mut self) {
        if self.pending.take().is_none() {
            return;
        }

        // The model never answered this turn; drop it from its view.
        if matches!(self.turns.last(), Some(m) if m.role == ChatRole::User) {
            self.turns.pop();
        }

        let placeholder_empty = self
            .history
            .last()
            .is_some_and(|m| m.role == ChatRole::Model && m.text.is_empty());
        if placeholder_empty {
            self.replace_last_reply(REPLY_FAILED_MESSAGE.to_string());
        } else {
            self.history.push(ChatMessage::model(REPLY_FAILED_MESSAGE));
        }
    }

    /// Streams a full reply to `message`, updating the history as fragments arrive
    pub async fn send_message(
        &mut self,
        model: &dyn LanguageModel,
        message: &str,
    ) -> AppResult<String> {
        let request = self.begin_reply(message)?;

        let mut fragments = match model.generate_stream(request).await {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start chat reply");
                self.fail_reply();
                return Err(e);
            }
        };

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => {
                    self.apply_fragment(&fragment)?;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Chat reply stream failed");
                    self.fail_reply();
                    return Err(e);
                }
            }
        }

        self.finish_reply()
    }

    fn replace_last_reply(&mut self, text: String) {
        if let Some(last) = self.history.last_mut() {
            *last = ChatMessage {
                role: ChatRole::Model,
                text,
                sent_at: last.sent_at,
            };
        }
    }
}
