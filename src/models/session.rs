use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Language, ReservationSlots, RestaurantContext};

/// Messages kept in the window sent to the completion service.
pub const MAX_CONTEXT_MESSAGES: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Collecting,
    Finalizing,
    Closed,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Collecting => "collecting",
            DialogueState::Finalizing => "finalizing",
            DialogueState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: String,
    pub caller: Option<String>,
    pub language: Language,
    /// Every utterance of the caller, never truncated.
    pub utterance_history: Vec<String>,
    /// Sliding window of the dialogue sent to the completion service.
    pub messages: Vec<ConversationMessage>,
    pub reservation: ReservationSlots,
    pub restaurant: RestaurantContext,
    pub state: DialogueState,
    pub last_activity: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl CallSession {
    pub fn new(
        call_id: &str,
        caller: Option<String>,
        language: Language,
        restaurant: RestaurantContext,
        now: NaiveDateTime,
        ttl: Duration,
    ) -> Self {
        Self {
            call_id: call_id.to_string(),
            caller,
            language,
            utterance_history: Vec::new(),
            messages: Vec::new(),
            reservation: ReservationSlots::default(),
            restaurant,
            state: DialogueState::Collecting,
            last_activity: now,
            expires_at: now + ttl,
        }
    }

    pub fn record_utterance(&mut self, text: &str) {
        self.utterance_history.push(text.to_string());
        self.push_message("user", text);
    }

    pub fn push_message(&mut self, role: &str, content: &str) {
        self.messages.push(ConversationMessage {
            role: role.to_string(),
            content: content.to_string(),
        });
        if self.messages.len() > MAX_CONTEXT_MESSAGES {
            let excess = self.messages.len() - MAX_CONTEXT_MESSAGES;
            self.messages.drain(..excess);
        }
    }

    pub fn touch(&mut self, now: NaiveDateTime, ttl: Duration) {
        self.last_activity = now;
        self.expires_at = now + ttl;
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at <= now
    }
}
