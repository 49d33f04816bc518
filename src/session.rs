//! Chat session state — an explicit reducer over a typed action set.
//!
//! DESIGN
//! ======
//! All session mutations flow through [`ChatSession::apply`], a single
//! transition table: optimistic user append, assistant reply, error
//! degradation, and new-chat reset. There are no ad hoc flags outside the
//! session struct.
//!
//! Overlapping sends are not serialized and carry no request-id
//! correlation: if a second message is sent before the first reply
//! resolves, both replies append in arrival order. Known gap, kept on
//! purpose to match the deployed client's behavior.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::payload::Message;

/// Fixed reply shown when the webhook call fails. Never varies, so support
/// staff can grep logs for the real cause.
pub const APOLOGY: &str =
    "Sorry, I ran into a problem reaching the support service. Please try again.";

// =============================================================================
// ACTIONS
// =============================================================================

/// Typed transitions for a chat session.
#[derive(Debug)]
pub enum ChatAction {
    /// User submitted a message; append it optimistically and start loading.
    SendMessage { content: String },
    /// Assistant reply arrived; append it and stop loading.
    ReceiveMessage { message: Box<Message> },
    /// The send failed; append one synthetic apology reply and stop loading.
    SetError { detail: String },
    /// Start a fresh conversation: clears messages and all derived state.
    StartNewChat,
}

// =============================================================================
// SOP ERROR STATE
// =============================================================================

/// Error surfaced to the UI when SOP creation fails, driving the manual
/// retry affordance.
#[derive(Debug, Clone, Serialize)]
pub struct SopErrorState {
    pub message: String,
    pub code: String,
    pub retryable: bool,
}

// =============================================================================
// SESSION
// =============================================================================

/// One chat session: an ordered, append-only message list plus the flags
/// the UI renders from.
#[derive(Debug)]
pub struct ChatSession {
    pub id: Uuid,
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub sop_error: Option<SopErrorState>,
    /// The last SOP draft that failed upstream, kept for explicit retry.
    pub pending_sop: Option<Value>,
}

impl ChatSession {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            messages: Vec::new(),
            is_loading: false,
            last_error: None,
            sop_error: None,
            pending_sop: None,
        }
    }

    /// Apply one action. Returns a clone of the message the action appended,
    /// if any (messages are immutable once in the list, so clones are safe
    /// to hand out).
    pub fn apply(&mut self, action: ChatAction) -> Option<Message> {
        match action {
            ChatAction::SendMessage { content } => {
                let message = Message::user(content);
                self.messages.push(message.clone());
                self.is_loading = true;
                self.last_error = None;
                Some(message)
            }
            ChatAction::ReceiveMessage { message } => {
                let message = *message;
                self.messages.push(message.clone());
                self.is_loading = false;
                Some(message)
            }
            ChatAction::SetError { detail } => {
                let message = Message::assistant(APOLOGY);
                self.messages.push(message.clone());
                self.is_loading = false;
                self.last_error = Some(detail);
                Some(message)
            }
            ChatAction::StartNewChat => {
                self.messages.clear();
                self.is_loading = false;
                self.last_error = None;
                self.sop_error = None;
                self.pending_sop = None;
                None
            }
        }
    }

    /// Conversation id of the most recent assistant reply, used to thread
    /// follow-up webhook calls.
    #[must_use]
    pub fn last_conversation_id(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find_map(|m| m.conversation_id.as_deref())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
