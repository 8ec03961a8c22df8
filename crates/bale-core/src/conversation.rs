//! Per-user conversation state for the phone/code verification flow.

use std::collections::HashMap;

use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationState {
    AwaitingPhone,
    AwaitingCode,
    Idle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSession {
    pub state: ConversationState,
    pub phone: Option<String>,
}

/// In-memory map of user sessions. Owned by the orchestrator; not shared.
///
/// A user without an entry is `Idle`.
#[derive(Debug, Default)]
pub struct ConversationStore {
    sessions: HashMap<UserId, UserSession>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserSession> {
        self.sessions.get(&user_id)
    }

    pub fn state(&self, user_id: UserId) -> ConversationState {
        self.sessions
            .get(&user_id)
            .map(|s| s.state)
            .unwrap_or(ConversationState::Idle)
    }

    /// Start (or restart) the flow: the next contact share is accepted.
    pub fn begin(&mut self, user_id: UserId) {
        self.sessions.insert(
            user_id,
            UserSession {
                state: ConversationState::AwaitingPhone,
                phone: None,
            },
        );
    }

    pub fn await_code(&mut self, user_id: UserId, phone: String) {
        self.sessions.insert(
            user_id,
            UserSession {
                state: ConversationState::AwaitingCode,
                phone: Some(phone),
            },
        );
    }

    /// Phone on record, only while a code is expected.
    pub fn pending_phone(&self, user_id: UserId) -> Option<&str> {
        let session = self.sessions.get(&user_id)?;
        if session.state != ConversationState::AwaitingCode {
            return None;
        }
        session.phone.as_deref().filter(|p| !p.is_empty())
    }

    pub fn remove(&mut self, user_id: UserId) -> Option<UserSession> {
        self.sessions.remove(&user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
