use serde::{Deserialize, Serialize};

use crate::types::{AppError, ChatMessage, MessageRole, Result};

/// Key under which the session is kept in the per-browser session store.
pub const SESSION_KEY: &str = "memchat.session";

/// Per-session chat state.
///
/// History is append-only and never truncated. The only mutable entry is a
/// leading `system` message carrying the active persona's instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    user_id: Option<String>,
    persona: Option<String>,
    welcome_shown: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Connect as `name` (trimmed). Blank names are rejected.
    pub fn connect(&mut self, name: &str) -> Result<&str> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Name must not be empty".to_string()));
        }
        Ok(self.user_id.insert(name.to_string()).as_str())
    }

    /// Forget the user, the persona and the conversation.
    pub fn disconnect(&mut self) {
        *self = Self::default();
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn persona(&self) -> Option<&str> {
        self.persona.as_deref()
    }

    /// Instructions of the active persona, when the first entry is a system entry.
    pub fn persona_prompt(&self) -> Option<&str> {
        self.history
            .first()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
    }

    /// Switch to a persona. An existing leading system entry has its content
    /// replaced; otherwise one is inserted. Later turns are left as they are.
    pub fn set_persona(&mut self, key: &str, system_prompt: &str) {
        match self.history.first_mut() {
            Some(first) if first.role == MessageRole::System => {
                first.content = system_prompt.to_string();
            }
            _ => self.history.insert(0, ChatMessage::system(system_prompt)),
        }
        self.persona = Some(key.to_string());
    }

    /// Drop the persona entry and return to memory-augmented prompting.
    pub fn clear_persona(&mut self) {
        if self.persona_prompt().is_some() {
            self.history.remove(0);
        }
        self.persona = None;
    }

    /// Record a completed exchange.
    pub fn push_exchange(&mut self, user: &str, assistant: &str) {
        self.history.push(ChatMessage::user(user));
        self.history.push(ChatMessage::assistant(assistant));
    }

    pub fn welcome_shown(&self) -> bool {
        self.welcome_shown
    }

    /// Mark the welcome as shown; true only the first time.
    pub fn mark_welcome_shown(&mut self) -> bool {
        !std::mem::replace(&mut self.welcome_shown, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_trims_and_rejects_blank() {
        let mut session = ChatSession::new();
        assert_eq!(session.connect("  Soban ").unwrap(), "Soban");
        assert_eq!(session.user_id(), Some("Soban"));
        assert!(session.connect("   ").is_err());
        assert_eq!(session.user_id(), Some("Soban"));
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let mut session = ChatSession::new();
        session.connect("a").unwrap();
        session.set_persona("tutor", "You tutor.");
        session.push_exchange("hi", "hello");
        session.mark_welcome_shown();

        session.disconnect();
        assert_eq!(session, ChatSession::default());
    }

    #[test]
    fn test_persona_switch_replaces_first_entry_only() {
        let mut session = ChatSession::new();
        session.set_persona("chef", "You are a chef.");
        session.push_exchange("hi", "hello");
        let turns_before: Vec<_> = session.history()[1..].to_vec();

        session.set_persona("coach", "You are a coach.");

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history()[0].content, "You are a coach.");
        assert_eq!(session.history()[1..], turns_before[..]);
        assert_eq!(session.persona(), Some("coach"));
    }

    #[test]
    fn test_persona_inserted_before_existing_turns() {
        let mut session = ChatSession::new();
        session.push_exchange("hi", "hello");
        session.set_persona("chef", "You are a chef.");

        assert_eq!(session.history()[0].role, MessageRole::System);
        assert_eq!(session.history()[1].content, "hi");

        session.clear_persona();
        assert_eq!(session.history().len(), 2);
        assert!(session.persona_prompt().is_none());
    }

    #[test]
    fn test_welcome_shown_once() {
        let mut session = ChatSession::new();
        assert!(session.mark_welcome_shown());
        assert!(!session.mark_welcome_shown());
        assert!(session.welcome_shown());
    }
}
