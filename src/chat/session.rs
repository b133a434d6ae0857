use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::core::error::{RelayError, Result};
use crate::core::types::{Message, Role};

const DEFAULT_TITLE: &str = "New chat";
const MAX_TITLE_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_TITLE.to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        if self.messages.is_empty() && message.role == Role::User {
            self.title = title_from(&message.content);
        }
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn last_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

fn title_from(text: &str) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    if line.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let mut title: String = line.chars().take(MAX_TITLE_CHARS).collect();
    if line.chars().count() > MAX_TITLE_CHARS {
        title.push_str("...");
    }
    title
}

/// Every chat the user has open, exactly one of which is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    active: Uuid,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let session = ChatSession::new();
        Self {
            active: session.id,
            sessions: vec![session],
        }
    }

    /// Starts a fresh session and makes it active.
    pub fn create(&mut self) -> &mut ChatSession {
        let session = ChatSession::new();
        self.active = session.id;
        self.sessions.push(session);
        let last = self.sessions.len() - 1;
        &mut self.sessions[last]
    }

    #[must_use]
    pub fn list(&self) -> &[ChatSession] {
        &self.sessions
    }

    #[must_use]
    pub const fn active_id(&self) -> Uuid {
        self.active
    }

    pub fn switch(&mut self, id: Uuid) -> Result<&ChatSession> {
        let index = self.position(id)?;
        self.active = id;
        Ok(&self.sessions[index])
    }

    /// Switches by 1-based position in [`list`](Self::list).
    pub fn switch_to_index(&mut self, number: usize) -> Result<&ChatSession> {
        let id = number
            .checked_sub(1)
            .and_then(|i| self.sessions.get(i))
            .map(|s| s.id)
            .ok_or_else(|| RelayError::SessionNotFound(format!("#{number}")))?;
        self.switch(id)
    }

    /// Removes a session. Removing the active one activates its neighbour,
    /// or a fresh session when none is left.
    pub fn remove(&mut self, id: Uuid) -> Result<ChatSession> {
        let index = self.position(id)?;
        let removed = self.sessions.remove(index);

        if self.sessions.is_empty() {
            self.create();
        } else if removed.id == self.active {
            let next = index.min(self.sessions.len() - 1);
            self.active = self.sessions[next].id;
        }

        tracing::debug!(session = %removed.id, remaining = self.sessions.len(), "Session removed");
        Ok(removed)
    }

    #[must_use]
    pub fn active(&self) -> &ChatSession {
        self.sessions
            .iter()
            .find(|s| s.id == self.active)
            .unwrap_or(&self.sessions[0])
    }

    pub fn active_mut(&mut self) -> &mut ChatSession {
        let index = self.position(self.active).unwrap_or(0);
        &mut self.sessions[index]
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| RelayError::SessionNotFound(id.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::debug!(path = %path.display(), sessions = self.sessions.len(), "Sessions saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let mut store: Self = serde_json::from_str(&json)?;

        if store.sessions.is_empty() {
            store = Self::new();
        } else if store.position(store.active).is_err() {
            store.active = store.sessions[0].id;
        }

        tracing::debug!(path = %path.display(), sessions = store.sessions.len(), "Sessions loaded");
        Ok(store)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_store_has_one_active_session() {
        let store = SessionStore::new();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.active().id, store.active_id());
        assert!(store.active().is_empty());
    }

    #[test]
    fn test_title_follows_first_user_message() {
        let mut session = ChatSession::new();
        assert_eq!(session.title, "New chat");

        session.push(Message::user("  \nHow do lifetimes work in Rust?"));
        session.push(Message::user("Another question"));
        assert_eq!(session.title, "How do lifetimes work in Rust?");

        let mut long = ChatSession::new();
        long.push(Message::user("x".repeat(60)));
        assert_eq!(long.title, format!("{}...", "x".repeat(40)));
    }

    #[test]
    fn test_create_and_switch() {
        let mut store = SessionStore::new();
        let first = store.active_id();
        let second = store.create().id;
        assert_eq!(store.active_id(), second);

        store.switch(first).unwrap();
        assert_eq!(store.active_id(), first);

        store.switch_to_index(2).unwrap();
        assert_eq!(store.active_id(), second);

        assert!(matches!(
            store.switch(Uuid::new_v4()),
            Err(RelayError::SessionNotFound(_))
        ));
        assert!(store.switch_to_index(0).is_err());
        assert!(store.switch_to_index(3).is_err());
    }

    #[test]
    fn test_remove_active_activates_neighbour() {
        let mut store = SessionStore::new();
        let first = store.active_id();
        let second = store.create().id;

        store.remove(second).unwrap();
        assert_eq!(store.active_id(), first);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_remove_last_session_starts_fresh() {
        let mut store = SessionStore::new();
        let only = store.active_id();
        store.remove(only).unwrap();

        assert_eq!(store.list().len(), 1);
        assert_ne!(store.active_id(), only);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        let mut store = SessionStore::new();
        store.active_mut().push(Message::user("Hello"));
        store.active_mut().push(Message::bot("Hi there"));
        let second = store.create().id;
        store.save(&path).unwrap();

        let loaded = SessionStore::load(&path).unwrap();
        assert_eq!(loaded.list().len(), 2);
        assert_eq!(loaded.active_id(), second);
        assert_eq!(loaded.list()[0].messages()[1], Message::bot("Hi there"));
        assert_eq!(loaded.list()[0].title, "Hello");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = SessionStore::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(RelayError::Io(_))));
    }
}
