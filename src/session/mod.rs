//! In-memory conversation history, keyed by session id.
//!
//! Each session keeps a bounded transcript (sliding window of `max_turns`)
//! and the store evicts the least recently used session once `max_sessions`
//! is exceeded. Nothing survives a process restart.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

pub type Transcript = Vec<Turn>;

/// Issues a fresh, unguessable session id for a new client connection.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Serializes turns within one session. Held for the whole turn.
pub type TurnLock = Arc<tokio::sync::Mutex<()>>;

struct SessionEntry {
    transcript: Transcript,
    turn_lock: TurnLock,
    last_used: u64,
}

impl SessionEntry {
    fn new(tick: u64) -> Self {
        Self {
            transcript: Vec::new(),
            turn_lock: Arc::new(tokio::sync::Mutex::new(())),
            last_used: tick,
        }
    }
}

#[derive(Default)]
struct SessionMap {
    sessions: HashMap<String, SessionEntry>,
    tick: u64,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionMap>>,
    max_turns: usize,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_turns: usize, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionMap::default())),
            max_turns: max_turns.max(2),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session's transcript, creating an empty one on first use.
    pub fn get_or_create(&self, session_id: &str) -> Transcript {
        let mut map = self.lock();
        self.entry(&mut map, session_id).transcript.clone()
    }

    /// Returns the transcript without creating the session.
    pub fn snapshot(&self, session_id: &str) -> Option<Transcript> {
        let map = self.lock();
        map.sessions
            .get(session_id)
            .map(|entry| entry.transcript.clone())
    }

    pub fn append(&self, session_id: &str, turn: Turn) {
        let mut map = self.lock();
        let max_turns = self.max_turns;
        let entry = self.entry(&mut map, session_id);
        entry.transcript.push(turn);
        trim_window(&mut entry.transcript, max_turns);
    }

    /// Appends a user turn and its answer as one step.
    pub fn append_exchange(&self, session_id: &str, user: Turn, assistant: Turn) {
        let mut map = self.lock();
        let max_turns = self.max_turns;
        let entry = self.entry(&mut map, session_id);
        entry.transcript.push(user);
        entry.transcript.push(assistant);
        trim_window(&mut entry.transcript, max_turns);
    }

    pub fn turn_lock(&self, session_id: &str) -> TurnLock {
        let mut map = self.lock();
        self.entry(&mut map, session_id).turn_lock.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, SessionMap> {
        // a panic while holding the lock cannot leave a half-written entry
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry<'a>(&self, map: &'a mut SessionMap, session_id: &str) -> &'a mut SessionEntry {
        map.tick += 1;
        let tick = map.tick;

        if !map.sessions.contains_key(session_id) {
            while map.sessions.len() >= self.max_sessions && evict_least_recent(map) {}
            tracing::debug!("Creating session {}", session_id);
        }

        let entry = map
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(tick));
        entry.last_used = tick;
        entry
    }
}

fn trim_window(transcript: &mut Transcript, max_turns: usize) {
    if transcript.len() > max_turns {
        let excess = transcript.len() - max_turns;
        transcript.drain(..excess);
    }
}

/// Removes the least recently used session that has no turn in flight.
///
/// A session whose turn lock is held or awaited is never a victim, so the
/// store may briefly exceed `max_sessions`. Returns whether one was removed.
fn evict_least_recent(map: &mut SessionMap) -> bool {
    let oldest = map
        .sessions
        .iter()
        .filter(|(_, entry)| Arc::strong_count(&entry.turn_lock) == 1)
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(id, _)| id.clone());
    match oldest {
        Some(id) => {
            map.sessions.remove(&id);
            tracing::info!("Evicted idle session {}", id);
            true
        }
        None => {
            tracing::warn!(
                "All {} sessions have a turn in flight; none evicted",
                map.sessions.len()
            );
            false
        }
    }
}
