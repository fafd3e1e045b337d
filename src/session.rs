//! Per-session chat history.
//!
//! A [`ChatSession`] is an append-only list of turns. Sessions are kept in
//! a [`SessionStore`] keyed by a random id, in memory only. A session that
//! has not been touched for the idle timeout is dropped, and the store never
//! holds more than its capacity: when full, the least recently used session
//! makes room for a new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
/// Upper bound on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// The six example questions offered next to the chat.
pub const PRESET_QUESTIONS: [&str; 6] = [
    "Wie viele Fehlversuche im Grundstudium sind erlaubt?",
    "Was passiert bei Versäumnis einer Prüfung?",
    "Was sind die Unterschiede zwischen KF/AM/DAR/KBI?",
    "Welche Anforderungen gelten für das Praxissemester?",
    "Wie berechnet sich die Modulnote?",
    "Wieviel LP hat die Bachelorarbeit?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, role: ChatRole, content: &str) {
        self.turns.push(ChatTurn {
            role,
            content: content.to_string(),
        });
    }
}

/// Serialises the turns of one session.
pub type TurnLock = Arc<tokio::sync::Mutex<()>>;

struct SessionEntry {
    session: ChatSession,
    last_seen: Instant,
    turn_lock: TurnLock,
}

impl SessionEntry {
    fn new(now: Instant) -> Self {
        Self {
            session: ChatSession::new(),
            last_seen: now,
            turn_lock: TurnLock::default(),
        }
    }
}

/// All live sessions of this process.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Snapshot of a session's history; unknown or expired ids read as empty.
    pub fn history(&self, id: Uuid) -> ChatSession {
        let now = Instant::now();
        let mut sessions = self.lock();
        match sessions.get_mut(&id) {
            Some(entry) if !self.expired(&*entry, now) => {
                entry.last_seen = now;
                entry.session.clone()
            }
            _ => ChatSession::new(),
        }
    }

    /// Append a turn, creating the session if needed, and return the
    /// updated history.
    pub fn append(&self, id: Uuid, role: ChatRole, content: &str) -> ChatSession {
        self.append_at(id, role, content, Instant::now())
    }

    /// Lock held by a request for the whole of one question/answer turn, so
    /// concurrent posts to the same session do not interleave.
    pub fn turn_lock(&self, id: Uuid) -> TurnLock {
        let now = Instant::now();
        let mut sessions = self.lock();
        self.entry_at(&mut sessions, id, now).turn_lock.clone()
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    fn append_at(&self, id: Uuid, role: ChatRole, content: &str, now: Instant) -> ChatSession {
        let mut sessions = self.lock();
        let entry = self.entry_at(&mut sessions, id, now);
        entry.session.push(role, content);
        entry.session.clone()
    }

    /// Fetch or create the entry for `id`, pruning expired sessions and
    /// evicting the least recently used one when a new session would exceed
    /// capacity.
    fn entry_at<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, SessionEntry>,
        id: Uuid,
        now: Instant,
    ) -> &'a mut SessionEntry {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped idle chat sessions");
        }

        if !sessions.contains_key(&id) && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::debug!(session = %oldest, "evicted least recently used chat session");
            }
        }

        let entry = sessions.entry(id).or_insert_with(|| SessionEntry::new(now));
        entry.last_seen = entry.last_seen.max(now);
        entry
    }

    fn expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) > self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
