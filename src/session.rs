//! Per-conversation session state
//!
//! Sessions live in memory until they end, go idle, or are pushed out by
//! newer ones. The card ledger is shared by all of them and outlives every
//! session.

use crate::intent::Intent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Who said a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Ephemeral state of one conversation
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    transcript: Vec<TranscriptEntry>,
    pub last_intent: Option<Intent>,
    pub ended: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Append one completed turn: the user's line, then the reply
    pub fn record_turn(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::User,
            text: user.into(),
        });
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Assistant,
            text: reply.into(),
        });
        tracing::debug!(entries = self.transcript.len(), "Transcript updated");
    }
}

pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// Sessions untouched for this long are dropped
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Live sessions kept at most; the least recently seen goes first
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Live sessions keyed by id.
///
/// Each session sits behind its own mutex so one session's turns run one at
/// a time while other sessions proceed. Idle sessions expire and the map is
/// capped, so abandoned visits do not accumulate.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Start a fresh session and return its id
    pub async fn create(&self) -> String {
        self.create_at(Instant::now()).await
    }

    async fn create_at(&self, now: Instant) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(session = %oldest, "Session evicted, registry full");
        }

        sessions.insert(
            id.clone(),
            SessionEntry {
                handle: Arc::new(Mutex::new(SessionContext::new())),
                last_seen: now,
            },
        );
        tracing::info!(session = %id, live = sessions.len(), "Session started");
        id
    }

    /// Look up a live session and mark it as seen
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.get_at(id, Instant::now()).await
    }

    async fn get_at(&self, id: &str, now: Instant) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let last_seen = sessions.get(id)?.last_seen;
        if now.saturating_duration_since(last_seen) > self.idle_ttl {
            sessions.remove(id);
            tracing::info!(session = %id, "Session expired");
            return None;
        }
        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(entry.handle.clone())
    }

    pub async fn remove(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            tracing::info!(session = %id, "Session closed");
        }
    }

    /// Drop every idle session; returns how many went
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now)
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, live = sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    #[allow(dead_code)] // Used in tests
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
