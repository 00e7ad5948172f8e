// SPDX-License-Identifier: Apache-2.0

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use dashmap::DashMap;
use fuzzysheets_model::ArtifactDescriptor;
use rand::Rng;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const SESSION_COOKIE: &str = "fuzzysheets_session";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(format!("{:032x}", rand::rng().random::<u128>()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side state of one client session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub admitted: bool,
    pub flashes: Vec<String>,
    pub download_files: Vec<ArtifactDescriptor>,
}

struct SessionEntry {
    state: SessionState,
    last_seen: Instant,
}

impl SessionEntry {
    fn fresh() -> Self {
        Self {
            state: SessionState::default(),
            last_seen: Instant::now(),
        }
    }
}

/// In-memory session table, sharded by session id so requests of different
/// sessions never wait on each other.
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionEntry>,
    idle_ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    /// Returns the live session named by `presented`, or opens a new one.
    /// The flag is `true` when a new session was opened.
    pub fn open(&self, presented: Option<&str>) -> (SessionId, bool) {
        if let Some(raw) = presented {
            let id = SessionId(raw.to_string());
            let live = match self.sessions.get_mut(&id) {
                Some(mut entry) if entry.last_seen.elapsed() < self.idle_ttl => {
                    entry.last_seen = Instant::now();
                    true
                }
                _ => false,
            };
            if live {
                return (id, false);
            }
            self.sessions.remove(&id);
        }
        let id = SessionId::generate();
        self.sessions.insert(id.clone(), SessionEntry::fresh());
        debug!(session = %id, "session opened");
        (id, true)
    }

    /// Runs `f` against the session's state, recreating it if it was evicted
    /// in the meantime. `f` must not touch the store again.
    pub fn update<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(id.clone())
            .or_insert_with(SessionEntry::fresh);
        entry.last_seen = Instant::now();
        f(&mut entry.state)
    }

    pub fn remove(&self, id: &SessionId) {
        self.sessions.remove(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn evict_idle(&self) -> usize {
        let ttl = self.idle_ttl;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() < ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn spawn_background_tasks(self: &Arc<Self>, sweep_interval: Duration) {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                let evicted = me.evict_idle();
                if evicted > 0 {
                    info!(evicted, "idle sessions evicted");
                }
            }
        });
    }
}

/// The current request's session, inserted as a request extension.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    store: Arc<SessionStore>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(id: SessionId, store: Arc<SessionStore>) -> Self {
        Self { id, store }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn flash(&self, message: impl Into<String>) {
        let message = message.into();
        self.store.update(&self.id, |s| s.flashes.push(message));
    }

    #[must_use]
    pub fn take_flashes(&self) -> Vec<String> {
        self.store
            .update(&self.id, |s| std::mem::take(&mut s.flashes))
    }

    #[must_use]
    pub fn is_admitted(&self) -> bool {
        self.store.update(&self.id, |s| s.admitted)
    }

    pub fn admit(&self) {
        self.store.update(&self.id, |s| s.admitted = true);
    }

    /// Drops the whole session; the next request opens a fresh one.
    pub fn end(&self) {
        self.store.remove(&self.id);
    }
}

/// Extracts the session id from the request's `Cookie` headers.
#[must_use]
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Non-permanent session cookie: no `Max-Age`, so it ends with the browser.
#[must_use]
pub fn set_cookie_value(id: &SessionId) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}
