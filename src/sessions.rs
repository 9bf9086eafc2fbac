//! Cookie-bound session store.
//!
//! Sessions are in-memory records keyed by an unguessable token carried in a
//! cookie. Expired entries are refused on resolution and swept periodically.
//! Durable session persistence is an external concern behind this seam.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "fd_session";

/// Who is asking, as resolved by the session stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub username: String,
    pub session_id: Uuid,
}

#[derive(Debug)]
struct Session {
    username: String,
    expires_at: Instant,
}

/// Process-wide session registry, safe under concurrent request traversals.
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: DashMap::new(), ttl }
    }

    /// Open a session for `username`, returning the cookie token.
    pub fn create(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            Session { username: username.to_string(), expires_at: Instant::now() + self.ttl },
        );
        id
    }

    /// Resolve an identity from a `Cookie` header value, if any.
    pub fn resolve(&self, cookie_header: Option<&str>) -> Option<SessionIdentity> {
        let header = cookie_header?;
        let token = find_cookie(header, SESSION_COOKIE)?;
        let id: Uuid = token.parse().ok()?;
        self.resolve_token(id)
    }

    /// Resolve an identity from a raw session token.
    pub fn resolve_token(&self, id: Uuid) -> Option<SessionIdentity> {
        let entry = self.sessions.get(&id)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.sessions.remove(&id);
            return None;
        }
        Some(SessionIdentity { username: entry.username.clone(), session_id: id })
    }

    /// Terminate a session. Removing an unknown token is a no-op.
    pub fn remove(&self, id: Uuid) {
        self.sessions.remove(&id);
    }

    /// Drop expired entries. Called periodically from a background task.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.sessions.retain(|_, session| session.expires_at > now);
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
