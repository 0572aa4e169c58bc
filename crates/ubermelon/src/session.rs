//! Per-visitor sessions.
//!
//! A session is keyed by a random id carried in the `ubermelon_session`
//! cookie. The only thing a session remembers is the visitor's name.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "ubermelon_session";

/// Sessions one app instance keeps before evicting the oldest.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Extract the session id from a request's `Cookie` headers, if any.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
            .map(SessionId)
    }

    /// `Set-Cookie` value that hands this id to the browser.
    pub fn to_cookie(self) -> String {
        format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What we know about one visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorSession {
    pub name: Option<String>,
}

/// In-memory session table owned by one app instance.
///
/// Every cookie-less `/get-name` call creates a session, so the table is
/// bounded: past `max_sessions` the oldest session is dropped.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<SessionId, VisitorSession>,
    created: VecDeque<SessionId>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store holding at most `max_sessions` sessions (at least one).
    pub fn with_limit(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            created: VecDeque::new(),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Visitor name stored for `id`, if the session exists and has one.
    pub fn visitor_name(&self, id: Option<SessionId>) -> Option<&str> {
        id.and_then(|id| self.sessions.get(&id))
            .and_then(|session| session.name.as_deref())
    }

    /// Store the visitor name, creating the session if needed.
    ///
    /// Returns the id the name was stored under; callers must send it back as
    /// a cookie when it differs from the one they passed in.
    pub fn set_visitor_name(&mut self, id: Option<SessionId>, name: &str) -> SessionId {
        let id = match id {
            Some(id) if self.sessions.contains_key(&id) => id,
            _ => self.create(),
        };
        self.sessions.entry(id).or_default().name = Some(name.to_string());
        id
    }

    fn create(&mut self) -> SessionId {
        while self.created.len() >= self.max_sessions {
            match self.created.pop_front() {
                Some(oldest) => {
                    self.sessions.remove(&oldest);
                }
                None => break,
            }
        }
        let id = SessionId::new();
        self.created.push_back(id);
        self.sessions.insert(id, VisitorSession::default());
        id
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_from_headers_finds_session_cookie() {
        let id = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, id)).unwrap(),
        );
        assert_eq!(SessionId::from_headers(&headers), Some(id));
    }

    #[test]
    fn test_from_headers_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("ubermelon_session=not-a-uuid"),
        );
        assert_eq!(SessionId::from_headers(&headers), None);
        assert_eq!(SessionId::from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_set_then_read_name() {
        let mut store = SessionStore::new();
        assert_eq!(store.visitor_name(None), None);

        let id = store.set_visitor_name(None, "Test User");
        assert_eq!(store.visitor_name(Some(id)), Some("Test User"));

        // Same session keeps its id when the name changes.
        let again = store.set_visitor_name(Some(id), "Other");
        assert_eq!(again, id);
        assert_eq!(store.visitor_name(Some(id)), Some("Other"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_gets_fresh_session() {
        let mut store = SessionStore::new();
        let stale = SessionId::new();
        let id = store.set_visitor_name(Some(stale), "Test User");
        assert_ne!(id, stale);
        assert_eq!(store.visitor_name(Some(stale)), None);
    }

    #[test]
    fn test_oldest_session_evicted_past_limit() {
        let mut store = SessionStore::with_limit(2);
        let first = store.set_visitor_name(None, "first");
        let second = store.set_visitor_name(None, "second");

        // Renaming an existing session does not create a new one.
        store.set_visitor_name(Some(first), "first again");
        assert_eq!(store.len(), 2);

        let third = store.set_visitor_name(None, "third");
        assert_eq!(store.len(), 2);
        assert_eq!(store.visitor_name(Some(first)), None);
        assert_eq!(store.visitor_name(Some(second)), Some("second"));
        assert_eq!(store.visitor_name(Some(third)), Some("third"));
    }

    #[test]
    fn test_cookie_format() {
        let id = SessionId::new();
        let cookie = id.to_cookie();
        assert!(cookie.starts_with(&format!("{}={}", SESSION_COOKIE, id)));
        assert!(cookie.contains("Path=/"));
    }
}
