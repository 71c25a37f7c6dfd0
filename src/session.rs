use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::{Rng, distr::Alphanumeric};
use tokio::sync::RwLock;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::handlers::AppState;

const TOKEN_LEN: usize = 32;

fn generate_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
struct Session {
    user: Option<SessionUser>,
    csrf_token: String,
    flashes: Vec<Flash>,
    last_seen: Instant,
    /// Set once the cookie has come back with a later request.
    returned: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            user: None,
            csrf_token: generate_token(),
            flashes: Vec::new(),
            last_seen: Instant::now(),
            returned: false,
        }
    }

    /// Sessions whose cookie never came back expire after `fresh_ttl`.
    fn expired(&self, ttl: Duration, fresh_ttl: Duration) -> bool {
        let limit = if self.returned || self.user.is_some() {
            ttl
        } else {
            fresh_ttl
        };
        self.last_seen.elapsed() > limit
    }
}

/// Constant-time token comparison.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (expected, presented) = (expected.as_bytes(), presented.as_bytes());
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

pub const DEFAULT_FRESH_SESSION_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 100_000;

/// Server-side sessions keyed by the session cookie.
///
/// A session carries the signed-in user, the CSRF token and the flash
/// messages waiting for the next rendered page. The store holds at most
/// `max_sessions` entries; when full, the least recently seen anonymous
/// session is evicted first.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    fresh_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            fresh_ttl: DEFAULT_FRESH_SESSION_TTL.min(ttl),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    #[must_use]
    pub fn with_limits(self, fresh_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            fresh_ttl: fresh_ttl.min(self.ttl),
            max_sessions: max_sessions.max(1),
            ..self
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns the live session named by `presented`, or a fresh one. The
    /// flag tells whether a new session was created.
    pub async fn resolve(&self, presented: Option<&str>) -> (SessionId, bool) {
        let mut sessions = self.sessions.write().await;

        if let Some(id) = presented {
            let expired = match sessions.get_mut(id) {
                Some(session) if !session.expired(self.ttl, self.fresh_ttl) => {
                    session.last_seen = Instant::now();
                    session.returned = true;
                    return (SessionId(id.to_string()), false);
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                tracing::debug!("Session expired, starting a new one");
                sessions.remove(id);
            }
        }

        let id = self.insert(&mut sessions, Session::new());
        (id, true)
    }

    fn insert(&self, sessions: &mut HashMap<String, Session>, session: Session) -> SessionId {
        if sessions.len() >= self.max_sessions {
            sessions.retain(|_, session| !session.expired(self.ttl, self.fresh_ttl));
        }
        while sessions.len() >= self.max_sessions {
            let victim = sessions
                .iter()
                .min_by_key(|(_, session)| (session.user.is_some(), session.last_seen))
                .map(|(id, _)| id.clone());
            match victim {
                Some(victim) => {
                    tracing::warn!("Session store full, evicting least recent session");
                    sessions.remove(&victim);
                }
                None => break,
            }
        }

        let id = generate_token();
        sessions.insert(id.clone(), session);
        SessionId(id)
    }

    pub async fn user(&self, id: &SessionId) -> Option<SessionUser> {
        self.sessions
            .read()
            .await
            .get(id.as_str())
            .and_then(|session| session.user.clone())
    }

    /// Signs `user` in. The session moves to a new id with a new CSRF
    /// token; the old id stops being valid. Returns the new id, or `None`
    /// when the session is gone.
    pub async fn login(&self, id: &SessionId, user: SessionUser) -> Option<SessionId> {
        let mut sessions = self.sessions.write().await;
        let mut session = sessions.remove(id.as_str())?;

        session.user = Some(user);
        session.csrf_token = generate_token();
        session.last_seen = Instant::now();
        session.returned = true;

        Some(self.insert(&mut sessions, session))
    }

    /// Drops the session with everything it holds.
    pub async fn logout(&self, id: &SessionId) {
        self.sessions.write().await.remove(id.as_str());
    }

    pub async fn csrf_token(&self, id: &SessionId) -> String {
        self.sessions
            .read()
            .await
            .get(id.as_str())
            .map(|session| session.csrf_token.clone())
            .unwrap_or_default()
    }

    pub async fn verify_csrf(&self, id: &SessionId, presented: &str) -> bool {
        !presented.is_empty()
            && self
                .sessions
                .read()
                .await
                .get(id.as_str())
                .is_some_and(|session| tokens_match(&session.csrf_token, presented))
    }

    pub async fn push_flash(&self, id: &SessionId, level: FlashLevel, text: impl Into<String>) {
        if let Some(session) = self.sessions.write().await.get_mut(id.as_str()) {
            session.flashes.push(Flash {
                level,
                text: text.into(),
            });
        }
    }

    /// Drains the pending flash messages.
    pub async fn take_flashes(&self, id: &SessionId) -> Vec<Flash> {
        self.sessions
            .write()
            .await
            .get_mut(id.as_str())
            .map(|session| std::mem::take(&mut session.flashes))
            .unwrap_or_default()
    }

    /// Drops expired sessions, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.expired(self.ttl, self.fresh_ttl));
        before - sessions.len()
    }
}

/// The session cookie for `id`.
pub fn session_cookie(name: &str, id: &SessionId) -> Cookie<'static> {
    Cookie::build((name.to_string(), id.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Attaches a [`SessionId`] to every request, issuing the session cookie
/// when a new session is started.
pub async fn session_layer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.session_cookie.clone();
    let jar = CookieJar::from_headers(request.headers());
    let presented = jar.get(&cookie_name).map(|cookie| cookie.value().to_string());

    let (session, created) = state.sessions.resolve(presented.as_deref()).await;
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    if created {
        (jar.add(session_cookie(&cookie_name, &session)), response).into_response()
    } else {
        response
    }
}
