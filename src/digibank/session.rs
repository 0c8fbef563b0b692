//! Server-side onboarding sessions keyed by an `HttpOnly` cookie.
//!
//! Sessions live in memory and slide: every committed request refreshes the
//! TTL. A background reaper drops the ones nobody touched in time.

use super::{config::FlowConfig, error::ApiError};
use crate::onboarding::OnboardingSession;
use anyhow::anyhow;
use axum::{
    extract::FromRequestParts,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::Mutex, task::JoinHandle, time::interval};
use tracing::{debug, error};
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "digibank_session";

struct StoredSession {
    state: OnboardingSession,
    touched_at: Instant,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live session or start an empty one under a fresh id.
    pub async fn load(&self, id: Option<Uuid>) -> (Uuid, OnboardingSession) {
        if let Some(id) = id {
            let sessions = self.sessions.lock().await;
            match sessions.get(&id) {
                Some(stored) if stored.touched_at.elapsed() <= self.ttl => {
                    return (id, stored.state.clone());
                }
                Some(_) => debug!("session expired"),
                None => debug!("unknown session id"),
            }
        }
        (Uuid::new_v4(), OnboardingSession::default())
    }

    pub async fn save(&self, id: Uuid, state: OnboardingSession) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            id,
            StoredSession {
                state,
                touched_at: Instant::now(),
            },
        );
    }

    pub async fn remove(&self, id: Uuid) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&id);
    }

    /// Drop expired sessions, returning how many went away.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.touched_at.elapsed() <= self.ttl);
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

/// Periodically purge expired sessions.
pub fn spawn_reaper(store: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    let mut ticker = interval(every);

    tokio::spawn(async move {
        loop {
            ticker.tick().await;

            let purged = store.purge_expired().await;
            if purged > 0 {
                debug!("Purged {} expired sessions", purged);
            }
        }
    })
}

/// The caller's session, loaded before the handler runs.
///
/// Handlers mutate `state` and then [`commit`](Self::commit) it; the returned
/// headers carry the session cookie.
pub struct FlowSession {
    id: Uuid,
    pub state: OnboardingSession,
    store: Arc<SessionStore>,
    secure: bool,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for FlowSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store = parts
            .extensions
            .get::<Arc<SessionStore>>()
            .cloned()
            .ok_or_else(|| anyhow!("session store not configured"))?;
        let secure = parts
            .extensions
            .get::<Arc<FlowConfig>>()
            .is_some_and(|config| config.session_cookie_secure());

        let (id, state) = store.load(session_id(&parts.headers)).await;

        Ok(Self {
            id,
            state,
            store,
            secure,
        })
    }
}

impl FlowSession {
    /// Persist the state and return the `Set-Cookie` headers.
    pub async fn commit(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match session_cookie(self.id, self.store.ttl(), self.secure) {
            Ok(cookie) => {
                headers.insert(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build session cookie: {err}"),
        }
        self.store.save(self.id, self.state).await;
        headers
    }

    /// Forget the session and expire the cookie.
    pub async fn destroy(self) -> HeaderMap {
        self.store.remove(self.id).await;

        let mut headers = HeaderMap::new();
        if let Ok(cookie) = clear_session_cookie(self.secure) {
            headers.insert(SET_COOKIE, cookie);
        }
        headers
    }
}

fn session_cookie(id: Uuid, ttl: Duration, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = ttl.as_secs();
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read the session id from the `Cookie` header; garbage counts as absent.
pub(crate) fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == SESSION_COOKIE_NAME).then_some(val)
        })
        .find_map(|val| Uuid::parse_str(val).ok())
}
