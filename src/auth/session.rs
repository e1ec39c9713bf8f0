// Session store
// Maps session ids to users and users to their platform tokens

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::types::{TokenRecord, User, UserSession};
use crate::error::{Error, Result};

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_token";

/// Storage primitives behind `UserAuthManager`
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get_session(&self, session_id: &str) -> Result<Option<UserSession>>;
    async fn put_session(&self, session: UserSession) -> Result<()>;
    async fn remove_session(&self, session_id: &str) -> Result<()>;
    /// Remove every session owned by `user_id`
    async fn remove_user_sessions(&self, user_id: &str) -> Result<()>;
    /// Remove sessions expired at the current time, returning how many
    async fn remove_expired_sessions(&self) -> Result<usize>;

    async fn get_tokens(&self, user_id: &str) -> Result<Option<TokenRecord>>;
    async fn put_tokens(&self, record: TokenRecord) -> Result<()>;
    async fn remove_tokens(&self, user_id: &str) -> Result<()>;
}

/// In-process backend
#[derive(Default)]
pub struct MemorySessionBackend {
    sessions: DashMap<String, UserSession>,
    tokens: DashMap<String, TokenRecord>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn get_session(&self, session_id: &str) -> Result<Option<UserSession>> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone()))
    }

    async fn put_session(&self, session: UserSession) -> Result<()> {
        self.sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn remove_session(&self, session_id: &str) -> Result<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn remove_user_sessions(&self, user_id: &str) -> Result<()> {
        self.sessions.retain(|_, session| session.user_id != user_id);
        Ok(())
    }

    async fn remove_expired_sessions(&self) -> Result<usize> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn get_tokens(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn put_tokens(&self, record: TokenRecord) -> Result<()> {
        self.tokens.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn remove_tokens(&self, user_id: &str) -> Result<()> {
        self.tokens.remove(user_id);
        Ok(())
    }
}

/// Per-user session store
///
/// Resolves inbound session identifiers to users and owns each user's
/// `TokenRecord`. Never performs network calls.
#[derive(Clone)]
pub struct UserAuthManager {
    backend: Arc<dyn SessionBackend>,
    session_ttl: Duration,
}

impl UserAuthManager {
    pub fn new(backend: Arc<dyn SessionBackend>, session_ttl: Duration) -> Self {
        Self {
            backend,
            session_ttl,
        }
    }

    /// In-memory store with the given session lifetime
    pub fn in_memory(session_ttl: Duration) -> Self {
        Self::new(Arc::new(MemorySessionBackend::new()), session_ttl)
    }

    /// Open a session for a user who completed login
    pub async fn create_session(&self, user_id: &str) -> Result<UserSession> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.session_ttl).ok_or_else(|| {
            Error::SessionStore(format!(
                "session lifetime of {}s is out of range",
                self.session_ttl.num_seconds()
            ))
        })?;
        let session = UserSession {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at,
        };
        self.backend.put_session(session.clone()).await?;
        tracing::debug!(user_id = user_id, "Session created");
        Ok(session)
    }

    pub async fn store_user_tokens(&self, record: TokenRecord) -> Result<()> {
        tracing::debug!(user_id = %record.user_id, "Storing user tokens");
        self.backend.put_tokens(record).await
    }

    /// Resolve an `Authorization` header value or `Cookie` header to a user.
    ///
    /// Returns `None` when there is no usable session, including when the
    /// backend fails; an unauthenticated caller is an expected outcome.
    pub async fn authenticate_user(&self, header_or_cookie: Option<&str>) -> Option<User> {
        let session_id = extract_session_id(header_or_cookie?)?;

        let session = match self.backend.get_session(&session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::debug!("No session found for presented identifier");
                return None;
            }
            Err(e) => {
                tracing::error!("Session lookup failed: {}", e);
                return None;
            }
        };

        if session.is_expired_at(Utc::now()) {
            tracing::info!(user_id = %session.user_id, "Session expired");
            if let Err(e) = self.backend.remove_session(&session_id).await {
                tracing::warn!("Failed to evict expired session: {}", e);
            }
            return None;
        }

        Some(User {
            user_id: session.user_id,
            session_id: session.session_id,
        })
    }

    /// Look up a user's tokens
    pub async fn get_user_tokens(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        self.backend.get_tokens(user_id).await
    }

    /// Remove a user's tokens and all of their sessions. Idempotent.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<()> {
        self.backend.remove_tokens(user_id).await?;
        self.backend.remove_user_sessions(user_id).await?;
        tracing::info!(user_id = user_id, "User data deleted");
        Ok(())
    }

    /// Drop expired sessions
    pub async fn purge_expired(&self) -> Result<usize> {
        let removed = self.backend.remove_expired_sessions().await?;
        if removed > 0 {
            tracing::info!(removed = removed, "Purged expired sessions");
        }
        Ok(removed)
    }
}

/// Pull a session id out of `Bearer <id>`, `session_token=<id>; ...` or a bare id
pub fn extract_session_id(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // Scheme match is case-insensitive and tolerates a bare "Bearer"
    let (scheme, rest) = value.split_once(char::is_whitespace).unwrap_or((value, ""));
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        return (!token.is_empty()).then(|| token.to_string());
    }

    if value.contains('=') {
        return value
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, id)| id.trim().to_string())
            .filter(|id| !id.is_empty());
    }

    Some(value.to_string())
}
