// Revocation (logout) flow
// Authenticated -> RevokingRemote -> LocalCleanup -> LoggedOut

use std::fmt;
use std::sync::Arc;

use super::manager::AuthManager;
use super::session::UserAuthManager;
use super::types::{Credential, User};
use crate::client::MetaApiClient;
use crate::error::Result;
use crate::http_client::GraphHttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationState {
    Authenticated,
    RevokingRemote,
    LocalCleanup,
    LoggedOut,
}

impl RevocationState {
    /// The only state reachable from this one
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Authenticated => Some(Self::RevokingRemote),
            Self::RevokingRemote => Some(Self::LocalCleanup),
            Self::LocalCleanup => Some(Self::LoggedOut),
            Self::LoggedOut => None,
        }
    }
}

impl fmt::Display for RevocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticated => "authenticated",
            Self::RevokingRemote => "revoking_remote",
            Self::LocalCleanup => "local_cleanup",
            Self::LoggedOut => "logged_out",
        };
        f.write_str(name)
    }
}

/// What happened at the remote platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRevocation {
    /// Platform confirmed the revocation
    Revoked,
    /// Call failed or was refused; local cleanup still ran
    Failed(String),
    /// No stored token to revoke
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationOutcome {
    pub user_id: String,
    pub remote: RemoteRevocation,
    /// Every state visited, in order
    pub states: Vec<RevocationState>,
}

impl RevocationOutcome {
    pub fn final_state(&self) -> Option<RevocationState> {
        self.states.last().copied()
    }
}

/// Logout of one user: best-effort remote revoke, then unconditional local cleanup
pub struct RevocationFlow {
    sessions: UserAuthManager,
    http: Arc<GraphHttpClient>,
    graph_host: String,
    api_version: String,
    state: RevocationState,
    visited: Vec<RevocationState>,
}

impl RevocationFlow {
    pub fn new(
        sessions: UserAuthManager,
        http: Arc<GraphHttpClient>,
        graph_host: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            http,
            graph_host: graph_host.into(),
            api_version: api_version.into(),
            state: RevocationState::Authenticated,
            visited: vec![RevocationState::Authenticated],
        }
    }

    pub fn state(&self) -> RevocationState {
        self.state
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            tracing::debug!(from = %self.state, to = %next, "Revocation state transition");
            self.state = next;
            self.visited.push(next);
        }
    }

    /// Run the flow to completion for a resolved user.
    ///
    /// Only a failure of the session store itself is returned as an error;
    /// remote failures are logged and recorded in the outcome.
    pub async fn run(mut self, user: &User) -> Result<RevocationOutcome> {
        let tokens = self.sessions.get_user_tokens(&user.user_id).await?;

        self.advance();
        let remote = match tokens {
            Some(record) => self.revoke_remote(&record.access_token).await,
            None => {
                tracing::info!(user_id = %user.user_id, "No stored tokens, skipping remote revocation");
                RemoteRevocation::Skipped
            }
        };

        self.advance();
        self.sessions.delete_user_data(&user.user_id).await?;

        self.advance();
        tracing::info!(
            user_id = %user.user_id,
            remote = ?remote,
            "User logged out"
        );

        Ok(RevocationOutcome {
            user_id: user.user_id.clone(),
            remote,
            states: self.visited,
        })
    }

    async fn revoke_remote(&self, access_token: &str) -> RemoteRevocation {
        let client = match self.client_for(access_token) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Meta token revocation skipped: {}", e);
                return RemoteRevocation::Failed(e.to_string());
            }
        };

        match client.revoke_permissions().await {
            Ok(true) => RemoteRevocation::Revoked,
            Ok(false) => {
                tracing::warn!("Meta token revocation failed, but continuing with local cleanup");
                RemoteRevocation::Failed("platform reported success=false".to_string())
            }
            Err(e) => {
                tracing::warn!("Meta token revocation error: {}", e);
                RemoteRevocation::Failed(e.to_string())
            }
        }
    }

    fn client_for(&self, access_token: &str) -> Result<MetaApiClient> {
        let credential = Credential::new(access_token, Some(&self.api_version))?;
        let auth = AuthManager::with_credential(credential, Some(&self.graph_host))?
            .with_http_client(self.http.client().clone());
        Ok(MetaApiClient::new(Arc::new(auth), self.http.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::TokenRecord;
    use chrono::Duration;

    const ALL_STATES: [RevocationState; 4] = [
        RevocationState::Authenticated,
        RevocationState::RevokingRemote,
        RevocationState::LocalCleanup,
        RevocationState::LoggedOut,
    ];

    fn flow(sessions: &UserAuthManager, host: &str) -> RevocationFlow {
        let http = Arc::new(GraphHttpClient::new(4, 2, 5).unwrap());
        RevocationFlow::new(sessions.clone(), http, host, "v24.0")
    }

    #[test]
    fn test_state_order() {
        assert_eq!(
            RevocationState::Authenticated.next(),
            Some(RevocationState::RevokingRemote)
        );
        assert_eq!(RevocationState::LoggedOut.next(), None);
        assert_eq!(RevocationState::LocalCleanup.to_string(), "local_cleanup");
    }

    #[tokio::test]
    async fn test_remote_failure_still_cleans_up() {
        let sessions = UserAuthManager::in_memory(Duration::hours(1));
        let session = sessions.create_session("user-1").await.unwrap();
        sessions
            .store_user_tokens(TokenRecord {
                user_id: "user-1".to_string(),
                access_token: "EAAB-user".to_string(),
                refresh_token: None,
                expires_at: None,
            })
            .await
            .unwrap();

        let user = User {
            user_id: "user-1".to_string(),
            session_id: session.session_id.clone(),
        };
        let outcome = flow(&sessions, "http://127.0.0.1:1").run(&user).await.unwrap();

        assert!(matches!(outcome.remote, RemoteRevocation::Failed(_)));
        assert_eq!(outcome.states, ALL_STATES.to_vec());
        assert_eq!(outcome.final_state(), Some(RevocationState::LoggedOut));
        assert!(sessions.get_user_tokens("user-1").await.unwrap().is_none());
        assert!(sessions
            .authenticate_user(Some(&session.session_id))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_tokens_skip_remote() {
        let sessions = UserAuthManager::in_memory(Duration::hours(1));
        let session = sessions.create_session("user-2").await.unwrap();
        let user = User {
            user_id: "user-2".to_string(),
            session_id: session.session_id,
        };

        let outcome = flow(&sessions, "http://127.0.0.1:1").run(&user).await.unwrap();
        assert_eq!(outcome.remote, RemoteRevocation::Skipped);
        assert_eq!(outcome.states, ALL_STATES.to_vec());
    }
}
