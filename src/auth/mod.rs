// Authentication module
// Environment-scoped credential resolution, per-user sessions and logout

mod manager;
mod revoke;
mod session;
mod types;

pub use manager::AuthManager;
pub use revoke::{RemoteRevocation, RevocationFlow, RevocationOutcome, RevocationState};
pub use session::{
    extract_session_id, MemorySessionBackend, SessionBackend, UserAuthManager, SESSION_COOKIE,
};
pub use types::{
    resolve_api_version, token_preview, AuthConfig, Credential, TokenInfo, TokenRecord, User,
    UserSession, ACCESS_TOKEN_ENV, API_VERSION_ENV, DEFAULT_API_VERSION, DEFAULT_GRAPH_HOST,
    GRAPH_HOST_ENV, SUPPORTED_API_VERSIONS,
};
