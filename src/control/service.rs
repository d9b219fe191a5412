use super::types::{TokenGrant, TokenRequest, TransportTicket};
use crate::error::CallError;

/// Token/session control service contract
///
/// `create_token` and `start_session` are fatal on failure (the connect
/// attempt moves to `Error`). `stop_session`, `keep_alive`, and `stop_all`
/// are best-effort: callers log failures and carry on.
#[async_trait::async_trait]
pub trait SessionControl: Send + Sync {
    /// Request a fresh session token for the given configuration
    async fn create_token(&self, request: &TokenRequest) -> Result<TokenGrant, CallError>;

    /// Start the session and obtain transport connection details
    async fn start_session(&self, grant: &TokenGrant) -> Result<TransportTicket, CallError>;

    /// Notify the backend that the session has stopped (best-effort)
    async fn stop_session(&self, session_id: &str, session_token: &str) -> Result<(), CallError>;

    /// Ping the backend to keep an idle session from expiring (best-effort)
    async fn keep_alive(&self, session_id: &str, session_token: &str) -> Result<(), CallError>;

    /// Stop any orphaned sessions left over from previous calls (best-effort)
    async fn stop_all(&self) -> Result<(), CallError>;
}
