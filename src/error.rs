use thiserror::Error;

/// Fatal errors for a connection attempt.
///
/// Any of these moves the session state machine to `Error`; the only valid
/// follow-up action is a retry, which re-runs the full connect sequence.
#[derive(Debug, Error)]
pub enum CallError {
    /// The token service rejected the requested avatar/voice/quality/language.
    #[error("token request failed: {0}")]
    Token(String),

    /// The session could not be started with the issued token.
    #[error("session start failed: {0}")]
    Start(String),

    /// Connecting or talking to the real-time transport failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl CallError {
    /// Single human-readable message surfaced to the UI during the `Error` state.
    pub fn user_message(&self) -> String {
        match self {
            CallError::Token(_) => {
                "Could not authorize the avatar session. Please try again.".to_string()
            }
            CallError::Start(_) => {
                "The avatar session could not be started. Please try again.".to_string()
            }
            CallError::Transport(_) => {
                "Lost the connection to the avatar service. Please try again.".to_string()
            }
        }
    }
}
