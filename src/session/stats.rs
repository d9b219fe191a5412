use crate::captions::Caption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call state as observed by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Connecting,
    Connected,
    Error { message: String },
}

impl CallState {
    /// Whether the given transition is legal for the session state machine
    ///
    /// Legal sequences are subsequences of Idle -> Connecting -> Connected ->
    /// Idle, with Connecting allowed to fail to Error or be cancelled back to
    /// Idle, and Error clearing to Idle on retry.
    pub fn can_transition_to(&self, next: &CallState) -> bool {
        matches!(
            (self, next),
            (CallState::Idle, CallState::Connecting)
                | (CallState::Connecting, CallState::Connected)
                | (CallState::Connecting, CallState::Error { .. })
                | (CallState::Connecting, CallState::Idle)
                | (CallState::Connected, CallState::Idle)
                | (CallState::Error { .. }, CallState::Idle)
        )
    }
}

/// Read-only snapshot of a session for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: CallState,

    /// Backend session id, once a token has been issued
    pub session_id: Option<String>,

    /// When the call connected
    pub started_at: Option<DateTime<Utc>>,

    pub call_duration_seconds: f64,

    /// The caption currently shown, if any
    pub caption: Option<Caption>,

    pub is_avatar_speaking: bool,
    pub is_user_speaking: bool,

    /// A response-generation request is in flight
    pub is_thinking: bool,

    /// Connected and ready to take user speech
    pub is_listening: bool,

    pub microphone_enabled: bool,
    pub camera_enabled: bool,
}

impl SessionSnapshot {
    /// Snapshot for "no session": everything idle and cleared
    pub fn idle() -> Self {
        Self {
            state: CallState::Idle,
            session_id: None,
            started_at: None,
            call_duration_seconds: 0.0,
            caption: None,
            is_avatar_speaking: false,
            is_user_speaking: false,
            is_thinking: false,
            is_listening: false,
            microphone_enabled: false,
            camera_enabled: false,
        }
    }
}
