use serde::{Deserialize, Serialize};

/// Requested rendering quality for the avatar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarQuality {
    Low,
    Medium,
    High,
}

/// Parameters for a new session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Avatar to present (backend default when omitted)
    pub avatar_id: Option<String>,

    /// Voice to speak with (backend default when omitted)
    pub voice_id: Option<String>,

    /// BCP-47 language tag (e.g. "en")
    pub language: String,

    pub quality: AvatarQuality,
}

/// Issued session credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub session_id: String,
    pub session_token: String,
}

/// Where and how to connect the real-time transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportTicket {
    pub url: String,
    pub client_token: String,
}
