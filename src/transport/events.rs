use serde::{Deserialize, Serialize};
use tracing::warn;

/// Data-channel topic used for avatar control traffic
pub const DATA_TOPIC: &str = "avatar-control";

/// Inbound data-channel events
///
/// The transport delivers loosely-typed JSON; it is parsed into this closed
/// set at the boundary. Unknown or malformed payloads are dropped by
/// `parse_channel_event` and never reach the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ChannelEvent {
    #[serde(rename = "avatar.speak_started")]
    AvatarSpeakStarted,

    #[serde(rename = "avatar.speak_ended")]
    AvatarSpeakEnded,

    #[serde(rename = "user.speak_started")]
    UserSpeakStarted,

    #[serde(rename = "user.speak_ended")]
    UserSpeakEnded,

    /// Partial, streaming avatar transcript text
    #[serde(rename = "avatar.transcription.chunk")]
    AvatarTranscriptionChunk { text: String },

    /// Partial, streaming user transcript text
    #[serde(rename = "user.transcription.chunk")]
    UserTranscriptionChunk { text: String },

    /// Authoritative avatar transcript (replaces accumulated chunks)
    #[serde(rename = "avatar.transcription")]
    AvatarTranscription { text: String },

    /// Finalized user utterance
    #[serde(rename = "user.transcription")]
    UserTranscription { text: String },

    /// Server-initiated session stop
    #[serde(rename = "session.stopped")]
    SessionStopped {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Outbound data-channel commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ClientCommand {
    /// Instruct the remote avatar to begin listening for user speech
    #[serde(rename = "avatar.start_listening")]
    StartListening { session_id: String },

    /// Request a spoken response for the constructed prompt text
    #[serde(rename = "avatar.speak_response")]
    SpeakResponse { session_id: String, text: String },
}

impl ClientCommand {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Parse a data-channel payload, dropping anything malformed or unknown
pub fn parse_channel_event(payload: &[u8]) -> Option<ChannelEvent> {
    match serde_json::from_slice::<ChannelEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping unparseable data-channel payload: {}", e);
            None
        }
    }
}
