use crate::captions::CaptionTimings;
use crate::control::{AvatarQuality, TokenRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one avatar call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Client-side correlation id for logs (not the backend session id)
    pub client_id: String,

    /// Avatar to present (backend default when omitted)
    pub avatar_id: Option<String>,

    /// Voice to speak with (backend default when omitted)
    pub voice_id: Option<String>,

    /// BCP-47 language tag
    pub language: String,

    pub quality: AvatarQuality,

    /// Patient/persona context prepended to every response-generation prompt
    pub persona_context: String,

    /// Text for the one-time initial greeting command
    pub greeting: String,

    /// Keep-alive ping interval against the token service
    pub keepalive_interval: Duration,

    /// Delay between connecting and sending the initial greeting
    pub settle_delay: Duration,

    /// Safety cutoff that force-clears the "thinking" status when no
    /// speak-started acknowledgment ever arrives
    pub thinking_timeout: Duration,

    /// Quarantine window for the forwarding dedup set
    pub forward_quarantine: Duration,

    /// Caption expiry and dedup windows
    pub caption_final_ttl: Duration,
    pub caption_chunk_ttl: Duration,
    pub caption_dedup_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let captions = CaptionTimings::default();
        Self {
            client_id: format!("call-{}", uuid::Uuid::new_v4()),
            avatar_id: None,
            voice_id: None,
            language: "en".to_string(),
            quality: AvatarQuality::Medium,
            persona_context: String::new(),
            greeting: "Hello! I'm here to walk you through your care plan.".to_string(),
            keepalive_interval: Duration::from_secs(120),
            settle_delay: Duration::from_millis(1500),
            thinking_timeout: Duration::from_secs(15),
            forward_quarantine: Duration::from_secs(10),
            caption_final_ttl: captions.final_ttl,
            caption_chunk_ttl: captions.chunk_ttl,
            caption_dedup_window: captions.dedup_window,
        }
    }
}

impl SessionConfig {
    pub fn token_request(&self) -> TokenRequest {
        TokenRequest {
            avatar_id: self.avatar_id.clone(),
            voice_id: self.voice_id.clone(),
            language: self.language.clone(),
            quality: self.quality,
        }
    }

    pub fn caption_timings(&self) -> CaptionTimings {
        CaptionTimings {
            final_ttl: self.caption_final_ttl,
            chunk_ttl: self.caption_chunk_ttl,
            dedup_window: self.caption_dedup_window,
        }
    }
}
