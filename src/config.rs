use crate::control::AvatarQuality;
use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Deserialize)]
pub struct AvatarConfig {
    pub avatar_id: Option<String>,
    pub voice_id: Option<String>,
    pub language: String,
    pub quality: AvatarQuality,
    pub persona_context: String,
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub keepalive_secs: u64,
    pub settle_ms: u64,
    pub thinking_timeout_secs: u64,
    pub forward_quarantine_secs: u64,
    pub caption_final_ttl_secs: u64,
    pub caption_chunk_ttl_secs: u64,
    pub caption_dedup_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: 120,
            settle_ms: 1500,
            thinking_timeout_secs: 15,
            forward_quarantine_secs: 10,
            caption_final_ttl_secs: 9,
            caption_chunk_ttl_secs: 12,
            caption_dedup_secs: 30,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session defaults derived from the loaded file
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            avatar_id: self.avatar.avatar_id.clone(),
            voice_id: self.avatar.voice_id.clone(),
            language: self.avatar.language.clone(),
            quality: self.avatar.quality,
            persona_context: self.avatar.persona_context.clone(),
            greeting: self.avatar.greeting.clone(),
            keepalive_interval: Duration::from_secs(self.timing.keepalive_secs),
            settle_delay: Duration::from_millis(self.timing.settle_ms),
            thinking_timeout: Duration::from_secs(self.timing.thinking_timeout_secs),
            forward_quarantine: Duration::from_secs(self.timing.forward_quarantine_secs),
            caption_final_ttl: Duration::from_secs(self.timing.caption_final_ttl_secs),
            caption_chunk_ttl: Duration::from_secs(self.timing.caption_chunk_ttl_secs),
            caption_dedup_window: Duration::from_secs(self.timing.caption_dedup_secs),
            ..SessionConfig::default()
        }
    }
}
