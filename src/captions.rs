//! Transcript assembly for the displayed caption line
//!
//! Two event families drive the assembler: streaming chunk events (appended)
//! and final events (authoritative, replace wholesale). Expiry and dedup are
//! deadline-based and checked on read, so no timer can outlive the session.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Who the displayed caption belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionRole {
    User,
    Avatar,
}

/// The caption currently shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub role: CaptionRole,
    pub text: String,
}

/// Expiry and dedup windows for caption display
#[derive(Debug, Clone)]
pub struct CaptionTimings {
    /// How long a finalized caption stays visible without refresh
    pub final_ttl: Duration,

    /// How long an actively-streaming caption stays visible; slightly longer
    /// than `final_ttl` since more chunks are usually on the way
    pub chunk_ttl: Duration,

    /// Trailing window in which an identical final is suppressed
    pub dedup_window: Duration,
}

impl Default for CaptionTimings {
    fn default() -> Self {
        Self {
            final_ttl: Duration::from_secs(9),
            chunk_ttl: Duration::from_secs(12),
            dedup_window: Duration::from_secs(30),
        }
    }
}

struct Buffer {
    role: CaptionRole,
    text: String,
    expires_at: Instant,
}

/// Accumulates streaming transcript fragments into a stable caption
///
/// Only one buffer is active at a time: a chunk for a different role than the
/// current buffer discards the buffer and starts fresh, never merges.
pub struct CaptionAssembler {
    timings: CaptionTimings,
    buffer: Option<Buffer>,
    /// Recently displayed finals, for duplicate-delivery suppression
    recent_finals: VecDeque<(CaptionRole, String, Instant)>,
}

impl CaptionAssembler {
    pub fn new(timings: CaptionTimings) -> Self {
        Self {
            timings,
            buffer: None,
            recent_finals: VecDeque::new(),
        }
    }

    /// Handle a partial, streaming transcript fragment
    pub fn on_chunk(&mut self, role: CaptionRole, text: &str, now: Instant) {
        self.drop_if_expired(now);

        match &mut self.buffer {
            Some(buffer) if buffer.role == role => {
                buffer.text.push_str(text);
                buffer.expires_at = now + self.timings.chunk_ttl;
            }
            other => {
                if other.is_some() {
                    debug!("Role switch mid-caption, discarding partial buffer");
                }
                *other = Some(Buffer {
                    role,
                    text: text.to_string(),
                    expires_at: now + self.timings.chunk_ttl,
                });
            }
        }
    }

    /// Handle an authoritative transcript; replaces any accumulated chunks
    pub fn on_final(&mut self, role: CaptionRole, text: &str, now: Instant) {
        self.prune_finals(now);

        let duplicate = self
            .recent_finals
            .iter()
            .any(|(r, t, _)| *r == role && t == text);
        if duplicate {
            debug!("Duplicate final transcript within dedup window, suppressing");
            return;
        }

        self.buffer = Some(Buffer {
            role,
            text: text.to_string(),
            expires_at: now + self.timings.final_ttl,
        });
        self.recent_finals.push_back((role, text.to_string(), now));
    }

    /// The caption to display right now, if any
    pub fn current(&self, now: Instant) -> Option<Caption> {
        self.buffer
            .as_ref()
            .filter(|b| now < b.expires_at)
            .map(|b| Caption {
                role: b.role,
                text: b.text.clone(),
            })
    }

    /// Reset all assembler state (session teardown)
    pub fn clear(&mut self) {
        self.buffer = None;
        self.recent_finals.clear();
    }

    fn drop_if_expired(&mut self, now: Instant) {
        if let Some(buffer) = &self.buffer {
            if now >= buffer.expires_at {
                self.buffer = None;
            }
        }
    }

    fn prune_finals(&mut self, now: Instant) {
        let window = self.timings.dedup_window;
        while let Some((_, _, seen_at)) = self.recent_finals.front() {
            if now.duration_since(*seen_at) >= window {
                self.recent_finals.pop_front();
            } else {
                break;
            }
        }
    }
}
