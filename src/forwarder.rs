//! Echo-safe forwarding of finalized user utterances
//!
//! Decides, per utterance, whether to send a response-generation command:
//! - utterances containing the injected context marker are rejected as echoes
//! - utterance text already in the quarantine set is dropped, giving
//!   at-most-once forwarding under duplicate delivery
//!
//! Quarantine entries expire by deadline, pruned on access; `clear()` resets
//! the set on session end.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Literal marker injected into every outbound prompt
///
/// A transport that loops an injected prompt back as a "user said" event is
/// caught by this marker and rejected before it can be re-forwarded.
pub const CONTEXT_MARKER: &str = "[[avatar-context]]";

/// Outcome of the forwarding decision for one finalized user utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardDecision {
    /// Send this constructed prompt to the response-generation backend
    Forward(String),

    /// The utterance contains the context marker: a self-echo, never forwarded
    RejectedEcho,

    /// Identical text is already quarantined (in flight or answered)
    Duplicate,
}

/// Builds response-generation prompts and enforces the forwarding guards
pub struct ResponseForwarder {
    /// Patient/persona preamble, fixed for the session's lifetime
    persona_context: String,
    quarantine_window: Duration,
    /// Utterance text -> when it was forwarded
    quarantine: HashMap<String, Instant>,
}

impl ResponseForwarder {
    pub fn new(persona_context: String, quarantine_window: Duration) -> Self {
        Self {
            persona_context,
            quarantine_window,
            quarantine: HashMap::new(),
        }
    }

    /// Decide whether a finalized user utterance should be forwarded
    pub fn decide(&mut self, utterance: &str, now: Instant) -> ForwardDecision {
        if utterance.contains(CONTEXT_MARKER) {
            debug!("Rejecting self-echo utterance");
            return ForwardDecision::RejectedEcho;
        }

        self.prune(now);
        if self.quarantine.contains_key(utterance) {
            debug!("Utterance already forwarded within quarantine window, dropping");
            return ForwardDecision::Duplicate;
        }

        self.quarantine.insert(utterance.to_string(), now);
        ForwardDecision::Forward(self.build_prompt(utterance))
    }

    /// The one-time initial context/greeting prompt
    ///
    /// Built through the same construction path as forwarded utterances but
    /// never recorded as a user utterance, so it does not seed the
    /// quarantine set.
    pub fn greeting_prompt(&self, greeting: &str) -> String {
        self.build_prompt(greeting)
    }

    /// Reset the quarantine set (session teardown)
    pub fn clear(&mut self) {
        self.quarantine.clear();
    }

    pub fn quarantined_count(&self) -> usize {
        self.quarantine.len()
    }

    fn build_prompt(&self, utterance: &str) -> String {
        format!(
            "{} {}\n{}",
            CONTEXT_MARKER, self.persona_context, utterance
        )
    }

    fn prune(&mut self, now: Instant) {
        let window = self.quarantine_window;
        self.quarantine
            .retain(|_, inserted_at| now.duration_since(*inserted_at) < window);
    }
}
