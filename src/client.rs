//! Outward-facing control surface consumed by the UI layer

use crate::control::SessionControl;
use crate::media::{MediaDevices, TrackSink};
use crate::session::{AvatarSession, SessionConfig, SessionSnapshot};
use crate::transport::TransportConnector;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Entry point for the embedding UI
///
/// Holds at most one live session; starting a new call first tears down the
/// previous one, so no cross-call state can leak between sequential sessions.
pub struct AvatarClient {
    control: Arc<dyn SessionControl>,
    connector: Arc<dyn TransportConnector>,
    devices: Arc<dyn MediaDevices>,
    sink: Arc<dyn TrackSink>,
    defaults: SessionConfig,
    session: RwLock<Option<AvatarSession>>,
}

impl AvatarClient {
    pub fn new(
        control: Arc<dyn SessionControl>,
        connector: Arc<dyn TransportConnector>,
        devices: Arc<dyn MediaDevices>,
        sink: Arc<dyn TrackSink>,
        defaults: SessionConfig,
    ) -> Self {
        Self {
            control,
            connector,
            devices,
            sink,
            defaults,
            session: RwLock::new(None),
        }
    }

    /// Start a call with the client defaults
    ///
    /// Any previous session is fully torn down first. The connect sequence
    /// runs in the background; callers observe progress via `snapshot()`.
    /// Retrying from `Error` is this same call.
    pub async fn start_call(&self) -> AvatarSession {
        let mut config = self.defaults.clone();
        config.client_id = format!("call-{}", uuid::Uuid::new_v4());
        self.start_call_with(config).await
    }

    /// Start a call with explicit per-call configuration
    pub async fn start_call_with(&self, config: SessionConfig) -> AvatarSession {
        let previous = self.session.write().await.take();
        if let Some(previous) = previous {
            info!("Tearing down previous session before starting a new call");
            previous.end().await;
        }

        let session = AvatarSession::new(
            config,
            Arc::clone(&self.control),
            Arc::clone(&self.connector),
            Arc::clone(&self.devices),
            Arc::clone(&self.sink),
        );
        session.start().await;

        *self.session.write().await = Some(session.clone());
        session
    }

    /// End the current call, if any; safe to call at any time
    pub async fn end_call(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            session.end().await;
        }
    }

    /// Toggle the microphone; a no-op unless connected
    pub async fn toggle_microphone(&self) -> bool {
        match self.current_session().await {
            Some(session) => session.toggle_microphone().await,
            None => false,
        }
    }

    /// Toggle the camera; a no-op unless connected
    pub async fn toggle_camera(&self) -> bool {
        match self.current_session().await {
            Some(session) => session.toggle_camera().await,
            None => false,
        }
    }

    /// Read-only observables for display
    pub async fn snapshot(&self) -> SessionSnapshot {
        match self.current_session().await {
            Some(session) => session.snapshot().await,
            None => SessionSnapshot::idle(),
        }
    }

    async fn current_session(&self) -> Option<AvatarSession> {
        self.session.read().await.clone()
    }
}
