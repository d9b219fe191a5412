use super::config::SessionConfig;
use super::stats::{CallState, SessionSnapshot};
use crate::captions::{CaptionAssembler, CaptionRole};
use crate::control::{SessionControl, TokenGrant};
use crate::error::CallError;
use crate::forwarder::{ForwardDecision, ResponseForwarder};
use crate::media::{DeviceHandles, DeviceKind, MediaDevices, TrackRegistry, TrackSink};
use crate::transport::{
    parse_channel_event, ChannelEvent, ClientCommand, PublishOptions, TransportConnector,
    TransportEvent, TransportHandle, DATA_TOPIC,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// One avatar call from start to teardown
///
/// All mutable call state lives on this object, constructed per call and
/// discarded on teardown, so nothing leaks between sequential sessions. Every
/// background task re-checks the active flag before touching shared state,
/// which keeps late timers and stale completions harmless.
///
/// Cheap to clone; clones share the same underlying session.
#[derive(Clone)]
pub struct AvatarSession {
    inner: Arc<SessionInner>,
}

impl AvatarSession {
    pub fn new(
        config: SessionConfig,
        control: Arc<dyn SessionControl>,
        connector: Arc<dyn TransportConnector>,
        devices: Arc<dyn MediaDevices>,
        sink: Arc<dyn TrackSink>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner::new(config, control, connector, devices, sink)),
        }
    }

    /// Begin the connect sequence in the background
    ///
    /// Returns immediately; progress is observable through `snapshot()` and
    /// the sequence is cancellable at any point with `end()`.
    pub async fn start(&self) {
        if self.inner.is_active.swap(true, Ordering::SeqCst) {
            warn!("Session {} already started", self.inner.config.client_id);
            return;
        }

        info!("Starting avatar session {}", self.inner.config.client_id);
        self.inner.set_state(CallState::Connecting).await;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_connect());
        *self.inner.connect_task.lock().await = Some(handle);
    }

    /// End the call and release everything
    ///
    /// The single cancellation point: safe to call from any state, including
    /// mid-`Connecting` and after teardown has already run. All timers and
    /// tasks are cancelled, device handles released, and the transport
    /// disconnected before this returns.
    pub async fn end(&self) {
        self.inner.end().await;
    }

    pub async fn state(&self) -> CallState {
        self.inner.state.read().await.clone()
    }

    /// Read-only view of the session for display
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot().await
    }

    /// Toggle the microphone; a no-op unless connected
    pub async fn toggle_microphone(&self) -> bool {
        self.inner.toggle_microphone().await
    }

    /// Toggle the camera; a no-op unless connected
    pub async fn toggle_camera(&self) -> bool {
        self.inner.toggle_camera().await
    }
}

struct SessionInner {
    config: SessionConfig,

    /// Token/session control service
    control: Arc<dyn SessionControl>,

    /// Opens the real-time transport
    connector: Arc<dyn TransportConnector>,

    /// Local capture device seam
    devices: Arc<dyn MediaDevices>,

    state: RwLock<CallState>,

    /// Issued credentials, present from token acquisition until teardown
    grant: Mutex<Option<TokenGrant>>,

    /// Live transport connection, present while connected
    transport: Mutex<Option<Box<dyn TransportHandle>>>,

    tracks: Mutex<TrackRegistry>,
    captions: Mutex<CaptionAssembler>,
    forwarder: Mutex<ResponseForwarder>,
    device_handles: Mutex<DeviceHandles>,

    /// When the call connected
    started_at: Mutex<Option<DateTime<Utc>>>,

    /// When the in-flight response-generation request was issued; the
    /// "thinking" status clears on acknowledgment or after the safety cutoff
    thinking_since: Mutex<Option<Instant>>,

    is_active: AtomicBool,
    avatar_speaking: AtomicBool,
    user_speaking: AtomicBool,
    microphone_enabled: AtomicBool,
    camera_enabled: AtomicBool,

    connect_task: Mutex<Option<JoinHandle<()>>>,
    event_task: Mutex<Option<JoinHandle<()>>>,
    keepalive_task: Mutex<Option<JoinHandle<()>>>,
    camera_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    fn new(
        config: SessionConfig,
        control: Arc<dyn SessionControl>,
        connector: Arc<dyn TransportConnector>,
        devices: Arc<dyn MediaDevices>,
        sink: Arc<dyn TrackSink>,
    ) -> Self {
        let captions = CaptionAssembler::new(config.caption_timings());
        let forwarder =
            ResponseForwarder::new(config.persona_context.clone(), config.forward_quarantine);

        Self {
            control,
            connector,
            devices,
            state: RwLock::new(CallState::Idle),
            grant: Mutex::new(None),
            transport: Mutex::new(None),
            tracks: Mutex::new(TrackRegistry::new(sink)),
            captions: Mutex::new(captions),
            forwarder: Mutex::new(forwarder),
            device_handles: Mutex::new(DeviceHandles::new()),
            started_at: Mutex::new(None),
            thinking_since: Mutex::new(None),
            is_active: AtomicBool::new(false),
            avatar_speaking: AtomicBool::new(false),
            user_speaking: AtomicBool::new(false),
            microphone_enabled: AtomicBool::new(false),
            camera_enabled: AtomicBool::new(false),
            connect_task: Mutex::new(None),
            event_task: Mutex::new(None),
            keepalive_task: Mutex::new(None),
            camera_task: Mutex::new(None),
            config,
        }
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Connect sequence
    // ========================================================================

    async fn run_connect(self: Arc<Self>) {
        if let Err(err) = Arc::clone(&self).connect_sequence().await {
            error!("Connect failed: {}", err);
            self.is_active.store(false, Ordering::SeqCst);
            self.set_state(CallState::Error {
                message: err.user_message(),
            })
            .await;
            // Partially-acquired resources are released as if teardown ran
            self.release_resources().await;
        }
    }

    async fn connect_sequence(self: Arc<Self>) -> Result<(), CallError> {
        if !self.is_active() {
            return Ok(());
        }

        // Best-effort cleanup of sessions orphaned by earlier calls
        if let Err(e) = self.control.stop_all().await {
            warn!("Orphaned-session cleanup failed, continuing: {}", e);
        }

        let grant = self
            .control
            .create_token(&self.config.token_request())
            .await?;
        info!("Session {} authorized", grant.session_id);
        *self.grant.lock().await = Some(grant.clone());

        // end() may have run between awaits without catching this task in an
        // abort; bail out and hand back whatever was acquired so far.
        if !self.is_active() {
            self.release_resources().await;
            return Ok(());
        }

        let ticket = self.control.start_session(&grant).await?;
        if !self.is_active() {
            self.release_resources().await;
            return Ok(());
        }

        let (transport, events) = self
            .connector
            .connect(&ticket.url, &ticket.client_token)
            .await?;
        info!("Transport {} connected", transport.name());

        // Audio unlock must stay within the originating user-gesture chain
        if let Err(e) = transport.start_audio_playback().await {
            warn!("Audio unlock failed: {}", e);
        }
        *self.transport.lock().await = Some(transport);
        if !self.is_active() {
            self.release_resources().await;
            return Ok(());
        }

        // Microphone denial degrades the call, never aborts it
        let mic = self
            .device_handles
            .lock()
            .await
            .acquire_microphone(self.devices.as_ref())
            .await;
        match mic {
            Ok(()) => {
                self.set_transport_microphone(true).await;
                self.microphone_enabled.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                warn!("Continuing without microphone: {}", e);
            }
        }

        // Camera is optional and must not block the connect flow
        Arc::clone(&self).spawn_camera_acquisition().await;

        self.set_state(CallState::Connected).await;
        *self.started_at.lock().await = Some(Utc::now());

        Arc::clone(&self).spawn_event_loop(events).await;
        Arc::clone(&self).spawn_keepalive(grant.clone()).await;

        self.publish_command(&ClientCommand::StartListening {
            session_id: grant.session_id.clone(),
        })
        .await;

        // Let the transport settle before the one-time greeting
        tokio::time::sleep(self.config.settle_delay).await;
        if self.is_active() {
            let prompt = self
                .forwarder
                .lock()
                .await
                .greeting_prompt(&self.config.greeting);
            self.publish_command(&ClientCommand::SpeakResponse {
                session_id: grant.session_id,
                text: prompt,
            })
            .await;
        }

        Ok(())
    }

    async fn spawn_camera_acquisition(self: Arc<Self>) {
        let session = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            match session.devices.acquire(DeviceKind::Camera).await {
                Ok(camera) => {
                    if session.is_active() {
                        session.device_handles.lock().await.adopt_camera(camera);
                        session.camera_enabled.store(true, Ordering::SeqCst);
                        info!("Camera enabled");
                    }
                }
                Err(e) => {
                    info!("Proceeding without camera: {}", e);
                }
            }
        });
        *self.camera_task.lock().await = Some(handle);
    }

    async fn spawn_event_loop(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) {
        let session = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            info!("Transport event loop started");
            while let Some(event) = events.recv().await {
                if !session.is_active() {
                    break;
                }
                if !session.handle_event(event).await {
                    break;
                }
            }
            info!("Transport event loop stopped");

            // Anything but an explicit end() landing here is a transport- or
            // server-initiated stop; run the same teardown path.
            session.shutdown_from_transport().await;
        });
        *self.event_task.lock().await = Some(handle);
    }

    async fn spawn_keepalive(self: Arc<Self>, grant: TokenGrant) {
        let session = Arc::clone(&self);
        let period = self.config.keepalive_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; the session was just
            // started, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !session.is_active() {
                    break;
                }
                if let Err(e) = session
                    .control
                    .keep_alive(&grant.session_id, &grant.session_token)
                    .await
                {
                    warn!("Keep-alive ping failed: {}", e);
                }
            }
        });
        *self.keepalive_task.lock().await = Some(handle);
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Returns false when the session should tear down
    async fn handle_event(&self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Disconnected { reason } => {
                info!("Transport disconnected: {:?}", reason);
                return false;
            }
            TransportEvent::TrackSubscribed { track } => {
                self.tracks.lock().await.attach(&track);
            }
            TransportEvent::TrackUnsubscribed { track_id } => {
                self.tracks.lock().await.detach(&track_id);
            }
            TransportEvent::ActiveSpeakersChanged { speakers } => {
                let local_speaking = speakers.iter().any(|s| s.is_local);
                self.user_speaking.store(local_speaking, Ordering::SeqCst);
            }
            TransportEvent::DataReceived { payload } => {
                return self.handle_data(&payload).await;
            }
        }
        true
    }

    async fn handle_data(&self, payload: &[u8]) -> bool {
        let Some(event) = parse_channel_event(payload) else {
            return true;
        };

        let now = Instant::now();
        match event {
            ChannelEvent::AvatarSpeakStarted => {
                self.avatar_speaking.store(true, Ordering::SeqCst);
                // The response request has been acknowledged
                *self.thinking_since.lock().await = None;
            }
            ChannelEvent::AvatarSpeakEnded => {
                self.avatar_speaking.store(false, Ordering::SeqCst);
            }
            ChannelEvent::UserSpeakStarted => {
                self.user_speaking.store(true, Ordering::SeqCst);
            }
            ChannelEvent::UserSpeakEnded => {
                self.user_speaking.store(false, Ordering::SeqCst);
            }
            ChannelEvent::AvatarTranscriptionChunk { text } => {
                self.captions
                    .lock()
                    .await
                    .on_chunk(CaptionRole::Avatar, &text, now);
            }
            ChannelEvent::UserTranscriptionChunk { text } => {
                self.captions
                    .lock()
                    .await
                    .on_chunk(CaptionRole::User, &text, now);
            }
            ChannelEvent::AvatarTranscription { text } => {
                self.captions
                    .lock()
                    .await
                    .on_final(CaptionRole::Avatar, &text, now);
            }
            ChannelEvent::UserTranscription { text } => {
                self.captions
                    .lock()
                    .await
                    .on_final(CaptionRole::User, &text, now);
                self.forward_utterance(&text, now).await;
            }
            ChannelEvent::SessionStopped { reason } => {
                info!("Server stopped the session: {:?}", reason);
                return false;
            }
        }
        true
    }

    /// Forward a finalized user utterance through the echo/dedup guards
    async fn forward_utterance(&self, text: &str, now: Instant) {
        let decision = self.forwarder.lock().await.decide(text, now);
        match decision {
            ForwardDecision::Forward(prompt) => {
                let session_id = match self.grant.lock().await.as_ref() {
                    Some(grant) => grant.session_id.clone(),
                    None => return,
                };
                *self.thinking_since.lock().await = Some(now);
                self.publish_command(&ClientCommand::SpeakResponse {
                    session_id,
                    text: prompt,
                })
                .await;
            }
            ForwardDecision::RejectedEcho | ForwardDecision::Duplicate => {
                // Dropped by design; the forwarder already logged it
            }
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    async fn end(&self) {
        if self.is_active.swap(false, Ordering::SeqCst) {
            info!("Ending avatar session {}", self.config.client_id);
        } else {
            debug!("End requested for session that is not active");
        }

        // Cancel the connect sequence first so no new resources appear,
        // then the companion tasks.
        Self::cancel_task(&self.connect_task).await;
        Self::cancel_task(&self.camera_task).await;
        Self::cancel_task(&self.keepalive_task).await;
        Self::cancel_task(&self.event_task).await;

        self.release_resources().await;
        self.set_state(CallState::Idle).await;
    }

    /// Teardown path for transport- or server-initiated stops
    async fn shutdown_from_transport(&self) {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Session ended by transport, tearing down");

        Self::cancel_task(&self.connect_task).await;
        Self::cancel_task(&self.camera_task).await;
        Self::cancel_task(&self.keepalive_task).await;
        // The event task is the caller; it exits right after this returns.

        self.release_resources().await;
        self.set_state(CallState::Idle).await;
    }

    /// Release every owned resource; safe to run any number of times
    async fn release_resources(&self) {
        if let Some(transport) = self.transport.lock().await.take() {
            if let Err(e) = transport.disconnect().await {
                warn!("Transport disconnect failed: {}", e);
            }
        }

        self.tracks.lock().await.clear();
        self.captions.lock().await.clear();
        self.forwarder.lock().await.clear();
        self.device_handles.lock().await.release_all();

        *self.started_at.lock().await = None;
        *self.thinking_since.lock().await = None;
        self.avatar_speaking.store(false, Ordering::SeqCst);
        self.user_speaking.store(false, Ordering::SeqCst);
        self.microphone_enabled.store(false, Ordering::SeqCst);
        self.camera_enabled.store(false, Ordering::SeqCst);

        // Best-effort: local cleanup never depends on the backend answering
        if let Some(grant) = self.grant.lock().await.take() {
            if let Err(e) = self
                .control
                .stop_session(&grant.session_id, &grant.session_token)
                .await
            {
                warn!("Session stop notification failed: {}", e);
            }
        }
    }

    async fn cancel_task(slot: &Mutex<Option<JoinHandle<()>>>) {
        let handle = slot.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait until the task has actually stopped so teardown never
            // races a half-finished step.
            let _ = handle.await;
        }
    }

    // ========================================================================
    // Observables and toggles
    // ========================================================================

    async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await.clone();
        let now = Instant::now();

        let session_id = self
            .grant
            .lock()
            .await
            .as_ref()
            .map(|g| g.session_id.clone());
        let started_at = *self.started_at.lock().await;
        let call_duration_seconds = started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        let caption = self.captions.lock().await.current(now);

        // The safety cutoff clears "thinking" even when no speak-started
        // acknowledgment ever arrives, so the UI cannot hang.
        let is_thinking = (*self.thinking_since.lock().await)
            .map(|since| now.duration_since(since) < self.config.thinking_timeout)
            .unwrap_or(false);

        let is_avatar_speaking = self.avatar_speaking.load(Ordering::SeqCst);
        let connected = state == CallState::Connected;

        SessionSnapshot {
            state,
            session_id,
            started_at,
            call_duration_seconds,
            caption,
            is_avatar_speaking,
            is_user_speaking: self.user_speaking.load(Ordering::SeqCst),
            is_thinking,
            is_listening: connected && !is_avatar_speaking && !is_thinking,
            microphone_enabled: self.microphone_enabled.load(Ordering::SeqCst),
            camera_enabled: self.camera_enabled.load(Ordering::SeqCst),
        }
    }

    async fn toggle_microphone(&self) -> bool {
        if *self.state.read().await != CallState::Connected {
            debug!("Microphone toggle ignored outside Connected");
            return self.microphone_enabled.load(Ordering::SeqCst);
        }

        if self.microphone_enabled.load(Ordering::SeqCst) {
            self.set_transport_microphone(false).await;
            self.device_handles.lock().await.release_microphone();
            self.microphone_enabled.store(false, Ordering::SeqCst);
        } else {
            let acquired = self
                .device_handles
                .lock()
                .await
                .acquire_microphone(self.devices.as_ref())
                .await;
            match acquired {
                Ok(()) => {
                    self.set_transport_microphone(true).await;
                    self.microphone_enabled.store(true, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Microphone unavailable, staying muted: {}", e);
                }
            }
        }

        self.microphone_enabled.load(Ordering::SeqCst)
    }

    async fn toggle_camera(&self) -> bool {
        if *self.state.read().await != CallState::Connected {
            debug!("Camera toggle ignored outside Connected");
            return self.camera_enabled.load(Ordering::SeqCst);
        }

        if self.camera_enabled.load(Ordering::SeqCst) {
            self.device_handles.lock().await.release_camera();
            self.camera_enabled.store(false, Ordering::SeqCst);
        } else {
            let acquired = self
                .device_handles
                .lock()
                .await
                .acquire_camera(self.devices.as_ref())
                .await;
            match acquired {
                Ok(()) => self.camera_enabled.store(true, Ordering::SeqCst),
                Err(e) => {
                    // Camera is optional; the call stays audio-only
                    info!("Camera unavailable: {}", e);
                }
            }
        }

        self.camera_enabled.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn set_state(&self, next: CallState) {
        let mut state = self.state.write().await;
        if *state == next {
            return;
        }
        if state.can_transition_to(&next) {
            info!("Session state: {:?} -> {:?}", *state, next);
            *state = next;
        } else {
            warn!("Ignoring illegal state transition {:?} -> {:?}", *state, next);
        }
    }

    async fn set_transport_microphone(&self, enabled: bool) {
        let transport = self.transport.lock().await;
        if let Some(transport) = transport.as_ref() {
            if let Err(e) = transport.set_microphone_enabled(enabled).await {
                warn!("Failed to set microphone enabled={}: {}", enabled, e);
            }
        }
    }

    async fn publish_command(&self, command: &ClientCommand) {
        let payload = match command.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode data-channel command: {}", e);
                return;
            }
        };

        let transport = self.transport.lock().await;
        if let Some(transport) = transport.as_ref() {
            let options = PublishOptions {
                reliable: true,
                topic: Some(DATA_TOPIC.to_string()),
            };
            if let Err(e) = transport.publish_data(&payload, options).await {
                warn!("Failed to publish data-channel command: {}", e);
            }
        } else {
            debug!("Dropping command, transport is gone");
        }
    }
}
