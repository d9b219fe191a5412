// Shared test doubles for the collaborator seams: token service, transport,
// capture devices, and track sinks. All of them record what the session did
// so tests can assert on resource state after teardown.

#![allow(dead_code)]

use avatar_session::{
    CallError, CaptureHandle, ChannelEvent, ClientCommand, DeviceKind, MediaDevices, MediaError,
    PublishOptions, RemoteTrack, SessionControl, TokenGrant, TokenRequest, TrackKind, TrackSink,
    TransportConnector, TransportEvent, TransportHandle, TransportTicket,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Opt-in log output while debugging a failing test
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Token/session control service
// ============================================================================

#[derive(Default)]
pub struct MockControl {
    pub fail_token: AtomicBool,
    pub fail_start: AtomicBool,
    /// Artificial latency inside create_token, for cancel-mid-connect tests
    pub token_delay: Mutex<Option<Duration>>,
    /// Artificial latency inside start_session
    pub start_delay: Mutex<Option<Duration>>,

    pub tokens_issued: AtomicUsize,
    pub sessions_started: AtomicUsize,
    pub keepalives: AtomicUsize,
    pub stop_alls: AtomicUsize,
    pub stopped_sessions: Mutex<Vec<String>>,
}

impl MockControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stops(&self) -> Vec<String> {
        self.stopped_sessions.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SessionControl for MockControl {
    async fn create_token(&self, _request: &TokenRequest) -> Result<TokenGrant, CallError> {
        let delay = *self.token_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_token.load(Ordering::SeqCst) {
            return Err(CallError::Token("backend rejected configuration".into()));
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            session_id: format!("session-{}", n),
            session_token: format!("token-{}", n),
        })
    }

    async fn start_session(&self, grant: &TokenGrant) -> Result<TransportTicket, CallError> {
        let delay = *self.start_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CallError::Start("backend refused to start".into()));
        }
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
        Ok(TransportTicket {
            url: format!("wss://transport.test/{}", grant.session_id),
            client_token: format!("client-{}", grant.session_token),
        })
    }

    async fn stop_session(&self, session_id: &str, _session_token: &str) -> Result<(), CallError> {
        self.stopped_sessions
            .lock()
            .unwrap()
            .push(session_id.to_string());
        Ok(())
    }

    async fn keep_alive(&self, _session_id: &str, _session_token: &str) -> Result<(), CallError> {
        self.keepalives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_all(&self) -> Result<(), CallError> {
        self.stop_alls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Real-time transport
// ============================================================================

/// Shared observation point for everything the session did to the transport
#[derive(Default)]
pub struct TransportProbe {
    pub fail_connect: AtomicBool,
    pub connects: AtomicUsize,
    pub playback_started: AtomicBool,
    pub disconnected: AtomicBool,
    pub mic_calls: Mutex<Vec<bool>>,
    pub published: Mutex<Vec<Vec<u8>>>,
    events_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl TransportProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_connected(&self) -> bool {
        self.events_tx.lock().unwrap().is_some()
    }

    /// Inject a transport event into the session's event loop
    pub async fn send(&self, event: TransportEvent) {
        let tx = self.events_tx.lock().unwrap().clone();
        let tx = tx.expect("transport not connected");
        tx.send(event).await.expect("event loop gone");
    }

    /// Inject a data-channel event as its JSON wire payload
    pub async fn send_data(&self, event: &ChannelEvent) {
        let payload = serde_json::to_vec(event).unwrap();
        self.send(TransportEvent::DataReceived { payload }).await;
    }

    /// Commands the session published, decoded from the wire format
    pub fn commands(&self) -> Vec<ClientCommand> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_slice(p).expect("published payload not a command"))
            .collect()
    }

    /// Texts of all published speak_response commands
    pub fn spoken_responses(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                ClientCommand::SpeakResponse { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

pub struct MockConnector {
    pub probe: Arc<TransportProbe>,
}

impl MockConnector {
    pub fn new(probe: Arc<TransportProbe>) -> Arc<Self> {
        Arc::new(Self { probe })
    }
}

#[async_trait::async_trait]
impl TransportConnector for MockConnector {
    async fn connect(
        &self,
        _url: &str,
        _client_token: &str,
    ) -> Result<(Box<dyn TransportHandle>, mpsc::Receiver<TransportEvent>), CallError> {
        if self.probe.fail_connect.load(Ordering::SeqCst) {
            return Err(CallError::Transport("connect refused".into()));
        }
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        self.probe.disconnected.store(false, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(64);
        *self.probe.events_tx.lock().unwrap() = Some(tx);

        let handle = MockTransport {
            probe: Arc::clone(&self.probe),
        };
        Ok((Box::new(handle), rx))
    }
}

struct MockTransport {
    probe: Arc<TransportProbe>,
}

#[async_trait::async_trait]
impl TransportHandle for MockTransport {
    async fn publish_data(
        &self,
        payload: &[u8],
        _options: PublishOptions,
    ) -> Result<(), CallError> {
        self.probe.published.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), CallError> {
        self.probe.mic_calls.lock().unwrap().push(enabled);
        Ok(())
    }

    async fn start_audio_playback(&self) -> Result<(), CallError> {
        self.probe.playback_started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CallError> {
        self.close();
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-transport"
    }
}

impl MockTransport {
    fn close(&self) {
        self.probe.disconnected.store(true, Ordering::SeqCst);
        self.probe.events_tx.lock().unwrap().take();
    }
}

impl Drop for MockTransport {
    // Dropping the handle closes the connection, per the trait contract
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Capture devices
// ============================================================================

#[derive(Default)]
pub struct MockDevices {
    pub deny_microphone: AtomicBool,
    pub deny_camera: AtomicBool,
    pub acquires: AtomicUsize,
    /// Handles currently alive; zero after teardown means nothing leaked
    pub open_handles: Arc<AtomicUsize>,
}

impl MockDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

struct MockCapture {
    kind: DeviceKind,
    open_handles: Arc<AtomicUsize>,
}

impl CaptureHandle for MockCapture {
    fn device(&self) -> DeviceKind {
        self.kind
    }
}

impl Drop for MockCapture {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MediaDevices for MockDevices {
    async fn acquire(&self, device: DeviceKind) -> Result<Box<dyn CaptureHandle>, MediaError> {
        let denied = match device {
            DeviceKind::Microphone => self.deny_microphone.load(Ordering::SeqCst),
            DeviceKind::Camera => self.deny_camera.load(Ordering::SeqCst),
        };
        if denied {
            return Err(MediaError::PermissionDenied { device });
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCapture {
            kind: device,
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}

// ============================================================================
// Track sink
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    /// Every render call, in order
    pub rendered: Mutex<Vec<String>>,
    /// Track ids currently attached to a sink
    pub active: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn render_count(&self, track_id: &str) -> usize {
        self.rendered
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == track_id)
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

impl TrackSink for RecordingSink {
    fn render(&self, track: &RemoteTrack) {
        self.rendered.lock().unwrap().push(track.id.clone());
        self.active.lock().unwrap().insert(track.id.clone());
    }

    fn release(&self, track_id: &str, _kind: TrackKind) {
        self.active.lock().unwrap().remove(track_id);
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn audio_track(id: &str) -> RemoteTrack {
    RemoteTrack {
        id: id.to_string(),
        kind: TrackKind::Audio,
        participant: "avatar".to_string(),
    }
}

pub fn video_track(id: &str) -> RemoteTrack {
    RemoteTrack {
        id: id.to_string(),
        kind: TrackKind::Video,
        participant: "avatar".to_string(),
    }
}
