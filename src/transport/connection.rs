use crate::error::CallError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Kind of a remote media stream unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A remote media track published by a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    /// Stable identity for the underlying stream
    pub id: String,
    pub kind: TrackKind,
    pub participant: String,
}

/// One entry of an active-speakers update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub identity: String,
    /// Whether this is the local participant (the user)
    pub is_local: bool,
}

/// Delivery options for `publish_data`
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub reliable: bool,
    pub topic: Option<String>,
}

/// Events emitted by the transport while connected
///
/// Delivery is asynchronous and unordered; track events may arrive duplicated.
/// Handlers must stay idempotent over their identity keys.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Disconnected { reason: Option<String> },
    TrackSubscribed { track: RemoteTrack },
    TrackUnsubscribed { track_id: String },
    ActiveSpeakersChanged { speakers: Vec<Speaker> },
    DataReceived { payload: Vec<u8> },
}

/// Opens transport connections
#[async_trait::async_trait]
pub trait TransportConnector: Send + Sync {
    /// Connect to the transport using the ticket from `start_session`
    ///
    /// Returns the live connection handle plus the receiver for its event
    /// stream. The receiver closes when the connection ends.
    async fn connect(
        &self,
        url: &str,
        client_token: &str,
    ) -> Result<(Box<dyn TransportHandle>, mpsc::Receiver<TransportEvent>), CallError>;
}

/// A live transport connection
///
/// Dropping the handle must close the underlying connection; teardown relies
/// on this when a connect attempt is cancelled mid-flight.
#[async_trait::async_trait]
pub trait TransportHandle: Send + Sync {
    /// Send bytes over the data channel
    async fn publish_data(&self, payload: &[u8], options: PublishOptions)
        -> Result<(), CallError>;

    /// Enable or disable publishing the local microphone
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), CallError>;

    /// Unlock audio output (must run inside the originating user-gesture
    /// chain to satisfy autoplay policies)
    async fn start_audio_playback(&self) -> Result<(), CallError>;

    /// Close the connection
    async fn disconnect(&self) -> Result<(), CallError>;

    /// Connector name for logging
    fn name(&self) -> &str;
}
