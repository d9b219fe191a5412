//! Client-side orchestration for live conversational-avatar calls
//!
//! Opens a real-time call against a remote talking-avatar service and keeps a
//! local state machine synchronized with its asynchronous, partially-ordered
//! event stream: track subscriptions, data-channel messages, and speaker
//! activity. Streaming transcript fragments are assembled into stable
//! captions, and finalized user speech is forwarded to the response-generation
//! backend exactly once per utterance, with self-echoes rejected.
//!
//! The backend services (token issuance, real-time transport, capture
//! devices, media sinks) are consumed through traits so the embedding UI
//! supplies the platform pieces.

pub mod captions;
pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod forwarder;
pub mod media;
pub mod session;
pub mod transport;

pub use captions::{Caption, CaptionAssembler, CaptionRole, CaptionTimings};
pub use client::AvatarClient;
pub use config::Config;
pub use control::{AvatarQuality, SessionControl, TokenGrant, TokenRequest, TransportTicket};
pub use error::CallError;
pub use forwarder::{ForwardDecision, ResponseForwarder, CONTEXT_MARKER};
pub use media::{
    CaptureHandle, DeviceHandles, DeviceKind, MediaDevices, MediaError, TrackRegistry, TrackSink,
};
pub use session::{AvatarSession, CallState, SessionConfig, SessionSnapshot};
pub use transport::{
    parse_channel_event, ChannelEvent, ClientCommand, PublishOptions, RemoteTrack, Speaker,
    TrackKind, TransportConnector, TransportEvent, TransportHandle, DATA_TOPIC,
};
