//! Real-time transport seam and data-channel wire events
//!
//! This module provides:
//! - The `TransportConnector`/`TransportHandle` traits the session uses to
//!   open and drive the media transport
//! - `TransportEvent`, the unordered event stream delivered while connected
//! - The closed tagged-variant model of the JSON data-channel payloads

mod connection;
mod events;

pub use connection::{
    PublishOptions, RemoteTrack, Speaker, TrackKind, TransportConnector, TransportEvent,
    TransportHandle,
};
pub use events::{parse_channel_event, ChannelEvent, ClientCommand, DATA_TOPIC};
