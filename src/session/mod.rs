//! Avatar call session management
//!
//! This module provides the `AvatarSession` abstraction that manages:
//! - The connection lifecycle state machine (Idle/Connecting/Connected/Error)
//! - Token acquisition, transport connect, audio unlock, device acquisition
//! - The transport event loop (tracks, data-channel events, disconnects)
//! - Keep-alive pings and idempotent teardown

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::AvatarSession;
pub use stats::{CallState, SessionSnapshot};
