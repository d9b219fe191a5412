//! Token/session control service seam
//!
//! The backend that issues session tokens, starts/stops sessions, and accepts
//! keep-alive pings. Consumed as an opaque collaborator behind the
//! `SessionControl` trait so tests can inject a double.

mod service;
mod types;

pub use service::SessionControl;
pub use types::{AvatarQuality, TokenGrant, TokenRequest, TransportTicket};
