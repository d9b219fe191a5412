//! Local device ownership and remote track management
//!
//! - `devices`: acquire/release wrappers around the exclusive microphone and
//!   camera capture streams. No other module touches the device APIs.
//! - `tracks`: identity-keyed registry of attached remote tracks; the sole
//!   owner of the remote audio/video sink elements.

mod devices;
mod tracks;

pub use devices::{CaptureHandle, DeviceHandles, DeviceKind, MediaDevices, MediaError};
pub use tracks::{TrackRegistry, TrackSink};
