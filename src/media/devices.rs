use thiserror::Error;
use tracing::debug;

/// Local capture device kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Microphone,
    Camera,
}

impl DeviceKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Microphone => "microphone",
            DeviceKind::Camera => "camera",
        }
    }
}

/// Device acquisition failures, all recoverable
///
/// Camera denial leaves the call audio-only; microphone denial degrades the
/// call but never aborts it.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{} permission denied", device.label())]
    PermissionDenied { device: DeviceKind },

    #[error("{} unavailable: {reason}", device.label())]
    Unavailable { device: DeviceKind, reason: String },
}

/// An open capture stream; releasing the device is dropping the handle
pub trait CaptureHandle: Send + Sync {
    fn device(&self) -> DeviceKind;
}

/// Platform seam for opening capture devices
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, device: DeviceKind) -> Result<Box<dyn CaptureHandle>, MediaError>;
}

/// Session-owned microphone/camera handles
///
/// Acquire is idempotent: while a handle is held, acquiring again reuses it
/// rather than opening a second device stream. Release is always safe to
/// call, held or not.
#[derive(Default)]
pub struct DeviceHandles {
    microphone: Option<Box<dyn CaptureHandle>>,
    camera: Option<Box<dyn CaptureHandle>>,
}

impl DeviceHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire_microphone(
        &mut self,
        devices: &dyn MediaDevices,
    ) -> Result<(), MediaError> {
        if self.microphone.is_some() {
            debug!("Microphone already acquired, reusing handle");
            return Ok(());
        }
        let handle = devices.acquire(DeviceKind::Microphone).await?;
        self.microphone = Some(handle);
        Ok(())
    }

    pub async fn acquire_camera(&mut self, devices: &dyn MediaDevices) -> Result<(), MediaError> {
        if self.camera.is_some() {
            debug!("Camera already acquired, reusing handle");
            return Ok(());
        }
        let handle = devices.acquire(DeviceKind::Camera).await?;
        self.camera = Some(handle);
        Ok(())
    }

    /// Store an already-acquired camera handle (used by the deferred
    /// camera-acquisition task)
    pub fn adopt_camera(&mut self, handle: Box<dyn CaptureHandle>) {
        if self.camera.is_none() {
            self.camera = Some(handle);
        }
    }

    pub fn release_microphone(&mut self) {
        if self.microphone.take().is_some() {
            debug!("Released microphone");
        }
    }

    pub fn release_camera(&mut self) {
        if self.camera.take().is_some() {
            debug!("Released camera");
        }
    }

    pub fn release_all(&mut self) {
        self.release_microphone();
        self.release_camera();
    }

    pub fn has_microphone(&self) -> bool {
        self.microphone.is_some()
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }
}
