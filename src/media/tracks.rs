use crate::transport::{RemoteTrack, TrackKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Renders remote tracks to the local output surfaces
///
/// Video tracks go to the video surface, audio tracks to the audio output.
/// Implemented by the embedding UI layer.
pub trait TrackSink: Send + Sync {
    fn render(&self, track: &RemoteTrack);
    fn release(&self, track_id: &str, kind: TrackKind);
}

/// Identity-keyed registry of attached remote tracks
///
/// Subscription events may arrive duplicated or out of order; attach is
/// idempotent over the track id, so a repeated `trackSubscribed` never
/// attaches a second sink for the same stream.
pub struct TrackRegistry {
    sink: Arc<dyn TrackSink>,
    attached: HashMap<String, TrackKind>,
}

impl TrackRegistry {
    pub fn new(sink: Arc<dyn TrackSink>) -> Self {
        Self {
            sink,
            attached: HashMap::new(),
        }
    }

    /// Attach a remote track; duplicate ids are a logged no-op
    ///
    /// Returns true when the track was newly attached.
    pub fn attach(&mut self, track: &RemoteTrack) -> bool {
        if self.attached.contains_key(&track.id) {
            debug!("Track {} already attached, ignoring duplicate", track.id);
            return false;
        }

        info!(
            "Attaching {:?} track {} from {}",
            track.kind, track.id, track.participant
        );
        self.sink.render(track);
        self.attached.insert(track.id.clone(), track.kind);
        true
    }

    /// Detach a track and release its sink; unknown ids are a no-op
    pub fn detach(&mut self, track_id: &str) {
        match self.attached.remove(track_id) {
            Some(kind) => {
                info!("Detaching {:?} track {}", kind, track_id);
                self.sink.release(track_id, kind);
            }
            None => {
                debug!("Detach for unknown track {}, ignoring", track_id);
            }
        }
    }

    /// Release every attached sink, regardless of which unsubscribe events
    /// ever arrived
    pub fn clear(&mut self) {
        for (id, kind) in self.attached.drain() {
            self.sink.release(&id, kind);
        }
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn is_attached(&self, track_id: &str) -> bool {
        self.attached.contains_key(track_id)
    }
}
