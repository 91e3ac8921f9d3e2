//! The realtime media session capability.
//!
//! Everything hard about a call (signaling, SFU negotiation, transport)
//! lives behind these traits. Platform connectors implement them over a
//! native media stack; [`crate::loopback`] implements them in-process.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::{AudioRouteConfig, CaptureOptions, SessionOptions};
use crate::errors::CallError;
use crate::events::TrackKind;

/// Handle to a surface a remote track is rendered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSurface {
    pub id: String,
}

/// A locally captured audio or video stream available for publishing.
///
/// Mute and unmute are fire-and-forget; the only ordering guarantee is
/// last call wins per track.
#[async_trait]
pub trait LocalMediaTrack: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> TrackKind;
    fn is_muted(&self) -> bool;
    async fn mute(&self);
    async fn unmute(&self);
}

/// A stream published by another participant.
pub trait RemoteMediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;
    fn attach(&self) -> RenderSurface;
    fn detach(&self);
}

/// Events delivered by an established session.
pub enum MediaEvent {
    TrackSubscribed {
        participant: String,
        track: Arc<dyn RemoteMediaTrack>,
    },
    TrackUnsubscribed {
        participant: String,
        kind: TrackKind,
    },
    /// The session ended, whether by an explicit close or a network failure.
    Disconnected,
}

impl fmt::Debug for MediaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackSubscribed { participant, track } => f
                .debug_struct("TrackSubscribed")
                .field("participant", participant)
                .field("kind", &track.kind())
                .finish(),
            Self::TrackUnsubscribed { participant, kind } => f
                .debug_struct("TrackUnsubscribed")
                .field("participant", participant)
                .field("kind", kind)
                .finish(),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// A live connection to the remote media service.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Publish a local track into the session.
    async fn publish(&self, track: Arc<dyn LocalMediaTrack>) -> Result<(), CallError>;
    /// Terminate the connection. The event channel delivers a final
    /// [`MediaEvent::Disconnected`] and closes.
    async fn close(&self) -> Result<(), CallError>;
}

/// Entry point into the external media service.
#[async_trait]
pub trait MediaConnector: Send + Sync {
    /// Apply platform audio routing. Called before [`Self::connect`] when
    /// the session options carry a route; connectors without platform
    /// audio accept and ignore it.
    async fn configure_audio_route(&self, _route: &AudioRouteConfig) -> Result<(), CallError> {
        Ok(())
    }

    /// Request capture devices and produce local tracks.
    async fn acquire_local_tracks(
        &self,
        options: &CaptureOptions,
    ) -> Result<Vec<Arc<dyn LocalMediaTrack>>, CallError>;

    /// Establish a session against the given endpoint and credential.
    async fn connect(
        &self,
        url: &str,
        credential: &str,
        options: &SessionOptions,
    ) -> Result<(Arc<dyn SessionHandle>, mpsc::UnboundedReceiver<MediaEvent>), CallError>;
}
