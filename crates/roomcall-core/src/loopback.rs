//! In-process media connector.
//!
//! Stands in for a platform media stack so UI shells and tests can drive
//! the full session lifecycle without a server. Failure injection covers
//! the three error classes a real connector can produce; remote activity
//! is simulated by pushing events into the live session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{AudioRouteConfig, CaptureOptions, SessionOptions};
use crate::errors::CallError;
use crate::events::TrackKind;
use crate::session::{
    LocalMediaTrack, MediaConnector, MediaEvent, RemoteMediaTrack, RenderSurface, SessionHandle,
};

#[derive(Default)]
struct Shared {
    deny_devices: AtomicBool,
    refuse_connection: AtomicBool,
    reject_publish: AtomicBool,
    published: Mutex<Vec<TrackKind>>,
    audio_route: Mutex<Option<AudioRouteConfig>>,
    event_tx: Mutex<Option<mpsc::UnboundedSender<MediaEvent>>>,
}

/// A [`MediaConnector`] that never leaves the process.
#[derive(Clone, Default)]
pub struct LoopbackConnector {
    shared: Arc<Shared>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next device acquisition fail.
    pub fn deny_devices(&self) {
        self.shared.deny_devices.store(true, Ordering::SeqCst);
    }

    /// Make the next connect attempt fail.
    pub fn refuse_connection(&self) {
        self.shared.refuse_connection.store(true, Ordering::SeqCst);
    }

    /// Make every publish fail.
    pub fn reject_publish(&self) {
        self.shared.reject_publish.store(true, Ordering::SeqCst);
    }

    /// Kinds published into the current session, in publish order.
    pub fn published_kinds(&self) -> Vec<TrackKind> {
        self.shared.published.lock().unwrap().clone()
    }

    /// The audio route configured before the last connect, if any.
    pub fn audio_route(&self) -> Option<AudioRouteConfig> {
        self.shared.audio_route.lock().unwrap().clone()
    }

    /// Simulate a remote participant publishing a track. Returns false
    /// when no session is live.
    pub fn add_remote_track(&self, participant: &str, kind: TrackKind) -> bool {
        let track: Arc<dyn RemoteMediaTrack> = Arc::new(LoopbackRemoteTrack {
            kind,
            attached: AtomicBool::new(false),
        });
        self.send(MediaEvent::TrackSubscribed {
            participant: participant.to_string(),
            track,
        })
    }

    /// Simulate a remote participant dropping a track.
    pub fn remove_remote_track(&self, participant: &str, kind: TrackKind) -> bool {
        self.send(MediaEvent::TrackUnsubscribed {
            participant: participant.to_string(),
            kind,
        })
    }

    /// Simulate the service terminating the session (network failure,
    /// room closed). The event channel closes afterwards.
    pub fn terminate_session(&self) -> bool {
        let tx = self.shared.event_tx.lock().unwrap().take();
        match tx {
            Some(tx) => tx.send(MediaEvent::Disconnected).is_ok(),
            None => false,
        }
    }

    fn send(&self, event: MediaEvent) -> bool {
        let tx = self.shared.event_tx.lock().unwrap();
        match tx.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MediaConnector for LoopbackConnector {
    async fn configure_audio_route(&self, route: &AudioRouteConfig) -> Result<(), CallError> {
        *self.shared.audio_route.lock().unwrap() = Some(route.clone());
        Ok(())
    }

    async fn acquire_local_tracks(
        &self,
        options: &CaptureOptions,
    ) -> Result<Vec<Arc<dyn LocalMediaTrack>>, CallError> {
        if self.shared.deny_devices.load(Ordering::SeqCst) {
            return Err(CallError::Device("capture permission denied".into()));
        }
        let mut tracks: Vec<Arc<dyn LocalMediaTrack>> = Vec::new();
        if options.audio {
            tracks.push(Arc::new(LoopbackLocalTrack::new(TrackKind::Audio)));
        }
        if options.video {
            tracks.push(Arc::new(LoopbackLocalTrack::new(TrackKind::Video)));
        }
        Ok(tracks)
    }

    async fn connect(
        &self,
        url: &str,
        _credential: &str,
        _options: &SessionOptions,
    ) -> Result<(Arc<dyn SessionHandle>, mpsc::UnboundedReceiver<MediaEvent>), CallError> {
        if self.shared.refuse_connection.load(Ordering::SeqCst) {
            return Err(CallError::Connection(format!("{url} unreachable")));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.event_tx.lock().unwrap() = Some(tx);
        self.shared.published.lock().unwrap().clear();
        let handle: Arc<dyn SessionHandle> = Arc::new(LoopbackSession {
            shared: self.shared.clone(),
        });
        Ok((handle, rx))
    }
}

struct LoopbackSession {
    shared: Arc<Shared>,
}

#[async_trait]
impl SessionHandle for LoopbackSession {
    async fn publish(&self, track: Arc<dyn LocalMediaTrack>) -> Result<(), CallError> {
        if self.shared.reject_publish.load(Ordering::SeqCst) {
            return Err(CallError::Publish(format!(
                "{:?} track refused by service",
                track.kind()
            )));
        }
        self.shared.published.lock().unwrap().push(track.kind());
        Ok(())
    }

    async fn close(&self) -> Result<(), CallError> {
        let tx = self.shared.event_tx.lock().unwrap().take();
        if let Some(tx) = tx {
            let _ = tx.send(MediaEvent::Disconnected);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct LoopbackLocalTrack {
    kind: TrackKind,
    muted: AtomicBool,
}

impl LoopbackLocalTrack {
    fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            muted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LocalMediaTrack for LoopbackLocalTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    async fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    async fn unmute(&self) {
        self.muted.store(false, Ordering::SeqCst);
    }
}

struct LoopbackRemoteTrack {
    kind: TrackKind,
    attached: AtomicBool,
}

impl RemoteMediaTrack for LoopbackRemoteTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn attach(&self) -> RenderSurface {
        self.attached.store(true, Ordering::SeqCst);
        RenderSurface {
            id: format!("surface-{}", Uuid::new_v4()),
        }
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_respects_capture_options() {
        let connector = LoopbackConnector::new();
        let tracks = connector
            .acquire_local_tracks(&CaptureOptions {
                audio: true,
                video: false,
            })
            .await
            .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].kind(), TrackKind::Audio);
    }

    #[tokio::test]
    async fn denied_devices_yield_device_error() {
        let connector = LoopbackConnector::new();
        connector.deny_devices();
        let err = connector
            .acquire_local_tracks(&CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Device(_)));
    }

    #[tokio::test]
    async fn injection_without_session_reports_false() {
        let connector = LoopbackConnector::new();
        assert!(!connector.add_remote_track("alice", TrackKind::Video));
        assert!(!connector.terminate_session());
    }

    #[tokio::test]
    async fn close_delivers_final_disconnect() {
        let connector = LoopbackConnector::new();
        let (handle, mut rx) = connector
            .connect("wss://local", "tok", &SessionOptions::default())
            .await
            .unwrap();
        handle.close().await.unwrap();
        assert!(matches!(rx.recv().await, Some(MediaEvent::Disconnected)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn local_track_mute_roundtrip() {
        let track = LoopbackLocalTrack::new(TrackKind::Audio);
        assert!(!track.is_muted());
        track.mute().await;
        assert!(track.is_muted());
        track.unmute().await;
        assert!(!track.is_muted());
    }
}
