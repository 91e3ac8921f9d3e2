use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, mpsc};

use crate::config::{CallConfig, SessionOptions};
use crate::errors::CallError;
use crate::events::{
    CallEvent, CallEventListener, ConnectionState, EventEmitter, RemoteTrackInfo, TrackKind,
};
use crate::registry::{RemoteTrackRegistry, SurfaceBinding};
use crate::session::{LocalMediaTrack, MediaConnector, MediaEvent, SessionHandle};

/// Manages the lifecycle of one call session.
///
/// Owns at most one session handle at a time. State machine:
/// disconnected → connecting → connected → disconnected, with connecting
/// collapsing back to disconnected on any failure. There is no retry
/// policy; callers re-invoke [`SessionController::connect`].
pub struct SessionController {
    connector: Arc<dyn MediaConnector>,
    config: CallConfig,
    options: SessionOptions,
    emitter: EventEmitter,
    state: Arc<Mutex<ConnectionState>>,
    handle: Arc<Mutex<Option<Arc<dyn SessionHandle>>>>,
    local_tracks: Arc<Mutex<Vec<Arc<dyn LocalMediaTrack>>>>,
    registry: Arc<Mutex<RemoteTrackRegistry>>,
}

impl SessionController {
    pub fn new(connector: Arc<dyn MediaConnector>, config: CallConfig) -> Self {
        Self::with_options(connector, config, SessionOptions::default())
    }

    pub fn with_options(
        connector: Arc<dyn MediaConnector>,
        config: CallConfig,
        options: SessionOptions,
    ) -> Self {
        Self {
            connector,
            config,
            options,
            emitter: EventEmitter::new(),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            handle: Arc::new(Mutex::new(None)),
            local_tracks: Arc::new(Mutex::new(Vec::new())),
            registry: Arc::new(Mutex::new(RemoteTrackRegistry::new())),
        }
    }

    /// Register a listener for session events.
    pub fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        self.emitter.add_listener(listener);
    }

    /// Get current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    /// Remote registry entries mapped to rendering surfaces, recomputed
    /// from the registry on each call.
    pub async fn remote_bindings(&self) -> Vec<SurfaceBinding> {
        self.registry.lock().await.bindings()
    }

    /// Kinds of the currently held local tracks.
    pub async fn local_track_kinds(&self) -> Vec<TrackKind> {
        self.local_tracks.lock().await.iter().map(|t| t.kind()).collect()
    }

    /// Mute state of the local track of the given kind.
    pub async fn is_track_muted(&self, kind: TrackKind) -> Option<bool> {
        let tracks = self.local_tracks.lock().await;
        tracks.iter().find(|t| t.kind() == kind).map(|t| t.is_muted())
    }

    /// Acquire devices, connect, publish, and start reacting to session
    /// events.
    ///
    /// Fails with [`CallError::Session`] if a session is already active or
    /// a connect is in flight. Any failure along the way releases whatever
    /// was acquired, surfaces the error, and leaves the controller
    /// disconnected.
    pub async fn connect(&self) -> Result<(), CallError> {
        self.config.validate()?;

        {
            let mut state = self.state.lock().await;
            if *state != ConnectionState::Disconnected {
                return Err(CallError::Session(
                    "a session is already active or connecting".into(),
                ));
            }
            *state = ConnectionState::Connecting;
        }
        self.emitter
            .emit(CallEvent::ConnectionStateChanged(ConnectionState::Connecting));

        match self.establish().await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("connect failed: {e}");
                self.emitter.emit(CallEvent::SessionError(e.to_string()));
                self.reset().await;
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), CallError> {
        if let Some(route) = &self.options.audio_route {
            self.connector.configure_audio_route(route).await?;
        }

        let tracks = self
            .connector
            .acquire_local_tracks(&self.options.capture)
            .await?;

        let url = self.config.websocket_url();
        let (handle, events) = self
            .connector
            .connect(&url, &self.config.credential, &self.options)
            .await?;

        let publishes = join_all(tracks.iter().map(|track| handle.publish(track.clone()))).await;
        if let Some(err) = publishes.into_iter().find_map(Result::err) {
            if let Err(e) = handle.close().await {
                tracing::warn!("error closing session after publish failure: {e}");
            }
            return Err(err);
        }

        *self.local_tracks.lock().await = tracks;
        *self.handle.lock().await = Some(handle);

        {
            let mut state = self.state.lock().await;
            *state = ConnectionState::Connected;
        }
        self.emitter
            .emit(CallEvent::ConnectionStateChanged(ConnectionState::Connected));
        tracing::info!(url = %url, "session connected");

        let emitter = self.emitter.clone();
        let state = self.state.clone();
        let handle_ref = self.handle.clone();
        let local_tracks = self.local_tracks.clone();
        let registry = self.registry.clone();
        tokio::spawn(async move {
            Self::event_loop(events, emitter, state, handle_ref, local_tracks, registry).await;
        });

        Ok(())
    }

    /// Terminate the session and release all local and remote media.
    ///
    /// Benign when nothing is connected; calling it twice leaves the
    /// controller disconnected with no error.
    pub async fn disconnect(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.close().await {
                tracing::warn!("error closing session: {e}");
            }
        }
        self.local_tracks.lock().await.clear();
        self.registry.lock().await.clear();
        self.set_disconnected().await;
    }

    /// Flip the mute state of the local track of the given kind.
    ///
    /// Returns the new muted flag, or None (a no-op) when no such track
    /// exists.
    pub async fn toggle_track(&self, kind: TrackKind) -> Option<bool> {
        let track = {
            let tracks = self.local_tracks.lock().await;
            tracks.iter().find(|t| t.kind() == kind).cloned()
        }?;
        let muted = track.is_muted();
        if muted {
            track.unmute().await;
        } else {
            track.mute().await;
        }
        tracing::info!(?kind, muted = !muted, "local track toggled");
        Some(!muted)
    }

    async fn reset(&self) {
        self.handle.lock().await.take();
        self.local_tracks.lock().await.clear();
        self.registry.lock().await.clear();
        self.set_disconnected().await;
    }

    async fn set_disconnected(&self) {
        let changed = {
            let mut state = self.state.lock().await;
            let changed = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            changed
        };
        if changed {
            self.emitter
                .emit(CallEvent::ConnectionStateChanged(ConnectionState::Disconnected));
        }
    }

    async fn event_loop(
        mut events: mpsc::UnboundedReceiver<MediaEvent>,
        emitter: EventEmitter,
        state: Arc<Mutex<ConnectionState>>,
        handle_ref: Arc<Mutex<Option<Arc<dyn SessionHandle>>>>,
        local_tracks: Arc<Mutex<Vec<Arc<dyn LocalMediaTrack>>>>,
        registry: Arc<Mutex<RemoteTrackRegistry>>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                MediaEvent::TrackSubscribed { participant, track } => {
                    // A subscription can race an in-flight disconnect;
                    // once the session is gone the track is not rendered.
                    if *state.lock().await != ConnectionState::Connected {
                        tracing::debug!("track subscribed after teardown, ignoring");
                        continue;
                    }
                    let kind = track.kind();
                    let surface = track.attach();
                    let replaced = registry.lock().await.insert(
                        participant.clone(),
                        track,
                        surface.clone(),
                    );
                    if replaced {
                        tracing::debug!(%participant, ?kind, "duplicate subscription replaced");
                    }
                    emitter.emit(CallEvent::TrackSubscribed(RemoteTrackInfo {
                        participant,
                        kind,
                        surface_id: surface.id,
                    }));
                }

                MediaEvent::TrackUnsubscribed { participant, kind } => {
                    let removed = registry.lock().await.remove(&participant, kind);
                    if removed {
                        emitter.emit(CallEvent::TrackUnsubscribed { participant, kind });
                    } else {
                        tracing::debug!(%participant, ?kind, "unsubscribe for unknown track");
                    }
                }

                MediaEvent::Disconnected => {
                    tracing::info!("session terminated");
                    registry.lock().await.clear();
                    local_tracks.lock().await.clear();
                    handle_ref.lock().await.take();
                    let changed = {
                        let mut state = state.lock().await;
                        let changed = *state != ConnectionState::Disconnected;
                        *state = ConnectionState::Disconnected;
                        changed
                    };
                    if changed {
                        emitter.emit(CallEvent::ConnectionStateChanged(
                            ConnectionState::Disconnected,
                        ));
                    }
                    break;
                }
            }
        }

        tracing::debug!("session event loop ended");
    }
}
