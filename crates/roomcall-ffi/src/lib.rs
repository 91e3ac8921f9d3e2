//! UniFFI bindings for roomcall-core.
//!
//! Provides a CallClient object wrapping the SessionController in an
//! FFI-safe interface for native mobile shells. The shell supplies no
//! media stack of its own here; the client runs over the loopback
//! connector, and platform connectors are wired in by the host build.

use std::sync::Arc;

use roomcall_core::{
    config::{CallConfig as CoreCallConfig, SessionOptions},
    controller::SessionController,
    errors::CallError as CoreCallError,
    events::{
        CallEvent as CoreCallEvent, CallEventListener as CoreCallEventListener,
        ConnectionState as CoreConnectionState, RemoteTrackInfo, TrackKind as CoreTrackKind,
    },
    loopback::LoopbackConnector,
};

uniffi::setup_scaffolding!();

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using
/// CallClient.
#[uniffi::export]
pub fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "roomcall_core=debug,roomcall_ffi=debug".parse().unwrap()),
            )
            .with_ansi(false)
            .init();
    });
}

// ── FFI-safe type conversions ────────────────────────────────────────

#[derive(Debug, Clone, uniffi::Enum)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl From<CoreConnectionState> for ConnectionState {
    fn from(s: CoreConnectionState) -> Self {
        match s {
            CoreConnectionState::Disconnected => Self::Disconnected,
            CoreConnectionState::Connecting => Self::Connecting,
            CoreConnectionState::Connected => Self::Connected,
        }
    }
}

#[derive(Debug, Clone, uniffi::Enum)]
pub enum TrackKind {
    Audio,
    Video,
}

impl From<CoreTrackKind> for TrackKind {
    fn from(k: CoreTrackKind) -> Self {
        match k {
            CoreTrackKind::Audio => Self::Audio,
            CoreTrackKind::Video => Self::Video,
        }
    }
}

impl From<TrackKind> for CoreTrackKind {
    fn from(k: TrackKind) -> Self {
        match k {
            TrackKind::Audio => Self::Audio,
            TrackKind::Video => Self::Video,
        }
    }
}

/// Connection configuration supplied by the host shell.
#[derive(Debug, Clone, uniffi::Record)]
pub struct CallConfig {
    pub endpoint_url: String,
    pub credential: String,
    pub identity: Option<String>,
}

impl From<CallConfig> for CoreCallConfig {
    fn from(c: CallConfig) -> Self {
        Self {
            endpoint_url: c.endpoint_url,
            credential: c.credential,
            identity: c.identity,
        }
    }
}

/// One remote track bound to a rendering surface.
#[derive(Debug, Clone, uniffi::Record)]
pub struct RemoteTile {
    pub participant: String,
    pub kind: TrackKind,
    pub surface_id: String,
}

impl From<RemoteTrackInfo> for RemoteTile {
    fn from(info: RemoteTrackInfo) -> Self {
        Self {
            participant: info.participant,
            kind: info.kind.into(),
            surface_id: info.surface_id,
        }
    }
}

// ── Error conversion ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum CallError {
    #[error("device error: {0}")]
    Device(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("publish error: {0}")]
    Publish(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<CoreCallError> for CallError {
    fn from(e: CoreCallError) -> Self {
        tracing::error!("CallError: {e}");
        match e {
            CoreCallError::Device(msg) => Self::Device(msg),
            CoreCallError::Connection(msg) => Self::Connection(msg),
            CoreCallError::Publish(msg) => Self::Publish(msg),
            CoreCallError::Session(msg) => Self::Session(msg),
            CoreCallError::Auth(msg) => Self::Auth(msg),
            CoreCallError::Http(msg) => Self::Http(msg),
            CoreCallError::InvalidConfig(msg) => Self::InvalidConfig(msg),
        }
    }
}

// ── Callback interface ───────────────────────────────────────────────

#[uniffi::export(callback_interface)]
pub trait CallListener: Send + Sync {
    fn on_state_changed(&self, state: ConnectionState);
    fn on_track_added(&self, tile: RemoteTile);
    fn on_track_removed(&self, participant: String, kind: TrackKind);
    fn on_session_error(&self, message: String);
}

// ── Bridge listener: core events → FFI callbacks ─────────────────────

struct BridgeListener {
    ffi_listener: Box<dyn CallListener>,
}

impl CoreCallEventListener for BridgeListener {
    fn on_event(&self, event: CoreCallEvent) {
        match event {
            CoreCallEvent::ConnectionStateChanged(state) => {
                self.ffi_listener.on_state_changed(state.into());
            }
            CoreCallEvent::TrackSubscribed(info) => {
                self.ffi_listener.on_track_added(info.into());
            }
            CoreCallEvent::TrackUnsubscribed { participant, kind } => {
                self.ffi_listener.on_track_removed(participant, kind.into());
            }
            CoreCallEvent::SessionError(message) => {
                self.ffi_listener.on_session_error(message);
            }
        }
    }
}

// ── CallClient: main FFI object ──────────────────────────────────────

#[derive(uniffi::Object)]
pub struct CallClient {
    controller: SessionController,
    rt: tokio::runtime::Runtime,
}

#[uniffi::export]
impl CallClient {
    /// Build a client for a handset shell: speaker audio routing and a
    /// capped audio bitrate, per mobile session defaults.
    #[uniffi::constructor]
    pub fn new(config: CallConfig) -> Result<Arc<Self>, CallError> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| CallError::Session(format!("tokio runtime: {e}")))?;
        let connector = Arc::new(LoopbackConnector::new());
        let controller =
            SessionController::with_options(connector, config.into(), SessionOptions::mobile());
        Ok(Arc::new(Self { controller, rt }))
    }

    pub fn connect(&self) -> Result<(), CallError> {
        self.rt
            .block_on(self.controller.connect())
            .map_err(CallError::from)
    }

    pub fn disconnect(&self) {
        self.rt.block_on(self.controller.disconnect());
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.rt.block_on(self.controller.connection_state()).into()
    }

    /// Flip microphone mute. Returns the new muted flag, or None when no
    /// microphone track is held.
    pub fn toggle_microphone(&self) -> Option<bool> {
        self.rt
            .block_on(self.controller.toggle_track(CoreTrackKind::Audio))
    }

    /// Flip camera mute. Returns the new muted flag, or None when no
    /// camera track is held.
    pub fn toggle_camera(&self) -> Option<bool> {
        self.rt
            .block_on(self.controller.toggle_track(CoreTrackKind::Video))
    }

    pub fn is_track_muted(&self, kind: TrackKind) -> Option<bool> {
        self.rt
            .block_on(self.controller.is_track_muted(kind.into()))
    }

    /// The remote registry as a renderable layout, recomputed on each
    /// call.
    pub fn remote_tiles(&self) -> Vec<RemoteTile> {
        self.rt
            .block_on(self.controller.remote_bindings())
            .into_iter()
            .map(|binding| RemoteTile {
                participant: binding.participant,
                kind: binding.kind.into(),
                surface_id: binding.surface.id,
            })
            .collect()
    }

    pub fn add_listener(&self, listener: Box<dyn CallListener>) {
        self.controller.add_listener(Arc::new(BridgeListener {
            ffi_listener: listener,
        }));
    }
}
