use serde::Deserialize;
use url::Url;

use crate::errors::CallError;

/// Connection configuration injected at controller construction time.
///
/// The endpoint and credential are deployment inputs; nothing in this
/// crate embeds them.
#[derive(Debug, Clone, Deserialize)]
pub struct CallConfig {
    /// Signaling endpoint, `wss://` (or `https://`, normalized on use).
    pub endpoint_url: String,
    /// Access token for the remote media service.
    pub credential: String,
    /// Participant identity. A guest identity is generated when absent.
    #[serde(default)]
    pub identity: Option<String>,
}

impl CallConfig {
    pub fn new(endpoint_url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            credential: credential.into(),
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Read configuration from the environment:
    /// `ROOMCALL_URL`, `ROOMCALL_TOKEN` and optional `ROOMCALL_IDENTITY`.
    pub fn from_env() -> Result<Self, CallError> {
        Self::from_vars(
            std::env::var("ROOMCALL_URL").ok(),
            std::env::var("ROOMCALL_TOKEN").ok(),
            std::env::var("ROOMCALL_IDENTITY").ok(),
        )
    }

    fn from_vars(
        url: Option<String>,
        token: Option<String>,
        identity: Option<String>,
    ) -> Result<Self, CallError> {
        let endpoint_url =
            url.ok_or_else(|| CallError::InvalidConfig("ROOMCALL_URL is not set".into()))?;
        let credential =
            token.ok_or_else(|| CallError::InvalidConfig("ROOMCALL_TOKEN is not set".into()))?;
        Ok(Self {
            endpoint_url,
            credential,
            identity,
        })
    }

    /// Check that the endpoint parses and the credential is present.
    pub fn validate(&self) -> Result<(), CallError> {
        let url = Url::parse(&self.endpoint_url)
            .map_err(|e| CallError::InvalidConfig(format!("endpoint url: {e}")))?;
        match url.scheme() {
            "ws" | "wss" | "http" | "https" => {}
            other => {
                return Err(CallError::InvalidConfig(format!(
                    "unsupported endpoint scheme '{other}'"
                )));
            }
        }
        if self.credential.trim().is_empty() {
            return Err(CallError::InvalidConfig("credential is empty".into()));
        }
        Ok(())
    }

    /// Endpoint normalized to a WebSocket URL.
    pub fn websocket_url(&self) -> String {
        self.endpoint_url
            .replace("https://", "wss://")
            .replace("http://", "ws://")
    }

    /// Configured identity, or a generated guest identity.
    pub fn identity_or_guest(&self) -> String {
        match &self.identity {
            Some(identity) => identity.clone(),
            None => format!("guest-{:04x}", rand::random::<u16>()),
        }
    }
}

/// Which local devices to acquire on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub audio: bool,
    pub video: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutput {
    Speaker,
    Earpiece,
    Headset,
}

/// Platform audio routing, applied before connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRouteConfig {
    pub android_preferred_outputs: Vec<AudioOutput>,
    pub ios_default_output: AudioOutput,
}

impl AudioRouteConfig {
    /// Route call audio to the loudspeaker on both platforms.
    pub fn speaker() -> Self {
        Self {
            android_preferred_outputs: vec![AudioOutput::Speaker],
            ios_default_output: AudioOutput::Speaker,
        }
    }
}

/// Per-session options forwarded to the media connector.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub adaptive_stream: bool,
    pub dynacast: bool,
    pub auto_subscribe: bool,
    /// Publish bitrate cap for audio, in bits per second.
    pub audio_bitrate: Option<u32>,
    pub audio_route: Option<AudioRouteConfig>,
    pub capture: CaptureOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            adaptive_stream: true,
            dynacast: true,
            auto_subscribe: true,
            audio_bitrate: None,
            audio_route: None,
            capture: CaptureOptions::default(),
        }
    }
}

impl SessionOptions {
    /// Preset for handset shells: speaker routing, low audio bitrate.
    pub fn mobile() -> Self {
        Self {
            audio_bitrate: Some(16_000),
            audio_route: Some(AudioRouteConfig::speaker()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_wss() {
        let config = CallConfig::new("wss://media.example.com", "tok");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_scheme() {
        let config = CallConfig::new("ftp://media.example.com", "tok");
        assert!(matches!(
            config.validate(),
            Err(CallError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_credential() {
        let config = CallConfig::new("wss://media.example.com", "  ");
        assert!(matches!(
            config.validate(),
            Err(CallError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_unparseable_url() {
        let config = CallConfig::new("not a url", "tok");
        assert!(config.validate().is_err());
    }

    #[test]
    fn websocket_url_normalizes_http_schemes() {
        let config = CallConfig::new("https://media.example.com", "tok");
        assert_eq!(config.websocket_url(), "wss://media.example.com");
        let config = CallConfig::new("http://localhost:7880", "tok");
        assert_eq!(config.websocket_url(), "ws://localhost:7880");
    }

    #[test]
    fn from_vars_requires_url_and_token() {
        assert!(CallConfig::from_vars(None, Some("tok".into()), None).is_err());
        assert!(CallConfig::from_vars(Some("wss://x".into()), None, None).is_err());
        let config = CallConfig::from_vars(
            Some("wss://x".into()),
            Some("tok".into()),
            Some("alice".into()),
        )
        .unwrap();
        assert_eq!(config.identity.as_deref(), Some("alice"));
    }

    #[test]
    fn identity_or_guest_generates_when_absent() {
        let config = CallConfig::new("wss://x", "tok");
        assert!(config.identity_or_guest().starts_with("guest-"));
        let config = config.with_identity("bob");
        assert_eq!(config.identity_or_guest(), "bob");
    }

    #[test]
    fn mobile_options_route_to_speaker() {
        let options = SessionOptions::mobile();
        assert_eq!(options.audio_bitrate, Some(16_000));
        assert_eq!(options.audio_route, Some(AudioRouteConfig::speaker()));
        assert!(options.adaptive_stream);
        assert!(options.dynacast);
    }
}
