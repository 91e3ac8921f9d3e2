use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("capture device unavailable: {0}")]
    Device(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("track publish rejected: {0}")]
    Publish(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
