//! Roomcall core session logic.
//!
//! Transport-agnostic control surface for a video call client: session
//! lifecycle, local track toggles, and the remote track registry.
//! Consumed by native UI shells via UniFFI bindings; the media stack
//! itself is injected through the traits in [`session`].

pub mod auth;
pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod loopback;
pub mod registry;
pub mod service;
pub mod session;

pub use config::{CallConfig, SessionOptions};
pub use controller::SessionController;
pub use errors::CallError;
pub use events::{CallEvent, ConnectionState, TrackKind};
