//! The live subscription/dispatch engine.
//!
//! [`engine::LiveEngine`] owns the listener registry and the command channel
//! to the push-socket task; [`socket`] runs the long-lived connection with
//! reconnect-and-resubscribe; [`frames`] encodes control frames and decodes
//! inbound pushes; [`registry`] tracks per-parameter listener sets and their
//! zero-to-one / one-to-zero transitions.

pub mod engine;
pub mod frames;
pub mod registry;
pub mod socket;

pub use engine::{LiveEngine, Subscription};
pub use registry::{Callback, ListenerRegistry};
