//! # lib_yamcs
//!
//! Bridges a Yamcs telemetry instance to a host visualization framework.
//!
//! The remote side is a Yamcs server (or simulator) exposing the MDB
//! parameter catalog over REST and live parameter updates over a push
//! websocket. The host side is modeled by the [`plugin::Host`] trait; the
//! plugin installs four provider services against it:
//!
//! - [`provider::objects::ObjectProvider`] — identifier resolution,
//! - [`provider::objects::CompositionProvider`] — folder expansion,
//! - [`provider::history::HistoryProvider`] — archive retrieval,
//! - [`live::engine::LiveEngine`] — live subscription and fan-out.
//!
//! All four share one [`mdb::cache::DictionaryCache`], which loads the
//! parameter catalog exactly once per plugin instance.

pub mod config;
pub mod error;
pub mod live;
pub mod logger;
pub mod mdb;
pub mod model;
pub mod plugin;
pub mod provider;
pub mod rest;

pub use config::YamcsConfig;
pub use error::YamcsError;
pub use model::{TelemetryIdentifier, TelemetryPoint, TelemetryValue};
pub use plugin::{Host, TypeDefinition, YamcsPlugin};
