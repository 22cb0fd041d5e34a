//! Subscription lifecycle and inbound fan-out.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::YamcsConfig;
use crate::error::YamcsError;
use crate::live::frames::{decode_push_frame, PushFrame};
use crate::live::registry::{Callback, ListenerRegistry};
use crate::live::socket::{self, SocketSettings};
use crate::mdb::cache::DictionaryCache;
use crate::model::{decode_eng_value, TelemetryIdentifier, TelemetryPoint};
use crate::provider::TELEMETRY_TYPE;

/// Commands the engine queues for the socket task. The single consumer
/// serializes all control-frame sends, so a rapid subscribe/unsubscribe pair
/// goes out in order even while the qualified-name resolution is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Subscribe(String),
    Unsubscribe(String),
}

/// The live telemetry provider: owns the listener registry and the command
/// channel to the push-socket task.
pub struct LiveEngine {
    registry: Arc<ListenerRegistry>,
    cache: Arc<DictionaryCache>,
    cmd_tx: mpsc::UnboundedSender<ControlCommand>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Disposer for one registered callback.
///
/// [`cancel`](Self::cancel) removes exactly the callback this handle was
/// created for; removal is by id, so calling it again finds nothing and is
/// a no-op. On the one-to-zero transition for the parameter the entry is
/// deleted and an unsubscribe control frame is queued.
pub struct Subscription {
    name: String,
    id: u64,
    registry: Arc<ListenerRegistry>,
    cmd_tx: mpsc::UnboundedSender<ControlCommand>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn cancel(&self) {
        self.registry.remove(&self.name, self.id, || {
            let _ = self.cmd_tx.send(ControlCommand::Unsubscribe(self.name.clone()));
        });
    }
}

impl LiveEngine {
    /// Builds the engine and hands back the control-command stream a socket
    /// task must consume. Use [`start`](Self::start) to get a fully wired
    /// engine with the connection running.
    pub fn new(cache: Arc<DictionaryCache>) -> (Arc<Self>, mpsc::UnboundedReceiver<ControlCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);
        let engine = Arc::new(Self {
            registry: Arc::new(ListenerRegistry::new()),
            cache,
            cmd_tx,
            shutdown_tx,
        });
        (engine, cmd_rx)
    }

    /// Builds the engine and spawns the push-socket task (connect, control
    /// sends, inbound dispatch, reconnect-and-resubscribe).
    pub fn start(config: &YamcsConfig, cache: Arc<DictionaryCache>) -> Arc<Self> {
        let (engine, cmd_rx) = Self::new(cache);
        tokio::spawn(socket::run(
            SocketSettings::from_config(config),
            Arc::clone(&engine.cache),
            Arc::clone(&engine.registry),
            cmd_rx,
            engine.shutdown_tx.subscribe(),
        ));
        engine
    }

    pub fn supports_subscribe(&self, type_key: &str) -> bool {
        type_key == TELEMETRY_TYPE
    }

    /// Registers `callback` for the identified parameter.
    ///
    /// The registry append happens synchronously, before any await, so a
    /// frame racing the qualified-name resolution still reaches this
    /// callback. On the zero-to-one transition a subscribe command is
    /// enqueued while the registry lock is still held, so the command
    /// stream mirrors the transition order even when a cancel for the same
    /// name races this call. The socket task resolves the qualified name
    /// and sends the control frame. The name is then validated against the
    /// dictionary; an unknown name rolls the append back and rejects the
    /// call.
    pub async fn subscribe(
        &self,
        identifier: &TelemetryIdentifier,
        callback: Callback,
    ) -> Result<Subscription, YamcsError> {
        let name = identifier.key.clone();
        let id = self.registry.add(&name, callback, || {
            let _ = self.cmd_tx.send(ControlCommand::Subscribe(name.clone()));
        });

        if let Err(e) = self.cache.require(&name).await {
            log::warn!("Rejecting subscription to `{name}`: {e}");
            self.registry.remove(&name, id, || {
                let _ = self.cmd_tx.send(ControlCommand::Unsubscribe(name.clone()));
            });
            return Err(e);
        }

        Ok(Subscription {
            name,
            id,
            registry: Arc::clone(&self.registry),
            cmd_tx: self.cmd_tx.clone(),
        })
    }

    /// Stops the socket task. Registered callbacks stay in place but no
    /// further frames will arrive.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(());
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }
}

/// Decodes one inbound websocket text frame and fans it out.
///
/// Every batch entry with an active listener registration is processed (a
/// frame may legitimately name several parameters). An entry with an
/// absent payload, or a sentinel frame, delivers a valueless liveness
/// tick. A malformed frame or entry is logged and dropped; dispatch
/// continues with the next frame.
pub(crate) fn dispatch_frame(registry: &ListenerRegistry, text: &str) {
    match decode_push_frame(text) {
        Ok(PushFrame::Tick) => {
            for name in registry.active_names() {
                registry.dispatch(&name, &TelemetryPoint::tick(&name));
            }
        }
        Ok(PushFrame::Updates(updates)) => {
            for update in updates {
                if !registry.has(&update.name) {
                    continue;
                }
                let value = match update.raw_eng_value() {
                    None => None,
                    Some(Ok(raw)) => match decode_eng_value(&raw) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            log::warn!("Dropping update for `{}`: {e}", update.name);
                            continue;
                        }
                    },
                    Some(Err(e)) => {
                        log::warn!("Dropping update for `{}`: {e}", update.name);
                        continue;
                    }
                };
                let point = TelemetryPoint {
                    id: update.name.clone(),
                    timestamp: update.generation_time.clone(),
                    value,
                };
                registry.dispatch(&update.name, &point);
            }
        }
        Err(e) => log::warn!("Dropping malformed push frame: {e}"),
    }
}
