//! The long-lived push-socket task.
//!
//! Connects to `ws://{host}:{port}/{instance}/_websocket`, consumes control
//! commands from the engine, dispatches inbound frames, and on connection
//! loss reconnects with exponential backoff, re-issuing subscribe frames for
//! every name still in the registry.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use crate::config::YamcsConfig;
use crate::error::YamcsError;
use crate::live::engine::{dispatch_frame, ControlCommand};
use crate::live::frames::ControlEncoder;
use crate::live::registry::ListenerRegistry;
use crate::mdb::cache::DictionaryCache;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

#[derive(Debug, Clone)]
pub struct SocketSettings {
    pub url: String,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl SocketSettings {
    pub fn from_config(config: &YamcsConfig) -> Self {
        Self {
            url: config.ws_url(),
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms()),
            max_delay: Duration::from_millis(config.reconnect_max_delay_ms()),
        }
    }
}

pub async fn run(
    settings: SocketSettings,
    cache: Arc<DictionaryCache>,
    registry: Arc<ListenerRegistry>,
    mut cmd_rx: mpsc::UnboundedReceiver<ControlCommand>,
    mut shutdown: broadcast::Receiver<()>,
) {
    // One encoder across reconnects keeps the sequence numbers monotonic
    // for the whole engine lifetime.
    let encoder = ControlEncoder::new();
    let mut delay = settings.base_delay;

    loop {
        if shutdown.try_recv().is_ok() {
            break;
        }

        log::info!("Connecting to Yamcs push socket: {}", settings.url);
        match connect_async(settings.url.as_str()).await {
            Ok((ws_stream, _)) => {
                log::info!("Push socket connected");
                delay = settings.base_delay;
                let (mut write, mut read) = ws_stream.split();

                // Commands queued while the connection was down are already
                // reflected in the registry; replaying them here would send
                // duplicate subscribes or unsubscribes for names this
                // connection never subscribed.
                while cmd_rx.try_recv().is_ok() {}

                // Repair path: re-issue subscribe frames for every name
                // that still has listeners.
                let mut healthy = true;
                for name in registry.active_names() {
                    if !send_control(&mut write, &cache, &encoder, &ControlCommand::Subscribe(name)).await {
                        healthy = false;
                        break;
                    }
                }

                while healthy {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            log::info!("Push socket shutting down");
                            let _ = write.close().await;
                            return;
                        }
                        cmd = cmd_rx.recv() => {
                            let Some(cmd) = cmd else {
                                // Engine dropped; nothing left to serve.
                                let _ = write.close().await;
                                return;
                            };
                            if !send_control(&mut write, &cache, &encoder, &cmd).await {
                                break;
                            }
                        }
                        msg = read.next() => {
                            match msg {
                                Some(Ok(WsMessage::Text(text))) => dispatch_frame(&registry, &text),
                                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                                Some(Ok(WsMessage::Close(_))) | None => {
                                    log::warn!("{}", YamcsError::Disconnected);
                                    break;
                                }
                                Some(Err(e)) => {
                                    log::error!("Push socket error: {e}");
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                }
            }
            Err(e) => {
                log::error!("Failed to connect to {}: {e}", settings.url);
            }
        }

        // Exponential backoff before the next attempt.
        log::info!("Reconnecting in {:?}", delay);
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = sleep(delay) => {}
        }
        delay = (delay * 2).min(settings.max_delay);
    }
}

/// Resolves the qualified name and sends one control frame. A name missing
/// from the dictionary drops the command (its paired command resolves to
/// nothing too, so the stream never carries an unmatched frame). Returns
/// false when the socket write failed and the connection must be rebuilt.
async fn send_control(
    write: &mut WsSink,
    cache: &DictionaryCache,
    encoder: &ControlEncoder,
    cmd: &ControlCommand,
) -> bool {
    let (op_name, is_subscribe) = match cmd {
        ControlCommand::Subscribe(name) => (name, true),
        ControlCommand::Unsubscribe(name) => (name, false),
    };
    let frame = match cache.require(op_name).await {
        Ok(parameter) if is_subscribe => encoder.subscribe(&parameter.qualified_name),
        Ok(parameter) => encoder.unsubscribe(&parameter.qualified_name),
        Err(e) => {
            log::warn!("Dropping control command for `{op_name}`: {e}");
            return true;
        }
    };
    log::debug!("Sending control frame: {frame}");
    if let Err(e) = write.send(WsMessage::Text(frame.into())).await {
        log::error!("Failed to send control frame: {e}");
        return false;
    }
    true
}
