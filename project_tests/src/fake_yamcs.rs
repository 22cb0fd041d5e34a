//! A minimal in-process Yamcs stand-in.
//!
//! Serves the MDB parameter catalog and per-parameter archives over REST,
//! and a push websocket that records inbound control frames and replays
//! whatever the test scripts into it. Connections can be dropped on demand
//! to exercise the reconnect path.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, RawQuery, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};

use lib_yamcs::YamcsConfig;

/// One catalog entry the fake instance advertises.
#[derive(Debug, Clone)]
pub struct FakeParameter {
    pub name: &'static str,
    pub eng_type: Option<&'static str>,
}

impl FakeParameter {
    pub fn new(name: &'static str, eng_type: &'static str) -> Self {
        Self {
            name,
            eng_type: Some(eng_type),
        }
    }

    /// A parameter whose MDB entry carries no type block at all.
    pub fn untyped(name: &'static str) -> Self {
        Self {
            name,
            eng_type: None,
        }
    }
}

pub struct FakeState {
    addr: SocketAddr,
    parameters: Vec<FakeParameter>,
    mdb_hits: AtomicUsize,
    mdb_fail: AtomicBool,
    archives: Mutex<HashMap<String, Value>>,
    last_archive_query: Mutex<Option<String>>,
    inbound_tx: mpsc::UnboundedSender<String>,
    conn_tx: mpsc::UnboundedSender<()>,
    push_tx: broadcast::Sender<String>,
    drop_tx: broadcast::Sender<()>,
}

pub struct FakeYamcs {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
    /// Control frames the client sent, in arrival order, across connections.
    pub inbound_rx: mpsc::UnboundedReceiver<String>,
    /// One message per accepted websocket connection.
    pub conn_rx: mpsc::UnboundedReceiver<()>,
}

impl FakeYamcs {
    pub async fn spawn(parameters: Vec<FakeParameter>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake yamcs");
        let addr = listener.local_addr().expect("local addr");

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        let (push_tx, _) = broadcast::channel(64);
        let (drop_tx, _) = broadcast::channel(4);

        let state = Arc::new(FakeState {
            addr,
            parameters,
            mdb_hits: AtomicUsize::new(0),
            mdb_fail: AtomicBool::new(false),
            archives: Mutex::new(HashMap::new()),
            last_archive_query: Mutex::new(None),
            inbound_tx,
            conn_tx,
            push_tx,
            drop_tx,
        });

        let app = Router::new()
            .route("/api/mdb/{instance}/parameters", get(mdb_handler))
            .route("/api/archive/{instance}/parameters/{*path}", get(archive_handler))
            .route("/{instance}/_websocket", get(ws_handler))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake yamcs serve");
        });

        Self {
            addr,
            state,
            inbound_rx,
            conn_rx,
        }
    }

    /// Bridge config pointing at this fake, with fast reconnects.
    pub fn config(&self) -> YamcsConfig {
        let mut config = YamcsConfig::for_endpoint("127.0.0.1", self.addr.port(), "simulator");
        config.reconnect_base_delay_ms = Some(50);
        config.reconnect_max_delay_ms = Some(200);
        config
    }

    pub fn mdb_hits(&self) -> usize {
        self.state.mdb_hits.load(Ordering::SeqCst)
    }

    /// Makes the MDB endpoint answer 500 from now on.
    pub fn fail_mdb(&self) {
        self.state.mdb_fail.store(true, Ordering::SeqCst);
    }

    pub fn restore_mdb(&self) {
        self.state.mdb_fail.store(false, Ordering::SeqCst);
    }

    /// Query string of the most recent archive request.
    pub fn last_archive_query(&self) -> Option<String> {
        self.state.last_archive_query.lock().unwrap().clone()
    }

    /// Sets the archive body served for `name`.
    pub fn set_archive(&self, name: &str, body: Value) {
        self.state
            .archives
            .lock()
            .unwrap()
            .insert(name.to_string(), body);
    }

    /// Pushes one raw frame to every connected websocket client.
    pub fn push(&self, frame: &str) {
        let _ = self.state.push_tx.send(frame.to_string());
    }

    /// Closes every open websocket connection server-side.
    pub fn drop_connections(&self) {
        let _ = self.state.drop_tx.send(());
    }

    /// Next control frame the client sent, parsed, or a panic after 5s.
    pub async fn next_control(&mut self) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(5), self.inbound_rx.recv())
            .await
            .expect("timed out waiting for a control frame")
            .expect("inbound channel closed");
        serde_json::from_str(&text).expect("control frame should be JSON")
    }

    pub async fn wait_connected(&mut self) {
        tokio::time::timeout(Duration::from_secs(5), self.conn_rx.recv())
            .await
            .expect("timed out waiting for a websocket connection")
            .expect("connection channel closed");
    }
}

async fn mdb_handler(
    Path(instance): Path<String>,
    State(state): State<Arc<FakeState>>,
) -> Response {
    state.mdb_hits.fetch_add(1, Ordering::SeqCst);
    if state.mdb_fail.load(Ordering::SeqCst) {
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "mdb unavailable").into_response();
    }
    // Let concurrent callers overlap so single-flight is actually exercised.
    tokio::time::sleep(Duration::from_millis(25)).await;

    let parameters: Vec<Value> = state
        .parameters
        .iter()
        .map(|p| {
            let mut entry = json!({
                "name": p.name,
                "qualifiedName": format!("/YSS/SIMULATOR/{}", p.name),
                "url": format!(
                    "http://{}/api/mdb/{}/parameters/YSS/SIMULATOR/{}",
                    state.addr, instance, p.name
                ),
            });
            if let Some(eng_type) = p.eng_type {
                entry["type"] = json!({ "engType": eng_type });
            }
            entry
        })
        .collect();
    Json(json!({ "parameter": parameters })).into_response()
}

async fn archive_handler(
    Path((_instance, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    State(state): State<Arc<FakeState>>,
) -> Json<Value> {
    *state.last_archive_query.lock().unwrap() = query;
    let name = path.rsplit('/').next().unwrap_or_default();
    let body = state
        .archives
        .lock()
        .unwrap()
        .get(name)
        .cloned()
        .unwrap_or_else(|| json!({}));
    Json(body)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<FakeState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<FakeState>) {
    let _ = state.conn_tx.send(());
    let mut push_rx = state.push_tx.subscribe();
    let mut drop_rx = state.drop_tx.subscribe();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = state.inbound_tx.send(text.to_string());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            frame = push_rx.recv() => {
                let Ok(frame) = frame else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            _ = drop_rx.recv() => {
                // Hard drop, no close handshake.
                break;
            }
        }
    }
}
