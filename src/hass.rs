//! Home Assistant WebSocket RPC connection.
//!
//! [`HassConnection`] is the seam the rest of the crate talks through: a
//! single `call` that sends a `{type, ...}` command and resolves with the
//! `result` payload. [`WsConnection`] speaks the real protocol,
//! [`MockConnection`] answers from canned responses for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, ClientResult};

#[async_trait]
pub trait HassConnection: Send + Sync {
    /// Send one command (an object with a `type` field) and wait for its
    /// result payload.
    async fn call(&self, command: Value) -> ClientResult<Value>;
}

/// Websocket endpoint for a Home Assistant base URL.
pub fn websocket_url(base_url: &str) -> ClientResult<String> {
    let base = base_url.trim().trim_end_matches('/');
    let rest = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::Validation(format!(
            "base URL must start with http:// or https://: {}",
            base_url
        )));
    };
    Ok(format!("{}/api/websocket", rest))
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<ClientResult<Value>>>>>;

/// A live, authenticated WebSocket session.
pub struct WsConnection {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    request_timeout: Duration,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsConnection {
    /// Connect and run the auth handshake. `auth_invalid` maps to
    /// [`ClientError::Unauthorized`].
    pub async fn connect(
        base_url: &str,
        access_token: &str,
        request_timeout: Duration,
    ) -> ClientResult<Self> {
        let url = websocket_url(base_url)?;
        info!("Connecting to {}", url);
        let (stream, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut source) = stream.split();

        let first = next_json(&mut source).await?;
        if message_type(&first) != Some("auth_required") {
            return Err(ClientError::Decode(format!(
                "expected auth_required, got {}",
                first
            )));
        }

        let auth = json!({ "type": "auth", "access_token": access_token });
        sink.send(Message::text(auth.to_string())).await?;

        let reply = next_json(&mut source).await?;
        match message_type(&reply) {
            Some("auth_ok") => {
                info!(
                    ha_version = reply.get("ha_version").and_then(serde_json::Value::as_str).unwrap_or("?"),
                    "Authenticated with Home Assistant"
                );
            }
            Some("auth_invalid") => {
                warn!(
                    "Authentication rejected: {}",
                    reply.get("message").and_then(serde_json::Value::as_str).unwrap_or("")
                );
                return Err(ClientError::Unauthorized);
            }
            _ => {
                return Err(ClientError::Decode(format!(
                    "unexpected auth reply: {}",
                    reply
                )));
            }
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    error!("WebSocket send failed: {}", e);
                    break;
                }
            }
        });

        let closed = Arc::new(AtomicBool::new(false));
        let reader_closed = Arc::clone(&closed);
        let reader_pending = Arc::clone(&pending);
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => route_reply(&reader_pending, value),
                        Err(e) => warn!("Ignoring malformed frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket receive failed: {}", e);
                        break;
                    }
                }
            }
            info!("WebSocket disconnected");
            // set before draining so late registrations see it
            reader_closed.store(true, Ordering::SeqCst);
            fail_all(&reader_pending, ClientError::Network("connection closed".into()));
        });

        Ok(Self {
            outgoing,
            pending,
            closed,
            next_id: AtomicU64::new(1),
            request_timeout,
            reader,
            writer,
        })
    }

    fn register(&self, id: u64, tx: oneshot::Sender<ClientResult<Value>>) -> ClientResult<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| ClientError::Network("pending request table poisoned".into()))?;
        if self.is_closed() {
            return Err(ClientError::Network("connection closed".into()));
        }
        pending.insert(id, tx);
        Ok(())
    }

    /// Whether the server side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }
}

#[async_trait]
impl HassConnection for WsConnection {
    async fn call(&self, mut command: Value) -> ClientResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let Some(object) = command.as_object_mut() else {
            return Err(ClientError::Validation("command must be an object".into()));
        };
        object.insert("id".into(), json!(id));
        debug!(id, command_type = ?object.get("type"), "RPC request");

        let (tx, rx) = oneshot::channel();
        self.register(id, tx)?;

        if self
            .outgoing
            .send(Message::text(command.to_string()))
            .is_err()
        {
            self.forget(id);
            return Err(ClientError::Network("connection closed".into()));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Network("connection closed".into())),
            Err(_) => {
                self.forget(id);
                Err(ClientError::Network(format!(
                    "request {} timed out after {:?}",
                    id, self.request_timeout
                )))
            }
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn next_json<S>(source: &mut S) -> ClientResult<Value>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = source.next().await {
        match frame? {
            Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            Message::Close(_) => break,
            _ => continue,
        }
    }
    Err(ClientError::Network("connection closed during handshake".into()))
}

fn message_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

/// Turn a `result` frame into the outcome of its pending request.
pub fn decode_result(value: &Value) -> ClientResult<Value> {
    if value.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(value.get("result").cloned().unwrap_or(Value::Null));
    }
    let error = value.get("error");
    let code = error
        .and_then(|e| e.get("code"))
        .map(|c| match c {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "unknown_error".into());
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    Err(ClientError::Rpc { code, message })
}

fn route_reply(pending: &Pending, value: Value) {
    if message_type(&value) != Some("result") {
        debug!("Ignoring frame: {}", value);
        return;
    }
    let Some(id) = value.get("id").and_then(Value::as_u64) else {
        warn!("Result frame without id");
        return;
    };
    let waiter = pending.lock().ok().and_then(|mut p| p.remove(&id));
    match waiter {
        Some(tx) => {
            let _ = tx.send(decode_result(&value));
        }
        None => debug!(id, "Result for unknown or abandoned request"),
    }
}

fn fail_all(pending: &Pending, error: ClientError) {
    if let Ok(mut pending) = pending.lock() {
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(error.clone()));
        }
    }
}

// ==================== Mock ====================

/// In-memory connection answering by command `type`.
///
/// Queued one-shot responses win over the standing response for a type.
/// Every command is recorded for inspection.
#[derive(Debug, Default)]
pub struct MockConnection {
    standing: Mutex<HashMap<String, ClientResult<Value>>>,
    queued: Mutex<HashMap<String, VecDeque<ClientResult<Value>>>>,
    calls: Mutex<Vec<Value>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `command_type` with `result`.
    pub fn respond(&self, command_type: &str, result: Value) -> &Self {
        if let Ok(mut standing) = self.standing.lock() {
            standing.insert(command_type.to_string(), Ok(result));
        }
        self
    }

    /// Fail every `command_type` with `error`.
    pub fn fail(&self, command_type: &str, error: ClientError) -> &Self {
        if let Ok(mut standing) = self.standing.lock() {
            standing.insert(command_type.to_string(), Err(error));
        }
        self
    }

    /// Answer the next `command_type` only.
    pub fn respond_once(&self, command_type: &str, result: ClientResult<Value>) -> &Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued
                .entry(command_type.to_string())
                .or_default()
                .push_back(result);
        }
        self
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_of(&self, command_type: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|c| message_type(c) == Some(command_type))
            .collect()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }
}

#[async_trait]
impl HassConnection for MockConnection {
    async fn call(&self, command: Value) -> ClientResult<Value> {
        let command_type = message_type(&command).unwrap_or("").to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command);
        }

        let queued = self
            .queued
            .lock()
            .ok()
            .and_then(|mut q| q.get_mut(&command_type).and_then(VecDeque::pop_front));
        if let Some(result) = queued {
            return result;
        }

        self.standing
            .lock()
            .ok()
            .and_then(|s| s.get(&command_type).cloned())
            .unwrap_or_else(|| {
                Err(ClientError::Rpc {
                    code: "unknown_command".into(),
                    message: format!("Unknown command: {}", command_type),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url() {
        assert_eq!(
            websocket_url("http://homeassistant.local:8123/").unwrap(),
            "ws://homeassistant.local:8123/api/websocket"
        );
        assert_eq!(
            websocket_url("https://ha.example.com").unwrap(),
            "wss://ha.example.com/api/websocket"
        );
        assert!(websocket_url("homeassistant.local").is_err());
    }

    #[test]
    fn test_decode_result_success_and_error() {
        let ok = decode_result(&json!({"id": 1, "type": "result", "success": true, "result": {"a": 1}}));
        assert_eq!(ok.unwrap(), json!({"a": 1}));

        let null = decode_result(&json!({"id": 1, "type": "result", "success": true}));
        assert_eq!(null.unwrap(), Value::Null);

        let err = decode_result(&json!({
            "id": 2, "type": "result", "success": false,
            "error": {"code": "not_found", "message": "Entry ID not found"}
        }))
        .unwrap_err();
        match err {
            ClientError::Rpc { code, message } => {
                assert_eq!(code, "not_found");
                assert_eq!(message, "Entry ID not found");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_result_numeric_code() {
        let err = decode_result(&json!({"success": false, "error": {"code": 403, "message": "x"}}))
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_route_reply_resolves_waiter() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();
        pending.lock().unwrap().insert(7, tx);

        route_reply(&pending, json!({"id": 8, "type": "result", "success": true}));
        assert!(rx.try_recv().is_err());

        route_reply(&pending, json!({"id": 7, "type": "result", "success": true, "result": 42}));
        assert_eq!(rx.try_recv().unwrap().unwrap(), json!(42));
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fail_all_drains() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();
        pending.lock().unwrap().insert(1, tx);
        fail_all(&pending, ClientError::Network("gone".into()));
        assert!(matches!(rx.try_recv().unwrap(), Err(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn test_mock_connection_queued_then_standing() {
        let mock = MockConnection::new();
        mock.respond("calorie_tracker/get_goals", json!({"goals": []}))
            .respond_once("calorie_tracker/get_goals", Err(ClientError::Unauthorized));

        let first = mock.call(json!({"type": "calorie_tracker/get_goals"})).await;
        assert!(matches!(first, Err(ClientError::Unauthorized)));
        let second = mock.call(json!({"type": "calorie_tracker/get_goals"})).await;
        assert_eq!(second.unwrap(), json!({"goals": []}));

        let unknown = mock.call(json!({"type": "nope"})).await;
        assert!(unknown.is_err());
        assert_eq!(mock.calls().len(), 3);
        assert_eq!(mock.calls_of("calorie_tracker/get_goals").len(), 2);
    }
}
