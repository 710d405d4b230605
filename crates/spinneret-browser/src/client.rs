//! CDP websocket client.
//!
//! One websocket carries every command for the browser and all of its page
//! sessions. Responses are matched to callers by request id through a
//! pending map; protocol events are not consumed here - pages poll state
//! with `Runtime.evaluate` instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::BrowserError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending request waiting for its response.
struct PendingRequest {
  tx: oneshot::Sender<Result<Value, BrowserError>>,
}

/// An incoming protocol message: a command response or an event.
#[derive(Debug, Deserialize)]
struct CdpMessage {
  id: Option<u64>,
  result: Option<Value>,
  error: Option<CdpErrorBody>,
  method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CdpErrorBody {
  code: i64,
  message: String,
}

/// Shared command channel to one browser process.
#[derive(Clone)]
pub(crate) struct CdpClient {
  ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
  pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
  next_id: Arc<AtomicU64>,
  recv_task: Arc<tokio::task::JoinHandle<()>>,
}

impl CdpClient {
  /// Connect to the browser websocket and start the receive loop.
  pub(crate) async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
      .await
      .map_err(|e| BrowserError::ConnectionFailed(format!("websocket: {e}")))?;

    let (ws_sink, ws_source) = ws_stream.split();
    let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));

    let recv_task = {
      let pending = pending.clone();
      tokio::spawn(async move {
        Self::receive_loop(ws_source, pending).await;
      })
    };

    debug!(url = %ws_url, "cdp client connected");

    Ok(Self {
      ws_tx: Arc::new(tokio::sync::Mutex::new(ws_sink)),
      pending,
      next_id: Arc::new(AtomicU64::new(1)),
      recv_task: Arc::new(recv_task),
    })
  }

  /// Websocket receive loop; resolves pending commands, drops events.
  async fn receive_loop(mut source: WsSource, pending: Arc<Mutex<HashMap<u64, PendingRequest>>>) {
    while let Some(msg) = source.next().await {
      match msg {
        Ok(Message::Text(text)) => {
          trace!(payload = %text, "cdp recv");
          let parsed: CdpMessage = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
              warn!(error = %e, "unparseable cdp message");
              continue;
            }
          };
          if let Some(id) = parsed.id {
            if let Some(request) = pending.lock().remove(&id) {
              let result = match parsed.error {
                Some(error) => Err(BrowserError::Protocol {
                  code: error.code,
                  message: error.message,
                }),
                None => Ok(parsed.result.unwrap_or(Value::Null)),
              };
              let _ = request.tx.send(result);
            }
          } else if let Some(method) = parsed.method {
            trace!(%method, "cdp event ignored");
          }
        }
        Ok(Message::Close(_)) => {
          debug!("cdp websocket closed");
          break;
        }
        Err(e) => {
          warn!(error = %e, "cdp websocket error");
          break;
        }
        _ => {}
      }
    }

    // Anything still waiting will never get an answer.
    for (_, request) in pending.lock().drain() {
      let _ = request.tx.send(Err(BrowserError::SessionClosed));
    }
  }

  /// Send a command and wait for its response.
  pub(crate) async fn call(
    &self,
    method: &str,
    params: Value,
    session_id: Option<&str>,
  ) -> Result<Value, BrowserError> {
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);

    let mut request = serde_json::json!({
      "id": id,
      "method": method,
    });
    if !params.is_null() {
      request["params"] = params;
    }
    if let Some(session_id) = session_id {
      request["sessionId"] = Value::String(session_id.to_string());
    }

    let payload = serde_json::to_string(&request)?;
    trace!(payload = %payload, "cdp send");

    let (tx, rx) = oneshot::channel();
    self.pending.lock().insert(id, PendingRequest { tx });

    {
      let mut ws = self.ws_tx.lock().await;
      ws.send(Message::Text(payload.into()))
        .await
        .map_err(|e| BrowserError::ConnectionFailed(format!("send: {e}")))?;
    }

    match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
      Ok(Ok(result)) => result,
      Ok(Err(_)) => Err(BrowserError::SessionClosed),
      Err(_) => {
        self.pending.lock().remove(&id);
        Err(BrowserError::Timeout(format!("command {method}")))
      }
    }
  }

  /// Stop the receive loop. Pending commands fail with `SessionClosed`.
  pub(crate) fn shutdown(&self) {
    self.recv_task.abort();
    for (_, request) in self.pending.lock().drain() {
      let _ = request.tx.send(Err(BrowserError::SessionClosed));
    }
  }
}
