//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpEvent, CdpMessage, CdpRequest, TargetInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>;

/// Capacity of the event fan-out; slow subscribers skip ahead.
const EVENT_BUFFER: usize = 256;

/// Socket shared by the browser client and every page session.
pub(crate) struct Connection {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: PendingMap,
    events: broadcast::Sender<CdpEvent>,
    command_timeout: Duration,
}

impl Connection {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        // Params may carry secrets typed into the extension; log the method only.
        trace!(id, method, "CDP send");

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }
}

/// CDP client attached to the browser endpoint.
pub struct CdpClient {
    http_endpoint: String,
    conn: Arc<Connection>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at `endpoint` (e.g. "http://127.0.0.1:9333").
    pub async fn connect(endpoint: &str, command_timeout: Duration) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let conn = Arc::new(Connection {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            events,
            command_timeout,
        });

        let recv_task = {
            let conn = conn.clone();
            tokio::spawn(async move {
                receive_loop(ws_source, conn).await;
            })
        };

        Ok(Self {
            http_endpoint,
            conn,
            recv_task,
        })
    }

    pub fn http_endpoint(&self) -> &str {
        &self.http_endpoint
    }

    /// Browser-level command (no session).
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.conn.call(method, params, None).await
    }

    /// Receive every event arriving after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.conn.subscribe()
    }

    /// Emit `Target.targetCreated` / `Target.targetDestroyed` for all targets.
    pub async fn discover_targets(&self) -> Result<(), CdpError> {
        self.call("Target.setDiscoverTargets", Some(json!({"discover": true})))
            .await?;
        Ok(())
    }

    /// Grant browser permissions to an origin.
    pub async fn grant_permissions(&self, origin: &str, permissions: &[&str]) -> Result<(), CdpError> {
        self.call(
            "Browser.grantPermissions",
            Some(json!({"origin": origin, "permissions": permissions})),
        )
        .await?;
        Ok(())
    }

    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        let targets: Vec<TargetInfo> = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets)
    }

    /// Open a new tab and attach to it.
    pub async fn new_page(&self, url: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call("Target.createTarget", Some(json!({"url": url})))
            .await?;
        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))?
            .to_string();
        debug!("Created new page {}", target_id);
        self.attach(&target_id).await
    }

    /// Attach to an existing target (e.g. a popup window).
    pub async fn attach(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let session = PageSession::new(target_id.to_string(), session_id, self.conn.clone());
        session.enable_domains().await?;
        Ok(session)
    }

    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }

    /// Ask the browser to exit. The socket closes underneath the reply, so a
    /// missing response is expected.
    pub async fn close_browser(&self) {
        match self.call("Browser.close", None).await {
            Ok(_) | Err(CdpError::SessionClosed) => {}
            Err(e) => debug!("Browser.close: {}", e),
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// WebSocket receive loop: route responses to callers, fan out events.
async fn receive_loop(mut ws_source: WsSource, conn: Arc<Connection>) {
    while let Some(msg) = ws_source.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                trace!("CDP recv: {}", text.as_str());
                match serde_json::from_str::<CdpMessage>(text.as_str()) {
                    Ok(message) => dispatch(&conn, message),
                    Err(e) => warn!("Failed to parse CDP message: {}", e),
                }
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket closed");
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    // Dropping the senders fails every outstanding call with SessionClosed.
    conn.pending.lock().clear();
}

fn dispatch(conn: &Connection, message: CdpMessage) {
    if let Some(id) = message.id {
        let waiter = conn.pending.lock().remove(&id);
        if let Some(tx) = waiter {
            let result = match message.error {
                Some(error) => Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(message.result.unwrap_or(Value::Null)),
            };
            let _ = tx.send(result);
        }
    } else if let Some(method) = message.method {
        let _ = conn.events.send(CdpEvent {
            method,
            params: message.params.unwrap_or(Value::Null),
            session_id: message.session_id,
        });
    }
}
