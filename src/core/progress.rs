//! Push channel for download progress
//!
//! One Socket.IO session at a time per client run. The server hands out a
//! session id during the handshake; the id goes along with every merge request
//! so the backend can route `progressUpdate` events back to this connection.
//! A dropped or silent connection is replaced in the background and the new id
//! is published to subscribers.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::socketio::{self, EnginePacket, SocketPacket};
use crate::error::{Result, SaverError};
use crate::types::DownloadProgress;

/// Server event carrying `{ progress, size }`
pub const PROGRESS_EVENT: &str = "progressUpdate";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshake bound and reconnect backoff
#[derive(Debug, Clone, Copy)]
pub struct ChannelOptions {
    /// Limit on TCP connect, WebSocket upgrade and Socket.IO handshake together
    pub handshake_timeout: Duration,
    /// Wait before the first reconnect attempt; doubles after each failure
    pub reconnect_delay: Duration,
    pub reconnect_delay_max: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(5),
        }
    }
}

/// Build the WebSocket transport URL for a Socket.IO origin
pub fn socket_endpoint(origin: &str) -> Result<Url> {
    let mut url = Url::parse(origin)
        .map_err(|e| SaverError::InvalidConfig(format!("bad push origin '{origin}': {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SaverError::InvalidConfig(format!(
                "unsupported push origin scheme '{other}'"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SaverError::InvalidConfig(format!("cannot use '{origin}' as a push origin")))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// Extract `{ progress, size }` from an event payload; both must be present
pub fn progress_from_event(data: &Value) -> Option<DownloadProgress> {
    let progress = match data.get("progress")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let size = match data.get("size")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(DownloadProgress { progress, size })
}

/// A live subscription to the backend's progress events
pub struct ProgressChannel {
    sessions: watch::Receiver<String>,
    updates: watch::Receiver<Option<DownloadProgress>>,
    connected: watch::Receiver<bool>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ProgressChannel {
    /// Connect to `origin` and complete the Socket.IO handshake
    pub async fn connect(origin: &str) -> Result<Self> {
        Self::connect_with(origin, ChannelOptions::default()).await
    }

    pub async fn connect_with(origin: &str, options: ChannelOptions) -> Result<Self> {
        let endpoint = socket_endpoint(origin)?;
        debug!(%endpoint, "Opening push channel");

        let session = open_session(&endpoint, options.handshake_timeout).await?;
        info!(sid = %session.sid, "Push channel connected");

        let (sessions_tx, sessions) = watch::channel(session.sid.clone());
        let (updates_tx, updates) = watch::channel(None);
        let (connected_tx, connected) = watch::channel(true);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let feeds = Feeds {
            sessions: sessions_tx,
            updates: updates_tx,
            connected: connected_tx,
        };
        let task = tokio::spawn(supervise(endpoint, options, session, feeds, shutdown_rx));

        Ok(Self {
            sessions,
            updates,
            connected,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Session id of the current connection, to echo back on merge requests
    pub fn session_id(&self) -> String {
        self.sessions.borrow().clone()
    }

    /// Every id the channel is issued, starting with the current one
    pub fn subscribe_sessions(&self) -> watch::Receiver<String> {
        self.sessions.clone()
    }

    /// Latest progress; every event overwrites the previous one
    pub fn subscribe(&self) -> watch::Receiver<Option<DownloadProgress>> {
        self.updates.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Leave the namespace, close the socket and wait for the background task to stop
    pub async fn disconnect(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("Push channel task ended abnormally: {}", e);
        }
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Publishing side of the channel's watch feeds
struct Feeds {
    sessions: watch::Sender<String>,
    updates: watch::Sender<Option<DownloadProgress>>,
    connected: watch::Sender<bool>,
}

/// One handshaken connection
struct Session {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    sid: String,
    /// `pingInterval + pingTimeout`; silence longer than this means the link is gone
    heartbeat: Option<Duration>,
}

enum Ended {
    /// Local `disconnect`
    Shutdown,
    /// Server left the namespace on purpose; not retried
    Kicked,
    /// Transport closed, failed or went silent
    Lost,
}

fn text_frame(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        _ => None,
    }
}

async fn open_session(endpoint: &Url, limit: Duration) -> Result<Session> {
    timeout(limit, async {
        let (ws, _) = connect_async(endpoint.as_str()).await?;
        let (mut sink, mut stream) = ws.split();
        let (sid, heartbeat) = handshake(&mut sink, &mut stream).await?;
        Ok::<_, SaverError>(Session {
            sink,
            stream,
            sid,
            heartbeat,
        })
    })
    .await
    .map_err(|_| SaverError::Protocol("handshake timed out".into()))?
}

async fn handshake(
    sink: &mut SplitSink<WsStream, Message>,
    stream: &mut SplitStream<WsStream>,
) -> Result<(String, Option<Duration>)> {
    let mut heartbeat = None;

    while let Some(message) = stream.next().await {
        let Some(frame) = text_frame(message?) else {
            continue;
        };

        match EnginePacket::parse(&frame)? {
            EnginePacket::Open(open) => {
                debug!(engine_sid = %open.sid, ping_interval = open.ping_interval, "Engine.IO open");
                if open.ping_interval > 0 {
                    heartbeat = Some(Duration::from_millis(open.ping_interval + open.ping_timeout));
                }
                sink.send(Message::text(socketio::encode_connect())).await?;
            }
            EnginePacket::Ping => {
                sink.send(Message::text(socketio::encode_pong())).await?;
            }
            EnginePacket::Message(SocketPacket::Connect { sid }) => return Ok((sid, heartbeat)),
            EnginePacket::Message(SocketPacket::ConnectError(reason)) => {
                return Err(SaverError::Protocol(format!("connection refused: {reason}")));
            }
            EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect) => {
                return Err(SaverError::Protocol("closed during handshake".into()));
            }
            _ => {}
        }
    }

    Err(SaverError::Protocol("connection ended during handshake".into()))
}

/// Background task: listen, and replace the session whenever it is lost
async fn supervise(
    endpoint: Url,
    options: ChannelOptions,
    mut session: Session,
    feeds: Feeds,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        match listen(&mut session, &feeds.updates, &mut shutdown).await {
            Ended::Shutdown => break,
            Ended::Kicked => {
                info!(sid = %session.sid, "Server closed the push session");
                break;
            }
            Ended::Lost => {}
        }
        feeds.connected.send_replace(false);
        warn!(sid = %session.sid, "Push channel lost, reconnecting");

        let Some(next) = reconnect(&endpoint, &options, &mut shutdown).await else {
            break;
        };
        info!(sid = %next.sid, "Push channel reconnected");
        feeds.sessions.send_replace(next.sid.clone());
        feeds.connected.send_replace(true);
        session = next;
    }

    feeds.connected.send_replace(false);
    info!("Push channel disconnected");
}

/// Retry with doubling delays until a session opens; `None` on shutdown
async fn reconnect(
    endpoint: &Url,
    options: &ChannelOptions,
    shutdown: &mut oneshot::Receiver<()>,
) -> Option<Session> {
    let mut delay = options.reconnect_delay;

    loop {
        tokio::select! {
            _ = &mut *shutdown => return None,
            _ = sleep(delay) => {}
        }
        tokio::select! {
            _ = &mut *shutdown => return None,
            result = open_session(endpoint, options.handshake_timeout) => match result {
                Ok(session) => return Some(session),
                Err(e) => debug!(?delay, "Reconnect attempt failed: {}", e),
            }
        }
        delay = (delay * 2).min(options.reconnect_delay_max);
    }
}

async fn listen(
    session: &mut Session,
    updates: &watch::Sender<Option<DownloadProgress>>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Ended {
    let silence = sleep(session.heartbeat.unwrap_or_default());
    tokio::pin!(silence);

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = session.sink.send(Message::text(socketio::encode_disconnect())).await;
                let _ = session.sink.close().await;
                return Ended::Shutdown;
            }
            _ = &mut silence, if session.heartbeat.is_some() => {
                warn!("No ping from server within the heartbeat window");
                return Ended::Lost;
            }
            message = session.stream.next() => {
                let frame = match message {
                    Some(Ok(message)) => match text_frame(message) {
                        Some(frame) => frame,
                        None => continue,
                    },
                    Some(Err(e)) => {
                        warn!("Push channel read failed: {}", e);
                        return Ended::Lost;
                    }
                    None => return Ended::Lost,
                };

                match EnginePacket::parse(&frame) {
                    Ok(EnginePacket::Ping) => {
                        if let Some(window) = session.heartbeat {
                            silence.as_mut().reset(Instant::now() + window);
                        }
                        if session.sink.send(Message::text(socketio::encode_pong())).await.is_err() {
                            return Ended::Lost;
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Event { name, data })) => {
                        if name != PROGRESS_EVENT {
                            continue;
                        }
                        if let Some(progress) = progress_from_event(&data) {
                            debug!(progress = progress.progress, size = %progress.size, "Progress update");
                            updates.send_replace(Some(progress));
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Disconnect)) => return Ended::Kicked,
                    Ok(EnginePacket::Close) => return Ended::Lost,
                    Ok(_) => {}
                    Err(e) => debug!("Ignoring push frame: {}", e),
                }
            }
        }
    }
}
