//! Native WebSocket client: `tokio-tungstenite`.
//!
//! - Background tokio task owns the socket
//! - Application-level ping/pong heartbeat; a missed pong is a transport failure
//! - Fixed-delay reconnection (unbounded unless configured)
//! - Generation-stamped wire commands; stale ones are dropped
//! - Publishes queued while disconnected and flushed on reconnect
//! - Status published on a `watch` channel, events on an `mpsc` channel

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::ws::{
    ConnectionState, ConnectionStatus, Connector, Kind, MessageBus, MessageIn, MessageOut, Topic,
    WsConfig, WsEvent,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─── Commands from public API to background task ─────────────────────────────

enum Command {
    Wire { generation: u64, msg: MessageOut },
    Publish(MessageOut),
    Disconnect,
}

// ─── Disconnect reasons for reconnection decision ────────────────────────────

enum DisconnectReason {
    UserRequested,
    Lost { code: Option<u16>, reason: String },
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: WsConfig,
    credential: Option<String>,
    event_tx: mpsc::Sender<WsEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    status_tx: watch::Sender<ConnectionStatus>,
    pending_publishes: Vec<MessageOut>,
    reconnect_attempts: u32,
    generation: u64,
}

impl TaskState {
    async fn emit(&self, event: WsEvent) {
        // The receiver only disappears when the owner is shutting down.
        let _ = self.event_tx.send(event).await;
    }

    fn set_state(&self, state: ConnectionState) {
        self.status_tx.send_if_modified(|status| {
            if status.state == state {
                return false;
            }
            tracing::debug!(from = ?status.state, to = ?state, "Connection state change");
            status.state = state;
            true
        });
    }

    fn set_failed(&self, reason: &str) {
        self.status_tx.send_modify(|status| {
            status.state = ConnectionState::Closed;
            status.last_error = Some(reason.to_string());
        });
    }

    /// Sleep out the fixed reconnect delay. Returns `false` if the task should stop.
    async fn wait_before_reconnect(&mut self) -> bool {
        if !self.config.should_reconnect(self.reconnect_attempts) {
            tracing::info!(
                attempts = self.reconnect_attempts,
                "Reconnect disabled or attempts exhausted, staying closed"
            );
            return false;
        }

        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;
        self.status_tx
            .send_modify(|status| status.reconnect_attempt = attempt);

        let delay = Duration::from_millis(self.config.reconnect_delay_ms);
        tracing::info!(
            attempt,
            delay_ms = self.config.reconnect_delay_ms,
            "Reconnecting after fixed delay"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Wire { msg, .. }) => {
                        // The multiplexer replays its topics on the next Connected.
                        tracing::debug!(?msg, "Dropping wire command while disconnected");
                    }
                    Some(Command::Publish(msg)) => self.pending_publishes.push(msg),
                    Some(Command::Disconnect) | None => return false,
                }
            }
        }
    }
}

// ─── Public WsClient ─────────────────────────────────────────────────────────

/// Native WebSocket client using `tokio-tungstenite`.
///
/// Uses a background tokio task for connection management.
/// The public API communicates with it via mpsc channels.
pub struct WsClient {
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl WsClient {
    /// Spawn the connection task and start connecting.
    ///
    /// Must be called from within a tokio runtime. Returns the client and
    /// the receiver of [`WsEvent`]s; the receiver closes when the task ends.
    pub fn spawn(config: WsConfig, credential: Option<String>) -> (Self, mpsc::Receiver<WsEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());

        let state = TaskState {
            config,
            credential: credential.filter(|c| !c.is_empty()),
            event_tx,
            cmd_rx,
            status_tx,
            pending_publishes: Vec::new(),
            reconnect_attempts: 0,
            generation: 0,
        };

        let handle = tokio::spawn(run_task(state));

        (
            Self {
                cmd_tx,
                status_rx,
                task_handle: Mutex::new(Some(handle)),
            },
            event_rx,
        )
    }

    fn send_command(&self, cmd: Command) -> Result<(), WsError> {
        self.cmd_tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                WsError::SendFailed("Command channel full".into())
            }
            mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
        })
    }

    /// Whether the WebSocket is currently open.
    pub fn is_connected(&self) -> bool {
        self.status().state == ConnectionState::Open
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Close gracefully and wait (up to 5s) for the task to finish.
    pub async fn disconnect(&self) -> Result<(), WsError> {
        let _ = self.cmd_tx.send(Command::Disconnect).await;

        let handle = self
            .task_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
        Ok(())
    }
}

impl MessageBus for WsClient {
    fn send_wire(&self, generation: u64, msg: MessageOut) -> Result<(), WsError> {
        self.send_command(Command::Wire { generation, msg })
    }

    fn publish(&self, topic: &Topic, payload: serde_json::Value) -> Result<(), WsError> {
        self.send_command(Command::Publish(MessageOut::Publish {
            topic: topic.clone(),
            payload,
        }))
    }

    fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    fn close(&self) {
        if self.send_command(Command::Disconnect).is_err() {
            if let Some(handle) = self.task_handle.lock().ok().and_then(|mut g| g.take()) {
                handle.abort();
            }
        }
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.get_mut().ok().and_then(|h| h.take()) {
            handle.abort();
        }
    }
}

/// [`Connector`] that opens a native [`WsClient`] per credential.
#[derive(Debug, Clone)]
pub struct NativeConnector {
    config: WsConfig,
}

impl NativeConnector {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }
}

impl Connector for NativeConnector {
    fn open(
        &self,
        credential: &str,
    ) -> Result<(Arc<dyn MessageBus>, mpsc::Receiver<WsEvent>), WsError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(WsError::ConnectionFailed(
                "no tokio runtime available".into(),
            ));
        }
        let (client, events) = WsClient::spawn(self.config.clone(), Some(credential.to_string()));
        Ok((Arc::new(client), events))
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    loop {
        // ── 1. Attempt connection ────────────────────────────────────────
        state.set_state(ConnectionState::Connecting);
        let (mut sink, stream) =
            match attempt_connect(&state.config, state.credential.as_deref()).await {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::error!(url = %state.config.url, "WebSocket connection failed: {}", e);
                    state.set_failed(&e);
                    state.emit(WsEvent::Error(format!("Connection failed: {}", e))).await;
                    if state.wait_before_reconnect().await {
                        continue;
                    }
                    return;
                }
            };

        // ── 2. Connected ─────────────────────────────────────────────────
        state.generation += 1;
        state.reconnect_attempts = 0;
        state.status_tx.send_modify(|status| {
            status.state = ConnectionState::Open;
            status.last_error = None;
            status.reconnect_attempt = 0;
        });
        tracing::info!(generation = state.generation, "WebSocket connected");
        state
            .emit(WsEvent::Connected {
                generation: state.generation,
            })
            .await;

        // ── 3. Flush queued publishes ────────────────────────────────────
        flush_pending(&mut sink, &mut state.pending_publishes).await;

        // ── 4. Inner select! loop ────────────────────────────────────────
        let reason = run_connected(&mut state, sink, stream).await;

        // ── 5. Post-disconnect decision ──────────────────────────────────
        match reason {
            DisconnectReason::UserRequested => {
                state.set_state(ConnectionState::Closed);
                state
                    .emit(WsEvent::Disconnected {
                        code: Some(1000),
                        reason: "Client disconnect".into(),
                    })
                    .await;
                return;
            }
            DisconnectReason::Lost { code, reason } => {
                state.set_failed(&reason);
                state.emit(WsEvent::Disconnected { code, reason }).await;
                if !state.wait_before_reconnect().await {
                    return;
                }
            }
        }
    }
}

/// The inner connected loop. Runs until the connection breaks.
async fn run_connected(
    state: &mut TaskState,
    mut sink: SplitSink<WsStream, Message>,
    mut stream: SplitStream<WsStream>,
) -> DisconnectReason {
    let ping_dur = Duration::from_millis(state.config.heartbeat_interval_ms);
    let pong_dur = Duration::from_millis(state.config.heartbeat_timeout_ms);

    let mut ping_interval = tokio::time::interval(ping_dur);
    ping_interval.reset(); // skip immediate first tick

    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let far_future = tokio::time::Instant::now() + Duration::from_secs(86400);
    let pong_sleep = tokio::time::sleep_until(far_future);
    tokio::pin!(pong_sleep);

    loop {
        tokio::select! {
            // ── a) Incoming WS message ───────────────────────────────────
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text_str = text.as_str();
                        match serde_json::from_str::<MessageIn>(text_str) {
                            Ok(msg_in) => {
                                if matches!(msg_in.kind, Kind::Pong) {
                                    pong_deadline = None;
                                    pong_sleep.as_mut().reset(far_future);
                                }
                                state.emit(WsEvent::Message(msg_in.kind)).await;
                            }
                            Err(e) => {
                                tracing::warn!(raw = text_str, "WS deserialization error: {}", e);
                                state.emit(WsEvent::Error(format!("Deserialization error: {}", e))).await;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::info!(code, %reason, "Server closed the connection");
                        return DisconnectReason::Lost { code: Some(code), reason };
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::error!("WebSocket error: {}", reason);
                        return DisconnectReason::Lost { code: None, reason };
                    }
                    None => {
                        return DisconnectReason::Lost { code: None, reason: "Stream ended".into() };
                    }
                }
            }

            // ── b) Command from public API ───────────────────────────────
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Wire { generation, msg }) => {
                        if generation != state.generation {
                            tracing::debug!(
                                generation,
                                current = state.generation,
                                "Dropping wire command for a previous connection"
                            );
                            continue;
                        }
                        if let Err(e) = send_msg(&mut sink, &msg).await {
                            tracing::warn!("Send failed: {}", e);
                        }
                    }
                    Some(Command::Publish(msg)) => {
                        if let Err(e) = send_msg(&mut sink, &msg).await {
                            tracing::warn!("Publish failed, queueing for reconnect: {}", e);
                            state.pending_publishes.push(msg);
                        }
                    }
                    Some(Command::Disconnect) | None => {
                        state.set_state(ConnectionState::Closing);
                        let _ = sink.send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Client disconnect".into(),
                        }))).await;
                        return DisconnectReason::UserRequested;
                    }
                }
            }

            // ── c) Heartbeat ─────────────────────────────────────────────
            _ = ping_interval.tick() => {
                if let Err(e) = send_msg(&mut sink, &MessageOut::Ping).await {
                    tracing::warn!("Failed to send ping: {}", e);
                } else if pong_deadline.is_none() {
                    let deadline = tokio::time::Instant::now() + pong_dur;
                    pong_deadline = Some(deadline);
                    pong_sleep.as_mut().reset(deadline);
                }
            }

            // ── d) Missed heartbeat ──────────────────────────────────────
            () = &mut pong_sleep, if pong_deadline.is_some() => {
                tracing::warn!(
                    "Heartbeat timeout, no pong within {}ms",
                    state.config.heartbeat_timeout_ms
                );
                let _ = sink.close().await;
                return DisconnectReason::Lost { code: None, reason: "Heartbeat timeout".into() };
            }
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Attempt to establish a WebSocket connection, bounded by the connect timeout.
async fn attempt_connect(
    config: &WsConfig,
    credential: Option<&str>,
) -> Result<(SplitSink<WsStream, Message>, SplitStream<WsStream>), String> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| e.to_string())?;
    if let Some(token) = credential {
        let value =
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| e.to_string())?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let timeout = Duration::from_millis(config.connect_timeout_ms);
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(request))
        .await
        .map_err(|_| "Connection timeout".to_string())?
        .map_err(|e| e.to_string())?;

    Ok(ws_stream.split())
}

/// Serialize and send a MessageOut over the sink.
async fn send_msg(sink: &mut SplitSink<WsStream, Message>, msg: &MessageOut) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

async fn flush_pending(sink: &mut SplitSink<WsStream, Message>, pending: &mut Vec<MessageOut>) {
    if pending.is_empty() {
        return;
    }
    tracing::info!("Flushing {} pending publish(es)", pending.len());
    let messages = std::mem::take(pending);
    for msg in &messages {
        if let Err(e) = send_msg(sink, msg).await {
            tracing::warn!("Failed to flush pending publish: {}", e);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> WsConfig {
        WsConfig {
            // Port 1 is reserved and refuses connections on loopback.
            url: "ws://127.0.0.1:1/ws".into(),
            reconnect: false,
            connect_timeout_ms: 2_000,
            ..WsConfig::default()
        }
    }

    #[test]
    fn test_extract_close_with_frame() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "goodbye".into(),
        };
        let (code, reason) = extract_close(Some(&frame));
        assert_eq!(code, 1000);
        assert_eq!(reason, "goodbye");
    }

    #[test]
    fn test_extract_close_no_frame() {
        let (code, reason) = extract_close(None);
        assert_eq!(code, 1006);
        assert_eq!(reason, "No close frame");
    }

    #[tokio::test]
    async fn test_failed_connect_surfaces_as_status_not_error() {
        let (client, mut events) = WsClient::spawn(unreachable_config(), None);

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out")
            .expect("event stream ended early");
        assert!(matches!(event, WsEvent::Error(_)));

        // Task ends without reconnecting; the event stream closes.
        let end = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out");
        assert!(end.is_none());

        let status = client.status();
        assert_eq!(status.state, ConnectionState::Closed);
        assert!(status.last_error.is_some());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_send_after_task_ended_is_not_connected() {
        let (client, mut events) = WsClient::spawn(unreachable_config(), None);
        while events.recv().await.is_some() {}

        let result = client.send_wire(1, MessageOut::Ping);
        assert!(matches!(result, Err(WsError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_while_reconnecting_stops_task() {
        let config = WsConfig {
            reconnect: true,
            reconnect_delay_ms: 60_000,
            ..unreachable_config()
        };
        let (client, mut events) = WsClient::spawn(config, None);
        let _ = events.recv().await; // connection error

        client.disconnect().await.unwrap();
        let end = tokio::time::timeout(Duration::from_secs(5), async {
            while events.recv().await.is_some() {}
        })
        .await;
        assert!(end.is_ok(), "task should stop during the backoff wait");
        assert_eq!(client.status().reconnect_attempt, 1);
    }
}
