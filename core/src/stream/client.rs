/// Reconnecting stream client
///
/// One driver task per client owns the connection and performs every state
/// transition in sequence: connect, read frames, and on drop schedule a retry
/// from the bounded budget. Transport failures consume the budget; payloads
/// that fail to decode are logged and discarded without touching the
/// connection.
use super::backoff::RetryBudget;
use super::config::StreamConfig;
use super::payload::LatestPayload;
use super::state::{ConnectionState, StreamStatus};
use super::transport::{Frame, StreamConnection, StreamTransport};
use crate::AgisError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a connected session ended
enum SessionEnd {
    Closed,
    Failed(AgisError),
    Shutdown,
}

/// Driver state for one stream client
pub struct StreamClient {
    config: StreamConfig,
    transport: Arc<dyn StreamTransport>,
    status: watch::Sender<StreamStatus>,
    latest: Arc<LatestPayload>,
    shutdown: watch::Receiver<bool>,
}

impl StreamClient {
    /// Start the driver task and return its handle
    pub fn spawn(config: StreamConfig, transport: Arc<dyn StreamTransport>) -> StreamHandle {
        let (status_tx, status_rx) = watch::channel(StreamStatus::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let latest = Arc::new(LatestPayload::new());

        let client = StreamClient {
            config,
            transport,
            status: status_tx,
            latest: Arc::clone(&latest),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(client.run());

        StreamHandle {
            status: status_rx,
            latest,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        let url = self.config.url.clone();
        let mut budget = RetryBudget::from_config(&self.config);

        info!(
            target: "stream_client",
            url = %url,
            max_attempts = self.config.max_attempts,
            "Starting stream client"
        );

        loop {
            self.update(|s| {
                s.state = ConnectionState::Connecting;
                s.next_retry = None;
            });

            let opened = tokio::select! {
                res = self.transport.open(&self.config.url, self.config.connect_timeout) => res,
                _ = wait_shutdown(&mut self.shutdown) => break,
            };

            match opened {
                Ok(mut conn) => {
                    budget.reset();
                    self.update(|s| {
                        s.state = ConnectionState::Connected;
                        s.attempt = 0;
                    });
                    info!(target: "stream_client", url = %url, "Stream connected");

                    let end = self.session(conn.as_mut()).await;
                    conn.close().await;
                    drop(conn);

                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Closed => {
                            info!(target: "stream_client", url = %url, "Stream closed by peer");
                        }
                        SessionEnd::Failed(e) => {
                            warn!(target: "stream_client", url = %url, error = %e, "Stream error");
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        target: "stream_client",
                        url = %url,
                        error = %e,
                        "Connection attempt failed"
                    );
                }
            }

            match budget.next_delay() {
                Some(delay) => {
                    let attempt = budget.attempt();
                    self.update(|s| {
                        s.state = ConnectionState::Disconnected;
                        s.attempt = attempt;
                        s.next_retry = Some(delay);
                    });
                    info!(
                        target: "stream_client",
                        url = %url,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Scheduling reconnect"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = wait_shutdown(&mut self.shutdown) => break,
                    }
                }
                None => {
                    self.update(|s| {
                        s.state = ConnectionState::Disconnected;
                        s.next_retry = None;
                        s.exhausted = true;
                    });
                    warn!(
                        target: "stream_client",
                        url = %url,
                        attempts = budget.attempt(),
                        "Retry budget exhausted; staying disconnected"
                    );
                    return;
                }
            }
        }

        self.update(|s| {
            s.state = ConnectionState::Disconnected;
            s.next_retry = None;
        });
        debug!(target: "stream_client", url = %url, "Stream client torn down");
    }

    async fn session(&mut self, conn: &mut dyn StreamConnection) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                frame = conn.next_frame() => frame,
                _ = wait_shutdown(&mut self.shutdown) => return SessionEnd::Shutdown,
            };

            match frame {
                Ok(Some(frame)) => self.on_message(frame),
                Ok(None) => return SessionEnd::Closed,
                Err(e) => return SessionEnd::Failed(e),
            }
        }
    }

    fn on_message(&self, frame: Frame) {
        let decoded = match &frame {
            Frame::Text(text) => self.latest.apply_text(text),
            Frame::Binary(bytes) => self.latest.apply_bytes(bytes),
        };

        match decoded {
            Ok(()) => self.update(|s| {
                s.messages_received += 1;
                s.last_message_at = Some(Utc::now());
            }),
            Err(e) => {
                warn!(
                    target: "stream_client",
                    error = %e,
                    "Discarding malformed payload"
                );
                self.update(|s| s.decode_failures += 1);
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut StreamStatus)) {
        self.status.send_modify(f);
    }
}

/// Resolves once shutdown is requested or the handle is gone
async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Owner's handle to a running stream client.
///
/// Dropping the handle tears the client down as well.
pub struct StreamHandle {
    status: watch::Receiver<StreamStatus>,
    latest: Arc<LatestPayload>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Latest successfully decoded payload
    pub fn latest(&self) -> Option<Value> {
        self.latest.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    pub fn subscribe_payload(&self) -> watch::Receiver<Option<Value>> {
        self.latest.subscribe()
    }

    /// Driver has stopped (torn down or budget exhausted)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Cancel any pending retry, close the open connection and wait for the
    /// driver to stop
    pub async fn teardown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(target: "stream_client", error = %e, "Stream driver task failed");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
