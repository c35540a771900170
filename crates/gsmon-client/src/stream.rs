//! Process output stream client.
//!
//! One [`StreamHandle`] corresponds to one live SSE connection to a backend
//! process (install job or game server). A background task owns the
//! connection and forwards [`StreamEvent`]s through the caller's channel;
//! closing the handle cancels the task at any await point, including
//! mid-backoff.
//!
//! Install streams reconnect on transport loss: the task waits
//! `attempt × base delay`, re-queries the backend's install status, and
//! either synthesizes the missed completion, reopens the stream, or gives
//! up when status cannot be obtained. Server streams do not reconnect —
//! a dropped server stream usually means the server stopped.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::sync::{mpsc, oneshot};

use gsmon_core::prelude::*;
use gsmon_core::{OutputEvent, ProcessKind, StreamMessage};

use crate::api::{ApiClient, InstallationStatus};
use crate::sse::SseParser;

/// Maximum consecutive reconnect attempts for install streams.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Base reconnect delay; attempt N waits N × this.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// What a stream task delivers to its subscriber.
#[derive(Debug)]
pub enum StreamEvent {
    /// The connection is established and events may follow
    Opened,

    /// A decoded output event
    Output(OutputEvent),

    /// The stream ended abnormally. The task has already stopped; when the
    /// error is fatal the session must not be resumed without an explicit
    /// user-initiated reconnect.
    Error(Error),
}

/// Handle to a live stream connection. Exclusively owned by one session.
#[derive(Debug)]
pub struct StreamHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    /// Close the connection. Idempotent: the cancel signal is consumed on
    /// first use and later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel_tx.is_none()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl StreamHandle {
    /// A handle with no stream task behind it, for tests that need a
    /// connection-shaped object without touching the network.
    pub fn new_for_test() -> Self {
        let (cancel_tx, _cancel_rx) = oneshot::channel();
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }
}

/// Opens and supervises process output streams for one backend.
#[derive(Debug, Clone)]
pub struct ProcessStreamClient {
    api: ApiClient,
    max_retries: u32,
    base_delay: Duration,
}

impl ProcessStreamClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            max_retries: MAX_RECONNECT_ATTEMPTS,
            base_delay: RETRY_BASE_DELAY,
        }
    }

    /// Override the reconnect policy (config-driven).
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Open a stream for `(id, kind)` and spawn its background task.
    ///
    /// Events arrive on `event_tx` in delivery order. The caller enforces
    /// at-most-one open connection per id by closing any previous handle
    /// before calling this.
    pub fn open(
        &self,
        id: &str,
        kind: ProcessKind,
        restart: bool,
        event_tx: mpsc::Sender<StreamEvent>,
    ) -> StreamHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let api = self.api.clone();
        let id = id.to_string();
        let max_retries = self.max_retries;
        let base_delay = self.base_delay;

        tokio::spawn(async move {
            let mut cancel_rx = cancel_rx;
            tokio::select! {
                _ = &mut cancel_rx => {
                    debug!("stream task for '{}' cancelled", id);
                }
                _ = stream_loop(&api, &id, kind, restart, max_retries, base_delay, &event_tx) => {}
            }
        });

        StreamHandle {
            cancel_tx: Some(cancel_tx),
        }
    }
}

/// How one connection ended.
enum ConnectionEnd {
    /// A `complete` event was delivered; nothing more will follow
    Complete,
    /// The subscriber went away; stop silently
    SubscriberGone,
    /// Unrecoverable, reported to the subscriber as-is
    Fatal(Error),
    /// Transport-level loss; install streams may reconnect
    TransportLost,
}

/// What to do after a transport loss, given the re-queried install status.
enum RetryDecision {
    /// The process finished while we were disconnected
    Complete { succeeded: bool },
    /// Still running — reopen the stream
    Reconnect,
    /// Status could not be obtained; presume the process dead
    GiveUp(Error),
}

fn decide_after_status(id: &str, status: Result<Option<InstallationStatus>>) -> RetryDecision {
    match status {
        Ok(Some(st)) if st.complete => RetryDecision::Complete {
            succeeded: st.succeeded(),
        },
        Ok(Some(_)) => RetryDecision::Reconnect,
        Ok(None) => RetryDecision::GiveUp(Error::status_unavailable(id)),
        Err(Error::Unauthorized) => RetryDecision::GiveUp(Error::Unauthorized),
        Err(err) => {
            warn!("status query for '{}' failed: {}", id, err);
            RetryDecision::GiveUp(Error::status_unavailable(id))
        }
    }
}

fn retry_delay(attempt: u32, base: Duration) -> Duration {
    base * attempt
}

async fn stream_loop(
    api: &ApiClient,
    id: &str,
    kind: ProcessKind,
    restart: bool,
    max_retries: u32,
    base_delay: Duration,
    event_tx: &mpsc::Sender<StreamEvent>,
) {
    let mut attempt: u32 = 0;

    loop {
        match run_connection(api, id, kind, restart, event_tx, &mut attempt).await {
            ConnectionEnd::Complete | ConnectionEnd::SubscriberGone => return,
            ConnectionEnd::Fatal(err) => {
                let _ = event_tx.send(StreamEvent::Error(err)).await;
                return;
            }
            ConnectionEnd::TransportLost => {
                if kind != ProcessKind::Install {
                    let _ = event_tx
                        .send(StreamEvent::Error(Error::transport(
                            "connection lost — the process may have stopped",
                        )))
                        .await;
                    return;
                }

                attempt += 1;
                if attempt > max_retries {
                    let _ = event_tx
                        .send(StreamEvent::Error(Error::RetryExhausted {
                            attempts: max_retries,
                        }))
                        .await;
                    return;
                }

                let delay = retry_delay(attempt, base_delay);
                let notice = OutputEvent::line(format!(
                    "connection lost, retrying in {}s ({}/{})...",
                    delay.as_secs(),
                    attempt,
                    max_retries
                ));
                if event_tx.send(StreamEvent::Output(notice)).await.is_err() {
                    return;
                }

                tokio::time::sleep(delay).await;

                match decide_after_status(id, api.installation_status(id).await) {
                    RetryDecision::Complete { succeeded } => {
                        let _ = event_tx
                            .send(StreamEvent::Output(OutputEvent::Complete {
                                succeeded,
                                message: None,
                            }))
                            .await;
                        return;
                    }
                    RetryDecision::Reconnect => {
                        info!("install '{}' still running, reconnecting", id);
                    }
                    RetryDecision::GiveUp(err) => {
                        let _ = event_tx.send(StreamEvent::Error(err)).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Run one connection until completion, loss, or cancellation.
///
/// `attempt` is reset to zero on every successfully decoded message so
/// only *consecutive* failures count against the retry cap.
async fn run_connection(
    api: &ApiClient,
    id: &str,
    kind: ProcessKind,
    restart: bool,
    event_tx: &mpsc::Sender<StreamEvent>,
    attempt: &mut u32,
) -> ConnectionEnd {
    let url = match api.stream_url(kind, id, restart) {
        Ok(url) => url,
        Err(err) => return ConnectionEnd::Fatal(err),
    };

    let response = match api.open_stream(url).await {
        Ok(response) => response,
        Err(err) => {
            warn!("stream connect for '{}' failed: {}", id, err);
            return ConnectionEnd::TransportLost;
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return ConnectionEnd::Fatal(Error::process_not_found(id));
    }
    if status == StatusCode::UNAUTHORIZED {
        return ConnectionEnd::Fatal(Error::Unauthorized);
    }
    if !status.is_success() {
        warn!("stream for '{}' rejected with {}", id, status);
        return ConnectionEnd::TransportLost;
    }

    if event_tx.send(StreamEvent::Opened).await.is_err() {
        return ConnectionEnd::SubscriberGone;
    }

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("stream read for '{}' failed: {}", id, err);
                return ConnectionEnd::TransportLost;
            }
        };

        for payload in parser.feed(&bytes) {
            match StreamMessage::parse(&payload) {
                Ok(message) => {
                    *attempt = 0;
                    if message.heartbeat.is_some() {
                        trace!("heartbeat on stream '{}'", id);
                    }
                    if message.is_heartbeat_only() {
                        continue;
                    }
                    for event in message.into_events() {
                        let complete = event.is_complete();
                        if event_tx.send(StreamEvent::Output(event)).await.is_err() {
                            return ConnectionEnd::SubscriberGone;
                        }
                        if complete {
                            return ConnectionEnd::Complete;
                        }
                    }
                }
                Err(err) => {
                    // A single bad message is reported inline, not fatal
                    warn!("undecodable message on stream '{}': {}", id, err);
                    let line =
                        OutputEvent::line(format!("failed to parse stream message: {err}"));
                    if event_tx.send(StreamEvent::Output(line)).await.is_err() {
                        return ConnectionEnd::SubscriberGone;
                    }
                }
            }
        }
    }

    debug!("stream for '{}' ended without completion", id);
    ConnectionEnd::TransportLost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delays_grow_linearly() {
        let base = Duration::from_secs(2);
        assert_eq!(retry_delay(1, base), Duration::from_secs(2));
        assert_eq!(retry_delay(2, base), Duration::from_secs(4));
        assert_eq!(retry_delay(3, base), Duration::from_secs(6));
    }

    #[test]
    fn test_decide_complete_with_zero_return_code() {
        let status = Ok(Some(InstallationStatus {
            complete: true,
            return_code: Some(0),
        }));
        match decide_after_status("g", status) {
            RetryDecision::Complete { succeeded } => assert!(succeeded),
            _ => panic!("expected Complete"),
        }
    }

    #[test]
    fn test_decide_complete_with_failure_return_code() {
        let status = Ok(Some(InstallationStatus {
            complete: true,
            return_code: Some(8),
        }));
        match decide_after_status("g", status) {
            RetryDecision::Complete { succeeded } => assert!(!succeeded),
            _ => panic!("expected Complete"),
        }
    }

    #[test]
    fn test_decide_reconnect_while_running() {
        let status = Ok(Some(InstallationStatus {
            complete: false,
            return_code: None,
        }));
        assert!(matches!(
            decide_after_status("g", status),
            RetryDecision::Reconnect
        ));
    }

    #[test]
    fn test_decide_give_up_when_status_missing() {
        match decide_after_status("g", Ok(None)) {
            RetryDecision::GiveUp(err) => {
                assert!(matches!(err, Error::StatusUnavailable { .. }));
                assert!(err.is_fatal());
            }
            _ => panic!("expected GiveUp"),
        }
    }

    #[test]
    fn test_decide_give_up_when_status_query_errors() {
        let status = Err(Error::transport("connection refused"));
        assert!(matches!(
            decide_after_status("g", status),
            RetryDecision::GiveUp(Error::StatusUnavailable { .. })
        ));
    }

    #[test]
    fn test_decide_unauthorized_is_not_retried() {
        assert!(matches!(
            decide_after_status("g", Err(Error::Unauthorized)),
            RetryDecision::GiveUp(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_handle_close_is_idempotent() {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let mut handle = StreamHandle {
            cancel_tx: Some(cancel_tx),
        };

        assert!(!handle.is_closed());
        handle.close();
        assert!(handle.is_closed());
        assert!(cancel_rx.try_recv().is_ok());

        // Second close must be a no-op, not a panic or double-send
        handle.close();
        assert!(handle.is_closed());
    }

    #[test]
    fn test_handle_drop_sends_cancel() {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        {
            let _handle = StreamHandle {
                cancel_tx: Some(cancel_tx),
            };
        }
        assert!(cancel_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_task_stops_before_connecting() {
        // Point at a port that refuses connections; cancel immediately.
        let api = ApiClient::new("http://127.0.0.1:1", None).unwrap();
        let client = ProcessStreamClient::new(api)
            .with_retry_policy(2, Duration::from_millis(10));
        let (event_tx, mut event_rx) = mpsc::channel(16);

        let mut handle = client.open("g", ProcessKind::Server, false, event_tx);
        handle.close();

        // After cancellation the channel drains and closes without a flood
        // of events; whatever raced through must at most be a single error.
        let mut received = 0;
        while event_rx.recv().await.is_some() {
            received += 1;
        }
        assert!(received <= 1);
    }
}
