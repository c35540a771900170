//! Keyed collection of live terminal sessions.
//!
//! The registry is the single owner of all [`TerminalSession`]s and the
//! only place that mutates them, so readers never observe a session mid
//! update. Stream events from every open connection are funneled into one
//! channel tagged with the session id; the application loop drains it and
//! routes each event back through [`SessionRegistry::apply_event`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use gsmon_client::{control, ApiClient, ProcessStreamClient, StreamEvent};
use gsmon_core::prelude::*;
use gsmon_core::{OutputEvent, ProcessKind};

use crate::session::TerminalSession;

/// Capacity of the shared session event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Input/termination handler for [`ProcessKind::Custom`] sessions.
///
/// The install and server protocols are closed implementations; custom
/// sessions are the one deliberately open extension point.
pub trait CustomHandler: Send + Sync {
    fn send<'a>(&'a self, id: &'a str, value: &'a str) -> BoxFuture<'a, bool>;
    fn terminate<'a>(&'a self, id: &'a str, force: bool) -> BoxFuture<'a, bool>;
}

/// An event as delivered to the application loop: which session, and what
/// happened on its stream.
pub type SessionEvent = (String, StreamEvent);

/// Owns every terminal session and its connection.
pub struct SessionRegistry {
    api: ApiClient,
    stream: ProcessStreamClient,
    sessions: HashMap<String, TerminalSession>,
    custom_handlers: HashMap<String, Arc<dyn CustomHandler>>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .field("custom_handlers", &self.custom_handlers.len())
            .finish()
    }
}

impl SessionRegistry {
    /// Create a registry plus the receiving end of its session event
    /// channel. The caller drains the receiver and feeds every event back
    /// through [`apply_event`](Self::apply_event).
    pub fn new(api: ApiClient, stream: ProcessStreamClient) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                api,
                stream,
                sessions: HashMap::new(),
                custom_handlers: HashMap::new(),
                event_tx,
            },
            event_rx,
        )
    }

    /// Create a session for a process id. Ids are unique.
    pub fn create(&mut self, id: &str, kind: ProcessKind) -> Result<()> {
        if self.sessions.contains_key(id) {
            return Err(Error::config(format!("session '{id}' already exists")));
        }
        self.sessions
            .insert(id.to_string(), TerminalSession::new(id, kind));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TerminalSession> {
        self.sessions.get(id)
    }

    /// Remove a session, force-closing its connection first. Events still
    /// in flight for this id are dropped by [`apply_event`](Self::apply_event).
    pub fn remove(&mut self, id: &str) -> Option<TerminalSession> {
        self.custom_handlers.remove(id);
        let mut session = self.sessions.remove(id)?;
        session.disconnect();
        Some(session)
    }

    /// Route one stream event to its session. Events for unknown (removed)
    /// ids are discarded.
    pub fn apply_event(&mut self, id: &str, event: StreamEvent) {
        match self.sessions.get_mut(id) {
            Some(session) => session.apply(event),
            None => trace!("dropping event for removed session '{}'", id),
        }
    }

    /// Open the output stream for a session, closing any previous
    /// connection first (at most one per id).
    pub fn connect(&mut self, id: &str, restart: bool) -> Result<()> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::config(format!("no session '{id}'")))?;
        if session.kind == ProcessKind::Custom {
            return Err(Error::config("custom sessions have no backend stream"));
        }

        // Per-session channel, forwarded into the shared one tagged with
        // the session id.
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = self.stream.open(id, session.kind, restart, tx);
        session.attach(handle);

        let shared = self.event_tx.clone();
        let session_id = id.to_string();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if shared.send((session_id.clone(), event)).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }

    /// Force-close a session's connection; output is retained.
    pub fn disconnect(&mut self, id: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.disconnect();
        }
    }

    /// Empty a session's output log.
    pub fn clear(&mut self, id: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.clear();
        }
    }

    /// Send one line of input to a session's process.
    ///
    /// Failures are reported inline on the session's output and returned
    /// as `false` — they never propagate as faults.
    pub async fn send_input(&mut self, id: &str, value: &str) -> bool {
        let Some(session) = self.sessions.get(id) else {
            warn!("send_input for unknown session '{}'", id);
            return false;
        };
        let kind = session.kind;

        let result = match (kind, self.custom_handlers.get(id)) {
            (ProcessKind::Custom, Some(handler)) => Ok(handler.send(id, value).await),
            _ => control::send_input(&self.api, kind, id, value).await,
        };

        match result {
            Ok(sent) => {
                if sent {
                    if let Some(session) = self.sessions.get_mut(id) {
                        session.prompt_answered();
                    }
                }
                sent
            }
            Err(err) => {
                self.report_failure(id, &err);
                false
            }
        }
    }

    /// Terminate a session's process. On success the session is marked
    /// complete and its connection closed.
    pub async fn terminate(&mut self, id: &str, force: bool) -> bool {
        let Some(session) = self.sessions.get(id) else {
            warn!("terminate for unknown session '{}'", id);
            return false;
        };
        let kind = session.kind;

        let result = match (kind, self.custom_handlers.get(id)) {
            (ProcessKind::Custom, Some(handler)) => Ok(handler.terminate(id, force).await),
            _ => control::terminate(&self.api, kind, id, force).await,
        };

        match result {
            Ok(true) => {
                if let Some(session) = self.sessions.get_mut(id) {
                    session.mark_terminated();
                }
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.report_failure(id, &err);
                false
            }
        }
    }

    /// Register the handler backing a [`ProcessKind::Custom`] session.
    pub fn register_custom_handler(&mut self, id: &str, handler: Arc<dyn CustomHandler>) {
        self.custom_handlers.insert(id.to_string(), handler);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterate sessions in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &TerminalSession> {
        self.sessions.values()
    }

    fn report_failure(&mut self, id: &str, err: &Error) {
        error!("operation on session '{}' failed: {}", id, err);
        if let Some(session) = self.sessions.get_mut(id) {
            session.output.push(OutputEvent::line(err.to_string()));
        }
    }
}
