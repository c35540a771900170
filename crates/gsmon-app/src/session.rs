//! Per-process terminal session state.
//!
//! A session accumulates everything a UI needs to render one process
//! console: the ordered output log, the loading/complete flags, and the
//! last unanswered interactive prompt. It also exclusively owns the live
//! stream connection, so closing is always routed through exactly one
//! place.

use chrono::{DateTime, Local};

use gsmon_client::{StreamEvent, StreamHandle};
use gsmon_core::prelude::*;
use gsmon_core::{OutputEvent, ProcessKind};

/// State container for one monitored process.
///
/// Lifecycle: `Idle → Connecting/Streaming → Complete`, where `Complete`
/// is reached on a completion event, a fatal stream error, or a successful
/// terminate. Output survives disconnects and completion; only an explicit
/// [`clear`](TerminalSession::clear) empties it.
#[derive(Debug)]
pub struct TerminalSession {
    /// Backend process identifier (game id)
    pub id: String,

    /// Which input/termination protocol applies
    pub kind: ProcessKind,

    /// Ordered output log; append-only while the session lives
    pub output: Vec<OutputEvent>,

    /// True while a stream is open and not yet complete
    pub loading: bool,

    /// Terminal state: no further events accepted without an explicit
    /// reconnect
    pub complete: bool,

    /// When this session was created
    pub created_at: DateTime<Local>,

    /// Last prompt that has not been answered yet
    awaiting_input: Option<String>,

    /// The live stream connection, exclusively owned
    connection: Option<StreamHandle>,
}

impl TerminalSession {
    pub fn new(id: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            id: id.into(),
            kind,
            output: Vec::new(),
            loading: false,
            complete: false,
            created_at: Local::now(),
            awaiting_input: None,
            connection: None,
        }
    }

    /// True when no connection is open and nothing is in flight
    pub fn is_idle(&self) -> bool {
        self.connection.is_none() && !self.loading
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// The prompt text currently waiting for user input, if any
    pub fn awaiting_input(&self) -> Option<&str> {
        self.awaiting_input.as_deref()
    }

    /// Attach a fresh stream connection, force-closing any previous one
    /// (at most one open connection per process id).
    ///
    /// This is the explicit-reconnect path, so a completed session comes
    /// back to life here.
    pub(crate) fn attach(&mut self, handle: StreamHandle) {
        self.close_connection();
        self.connection = Some(handle);
        self.loading = true;
        self.complete = false;
    }

    /// Apply one stream event, in arrival order.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Opened => {
                debug!("session '{}': stream open", self.id);
                self.loading = true;
            }
            StreamEvent::Output(output) => {
                match &output {
                    OutputEvent::Prompt { text } => {
                        self.awaiting_input = Some(text.clone());
                    }
                    OutputEvent::Complete { succeeded, .. } => {
                        info!("session '{}' complete (succeeded: {})", self.id, succeeded);
                        self.loading = false;
                        self.complete = true;
                        self.close_connection();
                    }
                    OutputEvent::Line { .. } => {}
                }
                self.output.push(output);
            }
            StreamEvent::Error(err) => {
                warn!("session '{}' stream error: {}", self.id, err);
                self.loading = false;
                if err.is_fatal() {
                    self.complete = true;
                }
                self.close_connection();
                self.output.push(OutputEvent::line(err.to_string()));
            }
        }
    }

    /// Record that the pending prompt was answered.
    pub fn prompt_answered(&mut self) {
        self.awaiting_input = None;
    }

    /// Empty the output log. Valid in any state; flags are untouched.
    pub fn clear(&mut self) {
        self.output.clear();
    }

    /// Force-close the connection and return to idle (unless already
    /// complete). Output is retained. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.close_connection();
        self.loading = false;
    }

    /// Mark the session finished after a successful terminate request.
    pub(crate) fn mark_terminated(&mut self) {
        self.loading = false;
        self.complete = true;
        self.close_connection();
    }

    fn close_connection(&mut self) {
        if let Some(mut handle) = self.connection.take() {
            handle.close();
        }
    }

    /// Rendered line count (for display headers)
    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> StreamEvent {
        StreamEvent::Output(OutputEvent::line(text))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = TerminalSession::new("mc-vanilla", ProcessKind::Server);
        assert!(session.is_idle());
        assert!(!session.loading);
        assert!(!session.complete);
        assert!(session.is_empty());
    }

    #[test]
    fn test_output_preserves_arrival_order() {
        let mut session = TerminalSession::new("g", ProcessKind::Install);
        for i in 0..5 {
            session.apply(line(&format!("line {i}")));
        }
        let texts: Vec<_> = session
            .output
            .iter()
            .filter_map(|e| e.text().map(str::to_string))
            .collect();
        assert_eq!(texts, vec!["line 0", "line 1", "line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_prompt_sets_awaiting_input() {
        let mut session = TerminalSession::new("g", ProcessKind::Install);
        session.apply(StreamEvent::Output(OutputEvent::Prompt {
            text: "Steam Guard code:".to_string(),
        }));
        assert_eq!(session.awaiting_input(), Some("Steam Guard code:"));

        session.prompt_answered();
        assert_eq!(session.awaiting_input(), None);
        // The prompt stays in the log either way
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_complete_event_is_terminal() {
        let mut session = TerminalSession::new("g", ProcessKind::Install);
        session.attach(StreamHandle::new_for_test());
        assert!(session.loading);

        session.apply(StreamEvent::Output(OutputEvent::Complete {
            succeeded: true,
            message: Some("done".to_string()),
        }));

        assert!(!session.loading);
        assert!(session.complete);
        assert!(!session.has_connection());
    }

    #[test]
    fn test_fatal_error_marks_complete() {
        let mut session = TerminalSession::new("g", ProcessKind::Install);
        session.attach(StreamHandle::new_for_test());

        session.apply(StreamEvent::Error(Error::RetryExhausted { attempts: 3 }));

        assert!(!session.loading);
        assert!(session.complete);
        // The failure is visible inline in the output log
        assert!(session.output[0]
            .text()
            .unwrap()
            .contains("retry limit exceeded"));
    }

    #[test]
    fn test_recoverable_error_leaves_session_reconnectable() {
        let mut session = TerminalSession::new("g", ProcessKind::Server);
        session.attach(StreamHandle::new_for_test());

        session.apply(StreamEvent::Error(Error::transport("connection lost")));

        assert!(!session.loading);
        assert!(!session.complete);
        assert!(session.is_idle());
    }

    #[test]
    fn test_clear_empties_output_only() {
        let mut session = TerminalSession::new("g", ProcessKind::Install);
        session.apply(line("a"));
        session.apply(StreamEvent::Output(OutputEvent::Complete {
            succeeded: true,
            message: None,
        }));
        assert!(session.complete);

        session.clear();
        assert!(session.is_empty());
        assert!(session.complete, "clear must not reset lifecycle flags");
    }

    #[test]
    fn test_disconnect_is_idempotent_and_keeps_output() {
        let mut session = TerminalSession::new("g", ProcessKind::Server);
        session.attach(StreamHandle::new_for_test());
        session.apply(line("hello"));

        session.disconnect();
        assert!(session.is_idle());
        assert_eq!(session.len(), 1);

        // Second disconnect is a no-op
        session.disconnect();
        assert!(session.is_idle());
    }

    #[test]
    fn test_attach_replaces_existing_connection() {
        let mut session = TerminalSession::new("g", ProcessKind::Server);
        session.attach(StreamHandle::new_for_test());
        session.attach(StreamHandle::new_for_test());
        assert!(session.has_connection());
        assert!(session.loading);
    }

    #[test]
    fn test_reconnect_after_complete_resets_flags() {
        let mut session = TerminalSession::new("g", ProcessKind::Server);
        session.apply(StreamEvent::Output(OutputEvent::Complete {
            succeeded: false,
            message: None,
        }));
        assert!(session.complete);

        session.attach(StreamHandle::new_for_test());
        assert!(!session.complete);
        assert!(session.loading);
    }

    #[test]
    fn test_mark_terminated() {
        let mut session = TerminalSession::new("g", ProcessKind::Server);
        session.attach(StreamHandle::new_for_test());
        session.mark_terminated();
        assert!(session.complete);
        assert!(!session.loading);
        assert!(!session.has_connection());
    }
}
