//! Stream event definitions and wire-message decoding

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One JSON payload as delivered on a backend process stream.
///
/// All fields are optional on the wire; a single message may carry any
/// combination of `line`, `prompt` and `complete` at once. Fields we do not
/// know about are preserved in `extra` but never branched on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamMessage {
    /// One line of raw process output (may embed ANSI codes)
    pub line: Option<String>,

    /// Interactive request for user-supplied input (e.g. Steam Guard code)
    pub prompt: Option<String>,

    /// Terminal marker: no further events follow
    pub complete: bool,

    /// Outcome qualifier for `complete`: `"success"` or `"error"`
    pub status: Option<String>,

    /// Human-readable message accompanying `complete`
    pub message: Option<String>,

    /// Keep-alive marker; confirms the link is alive, nothing more
    pub heartbeat: Option<Value>,

    /// Server-side timestamp passthrough
    pub timestamp: Option<Value>,

    /// Unknown fields, preserved opaquely
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StreamMessage {
    /// Parse a raw stream payload.
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// True when the message carries nothing to display or act on.
    pub fn is_heartbeat_only(&self) -> bool {
        self.line.is_none() && self.prompt.is_none() && !self.complete
    }

    /// Decode into zero or more output events, in wire order:
    /// line, then prompt, then completion.
    pub fn into_events(self) -> Vec<OutputEvent> {
        let mut events = Vec::new();

        if let Some(line) = self.line {
            events.push(OutputEvent::Line { text: line });
        }
        if let Some(prompt) = self.prompt {
            events.push(OutputEvent::Prompt { text: prompt });
        }
        if self.complete {
            events.push(OutputEvent::Complete {
                succeeded: self.status.as_deref() == Some("success"),
                message: self.message,
            });
        }

        events
    }
}

/// What a process stream can deliver to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputEvent {
    /// One line of raw process output
    Line { text: String },

    /// Interactive request for user-supplied secret input
    Prompt { text: String },

    /// Terminal event: the stream is done
    Complete {
        succeeded: bool,
        message: Option<String>,
    },
}

impl OutputEvent {
    pub fn line(text: impl Into<String>) -> Self {
        OutputEvent::Line { text: text.into() }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, OutputEvent::Complete { .. })
    }

    /// Displayable text of this event, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            OutputEvent::Line { text } | OutputEvent::Prompt { text } => Some(text),
            OutputEvent::Complete { message, .. } => message.as_deref(),
        }
    }
}
