//! # gsmon-client - Backend API and Stream Client
//!
//! Talks to the game server manager backend over HTTP and server-sent
//! events:
//!
//! - [`ApiClient`] — the plain request surface (install start, status
//!   queries, stdin input, terminate/stop)
//! - [`ProcessStreamClient`] / [`StreamHandle`] — live process output
//!   streams with install-kind reconnection and idempotent close
//! - [`control`] — the per-[`ProcessKind`](gsmon_core::ProcessKind)
//!   input-send and termination protocol
//!
//! All operations return [`gsmon_core::Result`]; network failures never
//! panic out of this crate.

pub mod api;
pub mod control;
pub mod sse;
pub mod stream;

pub use api::{ApiClient, InstallationStatus, StatusEnvelope, REQUEST_TIMEOUT};
pub use control::{send_input, terminate, ControlBackend, GRACEFUL_STOP_GRACE};
pub use sse::SseParser;
pub use stream::{
    ProcessStreamClient, StreamEvent, StreamHandle, MAX_RECONNECT_ATTEMPTS, RETRY_BASE_DELAY,
};
