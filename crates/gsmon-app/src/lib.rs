//! # gsmon-app - Session State and Orchestration
//!
//! Owns the application-side state of the streaming core:
//!
//! - [`TerminalSession`] — per-process output log and lifecycle flags
//! - [`SessionRegistry`] — the keyed collection of sessions, the single
//!   mutation point, and the per-kind operation surface
//!   (connect/disconnect/send/terminate/clear)
//! - [`Settings`] — configuration from `config.toml` plus env overrides

pub mod config;
pub mod registry;
pub mod session;

pub use config::{Settings, StreamSettings};
pub use registry::{CustomHandler, SessionEvent, SessionRegistry};
pub use session::TerminalSession;
