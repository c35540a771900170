//! # gsmon-core - Core Domain Types
//!
//! Foundation crate for gsmon. Provides domain types, error handling,
//! stream event definitions, and ANSI output rendering.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ProcessKind`] - Which backend subsystem a session talks to
//! - [`TextStyle`], [`StyledSpan`], [`AnsiColor`] - Styled terminal text
//!
//! ### Events (`events`)
//! - [`StreamMessage`] - One decoded JSON payload from a process stream
//! - [`OutputEvent`] - Typed events a session accumulates (line/prompt/complete)
//!
//! ### ANSI (`ansi`)
//! - [`render_spans()`] - SGR interpretation of raw process output
//! - [`strip_ansi_codes()`] - Plain-text extraction
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use gsmon_core::prelude::*;
//! ```

pub mod ansi;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all gsmon crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use ansi::{contains_ansi_codes, render_spans, strip_ansi_codes};
pub use error::{Error, Result};
pub use events::{OutputEvent, StreamMessage};
pub use types::{AnsiColor, ProcessKind, StyledSpan, TextStyle};
