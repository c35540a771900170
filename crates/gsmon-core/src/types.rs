//! Core domain types: process kinds and styled terminal text

use serde::{Deserialize, Serialize};

/// Which backend subsystem a stream/session talks to.
///
/// The kind determines the input-send and termination protocol (see
/// `gsmon-client`): installs are killed with a single request, servers get
/// the graceful-then-forced stop sequence, and `Custom` dispatches to a
/// registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    Install,
    Server,
    Custom,
}

impl ProcessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKind::Install => "install",
            ProcessKind::Server => "server",
            ProcessKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sixteen-color ANSI palette used by SGR codes 30–37 / 90–97.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    /// Look up a foreground SGR code (30–37, 90–97) in the fixed table.
    ///
    /// Background codes reuse this table: 40–47 map via `code - 10`,
    /// 100–107 via `code - 60`.
    pub fn from_fg_code(code: u16) -> Option<Self> {
        match code {
            30 => Some(AnsiColor::Black),
            31 => Some(AnsiColor::Red),
            32 => Some(AnsiColor::Green),
            33 => Some(AnsiColor::Yellow),
            34 => Some(AnsiColor::Blue),
            35 => Some(AnsiColor::Magenta),
            36 => Some(AnsiColor::Cyan),
            37 => Some(AnsiColor::White),
            90 => Some(AnsiColor::BrightBlack),
            91 => Some(AnsiColor::BrightRed),
            92 => Some(AnsiColor::BrightGreen),
            93 => Some(AnsiColor::BrightYellow),
            94 => Some(AnsiColor::BrightBlue),
            95 => Some(AnsiColor::BrightMagenta),
            96 => Some(AnsiColor::BrightCyan),
            97 => Some(AnsiColor::BrightWhite),
            _ => None,
        }
    }
}

/// Accumulated SGR attributes for a run of text.
///
/// Attributes accumulate until an explicit reset (`ESC[0m`); setting a new
/// foreground replaces any previously set one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub underline: bool,
    pub inverse: bool,
    pub fg: Option<AnsiColor>,
    pub bg: Option<AnsiColor>,
}

impl TextStyle {
    /// True when no attribute is set
    pub fn is_plain(&self) -> bool {
        *self == TextStyle::default()
    }

    /// Clear all attributes (SGR code 0)
    pub fn reset(&mut self) {
        *self = TextStyle::default();
    }
}

/// A run of text with one resolved style, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledSpan {
    pub text: String,
    pub style: TextStyle,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// A span with no styling
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::default())
    }
}
