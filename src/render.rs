//! Terminal rendering of session output.
//!
//! Raw process output arrives with its original ANSI styling; it is parsed
//! into spans and re-emitted through crossterm's style types rather than
//! passed through verbatim, so only the supported SGR subset ever reaches
//! the operator's terminal. When stdout is not a terminal the styling is
//! dropped entirely.

use std::io::IsTerminal;

use crossterm::style::{Attribute, Attributes, Color, ContentStyle};

use gsmon_core::{render_spans, AnsiColor, OutputEvent, TextStyle};

/// Prints session output incrementally, tracking what was already shown.
#[derive(Debug)]
pub struct OutputPrinter {
    color: bool,
}

impl OutputPrinter {
    pub fn stdout() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    /// Print every event past `*printed`, advancing the cursor.
    pub fn print_new(&self, output: &[OutputEvent], printed: &mut usize) {
        for event in &output[(*printed).min(output.len())..] {
            self.print_event(event);
        }
        *printed = output.len();
    }

    fn print_event(&self, event: &OutputEvent) {
        match event {
            OutputEvent::Line { text } => self.print_line(text),
            OutputEvent::Prompt { text } => {
                // Prompts solicit input; make them stand out
                if self.color {
                    let mut style = ContentStyle::new();
                    style.foreground_color = Some(Color::Yellow);
                    style.attributes = Attributes::from(Attribute::Bold);
                    println!("{}", style.apply(format!("? {text}")));
                } else {
                    println!("? {text}");
                }
            }
            OutputEvent::Complete { succeeded, message } => {
                println!("===== process ended =====");
                match (succeeded, message) {
                    (true, Some(msg)) => println!("✅ {msg}"),
                    (true, None) => println!("✅ finished successfully"),
                    (false, Some(msg)) => println!("❌ {msg}"),
                    (false, None) => println!("❌ finished with errors"),
                }
            }
        }
    }

    fn print_line(&self, text: &str) {
        let spans = render_spans(text);
        if self.color {
            for span in &spans {
                print!("{}", to_content_style(&span.style).apply(&span.text));
            }
            println!();
        } else {
            let plain: String = spans.iter().map(|s| s.text.as_str()).collect();
            println!("{plain}");
        }
    }
}

fn to_content_style(style: &TextStyle) -> ContentStyle {
    let mut out = ContentStyle::new();
    out.foreground_color = style.fg.map(to_crossterm_color);
    out.background_color = style.bg.map(to_crossterm_color);
    let mut attributes = Attributes::default();
    if style.bold {
        attributes.set(Attribute::Bold);
    }
    if style.underline {
        attributes.set(Attribute::Underlined);
    }
    if style.inverse {
        attributes.set(Attribute::Reverse);
    }
    out.attributes = attributes;
    out
}

fn to_crossterm_color(color: AnsiColor) -> Color {
    match color {
        AnsiColor::Black => Color::Black,
        AnsiColor::Red => Color::DarkRed,
        AnsiColor::Green => Color::DarkGreen,
        AnsiColor::Yellow => Color::DarkYellow,
        AnsiColor::Blue => Color::DarkBlue,
        AnsiColor::Magenta => Color::DarkMagenta,
        AnsiColor::Cyan => Color::DarkCyan,
        AnsiColor::White => Color::Grey,
        AnsiColor::BrightBlack => Color::DarkGrey,
        AnsiColor::BrightRed => Color::Red,
        AnsiColor::BrightGreen => Color::Green,
        AnsiColor::BrightYellow => Color::Yellow,
        AnsiColor::BrightBlue => Color::Blue,
        AnsiColor::BrightMagenta => Color::Magenta,
        AnsiColor::BrightCyan => Color::Cyan,
        AnsiColor::BrightWhite => Color::White,
    }
}
