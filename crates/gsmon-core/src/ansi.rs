//! ANSI escape sequence interpretation for process output.
//!
//! Backend streams relay raw terminal output from installers and game
//! servers (steamcmd, Java servers, …). [`render_spans`] turns one chunk of
//! that output into displayable [`StyledSpan`]s: non-SGR control sequences
//! are stripped, SGR sequences accumulate into a [`TextStyle`] that carries
//! forward until reset within the same call.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{AnsiColor, StyledSpan, TextStyle};

/// Any CSI sequence whose final byte is not `m` (cursor movement, cursor
/// position, erase display/line, device status report, and the rest).
/// SGR sequences (`…m`) are left in place for the styling pass.
fn non_sgr_csi() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[\??[0-9;]*[A-Za-ln-z]").unwrap())
}

/// SGR sequence: `ESC [ <params> m` with `;`-separated integer params.
fn sgr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[([0-9;]*)m").unwrap())
}

/// Remove non-SGR control sequences and raw control characters.
///
/// Strips 0x00–0x08, 0x0B, 0x0C, 0x0E–0x1F and 0x7F; ESC survives only when
/// it introduces an SGR sequence (all other CSI sequences were removed by
/// the first pass, so a remaining `ESC [` can only be SGR).
fn clean(input: &str) -> String {
    let without_csi = non_sgr_csi().replace_all(input, "");

    let mut out = String::with_capacity(without_csi.len());
    let mut chars = without_csi.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    out.push(c);
                }
            }
            '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Parse a raw output chunk into styled spans.
///
/// Style accumulates left to right: a `ESC[31m` with no matching reset
/// colors all following text in this call's output. Each call starts from
/// the default style — continuity across chunks is the caller's concern
/// (lines are rendered independently, matching the source behavior).
pub fn render_spans(input: &str) -> Vec<StyledSpan> {
    let cleaned = clean(input);

    let mut spans = Vec::new();
    let mut style = TextStyle::default();
    let mut last = 0;

    for caps in sgr().captures_iter(&cleaned) {
        let m = caps.get(0).expect("match group 0 always present");
        if m.start() > last {
            spans.push(StyledSpan::new(&cleaned[last..m.start()], style));
        }
        apply_sgr_params(&mut style, &caps[1]);
        last = m.end();
    }

    if last < cleaned.len() {
        spans.push(StyledSpan::new(&cleaned[last..], style));
    }

    spans
}

/// Strip all ANSI sequences and control characters, returning plain text.
pub fn strip_ansi_codes(input: &str) -> String {
    render_spans(input)
        .into_iter()
        .map(|span| span.text)
        .collect()
}

/// Quick check whether a chunk contains any escape sequence at all.
pub fn contains_ansi_codes(input: &str) -> bool {
    input.contains('\u{1b}')
}

/// Fold one SGR parameter list (e.g. `"1;31"`) into the accumulated style.
fn apply_sgr_params(style: &mut TextStyle, params: &str) {
    if params.is_empty() {
        // `ESC[m` is shorthand for a full reset
        style.reset();
        return;
    }
    for part in params.split(';') {
        if let Ok(code) = part.parse::<u16>() {
            apply_sgr_code(style, code);
        }
    }
}

/// Apply a single SGR code. Unrecognized codes are ignored.
fn apply_sgr_code(style: &mut TextStyle, code: u16) {
    match code {
        0 => style.reset(),
        1 => style.bold = true,
        4 => style.underline = true,
        7 => style.inverse = true,
        30..=37 | 90..=97 => style.fg = AnsiColor::from_fg_code(code),
        39 => style.fg = None,
        40..=47 => style.bg = AnsiColor::from_fg_code(code - 10),
        49 => style.bg = None,
        100..=107 => style.bg = AnsiColor::from_fg_code(code - 60),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> TextStyle {
        TextStyle {
            fg: Some(AnsiColor::Red),
            ..TextStyle::default()
        }
    }

    #[test]
    fn test_empty_input_produces_no_spans() {
        assert!(render_spans("").is_empty());
    }

    #[test]
    fn test_plain_text_single_unstyled_span() {
        let spans = render_spans("plain");
        assert_eq!(spans, vec![StyledSpan::plain("plain")]);
    }

    #[test]
    fn test_red_then_reset() {
        let spans = render_spans("\x1b[31mred\x1b[0mplain");
        assert_eq!(
            spans,
            vec![StyledSpan::new("red", red()), StyledSpan::plain("plain")]
        );
    }

    #[test]
    fn test_style_persists_without_reset() {
        // An unmatched color must carry through to the end of the chunk
        let spans = render_spans("\x1b[31mone\x1b[1mtwo");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].style, red());
        assert_eq!(
            spans[1].style,
            TextStyle {
                bold: true,
                fg: Some(AnsiColor::Red),
                ..TextStyle::default()
            }
        );
    }

    #[test]
    fn test_reset_boundary_equivalence() {
        // Rendering s1+s2 where s1 ends with a reset equals rendering each
        // independently and concatenating — style never leaks past ESC[0m.
        let s1 = "\x1b[1;32mok\x1b[0m";
        let s2 = "\x1b[4mnext\x1b[0m done";

        let combined = render_spans(&format!("{s1}{s2}"));
        let mut separate = render_spans(s1);
        separate.extend(render_spans(s2));

        assert_eq!(combined, separate);
    }

    #[test]
    fn test_foreground_replacement() {
        let spans = render_spans("\x1b[31m\x1b[34mblue");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].style.fg, Some(AnsiColor::Blue));
    }

    #[test]
    fn test_default_fg_bg_codes_clear() {
        let spans = render_spans("\x1b[31;41mcolored\x1b[39;49mcleared");
        assert_eq!(spans[0].style.fg, Some(AnsiColor::Red));
        assert_eq!(spans[0].style.bg, Some(AnsiColor::Red));
        assert!(spans[1].style.is_plain());
    }

    #[test]
    fn test_background_via_offset_lookup() {
        let spans = render_spans("\x1b[44mbg\x1b[0m\x1b[104mbright");
        assert_eq!(spans[0].style.bg, Some(AnsiColor::Blue));
        assert_eq!(spans[1].style.bg, Some(AnsiColor::BrightBlue));
    }

    #[test]
    fn test_inverse_and_underline() {
        let spans = render_spans("\x1b[7;4mtext");
        assert!(spans[0].style.inverse);
        assert!(spans[0].style.underline);
    }

    #[test]
    fn test_unrecognized_codes_ignored() {
        let spans = render_spans("\x1b[38;5;208mtext");
        // 38 (extended color intro), 5 and 208 are not in the handled set
        assert_eq!(spans, vec![StyledSpan::plain("text")]);
    }

    #[test]
    fn test_cursor_and_erase_sequences_stripped() {
        assert_eq!(
            render_spans("a\x1b[2Jb\x1b[1;5Hc\x1b[Kd\x1b[3Ae"),
            vec![StyledSpan::plain("abcde")]
        );
    }

    #[test]
    fn test_device_status_report_stripped() {
        assert_eq!(render_spans("x\x1b[6ny"), vec![StyledSpan::plain("xy")]);
    }

    #[test]
    fn test_control_characters_stripped() {
        assert_eq!(
            render_spans("a\u{07}b\u{0c}c\u{7f}d"),
            vec![StyledSpan::plain("abcd")]
        );
    }

    #[test]
    fn test_newline_and_tab_survive() {
        // 0x09 and 0x0A are outside the stripped ranges
        assert_eq!(
            render_spans("a\tb\nc"),
            vec![StyledSpan::plain("a\tb\nc")]
        );
    }

    #[test]
    fn test_only_control_sequences_yields_nothing() {
        assert!(render_spans("\x1b[2J\x1b[H").is_empty());
    }

    #[test]
    fn test_bare_sgr_reset_shorthand() {
        let spans = render_spans("\x1b[31mred\x1b[mplain");
        assert_eq!(spans[1].style, TextStyle::default());
    }

    #[test]
    fn test_strip_ansi_codes() {
        assert_eq!(strip_ansi_codes("\x1b[1;31mError:\x1b[0m boom"), "Error: boom");
        assert_eq!(strip_ansi_codes("no codes"), "no codes");
    }

    #[test]
    fn test_contains_ansi_codes() {
        assert!(contains_ansi_codes("\x1b[31mred"));
        assert!(!contains_ansi_codes("plain"));
    }

    #[test]
    fn test_carriage_return_survives() {
        // 0x0D is outside the stripped ranges; steamcmd progress lines use it
        let spans = render_spans("\x1b[1mprogress: 42.42\x1b[0m\r");
        assert_eq!(spans[0].text, "progress: 42.42");
        assert!(spans[0].style.bold);
        assert_eq!(spans[1], StyledSpan::plain("\r"));
    }
}
