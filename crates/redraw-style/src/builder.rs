// SPDX-License-Identifier: MIT
//
// AttributedStringBuilder: the mutable way to assemble styled text.
//
// Appends happen under a "current style" that the caller can swap at any
// point. The builder also understands ANSI input: `append_ansi` parses SGR
// sequences into style changes and appends the literal characters between
// them, which is how `AttributedString::from_ansi` is implemented. Escape
// sequences that are not SGR are consumed and dropped; input that only
// looks like an escape sequence is kept as literal text.
//
// Tab expansion is opt-in: with tab stops configured, '\t' becomes the
// spaces needed to reach the next stop, measured in characters since the
// last newline.

use std::fmt;
use std::sync::Arc;

use crate::style::AttributedStyle;
use crate::text::{AttributedString, StyledText};

// ─── AttributedStringBuilder ─────────────────────────────────────────────────

/// Growable styled-text buffer with a current style.
#[derive(Clone, Default)]
pub struct AttributedStringBuilder {
    chars: Vec<char>,
    styles: Vec<u64>,
    current: AttributedStyle,
    tab_stops: usize,
}

impl AttributedStringBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chars: Vec::with_capacity(capacity),
            styles: Vec::with_capacity(capacity),
            current: AttributedStyle::DEFAULT,
            tab_stops: 0,
        }
    }

    /// The style applied to subsequent appends.
    #[inline]
    #[must_use]
    pub const fn style(&self) -> AttributedStyle {
        self.current
    }

    pub const fn set_style(&mut self, style: AttributedStyle) {
        self.current = style;
    }

    /// Expand tabs to multiples of `width` characters (0 disables).
    pub const fn set_tab_stops(&mut self, width: usize) {
        self.tab_stops = width;
    }

    #[must_use]
    pub const fn tab_stops(&self) -> usize {
        self.tab_stops
    }

    /// Append text under the current style.
    pub fn append(&mut self, text: &str) {
        for c in text.chars() {
            self.append_char(c);
        }
    }

    /// Append one character under the current style, expanding tabs if
    /// tab stops are configured.
    pub fn append_char(&mut self, c: char) {
        if c == '\t' && self.tab_stops > 0 {
            self.insert_tab();
        } else {
            self.push(c, self.current.apply_to(0));
        }
    }

    /// Append text under `style`, leaving the current style untouched.
    pub fn append_styled(&mut self, style: AttributedStyle, text: &str) {
        let saved = self.current;
        self.current = style;
        self.append(text);
        self.current = saved;
    }

    /// Append already-styled text. The current style acts as an override
    /// layer: bits it claims win over the incoming codes.
    pub fn append_attributed(&mut self, text: &impl StyledText) {
        for i in 0..text.len() {
            let code = self.current.apply_to(text.style_code_at(i));
            self.push(text.char_at(i), code);
        }
    }

    /// Parse ANSI input: SGR sequences update the current style, other
    /// escape sequences are dropped, everything else is appended as
    /// literal text. Incomplete escape prefixes degrade to literal text.
    pub fn append_ansi(&mut self, ansi: &str) {
        let mut state = AnsiState::Ground;
        let mut args = String::new();
        for c in ansi.chars() {
            match state {
                AnsiState::Ground => {
                    if c == '\x1b' {
                        state = AnsiState::Escape;
                    } else {
                        self.append_char(c);
                    }
                }
                AnsiState::Escape => {
                    if c == '[' {
                        args.clear();
                        state = AnsiState::Csi;
                    } else {
                        // Not a CSI introducer: keep the ESC and the
                        // character as ordinary text.
                        self.push('\x1b', self.current.apply_to(0));
                        state = AnsiState::Ground;
                        self.append_char(c);
                    }
                }
                AnsiState::Csi => {
                    if c == 'm' {
                        self.apply_sgr(&args);
                        state = AnsiState::Ground;
                    } else if c.is_ascii_digit() || c == ';' {
                        args.push(c);
                    } else {
                        // A CSI sequence that is not SGR (cursor moves,
                        // erases, ...): style-irrelevant, drop it whole.
                        state = AnsiState::Ground;
                    }
                }
            }
        }
    }

    /// Freeze into an immutable `AttributedString`.
    #[must_use]
    pub fn to_attributed_string(&self) -> AttributedString {
        let chars: Arc<[char]> = self.chars.as_slice().into();
        let styles: Arc<[u64]> = self.styles.as_slice().into();
        let end = chars.len();
        AttributedString::from_parts(chars, styles, 0, end)
    }

    fn push(&mut self, c: char, code: u64) {
        self.chars.push(c);
        self.styles.push(code);
    }

    /// Characters on the current (last) line.
    fn last_line_length(&self) -> usize {
        self.chars
            .iter()
            .rev()
            .take_while(|&&c| c != '\n')
            .count()
    }

    fn insert_tab(&mut self) {
        let code = self.current.apply_to(0);
        self.push(' ', code);
        while self.last_line_length() % self.tab_stops != 0 {
            self.push(' ', code);
        }
    }

    fn apply_sgr(&mut self, args: &str) {
        let params: Vec<Option<u32>> = args
            .split(';')
            .map(|p| if p.is_empty() { None } else { p.parse().ok() })
            .collect();
        // A bare `ESC[m` (or all-empty parameters) means reset.
        if params.iter().all(Option::is_none) {
            self.current = AttributedStyle::DEFAULT;
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let Some(p) = params[i] else {
                i += 1;
                continue;
            };
            self.current = match p {
                0 => AttributedStyle::DEFAULT,
                1 => self.current.bold(),
                2 => self.current.faint(),
                3 => self.current.italic(),
                4 => self.current.underline(),
                5 => self.current.blink(),
                6 => self.current.blink_fast(),
                7 => self.current.inverse(),
                8 => self.current.conceal(),
                9 => self.current.crossed_out(),
                21 => self.current.underline_double(),
                22 => self.current.bold_off().faint_off(),
                23 => self.current.italic_off(),
                24 => self.current.underline_off(),
                25 => self.current.blink_off(),
                27 => self.current.inverse_off(),
                28 => self.current.conceal_off(),
                29 => self.current.crossed_out_off(),
                30..=37 => self.current.foreground((p - 30) as u8),
                39 => self.current.foreground_off(),
                40..=47 => self.current.background((p - 40) as u8),
                49 => self.current.background_off(),
                38 | 48 => {
                    let (style, used) = self.extended_color(p == 38, &params[i + 1..]);
                    i += used;
                    style
                }
                90..=97 => self.current.foreground((p - 90 + 8) as u8),
                100..=107 => self.current.background((p - 100 + 8) as u8),
                _ => self.current,
            };
            i += 1;
        }
    }

    /// Handle `38;5;n`, `38;2;r;g;b` and the 48-prefixed background
    /// forms. Returns the new style and how many extra parameters were
    /// consumed; a malformed tail consumes its selector and changes
    /// nothing.
    fn extended_color(&self, foreground: bool, rest: &[Option<u32>]) -> (AttributedStyle, usize) {
        match rest {
            [Some(5), Some(n), ..] if *n <= 255 => {
                let n = *n as u8;
                let style = if foreground {
                    self.current.foreground(n)
                } else {
                    self.current.background(n)
                };
                (style, 2)
            }
            [Some(2), Some(r), Some(g), Some(b), ..]
                if *r <= 255 && *g <= 255 && *b <= 255 =>
            {
                let (r, g, b) = (*r as u8, *g as u8, *b as u8);
                let style = if foreground {
                    self.current.foreground_rgb(r, g, b)
                } else {
                    self.current.background_rgb(r, g, b)
                };
                (style, 4)
            }
            [] => (self.current, 0),
            _ => (self.current, 1),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AnsiState {
    Ground,
    Escape,
    Csi,
}

impl StyledText for AttributedStringBuilder {
    #[inline]
    fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    fn char_at(&self, index: usize) -> char {
        self.chars[index]
    }

    #[inline]
    fn style_code_at(&self, index: usize) -> u64 {
        self.styles[index]
    }

    /// Materializes: unlike `AttributedString`, the builder's buffers may
    /// still grow, so views copy.
    fn sub_sequence(&self, start: usize, end: usize) -> AttributedString {
        assert!(
            start <= end && end <= self.chars.len(),
            "sub_sequence [{start}, {end}) out of range for length {}",
            self.chars.len()
        );
        let chars: Arc<[char]> = self.chars[start..end].into();
        let styles: Arc<[u64]> = self.styles[start..end].into();
        let len = chars.len();
        AttributedString::from_parts(chars, styles, 0, len)
    }
}

impl fmt::Write for AttributedStringBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.append_char(c);
        Ok(())
    }
}

impl fmt::Display for AttributedStringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            fmt::Write::write_char(f, *c)?;
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{ColorDepth, StyleFlag};
    use pretty_assertions::assert_eq;

    // ── Appends ────────────────────────────────────────────────────────

    #[test]
    fn append_uses_current_style() {
        let mut sb = AttributedStringBuilder::new();
        sb.set_style(AttributedStyle::DEFAULT.bold());
        sb.append("hi");
        assert_ne!(sb.style_code_at(0) & StyleFlag::BOLD.bits(), 0);
        assert_ne!(sb.style_code_at(1) & StyleFlag::BOLD.bits(), 0);
    }

    #[test]
    fn append_styled_restores_current() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_styled(AttributedStyle::DEFAULT.italic(), "a");
        sb.append("b");
        assert_ne!(sb.style_code_at(0) & StyleFlag::ITALIC.bits(), 0);
        assert_eq!(sb.style_code_at(1), 0);
    }

    #[test]
    fn append_attributed_keeps_incoming_styles() {
        let styled = AttributedString::styled("x", AttributedStyle::DEFAULT.bold());
        let mut sb = AttributedStringBuilder::new();
        sb.append_attributed(&styled);
        assert_ne!(sb.style_code_at(0) & StyleFlag::BOLD.bits(), 0);
    }

    #[test]
    fn append_attributed_current_style_overrides() {
        let styled = AttributedString::styled("x", AttributedStyle::DEFAULT.bold());
        let mut sb = AttributedStringBuilder::new();
        sb.set_style(AttributedStyle::DEFAULT.bold_off());
        sb.append_attributed(&styled);
        assert_eq!(sb.style_code_at(0) & StyleFlag::BOLD.bits(), 0);
    }

    #[test]
    fn write_trait_appends() {
        use std::fmt::Write;
        let mut sb = AttributedStringBuilder::new();
        write!(sb, "n = {}", 42).unwrap();
        assert_eq!(sb.to_string(), "n = 42");
    }

    // ── Tabs ───────────────────────────────────────────────────────────

    #[test]
    fn tab_expands_to_next_stop() {
        let mut sb = AttributedStringBuilder::new();
        sb.set_tab_stops(4);
        sb.append("ab\tc");
        assert_eq!(sb.to_string(), "ab  c");
    }

    #[test]
    fn tab_at_stop_advances_full_width() {
        let mut sb = AttributedStringBuilder::new();
        sb.set_tab_stops(4);
        sb.append("abcd\tx");
        assert_eq!(sb.to_string(), "abcd    x");
    }

    #[test]
    fn tab_stops_reset_at_newline() {
        let mut sb = AttributedStringBuilder::new();
        sb.set_tab_stops(4);
        sb.append("abc\n\tx");
        assert_eq!(sb.to_string(), "abc\n    x");
    }

    #[test]
    fn tab_without_stops_is_literal() {
        let mut sb = AttributedStringBuilder::new();
        sb.append("a\tb");
        assert_eq!(sb.to_string(), "a\tb");
    }

    // ── ANSI parsing ───────────────────────────────────────────────────

    #[test]
    fn ansi_basic_sgr() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[1;31mred\x1b[0m plain");
        assert_eq!(sb.to_string(), "red plain");
        let code = sb.style_code_at(0);
        assert_ne!(code & StyleFlag::BOLD.bits(), 0);
        assert_ne!(code & StyleFlag::FG_INDEXED.bits(), 0);
        assert_eq!(sb.style_code_at(3), 0);
    }

    #[test]
    fn ansi_empty_param_is_reset() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[1ma\x1b[mb");
        assert_ne!(sb.style_code_at(0), 0);
        assert_eq!(sb.style_code_at(1), 0);
    }

    #[test]
    fn ansi_256_color() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[38;5;196mx");
        let s = sb.to_attributed_string();
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "\x1b[38;5;196mx\x1b[0m");
    }

    #[test]
    fn ansi_rgb_color() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[48;2;10;20;30mx");
        let s = sb.to_attributed_string();
        assert_eq!(s.to_ansi(ColorDepth::TrueColor), "\x1b[48;2;10;20;30mx\x1b[0m");
    }

    #[test]
    fn ansi_bright_colors() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[91mx");
        let s = sb.to_attributed_string();
        // Bright red is palette index 9.
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "\x1b[38;5;9mx\x1b[0m");
    }

    #[test]
    fn ansi_non_sgr_csi_dropped() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("a\x1b[2Jb\x1b[3;4Hc");
        assert_eq!(sb.to_string(), "abc");
    }

    #[test]
    fn ansi_lone_escape_kept_as_text() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("a\x1bZb");
        assert_eq!(sb.to_string(), "a\x1bZb");
    }

    #[test]
    fn ansi_malformed_extended_color_ignored() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[38;9mx");
        assert_eq!(sb.to_string(), "x");
        assert_eq!(sb.style_code_at(0), 0);
    }

    #[test]
    fn ansi_intensity_off_clears_both() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_ansi("\x1b[1;2ma\x1b[22mb");
        assert_eq!(
            sb.style_code_at(1) & (StyleFlag::BOLD.bits() | StyleFlag::FAINT.bits()),
            0
        );
    }
}
