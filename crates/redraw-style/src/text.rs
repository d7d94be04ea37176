// SPDX-License-Identifier: MIT
//
// Styled text: a character buffer with a parallel style code per character.
//
// `AttributedString` is the immutable form. Substrings are views: they share
// the backing buffers through `Arc` and carry only new offsets, so slicing
// is O(1) and allocation-free. Immutability makes the aliasing safe.
//
// The operations every styled sequence supports (column measurement,
// column-based slicing, wrapping, ANSI serialization) live on the
// `StyledText` trait with default bodies; `AttributedString` and the
// builder both implement the three primitive accessors and inherit the
// rest. Column arithmetic is per code point and width-aware: CJK
// characters count 2, combining marks count 0, and characters styled
// hidden count 0 regardless of their width.

use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::Regex;
use unicode_width::UnicodeWidthChar;

use crate::builder::AttributedStringBuilder;
use crate::style::{
    AttributedStyle, ColorDepth, StyleFlag, BG_COLOR, BG_COLOR_EXP, FG_COLOR, FG_COLOR_EXP,
    FLAG_MASK,
};

/// Terminal column width of one character: 0, 1, or 2.
///
/// Control characters measure 0; they do not advance the cursor in the
/// sense this engine cares about.
#[inline]
#[must_use]
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

// ─── StyledText ──────────────────────────────────────────────────────────────

/// Common surface of `AttributedString` and `AttributedStringBuilder`.
///
/// Implementors provide indexed access to characters and their raw style
/// codes plus slicing; everything else has a default body.
pub trait StyledText {
    /// Number of characters.
    fn len(&self) -> usize;

    /// Character at `index`.
    fn char_at(&self, index: usize) -> char;

    /// Raw style code at `index`.
    fn style_code_at(&self, index: usize) -> u64;

    /// Zero-copy (for `AttributedString`) slice of `[start, end)`.
    fn sub_sequence(&self, start: usize, end: usize) -> AttributedString;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Style at `index`, with every bit of the code claimed.
    fn style_at(&self, index: usize) -> AttributedStyle {
        let code = self.style_code_at(index);
        AttributedStyle::new(code, code)
    }

    /// Whether the character at `index` is styled hidden (zero columns).
    fn is_hidden(&self, index: usize) -> bool {
        self.style_code_at(index) & StyleFlag::HIDDEN.bits() != 0
    }

    /// First index of the style run containing `index`.
    fn run_start(&self, index: usize) -> usize {
        let style = self.style_at(index);
        let mut i = index;
        while i > 0 && self.style_at(i - 1) == style {
            i -= 1;
        }
        i
    }

    /// One past the last index of the style run containing `index`.
    fn run_limit(&self, index: usize) -> usize {
        let style = self.style_at(index);
        let mut i = index;
        while i + 1 < self.len() && self.style_at(i + 1) == style {
            i += 1;
        }
        i + 1
    }

    /// Total visible column width, skipping hidden characters.
    fn column_length(&self) -> usize {
        let mut cols = 0;
        for i in 0..self.len() {
            if !self.is_hidden(i) {
                cols += char_width(self.char_at(i));
            }
        }
        cols
    }

    /// Slice by visual column rather than character index.
    ///
    /// Characters are included while they fit entirely inside
    /// `[start_col, stop_col)`; a wide character straddling either bound
    /// is left out rather than split.
    fn column_sub_sequence(&self, start_col: usize, stop_col: usize) -> AttributedString {
        let len = self.len();
        let mut begin = 0;
        let mut col = 0;
        while begin < len {
            let w = if self.is_hidden(begin) {
                0
            } else {
                char_width(self.char_at(begin))
            };
            if col + w > start_col {
                break;
            }
            begin += 1;
            col += w;
        }
        let mut end = begin;
        while end < len {
            let w = if self.is_hidden(end) {
                0
            } else {
                char_width(self.char_at(end))
            };
            if col + w > stop_col {
                break;
            }
            end += 1;
            col += w;
        }
        self.sub_sequence(begin, end)
    }

    /// Wrap into lines of at most `columns` visible columns, also breaking
    /// on `'\n'`. Lazy and restartable: each call returns a fresh iterator.
    ///
    /// Always yields at least one line; a trailing `'\n'` yields a final
    /// empty line, matching how a terminal would render it.
    fn column_split_length(&self, columns: usize) -> ColumnSplit<'_, Self> {
        ColumnSplit {
            text: self,
            columns,
            pos: 0,
            done: false,
        }
    }

    /// Serialize to an ANSI string, emitting only the SGR parameters for
    /// style bits that change between adjacent characters.
    ///
    /// A transition to the fully default style is a bare `ESC[0m`. Colors
    /// degrade to what `depth` can render. A trailing non-default style is
    /// closed with a final reset so the output is self-contained.
    fn to_ansi(&self, depth: ColorDepth) -> String {
        let mut out = String::new();
        let mut style: u64 = 0;
        let mut last_fg = ColorSpec::None;
        let mut last_bg = ColorSpec::None;
        for i in 0..self.len() {
            // The hidden flag is ours, not the terminal's.
            let s = self.style_code_at(i) & !StyleFlag::HIDDEN.bits();
            if style != s {
                if s == 0 {
                    out.push_str("\x1b[0m");
                    last_fg = ColorSpec::None;
                    last_bg = ColorSpec::None;
                } else {
                    let d = (style ^ s) & FLAG_MASK;
                    let fg = ColorSpec::foreground_of(s);
                    let bg = ColorSpec::background_of(s);
                    let mut params = String::new();
                    push_attr_params(&mut params, s, d);
                    if fg != last_fg {
                        fg.push_params(&mut params, true, depth);
                        last_fg = fg;
                    }
                    if bg != last_bg {
                        bg.push_params(&mut params, false, depth);
                        last_bg = bg;
                    }
                    if !params.is_empty() {
                        out.push_str("\x1b[");
                        out.push_str(&params);
                        out.push('m');
                    }
                }
                style = s;
            }
            out.push(self.char_at(i));
        }
        if style != 0 {
            out.push_str("\x1b[0m");
        }
        out
    }

    /// Materialize as an `AttributedString`.
    fn to_attributed(&self) -> AttributedString {
        self.sub_sequence(0, self.len())
    }
}

/// Append the SGR parameters for the attribute bits in `d`, reading the
/// target state from `s`.
fn push_attr_params(params: &mut String, s: u64, d: u64) {
    let has = |f: StyleFlag| s & f.bits() != 0;
    let changed = |f: StyleFlag| d & f.bits() != 0;

    if changed(StyleFlag::BOLD) || changed(StyleFlag::FAINT) {
        push_param(
            params,
            if has(StyleFlag::BOLD) {
                "1"
            } else if has(StyleFlag::FAINT) {
                "2"
            } else {
                "22"
            },
        );
    }
    if changed(StyleFlag::ITALIC) {
        push_param(params, if has(StyleFlag::ITALIC) { "3" } else { "23" });
    }
    if changed(StyleFlag::UNDERLINE) || changed(StyleFlag::UNDERLINE_DOUBLE) {
        push_param(
            params,
            if has(StyleFlag::UNDERLINE) {
                "4"
            } else if has(StyleFlag::UNDERLINE_DOUBLE) {
                "21"
            } else {
                "24"
            },
        );
    }
    if changed(StyleFlag::BLINK_SLOW) || changed(StyleFlag::BLINK_FAST) {
        push_param(
            params,
            if has(StyleFlag::BLINK_SLOW) {
                "5"
            } else if has(StyleFlag::BLINK_FAST) {
                "6"
            } else {
                "25"
            },
        );
    }
    if changed(StyleFlag::INVERSE) {
        push_param(params, if has(StyleFlag::INVERSE) { "7" } else { "27" });
    }
    if changed(StyleFlag::CONCEAL) {
        push_param(params, if has(StyleFlag::CONCEAL) { "8" } else { "28" });
    }
    if changed(StyleFlag::CROSSED_OUT) {
        push_param(params, if has(StyleFlag::CROSSED_OUT) { "9" } else { "29" });
    }
}

fn push_param(params: &mut String, p: &str) {
    if !params.is_empty() {
        params.push(';');
    }
    params.push_str(p);
}

/// A color as carried by a style code: absent, indexed, or direct RGB.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ColorSpec {
    None,
    Indexed(u32),
    Rgb(u32),
}

impl ColorSpec {
    fn foreground_of(code: u64) -> Self {
        let payload = ((code & FG_COLOR) >> FG_COLOR_EXP) as u32;
        if code & StyleFlag::FG_RGB.bits() != 0 {
            Self::Rgb(payload)
        } else if code & StyleFlag::FG_INDEXED.bits() != 0 {
            Self::Indexed(payload)
        } else {
            Self::None
        }
    }

    fn background_of(code: u64) -> Self {
        let payload = ((code & BG_COLOR) >> BG_COLOR_EXP) as u32;
        if code & StyleFlag::BG_RGB.bits() != 0 {
            Self::Rgb(payload)
        } else if code & StyleFlag::BG_INDEXED.bits() != 0 {
            Self::Indexed(payload)
        } else {
            Self::None
        }
    }

    /// Append this color's SGR parameters, degraded to `depth`.
    fn push_params(self, params: &mut String, foreground: bool, depth: ColorDepth) {
        let base = if foreground { 30 } else { 40 };
        let extended = if foreground { 38 } else { 48 };
        match self {
            Self::None => push_param(params, if foreground { "39" } else { "49" }),
            Self::Indexed(n) => {
                if n < 8 || depth < ColorDepth::Colors256 {
                    push_param(params, &format!("{}", base + n % 8));
                } else {
                    push_param(params, &format!("{extended};5;{n}"));
                }
            }
            Self::Rgb(rgb) => {
                let (r, g, b) = ((rgb >> 16) & 0xFF, (rgb >> 8) & 0xFF, rgb & 0xFF);
                match depth {
                    ColorDepth::TrueColor => {
                        push_param(params, &format!("{extended};2;{r};{g};{b}"));
                    }
                    ColorDepth::Colors256 => {
                        push_param(params, &format!("{extended};5;{}", rgb_to_256(r, g, b)));
                    }
                    ColorDepth::Colors8 => {
                        push_param(params, &format!("{}", base + rgb_to_8(r, g, b)));
                    }
                }
            }
        }
    }
}

/// Nearest xterm 256-palette index: grayscale ramp for gray, else the
/// 6x6x6 color cube.
fn rgb_to_256(r: u32, g: u32, b: u32) -> u32 {
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + (r - 8) / 10;
    }
    let level = |c: u32| (c * 5 + 127) / 255;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

/// Nearest of the 8 base colors, one threshold bit per channel.
fn rgb_to_8(r: u32, g: u32, b: u32) -> u32 {
    u32::from(r >= 128) | (u32::from(g >= 128) << 1) | (u32::from(b >= 128) << 2)
}

// ─── ColumnSplit ─────────────────────────────────────────────────────────────

/// Iterator over column-wrapped lines. See [`StyledText::column_split_length`].
pub struct ColumnSplit<'a, T: ?Sized> {
    text: &'a T,
    columns: usize,
    pos: usize,
    done: bool,
}

impl<T: StyledText + ?Sized> Iterator for ColumnSplit<'_, T> {
    type Item = AttributedString;

    fn next(&mut self) -> Option<AttributedString> {
        if self.done {
            return None;
        }
        let len = self.text.len();
        let beg = self.pos;
        let mut col = 0;
        let mut cur = beg;
        while cur < len {
            let c = self.text.char_at(cur);
            if c == '\n' {
                let seg = self.text.sub_sequence(beg, cur);
                self.pos = cur + 1;
                return Some(seg);
            }
            let w = if self.text.is_hidden(cur) {
                0
            } else {
                char_width(c)
            };
            // Break before a character that would overflow, except when it
            // is the first of the line (an overwide character still has to
            // land somewhere).
            if col + w > self.columns && cur > beg {
                let seg = self.text.sub_sequence(beg, cur);
                self.pos = cur;
                return Some(seg);
            }
            col += w;
            cur += 1;
        }
        self.done = true;
        Some(self.text.sub_sequence(beg, len))
    }
}

// ─── AttributedString ────────────────────────────────────────────────────────

/// Immutable styled text. Cheap to clone and to slice.
#[derive(Clone)]
pub struct AttributedString {
    chars: Arc<[char]>,
    styles: Arc<[u64]>,
    start: usize,
    end: usize,
}

impl AttributedString {
    /// Plain text with the default style everywhere.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let chars: Arc<[char]> = text.chars().collect();
        let styles: Arc<[u64]> = vec![0; chars.len()].into();
        let end = chars.len();
        Self {
            chars,
            styles,
            start: 0,
            end,
        }
    }

    /// Text with one style applied throughout.
    #[must_use]
    pub fn styled(text: &str, style: AttributedStyle) -> Self {
        let chars: Arc<[char]> = text.chars().collect();
        let styles: Arc<[u64]> = vec![style.apply_to(0); chars.len()].into();
        let end = chars.len();
        Self {
            chars,
            styles,
            start: 0,
            end,
        }
    }

    /// Parse an ANSI string into styled text. Malformed escape input
    /// degrades to literal characters; this never fails.
    #[must_use]
    pub fn from_ansi(ansi: &str) -> Self {
        let mut sb = AttributedStringBuilder::with_capacity(ansi.len());
        sb.append_ansi(ansi);
        sb.to_attributed_string()
    }

    /// Parse an ANSI string and return just the visible characters.
    #[must_use]
    pub fn strip_ansi(ansi: &str) -> String {
        let mut sb = AttributedStringBuilder::with_capacity(ansi.len());
        sb.append_ansi(ansi);
        sb.to_string()
    }

    /// Concatenate `parts` with `delimiter` between each pair.
    #[must_use]
    pub fn join<'a, I>(delimiter: &Self, parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut sb = AttributedStringBuilder::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                sb.append_attributed(delimiter);
            }
            sb.append_attributed(part);
        }
        sb.to_attributed_string()
    }

    pub(crate) fn from_parts(chars: Arc<[char]>, styles: Arc<[u64]>, start: usize, end: usize) -> Self {
        Self {
            chars,
            styles,
            start,
            end,
        }
    }

    /// A copy of this text with `style` merged over every character.
    #[must_use]
    pub fn with_style(&self, style: AttributedStyle) -> Self {
        let chars: Arc<[char]> = self.chars[self.start..self.end].into();
        let styles: Arc<[u64]> = self.styles[self.start..self.end]
            .iter()
            .map(|&code| style.apply_to(code))
            .collect();
        let end = chars.len();
        Self {
            chars,
            styles,
            start: 0,
            end,
        }
    }

    /// Re-style every non-overlapping match of `pattern`.
    ///
    /// Returns `self` unchanged (same backing buffers) when nothing matches.
    #[must_use]
    pub fn style_matches(&self, pattern: &Regex, style: AttributedStyle) -> Self {
        let text: String = self.chars[self.start..self.end].iter().collect();
        let mut ranges = pattern.find_iter(&text).peekable();
        if ranges.peek().is_none() {
            return self.clone();
        }
        let mut styles: Vec<u64> = self.styles[self.start..self.end].to_vec();
        for m in ranges {
            let from = text[..m.start()].chars().count();
            let count = text[m.start()..m.end()].chars().count();
            for code in &mut styles[from..from + count] {
                *code = style.apply_to(*code);
            }
        }
        let chars: Arc<[char]> = self.chars[self.start..self.end].into();
        let end = chars.len();
        Self {
            chars,
            styles: styles.into(),
            start: 0,
            end,
        }
    }
}

impl StyledText for AttributedString {
    #[inline]
    fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    fn char_at(&self, index: usize) -> char {
        self.chars[self.start + index]
    }

    #[inline]
    fn style_code_at(&self, index: usize) -> u64 {
        self.styles[self.start + index]
    }

    /// O(1): the backing buffers are shared, only the offsets change.
    fn sub_sequence(&self, start: usize, end: usize) -> AttributedString {
        assert!(
            start <= end && self.start + end <= self.end,
            "sub_sequence [{start}, {end}) out of range for length {}",
            self.end - self.start
        );
        Self {
            chars: Arc::clone(&self.chars),
            styles: Arc::clone(&self.styles),
            start: self.start + start,
            end: self.start + end,
        }
    }
}

impl PartialEq for AttributedString {
    /// Views are equal when their visible contents are: same characters
    /// with the same style codes, regardless of which buffer backs them.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.chars[self.start..self.end] == other.chars[other.start..other.end]
            && self.styles[self.start..self.end] == other.styles[other.start..other.end]
    }
}

impl Eq for AttributedString {}

impl Hash for AttributedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chars[self.start..self.end].hash(state);
        self.styles[self.start..self.end].hash(state);
    }
}

impl fmt::Display for AttributedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars[self.start..self.end] {
            f.write_char(*c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AttributedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributedString({:?})", self.to_string())
    }
}

impl From<&str> for AttributedString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn style_codes(s: &AttributedString) -> Vec<u64> {
        (0..s.len()).map(|i| s.style_code_at(i)).collect()
    }

    // ── Construction / views ───────────────────────────────────────────

    #[test]
    fn new_has_default_styles() {
        let s = AttributedString::new("abc");
        assert_eq!(s.len(), 3);
        assert_eq!(style_codes(&s), vec![0, 0, 0]);
        assert_eq!(s.to_string(), "abc");
    }

    #[test]
    fn sub_sequence_is_zero_copy() {
        let s = AttributedString::new("hello world");
        let sub = s.sub_sequence(6, 11);
        assert_eq!(sub.to_string(), "world");
        assert!(Arc::ptr_eq(&s.chars, &sub.chars));
        assert!(Arc::ptr_eq(&s.styles, &sub.styles));
    }

    #[test]
    fn sub_sequence_of_sub_sequence() {
        let s = AttributedString::new("0123456789");
        let sub = s.sub_sequence(2, 8).sub_sequence(1, 3);
        assert_eq!(sub.to_string(), "34");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn sub_sequence_out_of_range_panics() {
        let s = AttributedString::new("ab");
        let _ = s.sub_sequence(1, 5);
    }

    #[test]
    fn equality_compares_view_contents() {
        let a = AttributedString::new("xxabcyy").sub_sequence(2, 5);
        let b = AttributedString::new("abc");
        assert_eq!(a, b);
        let styled = AttributedString::styled("abc", AttributedStyle::DEFAULT.bold());
        assert_ne!(b, styled);
    }

    #[test]
    fn with_style_merges_over_existing() {
        let s = AttributedString::styled("ab", AttributedStyle::DEFAULT.bold());
        let italic = s.with_style(AttributedStyle::DEFAULT.italic());
        let code = italic.style_code_at(0);
        assert_ne!(code & StyleFlag::BOLD.bits(), 0);
        assert_ne!(code & StyleFlag::ITALIC.bits(), 0);
    }

    #[test]
    fn join_inserts_delimiter() {
        let d = AttributedString::new("\n");
        let parts = [AttributedString::new("a"), AttributedString::new("b")];
        let joined = AttributedString::join(&d, &parts);
        assert_eq!(joined.to_string(), "a\nb");
    }

    // ── Column arithmetic ──────────────────────────────────────────────

    #[test]
    fn column_length_wide_plus_combining() {
        // One double-width CJK character plus a zero-width combining
        // acute accent: 2 + 0, not 1 + 1.
        let s = AttributedString::new("中\u{0301}");
        assert_eq!(s.len(), 2);
        assert_eq!(s.column_length(), 2);
    }

    #[test]
    fn column_length_skips_hidden() {
        let mut sb = AttributedStringBuilder::new();
        sb.append("ab");
        sb.append_styled(AttributedStyle::DEFAULT.hidden(), "ZZZ");
        sb.append("c");
        let s = sb.to_attributed_string();
        assert_eq!(s.len(), 6);
        assert_eq!(s.column_length(), 3);
    }

    #[test]
    fn column_sub_sequence_clips_by_column() {
        let s = AttributedString::new("a中b");
        // Columns: a=1, 中=2, b=1 (total 4).
        assert_eq!(s.column_sub_sequence(0, 1).to_string(), "a");
        assert_eq!(s.column_sub_sequence(0, 3).to_string(), "a中");
        // A wide character straddling the bound is excluded.
        assert_eq!(s.column_sub_sequence(0, 2).to_string(), "a");
        assert_eq!(s.column_sub_sequence(1, 4).to_string(), "中b");
    }

    #[test]
    fn column_split_wraps_at_width() {
        let s = AttributedString::new("abcdef");
        let lines: Vec<String> = s.column_split_length(2).map(|l| l.to_string()).collect();
        assert_eq!(lines, vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn column_split_breaks_on_newline() {
        let s = AttributedString::new("ab\ncd");
        let lines: Vec<String> = s.column_split_length(80).map(|l| l.to_string()).collect();
        assert_eq!(lines, vec!["ab", "cd"]);
    }

    #[test]
    fn column_split_trailing_newline_yields_empty_line() {
        let s = AttributedString::new("ab\n");
        let lines: Vec<String> = s.column_split_length(80).map(|l| l.to_string()).collect();
        assert_eq!(lines, vec!["ab", ""]);
    }

    #[test]
    fn column_split_does_not_split_wide_char() {
        let s = AttributedString::new("a中b");
        let lines: Vec<String> = s.column_split_length(2).map(|l| l.to_string()).collect();
        // 中 does not fit after "a" in 2 columns, so it wraps whole.
        assert_eq!(lines, vec!["a", "中", "b"]);
    }

    #[test]
    fn column_split_is_restartable() {
        let s = AttributedString::new("abcd");
        assert_eq!(s.column_split_length(2).count(), 2);
        assert_eq!(s.column_split_length(2).count(), 2);
    }

    #[test]
    fn column_split_of_empty_yields_one_empty_line() {
        let s = AttributedString::new("");
        let lines: Vec<AttributedString> = s.column_split_length(10).collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_empty());
    }

    // ── ANSI serialization ─────────────────────────────────────────────

    #[test]
    fn to_ansi_plain_text_has_no_escapes() {
        let s = AttributedString::new("plain");
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "plain");
    }

    #[test]
    fn to_ansi_emits_style_once_per_run() {
        let s = AttributedString::styled("abc", AttributedStyle::DEFAULT.bold());
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "\x1b[1mabc\x1b[0m");
    }

    #[test]
    fn to_ansi_net_clear_is_bare_reset() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_styled(
            AttributedStyle::DEFAULT.bold().foreground(AttributedStyle::RED),
            "a",
        );
        sb.append("b");
        let out = sb.to_attributed_string().to_ansi(ColorDepth::Colors256);
        // The transition back to default is a single reset, not "22;39".
        assert_eq!(out, "\x1b[1;31ma\x1b[0mb");
    }

    #[test]
    fn to_ansi_emits_only_changed_bits() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_styled(AttributedStyle::DEFAULT.bold(), "a");
        sb.append_styled(
            AttributedStyle::DEFAULT.bold().foreground(AttributedStyle::GREEN),
            "b",
        );
        let out = sb.to_attributed_string().to_ansi(ColorDepth::Colors256);
        // Bold is not re-emitted for 'b'; only the color changes.
        assert_eq!(out, "\x1b[1ma\x1b[32mb\x1b[0m");
    }

    #[test]
    fn to_ansi_256_color_code() {
        let s = AttributedString::styled("x", AttributedStyle::DEFAULT.foreground(123));
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "\x1b[38;5;123mx\x1b[0m");
    }

    #[test]
    fn to_ansi_degrades_256_to_base_8() {
        let s = AttributedString::styled("x", AttributedStyle::DEFAULT.foreground(123));
        // 123 % 8 == 3 -> yellow.
        assert_eq!(s.to_ansi(ColorDepth::Colors8), "\x1b[33mx\x1b[0m");
    }

    #[test]
    fn to_ansi_truecolor_rgb() {
        let s = AttributedString::styled(
            "x",
            AttributedStyle::DEFAULT.foreground_rgb(1, 2, 3),
        );
        assert_eq!(s.to_ansi(ColorDepth::TrueColor), "\x1b[38;2;1;2;3mx\x1b[0m");
    }

    #[test]
    fn to_ansi_degrades_rgb_to_256() {
        let s = AttributedString::styled(
            "x",
            AttributedStyle::DEFAULT.foreground_rgb(255, 0, 0),
        );
        // Pure red lands on cube index 16 + 36*5 = 196.
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "\x1b[38;5;196mx\x1b[0m");
    }

    #[test]
    fn to_ansi_degrades_rgb_to_8() {
        let s = AttributedString::styled(
            "x",
            AttributedStyle::DEFAULT.foreground_rgb(255, 0, 0),
        );
        assert_eq!(s.to_ansi(ColorDepth::Colors8), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn to_ansi_background() {
        let s = AttributedString::styled(
            "x",
            AttributedStyle::DEFAULT.background(AttributedStyle::BLUE),
        );
        assert_eq!(s.to_ansi(ColorDepth::Colors256), "\x1b[44mx\x1b[0m");
    }

    #[test]
    fn to_ansi_hidden_chars_pass_through() {
        let mut sb = AttributedStringBuilder::new();
        sb.append_styled(AttributedStyle::DEFAULT.hidden(), "\x1b]0;t\x07");
        let out = sb.to_attributed_string().to_ansi(ColorDepth::Colors256);
        // The hidden flag itself produces no SGR output.
        assert_eq!(out, "\x1b]0;t\x07");
    }

    #[test]
    fn ansi_round_trip_is_stable() {
        let mut sb = AttributedStringBuilder::new();
        sb.append("plain ");
        sb.append_styled(AttributedStyle::DEFAULT.bold().foreground(AttributedStyle::RED), "red");
        sb.append_styled(AttributedStyle::DEFAULT.underline(), " under");
        let original = sb.to_attributed_string();

        let first = original.to_ansi(ColorDepth::Colors256);
        let reparsed = AttributedString::from_ansi(&first);
        let second = reparsed.to_ansi(ColorDepth::Colors256);
        assert_eq!(first, second);
        assert_eq!(original.to_string(), reparsed.to_string());
    }

    // ── Runs / regex styling ───────────────────────────────────────────

    #[test]
    fn run_boundaries() {
        let mut sb = AttributedStringBuilder::new();
        sb.append("aa");
        sb.append_styled(AttributedStyle::DEFAULT.bold(), "bb");
        sb.append("cc");
        let s = sb.to_attributed_string();
        assert_eq!(s.run_start(3), 2);
        assert_eq!(s.run_limit(3), 4);
        assert_eq!(s.run_start(0), 0);
        assert_eq!(s.run_limit(5), 6);
    }

    #[test]
    fn style_matches_restyles_matches() {
        let s = AttributedString::new("error: bad error");
        let re = Regex::new("error").unwrap();
        let styled = s.style_matches(&re, AttributedStyle::DEFAULT.bold());
        assert_ne!(styled.style_code_at(0) & StyleFlag::BOLD.bits(), 0);
        assert_eq!(styled.style_code_at(6) & StyleFlag::BOLD.bits(), 0);
        assert_ne!(styled.style_code_at(11) & StyleFlag::BOLD.bits(), 0);
        assert_eq!(styled.to_string(), s.to_string());
    }

    #[test]
    fn style_matches_no_match_shares_buffers() {
        let s = AttributedString::new("nothing here");
        let re = Regex::new("xyz").unwrap();
        let out = s.style_matches(&re, AttributedStyle::DEFAULT.bold());
        assert!(Arc::ptr_eq(&s.chars, &out.chars));
    }

    #[test]
    fn style_matches_multibyte_offsets() {
        let s = AttributedString::new("日本 abc");
        let re = Regex::new("abc").unwrap();
        let styled = s.style_matches(&re, AttributedStyle::DEFAULT.italic());
        // "abc" starts at char index 3.
        assert_eq!(styled.style_code_at(2), 0);
        assert_ne!(styled.style_code_at(3) & StyleFlag::ITALIC.bits(), 0);
    }

    // ── strip ──────────────────────────────────────────────────────────

    #[test]
    fn strip_ansi_removes_escapes() {
        assert_eq!(
            AttributedString::strip_ansi("\x1b[1;31mhot\x1b[0m stuff"),
            "hot stuff"
        );
    }
}
