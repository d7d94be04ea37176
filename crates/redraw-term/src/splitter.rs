// SPDX-License-Identifier: MIT
//
// AnsiSplitter: windows a styled character stream into bounded lines.
//
// Sits downstream of an `AnsiDecoder` and produces self-contained ANSI
// line strings. Three concerns compose here:
//
//   Windowing    only columns [begin, end) of each logical line are
//                retained. Crossing `begin` "freezes" the line: the raw
//                buffer restarts with a style prologue so the retained
//                window opens with a self-consistent rendition. Crossing
//                `end` closes the run with the offs that return to
//                default; later content is still parsed (style state
//                keeps tracking) but not written.
//
//   max_length   a hard cap on visible columns per output line; hitting
//                it closes the line and starts a fresh one under the
//                same style.
//
//   tabs         expand to the next multiple of the tab width, measured
//                in visible columns already written.
//
// Every produced line begins with the prologue for whatever style was
// active and ends with the offs back to default, so lines can be
// reordered, compared, and printed independently.

use redraw_style::char_width;

use crate::decoder::{AnsiDecoder, AnsiHandler, SgrAttribute, SgrColor};
use crate::stateful::SgrState;

/// Where the current line stands relative to the `[begin, end)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Before,
    Inside,
    After,
}

// ─── AnsiSplitter ────────────────────────────────────────────────────────────

/// Splits decoded ANSI output into bounded, style-complete lines.
pub struct AnsiSplitter {
    state: SgrState,
    /// The line under construction, escapes included.
    buf: String,
    /// Visible columns in `buf`.
    visible: usize,
    /// Visible characters of the line under construction, escape-free.
    /// Needed to rebuild the retained tail when the window freezes.
    chars: Vec<char>,
    begin: usize,
    /// Columns the window may hold (`end - begin`).
    window_len: usize,
    /// Column cap per output line, relative to the window start.
    max_len: usize,
    window: Window,
    /// Offs already emitted for this line (window close happened).
    closed: bool,
    tab_width: usize,
    forced: bool,
    lines: Vec<String>,
}

impl AnsiSplitter {
    /// Split on `max_length` columns only, no window clipping.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self::with_window(0, usize::MAX, max_length)
    }

    /// Keep only columns `[begin, end)` of each logical line, capping
    /// output lines at `max_length` columns.
    #[must_use]
    pub fn with_window(begin: usize, end: usize, max_length: usize) -> Self {
        Self {
            state: SgrState::default(),
            buf: String::new(),
            visible: 0,
            chars: Vec::new(),
            begin,
            window_len: end.saturating_sub(begin),
            max_len: max_length.saturating_sub(begin),
            window: if begin > 0 {
                Window::Before
            } else {
                Window::Inside
            },
            closed: false,
            tab_width: 0,
            forced: false,
            lines: Vec::new(),
        }
    }

    pub const fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width;
    }

    #[must_use]
    pub const fn tab_width(&self) -> usize {
        self.tab_width
    }

    #[must_use]
    pub const fn window_state(&self) -> Window {
        self.window
    }

    /// Visible columns accumulated on the pending line.
    #[must_use]
    pub const fn real_length(&self) -> usize {
        self.visible
    }

    /// Lines produced so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Flush the pending line and take everything produced.
    #[must_use]
    pub fn into_lines(mut self) -> Vec<String> {
        self.close();
        self.lines
    }

    /// Flush the pending line. A line is emitted if it has visible
    /// content, or unconditionally when the stream ended right after a
    /// newline (so a trailing empty line survives).
    pub fn close(&mut self) {
        let forced = self.forced;
        self.flush_line(forced);
    }

    // ─── Convenience drivers ──────────────────────────────────────────────

    /// Split an ANSI string into lines of at most `max_length` columns.
    #[must_use]
    pub fn split_lines(text: &str, max_length: usize, tab_width: usize) -> Vec<String> {
        let mut splitter = Self::new(max_length);
        splitter.set_tab_width(tab_width);
        let mut decoder = AnsiDecoder::new(splitter);
        decoder.write_str(text);
        decoder.into_handler().into_lines()
    }

    /// Clip an ANSI string to columns `[begin, end)` of each line.
    #[must_use]
    pub fn window_lines(text: &str, begin: usize, end: usize, tab_width: usize) -> Vec<String> {
        let mut splitter = Self::with_window(begin, end, usize::MAX);
        splitter.set_tab_width(tab_width);
        let mut decoder = AnsiDecoder::new(splitter);
        decoder.write_str(text);
        decoder.into_handler().into_lines()
    }

    // ─── Internals ────────────────────────────────────────────────────────

    fn visible_char(&mut self, ch: char) {
        let w = char_width(ch);
        if self.window != Window::After {
            self.buf.push(ch);
            self.chars.push(ch);
            self.visible += w;
        }

        if self.window == Window::Before && self.visible > self.begin {
            // Crossed the window start: restart the buffer with a style
            // prologue, keeping only the columns that overshot.
            self.window = Window::Inside;
            let overshoot = self.visible - self.begin;
            let mut kept = Vec::new();
            let mut cols = 0;
            while cols < overshoot {
                let Some(c) = self.chars.pop() else { break };
                cols += char_width(c);
                kept.push(c);
            }
            self.begin_attributes();
            for &c in kept.iter().rev() {
                self.buf.push(c);
                self.chars.push(c);
                self.visible += char_width(c);
            }
        } else if self.window == Window::Inside && self.visible >= self.window_len {
            // Window is full: close the run. Content keeps being parsed
            // for its style side effects but is no longer written.
            self.window = Window::After;
            let mut offs = String::new();
            self.state.write_offs(&mut offs);
            self.buf.push_str(&offs);
            self.closed = true;
        }

        if self.window != Window::After && self.visible >= self.max_len {
            self.flush_line(false);
        }
    }

    fn flush_line(&mut self, force: bool) {
        self.forced = force;
        if self.window == Window::Before {
            // Everything so far was in front of the window; discard it.
            self.begin_attributes();
        }
        if force || self.visible > 0 {
            if !self.closed {
                let mut offs = String::new();
                self.state.write_offs(&mut offs);
                self.buf.push_str(&offs);
            }
            let line = std::mem::take(&mut self.buf);
            self.lines.push(line);
            self.begin_attributes();
        }
        self.closed = false;
        self.window = if self.begin > 0 {
            Window::Before
        } else {
            Window::Inside
        };
    }

    /// Restart the raw buffer with the prologue for the active style.
    fn begin_attributes(&mut self) {
        self.buf.clear();
        self.visible = 0;
        self.chars.clear();
        self.state.write_prologue(&mut self.buf);
    }

    fn push_sequence(&mut self, seq: &str) {
        if self.window != Window::After {
            self.buf.push_str(seq);
        }
    }
}

impl AnsiHandler for AnsiSplitter {
    fn text(&mut self, ch: char) {
        match ch {
            '\n' => self.flush_line(true),
            '\t' => {
                if self.window == Window::After {
                    return;
                }
                if self.tab_width == 0 {
                    self.visible_char(' ');
                } else {
                    loop {
                        self.visible_char(' ');
                        if self.visible % self.tab_width == 0 {
                            break;
                        }
                    }
                }
            }
            _ => self.visible_char(ch),
        }
    }

    fn sgr_reset(&mut self) {
        if !self.state.is_default() {
            self.state.clear();
            self.push_sequence("\x1b[0m");
        }
    }

    fn sgr_attribute(&mut self, attr: SgrAttribute) {
        if SgrState::tracks(attr) && self.state.apply_attribute(attr) {
            self.push_sequence(SgrState::attribute_sequence(attr));
        }
    }

    fn sgr_foreground(&mut self, color: Option<SgrColor>) {
        if self.state.apply_foreground(color) {
            let seq = SgrState::foreground_sequence(color);
            self.push_sequence(&seq);
        }
    }

    fn sgr_background(&mut self, color: Option<SgrColor>) {
        if self.state.apply_background(color) {
            let seq = SgrState::background_sequence(color);
            self.push_sequence(&seq);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
