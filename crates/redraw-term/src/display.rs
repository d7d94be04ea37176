// SPDX-License-Identifier: MIT
//
// Display: the screen-diff redraw engine.
//
// One instance per terminal session. The caller hands `update` the full
// set of lines it wants on screen; the engine diffs them against what it
// believes is already there and writes the cheapest escape-sequence
// update it can: scrolls realized with insert/delete-line, per-line
// edits realized with insert/delete-character where the terminal has
// them, cleared tails via clr_eol, and cursor motion chosen by rendered
// byte cost.
//
// Nothing is verified against the real screen. The engine trusts its own
// writes; if something else scribbles on the terminal, the caller must
// `reset()` to force a full repaint.
//
// Every capability use degrades: no capability is required for
// correctness, only for byte economy.

use std::collections::HashMap;

use log::trace;
use redraw_style::{AttributedString, ColorDepth, StyledText};

use crate::caps::{tputs, Capability, Terminal};
use crate::diff::{diff, DiffOp};

/// Visible column width of an ANSI string.
#[must_use]
pub fn wcwidth(ansi: &str) -> usize {
    AttributedString::from_ansi(ansi).column_length()
}

// ─── Display ─────────────────────────────────────────────────────────────────

/// Stateful redraw engine over a [`Terminal`].
pub struct Display<T: Terminal> {
    terminal: T,
    full_screen: bool,
    old_lines: Vec<AttributedString>,
    cursor_pos: usize,
    cursor_ok: bool,
    columns: usize,
    rows: usize,
    pending_clear: bool,
    cost: HashMap<Capability, usize>,
    can_scroll: bool,
    no_wrap_at_eol: bool,
    cursor_down_is_newline: bool,
    color_depth: ColorDepth,
}

impl<T: Terminal> Display<T> {
    /// Wrap a terminal. `full_screen` enables scroll detection and
    /// `clear()`; line-mode callers (prompt redrawing) pass `false`.
    pub fn new(terminal: T, full_screen: bool) -> Self {
        let can = |single: Capability, multi: Capability| {
            terminal.string_capability(single).is_some()
                || terminal.string_capability(multi).is_some()
        };
        let can_scroll = can(Capability::InsertLine, Capability::ParmInsertLine)
            && can(Capability::DeleteLine, Capability::ParmDeleteLine);
        let no_wrap_at_eol = terminal.bool_capability(Capability::AutoRightMargin)
            && terminal.bool_capability(Capability::EatNewlineGlitch);
        let cursor_down_is_newline = terminal
            .string_capability(Capability::CursorDown)
            .is_some_and(|t| tputs(t, &[]) == "\n");
        let color_depth =
            ColorDepth::from_max_colors(terminal.numeric_capability(Capability::MaxColors));
        Self {
            terminal,
            full_screen,
            old_lines: Vec::new(),
            cursor_pos: 0,
            cursor_ok: false,
            columns: 0,
            rows: 0,
            pending_clear: false,
            cost: HashMap::new(),
            can_scroll,
            no_wrap_at_eol,
            cursor_down_is_newline,
            color_depth,
        }
    }

    #[must_use]
    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    /// Adopt new dimensions, re-wrapping the remembered frame at the new
    /// width so the next diff compares like with like.
    pub fn resize(&mut self, rows: usize, columns: usize) {
        if self.rows != rows || self.columns != columns {
            self.rows = rows;
            self.columns = columns;
            if !self.old_lines.is_empty() {
                let joined =
                    AttributedString::join(&AttributedString::new("\n"), self.old_lines.iter());
                self.old_lines = joined.column_split_length(columns).collect();
            }
        }
    }

    /// Forget the remembered frame; the next update repaints everything.
    pub fn reset(&mut self) {
        self.old_lines.clear();
    }

    /// Schedule a whole-screen clear before the next update.
    /// Full-screen mode only; a no-op otherwise.
    pub fn clear(&mut self) {
        if self.full_screen {
            self.pending_clear = true;
        }
    }

    /// Parse ANSI lines, then [`update`](Self::update).
    pub fn update_ansi<S: AsRef<str>>(&mut self, new_lines: &[S], target_cursor_pos: Option<usize>) {
        let lines = new_lines
            .iter()
            .map(|l| AttributedString::from_ansi(l.as_ref()))
            .collect();
        self.update(lines, target_cursor_pos);
    }

    /// Redraw the screen to show `new_lines`, leaving the cursor at
    /// `target_cursor_pos` (a linear `row * columns + col` offset), or
    /// wherever the update ends when `None`.
    ///
    /// # Panics
    ///
    /// Panics if `resize` has never been called; the engine cannot place
    /// a cursor on a zero-width screen.
    pub fn update(&mut self, new_lines: Vec<AttributedString>, target_cursor_pos: Option<usize>) {
        assert!(self.columns > 0, "resize() must be called before update()");

        if self.pending_clear {
            trace!("clearing screen before update");
            self.terminal.puts(Capability::ClearScreen, &[]);
            self.old_lines.clear();
            self.cursor_pos = 0;
            self.cursor_ok = true;
            self.pending_clear = false;
        }

        self.detect_scroll(&new_lines);

        let mut line_index = 0;
        let mut current_pos = 0;
        while line_index < self.old_lines.len().min(new_lines.len()) {
            let old_line = self.old_lines[line_index].clone();
            let new_line = new_lines[line_index].clone();
            let cur_col = current_pos;
            self.update_line(&old_line, &new_line, current_pos);

            line_index += 1;
            if !self.cursor_ok
                && self.no_wrap_at_eol
                && self.cursor_pos == cur_col + self.columns
            {
                // The line exactly filled the width; with am+xenl the
                // terminal's wrap state is unreliable, so re-anchor.
                self.terminal.puts(Capability::CarriageReturn, &[]);
                self.cursor_pos = cur_col;
                self.cursor_ok = true;
            }
            current_pos = if line_index < self.old_lines.len().max(new_lines.len()) {
                cur_col + self.columns
            } else {
                cur_col + new_line.column_length()
            };
        }

        // Rows present in only one of the frames.
        while line_index < self.old_lines.len().max(new_lines.len()) {
            self.move_visual_cursor_to(current_pos);
            if line_index < self.old_lines.len() {
                if self.terminal.string_capability(Capability::ClrEol).is_some() {
                    self.terminal.puts(Capability::ClrEol, &[]);
                } else {
                    let nb = self.old_lines[line_index].column_length();
                    self.raw_print_repeat(' ', nb);
                    self.cursor_pos += nb;
                    self.cursor_ok = false;
                }
            } else {
                let line = new_lines[line_index].clone();
                self.raw_print(&line);
                self.cursor_pos += line.column_length();
                self.cursor_ok = false;
            }
            if !self.cursor_ok
                && self.no_wrap_at_eol
                && self.cursor_pos == current_pos + self.columns
            {
                self.terminal.puts(Capability::CarriageReturn, &[]);
                self.cursor_pos = current_pos;
                self.cursor_ok = true;
            }
            line_index += 1;
            current_pos = if line_index < self.old_lines.len().max(new_lines.len()) {
                current_pos + self.columns
            } else {
                self.cursor_pos
            };
        }

        self.move_visual_cursor_to(target_cursor_pos.unwrap_or(current_pos));
        self.old_lines = new_lines;
    }

    // ─── Scroll detection ─────────────────────────────────────────────────

    /// Realize a vertical shift of the interior with insert/delete-line
    /// instead of rewriting every moved line. Full-screen mode only, and
    /// only when both frames have the same height.
    fn detect_scroll(&mut self, new_lines: &[AttributedString]) {
        if !self.full_screen || new_lines.len() != self.old_lines.len() || !self.can_scroll {
            return;
        }
        let l = new_lines.len();
        let mut nb_headers = 0;
        while nb_headers < l && new_lines[nb_headers] == self.old_lines[nb_headers] {
            nb_headers += 1;
        }
        let mut nb_footers = 0;
        while nb_headers + nb_footers + 1 < l
            && new_lines[l - nb_footers - 1] == self.old_lines[l - nb_footers - 1]
        {
            nb_footers += 1;
        }
        let o1 = &new_lines[nb_headers..l - nb_footers];
        let o2 = &self.old_lines[nb_headers..l - nb_footers];
        let Some((s1, s2, sl)) = longest_common(o1, o2) else {
            return;
        };
        if sl > 1 && s1 < s2 {
            // Content moved up: delete the rows above the common block,
            // then restore the height with blank rows below it.
            let nb = s2 - s1;
            trace!("scroll up detected: {nb} lines");
            self.move_visual_cursor_to((nb_headers + s1) * self.columns);
            self.delete_lines(nb);
            self.old_lines.drain(nb_headers + s1..nb_headers + s1 + nb);
            self.move_visual_cursor_to((nb_headers + s1 + sl) * self.columns);
            self.insert_lines(nb);
            for _ in 0..nb {
                self.old_lines
                    .insert(nb_headers + s1 + sl, AttributedString::new(""));
            }
        } else if sl > 1 && s1 > s2 {
            // Content moved down: drop rows below the common block, then
            // open blank rows above it.
            let nb = s1 - s2;
            trace!("scroll down detected: {nb} lines");
            self.move_visual_cursor_to((nb_headers + s2 + sl) * self.columns);
            self.delete_lines(nb);
            self.old_lines
                .drain(nb_headers + s2 + sl..nb_headers + s2 + sl + nb);
            self.move_visual_cursor_to((nb_headers + s2) * self.columns);
            self.insert_lines(nb);
            for _ in 0..nb {
                self.old_lines
                    .insert(nb_headers + s2, AttributedString::new(""));
            }
        }
    }

    // ─── Per-line reconciliation ──────────────────────────────────────────

    /// Replay one line's diff against the terminal.
    fn update_line(
        &mut self,
        old_line: &AttributedString,
        new_line: &AttributedString,
        start_pos: usize,
    ) {
        let diffs = diff(old_line, new_line);
        let cur_col = start_pos;
        let mut current_pos = start_pos;
        let mut ident = true;
        let mut cleared = false;
        let mut i = 0;
        while i < diffs.len() {
            let d = &diffs[i];
            let width = d.text.column_length();
            match d.op {
                DiffOp::Equal => {
                    if ident {
                        // Unchanged and nothing moved yet: advance the
                        // virtual cursor without touching the terminal.
                        current_pos += width;
                    } else {
                        self.move_visual_cursor_to(current_pos);
                        self.raw_print(&d.text);
                        self.cursor_pos += width;
                        self.cursor_ok = false;
                        current_pos = self.cursor_pos;
                    }
                }
                DiffOp::Insert => {
                    if i + 1 < diffs.len() && diffs[i + 1].op == DiffOp::Equal {
                        // A suffix survives: try to slide it right.
                        self.move_visual_cursor_to(current_pos);
                        if self.insert_chars(width) {
                            self.raw_print(&d.text);
                            self.cursor_pos += width;
                            self.cursor_ok = false;
                            current_pos = self.cursor_pos;
                            i += 1;
                            continue;
                        }
                    } else if i + 1 < diffs.len()
                        && diffs[i + 1].op == DiffOp::Delete
                        && width == diffs[i + 1].text.column_length()
                    {
                        // Same-width replacement: plain overwrite, and
                        // the delete is thereby already handled.
                        self.move_visual_cursor_to(current_pos);
                        self.raw_print(&d.text);
                        self.cursor_pos += width;
                        self.cursor_ok = false;
                        current_pos = self.cursor_pos;
                        i += 2;
                        continue;
                    }
                    self.move_visual_cursor_to(current_pos);
                    self.raw_print(&d.text);
                    self.cursor_pos += width;
                    self.cursor_ok = false;
                    current_pos = self.cursor_pos;
                    ident = false;
                }
                DiffOp::Delete => {
                    if cleared || current_pos - cur_col >= self.columns {
                        // Already blanked, or entirely off the right
                        // edge: nothing visible to remove.
                        i += 1;
                        continue;
                    }
                    if i + 1 < diffs.len()
                        && diffs[i + 1].op == DiffOp::Equal
                        && current_pos + diffs[i + 1].text.column_length() < self.columns
                    {
                        self.move_visual_cursor_to(current_pos);
                        if self.delete_chars(width) {
                            i += 1;
                            continue;
                        }
                    }
                    // Trailing delete: blank to the end of the content.
                    let old_len = old_line.column_length();
                    let new_len = new_line.column_length();
                    let nb = old_len.max(new_len).saturating_sub(current_pos - cur_col);
                    self.move_visual_cursor_to(current_pos);
                    if !self.terminal.puts(Capability::ClrEol, &[]) {
                        self.raw_print_repeat(' ', nb);
                        self.cursor_pos += nb;
                        self.cursor_ok = false;
                    }
                    cleared = true;
                    ident = false;
                }
            }
            i += 1;
        }
    }

    // ─── Capability-backed operations ─────────────────────────────────────

    fn delete_lines(&mut self, nb: usize) -> bool {
        self.perform(Capability::DeleteLine, Capability::ParmDeleteLine, nb)
    }

    fn insert_lines(&mut self, nb: usize) -> bool {
        self.perform(Capability::InsertLine, Capability::ParmInsertLine, nb)
    }

    fn insert_chars(&mut self, nb: usize) -> bool {
        self.perform(Capability::InsertCharacter, Capability::ParmIch, nb)
    }

    fn delete_chars(&mut self, nb: usize) -> bool {
        self.perform(Capability::DeleteCharacter, Capability::ParmDch, nb)
    }

    /// Run an operation `nb` times, choosing between the repeated
    /// single-step capability and the parameterized one by rendered byte
    /// cost. False when the terminal has neither.
    fn perform(&mut self, single: Capability, multi: Capability, nb: usize) -> bool {
        let has_single = self.terminal.string_capability(single).is_some();
        let has_multi = self.terminal.string_capability(multi).is_some();
        if has_multi && (!has_single || self.cost(single) * nb > self.cost(multi)) {
            self.terminal.puts(multi, &[to_i32(nb)]);
            true
        } else if has_single {
            for _ in 0..nb {
                self.terminal.puts(single, &[]);
            }
            true
        } else {
            false
        }
    }

    /// Byte cost of one use of `cap`, measured by rendering its template
    /// once (with parameter 0) and caching the length. Missing
    /// capabilities cost the moon so they never win a comparison.
    fn cost(&mut self, cap: Capability) -> usize {
        if let Some(&cached) = self.cost.get(&cap) {
            return cached;
        }
        let cost = self
            .terminal
            .string_capability(cap)
            .map_or(usize::MAX, |t| tputs(t, &[0]).len());
        self.cost.insert(cap, cost);
        cost
    }

    // ─── Cursor ───────────────────────────────────────────────────────────

    /// Move the real cursor to the linear offset `target`, choosing the
    /// cheapest motion per axis.
    fn move_visual_cursor_to(&mut self, target: usize) -> usize {
        let i0 = self.cursor_pos;
        if i0 == target {
            return target;
        }
        let width = self.columns;
        let l0 = i0 / width;
        let mut c0 = i0 % width;
        let l1 = target / width;
        let c1 = target % width;
        if l0 > l1 {
            self.perform(Capability::CursorUp, Capability::ParmUpCursor, l0 - l1);
        } else if l0 < l1 {
            if self.full_screen {
                if !self
                    .terminal
                    .puts(Capability::ParmDownCursor, &[to_i32(l1 - l0)])
                {
                    for _ in l0..l1 {
                        self.terminal.puts(Capability::CursorDown, &[]);
                    }
                    if self.cursor_down_is_newline {
                        c0 = 0;
                    }
                }
            } else {
                // In line mode a newline is both cheap and guaranteed.
                self.raw_print_repeat('\n', l1 - l0);
                c0 = 0;
            }
        }
        if c0 != 0 && c1 == 0 {
            self.terminal.puts(Capability::CarriageReturn, &[]);
        } else if c0 < c1 {
            self.perform(
                Capability::CursorRight,
                Capability::ParmRightCursor,
                c1 - c0,
            );
        } else if c0 > c1 {
            self.perform(Capability::CursorLeft, Capability::ParmLeftCursor, c0 - c1);
        }
        self.cursor_pos = target;
        self.cursor_ok = true;
        target
    }

    // ─── Raw output ───────────────────────────────────────────────────────

    fn raw_print(&mut self, text: &AttributedString) {
        let ansi = text.to_ansi(self.color_depth);
        self.terminal.write(&ansi);
    }

    fn raw_print_repeat(&mut self, c: char, n: usize) {
        if n > 0 {
            let s: String = std::iter::repeat(c).take(n).collect();
            self.terminal.write(&s);
        }
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Longest contiguous run of equal lines between two slices, as
/// `(start_in_l1, start_in_l2, length)`. Two-pointer scan over every
/// anchor pair; terminal heights are small enough that O(n * m) is fine.
fn longest_common(
    l1: &[AttributedString],
    l2: &[AttributedString],
) -> Option<(usize, usize, usize)> {
    let mut best = (0, 0, 0);
    for i in 0..l1.len() {
        for j in 0..l2.len() {
            let mut x = 0;
            while i + x < l1.len() && j + x < l2.len() && l1[i + x] == l2[j + x] {
                x += 1;
            }
            if x > best.2 {
                best = (i, j, x);
            }
        }
    }
    (best.2 != 0).then_some(best)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use redraw_style::AttributedStyle;
    use std::collections::HashMap;

    /// A scriptable terminal: capability tables plus an output log.
    struct TestTerminal {
        strings: HashMap<Capability, &'static str>,
        bools: Vec<Capability>,
        numerics: HashMap<Capability, i32>,
        out: String,
    }

    impl TestTerminal {
        /// An xterm-like capability set.
        fn xterm() -> Self {
            let strings = HashMap::from([
                (Capability::ClearScreen, "\x1b[H\x1b[2J"),
                (Capability::ClrEol, "\x1b[K"),
                (Capability::CarriageReturn, "\r"),
                (Capability::CursorUp, "\x1b[A"),
                (Capability::CursorDown, "\n"),
                (Capability::CursorLeft, "\x08"),
                (Capability::CursorRight, "\x1b[C"),
                (Capability::ParmUpCursor, "\x1b[%p1%dA"),
                (Capability::ParmDownCursor, "\x1b[%p1%dB"),
                (Capability::ParmLeftCursor, "\x1b[%p1%dD"),
                (Capability::ParmRightCursor, "\x1b[%p1%dC"),
                (Capability::InsertLine, "\x1b[L"),
                (Capability::ParmInsertLine, "\x1b[%p1%dL"),
                (Capability::DeleteLine, "\x1b[M"),
                (Capability::ParmDeleteLine, "\x1b[%p1%dM"),
                (Capability::ParmIch, "\x1b[%p1%d@"),
                (Capability::DeleteCharacter, "\x1b[P"),
                (Capability::ParmDch, "\x1b[%p1%dP"),
            ]);
            Self {
                strings,
                bools: vec![Capability::AutoRightMargin],
                numerics: HashMap::from([(Capability::MaxColors, 256)]),
                out: String::new(),
            }
        }

        /// A terminal with no capabilities at all.
        fn dumb() -> Self {
            Self {
                strings: HashMap::new(),
                bools: Vec::new(),
                numerics: HashMap::new(),
                out: String::new(),
            }
        }

        fn without(mut self, cap: Capability) -> Self {
            self.strings.remove(&cap);
            self
        }

        fn take_out(&mut self) -> String {
            std::mem::take(&mut self.out)
        }
    }

    impl Terminal for TestTerminal {
        fn string_capability(&self, cap: Capability) -> Option<&str> {
            self.strings.get(&cap).copied()
        }

        fn bool_capability(&self, cap: Capability) -> bool {
            self.bools.contains(&cap)
        }

        fn numeric_capability(&self, cap: Capability) -> Option<i32> {
            self.numerics.get(&cap).copied()
        }

        fn write(&mut self, text: &str) {
            self.out.push_str(text);
        }
    }

    fn lines(texts: &[&str]) -> Vec<AttributedString> {
        texts.iter().map(|t| AttributedString::new(t)).collect()
    }

    fn full_screen_display(columns: usize, rows: usize) -> Display<TestTerminal> {
        let mut d = Display::new(TestTerminal::xterm(), true);
        d.resize(rows, columns);
        d
    }

    fn line_display(columns: usize) -> Display<TestTerminal> {
        let mut d = Display::new(TestTerminal::xterm(), false);
        d.resize(1, columns);
        d
    }

    // ── Basic painting ─────────────────────────────────────────────────

    #[test]
    fn first_update_writes_lines() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["hello", "world"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("hello"));
        assert!(out.contains("world"));
    }

    #[test]
    fn identical_update_writes_no_content() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["hello", "world"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["hello", "world"]), None);
        let out = d.terminal_mut().take_out();
        // No visible characters; at most cursor motion.
        assert!(!out.contains("hello"));
        assert!(!out.contains("world"));
        assert!(!out.chars().any(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn single_character_change_rewrites_only_the_change() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["hello"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["hXllo"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains('X'));
        // The unchanged suffix is not rewritten.
        assert!(!out.contains("llo"));
    }

    #[test]
    fn styled_line_emits_sgr() {
        let mut d = full_screen_display(20, 4);
        let line = AttributedString::styled("err", AttributedStyle::DEFAULT.bold());
        d.update(vec![line], None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("\x1b[1merr\x1b[0m"));
    }

    // ── Cursor placement ───────────────────────────────────────────────

    #[test]
    fn target_cursor_move_to_line_start_uses_cr() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["hello"]), Some(0));
        let out = d.terminal_mut().take_out();
        assert!(out.ends_with('\r'));
    }

    #[test]
    fn cursor_chooses_cheaper_motion() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["abcdefgh"]), None);
        d.terminal_mut().take_out();

        // One column left: a single backspace beats "\x1b[1D".
        d.update(lines(&["abcdefgX"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains('\x08'));
        assert!(!out.contains("\x1b[1D"));
    }

    #[test]
    fn far_cursor_move_uses_parameterized_capability() {
        let mut d = full_screen_display(40, 4);
        d.update(lines(&["abcdefghijklmnopqrst"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["aXcdefghijklmnopqrst"]), None);
        let out = d.terminal_mut().take_out();
        // 19 columns back: the parameterized form wins over 19 backspaces.
        assert!(out.contains("\x1b[19D"));
        assert!(!out.contains('\x08'));
    }

    // ── Clearing ───────────────────────────────────────────────────────

    #[test]
    fn shrinking_line_uses_clr_eol() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["hello world"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["hello"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("\x1b[K"));
    }

    #[test]
    fn shrinking_line_without_clr_eol_space_fills() {
        let mut d = Display::new(TestTerminal::xterm().without(Capability::ClrEol), true);
        d.resize(4, 20);
        d.update(lines(&["hello"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["he"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("   "));
    }

    #[test]
    fn removed_trailing_line_is_blanked() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["one", "two"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["one"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("\x1b[K"));
    }

    #[test]
    fn clear_schedules_full_repaint() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["before"]), None);
        d.terminal_mut().take_out();

        d.clear();
        d.update(lines(&["after"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.starts_with("\x1b[H\x1b[2J"));
        assert!(out.contains("after"));
    }

    #[test]
    fn clear_is_noop_in_line_mode() {
        let mut d = line_display(20);
        d.update(lines(&["before"]), None);
        d.terminal_mut().take_out();

        d.clear();
        d.update(lines(&["before"]), None);
        let out = d.terminal_mut().take_out();
        assert!(!out.contains("\x1b[2J"));
    }

    // ── Scroll detection ───────────────────────────────────────────────

    #[test]
    fn scrolling_uses_line_delete_and_insert() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["AA", "BB", "CC", "DD"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["BB", "CC", "DD", "EE"]), None);
        let out = d.terminal_mut().take_out();
        // One delete-line, one insert-line, one fresh line. The common
        // block BB/CC/DD is not rewritten.
        assert_eq!(out.matches("\x1b[M").count(), 1);
        assert_eq!(out.matches("\x1b[L").count(), 1);
        assert!(out.contains("EE"));
        assert!(!out.contains("BB"));
        assert!(!out.contains("CC"));
        assert!(!out.contains("DD"));
    }

    #[test]
    fn scroll_down_inserts_above() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["BB", "CC", "DD", "EE"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["AA", "BB", "CC", "DD"]), None);
        let out = d.terminal_mut().take_out();
        assert_eq!(out.matches("\x1b[M").count(), 1);
        assert_eq!(out.matches("\x1b[L").count(), 1);
        assert!(out.contains("AA"));
        assert!(!out.contains("CC"));
    }

    #[test]
    fn no_scroll_without_line_capabilities() {
        let mut d = Display::new(
            TestTerminal::xterm()
                .without(Capability::DeleteLine)
                .without(Capability::ParmDeleteLine),
            true,
        );
        d.resize(4, 20);
        d.update(lines(&["AA", "BB", "CC", "DD"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["BB", "CC", "DD", "EE"]), None);
        let out = d.terminal_mut().take_out();
        // Without delete-line the shifted lines are rewritten.
        assert!(out.contains("BB"));
        assert!(out.contains("EE"));
    }

    #[test]
    fn scroll_detection_skipped_in_line_mode() {
        let mut d = line_display(20);
        d.resize(4, 20);
        d.update(lines(&["AA", "BB", "CC", "DD"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["BB", "CC", "DD", "EE"]), None);
        let out = d.terminal_mut().take_out();
        assert_eq!(out.matches("\x1b[M").count(), 0);
    }

    // ── Insert/delete characters ───────────────────────────────────────

    #[test]
    fn insertion_before_suffix_uses_insert_chars() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["abcdef"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["abXcdef"]), None);
        let out = d.terminal_mut().take_out();
        // ich slides the suffix right; the suffix itself is not rewritten.
        assert!(out.contains("\x1b[1@"));
        assert!(out.contains('X'));
        assert!(!out.contains("cdef"));
    }

    #[test]
    fn deletion_before_suffix_uses_delete_chars() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["abXcdef"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["abcdef"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("\x1b[P") || out.contains("\x1b[1P"));
        assert!(!out.contains("cdef"));
    }

    // ── Resize ─────────────────────────────────────────────────────────

    #[test]
    fn resize_rewraps_remembered_lines() {
        let mut d = full_screen_display(6, 2);
        d.update(lines(&["abcdef"]), None);
        d.terminal_mut().take_out();

        d.resize(4, 3);
        // The remembered frame is now ["abc", "def"]; updating to the
        // same wrapped content writes nothing visible.
        d.update(lines(&["abc", "def"]), None);
        let out = d.terminal_mut().take_out();
        assert!(!out.chars().any(|c| c.is_ascii_alphanumeric()));
    }

    // ── Wide characters ────────────────────────────────────────────────

    #[test]
    fn wide_characters_advance_two_columns() {
        let mut d = full_screen_display(20, 4);
        d.update(lines(&["中文"]), None);
        d.terminal_mut().take_out();

        // Append after the wide prefix: cursor must land on column 4.
        d.update(lines(&["中文x"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains('x'));
        assert!(!out.contains('中'));
    }

    // ── update_ansi / wcwidth ──────────────────────────────────────────

    #[test]
    fn update_ansi_parses_lines() {
        let mut d = full_screen_display(20, 4);
        d.update_ansi(&["\x1b[31mred\x1b[0m"], None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("red"));
        assert!(out.contains("\x1b[31m"));
    }

    #[test]
    fn wcwidth_measures_visible_columns() {
        assert_eq!(wcwidth("abc"), 3);
        assert_eq!(wcwidth("\x1b[1m中\x1b[0m"), 2);
    }

    // ── Degenerate terminals ───────────────────────────────────────────

    #[test]
    fn dumb_terminal_still_renders_content() {
        let mut d = Display::new(TestTerminal::dumb(), false);
        d.resize(1, 40);
        d.update(lines(&["plain text"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains("plain text"));
    }

    #[test]
    fn dumb_terminal_overwrite_with_spaces() {
        let mut d = Display::new(TestTerminal::dumb(), false);
        d.resize(1, 40);
        d.update(lines(&["long line here"]), None);
        d.terminal_mut().take_out();

        d.update(lines(&["short"]), None);
        let out = d.terminal_mut().take_out();
        assert!(out.contains(' '));
    }
}
