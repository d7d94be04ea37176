// SPDX-License-Identifier: MIT
//
// Terminal capabilities: the contract between the redraw engine and a
// real terminal.
//
// The engine never hardcodes an escape sequence for screen manipulation.
// It asks the terminal for a named capability (a terminfo-style template
// string), renders the template with its parameters, and writes the
// result. A missing capability is an answer too: every caller has a
// degrade path, so nothing here returns an error.
//
// The template language is the terminfo parameterized string subset that
// real movement and edit capabilities use: literals, %%, %i, %p1..%p9,
// %d, %c, %{n}, %'c', arithmetic, comparisons, and %? %t %e %;
// conditionals. Padding directives ($<ms>) are stripped. Directives
// outside the subset render nothing rather than failing.

// ─── Capability ──────────────────────────────────────────────────────────────

/// The capability vocabulary the redraw engine consults.
///
/// Booleans describe terminal quirks, numerics describe limits, strings
/// are escape templates. Which lookup applies is by convention, exactly
/// as in terminfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Boolean: cursor wraps to the next line at the right margin.
    AutoRightMargin,
    /// Boolean: newline is ignored after 80 cols (the xterm wrap quirk).
    EatNewlineGlitch,
    /// Numeric: colors the terminal can display.
    MaxColors,
    CarriageReturn,
    ClearScreen,
    ClrEol,
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    ParmUpCursor,
    ParmDownCursor,
    ParmLeftCursor,
    ParmRightCursor,
    InsertLine,
    ParmInsertLine,
    DeleteLine,
    ParmDeleteLine,
    InsertCharacter,
    ParmIch,
    DeleteCharacter,
    ParmDch,
}

impl Capability {
    /// The terminfo long name (`clear_screen`, `parm_ich`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AutoRightMargin => "auto_right_margin",
            Self::EatNewlineGlitch => "eat_newline_glitch",
            Self::MaxColors => "max_colors",
            Self::CarriageReturn => "carriage_return",
            Self::ClearScreen => "clear_screen",
            Self::ClrEol => "clr_eol",
            Self::CursorUp => "cursor_up",
            Self::CursorDown => "cursor_down",
            Self::CursorLeft => "cursor_left",
            Self::CursorRight => "cursor_right",
            Self::ParmUpCursor => "parm_up_cursor",
            Self::ParmDownCursor => "parm_down_cursor",
            Self::ParmLeftCursor => "parm_left_cursor",
            Self::ParmRightCursor => "parm_right_cursor",
            Self::InsertLine => "insert_line",
            Self::ParmInsertLine => "parm_insert_line",
            Self::DeleteLine => "delete_line",
            Self::ParmDeleteLine => "parm_delete_line",
            Self::InsertCharacter => "insert_character",
            Self::ParmIch => "parm_ich",
            Self::DeleteCharacter => "delete_character",
            Self::ParmDch => "parm_dch",
        }
    }

    /// The short terminfo code (`clear`, `el`, `ich`, ...).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AutoRightMargin => "am",
            Self::EatNewlineGlitch => "xenl",
            Self::MaxColors => "colors",
            Self::CarriageReturn => "cr",
            Self::ClearScreen => "clear",
            Self::ClrEol => "el",
            Self::CursorUp => "cuu1",
            Self::CursorDown => "cud1",
            Self::CursorLeft => "cub1",
            Self::CursorRight => "cuf1",
            Self::ParmUpCursor => "cuu",
            Self::ParmDownCursor => "cud",
            Self::ParmLeftCursor => "cub",
            Self::ParmRightCursor => "cuf",
            Self::InsertLine => "il1",
            Self::ParmInsertLine => "il",
            Self::DeleteLine => "dl1",
            Self::ParmDeleteLine => "dl",
            Self::InsertCharacter => "ich1",
            Self::ParmIch => "ich",
            Self::DeleteCharacter => "dch1",
            Self::ParmDch => "dch",
        }
    }
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// What the redraw engine needs from a terminal: capability lookups and a
/// raw character sink.
///
/// `write` is infallible by design; implementations buffer output and
/// surface I/O errors from their own flush step, keeping the redraw
/// algorithms free of error plumbing.
pub trait Terminal {
    /// Template string for `cap`, if the terminal supports it.
    fn string_capability(&self, cap: Capability) -> Option<&str>;

    /// Boolean capability; absent means `false`.
    fn bool_capability(&self, cap: Capability) -> bool {
        let _ = cap;
        false
    }

    /// Numeric capability, if known.
    fn numeric_capability(&self, cap: Capability) -> Option<i32> {
        let _ = cap;
        None
    }

    /// Append raw characters to the output.
    fn write(&mut self, text: &str);

    /// Render `cap` with `params` and write it. Returns whether the
    /// capability existed.
    fn puts(&mut self, cap: Capability, params: &[i32]) -> bool {
        let rendered = self
            .string_capability(cap)
            .map(|template| tputs(template, params));
        match rendered {
            Some(s) => {
                self.write(&s);
                true
            }
            None => false,
        }
    }
}

// ─── Template Rendering ──────────────────────────────────────────────────────

/// Render a terminfo parameterized template.
///
/// Implements the subset described in the module header. Missing
/// parameters read as 0; division by zero yields 0; unknown `%`
/// directives are skipped. This never fails: a garbled template renders
/// to whatever its literal parts produce.
#[must_use]
pub fn tputs(template: &str, params: &[i32]) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut locals = [0i64; 9];
    for (i, &p) in params.iter().take(9).enumerate() {
        locals[i] = i64::from(p);
    }
    let mut out = String::new();
    let mut stack: Vec<i64> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '$' && chars.get(i + 1) == Some(&'<') {
            // Padding delay: skip to '>'.
            while i < chars.len() && chars[i] != '>' {
                i += 1;
            }
            i += 1;
            continue;
        }
        if c != '%' {
            out.push(c);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&d) = chars.get(i) else { break };
        i += 1;
        match d {
            '%' => out.push('%'),
            'i' => {
                locals[0] += 1;
                locals[1] += 1;
            }
            'p' => {
                if let Some(n) = chars.get(i).and_then(|c| c.to_digit(10)) {
                    i += 1;
                    if (1..=9).contains(&n) {
                        stack.push(locals[(n - 1) as usize]);
                    }
                }
            }
            'd' => {
                let v = stack.pop().unwrap_or(0);
                out.push_str(&v.to_string());
            }
            'c' => {
                let v = stack.pop().unwrap_or(0);
                if let Some(ch) = u32::try_from(v).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            '{' => {
                let mut v: i64 = 0;
                while let Some(n) = chars.get(i).and_then(|c| c.to_digit(10)) {
                    v = v * 10 + i64::from(n);
                    i += 1;
                }
                if chars.get(i) == Some(&'}') {
                    i += 1;
                }
                stack.push(v);
            }
            '\'' => {
                if let Some(&ch) = chars.get(i) {
                    stack.push(i64::from(ch as u32));
                    i += 1;
                }
                if chars.get(i) == Some(&'\'') {
                    i += 1;
                }
            }
            '+' | '-' | '*' | '/' | 'm' => {
                let b = stack.pop().unwrap_or(0);
                let a = stack.pop().unwrap_or(0);
                stack.push(match d {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => {
                        if b == 0 {
                            0
                        } else {
                            a / b
                        }
                    }
                    _ => {
                        if b == 0 {
                            0
                        } else {
                            a % b
                        }
                    }
                });
            }
            '=' | '<' | '>' => {
                let b = stack.pop().unwrap_or(0);
                let a = stack.pop().unwrap_or(0);
                let r = match d {
                    '=' => a == b,
                    '<' => a < b,
                    _ => a > b,
                };
                stack.push(i64::from(r));
            }
            '?' | ';' => {}
            't' => {
                if stack.pop().unwrap_or(0) == 0 {
                    i = skip_to_else_or_end(&chars, i);
                }
            }
            'e' => {
                // The then-branch just ran; jump past the else-branch.
                i = skip_to_end(&chars, i);
            }
            _ => {}
        }
    }
    out
}

/// Skip forward to just past the `%e` or `%;` closing the current
/// conditional arm, honoring nested `%?`.
fn skip_to_else_or_end(chars: &[char], mut i: usize) -> usize {
    let mut depth = 0;
    while i + 1 < chars.len() {
        if chars[i] == '%' {
            match chars[i + 1] {
                '?' => depth += 1,
                ';' if depth > 0 => depth -= 1,
                ';' => return i + 2,
                'e' if depth == 0 => return i + 2,
                _ => {}
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    chars.len()
}

/// Skip forward to just past the `%;` closing the current conditional.
fn skip_to_end(chars: &[char], mut i: usize) -> usize {
    let mut depth = 0;
    while i + 1 < chars.len() {
        if chars[i] == '%' {
            match chars[i + 1] {
                '?' => depth += 1,
                ';' if depth > 0 => depth -= 1,
                ';' => return i + 2,
                _ => {}
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    chars.len()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── tputs ──────────────────────────────────────────────────────────

    #[test]
    fn plain_literal_passes_through() {
        assert_eq!(tputs("\x1b[K", &[]), "\x1b[K");
    }

    #[test]
    fn single_parameter_decimal() {
        // xterm parm_up_cursor.
        assert_eq!(tputs("\x1b[%p1%dA", &[5]), "\x1b[5A");
    }

    #[test]
    fn cursor_address_increments_both_params() {
        // xterm cursor_address: %i makes coordinates 1-based.
        assert_eq!(tputs("\x1b[%i%p1%d;%p2%dH", &[2, 3]), "\x1b[3;4H");
    }

    #[test]
    fn missing_params_read_as_zero() {
        assert_eq!(tputs("\x1b[%p1%dB", &[]), "\x1b[0B");
    }

    #[test]
    fn percent_escape() {
        assert_eq!(tputs("100%%", &[]), "100%");
    }

    #[test]
    fn char_constant_and_output() {
        assert_eq!(tputs("%'x'%c", &[]), "x");
    }

    #[test]
    fn arithmetic() {
        assert_eq!(tputs("%p1%{10}%+%d", &[5]), "15");
        assert_eq!(tputs("%p1%{3}%-%d", &[5]), "2");
        assert_eq!(tputs("%p1%{2}%*%d", &[5]), "10");
    }

    #[test]
    fn conditional_then_branch() {
        assert_eq!(tputs("%?%p1%t+%e-%;", &[1]), "+");
    }

    #[test]
    fn conditional_else_branch() {
        assert_eq!(tputs("%?%p1%t+%e-%;", &[0]), "-");
    }

    #[test]
    fn conditional_without_else() {
        assert_eq!(tputs("a%?%p1%tX%;b", &[0]), "ab");
        assert_eq!(tputs("a%?%p1%tX%;b", &[1]), "aXb");
    }

    #[test]
    fn comparison() {
        assert_eq!(tputs("%p1%{5}%<%d", &[3]), "1");
        assert_eq!(tputs("%p1%{5}%<%d", &[7]), "0");
    }

    #[test]
    fn padding_is_stripped() {
        assert_eq!(tputs("\x1b[L$<5>", &[]), "\x1b[L");
    }

    #[test]
    fn unknown_directive_renders_nothing() {
        assert_eq!(tputs("a%qb", &[]), "ab");
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(tputs("%p1%{0}%/%d", &[5]), "0");
    }

    // ── Capability names ───────────────────────────────────────────────

    #[test]
    fn long_and_short_names() {
        assert_eq!(Capability::ClrEol.name(), "clr_eol");
        assert_eq!(Capability::ClrEol.code(), "el");
        assert_eq!(Capability::ParmIch.name(), "parm_ich");
        assert_eq!(Capability::ParmIch.code(), "ich");
    }

    // ── Terminal::puts ─────────────────────────────────────────────────

    struct OneCapTerminal {
        out: String,
    }

    impl Terminal for OneCapTerminal {
        fn string_capability(&self, cap: Capability) -> Option<&str> {
            (cap == Capability::ParmDch).then_some("\x1b[%p1%dP")
        }

        fn write(&mut self, text: &str) {
            self.out.push_str(text);
        }
    }

    #[test]
    fn puts_renders_and_writes() {
        let mut t = OneCapTerminal { out: String::new() };
        assert!(t.puts(Capability::ParmDch, &[3]));
        assert_eq!(t.out, "\x1b[3P");
    }

    #[test]
    fn puts_missing_capability_is_false() {
        let mut t = OneCapTerminal { out: String::new() };
        assert!(!t.puts(Capability::ClrEol, &[]));
        assert!(t.out.is_empty());
    }
}
