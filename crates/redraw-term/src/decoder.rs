// SPDX-License-Identifier: MIT
//
// ANSI escape sequence decoder.
//
// A pull-based state machine: feed it characters one at a time (or in
// str-sized chunks) and it dispatches structured operations to an
// `AnsiHandler`. The handler trait has a default no-op body for every
// operation except literal text, so implementors override only what
// they care about.
//
// Parsing is incremental. The decoder keeps its state between calls,
// so a sequence split across two writes parses identically to the
// whole thing in one write.
//
// Malformed input is never an error. The in-flight sequence is kept in
// a bounded buffer (100 chars); on an unexpected character, an
// unrecognized terminator, or buffer overflow, the buffered characters
// are replayed to the handler as literal text and parsing resumes from
// ground state.

// ─── Operations ──────────────────────────────────────────────────────────────

/// Escape buffer cap. Anything longer is not a sequence we recognize
/// and degrades to literal text.
pub const MAX_ESCAPE_LENGTH: usize = 100;

/// Sub-mode of the erase-screen / erase-line commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    /// From the cursor to the end (mode 0, the default).
    ToEnd,
    /// From the start to the cursor (mode 1).
    ToBegin,
    /// Everything (mode 2).
    All,
}

impl EraseMode {
    #[must_use]
    pub const fn from_param(n: u32) -> Self {
        match n {
            1 => Self::ToBegin,
            2 => Self::All,
            _ => Self::ToEnd,
        }
    }
}

/// An SGR attribute transition, already decoded from its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgrAttribute {
    IntensityBold,
    IntensityFaint,
    IntensityNormal,
    ItalicOn,
    ItalicOff,
    UnderlineSingle,
    UnderlineDouble,
    UnderlineOff,
    BlinkSlow,
    BlinkFast,
    BlinkOff,
    NegativeOn,
    NegativeOff,
    ConcealOn,
    ConcealOff,
    CrossedOutOn,
    CrossedOutOff,
}

impl SgrAttribute {
    /// Map a raw SGR parameter to a transition, if it is one.
    #[must_use]
    pub const fn from_param(n: u32) -> Option<Self> {
        Some(match n {
            1 => Self::IntensityBold,
            2 => Self::IntensityFaint,
            3 => Self::ItalicOn,
            4 => Self::UnderlineSingle,
            5 => Self::BlinkSlow,
            6 => Self::BlinkFast,
            7 => Self::NegativeOn,
            8 => Self::ConcealOn,
            9 => Self::CrossedOutOn,
            21 => Self::UnderlineDouble,
            22 => Self::IntensityNormal,
            23 => Self::ItalicOff,
            24 => Self::UnderlineOff,
            25 => Self::BlinkOff,
            27 => Self::NegativeOff,
            28 => Self::ConcealOff,
            29 => Self::CrossedOutOff,
            _ => return None,
        })
    }
}

/// A color argument of an SGR sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgrColor {
    /// Base palette 0-7 (SGR 30-37 / 40-47).
    Base(u8),
    /// Bright palette 0-7 (SGR 90-97 / 100-107).
    Bright(u8),
    /// 256-color palette index (SGR 38;5;n).
    Indexed(u8),
    /// Direct color (SGR 38;2;r;g;b).
    Rgb(u8, u8, u8),
}

/// One collected CSI argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsiArg {
    Num(u32),
    /// A `"`-quoted string argument.
    Str(String),
    /// A private-mode marker (`?` or `=`).
    Mark(char),
    /// An omitted argument (bare `;`).
    Empty,
}

// ─── AnsiHandler ─────────────────────────────────────────────────────────────

/// Receiver for decoded operations. Override only what you need; text is
/// the one thing every handler must accept.
pub trait AnsiHandler {
    /// A literal character, including replayed malformed escape input.
    fn text(&mut self, ch: char);

    fn cursor_up(&mut self, n: u32) {
        let _ = n;
    }
    fn cursor_down(&mut self, n: u32) {
        let _ = n;
    }
    fn cursor_right(&mut self, n: u32) {
        let _ = n;
    }
    fn cursor_left(&mut self, n: u32) {
        let _ = n;
    }
    /// `CSI n E`: down n rows, column 1.
    fn cursor_next_line(&mut self, n: u32) {
        let _ = n;
    }
    /// `CSI n F`: up n rows, column 1.
    fn cursor_prev_line(&mut self, n: u32) {
        let _ = n;
    }
    fn cursor_column(&mut self, col: u32) {
        let _ = col;
    }
    fn cursor_position(&mut self, row: u32, col: u32) {
        let _ = (row, col);
    }
    fn erase_screen(&mut self, mode: EraseMode) {
        let _ = mode;
    }
    fn erase_line(&mut self, mode: EraseMode) {
        let _ = mode;
    }
    fn scroll_up(&mut self, n: u32) {
        let _ = n;
    }
    fn scroll_down(&mut self, n: u32) {
        let _ = n;
    }
    fn save_cursor(&mut self) {}
    fn restore_cursor(&mut self) {}

    fn sgr_reset(&mut self) {}
    fn sgr_attribute(&mut self, attr: SgrAttribute) {
        let _ = attr;
    }
    /// `None` is the explicit default-color parameter (39).
    fn sgr_foreground(&mut self, color: Option<SgrColor>) {
        let _ = color;
    }
    /// `None` is the explicit default-color parameter (49).
    fn sgr_background(&mut self, color: Option<SgrColor>) {
        let _ = color;
    }

    /// OSC 0: by default fans out to the icon and title hooks.
    fn set_icon_and_title(&mut self, text: &str) {
        self.set_icon_name(text);
        self.set_window_title(text);
    }
    /// OSC 1.
    fn set_icon_name(&mut self, text: &str) {
        let _ = text;
    }
    /// OSC 2.
    fn set_window_title(&mut self, text: &str) {
        let _ = text;
    }
    /// Any other OSC command, with its raw parameter.
    fn unknown_osc(&mut self, command: u32, param: &str) {
        let _ = (command, param);
    }
    /// A CSI sequence with an unrecognized letter terminator.
    fn unknown_csi(&mut self, args: &[CsiArg], command: char) {
        let _ = (args, command);
    }
}

// ─── AnsiDecoder ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    CsiNext,
    CsiIntArg,
    CsiStrArg,
    CsiAfterStr,
    OscCommand,
    OscCommandEnd,
    OscParam,
    OscSt,
}

/// The decoding state machine. Owns its handler.
pub struct AnsiDecoder<H: AnsiHandler> {
    handler: H,
    state: State,
    /// Raw characters of the in-flight sequence, for literal replay.
    buf: Vec<char>,
    args: Vec<CsiArg>,
    /// Index into `buf` where the current argument's text began.
    value_start: usize,
}

impl<H: AnsiHandler> AnsiDecoder<H> {
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: State::Ground,
            buf: Vec::with_capacity(MAX_ESCAPE_LENGTH),
            args: Vec::new(),
            value_start: 0,
        }
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    #[must_use]
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Feed a chunk of characters.
    pub fn write_str(&mut self, text: &str) {
        for c in text.chars() {
            self.write(c);
        }
    }

    /// Feed one character.
    pub fn write(&mut self, data: char) {
        match self.state {
            State::Ground => {
                if data == '\x1b' {
                    self.buf.push(data);
                    self.state = State::Escape;
                } else {
                    self.handler.text(data);
                }
            }
            State::Escape => {
                self.buf.push(data);
                match data {
                    '[' => self.state = State::CsiNext,
                    ']' => self.state = State::OscCommand,
                    _ => self.reset(false),
                }
            }
            State::CsiNext => {
                self.buf.push(data);
                match data {
                    '"' => {
                        self.value_start = self.buf.len();
                        self.state = State::CsiStrArg;
                    }
                    '0'..='9' => {
                        self.value_start = self.buf.len() - 1;
                        self.state = State::CsiIntArg;
                    }
                    ';' => self.args.push(CsiArg::Empty),
                    '?' | '=' => self.args.push(CsiArg::Mark(data)),
                    _ => {
                        let handled = self.dispatch_csi(data);
                        self.reset(handled);
                    }
                }
            }
            State::CsiIntArg => {
                self.buf.push(data);
                if !data.is_ascii_digit() {
                    let value = self.collect_number(self.buf.len() - 1);
                    self.args.push(CsiArg::Num(value));
                    if data == ';' {
                        self.state = State::CsiNext;
                    } else {
                        let handled = self.dispatch_csi(data);
                        self.reset(handled);
                    }
                }
            }
            State::CsiStrArg => {
                self.buf.push(data);
                if data == '"' {
                    let value: String =
                        self.buf[self.value_start..self.buf.len() - 1].iter().collect();
                    self.args.push(CsiArg::Str(value));
                    self.state = State::CsiAfterStr;
                }
            }
            State::CsiAfterStr => {
                self.buf.push(data);
                if data == ';' {
                    self.state = State::CsiNext;
                } else {
                    let handled = self.dispatch_csi(data);
                    self.reset(handled);
                }
            }
            State::OscCommand => {
                self.buf.push(data);
                if data.is_ascii_digit() {
                    self.value_start = self.buf.len() - 1;
                    self.state = State::OscCommandEnd;
                } else {
                    self.reset(false);
                }
            }
            State::OscCommandEnd => {
                self.buf.push(data);
                if data == ';' {
                    let value = self.collect_number(self.buf.len() - 1);
                    self.args.push(CsiArg::Num(value));
                    self.value_start = self.buf.len();
                    self.state = State::OscParam;
                } else if !data.is_ascii_digit() {
                    self.reset(false);
                }
            }
            State::OscParam => {
                self.buf.push(data);
                if data == '\x07' {
                    let handled = self.finish_osc(1);
                    self.reset(handled);
                } else if data == '\x1b' {
                    self.state = State::OscSt;
                }
            }
            State::OscSt => {
                self.buf.push(data);
                if data == '\\' {
                    let handled = self.finish_osc(2);
                    self.reset(handled);
                } else {
                    self.state = State::OscParam;
                }
            }
        }

        // Too long to be anything we understand.
        if self.buf.len() >= MAX_ESCAPE_LENGTH {
            self.reset(false);
        }
    }

    /// Parse the digits in `buf[value_start..end]`, saturating rather
    /// than overflowing.
    fn collect_number(&self, end: usize) -> u32 {
        self.buf[self.value_start..end]
            .iter()
            .filter_map(|c| c.to_digit(10))
            .fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(d))
    }

    /// Leave sequence mode. When `skip_buffer` is false the buffered
    /// characters were not a recognized sequence; replay them as text.
    fn reset(&mut self, skip_buffer: bool) {
        if !skip_buffer {
            for i in 0..self.buf.len() {
                let c = self.buf[i];
                self.handler.text(c);
            }
        }
        self.buf.clear();
        self.args.clear();
        self.value_start = 0;
        self.state = State::Ground;
    }

    fn finish_osc(&mut self, terminator_len: usize) -> bool {
        let value: String = self.buf[self.value_start..self.buf.len() - terminator_len]
            .iter()
            .collect();
        let Some(&CsiArg::Num(command)) = self.args.first() else {
            return false;
        };
        match command {
            0 => self.handler.set_icon_and_title(&value),
            1 => self.handler.set_icon_name(&value),
            2 => self.handler.set_window_title(&value),
            _ => self.handler.unknown_osc(command, &value),
        }
        true
    }

    fn dispatch_csi(&mut self, command: char) -> bool {
        match command {
            'A' => self.simple(|h, n| h.cursor_up(n)),
            'B' => self.simple(|h, n| h.cursor_down(n)),
            'C' => self.simple(|h, n| h.cursor_right(n)),
            'D' => self.simple(|h, n| h.cursor_left(n)),
            'E' => self.simple(|h, n| h.cursor_next_line(n)),
            'F' => self.simple(|h, n| h.cursor_prev_line(n)),
            'G' => match int_arg(&self.args, 0) {
                Some(col) => {
                    self.handler.cursor_column(col);
                    true
                }
                None => false,
            },
            'H' | 'f' => {
                let (Some(row), Some(col)) = (
                    int_arg_or(&self.args, 0, 1),
                    int_arg_or(&self.args, 1, 1),
                ) else {
                    return false;
                };
                self.handler.cursor_position(row, col);
                true
            }
            'J' => match int_arg_or(&self.args, 0, 0) {
                Some(mode) => {
                    self.handler.erase_screen(EraseMode::from_param(mode));
                    true
                }
                None => false,
            },
            'K' => match int_arg_or(&self.args, 0, 0) {
                Some(mode) => {
                    self.handler.erase_line(EraseMode::from_param(mode));
                    true
                }
                None => false,
            },
            'S' => self.simple(|h, n| h.scroll_up(n)),
            'T' => self.simple(|h, n| h.scroll_down(n)),
            'm' => self.dispatch_sgr(),
            's' => {
                self.handler.save_cursor();
                true
            }
            'u' => {
                self.handler.restore_cursor();
                true
            }
            c if c.is_ascii_alphabetic() => {
                self.handler.unknown_csi(&self.args, c);
                true
            }
            _ => false,
        }
    }

    /// The `CSI n X` shape: one optional count defaulting to 1.
    fn simple(&mut self, op: impl FnOnce(&mut H, u32)) -> bool {
        match int_arg_or(&self.args, 0, 1) {
            Some(n) => {
                op(&mut self.handler, n);
                true
            }
            None => false,
        }
    }

    fn dispatch_sgr(&mut self) -> bool {
        // SGR takes numeric parameters only.
        if self
            .args
            .iter()
            .any(|a| matches!(a, CsiArg::Str(_) | CsiArg::Mark(_)))
        {
            return false;
        }
        let mut count = 0;
        let mut i = 0;
        while i < self.args.len() {
            let &CsiArg::Num(value) = &self.args[i] else {
                i += 1;
                continue;
            };
            count += 1;
            match value {
                0 => self.handler.sgr_reset(),
                30..=37 => self
                    .handler
                    .sgr_foreground(Some(SgrColor::Base((value - 30) as u8))),
                39 => self.handler.sgr_foreground(None),
                40..=47 => self
                    .handler
                    .sgr_background(Some(SgrColor::Base((value - 40) as u8))),
                49 => self.handler.sgr_background(None),
                90..=97 => self
                    .handler
                    .sgr_foreground(Some(SgrColor::Bright((value - 90) as u8))),
                100..=107 => self
                    .handler
                    .sgr_background(Some(SgrColor::Bright((value - 100) as u8))),
                38 | 48 => {
                    let (color, used) = extended_color(&self.args[i + 1..]);
                    if let Some(color) = color {
                        if value == 38 {
                            self.handler.sgr_foreground(Some(color));
                        } else {
                            self.handler.sgr_background(Some(color));
                        }
                    }
                    i += used;
                }
                _ => {
                    if let Some(attr) = SgrAttribute::from_param(value) {
                        self.handler.sgr_attribute(attr);
                    }
                }
            }
            i += 1;
        }
        // No parameters at all means reset.
        if count == 0 {
            self.handler.sgr_reset();
        }
        true
    }
}

fn int_arg(args: &[CsiArg], index: usize) -> Option<u32> {
    match args.get(index) {
        Some(CsiArg::Num(n)) => Some(*n),
        _ => None,
    }
}

/// Numeric argument with a default for omitted values; `None` means the
/// argument exists but is not numeric (the sequence is not ours).
fn int_arg_or(args: &[CsiArg], index: usize, default: u32) -> Option<u32> {
    match args.get(index) {
        None | Some(CsiArg::Empty) => Some(default),
        Some(CsiArg::Num(n)) => Some(*n),
        Some(_) => None,
    }
}

/// Decode the tail of a `38`/`48` parameter sequence. Returns the color
/// (if well-formed) and how many parameters were consumed.
fn extended_color(rest: &[CsiArg]) -> (Option<SgrColor>, usize) {
    match rest {
        [CsiArg::Num(5), CsiArg::Num(n), ..] if *n <= 255 => {
            (Some(SgrColor::Indexed(*n as u8)), 2)
        }
        [CsiArg::Num(2), CsiArg::Num(r), CsiArg::Num(g), CsiArg::Num(b), ..]
            if *r <= 255 && *g <= 255 && *b <= 255 =>
        {
            (Some(SgrColor::Rgb(*r as u8, *g as u8, *b as u8)), 4)
        }
        [] => (None, 0),
        _ => (None, 1),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
