// SPDX-License-Identifier: MIT
//
// SGR state tracking.
//
// `SgrState` is the value every downstream consumer reasons about: the
// terminal's current intensity, underline, blink, negative-image, and
// color settings. It knows how to apply decoded transitions, how to
// serialize itself as a prologue (the sequences that recreate it from
// defaults), and how to serialize the offs that return to defaults.
//
// `StatefulHandler` wraps another `AnsiHandler` and filters SGR traffic
// through an `SgrState`: a transition that would not change the tracked
// state is swallowed. This is what lets consumers like the splitter and
// the diff treat "current style" as a value instead of re-parsing the
// byte stream.

use crate::decoder::{AnsiHandler, CsiArg, EraseMode, SgrAttribute, SgrColor};
use std::fmt::Write as _;

// ─── Tracked fields ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intensity {
    #[default]
    Normal,
    Bold,
    Faint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underline {
    #[default]
    Off,
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blink {
    #[default]
    Off,
    Slow,
    Fast,
}

// ─── SgrState ────────────────────────────────────────────────────────────────

/// The terminal's current graphic rendition, as far as SGR sequences
/// have told us. `None` colors are the terminal defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SgrState {
    pub intensity: Intensity,
    pub underline: Underline,
    pub blink: Blink,
    pub negative: bool,
    pub fg: Option<SgrColor>,
    pub bg: Option<SgrColor>,
}

impl SgrState {
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Back to defaults (what SGR 0 does).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether `attr` belongs to the tracked set. Italic, conceal, and
    /// crossed-out pass through untracked.
    #[must_use]
    pub const fn tracks(attr: SgrAttribute) -> bool {
        !matches!(
            attr,
            SgrAttribute::ItalicOn
                | SgrAttribute::ItalicOff
                | SgrAttribute::ConcealOn
                | SgrAttribute::ConcealOff
                | SgrAttribute::CrossedOutOn
                | SgrAttribute::CrossedOutOff
        )
    }

    /// Apply an attribute transition. Returns whether the tracked state
    /// changed; transitions outside the tracked set return `true` so
    /// callers pass them through untouched.
    pub const fn apply_attribute(&mut self, attr: SgrAttribute) -> bool {
        match attr {
            SgrAttribute::IntensityBold => self.set_intensity(Intensity::Bold),
            SgrAttribute::IntensityFaint => self.set_intensity(Intensity::Faint),
            SgrAttribute::IntensityNormal => self.set_intensity(Intensity::Normal),
            SgrAttribute::UnderlineSingle => self.set_underline(Underline::Single),
            SgrAttribute::UnderlineDouble => self.set_underline(Underline::Double),
            SgrAttribute::UnderlineOff => self.set_underline(Underline::Off),
            SgrAttribute::BlinkSlow => self.set_blink(Blink::Slow),
            SgrAttribute::BlinkFast => self.set_blink(Blink::Fast),
            SgrAttribute::BlinkOff => self.set_blink(Blink::Off),
            SgrAttribute::NegativeOn => self.set_negative(true),
            SgrAttribute::NegativeOff => self.set_negative(false),
            // Conceal and crossed-out are not tracked here.
            _ => true,
        }
    }

    const fn set_intensity(&mut self, v: Intensity) -> bool {
        let changed = !matches!(
            (self.intensity, v),
            (Intensity::Normal, Intensity::Normal)
                | (Intensity::Bold, Intensity::Bold)
                | (Intensity::Faint, Intensity::Faint)
        );
        self.intensity = v;
        changed
    }

    const fn set_underline(&mut self, v: Underline) -> bool {
        let changed = !matches!(
            (self.underline, v),
            (Underline::Off, Underline::Off)
                | (Underline::Single, Underline::Single)
                | (Underline::Double, Underline::Double)
        );
        self.underline = v;
        changed
    }

    const fn set_blink(&mut self, v: Blink) -> bool {
        let changed = !matches!(
            (self.blink, v),
            (Blink::Off, Blink::Off) | (Blink::Slow, Blink::Slow) | (Blink::Fast, Blink::Fast)
        );
        self.blink = v;
        changed
    }

    const fn set_negative(&mut self, v: bool) -> bool {
        let changed = self.negative != v;
        self.negative = v;
        changed
    }

    /// Apply a foreground change; returns whether it changed anything.
    pub fn apply_foreground(&mut self, color: Option<SgrColor>) -> bool {
        let changed = self.fg != color;
        self.fg = color;
        changed
    }

    /// Apply a background change; returns whether it changed anything.
    pub fn apply_background(&mut self, color: Option<SgrColor>) -> bool {
        let changed = self.bg != color;
        self.bg = color;
        changed
    }

    // ─── Serialization ────────────────────────────────────────────────────

    /// The escape for one attribute transition.
    #[must_use]
    pub const fn attribute_sequence(attr: SgrAttribute) -> &'static str {
        match attr {
            SgrAttribute::IntensityBold => "\x1b[1m",
            SgrAttribute::IntensityFaint => "\x1b[2m",
            SgrAttribute::IntensityNormal => "\x1b[22m",
            SgrAttribute::ItalicOn => "\x1b[3m",
            SgrAttribute::ItalicOff => "\x1b[23m",
            SgrAttribute::UnderlineSingle => "\x1b[4m",
            SgrAttribute::UnderlineDouble => "\x1b[21m",
            SgrAttribute::UnderlineOff => "\x1b[24m",
            SgrAttribute::BlinkSlow => "\x1b[5m",
            SgrAttribute::BlinkFast => "\x1b[6m",
            SgrAttribute::BlinkOff => "\x1b[25m",
            SgrAttribute::NegativeOn => "\x1b[7m",
            SgrAttribute::NegativeOff => "\x1b[27m",
            SgrAttribute::ConcealOn => "\x1b[8m",
            SgrAttribute::ConcealOff => "\x1b[28m",
            SgrAttribute::CrossedOutOn => "\x1b[9m",
            SgrAttribute::CrossedOutOff => "\x1b[29m",
        }
    }

    /// The escape for a foreground change (`None` = default, SGR 39).
    #[must_use]
    pub fn foreground_sequence(color: Option<SgrColor>) -> String {
        color_sequence(color, 30, 90, 38, "39")
    }

    /// The escape for a background change (`None` = default, SGR 49).
    #[must_use]
    pub fn background_sequence(color: Option<SgrColor>) -> String {
        color_sequence(color, 40, 100, 48, "49")
    }

    /// Write the sequences that recreate this state from defaults.
    pub fn write_prologue(&self, out: &mut String) {
        match self.intensity {
            Intensity::Normal => {}
            Intensity::Bold => out.push_str(Self::attribute_sequence(SgrAttribute::IntensityBold)),
            Intensity::Faint => {
                out.push_str(Self::attribute_sequence(SgrAttribute::IntensityFaint));
            }
        }
        match self.underline {
            Underline::Off => {}
            Underline::Single => {
                out.push_str(Self::attribute_sequence(SgrAttribute::UnderlineSingle));
            }
            Underline::Double => {
                out.push_str(Self::attribute_sequence(SgrAttribute::UnderlineDouble));
            }
        }
        match self.blink {
            Blink::Off => {}
            Blink::Slow => out.push_str(Self::attribute_sequence(SgrAttribute::BlinkSlow)),
            Blink::Fast => out.push_str(Self::attribute_sequence(SgrAttribute::BlinkFast)),
        }
        if self.negative {
            out.push_str(Self::attribute_sequence(SgrAttribute::NegativeOn));
        }
        if self.fg.is_some() {
            out.push_str(&Self::foreground_sequence(self.fg));
        }
        if self.bg.is_some() {
            out.push_str(&Self::background_sequence(self.bg));
        }
    }

    /// Write the offs that return from this state to defaults.
    pub fn write_offs(&self, out: &mut String) {
        if !matches!(self.intensity, Intensity::Normal) {
            out.push_str(Self::attribute_sequence(SgrAttribute::IntensityNormal));
        }
        if !matches!(self.underline, Underline::Off) {
            out.push_str(Self::attribute_sequence(SgrAttribute::UnderlineOff));
        }
        if !matches!(self.blink, Blink::Off) {
            out.push_str(Self::attribute_sequence(SgrAttribute::BlinkOff));
        }
        if self.negative {
            out.push_str(Self::attribute_sequence(SgrAttribute::NegativeOff));
        }
        if self.fg.is_some() {
            out.push_str(&Self::foreground_sequence(None));
        }
        if self.bg.is_some() {
            out.push_str(&Self::background_sequence(None));
        }
    }
}

fn color_sequence(
    color: Option<SgrColor>,
    base: u32,
    bright: u32,
    extended: u32,
    default: &str,
) -> String {
    let mut s = String::from("\x1b[");
    match color {
        None => s.push_str(default),
        Some(SgrColor::Base(n)) => {
            let _ = write!(s, "{}", base + u32::from(n));
        }
        Some(SgrColor::Bright(n)) => {
            let _ = write!(s, "{}", bright + u32::from(n));
        }
        Some(SgrColor::Indexed(n)) => {
            let _ = write!(s, "{extended};5;{n}");
        }
        Some(SgrColor::Rgb(r, g, b)) => {
            let _ = write!(s, "{extended};2;{r};{g};{b}");
        }
    }
    s.push('m');
    s
}

// ─── StatefulHandler ─────────────────────────────────────────────────────────

/// Wraps a handler, forwarding SGR transitions only when they change the
/// tracked state. Everything else passes straight through.
pub struct StatefulHandler<H: AnsiHandler> {
    inner: H,
    state: SgrState,
}

impl<H: AnsiHandler> StatefulHandler<H> {
    #[must_use]
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            state: SgrState::default(),
        }
    }

    /// The tracked state after everything decoded so far.
    #[must_use]
    pub const fn state(&self) -> &SgrState {
        &self.state
    }

    #[must_use]
    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> H {
        self.inner
    }

    /// Forget the tracked state without emitting anything.
    pub fn clear_tracking(&mut self) {
        self.state.clear();
    }
}

impl<H: AnsiHandler> AnsiHandler for StatefulHandler<H> {
    fn text(&mut self, ch: char) {
        self.inner.text(ch);
    }

    fn cursor_up(&mut self, n: u32) {
        self.inner.cursor_up(n);
    }
    fn cursor_down(&mut self, n: u32) {
        self.inner.cursor_down(n);
    }
    fn cursor_right(&mut self, n: u32) {
        self.inner.cursor_right(n);
    }
    fn cursor_left(&mut self, n: u32) {
        self.inner.cursor_left(n);
    }
    fn cursor_next_line(&mut self, n: u32) {
        self.inner.cursor_next_line(n);
    }
    fn cursor_prev_line(&mut self, n: u32) {
        self.inner.cursor_prev_line(n);
    }
    fn cursor_column(&mut self, col: u32) {
        self.inner.cursor_column(col);
    }
    fn cursor_position(&mut self, row: u32, col: u32) {
        self.inner.cursor_position(row, col);
    }
    fn erase_screen(&mut self, mode: EraseMode) {
        self.inner.erase_screen(mode);
    }
    fn erase_line(&mut self, mode: EraseMode) {
        self.inner.erase_line(mode);
    }
    fn scroll_up(&mut self, n: u32) {
        self.inner.scroll_up(n);
    }
    fn scroll_down(&mut self, n: u32) {
        self.inner.scroll_down(n);
    }
    fn save_cursor(&mut self) {
        self.inner.save_cursor();
    }
    fn restore_cursor(&mut self) {
        self.inner.restore_cursor();
    }

    fn sgr_reset(&mut self) {
        if !self.state.is_default() {
            self.state.clear();
            self.inner.sgr_reset();
        }
    }

    fn sgr_attribute(&mut self, attr: SgrAttribute) {
        if self.state.apply_attribute(attr) {
            self.inner.sgr_attribute(attr);
        }
    }

    fn sgr_foreground(&mut self, color: Option<SgrColor>) {
        if self.state.apply_foreground(color) {
            self.inner.sgr_foreground(color);
        }
    }

    fn sgr_background(&mut self, color: Option<SgrColor>) {
        if self.state.apply_background(color) {
            self.inner.sgr_background(color);
        }
    }

    fn set_icon_and_title(&mut self, text: &str) {
        self.inner.set_icon_and_title(text);
    }
    fn set_icon_name(&mut self, text: &str) {
        self.inner.set_icon_name(text);
    }
    fn set_window_title(&mut self, text: &str) {
        self.inner.set_window_title(text);
    }
    fn unknown_osc(&mut self, command: u32, param: &str) {
        self.inner.unknown_osc(command, param);
    }
    fn unknown_csi(&mut self, args: &[CsiArg], command: char) {
        self.inner.unknown_csi(args, command);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
