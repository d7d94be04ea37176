// SPDX-License-Identifier: MIT
//
// AttributedStyle: the packed style value every styled character carries.
//
// A style is a pair of u64s. The low bits are attribute flags (bold, italic,
// underline variants, blink variants, inverse, conceal, crossed-out, hidden)
// plus four "color set" flags; above them sit two 24-bit color payloads for
// foreground and background. The second u64 is a mask that records which
// bits are authoritative: merging a style onto an existing code overwrites
// only masked bits, so a style that says "bold on" leaves colors alone,
// and a style that says nothing at all is a no-op.
//
// Every attribute has three forms:
//
//   bold()          turn it on, and claim the bit in the mask
//   bold_off()      turn it off, and claim the bit in the mask
//   bold_default()  release the bit from the mask (inherit whatever is there)
//
// Styles are immutable Copy values; the fluent API returns new ones.

use bitflags::bitflags;

// ─── Flag Bits ───────────────────────────────────────────────────────────────

bitflags! {
    /// Attribute flag region of a packed style code.
    ///
    /// These occupy the low bits of the style/mask pair. The color payload
    /// bits live above [`FG_COLOR_EXP`] and are not part of this set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct StyleFlag: u64 {
        /// SGR 1, increased intensity.
        const BOLD             = 1 << 0;
        /// SGR 2, decreased intensity.
        const FAINT            = 1 << 1;
        /// SGR 3.
        const ITALIC           = 1 << 2;
        /// SGR 4, single underline.
        const UNDERLINE        = 1 << 3;
        /// SGR 21, double underline. Not widely supported.
        const UNDERLINE_DOUBLE = 1 << 4;
        /// SGR 5, slow blink.
        const BLINK_SLOW       = 1 << 5;
        /// SGR 6, rapid blink. Not widely supported.
        const BLINK_FAST       = 1 << 6;
        /// SGR 7, swap foreground and background.
        const INVERSE          = 1 << 7;
        /// SGR 8, concealed text.
        const CONCEAL          = 1 << 8;
        /// SGR 9, crossed-out text.
        const CROSSED_OUT      = 1 << 9;
        /// Not an SGR attribute: characters carrying this flag are emitted
        /// as-is but counted as zero columns wide. Used to embed raw escape
        /// sequences inside styled text; the caller must ensure they do not
        /// move the cursor.
        const HIDDEN           = 1 << 10;
        /// Foreground color payload holds a palette index.
        const FG_INDEXED       = 1 << 11;
        /// Foreground color payload holds a packed RGB value.
        const FG_RGB           = 1 << 12;
        /// Background color payload holds a palette index.
        const BG_INDEXED       = 1 << 13;
        /// Background color payload holds a packed RGB value.
        const BG_RGB           = 1 << 14;
    }
}

impl StyleFlag {
    /// Either foreground "set" flag.
    pub const FG_SET: Self = Self::FG_INDEXED.union(Self::FG_RGB);
    /// Either background "set" flag.
    pub const BG_SET: Self = Self::BG_INDEXED.union(Self::BG_RGB);
}

/// All flag bits; everything a mask can claim besides the color payloads.
pub(crate) const FLAG_MASK: u64 = StyleFlag::all().bits();

/// Bit offset of the 24-bit foreground color payload.
pub(crate) const FG_COLOR_EXP: u32 = 16;
/// Bit offset of the 24-bit background color payload.
pub(crate) const BG_COLOR_EXP: u32 = 40;
/// Foreground color payload bits.
pub(crate) const FG_COLOR: u64 = 0xFF_FFFF << FG_COLOR_EXP;
/// Background color payload bits.
pub(crate) const BG_COLOR: u64 = 0xFF_FFFF << BG_COLOR_EXP;

const FG_SET: u64 = StyleFlag::FG_SET.bits();
const BG_SET: u64 = StyleFlag::BG_SET.bits();

// ─── Color Depth ─────────────────────────────────────────────────────────────

/// How many colors the target terminal can actually render.
///
/// Serialization degrades colors to fit: palette indices above 7 fold onto
/// the 8 base colors below [`Colors256`](ColorDepth::Colors256), and RGB
/// values fold onto the 256-color cube below [`TrueColor`](ColorDepth::TrueColor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColorDepth {
    /// The 8 base ANSI colors (SGR 30-37 / 40-47).
    Colors8,
    /// The xterm 256-color palette (SGR 38;5;n / 48;5;n).
    Colors256,
    /// 24-bit direct color (SGR 38;2;r;g;b / 48;2;r;g;b).
    TrueColor,
}

impl ColorDepth {
    /// Derive the depth from a terminal's `max_colors` numeric capability.
    ///
    /// `None` (capability absent) is treated as plain 8-color.
    #[must_use]
    pub fn from_max_colors(max_colors: Option<i32>) -> Self {
        match max_colors {
            Some(n) if n >= 0x0100_0000 => Self::TrueColor,
            Some(n) if n >= 256 => Self::Colors256,
            _ => Self::Colors8,
        }
    }
}

// ─── AttributedStyle ─────────────────────────────────────────────────────────

/// An immutable, packed `(value, mask)` style.
///
/// The default style claims nothing: applying it to any style code leaves
/// the code untouched. Each fluent method returns a new style with one more
/// attribute claimed.
///
/// ```
/// use redraw_style::AttributedStyle;
///
/// let error = AttributedStyle::DEFAULT
///     .foreground(AttributedStyle::RED)
///     .bold();
/// assert_ne!(error, AttributedStyle::DEFAULT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributedStyle {
    style: u64,
    mask: u64,
}

impl AttributedStyle {
    pub const BLACK: u8 = 0;
    pub const RED: u8 = 1;
    pub const GREEN: u8 = 2;
    pub const YELLOW: u8 = 3;
    pub const BLUE: u8 = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8 = 6;
    pub const WHITE: u8 = 7;

    /// Add to a base color index for its bright variant.
    pub const BRIGHT: u8 = 8;

    /// The style that claims nothing.
    pub const DEFAULT: Self = Self { style: 0, mask: 0 };

    /// Build a style from raw value and mask bits.
    ///
    /// A value with a color "set" flag forces the corresponding payload
    /// field into the mask, so a claimed color always overwrites the whole
    /// payload rather than OR-ing into stale bits.
    #[must_use]
    pub const fn new(style: u64, mask: u64) -> Self {
        let mut mask = mask & FLAG_MASK;
        if style & FG_SET != 0 {
            mask |= FG_COLOR | FG_SET;
        }
        if style & BG_SET != 0 {
            mask |= BG_COLOR | BG_SET;
        }
        Self { style, mask }
    }

    /// Raw style value bits.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.style
    }

    /// Raw mask bits: which parts of the value are authoritative.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u64 {
        self.mask
    }

    /// Merge this style onto an existing style code.
    ///
    /// Only masked bits are overwritten; everything else survives.
    #[inline]
    #[must_use]
    pub const fn apply_to(self, code: u64) -> u64 {
        (code & !self.mask) | (self.style & self.mask)
    }

    // ─── Intensity ────────────────────────────────────────────────────────

    const fn on(self, flag: StyleFlag) -> Self {
        Self::new(self.style | flag.bits(), self.mask | flag.bits())
    }

    const fn off(self, flag: StyleFlag) -> Self {
        Self::new(self.style & !flag.bits(), self.mask | flag.bits())
    }

    const fn unset(self, flag: StyleFlag) -> Self {
        Self::new(self.style & !flag.bits(), self.mask & !flag.bits())
    }

    #[must_use]
    pub const fn bold(self) -> Self {
        self.on(StyleFlag::BOLD)
    }

    #[must_use]
    pub const fn bold_off(self) -> Self {
        self.off(StyleFlag::BOLD)
    }

    #[must_use]
    pub const fn bold_default(self) -> Self {
        self.unset(StyleFlag::BOLD)
    }

    #[must_use]
    pub const fn faint(self) -> Self {
        self.on(StyleFlag::FAINT)
    }

    #[must_use]
    pub const fn faint_off(self) -> Self {
        self.off(StyleFlag::FAINT)
    }

    #[must_use]
    pub const fn faint_default(self) -> Self {
        self.unset(StyleFlag::FAINT)
    }

    // ─── Italic ───────────────────────────────────────────────────────────

    #[must_use]
    pub const fn italic(self) -> Self {
        self.on(StyleFlag::ITALIC)
    }

    #[must_use]
    pub const fn italic_off(self) -> Self {
        self.off(StyleFlag::ITALIC)
    }

    #[must_use]
    pub const fn italic_default(self) -> Self {
        self.unset(StyleFlag::ITALIC)
    }

    // ─── Underline ────────────────────────────────────────────────────────

    /// Single underline. Clears a previously claimed double underline.
    #[must_use]
    pub const fn underline(self) -> Self {
        self.off(StyleFlag::UNDERLINE_DOUBLE).on(StyleFlag::UNDERLINE)
    }

    /// Double underline (SGR 21). Clears a previously claimed single.
    #[must_use]
    pub const fn underline_double(self) -> Self {
        self.off(StyleFlag::UNDERLINE).on(StyleFlag::UNDERLINE_DOUBLE)
    }

    #[must_use]
    pub const fn underline_off(self) -> Self {
        self.off(StyleFlag::UNDERLINE).off(StyleFlag::UNDERLINE_DOUBLE)
    }

    #[must_use]
    pub const fn underline_default(self) -> Self {
        self.unset(StyleFlag::UNDERLINE).unset(StyleFlag::UNDERLINE_DOUBLE)
    }

    // ─── Blink ────────────────────────────────────────────────────────────

    /// Slow blink, the widely supported variant.
    #[must_use]
    pub const fn blink(self) -> Self {
        self.off(StyleFlag::BLINK_FAST).on(StyleFlag::BLINK_SLOW)
    }

    /// Rapid blink (SGR 6).
    #[must_use]
    pub const fn blink_fast(self) -> Self {
        self.off(StyleFlag::BLINK_SLOW).on(StyleFlag::BLINK_FAST)
    }

    #[must_use]
    pub const fn blink_off(self) -> Self {
        self.off(StyleFlag::BLINK_SLOW).off(StyleFlag::BLINK_FAST)
    }

    #[must_use]
    pub const fn blink_default(self) -> Self {
        self.unset(StyleFlag::BLINK_SLOW).unset(StyleFlag::BLINK_FAST)
    }

    // ─── Inverse / Conceal / Crossed-out / Hidden ─────────────────────────

    #[must_use]
    pub const fn inverse(self) -> Self {
        self.on(StyleFlag::INVERSE)
    }

    /// Toggle the inverse bit relative to this style's current value.
    #[must_use]
    pub const fn inverse_neg(self) -> Self {
        if self.style & StyleFlag::INVERSE.bits() != 0 {
            self.off(StyleFlag::INVERSE)
        } else {
            self.on(StyleFlag::INVERSE)
        }
    }

    #[must_use]
    pub const fn inverse_off(self) -> Self {
        self.off(StyleFlag::INVERSE)
    }

    #[must_use]
    pub const fn inverse_default(self) -> Self {
        self.unset(StyleFlag::INVERSE)
    }

    #[must_use]
    pub const fn conceal(self) -> Self {
        self.on(StyleFlag::CONCEAL)
    }

    #[must_use]
    pub const fn conceal_off(self) -> Self {
        self.off(StyleFlag::CONCEAL)
    }

    #[must_use]
    pub const fn conceal_default(self) -> Self {
        self.unset(StyleFlag::CONCEAL)
    }

    #[must_use]
    pub const fn crossed_out(self) -> Self {
        self.on(StyleFlag::CROSSED_OUT)
    }

    #[must_use]
    pub const fn crossed_out_off(self) -> Self {
        self.off(StyleFlag::CROSSED_OUT)
    }

    #[must_use]
    pub const fn crossed_out_default(self) -> Self {
        self.unset(StyleFlag::CROSSED_OUT)
    }

    /// Mark characters as zero-width passthrough. See [`StyleFlag::HIDDEN`].
    #[must_use]
    pub const fn hidden(self) -> Self {
        self.on(StyleFlag::HIDDEN)
    }

    #[must_use]
    pub const fn hidden_off(self) -> Self {
        self.off(StyleFlag::HIDDEN)
    }

    #[must_use]
    pub const fn hidden_default(self) -> Self {
        self.unset(StyleFlag::HIDDEN)
    }

    // ─── Foreground ───────────────────────────────────────────────────────

    /// Indexed foreground color (0-255; 0-7 base, 8-15 bright).
    #[must_use]
    pub const fn foreground(self, color: u8) -> Self {
        Self::new(
            (self.style & !FG_COLOR & !FG_SET)
                | StyleFlag::FG_INDEXED.bits()
                | ((color as u64) << FG_COLOR_EXP),
            self.mask | StyleFlag::FG_INDEXED.bits(),
        )
    }

    /// 24-bit foreground color.
    #[must_use]
    pub const fn foreground_rgb(self, r: u8, g: u8, b: u8) -> Self {
        let rgb = ((r as u64) << 16) | ((g as u64) << 8) | (b as u64);
        Self::new(
            (self.style & !FG_COLOR & !FG_SET)
                | StyleFlag::FG_RGB.bits()
                | (rgb << FG_COLOR_EXP),
            self.mask | StyleFlag::FG_RGB.bits(),
        )
    }

    /// Claim the foreground as explicitly unset (terminal default, SGR 39).
    #[must_use]
    pub const fn foreground_off(self) -> Self {
        Self {
            style: self.style & !FG_COLOR & !FG_SET,
            mask: self.mask | FG_COLOR | FG_SET,
        }
    }

    /// Release any foreground claim.
    #[must_use]
    pub const fn foreground_default(self) -> Self {
        Self {
            style: self.style & !FG_COLOR & !FG_SET,
            mask: self.mask & !(FG_COLOR | FG_SET),
        }
    }

    // ─── Background ───────────────────────────────────────────────────────

    /// Indexed background color (0-255; 0-7 base, 8-15 bright).
    #[must_use]
    pub const fn background(self, color: u8) -> Self {
        Self::new(
            (self.style & !BG_COLOR & !BG_SET)
                | StyleFlag::BG_INDEXED.bits()
                | ((color as u64) << BG_COLOR_EXP),
            self.mask | StyleFlag::BG_INDEXED.bits(),
        )
    }

    /// 24-bit background color.
    #[must_use]
    pub const fn background_rgb(self, r: u8, g: u8, b: u8) -> Self {
        let rgb = ((r as u64) << 16) | ((g as u64) << 8) | (b as u64);
        Self::new(
            (self.style & !BG_COLOR & !BG_SET)
                | StyleFlag::BG_RGB.bits()
                | (rgb << BG_COLOR_EXP),
            self.mask | StyleFlag::BG_RGB.bits(),
        )
    }

    /// Claim the background as explicitly unset (terminal default, SGR 49).
    #[must_use]
    pub const fn background_off(self) -> Self {
        Self {
            style: self.style & !BG_COLOR & !BG_SET,
            mask: self.mask | BG_COLOR | BG_SET,
        }
    }

    /// Release any background claim.
    #[must_use]
    pub const fn background_default(self) -> Self {
        Self {
            style: self.style & !BG_COLOR & !BG_SET,
            mask: self.mask & !(BG_COLOR | BG_SET),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
