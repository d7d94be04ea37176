// SPDX-License-Identifier: MIT
//
// redraw-style: the styled-text model underneath the redraw engine.
//
// Everything the terminal layer renders is built from these pieces: a
// packed immutable style (`AttributedStyle`), an immutable character
// buffer with one style code per character (`AttributedString`), and a
// mutable builder that assembles them, including from raw ANSI input.
//
// Substrings are zero-copy views over shared buffers. Column arithmetic
// is Unicode-width aware throughout: a CJK character is two columns, a
// combining mark is zero, and anything styled hidden is zero. ANSI
// serialization emits only the SGR parameters that change between
// adjacent characters, degrading colors to what the target terminal
// can render.

pub mod builder;
pub mod style;
pub mod text;

pub use builder::AttributedStringBuilder;
pub use style::{AttributedStyle, ColorDepth, StyleFlag};
pub use text::{char_width, AttributedString, ColumnSplit, StyledText};
