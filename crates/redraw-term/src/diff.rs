// SPDX-License-Identifier: MIT
//
// Line diff for the redraw engine.
//
// Deliberately not a general minimum-edit-distance diff. Terminal redraw
// compares two versions of the same line, where almost always a prefix
// and a suffix survive unchanged and the interesting part is one edited
// middle. So: find the longest common styled prefix and suffix, and emit
// at most four segments. Equality is per character AND per style code; a
// recolored character is a changed character.
//
// Segments are zero-copy views of the input lines. Styles travel with
// the view, so every segment is valid styled text on its own.

use redraw_style::{AttributedString, StyledText};

/// What to do with a diff segment's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    /// Present in both lines.
    Equal,
    /// Present only in the new line.
    Insert,
    /// Present only in the old line.
    Delete,
}

/// One segment of a line diff.
#[derive(Debug, Clone)]
pub struct Diff {
    pub op: DiffOp,
    pub text: AttributedString,
}

/// Diff `old` against `new`.
///
/// The result is ordered `[Equal prefix] [Insert middle] [Delete middle]
/// [Equal suffix]`, with absent segments omitted. Replaying the Insert
/// and Equal segments in order reconstructs `new`; replaying Delete and
/// Equal reconstructs `old`.
#[must_use]
pub fn diff(old: &AttributedString, new: &AttributedString) -> Vec<Diff> {
    let l1 = old.len();
    let l2 = new.len();
    let n = l1.min(l2);

    let same = |i: usize, j: usize| {
        old.char_at(i) == new.char_at(j) && old.style_code_at(i) == new.style_code_at(j)
    };

    let mut common_start = 0;
    while common_start < n && same(common_start, common_start) {
        common_start += 1;
    }
    let mut common_end = 0;
    while common_end < n - common_start && same(l1 - common_end - 1, l2 - common_end - 1) {
        common_end += 1;
    }

    let mut diffs = Vec::with_capacity(4);
    if common_start > 0 {
        diffs.push(Diff {
            op: DiffOp::Equal,
            text: old.sub_sequence(0, common_start),
        });
    }
    if l2 > common_start + common_end {
        diffs.push(Diff {
            op: DiffOp::Insert,
            text: new.sub_sequence(common_start, l2 - common_end),
        });
    }
    if l1 > common_start + common_end {
        diffs.push(Diff {
            op: DiffOp::Delete,
            text: old.sub_sequence(common_start, l1 - common_end),
        });
    }
    if common_end > 0 {
        diffs.push(Diff {
            op: DiffOp::Equal,
            text: old.sub_sequence(l1 - common_end, l1),
        });
    }
    diffs
}

// ─── Tests ───────────────────────────────────────────────────────────────────
