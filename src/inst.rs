// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The bytecode a compiled pattern runs: a flat `Vec<Inst>` executed by a
//! bounded backtracking engine, rather than the Pike-VM thread list this
//! module's instruction set once drove. Each `Inst` either consumes input,
//! tests a zero-width condition, or threads control flow; the backtracking
//! engine in `backtrack.rs` is the only thing that interprets them.

use crate::class::ClassSet;
use crate::unicode::StaticClass;

/// Index of an instruction within a `Vec<Inst>`.
pub type Pc = usize;

#[derive(Clone, Debug)]
pub enum Inst {
    // --- literals ---
    /// Matches one code point equal to `c` (or its case fold, if `casei`).
    Char { c: char, casei: bool },
    /// Matches any code point (DOTALL) or any non-line-terminator.
    Any { dotall: bool, unix_lines: bool },

    // --- sets ---
    /// Matches one code point against a concrete, normalized range set.
    Ranges(ClassSet),
    /// Matches one code point against a named predicate (`\d`, `\p{L}`,
    /// ...) without materializing it into ranges.
    StaticClass { class: StaticClass, negate: bool },

    // --- boundaries ---
    StartText,
    EndInputOnly,
    EndInputOptionalTerminator,
    StartLine { unix_lines: bool },
    EndLine { unix_lines: bool },
    WordBoundary,
    NotWordBoundary,
    /// `\G`: succeeds only at the position the current match attempt (or,
    /// for `find`, search) began.
    PrevMatchEnd,

    // --- control ---
    Jmp(Pc),
    /// Tries `prefer` first; pushes a backtrack choice-point resuming at
    /// `alt` (at the same input position) if everything reachable from
    /// `prefer` fails.
    Split { prefer: Pc, alt: Pc },
    /// Records the current input position into capture slot `slot`
    /// (`2*group` for a group's start, `2*group+1` for its end).
    Save { slot: usize },
    /// Back-reference to a capture group, consuming text equal to (or the
    /// case fold of) whatever it last captured. A group that did not
    /// participate in the match matches the empty string.
    BackRef { index: u32, casei: bool },

    // --- quantifier skeletons ---
    /// Zeroes the counter in slot `counter` and falls through to the
    /// paired `RepeatCheck`.
    RepeatInit { counter: usize },
    /// Reads the counter in slot `counter` (call it `n`) and either forces
    /// another iteration (`n < min`), forces exit (`max` reached), or
    /// offers both with `body` preferred over `exit` when `greedy` (and
    /// vice versa when reluctant).
    RepeatCheck {
        counter: usize,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        body: Pc,
        exit: Pc,
    },
    /// Increments the counter in slot `counter` and jumps to `check`.
    RepeatInc { counter: usize, check: Pc },

    // --- atomic commit (also used to desugar possessive quantifiers) ---
    /// Pushes the current backtrack-stack depth onto the mark stack.
    AtomicStart,
    /// Pops the mark stack and discards every backtrack choice-point
    /// created since the matching `AtomicStart`, forbidding backtracking
    /// back into the group that just matched.
    AtomicEnd,

    // --- look-around ---
    /// Runs the body from `self_pc + 1` up to the paired `LookEnd` as an
    /// independent, non-consuming sub-match anchored at the current
    /// position; `end` is where control resumes in the outer program
    /// (either way, no input is consumed).
    LookAheadStart { negate: bool, end: Pc },
    /// As `LookAheadStart`, but the body is matched ending at the current
    /// position, scanning start offsets within `[min_len, max_len]` code
    /// points back from it.
    LookBehindStart { negate: bool, min_len: u32, max_len: u32, end: Pc },
    /// Terminal marker for a look-around body: reaching it is success for
    /// the nested sub-match.
    LookEnd,

    // --- meta ---
    /// The whole pattern matched.
    Match,
    /// This path can never match.
    Fail,
}
