// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A bounded backtracking engine: an explicit job stack stands in for the
//! call stack a recursive matcher would use, so a single iterative loop
//! drives literal/class consumption, alternation, counted repetition,
//! atomic commit and back-references. Look-around is the one place real
//! Rust recursion is used: its body is just more of the same bytecode, run
//! to its paired `LookEnd` as an independent sub-match sharing the parent's
//! captures.
//!
//! This module does not bound worst-case work by the classic
//! `(instruction, position)` visited-bitmap trick, because capture slots,
//! repeat counters and the atomic mark stack make two visits to the same
//! `(pc, position)` pair observably different. Instead it enforces a step
//! budget (`Limits::step_limit`) and a job-stack byte budget
//! (`Limits::stack_limit_bytes`), surfaced as `ErrorKind::TimeOut` and
//! `ErrorKind::StackOverflow`.

use crate::error::{Error, ErrorKind, Result};
use crate::inst::{Inst, Pc};
use crate::input::Input;
use crate::unicode;

#[derive(Clone, Copy, Debug, Default)]
pub struct Limits {
    pub step_limit: Option<usize>,
    pub stack_limit_bytes: Option<usize>,
}

/// The result of a `search()` call: the captured group boundaries on
/// success, and whether any attempt examined text at or past `region_end`
/// — the source of truth for `Matcher::hit_end`.
#[derive(Debug)]
pub struct Outcome {
    pub caps: Option<Vec<Option<usize>>>,
    pub hit_end: bool,
}

const JOB_SIZE: usize = std::mem::size_of::<Job>();

#[derive(Clone, Copy, Debug)]
enum Job {
    Inst { pc: Pc, at: usize },
    SaveRestore { slot: usize, old: Option<usize> },
    CounterRestore { slot: usize, old_count: u32, old_pos: usize },
}

/// Runs the program over `text`, scanning forward from `from` within
/// `[region_start, region_end)` for the first position a match succeeds,
/// unless `anchored` restricts the attempt to `from` itself.
///
/// `global_start`/`global_end` are the boundaries `\A`/`\z`/`\Z` measure
/// against: pass the region edges for anchoring bounds, the whole text's
/// bounds to let anchors see past the region. `view_start`/`view_end` are
/// the boundaries look-around bodies may read within: pass the region
/// edges for opaque bounds (the default), the whole text's bounds for
/// transparent bounds.
///
/// `required_end`, if given, demands the overall match end at exactly that
/// offset (used by `matches()`, which requires the match to consume the
/// whole region); `None` accepts any successful end (`lookingAt`/`find`).
#[allow(clippy::too_many_arguments)]
pub fn search(
    insts: &[Inst],
    counter_count: usize,
    group_count: u32,
    text: &Input<'_>,
    region_start: usize,
    region_end: usize,
    global_start: usize,
    global_end: usize,
    view_start: usize,
    view_end: usize,
    from: usize,
    anchored: bool,
    required_end: Option<usize>,
    limits: Limits,
    mut progress: Option<&mut dyn FnMut(usize) -> bool>,
) -> Result<Outcome> {
    let mut at = from;
    let mut hit_end = false;
    loop {
        if let Some(cb) = progress.as_deref_mut() {
            if !cb(at) {
                return Err(Error::new(ErrorKind::StoppedByCaller));
            }
        }
        let mut engine = Engine {
            insts,
            text: *text,
            region_start,
            region_end,
            global_start,
            global_end,
            view_start,
            view_end,
            match_anchor: from,
            caps: vec![None; 2 * (group_count as usize + 1)],
            counters: vec![0; counter_count],
            counter_pos: vec![0; counter_count],
            jobs: Vec::new(),
            marks: Vec::new(),
            steps: 0,
            limits,
            failure: None,
            hit_end: false,
        };
        let found = engine.run(0, at, required_end).is_some();
        hit_end |= engine.hit_end;
        if found {
            return Ok(Outcome { caps: Some(engine.caps), hit_end });
        }
        if let Some(err) = engine.failure {
            return Err(err);
        }
        if anchored || at >= region_end {
            return Ok(Outcome { caps: None, hit_end });
        }
        at = text.next32(at).1;
    }
}

struct Engine<'t> {
    insts: &'t [Inst],
    text: Input<'t>,
    region_start: usize,
    region_end: usize,
    global_start: usize,
    global_end: usize,
    view_start: usize,
    view_end: usize,
    match_anchor: usize,
    caps: Vec<Option<usize>>,
    counters: Vec<u32>,
    counter_pos: Vec<usize>,
    jobs: Vec<Job>,
    marks: Vec<usize>,
    steps: usize,
    limits: Limits,
    failure: Option<Error>,
    /// Set whenever a step examines input at or past `region_end` (swapped
    /// to the view bounds while inside a look-around body). This is the
    /// engine-level signal `hit_end` is built from, rather than inferring
    /// it from whether the whole attempt happened to succeed or fail.
    hit_end: bool,
}

impl<'t> Engine<'t> {
    /// Runs the program from `pc` at input offset `at`, using a fresh local
    /// job stack (so backtracking never escapes the caller's frame) but the
    /// shared `caps`/`counters`. Reaching `Inst::Match` or `Inst::LookEnd`
    /// counts as success only once `required_end` (if given) is also
    /// satisfied; otherwise the search keeps backtracking as if that leaf
    /// had failed. Returns the input offset success was reached at.
    fn run(&mut self, pc: Pc, at: usize, required_end: Option<usize>) -> Option<usize> {
        let base = self.jobs.len();
        let marks_base = self.marks.len();
        self.jobs.push(Job::Inst { pc, at });
        let result = loop {
            if self.jobs.len() <= base {
                break None;
            }
            let job = self.jobs.pop().expect("len checked above base");
            match job {
                Job::SaveRestore { slot, old } => self.caps[slot] = old,
                Job::CounterRestore { slot, old_count, old_pos } => {
                    self.counters[slot] = old_count;
                    self.counter_pos[slot] = old_pos;
                }
                Job::Inst { pc, at } => match self.step(pc, at, required_end) {
                    Ok(Some(end)) => break Some(end),
                    Ok(None) => {}
                    Err(err) => {
                        self.failure = Some(err);
                        break None;
                    }
                },
            }
            if self.failure.is_some() {
                break None;
            }
        };
        self.jobs.truncate(base);
        self.marks.truncate(marks_base);
        result
    }

    /// Drives a single job forward, possibly mutating `pc`/`at` in place
    /// (avoiding a push/pop round trip) until it consumes input, fails, or
    /// reaches a terminal. Returns `Ok(Some(end))` on a satisfied terminal,
    /// `Ok(None)` when this leaf fails (the caller should pop the next
    /// job), or `Err` when a resource limit or callback stop fires.
    fn step(&mut self, mut pc: Pc, mut at: usize, required_end: Option<usize>) -> Result<Option<usize>> {
        loop {
            self.steps += 1;
            if let Some(limit) = self.limits.step_limit {
                if self.steps > limit {
                    return Err(Error::new(ErrorKind::TimeOut));
                }
            }
            match &self.insts[pc] {
                Inst::Match | Inst::LookEnd => {
                    return Ok(match required_end {
                        Some(want) if want != at => None,
                        _ => Some(at),
                    });
                }
                Inst::Fail => return Ok(None),

                Inst::Char { c, casei } => {
                    let cur = self.char_at(at);
                    let matched = match cur {
                        Some(ch) => ch == *c || (*casei && unicode::fold_eq(ch, *c)),
                        None => false,
                    };
                    if !matched {
                        return Ok(None);
                    }
                    at = self.text.next32(at).1;
                    pc += 1;
                }
                Inst::Any { dotall, unix_lines } => match self.char_at(at) {
                    Some(ch) if *dotall || !unicode::is_line_terminator(ch, *unix_lines) => {
                        at = self.text.next32(at).1;
                        pc += 1;
                    }
                    _ => return Ok(None),
                },
                Inst::Ranges(set) => match self.char_at(at) {
                    Some(ch) if set.matches(ch) => {
                        at = self.text.next32(at).1;
                        pc += 1;
                    }
                    _ => return Ok(None),
                },
                Inst::StaticClass { class, negate } => match self.char_at(at) {
                    Some(ch) if class.matches(ch) != *negate => {
                        at = self.text.next32(at).1;
                        pc += 1;
                    }
                    _ => return Ok(None),
                },

                Inst::StartText => {
                    if at != self.global_start {
                        return Ok(None);
                    }
                    pc += 1;
                }
                Inst::EndInputOnly => {
                    if at != self.global_end {
                        return Ok(None);
                    }
                    pc += 1;
                }
                Inst::EndInputOptionalTerminator => {
                    if !self.at_end_or_trailing_terminator(at, false) {
                        return Ok(None);
                    }
                    pc += 1;
                }
                Inst::StartLine { unix_lines } => {
                    let ok = at == self.global_start || {
                        let (prev, _) = self.text.prev32(at);
                        prev.as_char().map_or(false, |c| unicode::is_line_terminator(c, *unix_lines))
                    };
                    if !ok {
                        return Ok(None);
                    }
                    pc += 1;
                }
                Inst::EndLine { unix_lines } => {
                    let ok = at == self.global_end || {
                        let (next, _) = self.text.next32(at);
                        next.as_char().map_or(false, |c| unicode::is_line_terminator(c, *unix_lines))
                    };
                    if !ok {
                        return Ok(None);
                    }
                    pc += 1;
                }
                Inst::WordBoundary | Inst::NotWordBoundary => {
                    let before = self.text.prev32(at).0.is_word_char();
                    let after = self.text.peek32(at).is_word_char();
                    let boundary = before != after;
                    let want = matches!(self.insts[pc], Inst::WordBoundary);
                    if boundary != want {
                        return Ok(None);
                    }
                    pc += 1;
                }
                Inst::PrevMatchEnd => {
                    if at != self.match_anchor {
                        return Ok(None);
                    }
                    pc += 1;
                }

                Inst::Jmp(target) => pc = *target,
                Inst::Split { prefer, alt } => {
                    self.push_job(Job::Inst { pc: *alt, at })?;
                    pc = *prefer;
                }
                Inst::Save { slot } => {
                    let slot = *slot;
                    let old = self.caps[slot];
                    self.push_job(Job::SaveRestore { slot, old })?;
                    self.caps[slot] = Some(at);
                    pc += 1;
                }
                Inst::BackRef { index, casei } => {
                    let base = 2 * (*index as usize);
                    match (self.caps.get(base).copied().flatten(), self.caps.get(base + 1).copied().flatten())
                    {
                        (Some(s), Some(e)) => {
                            let needle = &self.text.text()[s..e];
                            match self.match_text(needle, at, *casei) {
                                Some(end) => {
                                    at = end;
                                    pc += 1;
                                }
                                None => return Ok(None),
                            }
                        }
                        _ => pc += 1,
                    }
                }

                Inst::RepeatInit { counter } => {
                    let counter = *counter;
                    self.push_job(Job::CounterRestore {
                        slot: counter,
                        old_count: self.counters[counter],
                        old_pos: self.counter_pos[counter],
                    })?;
                    self.counters[counter] = 0;
                    self.counter_pos[counter] = at;
                    pc += 1;
                }
                Inst::RepeatCheck { counter, min, max, greedy, body, exit } => {
                    let counter = *counter;
                    let n = self.counters[counter];
                    let stalled = n > 0 && at == self.counter_pos[counter];
                    if stalled || max.map_or(false, |m| n >= m) {
                        pc = *exit;
                    } else if n < *min {
                        pc = *body;
                    } else if *greedy {
                        self.push_job(Job::Inst { pc: *exit, at })?;
                        pc = *body;
                    } else {
                        self.push_job(Job::Inst { pc: *body, at })?;
                        pc = *exit;
                    }
                }
                Inst::RepeatInc { counter, check } => {
                    let counter = *counter;
                    self.push_job(Job::CounterRestore {
                        slot: counter,
                        old_count: self.counters[counter],
                        old_pos: self.counter_pos[counter],
                    })?;
                    self.counters[counter] += 1;
                    self.counter_pos[counter] = at;
                    pc = *check;
                }

                Inst::AtomicStart => {
                    self.marks.push(self.jobs.len());
                    pc += 1;
                }
                Inst::AtomicEnd => {
                    if let Some(depth) = self.marks.pop() {
                        self.jobs.truncate(depth);
                    }
                    pc += 1;
                }

                Inst::LookAheadStart { negate, end } => {
                    let negate = *negate;
                    let end = *end;
                    let snapshot = self.caps.clone();
                    let (saved_rs, saved_re) = (self.region_start, self.region_end);
                    self.region_start = self.view_start;
                    self.region_end = self.view_end;
                    let sub_ok = self.run(pc + 1, at, None).is_some();
                    self.region_start = saved_rs;
                    self.region_end = saved_re;
                    if let Some(err) = self.failure.take() {
                        return Err(err);
                    }
                    let success = sub_ok != negate;
                    if !(success && !negate) {
                        self.caps = snapshot;
                    }
                    if success {
                        pc = end;
                    } else {
                        return Ok(None);
                    }
                }
                Inst::LookBehindStart { negate, min_len, max_len, end } => {
                    let (negate, min_len, max_len, end) = (*negate, *min_len, *max_len, *end);
                    let snapshot = self.caps.clone();
                    let (saved_rs, saved_re) = (self.region_start, self.region_end);
                    self.region_start = self.view_start;
                    self.region_end = self.view_end;
                    let mut found = false;
                    let mut k = max_len;
                    loop {
                        if let Some(start) = self.back_offset(at, k) {
                            if self.run(pc + 1, start, Some(at)).is_some() {
                                found = true;
                            }
                            if let Some(err) = self.failure.take() {
                                self.region_start = saved_rs;
                                self.region_end = saved_re;
                                return Err(err);
                            }
                        }
                        if found || k == min_len {
                            break;
                        }
                        k -= 1;
                    }
                    self.region_start = saved_rs;
                    self.region_end = saved_re;
                    let success = found != negate;
                    if !(success && !negate) {
                        self.caps = snapshot;
                    }
                    if success {
                        pc = end;
                    } else {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn push_job(&mut self, job: Job) -> Result<()> {
        if let Some(limit) = self.limits.stack_limit_bytes {
            if (self.jobs.len() + 1) * JOB_SIZE > limit {
                return Err(Error::new(ErrorKind::StackOverflow));
            }
        }
        self.jobs.push(job);
        Ok(())
    }

    /// The code point at `at`, or `None` at/past the end of the matching
    /// region (even if more text exists beyond it in the underlying
    /// string). Reading at or past `region_end` is exactly what `hit_end`
    /// tracks: every opcode that actually consumes or compares input goes
    /// through here (or through `match_text`, below).
    fn char_at(&mut self, at: usize) -> Option<char> {
        if at >= self.region_end {
            self.hit_end = true;
            return None;
        }
        self.text.peek32(at).as_char()
    }

    fn at_end_or_trailing_terminator(&self, at: usize, unix_lines: bool) -> bool {
        if at == self.global_end {
            return true;
        }
        let rest = &self.text.text()[at..self.global_end.min(self.text.len())];
        let mut chars = rest.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(c), None, None) => unicode::is_line_terminator(c, unix_lines),
            (Some('\r'), Some('\n'), None) => true,
            _ => false,
        }
    }

    /// Steps back exactly `k` code points from `at`, bounded by
    /// `region_start`. Returns `None` if there aren't `k` code points
    /// available.
    fn back_offset(&self, at: usize, k: u32) -> Option<usize> {
        let mut pos = at;
        for _ in 0..k {
            if pos <= self.region_start {
                return None;
            }
            let (c, start) = self.text.prev32(pos);
            c.as_char()?;
            pos = start;
        }
        Some(pos)
    }

    /// Matches `needle` literally starting at `at`, code point by code
    /// point (optionally case-folded), returning the offset past it.
    fn match_text(&mut self, needle: &str, at: usize, casei: bool) -> Option<usize> {
        let mut pos = at;
        for want in needle.chars() {
            let got = self.char_at(pos)?;
            let eq = got == want || (casei && unicode::fold_eq(got, want));
            if !eq {
                return None;
            }
            pos = self.text.next32(pos).1;
        }
        Some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::flags::Flags;
    use crate::parser::parse;

    fn run_search(pattern: &str, text: &str, anchored: bool) -> Option<Vec<Option<usize>>> {
        let parsed = parse(pattern, Flags::NONE).unwrap();
        let prog = compile(parsed).unwrap();
        let input = Input::new(text);
        search(
            &prog.insts,
            prog.counter_count,
            prog.group_count,
            &input,
            0,
            text.len(),
            0,
            text.len(),
            0,
            text.len(),
            0,
            anchored,
            None,
            Limits::default(),
            None,
        )
        .unwrap()
        .caps
    }

    #[test]
    fn literal_match() {
        let caps = run_search("abc", "xxabcyy", false).unwrap();
        assert_eq!((caps[0], caps[1]), (Some(2), Some(5)));
    }

    #[test]
    fn greedy_star_backtracks_for_suffix() {
        let caps = run_search("a.*c", "abcabc", false).unwrap();
        assert_eq!((caps[0], caps[1]), (Some(0), Some(6)));
    }

    #[test]
    fn lazy_star_takes_shortest() {
        let caps = run_search("a.*?c", "abcabc", false).unwrap();
        assert_eq!((caps[0], caps[1]), (Some(0), Some(3)));
    }

    #[test]
    fn counted_repeat_bounds() {
        assert!(run_search("a{2,3}", "a", false).is_none());
        let caps = run_search("^a{2,3}$", "aaa", false).unwrap();
        assert_eq!((caps[0], caps[1]), (Some(0), Some(3)));
    }

    #[test]
    fn atomic_group_does_not_backtrack_internally() {
        assert!(run_search("^(?>a*)a$", "aaa", false).is_none());
    }

    #[test]
    fn possessive_quantifier_does_not_backtrack() {
        assert!(run_search("^a*+a$", "aaa", false).is_none());
    }

    #[test]
    fn positive_lookahead_is_zero_width() {
        let caps = run_search("foo(?=bar)", "foobar", false).unwrap();
        assert_eq!((caps[0], caps[1]), (Some(0), Some(3)));
    }

    #[test]
    fn negative_lookahead_rejects() {
        assert!(run_search("foo(?!bar)", "foobar", true).is_none());
        assert!(run_search("foo(?!bar)", "foobaz", true).is_some());
    }

    #[test]
    fn lookbehind_matches_fixed_and_bounded_variable_length() {
        assert!(run_search("(?<=foo)bar", "foobar", false).is_some());
        assert!(run_search("(?<=foo)bar", "xxxbar", false).is_none());
        assert!(run_search("(?<=fo{1,2})bar", "foobar", false).is_some());
    }

    #[test]
    fn backreference_matches_prior_capture() {
        assert!(run_search(r"(\w+) \1", "hey hey", false).is_some());
        assert!(run_search(r"(\w+) \1", "hey you", true).is_none());
    }

    #[test]
    fn capture_groups_recorded() {
        let caps = run_search("(a)(b)?", "a", false).unwrap();
        assert_eq!((caps[2], caps[3]), (Some(0), Some(1)));
        assert_eq!((caps[4], caps[5]), (None, None));
    }

    fn run_search_flags(pattern: &str, flags: Flags, text: &str, anchored: bool) -> Option<Vec<Option<usize>>> {
        let parsed = parse(pattern, flags).unwrap();
        let prog = compile(parsed).unwrap();
        let input = Input::new(text);
        search(
            &prog.insts,
            prog.counter_count,
            prog.group_count,
            &input,
            0,
            text.len(),
            0,
            text.len(),
            0,
            text.len(),
            0,
            anchored,
            None,
            Limits::default(),
            None,
        )
        .unwrap()
        .caps
    }

    #[test]
    fn case_insensitive_sharp_s_matches_its_multi_codepoint_fold() {
        // "ß" full-folds to "ss"; under CASE_INSENSITIVE it must match that
        // two-character expansion, not just other single-codepoint variants.
        assert!(run_search_flags("ß", Flags::CASE_INSENSITIVE, "SS", true).is_some());
        assert!(run_search_flags("ß", Flags::CASE_INSENSITIVE, "ss", true).is_some());
        assert!(run_search_flags("ß", Flags::CASE_INSENSITIVE, "\u{1E9E}", true).is_some());
        assert!(run_search_flags("ß", Flags::NONE, "ss", true).is_none());
    }

    #[test]
    fn case_insensitive_backreference_uses_full_fold() {
        // "ß" (U+00DF) and "ẞ" (U+1E9E) both full-fold to "ss", so a
        // back-reference under CASE_INSENSITIVE should treat them as the
        // same character even though `to_lowercase` alone wouldn't equate
        // them (simple folding only handles "ß" itself, not its capital).
        let text = "ß\u{1E9E}";
        let caps = run_search_flags(r"(ß)\1", Flags::CASE_INSENSITIVE, text, false).unwrap();
        assert_eq!((caps[0], caps[1]), (Some(0), Some(text.len())));
    }

    fn run_search_outcome(pattern: &str, text: &str, anchored: bool) -> Outcome {
        let parsed = parse(pattern, Flags::NONE).unwrap();
        let prog = compile(parsed).unwrap();
        let input = Input::new(text);
        search(
            &prog.insts,
            prog.counter_count,
            prog.group_count,
            &input,
            0,
            text.len(),
            0,
            text.len(),
            0,
            text.len(),
            0,
            anchored,
            None,
            Limits::default(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn anchored_failure_far_from_the_end_does_not_hit_end() {
        let outcome = run_search_outcome("xyz", "abcdefgh", true);
        assert!(outcome.caps.is_none());
        assert!(!outcome.hit_end);
    }

    #[test]
    fn greedy_repeat_probing_past_available_text_hits_end() {
        let outcome = run_search_outcome("a+", "aaa", true);
        assert!(outcome.caps.is_some());
        assert!(outcome.hit_end);
    }

    #[test]
    fn literal_match_ending_at_region_end_does_not_hit_end() {
        // No instruction ever needs to look past the matched text here, so
        // reaching the end of the region is incidental, not examined.
        let outcome = run_search_outcome("abc", "xabc", false);
        assert!(outcome.caps.is_some());
        assert!(!outcome.hit_end);
    }
}
