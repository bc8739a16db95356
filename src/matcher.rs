// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The stateful half of the public API: one `Matcher` is bound to exactly
//! one `Pattern` and one input string, and carries everything that changes
//! between match attempts (region, captures, resource limits, callbacks).

use crate::backtrack::{self, Limits, Outcome};
use crate::error::{Error, ErrorKind, Result};
use crate::input::Input;
use crate::literals::Prefilter;
use crate::pattern::Pattern;
use crate::subst;

/// A single match's captured group boundaries, as native byte offsets into
/// the matcher's input.
pub struct Matcher<'p, 't> {
    pattern: &'p Pattern,
    input: Input<'t>,
    region_start: usize,
    region_end: usize,
    anchoring_bounds: bool,
    transparent_bounds: bool,
    prefilter: Prefilter,
    last_match: Option<Vec<Option<usize>>>,
    hit_end: bool,
    require_end: bool,
    append_pos: usize,
    time_limit: Option<usize>,
    stack_limit: Option<usize>,
    match_callback: Option<Box<dyn FnMut(usize)>>,
    find_progress_callback: Option<Box<dyn FnMut(usize) -> bool>>,
}

impl<'p, 't> Matcher<'p, 't> {
    pub(crate) fn new(pattern: &'p Pattern, input: &'t str) -> Matcher<'p, 't> {
        let program = pattern.program();
        let prefilter = Prefilter::new(program.initial_string.as_deref(), program.initial_chars.as_ref());
        Matcher {
            pattern,
            input: Input::new(input),
            region_start: 0,
            region_end: input.len(),
            anchoring_bounds: true,
            transparent_bounds: false,
            prefilter,
            last_match: None,
            hit_end: false,
            require_end: false,
            append_pos: 0,
            time_limit: None,
            stack_limit: None,
            match_callback: None,
            find_progress_callback: None,
        }
    }

    fn text(&self) -> &'t str {
        self.input.text()
    }

    /// Restores the region to the whole input and discards any match
    /// recorded so far.
    pub fn reset(&mut self) -> &mut Self {
        self.region_start = 0;
        self.region_end = self.text().len();
        self.last_match = None;
        self.hit_end = false;
        self.require_end = false;
        self.append_pos = 0;
        self
    }

    /// Restricts subsequent match attempts to `[start, end)`. Out-of-range
    /// or misaligned offsets are rejected rather than silently clamped.
    pub fn region(&mut self, start: usize, end: usize) -> Result<&mut Self> {
        self.check_position(start)?;
        self.check_position(end)?;
        if start > end {
            return Err(Error::new(ErrorKind::IndexOutOfRange));
        }
        self.region_start = start;
        self.region_end = end;
        self.last_match = None;
        self.append_pos = start;
        Ok(self)
    }

    pub fn region_start(&self) -> usize {
        self.region_start
    }

    pub fn region_end(&self) -> usize {
        self.region_end
    }

    pub fn has_anchoring_bounds(&self) -> bool {
        self.anchoring_bounds
    }

    pub fn use_anchoring_bounds(&mut self, yes: bool) -> &mut Self {
        self.anchoring_bounds = yes;
        self
    }

    pub fn has_transparent_bounds(&self) -> bool {
        self.transparent_bounds
    }

    pub fn use_transparent_bounds(&mut self, yes: bool) -> &mut Self {
        self.transparent_bounds = yes;
        self
    }

    /// `true` if the most recent match attempt examined (consumed or
    /// compared against) input at or past `region_end` at some point —
    /// whether it ultimately succeeded or failed. A hint that more input
    /// appended to the string could change the outcome.
    pub fn hit_end(&self) -> bool {
        self.hit_end
    }

    /// `true` if the most recent successful match depended on reaching
    /// `region_end` — i.e. it only succeeded because there was no more
    /// input to examine, so appending more text could cause this exact
    /// match to be lost (though a different, longer match might still be
    /// found). `false` after a match that never needed to probe the
    /// boundary, even if its end happens to coincide with `region_end`.
    pub fn require_end(&self) -> bool {
        self.require_end
    }

    pub fn get_time_limit(&self) -> usize {
        self.time_limit.unwrap_or(0)
    }

    /// Caps the number of bytecode steps a single match attempt may take.
    /// `0` disables the limit. Negative values aren't representable in
    /// `usize`, so callers pass `i64` and get `IllegalArgument` for `< 0`.
    pub fn set_time_limit(&mut self, limit: i64) -> Result<&mut Self> {
        if limit < 0 {
            return Err(Error::new(ErrorKind::IllegalArgument("time limit must not be negative")));
        }
        self.time_limit = if limit == 0 { None } else { Some(limit as usize) };
        Ok(self)
    }

    pub fn get_stack_limit(&self) -> usize {
        self.stack_limit.unwrap_or(0)
    }

    pub fn set_stack_limit(&mut self, limit: i64) -> Result<&mut Self> {
        if limit < 0 {
            return Err(Error::new(ErrorKind::IllegalArgument("stack limit must not be negative")));
        }
        self.stack_limit = if limit == 0 { None } else { Some(limit as usize) };
        Ok(self)
    }

    /// Registers a callback invoked twice around each match attempt (`0`
    /// before, `1` after). Unlike ICU's per-instruction hook, this can't
    /// fire mid-attempt, since the backtracking engine only surfaces a
    /// pass/fail result and a step *count* limit, not a step-by-step trace;
    /// callers needing a hard ceiling on work should use
    /// [`Matcher::set_time_limit`] instead.
    pub fn set_match_callback(&mut self, callback: impl FnMut(usize) + 'static) -> &mut Self {
        self.match_callback = Some(Box::new(callback));
        self
    }

    pub fn clear_match_callback(&mut self) -> &mut Self {
        self.match_callback = None;
        self
    }

    /// Registers a callback invoked once per candidate start position
    /// `find` rejects (and once more for the position it finally accepts),
    /// exactly at the cadence the resource-limit tests in `backtrack.rs`
    /// exercise. Returning `false` aborts the search with
    /// `ErrorKind::StoppedByCaller`.
    pub fn set_find_progress_callback(&mut self, callback: impl FnMut(usize) -> bool + 'static) -> &mut Self {
        self.find_progress_callback = Some(Box::new(callback));
        self
    }

    pub fn clear_find_progress_callback(&mut self) -> &mut Self {
        self.find_progress_callback = None;
        self
    }

    /// Requires a match starting at `region_start` that consumes exactly
    /// through `region_end`.
    pub fn matches(&mut self) -> Result<bool> {
        self.attempt(self.region_start, true, Some(self.region_end))
    }

    /// Requires a match starting at exactly `region_start`, of any length.
    pub fn looking_at(&mut self) -> Result<bool> {
        self.attempt(self.region_start, true, None)
    }

    /// Scans forward from just past the previous match (or `region_start`
    /// if there is none yet) for the next match. A zero-length previous
    /// match advances by one code point first, so `find` can't stall on
    /// the same empty match forever; at the very end of the region that
    /// advance lands past it, which simply ends the iteration.
    pub fn find(&mut self) -> Result<bool> {
        let from = match &self.last_match {
            Some(caps) => {
                let (s, e) = (caps[0].unwrap(), caps[1].unwrap());
                if s == e {
                    if e >= self.text().len() {
                        e + 1
                    } else {
                        self.input.next32(e).1
                    }
                } else {
                    e
                }
            }
            None => self.region_start,
        };
        if from > self.region_end {
            self.last_match = None;
            return Ok(false);
        }
        self.find_at(from)
    }

    /// Scans forward from `from` (which must lie within the region) for
    /// the next match, ignoring any previous match.
    pub fn find_at(&mut self, from: usize) -> Result<bool> {
        self.check_position(from)?;
        if from < self.region_start || from > self.region_end {
            return Err(Error::new(ErrorKind::IndexOutOfRange));
        }
        let start = self.prefilter.next_candidate(self.text(), from).unwrap_or(from).max(from);
        self.attempt(start, false, None)
    }

    fn attempt(&mut self, from: usize, anchored: bool, required_end: Option<usize>) -> Result<bool> {
        let program = self.pattern.program();
        let global_start = if self.anchoring_bounds { self.region_start } else { 0 };
        let global_end = if self.anchoring_bounds { self.region_end } else { self.text().len() };
        let view_start = if self.transparent_bounds { 0 } else { self.region_start };
        let view_end = if self.transparent_bounds { self.text().len() } else { self.region_end };
        let limits = Limits { step_limit: self.time_limit, stack_limit_bytes: self.stack_limit };

        if let Some(cb) = self.match_callback.as_deref_mut() {
            cb(0);
        }

        let result = backtrack::search(
            &program.insts,
            program.counter_count,
            program.group_count,
            &self.input,
            self.region_start,
            self.region_end,
            global_start,
            global_end,
            view_start,
            view_end,
            from,
            anchored,
            required_end,
            limits,
            self.find_progress_callback.as_deref_mut(),
        );

        if let Some(cb) = self.match_callback.as_deref_mut() {
            cb(1);
        }

        match result {
            Ok(Outcome { caps: Some(caps), hit_end }) => {
                self.hit_end = hit_end;
                self.require_end = hit_end;
                self.last_match = Some(caps);
                Ok(true)
            }
            Ok(Outcome { caps: None, hit_end }) => {
                self.hit_end = hit_end;
                self.require_end = false;
                self.last_match = None;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn caps(&self) -> Result<&[Option<usize>]> {
        self.last_match.as_deref().ok_or_else(|| Error::new(ErrorKind::InvalidState))
    }

    pub fn group_count(&self) -> u32 {
        self.pattern.group_count()
    }

    pub fn start(&self, group: u32) -> Result<Option<usize>> {
        let caps = self.caps()?;
        Ok(caps.get(2 * group as usize).copied().flatten())
    }

    pub fn end(&self, group: u32) -> Result<Option<usize>> {
        let caps = self.caps()?;
        Ok(caps.get(2 * group as usize + 1).copied().flatten())
    }

    pub fn group(&self, group: u32) -> Result<Option<&'t str>> {
        match (self.start(group)?, self.end(group)?) {
            (Some(s), Some(e)) => Ok(Some(&self.text()[s..e])),
            _ => Ok(None),
        }
    }

    pub fn group_by_name(&self, name: &str) -> Result<Option<&'t str>> {
        let idx = self
            .pattern
            .group_number_from_name(name)
            .ok_or_else(|| Error::new(ErrorKind::InvalidCaptureGroupName(name.to_string())))?;
        self.group(idx)
    }

    /// Appends the text between `append_pos` and the current match's
    /// start, then the expanded replacement template, advancing
    /// `append_pos` to the match's end. Mirrors `Matcher.appendReplacement`.
    pub fn append_replacement(&mut self, dest: &mut String, replacement: &str) -> Result<()> {
        let caps = self.caps()?.to_vec();
        let (start, end) = (caps[0].unwrap(), caps[1].unwrap());
        dest.push_str(&self.text()[self.append_pos..start]);
        let template = subst::parse(replacement, self.pattern.group_count())?;
        let named = self.pattern.named_groups().clone();
        template.expand(
            dest,
            |n| {
                let base = 2 * n as usize;
                match (caps.get(base).copied().flatten(), caps.get(base + 1).copied().flatten()) {
                    (Some(s), Some(e)) => Some(self.text()[s..e].to_string()),
                    _ => None,
                }
            },
            &named,
        )?;
        self.append_pos = end;
        Ok(())
    }

    /// Appends whatever remains of the input after `append_pos`.
    pub fn append_tail(&self, dest: &mut String) {
        dest.push_str(&self.text()[self.append_pos..]);
    }

    /// Replaces only the first match with `replacement`, leaving the rest
    /// of the input untouched.
    pub fn replace_first(&mut self, replacement: &str) -> Result<String> {
        self.reset();
        let mut out = String::new();
        if self.find()? {
            self.append_replacement(&mut out, replacement)?;
        }
        self.append_tail(&mut out);
        Ok(out)
    }

    /// Replaces every non-overlapping match with `replacement`.
    pub fn replace_all(&mut self, replacement: &str) -> Result<String> {
        self.reset();
        let mut out = String::new();
        while self.find()? {
            self.append_replacement(&mut out, replacement)?;
        }
        self.append_tail(&mut out);
        Ok(out)
    }

    fn check_position(&self, pos: usize) -> Result<()> {
        if pos > self.text().len() || !self.input.is_char_boundary(pos) {
            return Err(Error::new(ErrorKind::IndexOutOfRange));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;

    fn pattern(src: &str) -> Pattern {
        Pattern::compile(src, Flags::NONE).unwrap()
    }

    #[test]
    fn matches_requires_full_region() {
        let p = pattern("a+");
        assert!(p.matcher("aaa").matches().unwrap());
        assert!(!p.matcher("aaab").matches().unwrap());
    }

    #[test]
    fn looking_at_allows_trailing_text() {
        let p = pattern("a+");
        assert!(p.matcher("aaab").looking_at().unwrap());
        assert!(!p.matcher("baaa").looking_at().unwrap());
    }

    #[test]
    fn find_advances_between_matches() {
        let p = pattern("[0-9]+");
        let mut m = p.matcher("a12 b34");
        assert!(m.find().unwrap());
        assert_eq!(m.group(0).unwrap(), Some("12"));
        assert!(m.find().unwrap());
        assert_eq!(m.group(0).unwrap(), Some("34"));
        assert!(!m.find().unwrap());
    }

    #[test]
    fn find_handles_zero_length_matches_without_looping() {
        let p = pattern("a*");
        let mut m = p.matcher("baa");
        let mut count = 0;
        while m.find().unwrap() {
            count += 1;
            if count > 10 {
                panic!("find looped without terminating");
            }
        }
        assert!(count >= 2);
    }

    #[test]
    fn group_queries_without_a_match_error() {
        let p = pattern("x");
        let m = p.matcher("y");
        assert!(m.start(0).is_err());
    }

    #[test]
    fn named_group_lookup() {
        let p = pattern(r"(?<word>\w+)");
        let mut m = p.matcher("hello");
        assert!(m.find().unwrap());
        assert_eq!(m.group_by_name("word").unwrap(), Some("hello"));
    }

    #[test]
    fn region_restricts_matching() {
        let p = pattern("[0-9]+");
        let mut m = p.matcher("12 34 56");
        m.region(3, 5).unwrap();
        assert!(m.find().unwrap());
        assert_eq!(m.group(0).unwrap(), Some("34"));
        assert!(!m.find().unwrap());
    }

    #[test]
    fn replace_all_substitutes_every_match() {
        let p = pattern("[0-9]+");
        let mut m = p.matcher("a1b22c333");
        assert_eq!(m.replace_all("#").unwrap(), "a#b#c#");
    }

    #[test]
    fn replace_first_only_touches_first_match() {
        let p = pattern("[0-9]+");
        let mut m = p.matcher("a1b22c333");
        assert_eq!(m.replace_first("#").unwrap(), "a#b22c333");
    }

    #[test]
    fn append_replacement_supports_group_references() {
        let p = pattern(r"(\w+)@(\w+)");
        let mut m = p.matcher("user@host");
        let mut out = String::new();
        assert!(m.find().unwrap());
        m.append_replacement(&mut out, "$2:$1").unwrap();
        m.append_tail(&mut out);
        assert_eq!(out, "host:user");
    }

    #[test]
    fn negative_time_limit_is_illegal_argument() {
        let p = pattern("a");
        let mut m = p.matcher("a");
        assert!(m.set_time_limit(-1).is_err());
    }

    #[test]
    fn out_of_range_region_is_rejected() {
        let p = pattern("a");
        let mut m = p.matcher("abc");
        assert!(m.region(0, 10).is_err());
    }

    #[test]
    fn require_end_set_when_match_touches_region_end() {
        let p = pattern("a+");
        let mut m = p.matcher("baaa");
        assert!(m.find().unwrap());
        assert!(m.require_end());
    }
}
