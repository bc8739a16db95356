// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The compiled, immutable, shareable half of the crate's public API.
//! `Pattern::compile` is the single entry point into the lexer, parser and
//! bytecode compiler; everything downstream (`Matcher`, `split`) borrows
//! the result.

use std::collections::HashMap;
use std::fmt;

use crate::compile::{self, Program};
use crate::error::{Error, ErrorKind, Result};
use crate::flags::Flags;
use crate::matcher::Matcher;
use crate::parser;

/// A compiled pattern: parsing and bytecode generation happen once, here;
/// everything a [`Matcher`] does afterward just walks this structure.
/// `Pattern` owns no interior mutability, so `&Pattern`/`Arc<Pattern>` can
/// be shared across threads, each creating its own `Matcher`.
pub struct Pattern {
    source: String,
    flags: Flags,
    program: Program,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Pattern {
    /// Compiles `source` under `flags`. Two equal `(source, flags)` pairs
    /// always produce a `Pattern` whose program is byte-identical, since
    /// parsing and compilation are pure functions of their inputs.
    pub fn compile(source: &str, flags: Flags) -> Result<Pattern> {
        log::debug!("compiling pattern {:?} with flags {:?}", source, flags);
        let parsed = parser::parse(source, flags)?;
        let program = compile::compile(parsed)?;
        Ok(Pattern { source: source.to_string(), flags, program })
    }

    /// The original source text this pattern was compiled from.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn group_count(&self) -> u32 {
        self.program.group_count
    }

    pub fn group_number_from_name(&self, name: &str) -> Option<u32> {
        self.program.named_groups.get(name).copied()
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }

    pub(crate) fn named_groups(&self) -> &HashMap<String, u32> {
        &self.program.named_groups
    }

    /// Creates a `Matcher` bound to `input`, with a fresh region spanning
    /// the whole string.
    pub fn matcher<'p, 't>(&'p self, input: &'t str) -> Matcher<'p, 't> {
        Matcher::new(self, input)
    }

    /// `true` iff `source` compiled under `flags` matches `input` in its
    /// entirety (`Matcher::matches`), without needing to keep the compiled
    /// pattern around.
    pub fn matches(source: &str, flags: Flags, input: &str) -> Result<bool> {
        Ok(Pattern::compile(source, flags)?.matcher(input).matches()?)
    }

    /// Splits `input` around matches of this pattern, same convention as
    /// `str::split` but capture-group-aware: each capturing group's text is
    /// inserted between the two surrounding pieces (the empty string if
    /// that group didn't participate). Stops early and places the
    /// remainder of `input` verbatim into the last slot once `limit`
    /// pieces (0 meaning unlimited) have been produced.
    pub fn split(&self, input: &str, limit: usize) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut matcher = self.matcher(input);
        let mut last_end = 0usize;
        loop {
            if limit > 0 && out.len() + 1 >= limit {
                break;
            }
            if !matcher.find()? {
                break;
            }
            let (start, end) = (matcher.start(0)?, matcher.end(0)?);
            out.push(input[last_end..start].to_string());
            for g in 1..=self.group_count() {
                out.push(matcher.group(g)?.unwrap_or_default().to_string());
            }
            last_end = end;
            if start == end {
                if end >= input.len() {
                    break;
                }
            }
        }
        out.push(input[last_end..].to_string());
        Ok(out)
    }
}

/// Fluent builder for pattern flags, mirroring `Pattern::compile`'s flag
/// argument but readable at a call site with several flags set at once.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternBuilder {
    flags: Flags,
}

impl PatternBuilder {
    pub fn new() -> PatternBuilder {
        PatternBuilder { flags: Flags::NONE }
    }

    pub fn case_insensitive(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::CASE_INSENSITIVE, yes)
    }

    pub fn comments(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::COMMENTS, yes)
    }

    pub fn dot_all(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::DOTALL, yes)
    }

    pub fn multiline(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::MULTILINE, yes)
    }

    pub fn unix_lines(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::UNIX_LINES, yes)
    }

    pub fn literal(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::LITERAL, yes)
    }

    pub fn error_on_unknown_escapes(mut self, yes: bool) -> PatternBuilder {
        self.set(Flags::ERROR_ON_UNKNOWN_ESCAPES, yes)
    }

    fn set(mut self, flag: Flags, yes: bool) -> PatternBuilder {
        if yes {
            self.flags.insert(flag);
        } else {
            self.flags.remove(flag);
        }
        self
    }

    pub fn build(self, source: &str) -> Result<Pattern> {
        if self.flags.contains(Flags::LITERAL) {
            return Err(Error::new(ErrorKind::Unimplemented("LITERAL flag")));
        }
        Pattern::compile(source, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_is_deterministic() {
        let a = Pattern::compile("a(b+)c", Flags::NONE).unwrap();
        let b = Pattern::compile("a(b+)c", Flags::NONE).unwrap();
        assert_eq!(format!("{:?}", a.program().insts), format!("{:?}", b.program().insts));
    }

    #[test]
    fn group_number_from_name_resolves() {
        let p = Pattern::compile("(?<year>\\d{4})-(?<month>\\d{2})", Flags::NONE).unwrap();
        assert_eq!(p.group_number_from_name("year"), Some(1));
        assert_eq!(p.group_number_from_name("month"), Some(2));
        assert_eq!(p.group_number_from_name("nope"), None);
    }

    #[test]
    fn static_matches_convenience() {
        assert!(Pattern::matches("^[0-9]+$", Flags::NONE, "12345").unwrap());
        assert!(!Pattern::matches("^[0-9]+$", Flags::NONE, "12a45").unwrap());
    }

    #[test]
    fn split_on_comma_keeps_groups() {
        let p = Pattern::compile(",", Flags::NONE).unwrap();
        let parts = p.split("a,b,c", 0).unwrap();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }

    #[test]
    fn split_emits_capture_group_text() {
        let p = Pattern::compile("(-)", Flags::NONE).unwrap();
        let parts = p.split("a-b", 0).unwrap();
        assert_eq!(parts, vec!["a", "-", "b"]);
    }

    #[test]
    fn split_respects_limit() {
        let p = Pattern::compile(",", Flags::NONE).unwrap();
        let parts = p.split("a,b,c,d", 2).unwrap();
        assert_eq!(parts, vec!["a", "b,c,d"]);
    }

    #[test]
    fn builder_combines_flags() {
        let p = PatternBuilder::new().case_insensitive(true).multiline(true).build("^a$").unwrap();
        assert!(p.flags().contains(Flags::CASE_INSENSITIVE));
        assert!(p.flags().contains(Flags::MULTILINE));
    }
}
