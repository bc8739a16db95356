// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A fast pre-scan for `find`: given the `initial_string`/`initial_chars`
//! facts `compile.rs` derives from a pattern, skip straight to the next
//! position the backtracking engine could possibly succeed at, instead of
//! invoking it at every offset in the haystack.

use memchr::{memchr, memchr2, memchr3};

use crate::class::ClassSet;

/// What to scan the haystack for before handing a candidate position to the
/// backtracking engine.
#[derive(Clone, Debug)]
pub enum Prefilter {
    /// No useful prefilter; try every position.
    None,
    /// The pattern can only match starting with this exact literal text.
    Literal(String),
    /// The pattern can only match starting with a code point in this set.
    Chars(ClassSet),
}

impl Prefilter {
    pub fn new(initial_string: Option<&str>, initial_chars: Option<&ClassSet>) -> Prefilter {
        if let Some(s) = initial_string {
            if !s.is_empty() {
                return Prefilter::Literal(s.to_string());
            }
        }
        if let Some(set) = initial_chars {
            if !set.is_empty() {
                return Prefilter::Chars(set.clone());
            }
        }
        Prefilter::None
    }

    /// The next native offset at or after `from` the match could possibly
    /// start at, or `None` if the pattern can never match in the rest of
    /// the haystack.
    pub fn next_candidate(&self, haystack: &str, from: usize) -> Option<usize> {
        match self {
            Prefilter::None => Some(from),
            Prefilter::Literal(lit) => find_literal(haystack, from, lit),
            Prefilter::Chars(set) => find_char_in_set(haystack, from, set),
        }
    }
}

fn find_literal(haystack: &str, from: usize, lit: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let first = *lit.as_bytes().first()?;
    let mut pos = from;
    loop {
        if pos > bytes.len() {
            return None;
        }
        let found = memchr(first, &bytes[pos..])?;
        let candidate = pos + found;
        if haystack[candidate..].starts_with(lit) {
            return Some(candidate);
        }
        pos = candidate + 1;
    }
}

fn find_char_in_set(haystack: &str, from: usize, set: &ClassSet) -> Option<usize> {
    // Ranges entirely within ASCII can often be expressed as one to three
    // bytes for `memchr`; outside that, scan code point by code point.
    if let Some(bytes) = ascii_singletons(set) {
        return find_any_byte(&haystack.as_bytes()[from.min(haystack.len())..], &bytes)
            .map(|i| i + from);
    }
    haystack[from..].char_indices().find(|&(_, c)| set.matches(c)).map(|(i, _)| i + from)
}

/// If every range in `set` is a single ASCII byte, return those bytes (up to
/// 3, `memchr`'s specialized cases); otherwise `None`.
fn ascii_singletons(set: &ClassSet) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for &(lo, hi) in set.ranges() {
        if !lo.is_ascii() || lo != hi {
            return None;
        }
        out.push(lo as u8);
        if out.len() > 3 {
            return None;
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn find_any_byte(haystack: &[u8], needles: &[u8]) -> Option<usize> {
    match needles {
        [a] => memchr(*a, haystack),
        [a, b] => memchr2(*a, *b, haystack),
        [a, b, c] => memchr3(*a, *b, *c, haystack),
        _ => haystack.iter().position(|b| needles.contains(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_prefilter_finds_next_occurrence() {
        let p = Prefilter::Literal("bar".to_string());
        assert_eq!(p.next_candidate("foobarbaz", 0), Some(3));
        assert_eq!(p.next_candidate("foobarbaz", 4), None);
    }

    #[test]
    fn char_set_prefilter_scans_digits() {
        let set = ClassSet::from_range('0', '9');
        let p = Prefilter::Chars(set);
        assert_eq!(p.next_candidate("abc123", 0), Some(3));
    }

    #[test]
    fn no_prefilter_always_returns_from() {
        assert_eq!(Prefilter::None.next_candidate("anything", 5), Some(5));
    }
}
