// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A set of Unicode scalar-value ranges, built up by the `[...]` parser via
//! union/intersection/difference/negation, exactly as ICU's bracket-class
//! grammar allows. Kept normalized (sorted, non-overlapping, merged) so
//! matching can binary-search it.

use std::cmp::Ordering;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassSet {
    ranges: Vec<(char, char)>,
}

impl ClassSet {
    pub fn new() -> ClassSet {
        ClassSet { ranges: vec![] }
    }

    pub fn single(c: char) -> ClassSet {
        ClassSet { ranges: vec![(c, c)] }
    }

    pub fn from_range(lo: char, hi: char) -> ClassSet {
        ClassSet { ranges: vec![(lo, hi)] }
    }

    pub fn from_ranges(ranges: Vec<(char, char)>) -> ClassSet {
        let mut s = ClassSet { ranges };
        s.normalize();
        s
    }

    pub fn push(&mut self, lo: char, hi: char) {
        self.ranges.push((lo, hi));
        self.normalize();
    }

    pub fn push_char(&mut self, c: char) {
        self.push(c, c);
    }

    pub fn extend(&mut self, other: &ClassSet) {
        self.ranges.extend_from_slice(&other.ranges);
        self.normalize();
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn matches(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if c < lo {
                    Ordering::Greater
                } else if c > hi {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The entire Unicode scalar-value range.
    pub fn any() -> ClassSet {
        ClassSet::from_ranges(vec![('\u{0}', char::MAX)])
    }

    /// Every code point except line terminators (what `.` matches without
    /// DOTALL), parameterized over the active `UNIX_LINES` definition.
    pub fn any_non_terminator(unix_lines: bool) -> ClassSet {
        let mut s = ClassSet::any();
        let terms = if unix_lines {
            vec!['\n']
        } else {
            vec!['\n', '\r', '\u{85}', '\u{2028}', '\u{2029}', '\x0B', '\x0C']
        };
        for t in terms {
            s = s.difference(&ClassSet::single(t));
        }
        s
    }

    pub fn negate(&self) -> ClassSet {
        let mut out = Vec::new();
        let mut next_lo = '\u{0}';
        for &(lo, hi) in &self.ranges {
            if next_lo < lo {
                out.push((next_lo, prev_char(lo)));
            }
            next_lo = match next_char(hi) {
                Some(c) => c,
                None => return ClassSet::from_ranges(out),
            };
        }
        if next_lo <= char::MAX {
            out.push((next_lo, char::MAX));
        }
        ClassSet::from_ranges(out)
    }

    pub fn union(&self, other: &ClassSet) -> ClassSet {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        ClassSet::from_ranges(ranges)
    }

    pub fn intersection(&self, other: &ClassSet) -> ClassSet {
        let mut out = Vec::new();
        for &(lo1, hi1) in &self.ranges {
            for &(lo2, hi2) in &other.ranges {
                let lo = lo1.max(lo2);
                let hi = hi1.min(hi2);
                if lo <= hi {
                    out.push((lo, hi));
                }
            }
        }
        ClassSet::from_ranges(out)
    }

    pub fn difference(&self, other: &ClassSet) -> ClassSet {
        self.intersection(&other.negate())
    }

    pub fn case_fold(&self) -> ClassSet {
        let mut out = self.ranges.clone();
        for &(lo, hi) in &self.ranges {
            let mut c = lo;
            loop {
                for variant in crate::unicode::case_closure(c) {
                    out.push((variant, variant));
                }
                if c == hi {
                    break;
                }
                c = next_char(c).unwrap();
            }
        }
        ClassSet::from_ranges(out)
    }

    fn normalize(&mut self) {
        if self.ranges.is_empty() {
            return;
        }
        self.ranges.sort_by(|a, b| a.0.cmp(&b.0));
        let mut merged: Vec<(char, char)> = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            if let Some(last) = merged.last_mut() {
                if lo <= last.1 || is_adjacent(last.1, lo) {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                    continue;
                }
            }
            merged.push((lo, hi));
        }
        self.ranges = merged;
    }
}

fn is_adjacent(a: char, b: char) -> bool {
    match next_char(a) {
        Some(c) => c == b,
        None => false,
    }
}

fn next_char(c: char) -> Option<char> {
    char::from_u32(c as u32 + 1)
}

fn prev_char(c: char) -> char {
    char::from_u32(c as u32 - 1).unwrap_or('\u{0}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_merges_overlaps() {
        let s = ClassSet::from_ranges(vec![('a', 'c'), ('b', 'e'), ('g', 'h')]);
        assert_eq!(s.ranges(), &[('a', 'e'), ('g', 'h')]);
    }

    #[test]
    fn negate_digits() {
        let digits = ClassSet::from_range('0', '9');
        let negated = digits.negate();
        assert!(!negated.matches('5'));
        assert!(negated.matches('a'));
        assert!(negated.matches('\u{0}'));
    }

    #[test]
    fn difference_removes_overlap() {
        let all = ClassSet::from_range('a', 'z');
        let vowels = ClassSet::from_ranges(vec![('a', 'a'), ('e', 'e'), ('i', 'i'), ('o', 'o'), ('u', 'u')]);
        let consonants = all.difference(&vowels);
        assert!(!consonants.matches('a'));
        assert!(consonants.matches('b'));
    }

    #[test]
    fn case_fold_includes_upper() {
        let s = ClassSet::single('a').case_fold();
        assert!(s.matches('a'));
        assert!(s.matches('A'));
    }
}
