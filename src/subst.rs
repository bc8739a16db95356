// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parses a replacement template (`$1`, `${name}`, `\$`, ...) once into a
//! sequence of literal/reference pieces, so repeated substitutions over the
//! same template (`replaceAll`) don't re-parse it per match.

use std::collections::HashMap;

use crate::error::{Error, ErrorKind, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(u32),
    Named(String),
}

/// A parsed replacement template, ready to be expanded against a set of
/// captures from a single match.
#[derive(Clone, Debug)]
pub struct Template {
    pieces: Vec<Piece>,
}

pub fn parse(template: &str, group_count: u32) -> Result<Template> {
    let chars: Vec<char> = template.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 1;
                match chars.get(i) {
                    Some(&c) => literal.push(c),
                    None => return Err(Error::new(ErrorKind::RuleSyntax("trailing '\\' in replacement".into()))),
                }
                i += 1;
            }
            '$' => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                i += 1;
                if chars.get(i) == Some(&'{') {
                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == '}')
                        .ok_or_else(|| Error::new(ErrorKind::RuleSyntax("missing '}' in replacement".into())))?;
                    let name: String = chars[i + 1..i + close].iter().collect();
                    if name.is_empty() {
                        return Err(Error::new(ErrorKind::RuleSyntax("empty ${} reference".into())));
                    }
                    if name.chars().all(|c| c.is_ascii_digit()) {
                        let n: u32 = name.parse().map_err(|_| Error::new(ErrorKind::NumberTooBig))?;
                        if n > group_count {
                            return Err(Error::new(ErrorKind::RuleSyntax(format!(
                                "'${{{}}}' references a group that doesn't exist",
                                name
                            ))));
                        }
                        pieces.push(Piece::Group(n));
                    } else {
                        pieces.push(Piece::Named(name));
                    }
                    i += close + 1;
                } else {
                    let start = i;
                    while chars.get(i).map_or(false, |c| c.is_ascii_digit()) {
                        i += 1;
                    }
                    if i == start {
                        return Err(Error::new(ErrorKind::RuleSyntax(
                            "'$' in replacement must be followed by a group number or {name}".into(),
                        )));
                    }
                    // Longest digit run that resolves to a valid group number
                    // (<= group_count); trailing digits that would push the
                    // number out of range are left as literal text, not
                    // consumed. Group 0 (the whole match) is always valid.
                    let digits = &chars[start..i];
                    let mut len = digits.len();
                    let index = loop {
                        let candidate: String = digits[..len].iter().collect();
                        match candidate.parse::<u32>() {
                            Ok(n) if n <= group_count => break n,
                            _ if len > 1 => len -= 1,
                            _ => {
                                return Err(Error::new(ErrorKind::RuleSyntax(format!(
                                    "'${}' references a group that doesn't exist",
                                    candidate
                                ))))
                            }
                        }
                    };
                    pieces.push(Piece::Group(index));
                    i = start + len;
                }
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(Template { pieces })
}

impl Template {
    /// Expands this template against one match's captures, appending the
    /// result to `out`. `group` resolves a numbered capture to its matched
    /// text (or `None` if that group didn't participate); `named` resolves
    /// `${name}` references to a group index.
    pub fn expand(
        &self,
        out: &mut String,
        group: impl Fn(u32) -> Option<String>,
        named: &HashMap<String, u32>,
    ) -> Result<()> {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(s) => out.push_str(s),
                Piece::Group(n) => {
                    if let Some(text) = group(*n) {
                        out.push_str(&text);
                    }
                }
                Piece::Named(name) => {
                    let idx = *named
                        .get(name)
                        .ok_or_else(|| Error::new(ErrorKind::InvalidCaptureGroupName(name.clone())))?;
                    if let Some(text) = group(idx) {
                        out.push_str(&text);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_n(template: &str, group_count: u32, groups: &[(u32, &str)], named: &HashMap<String, u32>) -> String {
        let tpl = parse(template, group_count).unwrap();
        let mut out = String::new();
        tpl.expand(
            &mut out,
            |n| groups.iter().find(|&&(i, _)| i == n).map(|&(_, s)| s.to_string()),
            named,
        )
        .unwrap();
        out
    }

    fn expand(template: &str, groups: &[(u32, &str)], named: &HashMap<String, u32>) -> String {
        let group_count = groups.iter().map(|&(i, _)| i).max().unwrap_or(0);
        expand_n(template, group_count, groups, named)
    }

    #[test]
    fn literal_passthrough() {
        assert_eq!(expand("no refs here", &[], &HashMap::new()), "no refs here");
    }

    #[test]
    fn numbered_group_reference() {
        assert_eq!(expand("<$1>", &[(1, "x")], &HashMap::new()), "<x>");
    }

    #[test]
    fn braced_group_reference_disambiguates_digits() {
        assert_eq!(expand("${1}23", &[(1, "x")], &HashMap::new()), "x23");
    }

    #[test]
    fn named_group_reference() {
        let mut named = HashMap::new();
        named.insert("word".to_string(), 2);
        assert_eq!(expand("[${word}]", &[(2, "hi")], &named), "[hi]");
    }

    #[test]
    fn escaped_dollar_is_literal() {
        assert_eq!(expand(r"\$1", &[(1, "x")], &HashMap::new()), "$1");
    }

    #[test]
    fn unmatched_group_expands_empty() {
        // Group 2 exists (group_count=2) but didn't participate in this
        // match, which is different from referencing a group number that
        // doesn't exist at all.
        assert_eq!(expand_n("[$2]", 2, &[(1, "x")], &HashMap::new()), "[]");
    }

    #[test]
    fn missing_closing_brace_is_error() {
        assert!(parse("${name", 0).is_err());
    }

    #[test]
    fn unknown_named_reference_is_error() {
        let tpl = parse("${nope}", 0).unwrap();
        let mut out = String::new();
        assert!(tpl.expand(&mut out, |_| None, &HashMap::new()).is_err());
    }

    #[test]
    fn out_of_range_digits_shrink_to_longest_valid_prefix() {
        // One capture group: "$12" can't be group 12, so it backs off to
        // group 1 followed by a literal '2'.
        assert_eq!(expand_n("$12", 1, &[(1, "x")], &HashMap::new()), "x2");
    }

    #[test]
    fn group_zero_is_always_valid() {
        assert_eq!(expand_n("$0", 0, &[(0, "whole")], &HashMap::new()), "whole");
    }

    #[test]
    fn digit_exceeding_group_count_with_no_shorter_prefix_is_error() {
        // No capture groups at all: the only candidate is "5" itself, which
        // isn't a valid group number and can't be shrunk any further.
        assert!(parse("$5", 0).is_err());
    }

    #[test]
    fn leading_zeros_are_consumed() {
        assert_eq!(expand_n("$01", 1, &[(1, "x")], &HashMap::new()), "x");
    }
}
