// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end scenarios exercising `Pattern`/`Matcher` as a whole, rather
//! than the per-module unit tests living alongside each module.

use icu_regex::{ErrorKind, Flags, Pattern};

#[test]
fn log_line_extraction_with_named_groups() {
    let pattern = Pattern::compile(
        r"(?<level>ERROR|WARN|INFO)\s+\[(?<service>[a-z-]+)\]\s+(?<message>.+)",
        Flags::NONE,
    )
    .unwrap();
    let mut m = pattern.matcher("ERROR [payments-api] connection refused");
    assert!(m.find().unwrap());
    assert_eq!(m.group_by_name("level").unwrap(), Some("ERROR"));
    assert_eq!(m.group_by_name("service").unwrap(), Some("payments-api"));
    assert_eq!(m.group_by_name("message").unwrap(), Some("connection refused"));
}

#[test]
fn case_insensitive_multiline_header_scan() {
    let pattern = Pattern::compile(r"^content-type:\s*(\S+)$", Flags::CASE_INSENSITIVE | Flags::MULTILINE)
        .unwrap();
    let headers = "Host: example.com\nContent-Type: application/json\nAccept: */*";
    let mut m = pattern.matcher(headers);
    assert!(m.find().unwrap());
    assert_eq!(m.group(1).unwrap(), Some("application/json"));
}

#[test]
fn possessive_quantifier_prevents_catastrophic_backtracking_from_failing_slowly() {
    // A classic ReDoS shape: nested unbounded quantifiers with no possible
    // match. The possessive outer quantifier commits to its greedy match
    // and never backtracks character-by-character into it, so this must
    // fail quickly rather than exploring exponentially many splits.
    let pattern = Pattern::compile(r"^(a++)+b$", Flags::NONE).unwrap();
    let haystack = "a".repeat(30);
    let mut m = pattern.matcher(&haystack);
    m.set_time_limit(1_000_000).unwrap();
    assert!(!m.matches().unwrap());
}

#[test]
fn lookaround_validates_password_without_capturing_lookaround_text() {
    // At least one digit and one uppercase letter, eight or more characters.
    let pattern = Pattern::compile(r"^(?=.*[0-9])(?=.*[A-Z]).{8,}$", Flags::NONE).unwrap();
    assert!(Pattern::matches(r"^(?=.*[0-9])(?=.*[A-Z]).{8,}$", Flags::NONE, "Abcdefg1").unwrap());
    assert!(!pattern.matcher("abcdefg1").matches().unwrap());
    assert!(!pattern.matcher("Abcdefgh").matches().unwrap());
}

#[test]
fn split_and_replace_round_trip_csv_like_input() {
    let pattern = Pattern::compile(r",\s*", Flags::NONE).unwrap();
    let fields = pattern.split("red, green,blue ,  yellow", 0).unwrap();
    assert_eq!(fields, vec!["red", "green", "blue ", "yellow"]);

    let mut m = pattern.matcher("red, green,blue");
    assert_eq!(m.replace_all(" | ").unwrap(), "red | green | blue");
}

#[test]
fn region_and_transparent_bounds_affect_lookbehind_visibility() {
    let pattern = Pattern::compile(r"(?<=foo)bar", Flags::NONE).unwrap();
    let text = "foobar";
    let mut m = pattern.matcher(text);
    m.region(3, 6).unwrap();

    // Opaque bounds (the default): the look-behind can't see "foo" before
    // the region, so matching "bar" alone fails.
    assert!(!m.matches().unwrap());

    m.region(3, 6).unwrap();
    m.use_transparent_bounds(true);
    assert!(m.matches().unwrap());
}

#[test]
fn unicode_case_folding_matches_across_scripts() {
    assert!(Pattern::matches("STRASSE", Flags::CASE_INSENSITIVE, "strasse").unwrap());
    assert!(Pattern::matches("Ωμέγα", Flags::CASE_INSENSITIVE, "ΩΜΈΓΑ").unwrap());
    assert!(Pattern::matches("café", Flags::CASE_INSENSITIVE, "CAFÉ").unwrap());
}

#[test]
fn scenario_1_star_repeated_group_matches_whole_string() {
    let pattern = Pattern::compile("st(abc)*ring", Flags::NONE).unwrap();
    let mut m = pattern.matcher("stabcabcring");
    assert!(m.matches().unwrap());
    assert_eq!(m.group_count(), 1);
    assert_eq!(m.group(1).unwrap(), Some("abc"));
}

#[test]
fn scenario_2_nested_groups_looking_at_report_exact_boundaries() {
    let pattern = Pattern::compile("01(23(45)67)(.*)", Flags::NONE).unwrap();
    let mut m = pattern.matcher("0123456789");
    assert!(m.looking_at().unwrap());
    let starts: Vec<Option<usize>> = (0..=3).map(|g| m.start(g).unwrap()).collect();
    let ends: Vec<Option<usize>> = (0..=3).map(|g| m.end(g).unwrap()).collect();
    assert_eq!(starts, vec![Some(0), Some(2), Some(4), Some(8)]);
    assert_eq!(ends, vec![Some(10), Some(8), Some(6), Some(10)]);
    assert_eq!(m.group(3).unwrap(), Some("89"));
}

#[test]
fn scenario_3_successive_finds_report_each_occurrence_position() {
    let pattern = Pattern::compile("abc", Flags::NONE).unwrap();
    let mut m = pattern.matcher(".abc..abc...abc..");
    let mut starts = Vec::new();
    while m.find().unwrap() {
        starts.push(m.start(0).unwrap());
    }
    assert_eq!(starts, vec![Some(1), Some(6), Some(12)]);
}

#[test]
fn scenario_4_zero_length_lookahead_matches_at_every_position() {
    let pattern = Pattern::compile("(?= ?)", Flags::NONE).unwrap();
    let mut m = pattern.matcher("    ");
    let mut positions = Vec::new();
    while m.find().unwrap() {
        let (start, end) = (m.start(0).unwrap(), m.end(0).unwrap());
        assert_eq!(start, end);
        positions.push(start);
    }
    assert_eq!(positions, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
}

#[test]
fn scenario_5_replace_first_leaves_escaped_dollar_literal() {
    let pattern = Pattern::compile("a(..)", Flags::NONE).unwrap();
    let mut m = pattern.matcher("abcdefg");
    let replaced = m.replace_first(r"The value of \$1 is $1.").unwrap();
    assert_eq!(replaced, "The value of $1 is bc.defg");
}

#[test]
fn scenario_6_catastrophic_backtracking_times_out() {
    let pattern = Pattern::compile("(a+)+b", Flags::NONE).unwrap();
    let haystack = "a".repeat(21);
    let mut m = pattern.matcher(&haystack);
    m.set_time_limit(100).unwrap();
    let err = m.looking_at().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TimeOut));
}
