// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turns a parsed [`Ast`] into the flat bytecode `backtrack.rs` runs, and
//! computes the static facts (`min_length`, `initial_chars`/`initial_string`,
//! whether the match is anchored) `Pattern`/`Matcher` use to short-circuit
//! `find`.

use std::collections::HashMap;

use crate::ast::Ast;
use crate::class::ClassSet;
use crate::error::{Error, ErrorKind, Result};
use crate::inst::Inst;
use crate::parser::ParsedPattern;
use crate::unicode;

/// Programs beyond this many instructions are rejected rather than grown
/// without bound, mirroring the ICU/PCRE convention of a configurable
/// compiled-pattern size ceiling.
const MAX_PROGRAM_SIZE: usize = 1 << 20;

#[derive(Debug)]
pub struct Program {
    pub insts: Vec<Inst>,
    pub counter_count: usize,
    pub group_count: u32,
    pub group_names: Vec<Option<String>>,
    pub named_groups: HashMap<String, u32>,
    pub min_length: u32,
    pub initial_chars: Option<ClassSet>,
    pub initial_string: Option<String>,
    pub anchored_start: bool,
}

pub fn compile(parsed: ParsedPattern) -> Result<Program> {
    let mut c = Compiler::new();
    c.insts.push(Inst::Save { slot: 0 });
    c.compile_ast(&parsed.ast)?;
    c.insts.push(Inst::Save { slot: 1 });
    c.insts.push(Inst::Match);

    if c.insts.len() > MAX_PROGRAM_SIZE {
        return Err(Error::new(ErrorKind::PatternTooBig));
    }

    let min_length = min_length(&parsed.ast);
    let initial_chars = compute_initial_chars(&parsed.ast);
    let initial_string = compute_initial_string(&parsed.ast);
    let anchored_start = starts_anchored(&parsed.ast);

    Ok(Program {
        insts: c.insts,
        counter_count: c.next_counter,
        group_count: parsed.group_count,
        group_names: parsed.group_names,
        named_groups: parsed.named_groups,
        min_length,
        initial_chars,
        initial_string,
        anchored_start,
    })
}

struct Compiler {
    insts: Vec<Inst>,
    next_counter: usize,
}

impl Compiler {
    fn new() -> Compiler {
        Compiler { insts: Vec::new(), next_counter: 0 }
    }

    fn compile_ast(&mut self, ast: &Ast) -> Result<()> {
        match ast {
            Ast::Empty => {}
            Ast::Literal { c, casei } => self.compile_literal(*c, *casei),
            Ast::Dot { dotall, unix_lines } => {
                self.insts.push(Inst::Any { dotall: *dotall, unix_lines: *unix_lines })
            }
            Ast::Class(set) => self.insts.push(Inst::Ranges(set.clone())),
            Ast::StaticClass { class, negate } => {
                self.insts.push(Inst::StaticClass { class: *class, negate: *negate })
            }
            Ast::Concat(parts) => {
                for p in parts {
                    self.compile_ast(p)?;
                }
            }
            Ast::Alternate(branches) => self.compile_alternate(branches)?,
            Ast::Capture { index, inner, .. } => {
                let base = 2 * (*index as usize);
                self.insts.push(Inst::Save { slot: base });
                self.compile_ast(inner)?;
                self.insts.push(Inst::Save { slot: base + 1 });
            }
            Ast::NonCapture(inner) => self.compile_ast(inner)?,
            Ast::Atomic(inner) => {
                self.insts.push(Inst::AtomicStart);
                self.compile_ast(inner)?;
                self.insts.push(Inst::AtomicEnd);
            }
            Ast::Look { behind, negate, inner } => self.compile_look(*behind, *negate, inner)?,
            Ast::Repeat { inner, min, max, greedy, possessive } => {
                self.compile_repeat(inner, *min, *max, *greedy, *possessive)?
            }
            Ast::StartText => self.insts.push(Inst::StartText),
            Ast::EndInputOnly => self.insts.push(Inst::EndInputOnly),
            Ast::EndInputOptionalTerminator => self.insts.push(Inst::EndInputOptionalTerminator),
            Ast::StartLine { unix_lines } => self.insts.push(Inst::StartLine { unix_lines: *unix_lines }),
            Ast::EndLine { unix_lines } => self.insts.push(Inst::EndLine { unix_lines: *unix_lines }),
            Ast::WordBoundary => self.insts.push(Inst::WordBoundary),
            Ast::NotWordBoundary => self.insts.push(Inst::NotWordBoundary),
            Ast::PrevMatchEnd => self.insts.push(Inst::PrevMatchEnd),
            Ast::BackRef { index, casei } => {
                self.insts.push(Inst::BackRef { index: *index, casei: *casei })
            }
        }
        Ok(())
    }

    /// Compiles a single literal code point. Under `CASE_INSENSITIVE`, a
    /// code point whose full case fold expands to more than one code point
    /// (e.g. `ß` folding to `"ss"`) also needs to match that expanded run in
    /// the input, which a single `Inst::Char` can't do on its own — so this
    /// emits a choice between the single-code-point match and the expanded
    /// literal sequence.
    fn compile_literal(&mut self, c: char, casei: bool) {
        if casei {
            let fold = unicode::full_fold(c);
            if fold.len() > 1 {
                let split_pc = self.insts.len();
                self.insts.push(Inst::Split { prefer: 0, alt: 0 });
                let single_pc = self.insts.len();
                self.insts.push(Inst::Char { c, casei: true });
                let jmp_pc = self.insts.len();
                self.insts.push(Inst::Jmp(0));
                let expanded_pc = self.insts.len();
                for fc in fold {
                    self.insts.push(Inst::Char { c: fc, casei: true });
                }
                let end_pc = self.insts.len();
                self.insts[split_pc] = Inst::Split { prefer: single_pc, alt: expanded_pc };
                if let Inst::Jmp(target) = &mut self.insts[jmp_pc] {
                    *target = end_pc;
                }
                return;
            }
        }
        self.insts.push(Inst::Char { c, casei });
    }

    fn compile_alternate(&mut self, branches: &[Ast]) -> Result<()> {
        let mut jmps = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            if i + 1 == branches.len() {
                self.compile_ast(branch)?;
                continue;
            }
            let split_pc = self.insts.len();
            self.insts.push(Inst::Split { prefer: split_pc + 1, alt: 0 });
            self.compile_ast(branch)?;
            let jmp_pc = self.insts.len();
            self.insts.push(Inst::Jmp(0));
            jmps.push(jmp_pc);
            let next_branch_pc = self.insts.len();
            if let Inst::Split { alt, .. } = &mut self.insts[split_pc] {
                *alt = next_branch_pc;
            }
        }
        let end_pc = self.insts.len();
        for jmp_pc in jmps {
            if let Inst::Jmp(target) = &mut self.insts[jmp_pc] {
                *target = end_pc;
            }
        }
        Ok(())
    }

    fn compile_repeat(
        &mut self,
        inner: &Ast,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        possessive: bool,
    ) -> Result<()> {
        if possessive {
            self.insts.push(Inst::AtomicStart);
            self.compile_repeat(inner, min, max, greedy, false)?;
            self.insts.push(Inst::AtomicEnd);
            return Ok(());
        }
        match (min, max) {
            (0, Some(1)) => {
                let split_pc = self.insts.len();
                self.insts.push(Inst::Split { prefer: 0, alt: 0 });
                let body_pc = self.insts.len();
                self.compile_ast(inner)?;
                let end_pc = self.insts.len();
                self.insts[split_pc] = if greedy {
                    Inst::Split { prefer: body_pc, alt: end_pc }
                } else {
                    Inst::Split { prefer: end_pc, alt: body_pc }
                };
            }
            (0, None) => {
                let split_pc = self.insts.len();
                self.insts.push(Inst::Split { prefer: 0, alt: 0 });
                let body_pc = self.insts.len();
                self.compile_ast(inner)?;
                self.insts.push(Inst::Jmp(split_pc));
                let end_pc = self.insts.len();
                self.insts[split_pc] = if greedy {
                    Inst::Split { prefer: body_pc, alt: end_pc }
                } else {
                    Inst::Split { prefer: end_pc, alt: body_pc }
                };
            }
            (1, None) => {
                let body_pc = self.insts.len();
                self.compile_ast(inner)?;
                let split_pc = self.insts.len();
                self.insts.push(Inst::Split { prefer: 0, alt: 0 });
                let end_pc = self.insts.len();
                self.insts[split_pc] = if greedy {
                    Inst::Split { prefer: body_pc, alt: end_pc }
                } else {
                    Inst::Split { prefer: end_pc, alt: body_pc }
                };
            }
            _ => {
                let counter = self.next_counter;
                self.next_counter += 1;
                self.insts.push(Inst::RepeatInit { counter });
                let check_pc = self.insts.len();
                self.insts.push(Inst::RepeatCheck { counter, min, max, greedy, body: 0, exit: 0 });
                let body_pc = self.insts.len();
                self.compile_ast(inner)?;
                self.insts.push(Inst::RepeatInc { counter, check: check_pc });
                let exit_pc = self.insts.len();
                self.insts[check_pc] =
                    Inst::RepeatCheck { counter, min, max, greedy, body: body_pc, exit: exit_pc };
            }
        }
        Ok(())
    }

    fn compile_look(&mut self, behind: bool, negate: bool, inner: &Ast) -> Result<()> {
        if behind {
            let min_len = min_length(inner);
            let max_len = max_length(inner).ok_or_else(|| Error::new(ErrorKind::LookBehindLimit))?;
            let start_pc = self.insts.len();
            self.insts.push(Inst::LookBehindStart { negate, min_len, max_len, end: 0 });
            self.compile_ast(inner)?;
            self.insts.push(Inst::LookEnd);
            let end_pc = self.insts.len();
            if let Inst::LookBehindStart { end, .. } = &mut self.insts[start_pc] {
                *end = end_pc;
            }
        } else {
            let start_pc = self.insts.len();
            self.insts.push(Inst::LookAheadStart { negate, end: 0 });
            self.compile_ast(inner)?;
            self.insts.push(Inst::LookEnd);
            let end_pc = self.insts.len();
            if let Inst::LookAheadStart { end, .. } = &mut self.insts[start_pc] {
                *end = end_pc;
            }
        }
        Ok(())
    }
}

// ---- static analysis ----

fn min_length(ast: &Ast) -> u32 {
    use Ast::*;
    match ast {
        Empty => 0,
        Literal { .. } | Dot { .. } | Class(_) | StaticClass { .. } => 1,
        Concat(parts) => parts.iter().map(min_length).fold(0u32, |a, b| a.saturating_add(b)),
        Alternate(branches) => branches.iter().map(min_length).min().unwrap_or(0),
        Capture { inner, .. } | NonCapture(inner) | Atomic(inner) => min_length(inner),
        Look { .. } => 0,
        Repeat { inner, min, .. } => min_length(inner).saturating_mul(*min),
        StartText | EndInputOnly | EndInputOptionalTerminator | StartLine { .. } | EndLine { .. }
        | WordBoundary | NotWordBoundary | PrevMatchEnd => 0,
        BackRef { .. } => 0,
    }
}

/// `None` means unbounded (an unbounded repeat, or a back-reference, whose
/// contribution to length can't be determined statically).
fn max_length(ast: &Ast) -> Option<u32> {
    use Ast::*;
    match ast {
        Empty => Some(0),
        Literal { c, casei: true } => {
            Some((unicode::full_fold(*c).len() as u32).max(1))
        }
        Literal { .. } | Dot { .. } | Class(_) | StaticClass { .. } => Some(1),
        Concat(parts) => {
            let mut total = 0u32;
            for p in parts {
                total = total.saturating_add(max_length(p)?);
            }
            Some(total)
        }
        Alternate(branches) => {
            let mut hi = 0u32;
            for b in branches {
                hi = hi.max(max_length(b)?);
            }
            Some(hi)
        }
        Capture { inner, .. } | NonCapture(inner) | Atomic(inner) => max_length(inner),
        Look { .. } => Some(0),
        Repeat { inner, max, .. } => {
            let m = (*max)?;
            Some(max_length(inner)?.saturating_mul(m))
        }
        StartText | EndInputOnly | EndInputOptionalTerminator | StartLine { .. } | EndLine { .. }
        | WordBoundary | NotWordBoundary | PrevMatchEnd => Some(0),
        BackRef { .. } => None,
    }
}

/// The mandatory literal prefix every match must begin with, if the
/// pattern has one (no alternation or optional structure before it ends).
fn compute_initial_string(ast: &Ast) -> Option<String> {
    fn walk(ast: &Ast, out: &mut String) -> bool {
        match ast {
            Ast::Literal { c, casei: false } => {
                out.push(*c);
                true
            }
            Ast::Concat(parts) => {
                for p in parts {
                    if !walk(p, out) {
                        return false;
                    }
                }
                true
            }
            Ast::Capture { inner, .. } | Ast::NonCapture(inner) | Ast::Atomic(inner) => walk(inner, out),
            _ => false,
        }
    }
    let mut out = String::new();
    walk(ast, &mut out);
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// The set of code points a match could possibly start with, for a quick
/// `memchr`-backed pre-scan in `find` when there is no fixed literal prefix.
/// `None` means unconstrained (don't bother scanning).
fn compute_initial_chars(ast: &Ast) -> Option<ClassSet> {
    fn first_set(ast: &Ast) -> Option<(ClassSet, bool)> {
        use Ast::*;
        match ast {
            Empty => Some((ClassSet::new(), true)),
            Literal { c, casei } => {
                let mut s = ClassSet::single(*c);
                if *casei {
                    s = s.case_fold();
                }
                Some((s, false))
            }
            Dot { dotall, unix_lines } => {
                let s =
                    if *dotall { ClassSet::any() } else { ClassSet::any_non_terminator(*unix_lines) };
                Some((s, false))
            }
            Class(set) => Some((set.clone(), false)),
            StaticClass { class, negate } => Some((unicode::materialize(*class, *negate), false)),
            Concat(parts) => {
                let mut acc = ClassSet::new();
                for p in parts {
                    let (s, empty) = first_set(p)?;
                    acc = acc.union(&s);
                    if !empty {
                        return Some((acc, false));
                    }
                }
                Some((acc, true))
            }
            Alternate(branches) => {
                let mut acc = ClassSet::new();
                let mut all_empty = true;
                for b in branches {
                    let (s, empty) = first_set(b)?;
                    acc = acc.union(&s);
                    all_empty &= empty;
                }
                Some((acc, all_empty))
            }
            Capture { inner, .. } | NonCapture(inner) | Atomic(inner) => first_set(inner),
            Look { .. } => Some((ClassSet::new(), true)),
            Repeat { inner, min, .. } => {
                let (s, _) = first_set(inner)?;
                Some((s, *min == 0))
            }
            StartText | EndInputOnly | EndInputOptionalTerminator | StartLine { .. } | EndLine { .. }
            | WordBoundary | NotWordBoundary | PrevMatchEnd => Some((ClassSet::new(), true)),
            BackRef { .. } => None,
        }
    }
    first_set(ast).map(|(s, _)| s).filter(|s| !s.is_empty())
}

fn starts_anchored(ast: &Ast) -> bool {
    fn walk(ast: &Ast) -> bool {
        match ast {
            Ast::StartText => true,
            Ast::Concat(parts) => parts.first().map(walk).unwrap_or(false),
            Ast::Capture { inner, .. } | Ast::NonCapture(inner) | Ast::Atomic(inner) => walk(inner),
            _ => false,
        }
    }
    walk(ast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::parser::parse;

    fn compiled(pattern: &str) -> Program {
        let parsed = parse(pattern, Flags::NONE).unwrap();
        compile(parsed).unwrap()
    }

    #[test]
    fn literal_prefix_detected() {
        let p = compiled("hello(world)?");
        assert_eq!(p.initial_string.as_deref(), Some("hello"));
    }

    #[test]
    fn min_length_counts_mandatory_repeats() {
        let p = compiled("a{3,5}b");
        assert_eq!(p.min_length, 4);
    }

    #[test]
    fn backref_blocks_length_analysis() {
        let p = compiled("(a+)\\1");
        assert_eq!(p.min_length, 1);
        assert!(p.initial_string.is_none() || p.initial_string.as_deref() != Some(""));
    }

    #[test]
    fn unbounded_lookbehind_rejected() {
        let parsed = parse("(?<=a*)b", Flags::NONE).unwrap();
        assert!(compile(parsed).is_err());
    }

    #[test]
    fn bounded_lookbehind_accepted() {
        let parsed = parse("(?<=a{1,3})b", Flags::NONE).unwrap();
        assert!(compile(parsed).is_ok());
    }

    #[test]
    fn anchored_start_detected() {
        assert!(compiled("\\Afoo").anchored_start);
        assert!(!compiled("foo").anchored_start);
    }
}
