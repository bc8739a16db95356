// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The lexer and recursive-descent parser: pattern source text plus an
//! initial flag set in, an [`Ast`] plus the group/name tables out.
//!
//! Operates over a `Vec<char>` rather than byte offsets into the source
//! string, since error positions are reported as 1-based line/column pairs
//! rather than byte offsets and every lookahead here is by code point.

use std::collections::HashMap;

use crate::ast::Ast;
use crate::class::ClassSet;
use crate::error::{Error, ErrorKind, Result};
use crate::flags::Flags;
use crate::unicode::{self, StaticClass};

/// ICU caps numeric literals (quantifier bounds, `\x{...}` code points) at
/// 24 bits.
const MAX_NUMBER: u32 = (1 << 24) - 1;

/// The result of a successful parse: the tree, and the bookkeeping needed
/// to resolve capture references by number or by name.
pub struct ParsedPattern {
    pub ast: Ast,
    pub group_count: u32,
    /// Indexed by group number; `group_names[0]` is always `None` (the
    /// whole-match pseudo-group has no name).
    pub group_names: Vec<Option<String>>,
    pub named_groups: HashMap<String, u32>,
}

pub fn parse(source: &str, flags: Flags) -> Result<ParsedPattern> {
    let mut p = Parser::new(source, flags);
    let ast = p.parse_alternate()?;
    if p.peek().is_some() {
        return Err(p.err(ErrorKind::MismatchedParen));
    }
    validate_backrefs(&ast, p.group_count)?;
    Ok(ParsedPattern {
        ast,
        group_count: p.group_count,
        group_names: p.group_names,
        named_groups: p.named_groups,
    })
}

enum BracketOp {
    Union,
    Intersect,
    Difference,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    flags: Flags,
    group_count: u32,
    group_names: Vec<Option<String>>,
    named_groups: HashMap<String, u32>,
}

impl Parser {
    fn new(source: &str, flags: Flags) -> Parser {
        Parser {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            flags,
            group_count: 0,
            group_names: vec![None],
            named_groups: HashMap::new(),
        }
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::at(kind, self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.err(ErrorKind::RuleSyntax(format!("expected '{}'", c))))
        }
    }

    /// Skips whitespace and `#`-to-end-of-line comments when COMMENTS is
    /// active. Never called while inside a `[...]`.
    fn skip_comments(&mut self) {
        if !self.flags.contains(Flags::COMMENTS) {
            return;
        }
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    // ---- grammar ----

    fn parse_alternate(&mut self) -> Result<Ast> {
        let mut branches = vec![self.parse_concat()?];
        while self.peek() == Some('|') {
            self.bump();
            branches.push(self.parse_concat()?);
        }
        Ok(Ast::alternate(branches))
    }

    fn parse_concat(&mut self) -> Result<Ast> {
        let mut parts = Vec::new();
        loop {
            self.skip_comments();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                _ => parts.push(self.parse_quantified()?),
            }
        }
        Ok(Ast::concat(parts))
    }

    fn parse_quantified(&mut self) -> Result<Ast> {
        let atom = self.parse_atom()?;
        self.skip_comments();
        let (min, max) = match self.peek() {
            Some('?') => {
                self.bump();
                (0, Some(1))
            }
            Some('*') => {
                self.bump();
                (0, None)
            }
            Some('+') => {
                self.bump();
                (1, None)
            }
            Some('{') => match self.try_parse_interval()? {
                Some(bounds) => bounds,
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };
        if let Some(m) = max {
            if m < min {
                return Err(self.err(ErrorKind::MaxLtMin));
            }
        }
        let (greedy, possessive) = match self.peek() {
            Some('?') => {
                self.bump();
                (false, false)
            }
            Some('+') => {
                self.bump();
                (true, true)
            }
            _ => (true, false),
        };
        Ok(Ast::Repeat { inner: Box::new(atom), min, max, greedy, possessive })
    }

    /// Looks ahead from the current `{` for a `{n}` / `{n,}` / `{n,m}`
    /// interval without committing until the whole shape matches; anything
    /// else leaves the parser untouched so the `{` falls through as a
    /// literal.
    fn try_parse_interval(&mut self) -> Result<Option<(u32, Option<u32>)>> {
        let mut idx = self.pos + 1;
        let mut min_digits = String::new();
        while let Some(&c) = self.chars.get(idx) {
            if c.is_ascii_digit() {
                min_digits.push(c);
                idx += 1;
            } else {
                break;
            }
        }
        if min_digits.is_empty() {
            return Ok(None);
        }
        let mut max_digits = None;
        if self.chars.get(idx) == Some(&',') {
            idx += 1;
            let mut s = String::new();
            while let Some(&c) = self.chars.get(idx) {
                if c.is_ascii_digit() {
                    s.push(c);
                    idx += 1;
                } else {
                    break;
                }
            }
            max_digits = Some(s);
        }
        if self.chars.get(idx) != Some(&'}') {
            return Ok(None);
        }
        idx += 1;
        let error_pos = (self.line, self.col);
        while self.pos < idx {
            self.bump();
        }
        let min = parse_bounded_number(&min_digits)
            .ok_or_else(|| Error::at(ErrorKind::NumberTooBig, error_pos.0, error_pos.1))?;
        let max = match max_digits {
            None => Some(min),
            Some(s) if s.is_empty() => None,
            Some(s) => Some(
                parse_bounded_number(&s)
                    .ok_or_else(|| Error::at(ErrorKind::NumberTooBig, error_pos.0, error_pos.1))?,
            ),
        };
        Ok(Some((min, max)))
    }

    fn parse_atom(&mut self) -> Result<Ast> {
        self.skip_comments();
        match self.peek() {
            None => Ok(Ast::Empty),
            Some('(') => self.parse_group(),
            Some('[') => self.parse_class(),
            Some('.') => {
                self.bump();
                Ok(Ast::Dot {
                    dotall: self.flags.contains(Flags::DOTALL),
                    unix_lines: self.flags.contains(Flags::UNIX_LINES),
                })
            }
            Some('^') => {
                self.bump();
                if self.flags.contains(Flags::MULTILINE) {
                    Ok(Ast::StartLine { unix_lines: self.flags.contains(Flags::UNIX_LINES) })
                } else {
                    Ok(Ast::StartText)
                }
            }
            Some('$') => {
                self.bump();
                if self.flags.contains(Flags::MULTILINE) {
                    Ok(Ast::EndLine { unix_lines: self.flags.contains(Flags::UNIX_LINES) })
                } else {
                    Ok(Ast::EndInputOptionalTerminator)
                }
            }
            Some('\\') => {
                self.bump();
                self.parse_escape()
            }
            Some(c) if c == '*' || c == '+' || c == '?' => {
                Err(self.err(ErrorKind::RuleSyntax("quantifier with nothing to repeat".into())))
            }
            Some(c) => {
                self.bump();
                Ok(Ast::Literal { c, casei: self.flags.contains(Flags::CASE_INSENSITIVE) })
            }
        }
    }

    fn parse_group(&mut self) -> Result<Ast> {
        self.bump(); // '('
        if self.peek() != Some('?') {
            let index = self.group_count + 1;
            self.group_count = index;
            self.group_names.push(None);
            return self.parse_scoped(move |inner| Ast::Capture { index, name: None, inner });
        }
        self.bump(); // '?'
        match self.peek() {
            Some(':') => {
                self.bump();
                self.parse_scoped(Ast::NonCapture)
            }
            Some('=') => {
                self.bump();
                self.parse_scoped(|inner| Ast::Look { behind: false, negate: false, inner })
            }
            Some('!') => {
                self.bump();
                self.parse_scoped(|inner| Ast::Look { behind: false, negate: true, inner })
            }
            Some('>') => {
                self.bump();
                self.parse_scoped(Ast::Atomic)
            }
            Some('#') => {
                while let Some(c) = self.bump() {
                    if c == ')' {
                        return Ok(Ast::Empty);
                    }
                }
                Err(self.err(ErrorKind::MismatchedParen))
            }
            Some('<') => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        self.parse_scoped(|inner| Ast::Look { behind: true, negate: false, inner })
                    }
                    Some('!') => {
                        self.bump();
                        self.parse_scoped(|inner| Ast::Look { behind: true, negate: true, inner })
                    }
                    _ => {
                        let name = self.parse_group_name('>')?;
                        let index = self.group_count + 1;
                        self.group_count = index;
                        self.group_names.push(Some(name.clone()));
                        if self.named_groups.insert(name.clone(), index).is_some() {
                            return Err(self.err(ErrorKind::InvalidCaptureGroupName(name)));
                        }
                        self.parse_scoped(move |inner| Ast::Capture {
                            index,
                            name: Some(name),
                            inner,
                        })
                    }
                }
            }
            Some(c) if Flags::from_char(c).is_some() || c == '-' => self.parse_inline_flags(),
            Some(c) => Err(self.err(ErrorKind::InvalidFlag(c))),
            None => Err(self.err(ErrorKind::MismatchedParen)),
        }
    }

    /// Parses a parenthesized body, restoring the flag state on exit so an
    /// inline `(?i)` inside the group doesn't leak past its closing `)`.
    fn parse_scoped(&mut self, wrap: impl FnOnce(Box<Ast>) -> Ast) -> Result<Ast> {
        let saved = self.flags;
        let inner = self.parse_alternate()?;
        self.expect(')')?;
        self.flags = saved;
        Ok(wrap(Box::new(inner)))
    }

    fn parse_group_name(&mut self, terminator: char) -> Result<String> {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(c) if c == terminator => {
                    self.bump();
                    break;
                }
                Some(c) if c.is_alphanumeric() || c == '_' => {
                    name.push(c);
                    self.bump();
                }
                _ => return Err(self.err(ErrorKind::InvalidCaptureGroupName(name))),
            }
        }
        if name.is_empty() {
            return Err(self.err(ErrorKind::InvalidCaptureGroupName(name)));
        }
        Ok(name)
    }

    /// `(?ims-ims:...)` (scoped) or `(?ims-ims)` (modifies the remainder of
    /// the enclosing group, including any later alternation branches).
    fn parse_inline_flags(&mut self) -> Result<Ast> {
        let mut add = Flags::NONE;
        let mut remove = Flags::NONE;
        let mut in_remove = false;
        loop {
            match self.peek() {
                Some('-') => {
                    self.bump();
                    in_remove = true;
                }
                Some(':') | Some(')') => break,
                Some(c) => {
                    let f = Flags::from_char(c).ok_or_else(|| self.err(ErrorKind::InvalidFlag(c)))?;
                    self.bump();
                    if in_remove {
                        remove.insert(f);
                    } else {
                        add.insert(f);
                    }
                }
                None => return Err(self.err(ErrorKind::MismatchedParen)),
            }
        }
        match self.peek() {
            Some(':') => {
                self.bump();
                let saved = self.flags;
                self.flags.insert(add);
                self.flags.remove(remove);
                let inner = self.parse_alternate()?;
                self.expect(')')?;
                self.flags = saved;
                Ok(Ast::NonCapture(Box::new(inner)))
            }
            Some(')') => {
                self.bump();
                self.flags.insert(add);
                self.flags.remove(remove);
                Ok(Ast::Empty)
            }
            _ => Err(self.err(ErrorKind::MismatchedParen)),
        }
    }

    // ---- escapes ----

    fn parse_escape(&mut self) -> Result<Ast> {
        let casei = self.flags.contains(Flags::CASE_INSENSITIVE);
        match self.peek() {
            None => Err(self.err(ErrorKind::RuleSyntax("trailing backslash".into()))),
            Some('d') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::Digit, negate: false })
            }
            Some('D') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::Digit, negate: true })
            }
            Some('s') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::Space, negate: false })
            }
            Some('S') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::Space, negate: true })
            }
            Some('w') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::Word, negate: false })
            }
            Some('W') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::Word, negate: true })
            }
            Some('h') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::HorizSpace, negate: false })
            }
            Some('H') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::HorizSpace, negate: true })
            }
            Some('v') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::VertSpace, negate: false })
            }
            Some('V') => {
                self.bump();
                Ok(Ast::StaticClass { class: StaticClass::VertSpace, negate: true })
            }
            Some('R') => {
                self.bump();
                let crlf = Ast::concat(vec![
                    Ast::Literal { c: '\r', casei: false },
                    Ast::Literal { c: '\n', casei: false },
                ]);
                let lone = Ast::StaticClass { class: StaticClass::VertSpace, negate: false };
                Ok(Ast::alternate(vec![crlf, lone]))
            }
            Some('p') => {
                self.bump();
                let (class, negate) = self.parse_property()?;
                Ok(Ast::StaticClass { class, negate })
            }
            Some('P') => {
                self.bump();
                let (class, negate) = self.parse_property()?;
                Ok(Ast::StaticClass { class, negate: !negate })
            }
            Some('b') => {
                self.bump();
                Ok(Ast::WordBoundary)
            }
            Some('B') => {
                self.bump();
                Ok(Ast::NotWordBoundary)
            }
            Some('A') => {
                self.bump();
                Ok(Ast::StartText)
            }
            Some('Z') => {
                self.bump();
                Ok(Ast::EndInputOptionalTerminator)
            }
            Some('z') => {
                self.bump();
                Ok(Ast::EndInputOnly)
            }
            Some('G') => {
                self.bump();
                Ok(Ast::PrevMatchEnd)
            }
            Some('k') => {
                self.bump();
                self.expect('<')?;
                let name = self.parse_group_name('>')?;
                let index = *self
                    .named_groups
                    .get(&name)
                    .ok_or_else(|| self.err(ErrorKind::InvalidCaptureGroupName(name.clone())))?;
                Ok(Ast::BackRef { index, casei })
            }
            Some(c) if c.is_ascii_digit() && c != '0' => {
                let mut digits = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let index = digits.parse::<u32>().map_err(|_| self.err(ErrorKind::NumberTooBig))?;
                Ok(Ast::BackRef { index, casei })
            }
            _ => {
                let c = self.parse_escaped_char()?;
                Ok(Ast::Literal { c, casei })
            }
        }
    }

    fn parse_property(&mut self) -> Result<(StaticClass, bool)> {
        if self.peek() == Some('{') {
            self.bump();
            let mut negate = false;
            if self.peek() == Some('^') {
                self.bump();
                negate = true;
            }
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if c == '}' {
                    break;
                }
                name.push(c);
                self.bump();
            }
            self.expect('}')?;
            let class = StaticClass::from_name(name.trim())
                .ok_or_else(|| self.err(ErrorKind::PropertySyntax(name)))?;
            Ok((class, negate))
        } else {
            let c = self
                .bump()
                .ok_or_else(|| self.err(ErrorKind::PropertySyntax("missing property name".into())))?;
            let class = StaticClass::from_name(&c.to_string())
                .ok_or_else(|| self.err(ErrorKind::PropertySyntax(c.to_string())))?;
            Ok((class, false))
        }
    }

    /// A single-character `\`-escape: control/hex/unicode/octal escapes,
    /// the short literal escapes (`\n`, `\t`, ...), or an escaped
    /// punctuation character taken literally.
    fn parse_escaped_char(&mut self) -> Result<char> {
        let c = self
            .peek()
            .ok_or_else(|| self.err(ErrorKind::RuleSyntax("trailing backslash".into())))?;
        match c {
            'a' => {
                self.bump();
                Ok('\u{7}')
            }
            'e' => {
                self.bump();
                Ok('\u{1B}')
            }
            'f' => {
                self.bump();
                Ok('\u{C}')
            }
            'n' => {
                self.bump();
                Ok('\n')
            }
            'r' => {
                self.bump();
                Ok('\r')
            }
            't' => {
                self.bump();
                Ok('\t')
            }
            'c' => {
                self.bump();
                self.parse_control_escape()
            }
            'x' => {
                self.bump();
                self.parse_hex_escape()
            }
            'u' => {
                self.bump();
                self.parse_fixed_hex(4)
            }
            'U' => {
                self.bump();
                self.parse_fixed_hex(8)
            }
            '0' => {
                self.bump();
                self.parse_octal_escape()
            }
            c if c.is_alphanumeric() => {
                if self.flags.contains(Flags::ERROR_ON_UNKNOWN_ESCAPES) {
                    Err(self.err(ErrorKind::BadEscapeSequence(c)))
                } else {
                    self.bump();
                    Ok(c)
                }
            }
            c => {
                self.bump();
                Ok(c)
            }
        }
    }

    fn parse_control_escape(&mut self) -> Result<char> {
        let x = self
            .bump()
            .ok_or_else(|| self.err(ErrorKind::RuleSyntax("incomplete \\c escape".into())))?;
        let v = (x.to_ascii_uppercase() as u32) ^ 0x40;
        char::from_u32(v).ok_or_else(|| self.err(ErrorKind::RuleSyntax("invalid \\c escape".into())))
    }

    fn parse_hex_escape(&mut self) -> Result<char> {
        if self.peek() == Some('{') {
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c == '}' {
                    break;
                }
                if !c.is_ascii_hexdigit() {
                    return Err(self.err(ErrorKind::RuleSyntax("invalid \\x{...} escape".into())));
                }
                digits.push(c);
                self.bump();
            }
            self.expect('}')?;
            let v = u32::from_str_radix(&digits, 16).map_err(|_| self.err(ErrorKind::NumberTooBig))?;
            char::from_u32(v).ok_or_else(|| self.err(ErrorKind::RuleSyntax("code point out of range".into())))
        } else {
            self.parse_fixed_hex(2)
        }
    }

    fn parse_fixed_hex(&mut self, n: usize) -> Result<char> {
        let mut digits = String::new();
        for _ in 0..n {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.bump();
                }
                _ => return Err(self.err(ErrorKind::RuleSyntax("incomplete hex escape".into()))),
            }
        }
        let v = u32::from_str_radix(&digits, 16).map_err(|_| self.err(ErrorKind::NumberTooBig))?;
        char::from_u32(v).ok_or_else(|| self.err(ErrorKind::RuleSyntax("code point out of range".into())))
    }

    fn parse_octal_escape(&mut self) -> Result<char> {
        let mut digits = String::new();
        for _ in 0..3 {
            match self.peek() {
                Some(c) if ('0'..='7').contains(&c) => {
                    digits.push(c);
                    self.bump();
                }
                _ => break,
            }
        }
        let v = if digits.is_empty() { 0 } else { u32::from_str_radix(&digits, 8).unwrap_or(0) };
        char::from_u32(v).ok_or_else(|| self.err(ErrorKind::RuleSyntax("code point out of range".into())))
    }

    // ---- bracket classes ----

    fn parse_class(&mut self) -> Result<Ast> {
        self.bump(); // '['
        let negate = if self.peek() == Some('^') {
            self.bump();
            true
        } else {
            false
        };
        let mut set = self.parse_class_body()?;
        self.expect(']')?;
        if negate {
            set = set.negate();
        }
        if self.flags.contains(Flags::CASE_INSENSITIVE) {
            set = set.case_fold();
        }
        Ok(Ast::Class(set))
    }

    fn parse_class_body(&mut self) -> Result<ClassSet> {
        let mut result = ClassSet::new();
        let mut first = true;
        let mut pending = BracketOp::Union;
        loop {
            match self.peek() {
                None => return Err(self.err(ErrorKind::MissingCloseBracket)),
                Some(']') if !first => break,
                Some('&') if self.peek_at(1) == Some('&') => {
                    self.bump();
                    self.bump();
                    pending = BracketOp::Intersect;
                    continue;
                }
                Some('-') if self.peek_at(1) == Some('-') && !first => {
                    self.bump();
                    self.bump();
                    pending = BracketOp::Difference;
                    continue;
                }
                _ => {
                    let piece = self.parse_class_piece(first)?;
                    result = match pending {
                        BracketOp::Union => result.union(&piece),
                        BracketOp::Intersect => result.intersection(&piece),
                        BracketOp::Difference => result.difference(&piece),
                    };
                    pending = BracketOp::Union;
                    first = false;
                }
            }
        }
        Ok(result)
    }

    fn parse_class_piece(&mut self, first: bool) -> Result<ClassSet> {
        if first && self.peek() == Some(']') {
            self.bump();
            return self.maybe_range(']');
        }
        match self.peek() {
            Some('[') if self.peek_at(1) == Some(':') => self.parse_posix_class(),
            Some('[') => {
                self.bump();
                let inner_negate = if self.peek() == Some('^') {
                    self.bump();
                    true
                } else {
                    false
                };
                let mut inner = self.parse_class_body()?;
                self.expect(']')?;
                if inner_negate {
                    inner = inner.negate();
                }
                Ok(inner)
            }
            Some('\\') => {
                self.bump();
                self.parse_class_escape()
            }
            Some(c) => {
                self.bump();
                self.maybe_range(c)
            }
            None => Err(self.err(ErrorKind::MissingCloseBracket)),
        }
    }

    fn parse_posix_class(&mut self) -> Result<ClassSet> {
        self.bump(); // '['
        self.bump(); // ':'
        let negate = if self.peek() == Some('^') {
            self.bump();
            true
        } else {
            false
        };
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            name.push(c);
            self.bump();
        }
        self.expect(':')?;
        self.expect(']')?;
        let class = StaticClass::from_name(&posix_alias(&name))
            .ok_or_else(|| self.err(ErrorKind::PropertySyntax(name)))?;
        Ok(unicode::materialize(class, negate))
    }

    fn parse_class_escape(&mut self) -> Result<ClassSet> {
        match self.peek() {
            Some('d') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::Digit, false))
            }
            Some('D') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::Digit, true))
            }
            Some('s') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::Space, false))
            }
            Some('S') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::Space, true))
            }
            Some('w') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::Word, false))
            }
            Some('W') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::Word, true))
            }
            Some('h') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::HorizSpace, false))
            }
            Some('H') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::HorizSpace, true))
            }
            Some('v') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::VertSpace, false))
            }
            Some('V') => {
                self.bump();
                Ok(unicode::materialize(StaticClass::VertSpace, true))
            }
            Some('p') => {
                self.bump();
                let (class, negate) = self.parse_property()?;
                Ok(unicode::materialize(class, negate))
            }
            Some('P') => {
                self.bump();
                let (class, negate) = self.parse_property()?;
                Ok(unicode::materialize(class, !negate))
            }
            _ => {
                let lo = self.parse_escaped_char()?;
                self.maybe_range(lo)
            }
        }
    }

    fn maybe_range(&mut self, lo: char) -> Result<ClassSet> {
        if self.peek() != Some('-') {
            return Ok(ClassSet::single(lo));
        }
        if self.peek_at(1) == Some('-') || matches!(self.peek_at(1), None | Some(']')) {
            return Ok(ClassSet::single(lo));
        }
        self.bump(); // '-'
        let hi = self.parse_class_endpoint()?;
        if (hi as u32) < (lo as u32) {
            return Err(self.err(ErrorKind::InvalidRange));
        }
        Ok(ClassSet::from_range(lo, hi))
    }

    fn parse_class_endpoint(&mut self) -> Result<char> {
        match self.peek() {
            Some('\\') => {
                self.bump();
                self.parse_escaped_char()
            }
            Some(c) => {
                self.bump();
                Ok(c)
            }
            None => Err(self.err(ErrorKind::MissingCloseBracket)),
        }
    }
}

fn parse_bounded_number(s: &str) -> Option<u32> {
    let v: u64 = s.parse().ok()?;
    if v > MAX_NUMBER as u64 {
        None
    } else {
        Some(v as u32)
    }
}

fn posix_alias(name: &str) -> String {
    match name {
        "alpha" => "Alpha",
        "digit" => "Digit",
        "alnum" => "Alnum",
        "upper" => "Upper",
        "lower" => "Lower",
        "punct" => "Punct",
        "cntrl" => "Control",
        "space" => "Space",
        "word" => "Word",
        "ascii" => "ASCII",
        other => other,
    }
    .to_string()
}

fn validate_backrefs(ast: &Ast, group_count: u32) -> Result<()> {
    match ast {
        Ast::BackRef { index, .. } => {
            if *index == 0 || *index > group_count {
                Err(Error::new(ErrorKind::InvalidBackRef))
            } else {
                Ok(())
            }
        }
        Ast::Concat(parts) | Ast::Alternate(parts) => {
            for p in parts {
                validate_backrefs(p, group_count)?;
            }
            Ok(())
        }
        Ast::Capture { inner, .. }
        | Ast::NonCapture(inner)
        | Ast::Atomic(inner)
        | Ast::Look { inner, .. }
        | Ast::Repeat { inner, .. } => validate_backrefs(inner, group_count),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(pattern: &str) -> ParsedPattern {
        parse(pattern, Flags::NONE).unwrap_or_else(|e| panic!("{}: {}", pattern, e))
    }

    #[test]
    fn literal_concat() {
        let p = parse_ok("abc");
        match p.ast {
            Ast::Concat(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn alternation_branches() {
        let p = parse_ok("cat|dog");
        match p.ast {
            Ast::Alternate(branches) => assert_eq!(branches.len(), 2),
            other => panic!("expected Alternate, got {:?}", other),
        }
    }

    #[test]
    fn capture_group_numbering() {
        let p = parse_ok("(a)(b(c))");
        assert_eq!(p.group_count, 3);
    }

    #[test]
    fn named_group_registered() {
        let p = parse_ok("(?<year>\\d{4})-(?<month>\\d{2})");
        assert_eq!(p.named_groups.get("year"), Some(&1));
        assert_eq!(p.named_groups.get("month"), Some(&2));
    }

    #[test]
    fn quantifier_interval() {
        let p = parse_ok("a{2,4}");
        match p.ast {
            Ast::Repeat { min, max, .. } => {
                assert_eq!(min, 2);
                assert_eq!(max, Some(4));
            }
            other => panic!("expected Repeat, got {:?}", other),
        }
    }

    #[test]
    fn dangling_quantifier_is_error() {
        assert!(parse("*a", Flags::NONE).is_err());
    }

    #[test]
    fn invalid_interval_falls_back_to_literal() {
        let p = parse_ok("a{z}");
        match p.ast {
            Ast::Concat(parts) => assert_eq!(parts.len(), 4), // a { z }
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn unknown_backref_rejected() {
        assert!(matches!(parse("(a)\\2", Flags::NONE), Err(e) if *e.kind() == ErrorKind::InvalidBackRef));
    }

    #[test]
    fn atomic_group_and_possessive_quantifier() {
        let p = parse_ok("(?>a+)b*+");
        match p.ast {
            Ast::Concat(parts) => {
                assert!(matches!(parts[0], Ast::Atomic(_)));
                match &parts[1] {
                    Ast::Repeat { possessive, .. } => assert!(*possessive),
                    other => panic!("expected Repeat, got {:?}", other),
                }
            }
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn inline_flag_rest_of_group() {
        let p = parse_ok("(?i)ABC");
        match p.ast {
            Ast::Concat(parts) => {
                for part in &parts[1..] {
                    match part {
                        Ast::Literal { casei, .. } => assert!(*casei),
                        other => panic!("expected Literal, got {:?}", other),
                    }
                }
            }
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn class_union_range_and_escape() {
        let p = parse_ok("[a-c\\d]");
        match p.ast {
            Ast::Class(set) => {
                assert!(set.matches('b'));
                assert!(set.matches('5'));
                assert!(!set.matches('z'));
            }
            other => panic!("expected Class, got {:?}", other),
        }
    }

    #[test]
    fn class_difference_operator() {
        let p = parse_ok("[a-z--[aeiou]]");
        match p.ast {
            Ast::Class(set) => {
                assert!(set.matches('b'));
                assert!(!set.matches('a'));
            }
            other => panic!("expected Class, got {:?}", other),
        }
    }

    #[test]
    fn missing_close_bracket_is_error() {
        assert!(parse("[abc", Flags::NONE).is_err());
    }

    #[test]
    fn lookaround_and_backref() {
        let p = parse_ok("(?<=foo)(\\w+)\\1");
        match p.ast {
            Ast::Concat(parts) => {
                assert!(matches!(parts[0], Ast::Look { behind: true, negate: false, .. }));
                assert!(matches!(parts[2], Ast::BackRef { index: 1, .. }));
            }
            other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn unknown_escape_is_literal_by_default() {
        let p = parse("\\q", Flags::NONE).unwrap();
        assert!(matches!(p.ast, Ast::Literal { c: 'q', .. }));
    }

    #[test]
    fn unknown_escape_errors_under_error_on_unknown_escapes() {
        let err = parse("\\q", Flags::ERROR_ON_UNKNOWN_ESCAPES).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::BadEscapeSequence('q')));
    }

    #[test]
    fn octal_escape_reads_three_digits() {
        // \0101 is octal 0101 = 65 = 'A'; reading only 2 digits (the old
        // bound) would instead stop at octal 010 = 8 and leave a literal
        // '1' behind.
        let p = parse_ok("\\0101");
        assert!(matches!(p.ast, Ast::Literal { c: 'A', .. }));
    }

    #[test]
    fn octal_escape_stops_at_three_digits() {
        // \01234: three octal digits consumed ("123" = octal 0123 = 83 =
        // 'S'), the fourth and fifth digits are literal text.
        let p = parse_ok("\\01234");
        match p.ast {
            Ast::Concat(parts) => {
                assert!(matches!(parts[0], Ast::Literal { c: 'S', .. }));
                assert!(matches!(parts[1], Ast::Literal { c: '4', .. }));
            }
            other => panic!("expected Concat, got {:?}", other),
        }
    }
}
