// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The unified error model: compile-time parse failures (with source
//! position) and runtime failures raised while a `Matcher` is executing.

use std::error;
use std::fmt;

/// A single crate-wide error, wrapping an [`ErrorKind`] with the source
/// position for compile errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    line: usize,
    column: usize,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error { kind, line: 0, column: 0 }
    }

    pub(crate) fn at(kind: ErrorKind, line: usize, column: usize) -> Error {
        Error { kind, line, column }
    }

    /// The kind of failure.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The 1-based source line of a compile error. Always `0` for runtime
    /// errors, which have no associated source position.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based source column of a compile error. Always `0` for runtime
    /// errors.
    pub fn column(&self) -> usize {
        self.column
    }

    /// True if this error originated during pattern compilation.
    pub fn is_compile_error(&self) -> bool {
        self.kind.is_compile_error()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_compile_error() && (self.line > 0 || self.column > 0) {
            write!(f, "{} (line {}, column {})", self.kind, self.line, self.column)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl error::Error for Error {}

/// The set of distinct failure kinds a [`Pattern`](crate::Pattern) compile
/// or a [`Matcher`](crate::Matcher) operation can raise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // --- compile-time ---
    /// A malformed construct that isn't more specifically diagnosed below:
    /// a dangling quantifier, an empty alternative branch where one is
    /// required, etc.
    RuleSyntax(String),
    /// An unrecognized `\`-escape under `ERROR_ON_UNKNOWN_ESCAPES`.
    BadEscapeSequence(char),
    /// A malformed `\p{...}`/`\P{...}` property expression.
    PropertySyntax(String),
    /// A construct this compiler recognizes but does not implement.
    Unimplemented(&'static str),
    /// Unbalanced `(`/`)`.
    MismatchedParen,
    /// A numeric literal (quantifier bound, `\x{...}`, etc.) exceeds the
    /// implementation cap.
    NumberTooBig,
    /// A malformed `{n,m}` interval.
    BadInterval,
    /// `{n,m}` with `n > m`.
    MaxLtMin,
    /// A back-reference to a group number that does not exist.
    InvalidBackRef,
    /// An unknown inline flag character.
    InvalidFlag(char),
    /// A look-behind whose length the compiler cannot bound.
    LookBehindLimit,
    /// A `[...]` class contains a multi-character string member where that
    /// is not permitted.
    SetContainsString,
    /// `[...]` with no closing `]`.
    MissingCloseBracket,
    /// A malformed or inverted range, e.g. `[z-a]`.
    InvalidRange,
    /// The compiled program would exceed the configured size limit.
    PatternTooBig,
    /// `${name}` or `(?<name>...)` names a group that isn't declared, or
    /// the name itself is not a valid identifier.
    InvalidCaptureGroupName(String),

    // --- runtime ---
    /// A capture/group query was made without a preceding successful match.
    InvalidState,
    /// The backtracking stack exceeded its configured byte limit.
    StackOverflow,
    /// The match-step budget (`time_limit`) was exceeded.
    TimeOut,
    /// A match or find-progress callback returned `false`.
    StoppedByCaller,
    /// A position argument was out of `[0, length]`.
    IndexOutOfRange,
    /// A negative limit (time or stack) was supplied.
    IllegalArgument(&'static str),
}

impl ErrorKind {
    /// True for every variant raised while compiling a pattern; false for
    /// every variant raised while executing a `Matcher`.
    pub fn is_compile_error(&self) -> bool {
        use ErrorKind::*;
        matches!(
            self,
            RuleSyntax(_)
                | BadEscapeSequence(_)
                | PropertySyntax(_)
                | Unimplemented(_)
                | MismatchedParen
                | NumberTooBig
                | BadInterval
                | MaxLtMin
                | InvalidBackRef
                | InvalidFlag(_)
                | LookBehindLimit
                | SetContainsString
                | MissingCloseBracket
                | InvalidRange
                | PatternTooBig
                | InvalidCaptureGroupName(_)
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        match self {
            RuleSyntax(msg) => write!(f, "syntax error: {}", msg),
            BadEscapeSequence(c) => write!(f, "unrecognized escape sequence '\\{}'", c),
            PropertySyntax(msg) => write!(f, "malformed \\p{{...}} property: {}", msg),
            Unimplemented(what) => write!(f, "unimplemented: {}", what),
            MismatchedParen => write!(f, "unbalanced parenthesis"),
            NumberTooBig => write!(f, "number too big"),
            BadInterval => write!(f, "malformed {{n,m}} interval"),
            MaxLtMin => write!(f, "{{n,m}} quantifier has max less than min"),
            InvalidBackRef => write!(f, "invalid back-reference"),
            InvalidFlag(c) => write!(f, "invalid inline flag '{}'", c),
            LookBehindLimit => write!(f, "look-behind group does not have a bounded maximum length"),
            SetContainsString => write!(f, "set contains a multi-character string member"),
            MissingCloseBracket => write!(f, "missing closing ']'"),
            InvalidRange => write!(f, "invalid character range"),
            PatternTooBig => write!(f, "compiled pattern exceeds the size limit"),
            InvalidCaptureGroupName(name) => {
                write!(f, "invalid or undeclared capture group name '{}'", name)
            }
            InvalidState => write!(f, "no match available for this query"),
            StackOverflow => write!(f, "backtracking stack exceeded its limit"),
            TimeOut => write!(f, "match exceeded its time limit"),
            StoppedByCaller => write!(f, "match callback requested early stop"),
            IndexOutOfRange => write!(f, "position is out of range"),
            IllegalArgument(what) => write!(f, "illegal argument: {}", what),
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;
