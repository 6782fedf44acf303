use crate::arena::AllocError;
use crate::grammar::{ByteSet, NodeId};
use crate::util::Code;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Write};

#[derive(Debug, Clone)]
/// An error returned when a grammar cannot be compiled for the requested backend.
///
/// A failed compile never changes the parser; the previously attached backend, if any,
/// stays in place.
pub enum CompileError {
    /// Two productions of the named rule cannot be told apart with `k` bytes of lookahead.
    NotLlk { rule: String, k: usize },
    /// The ACTION table of the LALR(1) backend holds two moves for one cell.
    Ambiguous { state: usize, conflict: String },
    /// An [Indirect](crate::grammar::GrammarNode::Indirect) node was never bound.
    UnboundIndirect { node: NodeId },
    /// A zero-width lookahead node reached a backend that only accepts context-free grammars.
    PegOnlyConstruct { node: NodeId, backend: &'static str },
    /// The regular backend was asked to compile a recursive grammar.
    NotRegular { node: NodeId },
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::NotLlk { rule, k } => {
                write!(
                    f,
                    "GrammarError: productions of '{}' overlap within {} byte(s) of lookahead.",
                    rule, k
                )
            }
            CompileError::Ambiguous { state, conflict } => {
                write!(
                    f,
                    "GrammarError: conflict in state {}. {}",
                    state, conflict
                )
            }
            CompileError::UnboundIndirect { node } => {
                write!(f, "GrammarError: indirect node {:?} is not bound.", node)
            }
            CompileError::PegOnlyConstruct { node, backend } => {
                write!(
                    f,
                    "GrammarError: lookahead node {:?} cannot be expressed in the {} backend.",
                    node, backend
                )
            }
            CompileError::NotRegular { node } => {
                write!(
                    f,
                    "GrammarError: node {:?} is recursive; the regular backend accepts recursion-free grammars only.",
                    node
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// One terminal the parser would have accepted at the failure position.
pub enum Expected {
    End,
    Anything,
    Literal(Vec<u8>),
    Class(ByteSet),
}

impl Display for Expected {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::End => write!(f, "end of input"),
            Expected::Anything => write!(f, "any byte"),
            Expected::Literal(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Expected::Class(set) => write!(f, "{}", set),
        }
    }
}

#[derive(Debug, Clone)]
/// An error returned when the parser failed to consume the input.
pub enum ParseError {
    /// No derivation matched. `expected` lists the terminals acceptable at `position`.
    Failed {
        position: usize,
        expected: BTreeSet<Expected>,
    },
    /// A unique result was demanded from the GLR backend but several trees survived.
    AmbiguousParse { count: usize },
    /// The arena of the parse call refused an allocation; the parse was abandoned wholesale.
    AllocationFailed(AllocError),
}

impl ParseError {
    pub fn failed(position: usize, expected: BTreeSet<Expected>) -> Self {
        ParseError::Failed { position, expected }
    }

    /// The byte offset the error points at, if the error carries one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Failed { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Compose a message locating the failure in `code`, with the offending
    /// line and a caret under the failure column.
    pub fn describe(&self, code: &Code) -> String {
        let mut message = format!("{}", self);
        if let ParseError::Failed { position, .. } = self {
            let location = code.position_at(*position);
            if location.is_end_of(code) {
                write!(message, "\nUnexpected end of input.").unwrap();
            }
            write!(message, "\nFailed to parse at {}.", location).unwrap();
            let line = code.line_at(*position);
            if !line.is_empty() {
                write!(
                    message,
                    "\n{}\n{:>width$}",
                    String::from_utf8_lossy(line),
                    "^",
                    width = location.column
                )
                .unwrap();
            }
        }
        message
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Failed { position, expected } => {
                write!(f, "SyntaxError: unexpected input at offset {}.", position)?;
                if !expected.is_empty() {
                    write!(f, " Expected ")?;
                    for (index, e) in expected.iter().enumerate() {
                        if index != 0 {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", e)?;
                    }
                    write!(f, ".")?;
                }
                Ok(())
            }
            ParseError::AmbiguousParse { count } => {
                write!(
                    f,
                    "SyntaxError: {} parse trees survived where a unique result was demanded.",
                    count
                )
            }
            ParseError::AllocationFailed(err) => write!(f, "{}", err),
        }
    }
}

impl From<AllocError> for ParseError {
    fn from(err: AllocError) -> Self {
        ParseError::AllocationFailed(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Returned by a semantic action or an attribute predicate to turn the
/// enclosing match into a parse failure.
pub struct Rejected;
