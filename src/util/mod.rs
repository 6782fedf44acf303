mod code;
mod logger;
mod position;
use once_cell::unsync::OnceCell;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// A byte offset of the input resolved to its human readable location.
///
/// Backends, [ParseTree](crate::ParseTree) ranges and failure reports all
/// count in byte offsets; lines and columns exist only for presentation, so
/// a position keeps the offset it was resolved from alongside the one based
/// line and column.
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// The input buffer of a parse call.
///
/// Parsing itself is pure byte-offset arithmetic over `value`; the line index
/// is built lazily the first time a failure or a log line has to be rendered,
/// so successful parses never pay for it.
pub struct Code<'c> {
    pub value: &'c [u8],
    line_starts: OnceCell<Vec<usize>>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// A enum structure to assign multiple level debugging to a parser and its backend.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}
