//! The backend framework: one stable identifier per parsing algorithm,
//! dispatched through a fixed registry initialized at load time.

mod glr;
mod lalr;
mod llk;
mod packrat;

#[cfg(test)]
mod __tests__;

use crate::arena::Arena;
use crate::cfg::Cfg;
use crate::error::{CompileError, ParseError};
use crate::grammar::{Grammar, NodeId};
use crate::tree::ParseTree;
use crate::util::{Code, Log};
use std::fmt::{Display, Formatter};

pub(crate) use glr::GlrBackend;
pub(crate) use lalr::{LalrBackend, LrTables};
pub(crate) use llk::{LlTables, LlkBackend};
pub(crate) use packrat::PackratBackend;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[repr(usize)]
/// The parsing algorithms a grammar can be compiled for.
///
/// The numeric values are stable across releases; they index the dispatch
/// registry directly.
pub enum BackendId {
    /// Memoized recursive descent over the combinator graph. The default.
    Packrat = 0,
    /// Contract-only performance slot; accepts recursion-free grammars and
    /// runs them through the LALR(1) machinery.
    Regular = 1,
    /// Predictive parser with `k` bytes of lookahead.
    Llk = 2,
    Lalr = 3,
    Glr = 4,
}

impl BackendId {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<BackendId> {
        match index {
            0 => Some(BackendId::Packrat),
            1 => Some(BackendId::Regular),
            2 => Some(BackendId::Llk),
            3 => Some(BackendId::Lalr),
            4 => Some(BackendId::Glr),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        registry(self).name()
    }
}

impl Display for BackendId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy)]
/// Options forwarded to [Parser::compile](crate::Parser::compile).
pub struct CompileOptions {
    /// Lookahead depth of the LL(k) backend.
    pub lookahead: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { lookahead: 1 }
    }
}

/// The backend state a compile attaches to a parser. Replaced wholesale by a
/// repeated compile; dropped with the parser.
pub(crate) struct Compiled {
    pub backend: BackendId,
    pub start: NodeId,
    /// The normalized grammar, kept for introspection by table driven backends.
    pub cfg: Option<Cfg>,
    pub tables: Tables,
}

pub(crate) enum Tables {
    Packrat,
    Ll(LlTables),
    Lr(LrTables),
}

impl Compiled {
    /// The state a parser with no compiled backend falls back to.
    pub(crate) fn packrat_default(start: NodeId) -> Self {
        Compiled {
            backend: BackendId::Packrat,
            start,
            cfg: None,
            tables: Tables::Packrat,
        }
    }
}

pub(crate) trait Backend: Sync {
    fn name(&self) -> &'static str;

    fn compile(
        &self,
        grammar: &Grammar,
        start: NodeId,
        options: &CompileOptions,
    ) -> Result<Compiled, CompileError>;

    /// Run the compiled grammar over `code`. Deterministic backends return a
    /// single tree; the GLR backend returns the surviving forest.
    fn parse(
        &self,
        grammar: &Grammar,
        compiled: &Compiled,
        code: &Code,
        arena: &Arena,
        log: Log<&'static str>,
    ) -> Result<Vec<ParseTree>, ParseError>;
}

/// The process wide dispatch table, indexed by [BackendId]. Initialized from
/// this compile time list and never mutated.
static REGISTRY: [&dyn Backend; 5] = [
    &PackratBackend,
    &RegularBackend,
    &LlkBackend,
    &LalrBackend,
    &GlrBackend,
];

pub(crate) fn registry(id: BackendId) -> &'static dyn Backend {
    REGISTRY[id.index()]
}

/// The regular backend slot. The algorithms of a dedicated automaton are left
/// to a future specialization; the contract (accept recursion free grammars,
/// parse them deterministically) is honored by checking for recursion and
/// reusing the LALR(1) machinery, which subsumes it.
pub(crate) struct RegularBackend;

impl Backend for RegularBackend {
    fn name(&self) -> &'static str {
        "regular"
    }

    fn compile(
        &self,
        grammar: &Grammar,
        start: NodeId,
        options: &CompileOptions,
    ) -> Result<Compiled, CompileError> {
        if let Some(node) = find_recursion(grammar, start) {
            return Err(CompileError::NotRegular { node });
        }
        let mut compiled = LalrBackend.compile(grammar, start, options)?;
        compiled.backend = BackendId::Regular;
        Ok(compiled)
    }

    fn parse(
        &self,
        grammar: &Grammar,
        compiled: &Compiled,
        code: &Code,
        arena: &Arena,
        log: Log<&'static str>,
    ) -> Result<Vec<ParseTree>, ParseError> {
        LalrBackend.parse(grammar, compiled, code, arena, log)
    }
}

/// Depth first search for a cycle among the nodes reachable from `start`.
fn find_recursion(grammar: &Grammar, start: NodeId) -> Option<NodeId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        grammar: &Grammar,
        id: NodeId,
        marks: &mut std::collections::HashMap<NodeId, Mark>,
    ) -> Option<NodeId> {
        let id = grammar.resolve(id);
        match marks.get(&id) {
            Some(Mark::Visiting) => return Some(id),
            Some(Mark::Done) => return None,
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        for child in grammar.node(id).children() {
            if let Some(found) = visit(grammar, child, marks) {
                return Some(found);
            }
        }
        marks.insert(id, Mark::Done);
        None
    }

    let mut marks = std::collections::HashMap::new();
    visit(grammar, start, &mut marks)
}

#[cfg(debug_assertions)]
pub(crate) fn log_entry(log: Log<&'static str>, backend: &'static str) {
    if log.order() >= Log::Verbose(()).order() {
        println!("[{}; {}]: starting parse.", log, backend);
    }
}

#[cfg(not(debug_assertions))]
pub(crate) fn log_entry(_: Log<&'static str>, _: &'static str) {}

#[cfg(debug_assertions)]
pub(crate) fn log_result(
    log: Log<&'static str>,
    backend: &'static str,
    code: &Code,
    result: &Result<Vec<ParseTree>, ParseError>,
) {
    match result {
        Ok(forest) => {
            if log.order() >= Log::Success(()).order() {
                let end = forest.iter().map(|tree| tree.end).max().unwrap_or(0);
                println!(
                    "[{}; {}]: success, consumed up to {}.",
                    log,
                    backend,
                    code.position_at(end)
                );
            }
        }
        Err(err) => {
            if log.order() >= Log::Result(()).order() {
                println!("[{}; {}]: {}", log, backend, err.describe(code));
            }
        }
    }
}

#[cfg(not(debug_assertions))]
pub(crate) fn log_result(
    _: Log<&'static str>,
    _: &'static str,
    _: &Code,
    _: &Result<Vec<ParseTree>, ParseError>,
) {
}
