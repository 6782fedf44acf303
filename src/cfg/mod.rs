//! The normalized sum-of-products grammar the table driven backends compile from.
//!
//! Desugaring rewrites the combinator graph into elementary productions over
//! singleton byte classes, one non-terminal per grammar node, memoized on node
//! identity so shared sub-grammars share non-terminals. NULLABLE, FIRST and
//! FOLLOW are computed over the result by fixed point iteration.

mod analysis;
mod desugar;

#[cfg(test)]
mod __tests__;

use crate::grammar::{ByteSet, NodeId};
use std::fmt::{Display, Formatter};

pub(crate) use analysis::{first_of_sequence, recompute_analyses};
pub(crate) use desugar::{desugar, Augment};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// The identity of a non-terminal of the normalized grammar.
pub struct NtId(pub(crate) usize);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// The identity of a production of the normalized grammar.
pub struct ProdId(pub(crate) usize);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// A terminal of the normalized grammar: a byte class or the end of input mark.
pub enum Term {
    Class(ByteSet),
    Eoi,
}

impl Term {
    /// Whether the terminal accepts the given input symbol, [None] standing for
    /// the exhausted input.
    pub fn matches(&self, byte: Option<u8>) -> bool {
        match (self, byte) {
            (Term::Class(set), Some(byte)) => set.contains(byte),
            (Term::Eoi, None) => true,
            _ => false,
        }
    }

    pub fn intersects(&self, other: &Term) -> bool {
        match (self, other) {
            (Term::Class(a), Term::Class(b)) => a.intersects(b),
            (Term::Eoi, Term::Eoi) => true,
            _ => false,
        }
    }

    pub(crate) fn expected(&self) -> crate::error::Expected {
        match self {
            Term::Class(set) if *set == ByteSet::full() => crate::error::Expected::Anything,
            Term::Class(set) => crate::error::Expected::Class(*set),
            Term::Eoi => crate::error::Expected::End,
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Class(set) => write!(f, "{}", set),
            Term::Eoi => write!(f, "$"),
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Symbol {
    Term(Term),
    Nt(NtId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the value of a completed production is assembled; see
/// [reduce](crate::tree::reduce).
pub(crate) enum ReduceOp {
    /// A terminal leaf rebuilt from the originating node.
    Leaf,
    /// No value.
    Zero,
    /// The single visible child passes through unchanged.
    Forward,
    /// Gather the visible children into a sequence.
    Collect,
    /// The empty repetition.
    RepNil,
    /// A repetition of one.
    RepOne,
    /// Leading items spliced onto the already collected tail.
    RepCons,
    /// Invoke the semantic action of the originating node.
    Action,
    /// Check the attribute predicate of the originating node.
    Attr,
    /// Parse but hide the child.
    Discard,
}

#[derive(Clone)]
pub struct Production {
    pub lhs: NtId,
    pub rhs: Vec<Symbol>,
    /// The grammar node this production was desugared from.
    pub(crate) origin: NodeId,
    pub(crate) op: ReduceOp,
}

pub(crate) struct NtInfo {
    pub name: String,
    pub productions: Vec<ProdId>,
    #[allow(dead_code)]
    pub origin: NodeId,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// A set of terminals: a byte class plus the end of input mark.
pub struct TermSet {
    pub(crate) bytes: ByteSet,
    pub(crate) eoi: bool,
}

impl TermSet {
    pub fn empty() -> Self {
        Self {
            bytes: ByteSet::empty(),
            eoi: false,
        }
    }

    /// Every terminal, including the end of input mark.
    pub fn full() -> Self {
        Self {
            bytes: ByteSet::full(),
            eoi: true,
        }
    }

    pub fn insert(&mut self, term: &Term) -> bool {
        match term {
            Term::Class(set) => self.bytes.union_with(set),
            Term::Eoi => {
                let grew = !self.eoi;
                self.eoi = true;
                grew
            }
        }
    }

    pub fn union_with(&mut self, other: &TermSet) -> bool {
        let mut grew = self.bytes.union_with(&other.bytes);
        if other.eoi && !self.eoi {
            self.eoi = true;
            grew = true;
        }
        grew
    }

    pub fn contains(&self, byte: Option<u8>) -> bool {
        match byte {
            Some(byte) => self.bytes.contains(byte),
            None => self.eoi,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && !self.eoi
    }
}

impl Display for TermSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bytes)?;
        if self.eoi {
            write!(f, "$")?;
        }
        Ok(())
    }
}

/// The normalized context-free grammar, kept on the parser after a table
/// driven compile for introspection.
pub struct Cfg {
    pub(crate) nonterminals: Vec<NtInfo>,
    pub(crate) productions: Vec<Production>,
    pub(crate) start: NtId,
    pub(crate) nullable: Vec<bool>,
    pub(crate) first: Vec<TermSet>,
    pub(crate) follow: Vec<TermSet>,
}

impl Cfg {
    pub fn nonterminal_count(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    /// The augmented start symbol.
    pub fn start(&self) -> NtId {
        self.start
    }

    pub fn name(&self, nt: NtId) -> &str {
        &self.nonterminals[nt.0].name
    }

    pub fn is_nullable(&self, nt: NtId) -> bool {
        self.nullable[nt.0]
    }

    pub fn first(&self, nt: NtId) -> &TermSet {
        &self.first[nt.0]
    }

    pub fn follow(&self, nt: NtId) -> &TermSet {
        &self.follow[nt.0]
    }

    pub(crate) fn production(&self, prod: ProdId) -> &Production {
        &self.productions[prod.0]
    }

    pub(crate) fn productions_of(&self, nt: NtId) -> impl Iterator<Item = ProdId> + '_ {
        self.nonterminals[nt.0].productions.iter().copied()
    }

    pub(crate) fn display_symbols(&self, symbols: &[Symbol]) -> String {
        if symbols.is_empty() {
            return "ε".to_string();
        }
        symbols
            .iter()
            .map(|symbol| match symbol {
                Symbol::Term(term) => format!("{}", term),
                Symbol::Nt(nt) => self.name(*nt).to_string(),
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    pub(crate) fn display_production(&self, prod: ProdId) -> String {
        let production = self.production(prod);
        format!(
            "{} : {}",
            self.name(production.lhs),
            self.display_symbols(&production.rhs)
        )
    }

    /// An LR item rendered for conflict reports.
    pub(crate) fn display_item(&self, prod: ProdId, dot: usize) -> String {
        let production = self.production(prod);
        let before = self.display_symbols(&production.rhs[..dot]);
        let after = self.display_symbols(&production.rhs[dot..]);
        format!("{} : {} · {}", self.name(production.lhs), before, after)
    }
}

impl Display for Cfg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for nt in &self.nonterminals {
            writeln!(f, "{}", nt.name)?;
            if nt.productions.is_empty() {
                writeln!(f, "{:>6} <no production>", ":")?;
            }
            for (index, prod) in nt.productions.iter().enumerate() {
                let gutter = if index == 0 { ":" } else { "|" };
                writeln!(
                    f,
                    "{:>6} {}",
                    gutter,
                    self.display_symbols(&self.production(*prod).rhs)
                )?;
            }
            writeln!(f, "{:>6}", ";")?;
            writeln!(f)?;
        }
        Ok(())
    }
}
