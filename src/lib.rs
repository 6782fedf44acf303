//! Polygram is a parser combinator library whose grammars run on
//! interchangeable parsing backends.
//!
//! # Overview
//! A grammar is a graph of small recognizers (literals, byte classes,
//! concatenations, alternations, repetitions and semantic actions) composed
//! through a [GrammarBuilder] and frozen into a [Parser]. The same graph can
//! then be executed by several algorithms: the memoizing packrat recognizer,
//! a predictive LL(k) table parser, an LALR(1) shift/reduce parser, or a
//! generalized LR parser for ambiguous grammars. Each backend trades
//! expressive power against predictability, so the grammar class and the
//! latency budget pick the backend, not the grammar notation.
//!
//! # Design
//! The packrat backend interprets the combinator graph directly, with
//! memoization and left recursion seeding. The table driven backends first
//! desugar the graph into a normalized sum-of-products grammar over byte
//! classes, run the NULLABLE/FIRST/FOLLOW analyses, and build their tables
//! from it; the normalized grammar stays available for introspection through
//! [Parser::cfg] and [Parser::grammar]. Whatever the backend, a successful
//! parse returns the same [ParseTree] shapes, so switching backends does not
//! change downstream code.
//!
//! Every parse call works out of an [Arena]: the memo table, the graph
//! structured stack and the other per call state are accounted against it,
//! and an arena quota turns a runaway parse into a clean
//! [ParseError::AllocationFailed].
//!
//! # Example
//! ```
//! use polygram::{BackendId, CompileOptions, GrammarBuilder, Parser};
//!
//! let mut g = GrammarBuilder::new();
//! let digit = g.class("0-9").unwrap();
//! let number = g.many1(digit);
//! let plus = g.token("+");
//! let hidden_plus = g.ignore(plus);
//! let sum = g.sequence(vec![number, hidden_plus, number]);
//! let sum = g.label(sum, "sum");
//!
//! let mut parser = Parser::new(g, sum).unwrap();
//! parser
//!     .compile(BackendId::Lalr, CompileOptions::default())
//!     .unwrap();
//!
//! let tree = parser.parse(b"12+34").unwrap();
//! assert_eq!((tree.start, tree.end), (0, 5));
//! assert_eq!(tree.children().len(), 2);
//!
//! // The packrat backend accepts the same grammar and returns the same tree.
//! let packrat = tree;
//! let mut g2 = GrammarBuilder::new();
//! let digit = g2.class("0-9").unwrap();
//! let number = g2.many1(digit);
//! let plus = g2.token("+");
//! let hidden_plus = g2.ignore(plus);
//! let sum = g2.sequence(vec![number, hidden_plus, number]);
//! let parser2 = Parser::new(g2, sum).unwrap();
//! assert!(parser2.parse(b"12+34").unwrap().structural_eq(&packrat));
//! ```
//!
//! # Backends
//! | Backend | Grammar class | Notes |
//! |---|---|---|
//! | [BackendId::Packrat] | PEG | Ordered choice, unlimited lookahead, left recursion seeding. The default. |
//! | [BackendId::Regular] | recursion free | Contract slot, parses through the LALR machinery. |
//! | [BackendId::Llk] | LL(k) | Predictive, `k` bytes of lookahead. |
//! | [BackendId::Lalr] | LALR(1) | Conflicts are compile errors. |
//! | [BackendId::Glr] | any CFG | Forest output for ambiguous grammars. |

mod arena;
mod backend;
mod cfg;
mod error;
pub mod examples;
mod grammar;
mod parser;
mod tree;
mod util;

pub use arena::{AllocError, Arena};
pub use backend::{BackendId, CompileOptions};
pub use cfg::{Cfg, NtId, ProdId, Production, Symbol, Term, TermSet};
pub use error::{CompileError, Expected, ParseError, Rejected};
pub use grammar::{
    AttributePredicate, ByteSet, Grammar, GrammarBuilder, GrammarNode, NodeId, SemanticAction,
};
pub use parser::Parser;
pub use tree::{ParseTree, TreeValue};
pub use util::{Code, Log, Position};
