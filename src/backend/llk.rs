//! Predictive table parser with `k` byte lookahead.
//!
//! Compile computes FIRSTk and FOLLOWk as sets of terminal strings of length
//! at most `k` and derives, per production, the lookahead strings that select
//! it. Two productions of one non-terminal whose lookahead strings can match
//! a common input make the grammar not LL(k).

use super::{log_entry, log_result, Backend, BackendId, Compiled, CompileOptions, Tables};
use crate::arena::Arena;
use crate::cfg::{desugar, Augment, Cfg, NtId, ProdId, Symbol, Term};
use crate::error::{CompileError, Expected, ParseError};
use crate::grammar::{Grammar, NodeId};
use crate::tree::{reduce, ParseTree};
use crate::util::{Code, Log};
use std::collections::BTreeSet;

pub(crate) struct LlkBackend;

/// A lookahead string: up to `k` terminals, implicitly padded with the end of
/// input mark when shorter.
type LaString = Vec<Term>;

pub(crate) struct LlTables {
    pub k: usize,
    /// Lookahead strings per production, indexed by [ProdId].
    pub lookahead: Vec<Vec<LaString>>,
}

impl Backend for LlkBackend {
    fn name(&self) -> &'static str {
        "LL(k)"
    }

    fn compile(
        &self,
        grammar: &Grammar,
        start: NodeId,
        options: &CompileOptions,
    ) -> Result<Compiled, CompileError> {
        let cfg = desugar(grammar, start, Augment::Exact, self.name())?;
        let k = options.lookahead.max(1);

        let first_k = compute_first_k(&cfg, k);
        let follow_k = compute_follow_k(&cfg, k, &first_k);

        let mut lookahead: Vec<Vec<LaString>> = Vec::with_capacity(cfg.production_count());
        for index in 0..cfg.production_count() {
            let production = cfg.production(ProdId(index));
            let rhs_first = first_of_symbols(&cfg, &production.rhs, &first_k, k);
            let la = concat_k(&rhs_first, &follow_k[production.lhs.0], k);
            lookahead.push(la.into_iter().collect());
        }

        for nt in 0..cfg.nonterminal_count() {
            let productions: Vec<ProdId> = cfg.productions_of(NtId(nt)).collect();
            for (left_index, left) in productions.iter().enumerate() {
                for right in &productions[left_index + 1..] {
                    let left_la = &lookahead[left.0];
                    let right_la = &lookahead[right.0];
                    let overlap = left_la
                        .iter()
                        .any(|a| right_la.iter().any(|b| strings_overlap(a, b, k)));
                    if overlap {
                        return Err(CompileError::NotLlk {
                            rule: cfg.name(NtId(nt)).to_string(),
                            k,
                        });
                    }
                }
            }
        }

        Ok(Compiled {
            backend: BackendId::Llk,
            start,
            tables: Tables::Ll(LlTables { k, lookahead }),
            cfg: Some(cfg),
        })
    }

    fn parse(
        &self,
        grammar: &Grammar,
        compiled: &Compiled,
        code: &Code,
        _arena: &Arena,
        log: Log<&'static str>,
    ) -> Result<Vec<ParseTree>, ParseError> {
        log_entry(log, self.name());
        let cfg = compiled.cfg.as_ref().expect("Bug! LL parse without a compiled grammar.");
        let tables = match &compiled.tables {
            Tables::Ll(tables) => tables,
            _ => panic!("Bug! LL parse with foreign tables."),
        };
        let result = drive(grammar, cfg, tables, compiled.start, code);
        let result = result.map(|tree| vec![tree]);
        log_result(log, self.name(), code, &result);
        result
    }
}

/// FIRSTk per non-terminal: every terminal string of length ≤ k its
/// derivations can begin with, iterated until no set grows.
fn compute_first_k(cfg: &Cfg, k: usize) -> Vec<BTreeSet<LaString>> {
    let mut first_k: Vec<BTreeSet<LaString>> = vec![BTreeSet::new(); cfg.nonterminal_count()];
    let mut additions_made = true;
    while additions_made {
        additions_made = false;
        for index in 0..cfg.production_count() {
            let production = cfg.production(ProdId(index));
            let strings = first_of_symbols(cfg, &production.rhs, &first_k, k);
            let target = &mut first_k[production.lhs.0];
            for string in strings {
                if target.insert(string) {
                    additions_made = true;
                }
            }
        }
    }
    first_k
}

fn compute_follow_k(
    cfg: &Cfg,
    k: usize,
    first_k: &[BTreeSet<LaString>],
) -> Vec<BTreeSet<LaString>> {
    let mut follow_k: Vec<BTreeSet<LaString>> = vec![BTreeSet::new(); cfg.nonterminal_count()];
    follow_k[cfg.start().0].insert(Vec::new());
    let mut additions_made = true;
    while additions_made {
        additions_made = false;
        for index in 0..cfg.production_count() {
            let production = cfg.production(ProdId(index));
            for (position, symbol) in production.rhs.iter().enumerate() {
                let nt = match symbol {
                    Symbol::Nt(nt) => *nt,
                    Symbol::Term(_) => continue,
                };
                let rest = first_of_symbols(cfg, &production.rhs[position + 1..], first_k, k);
                let addition = concat_k(&rest, &follow_k[production.lhs.0], k);
                let target = &mut follow_k[nt.0];
                for string in addition {
                    if target.insert(string) {
                        additions_made = true;
                    }
                }
            }
        }
    }
    follow_k
}

/// FIRSTk of a symbol string under the current per non-terminal sets.
fn first_of_symbols(
    cfg: &Cfg,
    symbols: &[Symbol],
    first_k: &[BTreeSet<LaString>],
    k: usize,
) -> BTreeSet<LaString> {
    let mut strings: BTreeSet<LaString> = BTreeSet::new();
    strings.insert(Vec::new());
    for symbol in symbols {
        let symbol_strings = match symbol {
            Symbol::Term(term) => {
                let mut single = BTreeSet::new();
                single.insert(vec![*term]);
                single
            }
            Symbol::Nt(nt) => first_k[nt.0].clone(),
        };
        strings = concat_k(&strings, &symbol_strings, k);
        if strings.iter().all(|string| string.len() >= k) {
            break;
        }
    }
    strings
}

/// k-truncated concatenation of two string sets.
fn concat_k(left: &BTreeSet<LaString>, right: &BTreeSet<LaString>, k: usize) -> BTreeSet<LaString> {
    let mut out = BTreeSet::new();
    for a in left {
        if a.len() >= k {
            out.insert(a[..k].to_vec());
            continue;
        }
        for b in right {
            let mut string = a.clone();
            string.extend(b.iter().take(k - a.len()).copied());
            out.insert(string);
        }
    }
    out
}

/// Whether some input is matched by both strings, padding short strings with
/// the end of input mark the way the driver reads past the buffer.
fn strings_overlap(left: &LaString, right: &LaString, k: usize) -> bool {
    (0..k).all(|index| {
        let a = left.get(index).copied().unwrap_or(Term::Eoi);
        let b = right.get(index).copied().unwrap_or(Term::Eoi);
        a.intersects(&b)
    })
}

fn string_matches(string: &LaString, code: &Code, pos: usize, k: usize) -> bool {
    (0..k).all(|index| {
        let term = string.get(index).copied().unwrap_or(Term::Eoi);
        term.matches(code.byte_at(pos + index))
    })
}

enum StackEntry {
    Sym(Symbol),
    Reduce {
        prod: ProdId,
        arity: usize,
        start: usize,
    },
}

fn drive(
    grammar: &Grammar,
    cfg: &Cfg,
    tables: &LlTables,
    start_node: NodeId,
    code: &Code,
) -> Result<ParseTree, ParseError> {
    let mut stack: Vec<StackEntry> = vec![StackEntry::Sym(Symbol::Nt(cfg.start()))];
    let mut values: Vec<(usize, usize, Option<ParseTree>)> = Vec::new();
    let mut pos = 0;

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Sym(Symbol::Term(term)) => {
                if !term.matches(code.byte_at(pos)) {
                    let mut expected = BTreeSet::new();
                    expected.insert(term.expected());
                    return Err(ParseError::failed(pos, expected));
                }
                match term {
                    Term::Class(_) => {
                        values.push((pos, pos + 1, None));
                        pos += 1;
                    }
                    // The end of input mark is matched without consuming anything.
                    Term::Eoi => values.push((pos, pos, None)),
                }
            }
            StackEntry::Sym(Symbol::Nt(nt)) => {
                let selected = cfg.productions_of(nt).find(|prod| {
                    tables.lookahead[prod.0]
                        .iter()
                        .any(|string| string_matches(string, code, pos, tables.k))
                });
                let prod = match selected {
                    Some(prod) => prod,
                    None => {
                        let mut expected = BTreeSet::new();
                        for prod in cfg.productions_of(nt) {
                            for string in &tables.lookahead[prod.0] {
                                let head = string.first().copied().unwrap_or(Term::Eoi);
                                expected.insert(head.expected());
                            }
                        }
                        return Err(ParseError::failed(pos, expected));
                    }
                };
                let production = cfg.production(prod);
                stack.push(StackEntry::Reduce {
                    prod,
                    arity: production.rhs.len(),
                    start: pos,
                });
                for symbol in production.rhs.iter().rev() {
                    stack.push(StackEntry::Sym(*symbol));
                }
            }
            StackEntry::Reduce { prod, arity, start } => {
                let production = cfg.production(prod);
                let frames = values.split_off(values.len() - arity);
                let end = frames.last().map(|frame| frame.1).unwrap_or(start);
                let children = frames.into_iter().map(|frame| frame.2).collect();
                match reduce(
                    grammar,
                    code,
                    production.op,
                    production.origin,
                    children,
                    start,
                    end,
                ) {
                    Ok(value) => values.push((start, end, value)),
                    Err(_) => return Err(ParseError::failed(start, BTreeSet::new())),
                }
            }
        }
    }

    let (start, end, value) = values.pop().expect("Bug! LL drive finished without a value.");
    Ok(value.unwrap_or_else(|| ParseTree::empty(start, end, start_node)))
}
