//! LALR(1) table construction and its shift/reduce driver.
//!
//! The construction follows the classic route: LR(0) item sets and the goto
//! graph first, then LALR(1) lookaheads by spontaneous generation plus
//! propagation over the goto graph iterated to a fixed point. Conflicting
//! cells are hard compile errors here; the GLR backend reuses the same
//! construction with conflicts retained.

use super::{log_entry, log_result, Backend, BackendId, Compiled, CompileOptions, Tables};
use crate::arena::Arena;
use crate::cfg::{desugar, first_of_sequence, Augment, Cfg, NtId, ProdId, Symbol, Term, TermSet};
use crate::error::{CompileError, ParseError};
use crate::grammar::{Grammar, NodeId};
use crate::tree::{reduce, ParseTree};
use crate::util::{Code, Log};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub(crate) struct LalrBackend;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Item {
    pub prod: ProdId,
    pub dot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LrAction {
    Shift(usize),
    Reduce(ProdId),
    Accept,
}

pub(crate) struct LrState {
    #[allow(dead_code)]
    pub kernel: Vec<Item>,
    /// Action entries; a byte selects every entry whose terminal matches it.
    /// After a conflict free LALR compile at most one entry matches any byte.
    pub actions: Vec<(Term, LrAction)>,
    pub gotos: Vec<(NtId, usize)>,
}

impl LrState {
    pub(crate) fn matching_actions(&self, byte: Option<u8>) -> Vec<(Term, LrAction)> {
        self.actions
            .iter()
            .filter(|(term, _)| term.matches(byte))
            .copied()
            .collect()
    }

    pub(crate) fn goto(&self, nt: NtId) -> Option<usize> {
        self.gotos
            .iter()
            .find(|(goto_nt, _)| *goto_nt == nt)
            .map(|(_, state)| *state)
    }

    pub(crate) fn expected(&self) -> BTreeSet<crate::error::Expected> {
        self.actions
            .iter()
            .map(|(term, _)| term.expected())
            .collect()
    }
}

pub(crate) struct LrTables {
    pub states: Vec<LrState>,
}

impl Backend for LalrBackend {
    fn name(&self) -> &'static str {
        "LALR(1)"
    }

    fn compile(
        &self,
        grammar: &Grammar,
        start: NodeId,
        _options: &CompileOptions,
    ) -> Result<Compiled, CompileError> {
        let cfg = desugar(grammar, start, Augment::Exact, self.name())?;
        let tables = build_lr_tables(&cfg, false)?;
        Ok(Compiled {
            backend: BackendId::Lalr,
            start,
            tables: Tables::Lr(tables),
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
        let cfg = compiled
            .cfg
            .as_ref()
            .expect("Bug! LALR parse without a compiled grammar.");
        let tables = match &compiled.tables {
            Tables::Lr(tables) => tables,
            _ => panic!("Bug! LALR parse with foreign tables."),
        };
        let result = drive(grammar, cfg, tables, compiled.start, code).map(|tree| vec![tree]);
        log_result(log, self.name(), code, &result);
        result
    }
}

struct Frame {
    state: usize,
    start: usize,
    end: usize,
    value: Option<ParseTree>,
}

fn drive(
    grammar: &Grammar,
    cfg: &Cfg,
    tables: &LrTables,
    start_node: NodeId,
    code: &Code,
) -> Result<ParseTree, ParseError> {
    let mut stack: Vec<Frame> = vec![Frame {
        state: 0,
        start: 0,
        end: 0,
        value: None,
    }];
    let mut pos = 0;

    loop {
        let byte = code.byte_at(pos);
        let state = &tables.states[stack.last().unwrap().state];
        let matched = state.matching_actions(byte);
        let (term, action) = match matched.first() {
            Some(first) => *first,
            None => return Err(ParseError::failed(pos, state.expected())),
        };

        match action {
            LrAction::Shift(target) => {
                let width = match term {
                    Term::Class(_) => 1,
                    // The end of input mark shifts without consuming anything.
                    Term::Eoi => 0,
                };
                stack.push(Frame {
                    state: target,
                    start: pos,
                    end: pos + width,
                    value: None,
                });
                pos += width;
            }
            LrAction::Reduce(prod) => {
                let production = cfg.production(prod);
                let arity = production.rhs.len();
                let frames = stack.split_off(stack.len() - arity);
                let start = frames.first().map(|frame| frame.start).unwrap_or(pos);
                let end = frames.last().map(|frame| frame.end).unwrap_or(pos);
                let children = frames.into_iter().map(|frame| frame.value).collect();
                let value = reduce(
                    grammar,
                    code,
                    production.op,
                    production.origin,
                    children,
                    start,
                    end,
                )
                .map_err(|_| ParseError::failed(start, BTreeSet::new()))?;
                let top = stack.last().unwrap().state;
                let goto_state = tables.states[top]
                    .goto(production.lhs)
                    .unwrap_or_else(|| panic!("Bug! Malformed goto table in state {}.", top));
                stack.push(Frame {
                    state: goto_state,
                    start,
                    end,
                    value,
                });
            }
            LrAction::Accept => {
                let augmented = cfg
                    .productions_of(cfg.start())
                    .next()
                    .expect("Bug! Augmented start without a production.");
                let arity = cfg.production(augmented).rhs.len();
                let frames = stack.split_off(stack.len() - arity);
                let start = frames.first().map(|frame| frame.start).unwrap_or(pos);
                let end = frames.last().map(|frame| frame.end).unwrap_or(pos);
                let value = frames.into_iter().find_map(|frame| frame.value);
                return Ok(value.unwrap_or_else(|| ParseTree::empty(start, end, start_node)));
            }
        }
    }
}

/// LR(0) construction plus LALR(1) lookaheads; shared with the GLR backend.
///
/// With `allow_conflicts` false a cell holding two moves for one byte is
/// reported as [CompileError::Ambiguous]; with it true all moves are kept.
pub(crate) fn build_lr_tables(cfg: &Cfg, allow_conflicts: bool) -> Result<LrTables, CompileError> {
    let augmented = cfg
        .productions_of(cfg.start())
        .next()
        .expect("Bug! Augmented start without a production.");

    // LR(0) item sets and the goto graph.
    let start_item = Item {
        prod: augmented,
        dot: 0,
    };
    let mut kernels: Vec<BTreeSet<Item>> = vec![BTreeSet::from([start_item])];
    let mut transitions: Vec<HashMap<Symbol, usize>> = vec![HashMap::new()];
    let mut kernel_index: HashMap<Vec<Item>, usize> = HashMap::new();
    kernel_index.insert(vec![start_item], 0);

    let mut unprocessed = 0;
    while unprocessed < kernels.len() {
        let full = closure0(cfg, &kernels[unprocessed]);
        let mut grouped: BTreeMap<Symbol, BTreeSet<Item>> = BTreeMap::new();
        for item in &full {
            if let Some(symbol) = next_symbol(cfg, *item) {
                grouped.entry(symbol).or_default().insert(Item {
                    prod: item.prod,
                    dot: item.dot + 1,
                });
            }
        }
        for (symbol, kernel) in grouped {
            let key: Vec<Item> = kernel.iter().copied().collect();
            let target = match kernel_index.get(&key) {
                Some(existing) => *existing,
                None => {
                    kernels.push(kernel);
                    transitions.push(HashMap::new());
                    kernel_index.insert(key, kernels.len() - 1);
                    kernels.len() - 1
                }
            };
            transitions[unprocessed].insert(symbol, target);
        }
        unprocessed += 1;
    }

    // LALR(1) lookaheads: spontaneous generation and propagation links from
    // the closure of each kernel item with a placeholder lookahead.
    let mut lookahead: Vec<HashMap<Item, TermSet>> = vec![HashMap::new(); kernels.len()];
    let mut links: Vec<((usize, Item), (usize, Item))> = Vec::new();

    let accept_seed = match cfg.production(augmented).rhs.last() {
        // `S' : S $` consumes the whole input; `S' : S` accepts any prefix.
        Some(Symbol::Term(Term::Eoi)) => {
            let mut seed = TermSet::empty();
            seed.insert(&Term::Eoi);
            seed
        }
        _ => TermSet::full(),
    };
    lookahead[0].insert(start_item, accept_seed);

    for state in 0..kernels.len() {
        for kernel_item in kernels[state].clone() {
            let closure = lr1_closure(cfg, &[(kernel_item, TermSet::empty(), true)]);
            for (item, (terms, carries_placeholder)) in closure {
                let symbol = match next_symbol(cfg, item) {
                    Some(symbol) => symbol,
                    None => continue,
                };
                let target = transitions[state][&symbol];
                let advanced = Item {
                    prod: item.prod,
                    dot: item.dot + 1,
                };
                lookahead[target]
                    .entry(advanced)
                    .or_insert_with(TermSet::empty)
                    .union_with(&terms);
                if carries_placeholder {
                    links.push(((state, kernel_item), (target, advanced)));
                }
            }
        }
    }

    let mut additions_made = true;
    while additions_made {
        additions_made = false;
        for ((from_state, from_item), (to_state, to_item)) in &links {
            let source = match lookahead[*from_state].get(from_item) {
                Some(source) => *source,
                None => continue,
            };
            let target = lookahead[*to_state]
                .entry(*to_item)
                .or_insert_with(TermSet::empty);
            if target.union_with(&source) {
                additions_made = true;
            }
        }
    }

    // Assemble ACTION and GOTO; reductions come from the full lookahead
    // closure so ε productions get their sets as well.
    let mut states: Vec<LrState> = Vec::with_capacity(kernels.len());
    for state in 0..kernels.len() {
        let seeds: Vec<(Item, TermSet, bool)> = kernels[state]
            .iter()
            .map(|item| {
                let terms = lookahead[state]
                    .get(item)
                    .copied()
                    .unwrap_or_else(TermSet::empty);
                (*item, terms, false)
            })
            .collect();
        let closure = lr1_closure(cfg, &seeds);

        let mut actions: Vec<(Term, LrAction)> = Vec::new();
        let mut gotos: Vec<(NtId, usize)> = Vec::new();
        for (symbol, target) in &transitions[state] {
            match symbol {
                Symbol::Term(term) => actions.push((*term, LrAction::Shift(*target))),
                Symbol::Nt(nt) => gotos.push((*nt, *target)),
            }
        }
        let mut reduce_items: Vec<(Item, TermSet)> = closure
            .into_iter()
            .filter(|(item, _)| next_symbol(cfg, *item).is_none())
            .map(|(item, (terms, _))| (item, terms))
            .collect();
        reduce_items.sort_by_key(|(item, _)| *item);
        for (item, terms) in reduce_items {
            let action = if cfg.production(item.prod).lhs == cfg.start() {
                LrAction::Accept
            } else {
                LrAction::Reduce(item.prod)
            };
            for term in split_terms(&terms) {
                actions.push((term, action));
            }
        }

        // The maps feeding the table have no stable iteration order.
        actions.sort();
        gotos.sort();

        if !allow_conflicts {
            if let Some(conflict) = find_conflict(cfg, &actions) {
                return Err(CompileError::Ambiguous {
                    state,
                    conflict,
                });
            }
        }

        states.push(LrState {
            kernel: kernels[state].iter().copied().collect(),
            actions,
            gotos,
        });
    }

    Ok(LrTables { states })
}

fn next_symbol(cfg: &Cfg, item: Item) -> Option<Symbol> {
    cfg.production(item.prod).rhs.get(item.dot).copied()
}

fn closure0(cfg: &Cfg, kernel: &BTreeSet<Item>) -> BTreeSet<Item> {
    let mut closure = kernel.clone();
    let mut worklist: Vec<Item> = kernel.iter().copied().collect();
    while let Some(item) = worklist.pop() {
        if let Some(Symbol::Nt(nt)) = next_symbol(cfg, item) {
            for prod in cfg.productions_of(nt) {
                let fresh = Item { prod, dot: 0 };
                if closure.insert(fresh) {
                    worklist.push(fresh);
                }
            }
        }
    }
    closure
}

/// LR(1) closure over seed items. The boolean marks items whose lookahead
/// still carries the placeholder of the propagation algorithm.
fn lr1_closure(
    cfg: &Cfg,
    seeds: &[(Item, TermSet, bool)],
) -> HashMap<Item, (TermSet, bool)> {
    let mut entries: HashMap<Item, (TermSet, bool)> = HashMap::new();
    let mut worklist: Vec<Item> = Vec::new();
    for (item, terms, placeholder) in seeds {
        let entry = entries
            .entry(*item)
            .or_insert_with(|| (TermSet::empty(), false));
        entry.0.union_with(terms);
        entry.1 |= placeholder;
        worklist.push(*item);
    }

    while let Some(item) = worklist.pop() {
        let (terms, placeholder) = entries[&item];
        let nt = match next_symbol(cfg, item) {
            Some(Symbol::Nt(nt)) => nt,
            _ => continue,
        };
        let production = cfg.production(item.prod);
        let (mut contribution, rest_nullable) =
            first_of_sequence(cfg, &production.rhs[item.dot + 1..]);
        let mut contribution_placeholder = false;
        if rest_nullable {
            contribution.union_with(&terms);
            contribution_placeholder = placeholder;
        }
        for prod in cfg.productions_of(nt) {
            let target = Item { prod, dot: 0 };
            let entry = entries
                .entry(target)
                .or_insert_with(|| (TermSet::empty(), false));
            let mut grew = entry.0.union_with(&contribution);
            if contribution_placeholder && !entry.1 {
                entry.1 = true;
                grew = true;
            }
            if grew {
                worklist.push(target);
            }
        }
    }
    entries
}

/// Break a lookahead set into table terminals: one byte class plus the mark.
fn split_terms(terms: &TermSet) -> Vec<Term> {
    let mut out = Vec::new();
    if !terms.bytes.is_empty() {
        out.push(Term::Class(terms.bytes));
    }
    if terms.eoi {
        out.push(Term::Eoi);
    }
    out
}

/// Two entries whose terminals overlap but whose moves differ cannot share a
/// deterministic table.
fn find_conflict(cfg: &Cfg, actions: &[(Term, LrAction)]) -> Option<String> {
    for (left_index, (left_term, left_action)) in actions.iter().enumerate() {
        for (right_term, right_action) in &actions[left_index + 1..] {
            if !left_term.intersects(right_term) || left_action == right_action {
                continue;
            }
            let describe = |action: &LrAction| match action {
                LrAction::Shift(_) => "shift".to_string(),
                LrAction::Reduce(prod) => {
                    format!("reduce '{}'", cfg.display_production(*prod))
                }
                LrAction::Accept => "accept".to_string(),
            };
            return Some(format!(
                "{}/{} conflict on {}.",
                describe(left_action),
                describe(right_action),
                left_term,
            ));
        }
    }
    None
}
