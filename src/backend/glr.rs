//! Generalized LR over a graph structured stack.
//!
//! The LALR(1) tables are built with conflicts retained; every live stack top
//! follows all of its moves in parallel. Stacks sharing a state at the same
//! input position merge into one node, and alternative derivations reduced
//! onto the same edge accumulate as keyed alternatives. Each alternative is
//! keyed by its production and reduction path, so re-running a reduction
//! after one of its inputs gained an alternative replaces the stale value
//! instead of duplicating it. The result is the forest of every accepted
//! root, in input position order.

use super::lalr::{build_lr_tables, LrAction};
use super::{log_entry, log_result, Backend, BackendId, Compiled, CompileOptions, Tables};
use crate::arena::Arena;
use crate::cfg::{desugar, Augment, Cfg, NtId, ProdId, Term};
use crate::error::{CompileError, Expected, ParseError};
use crate::grammar::{Grammar, NodeId};
use crate::tree::{reduce, ParseTree, TreeValue};
use crate::util::{Code, Log};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

pub(crate) struct GlrBackend;

impl Backend for GlrBackend {
    fn name(&self) -> &'static str {
        "GLR"
    }

    fn compile(
        &self,
        grammar: &Grammar,
        start: NodeId,
        _options: &CompileOptions,
    ) -> Result<Compiled, CompileError> {
        let cfg = desugar(grammar, start, Augment::Prefix, self.name())?;
        let tables = build_lr_tables(&cfg, true)?;
        Ok(Compiled {
            backend: BackendId::Glr,
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
        arena: &Arena,
        log: Log<&'static str>,
    ) -> Result<Vec<ParseTree>, ParseError> {
        log_entry(log, self.name());
        let cfg = compiled
            .cfg
            .as_ref()
            .expect("Bug! GLR parse without a compiled grammar.");
        let tables = match &compiled.tables {
            Tables::Lr(tables) => tables,
            _ => panic!("Bug! GLR parse with foreign tables."),
        };
        let mut driver = Driver {
            grammar,
            cfg,
            tables,
            start_node: compiled.start,
            code,
            arena,
            nodes: Vec::new(),
            accepted_edges: Vec::new(),
            accepted_seen: HashSet::new(),
        };
        let result = driver.run();
        log_result(log, self.name(), code, &result);
        result
    }
}

/// One derivation of the value carried by an edge. The key identifies the
/// reduction instance (production and path) that produced it, so re-running
/// the same reduction replaces the value while a genuinely different
/// derivation adds an alternative.
struct Alt {
    key: (ProdId, u64),
    value: Option<ParseTree>,
}

/// An edge to a predecessor node, labelled with the value parsed between the
/// two. More than one alternative makes this an ambiguity node.
struct Edge {
    target: usize,
    /// The non-terminal this edge carries; [None] for shifted terminals.
    lhs: Option<NtId>,
    origin: NodeId,
    start: usize,
    end: usize,
    alts: Vec<Alt>,
    /// Bumped whenever `alts` changes, to requeue consumers of this edge.
    version: usize,
}

impl Edge {
    fn value(&self) -> Option<ParseTree> {
        if self.alts.len() == 1 {
            return self.alts[0].value.clone();
        }
        let trees: Vec<ParseTree> = self
            .alts
            .iter()
            .filter_map(|alt| alt.value.clone())
            .collect();
        if trees.len() <= 1 {
            trees.into_iter().next()
        } else {
            Some(ParseTree::new(
                TreeValue::Sequence(trees),
                self.start,
                self.end,
                self.origin,
            ))
        }
    }
}

/// A stack node of the graph structured stack; identified by pool index.
struct GssNode {
    state: usize,
    edges: Vec<Edge>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Work {
    Reduce {
        node: usize,
        prod: ProdId,
        /// Restrict reduction paths to those starting with this edge, at the
        /// version the edge had when the work was queued.
        via: Option<(usize, usize)>,
    },
    EndShift {
        node: usize,
        target: usize,
    },
}

enum EdgeOutcome {
    New(usize),
    Changed(usize),
    Unchanged,
}

/// ((owner node, edge index), start, end, value) of one reduction path step.
type PathStep = ((usize, usize), usize, usize, Option<ParseTree>);

struct Driver<'p> {
    grammar: &'p Grammar,
    cfg: &'p Cfg,
    tables: &'p super::LrTables,
    start_node: NodeId,
    code: &'p Code<'p>,
    arena: &'p Arena,
    nodes: Vec<GssNode>,
    /// (node, edge) pairs whose alternatives are the forest roots.
    accepted_edges: Vec<(usize, usize)>,
    accepted_seen: HashSet<(usize, usize)>,
}

impl<'p> Driver<'p> {
    fn run(&mut self) -> Result<Vec<ParseTree>, ParseError> {
        let augmented = self
            .cfg
            .productions_of(self.cfg.start())
            .next()
            .expect("Bug! Augmented start without a production.");

        self.new_node(0)?;
        let mut frontier: HashMap<usize, usize> = HashMap::from([(0, 0)]);
        let mut pos = 0;
        let mut stall: Option<(usize, BTreeSet<Expected>)> = None;

        loop {
            let byte = self.code.byte_at(pos);
            self.close_over_reductions(&mut frontier, byte, pos, augmented)?;

            if byte.is_none() {
                if self.accepted_edges.is_empty() {
                    stall = Some((pos, self.expected_of(&frontier)));
                }
                break;
            }

            // Shift phase: all tops that can consume the byte advance together.
            let mut next: HashMap<usize, usize> = HashMap::new();
            for node in frontier.values().copied().collect::<Vec<usize>>() {
                let state = self.nodes[node].state;
                for (term, action) in self.tables.states[state].matching_actions(byte) {
                    let target = match (term, action) {
                        (Term::Class(_), LrAction::Shift(target)) => target,
                        _ => continue,
                    };
                    let target_node = match next.get(&target) {
                        Some(existing) => *existing,
                        None => {
                            let fresh = self.new_node(target)?;
                            next.insert(target, fresh);
                            fresh
                        }
                    };
                    self.add_terminal_edge(target_node, node, pos, pos + 1)?;
                }
            }

            if next.is_empty() {
                if self.accepted_edges.is_empty() {
                    stall = Some((pos, self.expected_of(&frontier)));
                }
                break;
            }
            frontier = next;
            pos += 1;
        }

        if self.accepted_edges.is_empty() {
            let (position, expected) = stall.unwrap_or((pos, BTreeSet::new()));
            return Err(ParseError::failed(position, expected));
        }

        // The forest is materialized only now, after every merge has settled.
        let mut forest = Vec::new();
        for (node, edge_index) in &self.accepted_edges {
            let edge = &self.nodes[*node].edges[*edge_index];
            for alt in &edge.alts {
                forest.push(alt.value.clone().unwrap_or_else(|| {
                    ParseTree::empty(edge.start, edge.end, self.start_node)
                }));
            }
        }
        Ok(forest)
    }

    fn new_node(&mut self, state: usize) -> Result<usize, ParseError> {
        self.arena.charge(std::mem::size_of::<GssNode>())?;
        self.nodes.push(GssNode {
            state,
            edges: Vec::new(),
        });
        Ok(self.nodes.len() - 1)
    }

    fn add_terminal_edge(
        &mut self,
        node: usize,
        target: usize,
        start: usize,
        end: usize,
    ) -> Result<EdgeOutcome, ParseError> {
        let exists = self.nodes[node]
            .edges
            .iter()
            .any(|edge| edge.target == target && edge.lhs.is_none());
        if exists {
            return Ok(EdgeOutcome::Unchanged);
        }
        self.arena.charge(std::mem::size_of::<Edge>())?;
        self.nodes[node].edges.push(Edge {
            target,
            lhs: None,
            origin: self.start_node,
            start,
            end,
            alts: vec![Alt {
                key: (ProdId(usize::MAX), 0),
                value: None,
            }],
            version: 0,
        });
        Ok(EdgeOutcome::New(self.nodes[node].edges.len() - 1))
    }

    /// Record a reduced value on the edge `node → target` for `lhs`.
    /// A value with a known key replaces the previous one; a fresh key adds
    /// an alternative; either way consumers of the edge are requeued.
    fn add_reduced_edge(
        &mut self,
        node: usize,
        target: usize,
        lhs: NtId,
        origin: NodeId,
        span: (usize, usize),
        key: (ProdId, u64),
        value: Option<ParseTree>,
    ) -> Result<EdgeOutcome, ParseError> {
        let existing = self.nodes[node]
            .edges
            .iter()
            .position(|edge| edge.target == target && edge.lhs == Some(lhs));
        match existing {
            Some(index) => {
                let edge = &mut self.nodes[node].edges[index];
                match edge.alts.iter_mut().find(|alt| alt.key == key) {
                    Some(alt) => {
                        let changed = match (&alt.value, &value) {
                            (Some(old), Some(new)) => !old.structural_eq(new),
                            (None, None) => false,
                            _ => true,
                        };
                        if !changed {
                            return Ok(EdgeOutcome::Unchanged);
                        }
                        alt.value = value;
                    }
                    None => {
                        self.arena.charge(std::mem::size_of::<Alt>())?;
                        edge.alts.push(Alt { key, value });
                    }
                }
                edge.version += 1;
                Ok(EdgeOutcome::Changed(index))
            }
            None => {
                self.arena.charge(std::mem::size_of::<Edge>())?;
                self.nodes[node].edges.push(Edge {
                    target,
                    lhs: Some(lhs),
                    origin,
                    start: span.0,
                    end: span.1,
                    alts: vec![Alt { key, value }],
                    version: 0,
                });
                Ok(EdgeOutcome::New(self.nodes[node].edges.len() - 1))
            }
        }
    }

    /// Run every reduction applicable at this position to quiescence, longest
    /// reductions first, before any input is consumed. Zero width end of
    /// input shifts take part here because they do not advance the cursor.
    fn close_over_reductions(
        &mut self,
        frontier: &mut HashMap<usize, usize>,
        byte: Option<u8>,
        pos: usize,
        augmented: ProdId,
    ) -> Result<(), ParseError> {
        let mut worklist: Vec<Work> = Vec::new();
        let mut processed: HashSet<Work> = HashSet::new();

        for node in frontier.values().copied().collect::<Vec<usize>>() {
            self.enqueue_node(&mut worklist, node, None, byte, augmented);
        }

        while let Some(work) = self.pop_longest(&mut worklist) {
            if !processed.insert(work) {
                continue;
            }
            match work {
                Work::EndShift { node, target } => {
                    let target_node = match frontier.get(&target) {
                        Some(existing) => *existing,
                        None => {
                            let fresh = self.new_node(target)?;
                            frontier.insert(target, fresh);
                            self.enqueue_node(&mut worklist, fresh, None, byte, augmented);
                            fresh
                        }
                    };
                    if let EdgeOutcome::New(edge) =
                        self.add_terminal_edge(target_node, node, pos, pos)?
                    {
                        self.enqueue_node(
                            &mut worklist,
                            target_node,
                            Some(edge),
                            byte,
                            augmented,
                        );
                    }
                }
                Work::Reduce { node, prod, via } => {
                    self.run_reduction(
                        &mut worklist,
                        frontier,
                        node,
                        prod,
                        via.map(|(edge, _)| edge),
                        byte,
                        pos,
                        augmented,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn run_reduction(
        &mut self,
        worklist: &mut Vec<Work>,
        frontier: &mut HashMap<usize, usize>,
        node: usize,
        prod: ProdId,
        via: Option<usize>,
        byte: Option<u8>,
        pos: usize,
        augmented: ProdId,
    ) -> Result<(), ParseError> {
        let production = self.cfg.production(prod);
        let arity = production.rhs.len();

        for (base, path) in self.paths(node, via, arity) {
            let start = path.first().map(|step| step.1).unwrap_or(pos);
            let end = path.last().map(|step| step.2).unwrap_or(pos);
            let mut hasher = DefaultHasher::new();
            base.hash(&mut hasher);
            for (edge_id, _, _, _) in &path {
                edge_id.hash(&mut hasher);
            }
            let key = (prod, hasher.finish());

            if prod == augmented {
                // Accepting is the reduction of the augmented production; the
                // root values live on the path's single edge.
                if let Some((node_idx, edge_idx)) = path.first().map(|step| step.0) {
                    if self.accepted_seen.insert((node_idx, edge_idx)) {
                        self.accepted_edges.push((node_idx, edge_idx));
                    }
                }
                continue;
            }

            let children = path.iter().map(|step| step.3.clone()).collect();
            let value = match reduce(
                self.grammar,
                self.code,
                production.op,
                production.origin,
                children,
                start,
                end,
            ) {
                Ok(value) => value,
                // A rejected branch dies quietly.
                Err(_) => continue,
            };
            let goto_state = self.tables.states[self.nodes[base].state]
                .goto(production.lhs)
                .unwrap_or_else(|| panic!("Bug! Malformed goto table in GLR reduction."));
            let target_node = match frontier.get(&goto_state) {
                Some(existing) => *existing,
                None => {
                    let fresh = self.new_node(goto_state)?;
                    frontier.insert(goto_state, fresh);
                    self.enqueue_node(worklist, fresh, None, byte, augmented);
                    fresh
                }
            };
            let outcome = self.add_reduced_edge(
                target_node,
                base,
                production.lhs,
                production.origin,
                (start, end),
                key,
                value,
            )?;
            match outcome {
                EdgeOutcome::New(edge) | EdgeOutcome::Changed(edge) => {
                    self.enqueue_node(worklist, target_node, Some(edge), byte, augmented);
                }
                EdgeOutcome::Unchanged => {}
            }
        }
        Ok(())
    }

    /// Queue every move of `node` applicable under `byte`, restricted to
    /// paths through `via` when given.
    fn enqueue_node(
        &mut self,
        worklist: &mut Vec<Work>,
        node: usize,
        via: Option<usize>,
        byte: Option<u8>,
        augmented: ProdId,
    ) {
        let state = self.nodes[node].state;
        for (term, action) in self.tables.states[state].matching_actions(byte) {
            let prod = match action {
                LrAction::Reduce(prod) => prod,
                LrAction::Accept => augmented,
                LrAction::Shift(target) if matches!(term, Term::Eoi) => {
                    worklist.push(Work::EndShift { node, target });
                    continue;
                }
                LrAction::Shift(_) => continue,
            };
            let arity = self.cfg.production(prod).rhs.len();
            if arity == 0 {
                worklist.push(Work::Reduce {
                    node,
                    prod,
                    via: None,
                });
                continue;
            }
            let edges: Vec<usize> = match via {
                Some(via) => vec![via],
                None => (0..self.nodes[node].edges.len()).collect(),
            };
            for edge in edges {
                let version = self.nodes[node].edges[edge].version;
                worklist.push(Work::Reduce {
                    node,
                    prod,
                    via: Some((edge, version)),
                });
            }
        }
    }

    /// Longest reductions first, then zero width shifts.
    fn pop_longest(&self, worklist: &mut Vec<Work>) -> Option<Work> {
        if worklist.is_empty() {
            return None;
        }
        let mut best: Option<(usize, usize)> = None;
        for (index, work) in worklist.iter().enumerate() {
            if let Work::Reduce { prod, .. } = work {
                let arity = self.cfg.production(*prod).rhs.len();
                if best.map(|(_, max)| arity > max).unwrap_or(true) {
                    best = Some((index, arity));
                }
            }
        }
        let index = best.map(|(index, _)| index).unwrap_or(worklist.len() - 1);
        Some(worklist.swap_remove(index))
    }

    /// All reduction paths of `arity` edges from `node`, optionally pinned to
    /// begin with one edge. Steps come back in grammar order as
    /// ((owner, edge), start, end, value).
    fn paths(
        &self,
        node: usize,
        via: Option<usize>,
        arity: usize,
    ) -> Vec<(usize, Vec<PathStep>)> {
        if arity == 0 {
            return vec![(node, Vec::new())];
        }
        let mut out = Vec::new();
        let candidates: Vec<usize> = match via {
            Some(via) => vec![via],
            None => (0..self.nodes[node].edges.len()).collect(),
        };
        for edge_index in candidates {
            let edge = &self.nodes[node].edges[edge_index];
            let step = ((node, edge_index), edge.start, edge.end, edge.value());
            for (base, mut steps) in self.paths(edge.target, None, arity - 1) {
                steps.push(step.clone());
                out.push((base, steps));
            }
        }
        out
    }

    fn expected_of(&self, frontier: &HashMap<usize, usize>) -> BTreeSet<Expected> {
        let mut expected = BTreeSet::new();
        for node in frontier.values() {
            expected.extend(self.tables.states[self.nodes[*node].state].expected());
        }
        expected
    }
}
