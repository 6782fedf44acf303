use super::{Cfg, NtId, NtInfo, ProdId, Production, ReduceOp, Symbol, Term};
use crate::error::CompileError;
use crate::grammar::{ByteSet, Grammar, GrammarNode, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the start symbol is augmented.
pub(crate) enum Augment {
    /// `S' : S $`, demanding the whole input. LL(k) and LALR(1).
    Exact,
    /// `S' : S`, accepting a parse of any input prefix. GLR.
    Prefix,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Role {
    Main,
    /// The `item (sep item)*` helper of a possibly empty separated list.
    Tail,
}

/// Rewrite the combinator graph rooted at `start` into a normalized grammar.
///
/// One non-terminal is introduced per reachable grammar node; the mapping is
/// memoized on node identity so shared subgraphs share non-terminals, and
/// cycles through bound indirections close back onto the already assigned
/// non-terminal. Lookahead nodes have no context-free counterpart and fail
/// the compile for the named backend.
pub(crate) fn desugar(
    grammar: &Grammar,
    start: NodeId,
    augment: Augment,
    backend: &'static str,
) -> Result<Cfg, CompileError> {
    let mut lowering = Lowering {
        grammar,
        backend,
        memo: HashMap::new(),
        nonterminals: Vec::new(),
        productions: Vec::new(),
    };

    let user_start = lowering.lower(start)?;

    let augmented = lowering.fresh(format!("{}'", grammar.name(grammar.resolve(start))), start);
    let rhs = match augment {
        Augment::Exact => vec![Symbol::Nt(user_start), Symbol::Term(Term::Eoi)],
        Augment::Prefix => vec![Symbol::Nt(user_start)],
    };
    lowering.add_production(augmented, rhs, start, ReduceOp::Forward);

    let nonterminal_count = lowering.nonterminals.len();
    let mut cfg = Cfg {
        nonterminals: lowering.nonterminals,
        productions: lowering.productions,
        start: augmented,
        nullable: vec![false; nonterminal_count],
        first: vec![super::TermSet::empty(); nonterminal_count],
        follow: vec![super::TermSet::empty(); nonterminal_count],
    };
    super::recompute_analyses(&mut cfg);
    Ok(cfg)
}

struct Lowering<'g> {
    grammar: &'g Grammar,
    backend: &'static str,
    memo: HashMap<(NodeId, Role), NtId>,
    nonterminals: Vec<NtInfo>,
    productions: Vec<Production>,
}

impl<'g> Lowering<'g> {
    fn fresh(&mut self, name: String, origin: NodeId) -> NtId {
        let nt = NtId(self.nonterminals.len());
        self.nonterminals.push(NtInfo {
            name,
            productions: Vec::new(),
            origin,
        });
        nt
    }

    fn add_production(&mut self, lhs: NtId, rhs: Vec<Symbol>, origin: NodeId, op: ReduceOp) {
        let prod = ProdId(self.productions.len());
        self.productions.push(Production {
            lhs,
            rhs,
            origin,
            op,
        });
        self.nonterminals[lhs.0].productions.push(prod);
    }

    fn lower(&mut self, id: NodeId) -> Result<NtId, CompileError> {
        let id = self.grammar.resolve(id);
        if let Some(nt) = self.memo.get(&(id, Role::Main)) {
            return Ok(*nt);
        }
        let nt = self.fresh(self.grammar.name(id), id);
        // Registered before the children are lowered so recursive references
        // close onto this non-terminal.
        self.memo.insert((id, Role::Main), nt);

        match self.grammar.node(id) {
            GrammarNode::Token(bytes) => {
                let rhs = bytes
                    .iter()
                    .map(|byte| Symbol::Term(Term::Class(ByteSet::single(*byte))))
                    .collect();
                self.add_production(nt, rhs, id, ReduceOp::Leaf);
            }
            GrammarNode::CharSet(set) => {
                let rhs = vec![Symbol::Term(Term::Class(*set))];
                self.add_production(nt, rhs, id, ReduceOp::Leaf);
            }
            GrammarNode::Anything => {
                let rhs = vec![Symbol::Term(Term::Class(ByteSet::full()))];
                self.add_production(nt, rhs, id, ReduceOp::Leaf);
            }
            GrammarNode::End => {
                self.add_production(nt, vec![Symbol::Term(Term::Eoi)], id, ReduceOp::Zero);
            }
            GrammarNode::Epsilon => {
                self.add_production(nt, Vec::new(), id, ReduceOp::Zero);
            }
            GrammarNode::Nothing => {
                // No production: the non-terminal derives nothing.
            }
            GrammarNode::Sequence(items) => {
                let items = items.clone();
                let mut rhs = Vec::with_capacity(items.len());
                for item in items {
                    rhs.push(Symbol::Nt(self.lower(item)?));
                }
                self.add_production(nt, rhs, id, ReduceOp::Collect);
            }
            GrammarNode::Choice(alternatives) => {
                let alternatives = alternatives.clone();
                for alternative in alternatives {
                    let child = self.lower(alternative)?;
                    self.add_production(nt, vec![Symbol::Nt(child)], id, ReduceOp::Forward);
                }
            }
            GrammarNode::Optional(child) => {
                let child = self.lower(*child)?;
                self.add_production(nt, vec![Symbol::Nt(child)], id, ReduceOp::Forward);
                self.add_production(nt, Vec::new(), id, ReduceOp::Zero);
            }
            GrammarNode::Many(child) => {
                let child = self.lower(*child)?;
                self.add_production(
                    nt,
                    vec![Symbol::Nt(child), Symbol::Nt(nt)],
                    id,
                    ReduceOp::RepCons,
                );
                self.add_production(nt, Vec::new(), id, ReduceOp::RepNil);
            }
            GrammarNode::Many1(child) => {
                let child = self.lower(*child)?;
                self.add_production(
                    nt,
                    vec![Symbol::Nt(child), Symbol::Nt(nt)],
                    id,
                    ReduceOp::RepCons,
                );
                self.add_production(nt, vec![Symbol::Nt(child)], id, ReduceOp::RepOne);
            }
            GrammarNode::SepBy { item, sep } => {
                let (item, sep) = (*item, *sep);
                let tail = self.lower_list_tail(id, item, sep)?;
                self.add_production(nt, vec![Symbol::Nt(tail)], id, ReduceOp::Forward);
                self.add_production(nt, Vec::new(), id, ReduceOp::RepNil);
            }
            GrammarNode::SepBy1 { item, sep } => {
                let (item, sep) = (*item, *sep);
                let item = self.lower(item)?;
                let sep = self.lower(sep)?;
                self.add_production(
                    nt,
                    vec![Symbol::Nt(item), Symbol::Nt(sep), Symbol::Nt(nt)],
                    id,
                    ReduceOp::RepCons,
                );
                self.add_production(nt, vec![Symbol::Nt(item)], id, ReduceOp::RepOne);
            }
            GrammarNode::NotFollowedBy(_) | GrammarNode::FollowedBy(_) => {
                return Err(CompileError::PegOnlyConstruct {
                    node: id,
                    backend: self.backend,
                });
            }
            GrammarNode::Indirect(_) => {
                // `resolve` stops on unbound cells only.
                return Err(CompileError::UnboundIndirect { node: id });
            }
            GrammarNode::Action { child, .. } => {
                let child = self.lower(*child)?;
                self.add_production(nt, vec![Symbol::Nt(child)], id, ReduceOp::Action);
            }
            GrammarNode::Attr { child, .. } => {
                let child = self.lower(*child)?;
                self.add_production(nt, vec![Symbol::Nt(child)], id, ReduceOp::Attr);
            }
            GrammarNode::Ignore(child) => {
                let child = self.lower(*child)?;
                self.add_production(nt, vec![Symbol::Nt(child)], id, ReduceOp::Discard);
            }
        }
        Ok(nt)
    }

    /// The non-empty `item (sep item)*` helper of a [SepBy](GrammarNode::SepBy) node.
    fn lower_list_tail(
        &mut self,
        id: NodeId,
        item: NodeId,
        sep: NodeId,
    ) -> Result<NtId, CompileError> {
        if let Some(nt) = self.memo.get(&(id, Role::Tail)) {
            return Ok(*nt);
        }
        let nt = self.fresh(format!("{}_tail", self.grammar.name(id)), id);
        self.memo.insert((id, Role::Tail), nt);
        let item = self.lower(item)?;
        let sep = self.lower(sep)?;
        self.add_production(
            nt,
            vec![Symbol::Nt(item), Symbol::Nt(sep), Symbol::Nt(nt)],
            id,
            ReduceOp::RepCons,
        );
        self.add_production(nt, vec![Symbol::Nt(item)], id, ReduceOp::RepOne);
        Ok(nt)
    }
}
