//! Memoized recursive descent executed directly on the combinator graph.
//!
//! The memo table is keyed by (node identity, byte offset). Left recursion is
//! handled by seeding the recursive key with a failure and growing the seed to
//! a fixed point; a pass that does not consume strictly more input than the
//! previous one ends the growth.

use super::{log_entry, log_result, Backend, Compiled, CompileOptions, Tables};
use crate::arena::{AllocError, Arena};
use crate::error::{CompileError, Expected, ParseError, Rejected};
use crate::grammar::{Grammar, GrammarNode, NodeId};
use crate::tree::{ParseTree, TreeValue};
use crate::util::{Code, Log};
use std::collections::{BTreeSet, HashMap, HashSet};

pub(crate) struct PackratBackend;

impl Backend for PackratBackend {
    fn name(&self) -> &'static str {
        "packrat"
    }

    /// The packrat backend runs on the user graph as is; compiling is a no-op.
    fn compile(
        &self,
        _grammar: &Grammar,
        start: NodeId,
        _options: &CompileOptions,
    ) -> Result<Compiled, CompileError> {
        Ok(Compiled {
            backend: super::BackendId::Packrat,
            start,
            cfg: None,
            tables: Tables::Packrat,
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
        let mut run = PackratRun {
            grammar,
            code,
            arena,
            memo: HashMap::new(),
            journal: Vec::new(),
            heads: HashSet::new(),
            furthest: 0,
            expected: BTreeSet::new(),
            quiet: 0,
        };
        let result = run.run(compiled.start).map(|tree| vec![tree]);
        log_result(log, self.name(), code, &result);
        result
    }
}

#[derive(Clone)]
enum Fail {
    /// The node did not match; alternatives and repetitions may proceed.
    Mismatch,
    /// The arena refused an allocation; the parse unwinds immediately.
    Alloc(AllocError),
}

type PResult = Result<(usize, Option<ParseTree>), Fail>;

enum Memo {
    InProgress,
    Done(PResult),
}

struct PackratRun<'p> {
    grammar: &'p Grammar,
    code: &'p Code<'p>,
    arena: &'p Arena,
    memo: HashMap<(NodeId, usize), Memo>,
    /// Completed memo keys in insertion order, so entries seeded under a
    /// left recursive head can be dropped between growth passes.
    journal: Vec<(NodeId, usize)>,
    /// Keys observed while their own computation was still in progress.
    heads: HashSet<(NodeId, usize)>,
    furthest: usize,
    expected: BTreeSet<Expected>,
    /// Non-zero inside a negative lookahead, where failures are expected.
    quiet: usize,
}

impl<'p> PackratRun<'p> {
    fn run(&mut self, start: NodeId) -> Result<ParseTree, ParseError> {
        match self.apply(start, 0) {
            Ok((end, tree)) => Ok(tree.unwrap_or_else(|| ParseTree::empty(0, end, start))),
            Err(Fail::Alloc(err)) => Err(ParseError::AllocationFailed(err)),
            Err(Fail::Mismatch) => Err(ParseError::failed(
                self.furthest,
                std::mem::take(&mut self.expected),
            )),
        }
    }

    fn apply(&mut self, id: NodeId, pos: usize) -> PResult {
        if is_memoized(self.grammar.node(id)) {
            self.apply_memoized(id, pos)
        } else {
            self.eval(id, pos)
        }
    }

    fn apply_memoized(&mut self, id: NodeId, pos: usize) -> PResult {
        let key = (id, pos);
        match self.memo.get(&key) {
            Some(Memo::InProgress) => {
                self.heads.insert(key);
                return Err(Fail::Mismatch);
            }
            Some(Memo::Done(result)) => return result.clone(),
            None => {}
        }

        self.arena
            .charge(std::mem::size_of::<((NodeId, usize), Memo)>())
            .map_err(Fail::Alloc)?;
        let mark = self.journal.len();
        self.memo.insert(key, Memo::InProgress);
        let mut result = self.eval(id, pos);

        if self.heads.remove(&key) {
            // Left recursion through this key: grow the seed while each pass
            // consumes strictly more input.
            loop {
                let seeded_end = match &result {
                    Ok((end, _)) => *end,
                    Err(_) => break,
                };
                self.purge(mark);
                self.memo.insert(key, Memo::Done(result.clone()));
                match self.eval(id, pos) {
                    Ok((end, tree)) if end > seeded_end => result = Ok((end, tree)),
                    Err(Fail::Alloc(err)) => {
                        result = Err(Fail::Alloc(err));
                        break;
                    }
                    _ => break,
                }
            }
            self.purge(mark);
        }

        if let Err(Fail::Alloc(_)) = &result {
            return result;
        }
        self.memo.insert(key, Memo::Done(result.clone()));
        self.journal.push(key);
        result
    }

    fn purge(&mut self, mark: usize) {
        for key in self.journal.drain(mark..) {
            self.memo.remove(&key);
        }
    }

    fn mismatch(&mut self, pos: usize, expected: Expected) -> PResult {
        if self.quiet == 0 {
            if pos > self.furthest {
                self.furthest = pos;
                self.expected.clear();
            }
            if pos == self.furthest {
                self.expected.insert(expected);
            }
        }
        Err(Fail::Mismatch)
    }

    fn eval(&mut self, id: NodeId, pos: usize) -> PResult {
        match self.grammar.node(id) {
            GrammarNode::Token(bytes) => {
                if self.code.matches_at(pos, bytes) {
                    let end = pos + bytes.len();
                    let leaf = ParseTree::new(TreeValue::Token(bytes.clone()), pos, end, id);
                    Ok((end, Some(leaf)))
                } else {
                    self.mismatch(pos, Expected::Literal(bytes.clone()))
                }
            }
            GrammarNode::CharSet(set) => match self.code.byte_at(pos) {
                Some(byte) if set.contains(byte) => {
                    let leaf = ParseTree::new(TreeValue::Bytes, pos, pos + 1, id);
                    Ok((pos + 1, Some(leaf)))
                }
                _ => self.mismatch(pos, Expected::Class(*set)),
            },
            GrammarNode::Anything => match self.code.byte_at(pos) {
                Some(_) => {
                    let leaf = ParseTree::new(TreeValue::Bytes, pos, pos + 1, id);
                    Ok((pos + 1, Some(leaf)))
                }
                None => self.mismatch(pos, Expected::Anything),
            },
            GrammarNode::End => {
                if pos == self.code.len() {
                    Ok((pos, None))
                } else {
                    self.mismatch(pos, Expected::End)
                }
            }
            GrammarNode::Nothing => Err(Fail::Mismatch),
            GrammarNode::Epsilon => Ok((pos, None)),
            GrammarNode::Sequence(items) => {
                let mut children: Vec<ParseTree> = Vec::new();
                let mut cursor = pos;
                for item in items {
                    let (end, tree) = self.apply(*item, cursor)?;
                    children.extend(tree);
                    cursor = end;
                }
                let sequence = ParseTree::new(TreeValue::Sequence(children), pos, cursor, id);
                Ok((cursor, Some(sequence)))
            }
            GrammarNode::Choice(alternatives) => {
                for alternative in alternatives {
                    match self.apply(*alternative, pos) {
                        Ok(success) => return Ok(success),
                        Err(Fail::Mismatch) => continue,
                        fatal => return fatal,
                    }
                }
                Err(Fail::Mismatch)
            }
            GrammarNode::Optional(child) => match self.apply(*child, pos) {
                Ok(success) => Ok(success),
                Err(Fail::Mismatch) => Ok((pos, None)),
                fatal => fatal,
            },
            GrammarNode::Many(child) => {
                let (end, children) = self.repeat(*child, pos, 0)?;
                let sequence = ParseTree::new(TreeValue::Sequence(children), pos, end, id);
                Ok((end, Some(sequence)))
            }
            GrammarNode::Many1(child) => {
                let (end, children) = self.repeat(*child, pos, 1)?;
                let sequence = ParseTree::new(TreeValue::Sequence(children), pos, end, id);
                Ok((end, Some(sequence)))
            }
            GrammarNode::SepBy { item, sep } => {
                match self.separated(id, *item, *sep, pos) {
                    Ok(success) => Ok(success),
                    // An empty list is a successful parse of nothing.
                    Err(Fail::Mismatch) => Ok((pos, Some(ParseTree::empty(pos, pos, id)))),
                    fatal => fatal,
                }
            }
            GrammarNode::SepBy1 { item, sep } => self.separated(id, *item, *sep, pos),
            GrammarNode::NotFollowedBy(child) => {
                self.quiet += 1;
                let attempt = self.apply(*child, pos);
                self.quiet -= 1;
                match attempt {
                    Ok(_) => Err(Fail::Mismatch),
                    Err(Fail::Mismatch) => Ok((pos, None)),
                    fatal => fatal,
                }
            }
            GrammarNode::FollowedBy(child) => match self.apply(*child, pos) {
                Ok(_) => Ok((pos, None)),
                failed => failed,
            },
            GrammarNode::Indirect(cell) => match cell.get() {
                Some(target) => self.apply(*target, pos),
                None => panic!("Bug! Unbound indirect node survived parser validation."),
            },
            GrammarNode::Action { child, action } => {
                let (end, tree) = self.apply(*child, pos)?;
                let child_tree = tree.unwrap_or_else(|| ParseTree::empty(pos, end, id));
                match (**action)(child_tree, self.code) {
                    Ok(value) => Ok((end, Some(ParseTree::new(value, pos, end, id)))),
                    Err(Rejected) => Err(Fail::Mismatch),
                }
            }
            GrammarNode::Attr { child, pred } => {
                let (end, tree) = self.apply(*child, pos)?;
                let child_tree = tree.unwrap_or_else(|| ParseTree::empty(pos, end, id));
                if (**pred)(&child_tree, self.code) {
                    Ok((end, Some(child_tree)))
                } else {
                    Err(Fail::Mismatch)
                }
            }
            GrammarNode::Ignore(child) => {
                let (end, _) = self.apply(*child, pos)?;
                Ok((end, None))
            }
        }
    }

    /// Greedy repetition. Stops on the first mismatch or on a match that does
    /// not advance the cursor.
    fn repeat(
        &mut self,
        child: NodeId,
        pos: usize,
        minimum: usize,
    ) -> Result<(usize, Vec<ParseTree>), Fail> {
        let mut children: Vec<ParseTree> = Vec::new();
        let mut cursor = pos;
        let mut count = 0;
        loop {
            match self.apply(child, cursor) {
                Ok((end, _)) if end == cursor => break,
                Ok((end, tree)) => {
                    children.extend(tree);
                    cursor = end;
                    count += 1;
                }
                Err(Fail::Mismatch) => break,
                Err(fatal) => return Err(fatal),
            }
        }
        if count < minimum {
            return Err(Fail::Mismatch);
        }
        Ok((cursor, children))
    }

    /// `item (sep item)*`. A separator not followed by an item is left unconsumed.
    fn separated(&mut self, id: NodeId, item: NodeId, sep: NodeId, pos: usize) -> PResult {
        let (mut cursor, first) = self.apply(item, pos)?;
        let mut children: Vec<ParseTree> = first.into_iter().collect();
        loop {
            let (sep_end, sep_tree) = match self.apply(sep, cursor) {
                Ok(parsed) => parsed,
                Err(Fail::Mismatch) => break,
                fatal => return fatal,
            };
            match self.apply(item, sep_end) {
                Ok((end, _)) if end == cursor => break,
                Ok((end, tree)) => {
                    children.extend(sep_tree);
                    children.extend(tree);
                    cursor = end;
                }
                Err(Fail::Mismatch) => break,
                fatal => return fatal,
            }
        }
        let sequence = ParseTree::new(TreeValue::Sequence(children), pos, cursor, id);
        Ok((cursor, Some(sequence)))
    }
}

fn is_memoized(node: &GrammarNode) -> bool {
    matches!(
        node,
        GrammarNode::Sequence(_)
            | GrammarNode::Choice(_)
            | GrammarNode::Optional(_)
            | GrammarNode::Many(_)
            | GrammarNode::Many1(_)
            | GrammarNode::SepBy { .. }
            | GrammarNode::SepBy1 { .. }
            | GrammarNode::Indirect(_)
            | GrammarNode::Action { .. }
            | GrammarNode::Attr { .. }
            | GrammarNode::Ignore(_)
    )
}
