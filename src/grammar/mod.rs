//! The user facing grammar graph.
//!
//! A grammar is built by composing [GrammarNode]s through a [GrammarBuilder].
//! Nodes are identified by their pool index ([NodeId]) rather than by address,
//! so memoization keys and stack keys stay stable and comparable.
//! Recursion is expressed only through [Indirect](GrammarNode::Indirect) nodes,
//! which are bound exactly once before the grammar is frozen into a
//! [Parser](crate::Parser).

mod builder;

#[cfg(test)]
mod __tests__;

use crate::error::Rejected;
use crate::tree::{ParseTree, TreeValue};
use crate::util::Code;
use once_cell::unsync::OnceCell;
use regex::bytes::Regex;
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

pub use builder::GrammarBuilder;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// The identity of a grammar node: its index in the node pool.
pub struct NodeId(pub(crate) usize);

/// A semantic function attached to an [Action](GrammarNode::Action) node.
///
/// The function receives the parse tree of the child grammar and either
/// produces a fresh value for the enclosing tree node or signals [Rejected],
/// which turns the whole match into a parse failure.
pub type SemanticAction = Rc<dyn Fn(ParseTree, &Code) -> Result<TreeValue, Rejected>>;

/// A predicate attached to an [Attr](GrammarNode::Attr) node.
pub type AttributePredicate = Rc<dyn Fn(&ParseTree, &Code) -> bool>;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A 256 bit bitmap over byte values, the terminal alphabet of every grammar.
pub struct ByteSet {
    bits: [u64; 4],
}

impl ByteSet {
    pub fn empty() -> Self {
        Self { bits: [0; 4] }
    }

    /// The set accepting every byte.
    pub fn full() -> Self {
        Self { bits: [u64::MAX; 4] }
    }

    pub fn single(byte: u8) -> Self {
        let mut set = Self::empty();
        set.insert(byte);
        set
    }

    /// The inclusive range `low..=high`.
    pub fn range(low: u8, high: u8) -> Self {
        let mut set = Self::empty();
        for byte in low..=high {
            set.insert(byte);
        }
        set
    }

    /// Build a set from a regex character class body, e.g. `"0-9a-fA-F"` or `"^\\r\\n"`.
    ///
    /// The pattern is evaluated once against each of the 256 byte values.
    pub fn class(pattern: &str) -> Result<Self, regex::Error> {
        let regexp = Regex::new(&format!("(?s-u)^[{}]$", pattern))?;
        let mut set = Self::empty();
        for byte in 0..=255_u8 {
            if regexp.is_match(&[byte]) {
                set.insert(byte);
            }
        }
        Ok(set)
    }

    pub fn insert(&mut self, byte: u8) {
        self.bits[(byte >> 6) as usize] |= 1 << (byte & 63);
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.bits[(byte >> 6) as usize] & (1 << (byte & 63)) != 0
    }

    /// Union `other` into self and report whether the set grew.
    pub fn union_with(&mut self, other: &ByteSet) -> bool {
        let mut grew = false;
        for (slot, bits) in self.bits.iter_mut().zip(other.bits) {
            let merged = *slot | bits;
            grew |= merged != *slot;
            *slot = merged;
        }
        grew
    }

    pub fn intersects(&self, other: &ByteSet) -> bool {
        self.bits.iter().zip(other.bits).any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255_u8).filter(|b| self.contains(*b))
    }
}

impl Display for ByteSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn write_byte(f: &mut Formatter<'_>, byte: u8) -> std::fmt::Result {
            if byte.is_ascii_graphic() {
                write!(f, "'{}'", byte as char)
            } else {
                write!(f, "{:#04x}", byte)
            }
        }

        let mut runs: Vec<(u8, u8)> = Vec::new();
        for byte in self.iter() {
            match runs.last_mut() {
                Some((_, high)) if *high as u16 + 1 == byte as u16 => *high = byte,
                _ => runs.push((byte, byte)),
            }
        }

        write!(f, "[")?;
        for (index, (low, high)) in runs.iter().enumerate() {
            if index != 0 {
                write!(f, ",")?;
            }
            write_byte(f, *low)?;
            if high > low {
                write!(f, "-")?;
                write_byte(f, *high)?;
            }
        }
        write!(f, "]")
    }
}

impl Debug for ByteSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A grammar node. Composite variants refer to their children by [NodeId].
pub enum GrammarNode {
    /// A literal byte string.
    Token(Vec<u8>),
    /// One byte out of a [ByteSet].
    CharSet(ByteSet),
    /// Any single byte.
    Anything,
    /// Matches only at the end of the input without consuming it.
    End,
    /// Never matches.
    Nothing,
    /// Matches the empty string.
    Epsilon,
    /// Ordered concatenation of the children.
    Sequence(Vec<NodeId>),
    /// Ordered alternatives. The packrat backend commits to the first success;
    /// the table driven backends treat all alternatives as equal.
    Choice(Vec<NodeId>),
    Optional(NodeId),
    /// Zero or more repetitions, greedy under the packrat backend.
    Many(NodeId),
    Many1(NodeId),
    /// `item (sep item)*`, possibly empty.
    SepBy { item: NodeId, sep: NodeId },
    SepBy1 { item: NodeId, sep: NodeId },
    /// Zero width negative lookahead. Packrat only.
    NotFollowedBy(NodeId),
    /// Zero width positive lookahead. Packrat only.
    FollowedBy(NodeId),
    /// A late bound reference enabling recursion; bound exactly once.
    Indirect(OnceCell<NodeId>),
    /// Transforms the child result through a user function.
    Action { child: NodeId, action: SemanticAction },
    /// Accepts the child result only if the predicate holds.
    Attr { child: NodeId, pred: AttributePredicate },
    /// Parses the child and discards its result.
    Ignore(NodeId),
}

impl GrammarNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GrammarNode::Token(_) => "token",
            GrammarNode::CharSet(_) => "charset",
            GrammarNode::Anything => "anything",
            GrammarNode::End => "end",
            GrammarNode::Nothing => "nothing",
            GrammarNode::Epsilon => "epsilon",
            GrammarNode::Sequence(_) => "sequence",
            GrammarNode::Choice(_) => "choice",
            GrammarNode::Optional(_) => "optional",
            GrammarNode::Many(_) => "many",
            GrammarNode::Many1(_) => "many1",
            GrammarNode::SepBy { .. } => "sep_by",
            GrammarNode::SepBy1 { .. } => "sep_by1",
            GrammarNode::NotFollowedBy(_) => "not_followed_by",
            GrammarNode::FollowedBy(_) => "followed_by",
            GrammarNode::Indirect(_) => "indirect",
            GrammarNode::Action { .. } => "action",
            GrammarNode::Attr { .. } => "attr",
            GrammarNode::Ignore(_) => "ignore",
        }
    }

    /// The children this node refers to, in grammar order.
    pub(crate) fn children(&self) -> Vec<NodeId> {
        match self {
            GrammarNode::Sequence(items) | GrammarNode::Choice(items) => items.clone(),
            GrammarNode::Optional(child)
            | GrammarNode::Many(child)
            | GrammarNode::Many1(child)
            | GrammarNode::NotFollowedBy(child)
            | GrammarNode::FollowedBy(child)
            | GrammarNode::Ignore(child)
            | GrammarNode::Action { child, .. }
            | GrammarNode::Attr { child, .. } => vec![*child],
            GrammarNode::SepBy { item, sep } | GrammarNode::SepBy1 { item, sep } => {
                vec![*item, *sep]
            }
            GrammarNode::Indirect(cell) => cell.get().map(|id| vec![*id]).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl Debug for GrammarNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarNode::Token(bytes) => {
                write!(f, "token({:?})", String::from_utf8_lossy(bytes))
            }
            GrammarNode::CharSet(set) => write!(f, "charset({})", set),
            other => write!(f, "{}", other.kind_name()),
        }
    }
}

/// The immutable grammar graph owned by a [Parser](crate::Parser).
pub struct Grammar {
    nodes: Vec<GrammarNode>,
    labels: Vec<Option<&'static str>>,
    user_data: Vec<Option<Rc<dyn Any>>>,
}

impl Grammar {
    pub(crate) fn new(
        nodes: Vec<GrammarNode>,
        labels: Vec<Option<&'static str>>,
        user_data: Vec<Option<Rc<dyn Any>>>,
    ) -> Self {
        Self {
            nodes,
            labels,
            user_data,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id.0]
    }

    /// The label assigned through [GrammarBuilder::label], if any.
    pub fn label(&self, id: NodeId) -> Option<&'static str> {
        self.labels[id.0]
    }

    /// The user data attached through [GrammarBuilder::set_user_data], if any.
    pub fn user_data(&self, id: NodeId) -> Option<&Rc<dyn Any>> {
        self.user_data[id.0].as_ref()
    }

    /// A printable name: the label when one is assigned, the node kind and index otherwise.
    pub fn name(&self, id: NodeId) -> String {
        match self.labels[id.0] {
            Some(label) => label.to_string(),
            None => format!("{}_{}", self.node(id).kind_name(), id.0),
        }
    }

    /// Follow [Indirect](GrammarNode::Indirect) bindings down to a concrete node.
    ///
    /// Binding completeness is validated when the parser is created, so an
    /// unbound cell can only be observed here as a self reference.
    pub(crate) fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut hops = 0;
        while let GrammarNode::Indirect(cell) = &self.nodes[current.0] {
            match cell.get() {
                Some(target) if hops <= self.nodes.len() => {
                    current = *target;
                    hops += 1;
                }
                _ => break,
            }
        }
        current
    }
}
