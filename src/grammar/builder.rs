use super::{AttributePredicate, ByteSet, Grammar, GrammarNode, NodeId, SemanticAction};
use crate::error::Rejected;
use crate::tree::{ParseTree, TreeValue};
use crate::util::Code;
use once_cell::unsync::OnceCell;
use std::any::Any;
use std::rc::Rc;

/// The builder through which a grammar graph is assembled.
///
/// Every constructor appends one node to the pool and returns its [NodeId].
/// Children are passed by id, so shared sub-grammars are expressed by reusing
/// the id; the desugaring into the normalized grammar preserves that sharing.
///
/// # Example
/// ```
/// use polygram::{GrammarBuilder, Parser};
///
/// let mut g = GrammarBuilder::new();
/// let digit = g.class("0-9").unwrap();
/// let digits = g.many1(digit);
/// let number = g.label(digits, "number");
///
/// let parser = Parser::new(g, number).unwrap();
/// let tree = parser.parse(b"2048").unwrap();
/// assert_eq!((tree.start, tree.end), (0, 4));
/// ```
pub struct GrammarBuilder {
    nodes: Vec<GrammarNode>,
    labels: Vec<Option<&'static str>>,
    user_data: Vec<Option<Rc<dyn Any>>>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            labels: Vec::new(),
            user_data: Vec::new(),
        }
    }

    fn push(&mut self, node: GrammarNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.labels.push(None);
        self.user_data.push(None);
        id
    }

    /// A literal byte string terminal.
    pub fn token(&mut self, literal: impl AsRef<[u8]>) -> NodeId {
        let bytes = literal.as_ref().to_vec();
        assert!(
            !bytes.is_empty(),
            "A token literal should not be empty. Use 'epsilon' instead."
        );
        self.push(GrammarNode::Token(bytes))
    }

    /// A single byte terminal.
    pub fn ch(&mut self, byte: u8) -> NodeId {
        self.push(GrammarNode::CharSet(ByteSet::single(byte)))
    }

    /// A terminal matching one byte out of `set`.
    pub fn charset(&mut self, set: ByteSet) -> NodeId {
        self.push(GrammarNode::CharSet(set))
    }

    /// A terminal matching one byte in the inclusive range `low..=high`.
    pub fn range(&mut self, low: u8, high: u8) -> NodeId {
        self.push(GrammarNode::CharSet(ByteSet::range(low, high)))
    }

    /// A terminal built from a regex character class body, e.g. `"0-9a-fA-F"`.
    pub fn class(&mut self, pattern: &str) -> Result<NodeId, regex::Error> {
        let set = ByteSet::class(pattern)?;
        Ok(self.push(GrammarNode::CharSet(set)))
    }

    /// A terminal accepting one arbitrary byte.
    pub fn any(&mut self) -> NodeId {
        self.push(GrammarNode::Anything)
    }

    /// Matches only at the end of the input, consuming nothing.
    pub fn end(&mut self) -> NodeId {
        self.push(GrammarNode::End)
    }

    /// A grammar which never matches.
    pub fn nothing(&mut self) -> NodeId {
        self.push(GrammarNode::Nothing)
    }

    /// A grammar matching the empty string.
    pub fn epsilon(&mut self) -> NodeId {
        self.push(GrammarNode::Epsilon)
    }

    pub fn sequence(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(GrammarNode::Sequence(items))
    }

    pub fn choice(&mut self, alternatives: Vec<NodeId>) -> NodeId {
        self.push(GrammarNode::Choice(alternatives))
    }

    pub fn optional(&mut self, child: NodeId) -> NodeId {
        self.push(GrammarNode::Optional(child))
    }

    pub fn many(&mut self, child: NodeId) -> NodeId {
        self.push(GrammarNode::Many(child))
    }

    pub fn many1(&mut self, child: NodeId) -> NodeId {
        self.push(GrammarNode::Many1(child))
    }

    pub fn sep_by(&mut self, item: NodeId, sep: NodeId) -> NodeId {
        self.push(GrammarNode::SepBy { item, sep })
    }

    pub fn sep_by1(&mut self, item: NodeId, sep: NodeId) -> NodeId {
        self.push(GrammarNode::SepBy1 { item, sep })
    }

    /// Zero width negative lookahead. Accepted by the packrat backend only.
    pub fn not_followed_by(&mut self, child: NodeId) -> NodeId {
        self.push(GrammarNode::NotFollowedBy(child))
    }

    /// Zero width positive lookahead. Accepted by the packrat backend only.
    pub fn followed_by(&mut self, child: NodeId) -> NodeId {
        self.push(GrammarNode::FollowedBy(child))
    }

    /// A late bound placeholder for a recursive grammar. Bind it exactly once
    /// with [bind](GrammarBuilder::bind) before creating the parser.
    pub fn indirect(&mut self) -> NodeId {
        self.push(GrammarNode::Indirect(OnceCell::new()))
    }

    /// Bind an [indirect](GrammarBuilder::indirect) placeholder to its grammar.
    pub fn bind(&mut self, indirect: NodeId, target: NodeId) -> Result<(), String> {
        match &self.nodes[indirect.0] {
            GrammarNode::Indirect(cell) => cell.set(target).map_err(|previous| {
                format!(
                    "Indirect node {:?} is already bound to {:?}.",
                    indirect, previous
                )
            }),
            other => Err(format!(
                "Node {:?} is a {} node; only indirect nodes can be bound.",
                indirect,
                other.kind_name()
            )),
        }
    }

    /// Wrap `child` with a semantic function producing the value of this node.
    pub fn action<F>(&mut self, child: NodeId, action: F) -> NodeId
    where
        F: Fn(ParseTree, &Code) -> Result<TreeValue, Rejected> + 'static,
    {
        let action: SemanticAction = Rc::new(action);
        self.push(GrammarNode::Action { child, action })
    }

    /// Wrap `child` with a predicate; a `false` verdict fails the match.
    pub fn attr<F>(&mut self, child: NodeId, pred: F) -> NodeId
    where
        F: Fn(&ParseTree, &Code) -> bool + 'static,
    {
        let pred: AttributePredicate = Rc::new(pred);
        self.push(GrammarNode::Attr { child, pred })
    }

    /// Parse `child` but drop its result from the surrounding tree.
    pub fn ignore(&mut self, child: NodeId) -> NodeId {
        self.push(GrammarNode::Ignore(child))
    }

    /// Assign a label used in grammar listings and error reports. Returns `id` back.
    pub fn label(&mut self, id: NodeId, label: &'static str) -> NodeId {
        self.labels[id.0] = Some(label);
        id
    }

    /// Attach opaque user data to a node.
    pub fn set_user_data(&mut self, id: NodeId, data: Rc<dyn Any>) {
        self.user_data[id.0] = Some(data);
    }

    /// Freeze the pool. Called by [Parser::new](crate::Parser::new), which also
    /// validates that every indirect node has been bound.
    pub(crate) fn into_grammar(self) -> Grammar {
        Grammar::new(self.nodes, self.labels, self.user_data)
    }

    pub(crate) fn unbound_indirect(&self) -> Option<NodeId> {
        self.nodes.iter().enumerate().find_map(|(index, node)| {
            if matches!(node, GrammarNode::Indirect(cell) if cell.get().is_none()) {
                Some(NodeId(index))
            } else {
                None
            }
        })
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}
