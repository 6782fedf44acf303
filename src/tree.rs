use crate::cfg::ReduceOp;
use crate::error::Rejected;
use crate::grammar::{Grammar, GrammarNode, NodeId};
use crate::util::Code;
use ptree::TreeItem;
use std::any::Any;
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

#[derive(Clone)]
/// The value carried by a [ParseTree] node.
pub enum TreeValue {
    /// A slice of the input; the bytes are `input[start..end]` of the owning node.
    Bytes,
    /// A matched literal.
    Token(Vec<u8>),
    /// An ordered list of child trees. The GLR backend also uses this shape for
    /// ambiguity nodes, whose children are the surviving alternatives.
    Sequence(Vec<ParseTree>),
    /// An unsigned integer produced by a semantic action.
    Uint(u64),
    /// A signed integer produced by a semantic action.
    Sint(i64),
    /// An opaque value produced by a semantic action.
    User(Rc<dyn Any>),
}

#[derive(Clone)]
/// One node of the tree a successful parse returns.
///
/// Every node records the byte range `[start, end)` it consumed and the grammar
/// node that produced it.
pub struct ParseTree {
    pub value: TreeValue,
    pub start: usize,
    pub end: usize,
    pub node: NodeId,
}

impl ParseTree {
    pub fn new(value: TreeValue, start: usize, end: usize, node: NodeId) -> Self {
        Self {
            value,
            start,
            end,
            node,
        }
    }

    /// An empty [Sequence](TreeValue::Sequence) node.
    pub(crate) fn empty(start: usize, end: usize, node: NodeId) -> Self {
        Self::new(TreeValue::Sequence(Vec::new()), start, end, node)
    }

    /// The children of a [Sequence](TreeValue::Sequence) node, empty for leaves.
    pub fn children(&self) -> &[ParseTree] {
        match &self.value {
            TreeValue::Sequence(children) => children,
            _ => &[],
        }
    }

    /// The input slice this node consumed.
    pub fn bytes<'c>(&self, code: &Code<'c>) -> &'c [u8] {
        &code.value[self.start..self.end]
    }

    /// Navigate by child indices from this node.
    pub fn at_path(&self, path: &[usize]) -> Option<&ParseTree> {
        let mut current = self;
        for index in path {
            current = current.children().get(*index)?;
        }
        Some(current)
    }

    /// Search through all nested children and return the first matching node.
    pub fn find_tree<TF: Fn(&ParseTree) -> bool>(&self, p: &TF) -> Option<&ParseTree> {
        if p(self) {
            Some(self)
        } else {
            self.children().iter().find_map(|child| child.find_tree(p))
        }
    }

    /// Return all matching nodes in depth first order.
    pub fn list_tree<TF: Fn(&ParseTree) -> bool>(&self, p: &TF) -> Vec<&ParseTree> {
        let mut list: Vec<&ParseTree> = Vec::new();
        self.walk_tree(&mut |tree| {
            if p(tree) {
                list.push(tree);
            }
        });
        list
    }

    fn walk_tree<'this, TF: FnMut(&'this Self)>(&'this self, f: &mut TF) {
        f(self);
        self.children().iter().for_each(|child| child.walk_tree(f));
    }

    /// Structural equality: equal ranges and equal values throughout.
    /// [User](TreeValue::User) values compare by pointer identity.
    pub fn structural_eq(&self, other: &ParseTree) -> bool {
        if self.start != other.start || self.end != other.end {
            return false;
        }
        match (&self.value, &other.value) {
            (TreeValue::Bytes, TreeValue::Bytes) => true,
            (TreeValue::Token(a), TreeValue::Token(b)) => a == b,
            (TreeValue::Uint(a), TreeValue::Uint(b)) => a == b,
            (TreeValue::Sint(a), TreeValue::Sint(b)) => a == b,
            (TreeValue::User(a), TreeValue::User(b)) => Rc::ptr_eq(a, b),
            (TreeValue::Sequence(a), TreeValue::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            _ => false,
        }
    }

    pub fn print(&self) -> Result<(), std::io::Error> {
        ptree::print_tree(self)
    }
}

impl Debug for TreeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeValue::Bytes => write!(f, "Bytes"),
            TreeValue::Token(bytes) => write!(f, "Token({:?})", String::from_utf8_lossy(bytes)),
            TreeValue::Sequence(_) => write!(f, "Sequence"),
            TreeValue::Uint(n) => write!(f, "Uint({})", n),
            TreeValue::Sint(n) => write!(f, "Sint({})", n),
            TreeValue::User(_) => write!(f, "User"),
        }
    }
}

impl Debug for ParseTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug_struct = f.debug_struct("ParseTree");
        debug_struct
            .field("value", &self.value)
            .field("start", &self.start)
            .field("end", &self.end);
        if !self.children().is_empty() {
            debug_struct.field("children", &self.children());
        }
        debug_struct.finish()
    }
}

impl TreeItem for ParseTree {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{:?} # {}-{}", self.value, self.start, self.end)
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(ParseTree::children(self))
    }
}

/// Assemble the value of a completed production.
///
/// All table driven backends funnel their reductions through here so that a
/// grammar accepted by several backends yields structurally identical trees.
/// `children` holds one slot per right hand side symbol; hidden results are [None].
pub(crate) fn reduce(
    grammar: &Grammar,
    code: &Code,
    op: ReduceOp,
    origin: NodeId,
    mut children: Vec<Option<ParseTree>>,
    start: usize,
    end: usize,
) -> Result<Option<ParseTree>, Rejected> {
    let tree = match op {
        ReduceOp::Leaf => {
            let value = match grammar.node(origin) {
                GrammarNode::Token(literal) => TreeValue::Token(literal.clone()),
                _ => TreeValue::Bytes,
            };
            Some(ParseTree::new(value, start, end, origin))
        }
        ReduceOp::Zero => None,
        ReduceOp::Forward => children.into_iter().flatten().next(),
        ReduceOp::Collect => {
            let collected: Vec<ParseTree> = children.into_iter().flatten().collect();
            Some(ParseTree::new(
                TreeValue::Sequence(collected),
                start,
                end,
                origin,
            ))
        }
        ReduceOp::RepNil => Some(ParseTree::empty(start, end, origin)),
        ReduceOp::RepOne => {
            let collected: Vec<ParseTree> = children.into_iter().flatten().collect();
            Some(ParseTree::new(
                TreeValue::Sequence(collected),
                start,
                end,
                origin,
            ))
        }
        ReduceOp::RepCons => {
            // The last slot is the already collected tail of the repetition.
            let rest = children.pop().and_then(|rest| rest);
            let mut collected: Vec<ParseTree> = children.into_iter().flatten().collect();
            if let Some(rest) = rest {
                match rest.value {
                    TreeValue::Sequence(more) => collected.extend(more),
                    _ => collected.push(rest),
                }
            }
            Some(ParseTree::new(
                TreeValue::Sequence(collected),
                start,
                end,
                origin,
            ))
        }
        ReduceOp::Action => {
            let child = children
                .into_iter()
                .flatten()
                .next()
                .unwrap_or_else(|| ParseTree::empty(start, end, origin));
            let action = match grammar.node(origin) {
                GrammarNode::Action { action, .. } => action,
                _ => panic!("Bug! Action reduction for a non action node."),
            };
            let value = (**action)(child, code)?;
            Some(ParseTree::new(value, start, end, origin))
        }
        ReduceOp::Attr => {
            let child = children
                .into_iter()
                .flatten()
                .next()
                .unwrap_or_else(|| ParseTree::empty(start, end, origin));
            let pred = match grammar.node(origin) {
                GrammarNode::Attr { pred, .. } => pred,
                _ => panic!("Bug! Attribute reduction for a non attribute node."),
            };
            if !(**pred)(&child, code) {
                return Err(Rejected);
            }
            Some(child)
        }
        ReduceOp::Discard => None,
    };
    Ok(tree)
}
