//! Parse trees and the query layer.
//!
//! A [`Tree`] owns the parsed input together with the root [`Node`].  All
//! queries go through [`NodeRef`], a copyable (input, node) pair, so that
//! `text()` can be answered without nodes holding on to the input.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;

use crate::error::QueryError;
use crate::scanner::Position;

/// A rule-labelled node covering `span` of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) rule: &'static str,
    pub(crate) span: Range<Position>,
    pub(crate) children: Vec<Node>,
}

impl Node {
    pub(crate) fn leaf(rule: &'static str, span: Range<Position>) -> Node {
        Node {
            rule,
            span,
            children: Vec::new(),
        }
    }

    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn span(&self) -> Range<Position> {
        self.span.clone()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// The result of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    input: Vec<char>,
    root: Node,
}

impl Tree {
    pub(crate) fn new(input: Vec<char>, root: Node) -> Tree {
        Tree { input, root }
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            input: &self.input,
            node: &self.root,
        }
    }

    /// First node labelled `rule` in document order, the root included.
    pub fn first(&self, rule: &str) -> Option<NodeRef<'_>> {
        self.root().first(rule)
    }

    /// Every node labelled `rule`, in document order.
    pub fn all<'t, 'r>(&'t self, rule: &'r str) -> Select<'t, 'r> {
        self.root().all(rule)
    }

    pub fn require(&self, rule: &str) -> Result<NodeRef<'_>, QueryError> {
        self.root().require(rule)
    }

    pub fn into_root(self) -> Node {
        self.root
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn dump(f: &mut fmt::Formatter<'_>, node: NodeRef<'_>, depth: usize) -> fmt::Result {
            let span = node.span();
            write!(f, "{:indent$}{} {}..{}", "", node.rule(), span.start, span.end, indent = depth * 2)?;
            if node.node.children.is_empty() {
                write!(f, " {:?}", node.text())?;
            }
            writeln!(f)?;
            for child in node.children() {
                dump(f, child, depth + 1)?;
            }
            Ok(())
        }
        dump(f, self.root(), 0)
    }
}

// ---------------------------------------------------------------------------
// NodeRef
// ---------------------------------------------------------------------------

/// A node together with the input it was parsed from.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'t> {
    input: &'t [char],
    node: &'t Node,
}

impl<'t> NodeRef<'t> {
    pub fn rule(&self) -> &'static str {
        self.node.rule
    }

    pub fn span(&self) -> Range<Position> {
        self.node.span.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.node.span.is_empty()
    }

    pub fn node(&self) -> &'t Node {
        self.node
    }

    /// The covered input.
    pub fn text(&self) -> String {
        self.input[self.node.span.clone()].iter().collect()
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'t>> + 't {
        let input = self.input;
        self.node
            .children
            .iter()
            .map(move |node| NodeRef { input, node })
    }

    /// First direct child labelled `rule`.
    pub fn child(&self, rule: &str) -> Option<NodeRef<'t>> {
        self.children().find(|c| c.rule() == rule)
    }

    /// Pre-order walk starting with this node.
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants {
            input: self.input,
            stack: vec![self.node],
        }
    }

    pub fn first(&self, rule: &str) -> Option<NodeRef<'t>> {
        self.descendants().find(|n| n.rule() == rule)
    }

    pub fn all<'r>(&self, rule: &'r str) -> Select<'t, 'r> {
        Select {
            inner: self.descendants(),
            rule,
        }
    }

    pub fn require(&self, rule: &str) -> Result<NodeRef<'t>, QueryError> {
        self.first(rule).ok_or_else(|| QueryError::NotFound {
            rule: rule.to_string(),
            parent: self.rule(),
        })
    }

    /// The structure of the subtree as an s-expression of rule names, e.g.
    /// `(name (name-component (attribute ...)))`.
    pub fn shape(&self) -> String {
        let mut out = String::new();
        self.write_shape(&mut out);
        out
    }

    fn write_shape(&self, out: &mut String) {
        if self.node.children.is_empty() {
            out.push_str(self.rule());
            return;
        }
        out.push('(');
        out.push_str(self.rule());
        for child in self.children() {
            out.push(' ');
            child.write_shape(out);
        }
        out.push(')');
    }
}

/// Pre-order iterator over a subtree.
#[derive(Debug, Clone)]
pub struct Descendants<'t> {
    input: &'t [char],
    stack: Vec<&'t Node>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(NodeRef {
            input: self.input,
            node,
        })
    }
}

impl FusedIterator for Descendants<'_> {}

/// Nodes of a subtree carrying a given label, in document order.
#[derive(Debug, Clone)]
pub struct Select<'t, 'r> {
    inner: Descendants<'t>,
    rule: &'r str,
}

impl<'t> Iterator for Select<'t, '_> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let rule = self.rule;
        self.inner.find(|n| n.rule() == rule)
    }
}

impl FusedIterator for Select<'_, '_> {}
