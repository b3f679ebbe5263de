//! Grammar definitions: combinator expressions and named rules.
//!
//! A grammar is a table of rules.  Rules refer to each other through
//! [`RuleId`]s handed out by [`GrammarBuilder::declare`], which is how
//! recursive and mutually recursive rules are written without any global
//! mutable state: declare first, define later, `build` once.

use std::collections::HashMap;

use crate::error::GrammarError;

/// Index of a rule inside its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) usize);

/// How a successful match of a rule shows up in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A labelled node whose children are the nodes produced by the body.
    Node,
    /// A labelled leaf.  The body is matched as usual but its nodes are
    /// dropped; only the covered span remains.
    Token,
    /// No node of its own: whatever the body produced is spliced into the
    /// enclosing rule.
    Transparent,
}

/// A combinator expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Exact text.  Produces a leaf labelled with the text itself.
    Literal {
        text: &'static str,
        chars: Box<[char]>,
        case_sensitive: bool,
    },
    /// One character with a code point in `lo..=hi`.  Produces no node.
    Range { lo: char, hi: char },
    Concat(Vec<Expr>),
    /// Ordered choice: the first alternative that matches wins.
    Alternation(Vec<Expr>),
    /// Greedy repetition; `max == None` is unbounded.
    Repeat {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Optional(Box<Expr>),
    Rule(RuleId),
}

impl From<RuleId> for Expr {
    fn from(id: RuleId) -> Expr {
        Expr::Rule(id)
    }
}

/// Case-sensitive literal.
pub fn literal(text: &'static str) -> Expr {
    Expr::Literal {
        text,
        chars: text.chars().collect(),
        case_sensitive: true,
    }
}

/// Case-insensitive literal (ABNF quoted strings).
pub fn keyword(text: &'static str) -> Expr {
    Expr::Literal {
        text,
        chars: text.chars().collect(),
        case_sensitive: false,
    }
}

pub fn range(lo: char, hi: char) -> Expr {
    Expr::Range { lo, hi }
}

/// A single character, without a node of its own.
pub fn one(c: char) -> Expr {
    Expr::Range { lo: c, hi: c }
}

pub fn concat(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Concat(items.into_iter().collect())
}

pub fn alt(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Alternation(items.into_iter().collect())
}

pub fn repeat(min: usize, max: Option<usize>, expr: impl Into<Expr>) -> Expr {
    Expr::Repeat {
        min,
        max,
        expr: Box::new(expr.into()),
    }
}

/// `*expr`
pub fn star(expr: impl Into<Expr>) -> Expr {
    repeat(0, None, expr)
}

/// `1*expr`
pub fn plus(expr: impl Into<Expr>) -> Expr {
    repeat(1, None, expr)
}

/// `[expr]`
pub fn optional(expr: impl Into<Expr>) -> Expr {
    Expr::Optional(Box::new(expr.into()))
}

/// A named rule of a grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: &'static str,
    pub(crate) kind: RuleKind,
    pub(crate) body: Expr,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }
}

/// A finished, immutable rule table with a start rule.
///
/// Grammars hold no per-parse state and are `Send + Sync`; one instance
/// can serve any number of concurrent parses.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: &'static str,
    rules: Vec<Rule>,
    by_name: HashMap<&'static str, RuleId>,
    start: RuleId,
}

impl Grammar {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn start(&self) -> RuleId {
        self.start
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

// ---------------------------------------------------------------------------
// GrammarBuilder
// ---------------------------------------------------------------------------

/// Collects rule declarations and definitions.
#[derive(Debug)]
pub struct GrammarBuilder {
    name: &'static str,
    names: Vec<&'static str>,
    kinds: Vec<RuleKind>,
    bodies: Vec<Option<Expr>>,
}

impl GrammarBuilder {
    pub fn new(name: &'static str) -> Self {
        GrammarBuilder {
            name,
            names: Vec::new(),
            kinds: Vec::new(),
            bodies: Vec::new(),
        }
    }

    /// Reserve a rule so that it can be referenced before it is defined.
    pub fn declare(&mut self, name: &'static str, kind: RuleKind) -> RuleId {
        self.names.push(name);
        self.kinds.push(kind);
        self.bodies.push(None);
        RuleId(self.names.len() - 1)
    }

    /// Give a declared rule its body.  A second definition replaces the
    /// first.
    pub fn define(&mut self, id: RuleId, body: impl Into<Expr>) {
        self.bodies[id.0] = Some(body.into());
    }

    /// Declare and define in one step.
    pub fn rule(&mut self, name: &'static str, kind: RuleKind, body: impl Into<Expr>) -> RuleId {
        let id = self.declare(name, kind);
        self.define(id, body);
        id
    }

    pub fn build(self, start: RuleId) -> Result<Grammar, GrammarError> {
        let mut by_name = HashMap::new();
        let mut rules = Vec::with_capacity(self.names.len());

        for ((name, kind), body) in self.names.into_iter().zip(self.kinds).zip(self.bodies) {
            let body = body.ok_or(GrammarError::Undefined { rule: name })?;
            if by_name.insert(name, RuleId(rules.len())).is_some() {
                return Err(GrammarError::Duplicate { rule: name });
            }
            rules.push(Rule { name, kind, body });
        }

        if start.0 >= rules.len() {
            return Err(GrammarError::UnknownStart);
        }
        for rule in &rules {
            if !references_in_range(&rule.body, rules.len()) {
                return Err(GrammarError::ForeignReference { rule: rule.name });
            }
        }

        tracing::trace!(grammar = self.name, rules = rules.len(), "grammar built");

        Ok(Grammar {
            name: self.name,
            rules,
            by_name,
            start,
        })
    }
}

/// Whether every rule reference in `expr` is below `len`.
fn references_in_range(expr: &Expr, len: usize) -> bool {
    match expr {
        Expr::Literal { .. } | Expr::Range { .. } => true,
        Expr::Concat(items) | Expr::Alternation(items) => {
            items.iter().all(|item| references_in_range(item, len))
        }
        Expr::Repeat { expr, .. } | Expr::Optional(expr) => references_in_range(expr, len),
        Expr::Rule(id) => id.0 < len,
    }
}
