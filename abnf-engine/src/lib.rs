//! A small backtracking grammar engine for ABNF-style grammars.
//!
//! Grammars are built from ordered-choice combinators ([`literal`],
//! [`range`], [`concat`], [`alt`], [`repeat`], [`optional`]) arranged into
//! named rules with a [`GrammarBuilder`].  Parsing a code-point sequence
//! yields a [`Tree`] of rule-labelled nodes that callers query by rule
//! name ([`NodeRef::first`], [`NodeRef::all`], [`NodeRef::text`]).
//!
//! Choice is ordered: the first alternative that matches wins, even if a
//! later one would consume more.  Repetition is greedy and never gives
//! input back.  Grammars must list the more specific alternative first.

mod engine;
pub mod error;
pub mod grammar;
pub mod scanner;
pub mod tree;

pub use error::{Diagnostic, GrammarError, ParseError, QueryError};
pub use grammar::{
    alt, concat, keyword, literal, one, optional, plus, range, repeat, star, Expr, Grammar,
    GrammarBuilder, Rule, RuleId, RuleKind,
};
pub use scanner::{Position, Scanner};
pub use tree::{Descendants, Node, NodeRef, Select, Tree};
