use std::fmt;

use crate::scanner::Position;

/// Where a parse gave up, as far as an ordered-choice parser can tell.
///
/// `position` is the furthest position any terminal was tried at; `rule`
/// is the innermost rule active the last time a terminal failed there and
/// `expected` lists the literal terminals that were tried there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: Position,
    pub line: usize,
    pub column: usize,
    pub rule: &'static str,
    pub expected: Vec<&'static str>,
}

impl Diagnostic {
    pub(crate) fn new(
        input: &[char],
        position: Position,
        rule: &'static str,
        expected: Vec<&'static str>,
    ) -> Diagnostic {
        let (line, column) = locate(input, position);
        Diagnostic {
            position,
            line,
            column,
            rule,
            expected,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}, in `{}`", self.line, self.column, self.rule)?;
        if !self.expected.is_empty() {
            f.write_str(", expected ")?;
            for (i, e) in self.expected.iter().enumerate() {
                if i > 0 {
                    f.write_str(" or ")?;
                }
                write!(f, "{:?}", e)?;
            }
        }
        Ok(())
    }
}

/// 1-based line and column of `position`.
pub fn locate(input: &[char], position: Position) -> (usize, usize) {
    let before = &input[..position.min(input.len())];
    let line = before.iter().filter(|&&c| c == '\n').count() + 1;
    let column = match before.iter().rposition(|&c| c == '\n') {
        Some(nl) => position - nl,
        None => position + 1,
    };
    (line, column)
}

/// Terminal outcome of a failed parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The start rule did not match at all.
    #[error("input does not match `{start}`: {diagnostic}")]
    NoMatch {
        start: &'static str,
        diagnostic: Diagnostic,
    },

    /// The start rule matched, but not the whole input.
    #[error("`{start}` matched only {consumed} of {length} characters: {diagnostic}")]
    IncompleteParse {
        start: &'static str,
        consumed: Position,
        length: usize,
        diagnostic: Diagnostic,
    },

    /// A repetition matched without consuming input.  This is a defect in
    /// the grammar, not in the input.
    #[error("rule `{rule}` repeated without consuming input at position {position}")]
    StructuralViolation {
        rule: &'static str,
        position: Position,
    },
}

impl ParseError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseError::NoMatch { diagnostic, .. } => Some(diagnostic),
            ParseError::IncompleteParse { diagnostic, .. } => Some(diagnostic),
            ParseError::StructuralViolation { .. } => None,
        }
    }

    /// The furthest position reached before giving up.
    pub fn position(&self) -> Position {
        match self {
            ParseError::NoMatch { diagnostic, .. } => diagnostic.position,
            ParseError::IncompleteParse { diagnostic, .. } => diagnostic.position,
            ParseError::StructuralViolation { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("no `{rule}` node below `{parent}`")]
    NotFound { rule: String, parent: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("rule `{rule}` is declared but never defined")]
    Undefined { rule: &'static str },

    #[error("rule `{rule}` is declared twice")]
    Duplicate { rule: &'static str },

    #[error("start rule does not belong to this grammar")]
    UnknownStart,

    #[error("rule `{rule}` refers to a rule from another grammar")]
    ForeignReference { rule: &'static str },
}
