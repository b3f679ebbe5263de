//! The grammar interpreter.
//!
//! A top-down, depth-first walk of the [`Expr`] tree.  Every matching
//! function takes a start position and an output vector and returns the end
//! position on success.  On failure it returns `Ok(None)` and leaves the
//! output vector exactly as it found it, which is all the backtracking
//! ordered choice needs.

use crate::error::{Diagnostic, ParseError};
use crate::grammar::{Expr, Grammar, RuleId, RuleKind};
use crate::scanner::{Position, Scanner};
use crate::tree::{Node, Tree};

/// A repetition that matched without consuming input.
struct Stalled {
    rule: &'static str,
    position: Position,
}

type Step = Result<Option<Position>, Stalled>;

struct Matcher<'g, 'i> {
    grammar: &'g Grammar,
    input: &'i [char],
    /// Names of the rules currently being matched, innermost last.
    active: Vec<&'static str>,
    furthest: Position,
    furthest_rule: &'static str,
    expected: Vec<&'static str>,
}

impl<'g, 'i> Matcher<'g, 'i> {
    fn new(grammar: &'g Grammar, input: &'i [char]) -> Self {
        Matcher {
            grammar,
            input,
            active: Vec::new(),
            furthest: 0,
            furthest_rule: grammar.rule(grammar.start()).name(),
            expected: Vec::new(),
        }
    }

    fn scanner(&self, pos: Position) -> Scanner<'i> {
        Scanner::new(self.input).at(pos)
    }

    /// Record a terminal failure for diagnostics.
    fn missed(&mut self, pos: Position, literal: Option<&'static str>) {
        if pos < self.furthest {
            return;
        }
        if pos > self.furthest {
            self.furthest = pos;
            self.expected.clear();
        }
        if let Some(&rule) = self.active.last() {
            self.furthest_rule = rule;
        }
        if let Some(text) = literal {
            if !self.expected.contains(&text) {
                self.expected.push(text);
            }
        }
    }

    fn match_expr(&mut self, expr: &'g Expr, pos: Position, out: &mut Vec<Node>) -> Step {
        match expr {
            Expr::Literal {
                text,
                chars,
                case_sensitive,
            } => match self.scanner(pos).accept_chars(chars, *case_sensitive) {
                Some(next) => {
                    let end = next.position();
                    out.push(Node::leaf(text, pos..end));
                    Ok(Some(end))
                }
                None => {
                    self.missed(pos, Some(text));
                    Ok(None)
                }
            },

            Expr::Range { lo, hi } => match self.scanner(pos).accept(|c| *lo <= c && c <= *hi) {
                Some(next) => Ok(Some(next.position())),
                None => {
                    self.missed(pos, None);
                    Ok(None)
                }
            },

            Expr::Concat(items) => {
                let mark = out.len();
                let mut at = pos;
                for item in items {
                    match self.match_expr(item, at, out)? {
                        Some(next) => at = next,
                        None => {
                            out.truncate(mark);
                            return Ok(None);
                        }
                    }
                }
                Ok(Some(at))
            }

            Expr::Alternation(items) => {
                for item in items {
                    if let Some(end) = self.match_expr(item, pos, out)? {
                        return Ok(Some(end));
                    }
                }
                Ok(None)
            }

            Expr::Repeat { min, max, expr } => {
                let mark = out.len();
                let mut at = pos;
                let mut count = 0;
                while max.map_or(true, |max| count < max) {
                    match self.match_expr(expr, at, out)? {
                        Some(next) if next == at => {
                            return Err(Stalled {
                                rule: self.active.last().copied().unwrap_or(""),
                                position: at,
                            });
                        }
                        Some(next) => {
                            at = next;
                            count += 1;
                        }
                        None => break,
                    }
                }
                if count < *min {
                    out.truncate(mark);
                    return Ok(None);
                }
                Ok(Some(at))
            }

            Expr::Optional(expr) => Ok(Some(self.match_expr(expr, pos, out)?.unwrap_or(pos))),

            Expr::Rule(id) => self.match_rule(*id, pos, out),
        }
    }

    fn match_rule(&mut self, id: RuleId, pos: Position, out: &mut Vec<Node>) -> Step {
        let rule = self.grammar.rule(id);
        self.active.push(rule.name());
        let mark = out.len();
        let step = self.match_expr(rule.body(), pos, out);
        self.active.pop();

        let end = match step? {
            Some(end) => end,
            None => return Ok(None),
        };

        match rule.kind() {
            RuleKind::Transparent => {}
            RuleKind::Token => {
                out.truncate(mark);
                out.push(Node::leaf(rule.name(), pos..end));
            }
            RuleKind::Node => {
                let children = out.split_off(mark);
                debug_assert!(
                    covers(&children, pos, end),
                    "children of `{}` do not cover {}..{}",
                    rule.name(),
                    pos,
                    end
                );
                out.push(Node {
                    rule: rule.name(),
                    span: pos..end,
                    children,
                });
            }
        }
        Ok(Some(end))
    }

    fn diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            self.input,
            self.furthest,
            self.furthest_rule,
            self.expected.clone(),
        )
    }
}

/// Children, when present, tile the parent span without gaps.
fn covers(children: &[Node], start: Position, end: Position) -> bool {
    if children.is_empty() {
        return true;
    }
    let mut at = start;
    for child in children {
        if child.span.start != at {
            return false;
        }
        at = child.span.end;
    }
    at == end
}

impl Grammar {
    /// Parse `input` with the start rule.
    pub fn parse(&self, input: &str) -> Result<Tree, ParseError> {
        self.parse_chars(input.chars().collect())
    }

    pub fn parse_chars(&self, input: Vec<char>) -> Result<Tree, ParseError> {
        self.parse_rule(self.start(), input)
    }

    /// Parse the whole of `input` with `rule`.  The resulting root is
    /// labelled with the rule name whatever the rule's kind.
    pub fn parse_rule(&self, rule: RuleId, input: Vec<char>) -> Result<Tree, ParseError> {
        let start = self.rule(rule).name();
        let mut matcher = Matcher::new(self, &input);
        matcher.furthest_rule = start;
        matcher.active.push(start);

        let mut children = Vec::new();
        let step = matcher.match_expr(self.rule(rule).body(), 0, &mut children);
        matcher.active.pop();

        let end = match step {
            Err(Stalled { rule, position }) => {
                tracing::debug!(grammar = self.name(), rule, position, "non-progressing repetition");
                return Err(ParseError::StructuralViolation { rule, position });
            }
            Ok(None) => {
                let diagnostic = matcher.diagnostic();
                tracing::debug!(
                    grammar = self.name(),
                    start,
                    furthest = diagnostic.position,
                    "no match"
                );
                return Err(ParseError::NoMatch { start, diagnostic });
            }
            Ok(Some(end)) => end,
        };

        if end != input.len() {
            // The failure that stopped the match may lie before `end` when
            // an optional tail was abandoned; report the furthest point.
            matcher.missed(end, None);
            let diagnostic = matcher.diagnostic();
            tracing::debug!(
                grammar = self.name(),
                start,
                consumed = end,
                length = input.len(),
                "incomplete parse"
            );
            return Err(ParseError::IncompleteParse {
                start,
                consumed: end,
                length: input.len(),
                diagnostic,
            });
        }

        tracing::debug!(grammar = self.name(), start, length = end, "parsed");

        if self.rule(rule).kind() == RuleKind::Token {
            children.clear();
        }
        let root = Node {
            rule: start,
            span: 0..end,
            children,
        };
        Ok(Tree::new(input, root))
    }

    /// Whether `rule_name` matches the whole of `input`.  Unknown rules
    /// match nothing.
    pub fn matches(&self, rule_name: &str, input: &str) -> bool {
        match self.rule_id(rule_name) {
            Some(id) => self.parse_rule(id, input.chars().collect()).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::*;
    use crate::ParseError;

    // list := item *("," item)
    // item := 1*%x61-7A
    fn list_grammar() -> Grammar {
        let mut g = GrammarBuilder::new("list");
        let item = g.rule("item", RuleKind::Token, plus(range('a', 'z')));
        let list = g.rule(
            "list",
            RuleKind::Node,
            concat([item.into(), star(concat([literal(","), item.into()]))]),
        );
        g.build(list).unwrap()
    }

    // ── Group 1: terminals ────────────────────────────────────────

    #[test]
    fn literal_produces_labelled_leaf() {
        let tree = list_grammar().parse("ab,c").unwrap();
        let comma = tree.first(",").unwrap();
        assert_eq!(comma.span(), 2..3);
        assert_eq!(tree.root().shape(), "(list item , item)");
    }

    #[test]
    fn range_accepts_beyond_ascii() {
        let mut g = GrammarBuilder::new("t");
        let any = g.rule("any", RuleKind::Token, range('\u{80}', char::MAX));
        let grammar = g.build(any).unwrap();
        assert!(grammar.matches("any", "é"));
        assert!(grammar.matches("any", "\u{10FFFF}"));
        assert!(!grammar.matches("any", "e"));
    }

    // ── Group 2: concatenation and choice ─────────────────────────

    #[test]
    fn concat_failure_consumes_nothing() {
        // pair := "a" "b" / "a" "c"
        let mut g = GrammarBuilder::new("t");
        let pair = g.rule(
            "pair",
            RuleKind::Node,
            alt([
                concat([literal("a"), literal("b")]),
                concat([literal("a"), literal("c")]),
            ]),
        );
        let tree = g.build(pair).unwrap().parse("ac").unwrap();
        assert_eq!(tree.root().shape(), "(pair a c)");
    }

    #[test]
    fn first_alternative_wins() {
        // word := "ab" / "abc" -- "abc" never gets a chance at the start
        let mut g = GrammarBuilder::new("t");
        let word = g.rule("word", RuleKind::Node, alt([literal("ab"), literal("abc")]));
        let grammar = g.build(word).unwrap();
        assert!(grammar.matches("word", "ab"));
        match grammar.parse("abc").unwrap_err() {
            ParseError::IncompleteParse { consumed, length, .. } => {
                assert_eq!(consumed, 2);
                assert_eq!(length, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transparent_rule_splices_children() {
        let mut g = GrammarBuilder::new("t");
        let digit = g.rule("digit", RuleKind::Token, range('0', '9'));
        let pair = g.rule("pair", RuleKind::Transparent, concat([digit.into(), digit.into()]));
        let top = g.rule("top", RuleKind::Node, plus(pair));
        let tree = g.build(top).unwrap().parse("1234").unwrap();
        assert_eq!(tree.root().shape(), "(top digit digit digit digit)");
    }

    // ── Group 3: repetition ───────────────────────────────────────

    #[test]
    fn repeat_respects_bounds() {
        let mut g = GrammarBuilder::new("t");
        let x = g.rule("x", RuleKind::Token, one('x'));
        let two_to_three = g.rule("xs", RuleKind::Node, repeat(2, Some(3), x));
        let grammar = g.build(two_to_three).unwrap();
        assert!(!grammar.matches("xs", "x"));
        assert!(grammar.matches("xs", "xx"));
        assert!(grammar.matches("xs", "xxx"));
        assert!(!grammar.matches("xs", "xxxx"));
    }

    #[test]
    fn repeat_is_greedy_without_giving_back() {
        // greedy := *"a" "a" never matches: the star eats every "a"
        let mut g = GrammarBuilder::new("t");
        let greedy = g.rule("greedy", RuleKind::Node, concat([star(literal("a")), literal("a")]));
        let grammar = g.build(greedy).unwrap();
        assert!(!grammar.matches("greedy", "aaa"));
    }

    #[test]
    fn non_progressing_repeat_is_a_violation() {
        let mut g = GrammarBuilder::new("t");
        let bad = g.rule("bad", RuleKind::Node, star(optional(literal("x"))));
        let err = g.build(bad).unwrap().parse("y").unwrap_err();
        assert_eq!(
            err,
            ParseError::StructuralViolation {
                rule: "bad",
                position: 0
            }
        );
    }

    // ── Group 4: optional and empty matches ───────────────────────

    #[test]
    fn empty_rule_match_keeps_zero_width_node() {
        let mut g = GrammarBuilder::new("t");
        let fill = g.rule("fill", RuleKind::Node, star(literal(" ")));
        let top = g.rule("top", RuleKind::Node, concat([fill.into(), literal("x")]));
        let tree = g.build(top).unwrap().parse("x").unwrap();
        let fill = tree.first("fill").unwrap();
        assert!(fill.is_empty());
        assert_eq!(fill.span(), 0..0);
    }

    #[test]
    fn failed_optional_leaves_no_node() {
        let mut g = GrammarBuilder::new("t");
        let sign = g.rule("sign", RuleKind::Token, one('-'));
        let top = g.rule("top", RuleKind::Node, concat([optional(sign), literal("1")]));
        let tree = g.build(top).unwrap().parse("1").unwrap();
        assert!(tree.first("sign").is_none());
    }

    // ── Group 5: recursion ────────────────────────────────────────

    #[test]
    fn recursive_rule_via_forward_declaration() {
        // nest := "(" [nest] ")"
        let mut g = GrammarBuilder::new("t");
        let nest = g.declare("nest", RuleKind::Node);
        g.define(nest, concat([literal("("), optional(nest), literal(")")]));
        let grammar = g.build(nest).unwrap();
        let tree = grammar.parse("((()))").unwrap();
        assert_eq!(tree.all("nest").count(), 3);
        assert!(!grammar.matches("nest", "(()"));
    }

    // ── Group 6: diagnostics ──────────────────────────────────────

    #[test]
    fn no_match_reports_furthest_position() {
        let err = list_grammar().parse(",a").unwrap_err();
        match err {
            ParseError::NoMatch { start, diagnostic } => {
                assert_eq!(start, "list");
                assert_eq!(diagnostic.position, 0);
                assert_eq!(diagnostic.rule, "item");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn incomplete_parse_reports_trailing_input() {
        let err = list_grammar().parse("a,b,\nc;").unwrap_err();
        match err {
            ParseError::IncompleteParse {
                consumed,
                diagnostic,
                ..
            } => {
                assert_eq!(consumed, 3);
                assert_eq!(diagnostic.position, 4);
                assert_eq!(diagnostic.line, 1);
                assert_eq!(diagnostic.column, 5);
                assert_eq!(diagnostic.rule, "item");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_rule_matches_nothing() {
        assert!(!list_grammar().matches("nope", "a"));
    }
}
