//! The informal distinguished-name syntax of RFC 1779, section 2.3.
//!
//! ```text
//! name            := name-component *(spaced-separator name-component)
//!                    [spaced-separator]
//! spaced-separator:= optional-space separator optional-space
//! separator       := "," / ";"
//! optional-space  := *(" " / CR / LF)
//! name-component  := attribute *(optional-space "+" optional-space attribute)
//! attribute       := key optional-space "=" optional-space [string] / string
//! key             := "OID." oid / 1*keychar
//! keychar         := ALPHA / DIGIT / " "
//! oid             := digitstring *("." digitstring)
//! string          := 1*(stringchar / pair)
//!                  / QUOTATION *(stringchar / special / pair) QUOTATION
//!                  / "#" hexstring
//! special         := "," / "=" / CR / "+" / "<" / ">" / "#" / ";"
//! pair            := "\" (special / "\" / QUOTATION)
//! ```
//!
//! `name` and `name-component` are written as repetitions instead of the
//! right-recursive forms of the RFC, so very long names do not deepen the
//! call stack.  Keys are matched case-insensitively against `OID.`.

use std::sync::OnceLock;

use abnf_engine::{
    alt, concat, keyword, literal, one, optional, plus, range, star, Expr, Grammar,
    GrammarBuilder, GrammarError, RuleKind,
};

/// The RFC 1779 grammar, built on first use.
pub fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| build().expect("RFC 1779 grammar defines every rule"))
}

fn build() -> Result<Grammar, GrammarError> {
    use RuleKind::{Node, Token};

    let mut g = GrammarBuilder::new("rfc1779");

    let optional_space = g.rule(
        "optional-space",
        Token,
        star(alt([one(' '), one('\r'), one('\n')])),
    );
    let separator = g.rule("separator", Node, alt([literal(","), literal(";")]));
    let spaced_separator = g.rule(
        "spaced-separator",
        Node,
        concat([optional_space.into(), separator.into(), optional_space.into()]),
    );

    let keychar = g.rule(
        "keychar",
        Token,
        alt([range('A', 'Z'), range('a', 'z'), range('0', '9'), one(' ')]),
    );
    let digitstring = g.rule("digitstring", Token, plus(range('0', '9')));
    let oid = g.rule(
        "oid",
        Node,
        concat([
            digitstring.into(),
            star(concat([literal("."), digitstring.into()])),
        ]),
    );
    let key = g.rule(
        "key",
        Node,
        alt([concat([keyword("OID."), oid.into()]), plus(keychar)]),
    );

    let special = g.rule(
        "special",
        Token,
        alt([
            one(','),
            one('='),
            one('\r'),
            one('+'),
            one('<'),
            one('>'),
            one('#'),
            one(';'),
        ]),
    );
    let pair = g.rule(
        "pair",
        Node,
        concat([
            literal("\\"),
            alt([special.into(), literal("\\"), literal("\"")]),
        ]),
    );
    // Everything except QUOTATION, "#", ",", "+", ";", "<", "=", ">", "\"
    // and CR.
    let stringchar = g.rule(
        "stringchar",
        Token,
        alt([
            range('\u{0}', '\u{0C}'),
            range('\u{0E}', '\u{21}'),
            range('\u{24}', '\u{2A}'),
            range('\u{2D}', '\u{3A}'),
            range('\u{3F}', '\u{5B}'),
            range('\u{5D}', char::MAX),
        ]),
    );
    let hexpair = g.rule("hexpair", Token, concat([hexchar(), hexchar()]));
    let hexstring = g.rule("hexstring", Node, plus(hexpair));

    // Unquoted first, then quoted, then hex.  None of them can start the
    // way another does, and the unquoted form needs at least one character,
    // so the order never hides a longer match.
    let string = g.rule(
        "string",
        Node,
        alt([
            plus(alt([stringchar.into(), pair.into()])),
            concat([
                literal("\""),
                star(alt([stringchar.into(), special.into(), pair.into()])),
                literal("\""),
            ]),
            concat([literal("#"), hexstring.into()]),
        ]),
    );

    let attribute = g.rule(
        "attribute",
        Node,
        alt([
            concat([
                key.into(),
                optional_space.into(),
                literal("="),
                optional_space.into(),
                optional(string),
            ]),
            string.into(),
        ]),
    );
    let name_component = g.rule(
        "name-component",
        Node,
        concat([
            attribute.into(),
            star(concat([
                optional_space.into(),
                literal("+"),
                optional_space.into(),
                attribute.into(),
            ])),
        ]),
    );
    let name = g.rule(
        "name",
        Node,
        concat([
            name_component.into(),
            star(concat([spaced_separator.into(), name_component.into()])),
            optional(spaced_separator),
        ]),
    );

    g.build(name)
}

fn hexchar() -> Expr {
    alt([range('0', '9'), range('A', 'F'), range('a', 'f')])
}
