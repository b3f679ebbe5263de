//! The LDAPv3 string representation of distinguished names, RFC 2253
//! section 3.
//!
//! ```text
//! name           = name-component *("," name-component)
//! name-component = attribute *("+" attribute)
//! attribute      = key "=" [string]
//! key            = ALPHA *keychar / oid
//! keychar        = ALPHA / DIGIT / "-"
//! oid            = 1*DIGIT *("." 1*DIGIT)
//! string         = 1*(stringchar / pair)
//!                / QUOTATION *(quotechar / pair) QUOTATION
//!                / "#" hexstring
//! quotechar      = <any character except "\" or QUOTATION>
//! special        = "," / "=" / "+" / "<" / ">" / "#" / ";"
//! pair           = "\" (special / "\" / QUOTATION / hexpair)
//! stringchar     = <any character except special or "\" or QUOTATION>
//! hexstring      = 1*hexpair
//! hexpair        = hexchar hexchar
//! ```
//!
//! The empty DN is accepted by the typed layer, not by `name`.  The LDIF
//! grammar borrows its notion of a distinguished name from here only as
//! opaque text.

use std::sync::OnceLock;

use abnf_engine::{
    alt, concat, literal, one, optional, plus, range, star, Expr, Grammar, GrammarBuilder,
    GrammarError, RuleKind,
};

pub fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| build().expect("RFC 2253 grammar defines every rule"))
}

fn build() -> Result<Grammar, GrammarError> {
    use RuleKind::{Node, Token};

    let mut g = GrammarBuilder::new("rfc2253");

    let alpha = g.rule("ALPHA", Token, alt([range('A', 'Z'), range('a', 'z')]));
    let keychar = g.rule(
        "keychar",
        Token,
        alt([range('A', 'Z'), range('a', 'z'), range('0', '9'), one('-')]),
    );
    let oid = g.rule(
        "oid",
        Token,
        concat([
            plus(range('0', '9')),
            star(concat([one('.'), plus(range('0', '9'))])),
        ]),
    );
    let key = g.rule(
        "key",
        Node,
        alt([concat([alpha.into(), star(keychar)]), oid.into()]),
    );

    let special = g.rule(
        "special",
        Token,
        alt([
            one(','),
            one('='),
            one('+'),
            one('<'),
            one('>'),
            one('#'),
            one(';'),
        ]),
    );
    let hexpair = g.rule("hexpair", Token, concat([hexchar(), hexchar()]));
    let hexstring = g.rule("hexstring", Node, plus(hexpair));
    let pair = g.rule(
        "pair",
        Node,
        concat([
            literal("\\"),
            alt([
                special.into(),
                literal("\\"),
                literal("\""),
                hexpair.into(),
            ]),
        ]),
    );
    let stringchar = g.rule(
        "stringchar",
        Token,
        alt([
            range('\u{0}', '\u{21}'),
            range('\u{24}', '\u{2A}'),
            range('\u{2D}', '\u{3A}'),
            range('\u{3F}', '\u{5B}'),
            range('\u{5D}', char::MAX),
        ]),
    );
    let quotechar = g.rule(
        "quotechar",
        Token,
        alt([
            range('\u{0}', '\u{21}'),
            range('\u{23}', '\u{5B}'),
            range('\u{5D}', char::MAX),
        ]),
    );

    let string = g.rule(
        "string",
        Node,
        alt([
            plus(alt([stringchar.into(), pair.into()])),
            concat([
                literal("\""),
                star(alt([quotechar.into(), pair.into()])),
                literal("\""),
            ]),
            concat([literal("#"), hexstring.into()]),
        ]),
    );

    let attribute = g.rule(
        "attribute",
        Node,
        concat([key.into(), literal("="), optional(string)]),
    );
    let name_component = g.rule(
        "name-component",
        Node,
        concat([
            attribute.into(),
            star(concat([literal("+"), attribute.into()])),
        ]),
    );
    let name = g.rule(
        "name",
        Node,
        concat([
            name_component.into(),
            star(concat([literal(","), name_component.into()])),
        ]),
    );

    g.build(name)
}

fn hexchar() -> Expr {
    alt([range('0', '9'), range('A', 'F'), range('a', 'f')])
}
