//! The LDAP Data Interchange Format, RFC 2849.
//!
//! ```text
//! ldif-file           = ldif-changes / ldif-content
//! ldif-content        = version-spec 1*(separator ldif-attrval-record) [separator]
//! ldif-changes        = version-spec 1*(separator ldif-change-record) [separator]
//! separator           = 1*(SEP / comment)
//! comment             = "#" *SAFE-CHAR SEP
//! ldif-attrval-record = dn-spec SEP 1*attrval-spec
//! ldif-change-record  = dn-spec SEP *control changerecord
//! version-spec        = "version:" FILL version-number
//! dn-spec             = "dn:" (":" FILL base64-distinguishedName
//!                            / FILL distinguishedName)
//! control             = "control:" FILL ldap-oid [criticality] [value-spec] SEP
//! criticality         = 1*SPACE ("true" / "false")
//! ldap-oid            = 1*DIGIT *("." 1*DIGIT)
//! attrval-spec        = *comment AttributeDescription value-spec SEP
//! value-spec          = ":" (":" FILL [base64-string]
//!                           / "<" FILL url
//!                           / FILL [safe-string])
//! AttributeDescription= AttributeType *(";" option)
//! AttributeType       = ldap-oid / ALPHA *(ALPHA / DIGIT / "-")
//! changerecord        = "changetype:" FILL (change-add / change-delete
//!                                          / change-modify / change-moddn)
//! change-add          = "add" SEP 1*attrval-spec
//! change-delete       = "delete" SEP
//! change-modify       = "modify" SEP *mod-spec
//! mod-spec            = ("add:" / "delete:" / "replace:") FILL
//!                       AttributeDescription SEP *attrval-spec "-" SEP
//! change-moddn        = ("modrdn" / "moddn") SEP newrdn deleteoldrdn [newsuperior]
//! newrdn              = "newrdn:" (":" FILL base64-rdn / FILL rdn) SEP
//! deleteoldrdn        = "deleteoldrdn:" FILL ("0" / "1") SEP
//! newsuperior         = "newsuperior:" (":" FILL base64-distinguishedName
//!                                      / FILL distinguishedName) SEP
//! ```
//!
//! Keywords match case-insensitively.  Distinguished names stay opaque here:
//! `distinguishedName` is a SAFE-STRING and a later pass with one of the DN
//! grammars decodes it.
//!
//! Line folding is not part of the grammar; [`unfold`] joins continuation
//! lines before parsing.  Every attribute line, including the last one of
//! the file, must end with a line separator.

use std::borrow::Cow;
use std::sync::OnceLock;

use abnf_engine::{
    alt, concat, keyword, literal, one, optional, plus, range, star, Expr, Grammar,
    GrammarBuilder, GrammarError, ParseError, RuleKind, Tree,
};

pub fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| build().expect("LDIF grammar defines every rule"))
}

/// Parse a complete LDIF document as it stands.
pub fn parse_ldif_file(input: &str) -> Result<Tree, ParseError> {
    grammar().parse(input)
}

/// Join folded lines: a line separator followed by a single space
/// continues the previous line.
pub fn unfold(input: &str) -> Cow<'_, str> {
    if !input.contains("\n ") {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace("\r\n ", "").replace("\n ", ""))
}

/// Unfold and make sure the last line is terminated.
pub fn normalize(input: &str) -> String {
    let mut text = unfold(input).into_owned();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn digit() -> Expr {
    range('0', '9')
}

fn alpha() -> Expr {
    alt([range('A', 'Z'), range('a', 'z')])
}

fn oid_body() -> Expr {
    concat([plus(digit()), star(concat([one('.'), plus(digit())]))])
}

fn build() -> Result<Grammar, GrammarError> {
    use RuleKind::{Node, Token};

    let mut g = GrammarBuilder::new("ldif");

    // Terminals.
    let sep = g.rule(
        "SEP",
        Token,
        alt([concat([one('\r'), one('\n')]), one('\n')]),
    );
    let fill = g.rule("FILL", Token, star(one(' ')));
    let safe_char = g.rule(
        "SAFE-CHAR",
        Token,
        alt([
            range('\u{01}', '\u{09}'),
            range('\u{0B}', '\u{0C}'),
            range('\u{0E}', char::MAX),
        ]),
    );
    let safe_init_char = g.rule(
        "SAFE-INIT-CHAR",
        Token,
        alt([
            range('\u{01}', '\u{09}'),
            range('\u{0B}', '\u{0C}'),
            range('\u{0E}', '\u{1F}'),
            range('\u{21}', '\u{39}'),
            one('\u{3B}'),
            range('\u{3D}', char::MAX),
        ]),
    );
    let safe_string = g.rule(
        "safe-string",
        Token,
        concat([safe_init_char.into(), star(safe_char)]),
    );
    let base64_char = g.rule(
        "BASE64-CHAR",
        Token,
        alt([one('+'), one('/'), digit(), one('='), alpha()]),
    );
    let base64_string = g.rule("base64-string", Token, plus(base64_char));
    let comment = g.rule(
        "comment",
        Token,
        concat([one('#'), star(safe_char), sep.into()]),
    );
    let separator = g.rule("separator", Token, plus(alt([sep.into(), comment.into()])));

    // Opaque names.
    let dn = g.rule("distinguishedName", Token, optional(safe_string));
    let base64_dn = g.rule("base64-distinguishedName", Token, optional(base64_string));
    let rdn = g.rule("rdn", Token, optional(safe_string));
    let base64_rdn = g.rule("base64-rdn", Token, optional(base64_string));

    // Attribute descriptions and values.
    let ldap_oid = g.rule("ldap-oid", Token, oid_body());
    let attribute_type = g.rule(
        "AttributeType",
        Token,
        alt([
            oid_body(),
            concat([alpha(), star(alt([alpha(), digit(), one('-')]))]),
        ]),
    );
    let option = g.rule(
        "option",
        Token,
        plus(alt([alpha(), digit(), one('-')])),
    );
    let attribute_description = g.rule(
        "AttributeDescription",
        Node,
        concat([
            attribute_type.into(),
            star(concat([literal(";"), option.into()])),
        ]),
    );
    let url = g.rule("url", Token, plus(safe_char));
    // "::" and ":<" must be tried before the plain form, which would
    // otherwise match an empty value and stop in front of them.
    let value_spec = g.rule(
        "value-spec",
        Node,
        concat([
            literal(":"),
            alt([
                concat([literal(":"), fill.into(), optional(base64_string)]),
                concat([literal("<"), fill.into(), url.into()]),
                concat([fill.into(), optional(safe_string)]),
            ]),
        ]),
    );
    let attrval_spec = g.rule(
        "attrval-spec",
        Node,
        concat([
            star(comment),
            attribute_description.into(),
            value_spec.into(),
            sep.into(),
        ]),
    );

    let version_number = g.rule("version-number", Token, plus(digit()));
    let version_spec = g.rule(
        "version-spec",
        Node,
        concat([keyword("version:"), fill.into(), version_number.into()]),
    );
    let dn_spec = g.rule(
        "dn-spec",
        Node,
        concat([
            keyword("dn:"),
            alt([
                concat([literal(":"), fill.into(), base64_dn.into()]),
                concat([fill.into(), dn.into()]),
            ]),
        ]),
    );

    let criticality = g.rule(
        "criticality",
        Token,
        concat([plus(one(' ')), alt([keyword("true"), keyword("false")])]),
    );
    let control = g.rule(
        "control",
        Node,
        concat([
            keyword("control:"),
            fill.into(),
            ldap_oid.into(),
            optional(criticality),
            optional(value_spec),
            sep.into(),
        ]),
    );

    // Change records.
    let change_add = g.rule(
        "change-add",
        Node,
        concat([keyword("add"), sep.into(), plus(attrval_spec)]),
    );
    let change_delete = g.rule(
        "change-delete",
        Node,
        concat([keyword("delete"), sep.into()]),
    );
    let mod_spec = g.rule(
        "mod-spec",
        Node,
        concat([
            alt([keyword("add:"), keyword("delete:"), keyword("replace:")]),
            fill.into(),
            attribute_description.into(),
            sep.into(),
            star(attrval_spec),
            literal("-"),
            sep.into(),
        ]),
    );
    let change_modify = g.rule(
        "change-modify",
        Node,
        concat([keyword("modify"), sep.into(), star(mod_spec)]),
    );
    let newrdn = g.rule(
        "newrdn",
        Node,
        concat([
            keyword("newrdn:"),
            alt([
                concat([literal(":"), fill.into(), base64_rdn.into()]),
                concat([fill.into(), rdn.into()]),
            ]),
            sep.into(),
        ]),
    );
    let deleteoldrdn = g.rule(
        "deleteoldrdn",
        Node,
        concat([
            keyword("deleteoldrdn:"),
            fill.into(),
            alt([literal("0"), literal("1")]),
            sep.into(),
        ]),
    );
    let newsuperior = g.rule(
        "newsuperior",
        Node,
        concat([
            keyword("newsuperior:"),
            alt([
                concat([literal(":"), fill.into(), base64_dn.into()]),
                concat([fill.into(), dn.into()]),
            ]),
            sep.into(),
        ]),
    );
    let change_moddn = g.rule(
        "change-moddn",
        Node,
        concat([
            alt([keyword("modrdn"), keyword("moddn")]),
            sep.into(),
            newrdn.into(),
            deleteoldrdn.into(),
            optional(newsuperior),
        ]),
    );
    let changerecord = g.rule(
        "changerecord",
        Node,
        concat([
            keyword("changetype:"),
            fill.into(),
            alt([
                change_add.into(),
                change_delete.into(),
                change_modify.into(),
                change_moddn.into(),
            ]),
        ]),
    );

    // Records and files.
    let attrval_record = g.rule(
        "ldif-attrval-record",
        Node,
        concat([dn_spec.into(), sep.into(), plus(attrval_spec)]),
    );
    let change_record = g.rule(
        "ldif-change-record",
        Node,
        concat([
            dn_spec.into(),
            sep.into(),
            star(control),
            changerecord.into(),
        ]),
    );
    let content = g.rule(
        "ldif-content",
        Node,
        concat([
            version_spec.into(),
            plus(concat([separator.into(), attrval_record.into()])),
            optional(separator),
        ]),
    );
    let changes = g.rule(
        "ldif-changes",
        Node,
        concat([
            version_spec.into(),
            plus(concat([separator.into(), change_record.into()])),
            optional(separator),
        ]),
    );
    // A change record read as content would take "changetype" for an
    // attribute, so the change form goes first.
    let file = g.rule("ldif-file", Node, alt([changes.into(), content.into()]));

    g.build(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_builds() {
        assert!(build().is_ok());
    }

    // ── Group 1: character classes ────────────────────────────────

    #[test]
    fn safe_char() {
        for v in ["\0", "\n", "\r"] {
            assert!(!grammar().matches("SAFE-CHAR", v), "accepted {:?}", v);
        }
        for v in [" ", ":", "<", "a", "~", "\u{7F}", "é", "日"] {
            assert!(grammar().matches("SAFE-CHAR", v), "rejected {:?}", v);
        }
    }

    #[test]
    fn safe_init_char() {
        for v in ["\0", "\n", "\r", " ", ":", "<"] {
            assert!(!grammar().matches("SAFE-INIT-CHAR", v), "accepted {:?}", v);
        }
        for v in ["a", ";", "=", "#", "\t", "é"] {
            assert!(grammar().matches("SAFE-INIT-CHAR", v), "rejected {:?}", v);
        }
    }

    #[test]
    fn attribute_descriptions() {
        for v in ["cn", "ou;lang-ja", "ou;lang-ja;phonetic", "2.5.4.3", "x-my-attr"] {
            assert!(grammar().matches("AttributeDescription", v), "rejected {:?}", v);
        }
        for v in ["-cn", "cn;", "c n", ""] {
            assert!(!grammar().matches("AttributeDescription", v), "accepted {:?}", v);
        }
    }

    // ── Group 2: content records ──────────────────────────────────

    #[test]
    fn minimal_content() {
        let tree = parse_ldif_file("version: 1\n\ndn: cn=a,o=b\ncn: a\n\n").unwrap();
        assert_eq!(tree.all("ldif-attrval-record").count(), 1);
        assert_eq!(tree.require("version-number").unwrap().text(), "1");
        assert_eq!(tree.require("distinguishedName").unwrap().text(), "cn=a,o=b");
        assert!(tree.first("ldif-content").is_some());
    }

    #[test]
    fn value_forms() {
        let input = "version: 1\n\
                     dn: cn=a\n\
                     cn: plain value \n\
                     photo:: AAEC\n\
                     jpegphoto:< file:///tmp/a.jpg\n\
                     description:\n";
        let tree = parse_ldif_file(input).unwrap();
        let values: Vec<_> = tree.all("value-spec").collect();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0].require("safe-string").unwrap().text(), "plain value ");
        assert_eq!(values[1].require("base64-string").unwrap().text(), "AAEC");
        assert_eq!(values[2].require("url").unwrap().text(), "file:///tmp/a.jpg");
        assert!(values[3].first("safe-string").is_none());
    }

    #[test]
    fn base64_dn() {
        let tree = parse_ldif_file("version: 1\ndn:: Y249YQ==\ncn: a\n").unwrap();
        assert_eq!(tree.require("base64-distinguishedName").unwrap().text(), "Y249YQ==");
    }

    #[test]
    fn crlf_and_comments() {
        let input = "version: 1\r\n# first\r\n\r\ndn: cn=a\r\n# inside\r\ncn: a\r\n\r\n# trailing\r\n";
        let tree = parse_ldif_file(input).unwrap();
        assert_eq!(tree.all("ldif-attrval-record").count(), 1);
        assert_eq!(tree.all("attrval-spec").count(), 1);
    }

    #[test]
    fn two_records() {
        let input = "version: 1\ndn: cn=a\ncn: a\n\n\ndn: cn=b\ncn: b\n";
        let tree = parse_ldif_file(input).unwrap();
        let dns: Vec<_> = tree.all("distinguishedName").map(|n| n.text()).collect();
        assert_eq!(dns, ["cn=a", "cn=b"]);
    }

    #[test]
    fn keywords_ignore_case() {
        assert!(parse_ldif_file("VERSION: 1\nDN: cn=a\ncn: a\n").is_ok());
    }

    // ── Group 3: change records ───────────────────────────────────

    #[test]
    fn change_add_is_not_content() {
        let input = "version: 1\ndn: cn=a\nchangetype: add\ncn: a\n";
        let tree = parse_ldif_file(input).unwrap();
        assert!(tree.first("ldif-changes").is_some());
        assert!(tree.first("change-add").is_some());
        assert_eq!(tree.all("attrval-spec").count(), 1);
    }

    #[test]
    fn modify_record() {
        let input = "version: 1\n\
                     dn: cn=a\n\
                     changetype: modify\n\
                     add: mail\n\
                     mail: a@example.com\n\
                     -\n\
                     delete: description\n\
                     -\n\
                     replace: telephonenumber\n\
                     telephonenumber: 1\n\
                     telephonenumber: 2\n\
                     -\n";
        let tree = parse_ldif_file(input).unwrap();
        let specs: Vec<_> = tree.all("mod-spec").collect();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[2].all("attrval-spec").count(), 2);
    }

    #[test]
    fn moddn_record() {
        let input = "version: 1\n\
                     dn: ou=PD, dc=example\n\
                     changetype: moddn\n\
                     newrdn: ou=Product\n\
                     deleteoldrdn: 0\n\
                     newsuperior: ou=Accounting, dc=example\n";
        let tree = parse_ldif_file(input).unwrap();
        let moddn = tree.require("change-moddn").unwrap();
        assert_eq!(moddn.require("rdn").unwrap().text(), "ou=Product");
        let sup = moddn.require("newsuperior").unwrap();
        assert_eq!(sup.require("distinguishedName").unwrap().text(), "ou=Accounting, dc=example");
    }

    #[test]
    fn control_with_many_arcs() {
        let input = "version: 1\n\
                     dn: ou=a\n\
                     control: 1.2.840.113556.1.4.805 true\n\
                     changetype: delete\n";
        let tree = parse_ldif_file(input).unwrap();
        let control = tree.require("control").unwrap();
        assert_eq!(control.require("ldap-oid").unwrap().text(), "1.2.840.113556.1.4.805");
        assert_eq!(control.require("criticality").unwrap().text(), " true");
    }

    // ── Group 4: rejections ───────────────────────────────────────

    #[test]
    fn missing_version_is_rejected() {
        let err = parse_ldif_file("dn: cn=a\ncn: a\n").unwrap_err();
        assert!(matches!(err, ParseError::NoMatch { .. }));
    }

    #[test]
    fn missing_final_separator_is_rejected() {
        assert!(parse_ldif_file("version: 1\ndn: cn=a\ncn: a").is_err());
    }

    #[test]
    fn mixed_records_are_rejected() {
        let input = "version: 1\ndn: cn=a\nchangetype: delete\n\ndn: cn=b\ncn: b\n";
        let err = parse_ldif_file(input).unwrap_err();
        assert!(matches!(err, ParseError::IncompleteParse { .. }));
    }

    #[test]
    fn bad_value_start() {
        assert!(parse_ldif_file("version: 1\ndn: cn=a\ncn: :x\n").is_err());
    }

    // ── Group 5: unfolding ────────────────────────────────────────

    #[test]
    fn unfold_joins_continuations() {
        assert_eq!(unfold("a: b\n c\nd: e\n"), "a: bc\nd: e\n");
        assert_eq!(unfold("a: b\r\n  c\r\n"), "a: b c\r\n");
    }

    #[test]
    fn normalize_terminates_last_line() {
        assert_eq!(normalize("a: b\n c"), "a: bc\n");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn unfold_borrows_when_flat() {
        assert!(matches!(unfold("a: b\n"), Cow::Borrowed(_)));
    }
}
