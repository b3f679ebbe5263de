//! Distinguished names: grammar selection and the decoded model.
//!
//! [`parse_distinguished_name`] hands back the raw parse tree; the
//! [`DistinguishedName`] model is built on top of it through the query
//! API only, so both grammars share one decoder.  The decoder relies on the
//! rule names the two grammars have in common: `name-component`,
//! `attribute`, `key`, `oid`, `string`, `pair`, `hexpair` and `hexstring`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use abnf_engine::{Grammar, NodeRef, ParseError, Tree};

use crate::error::{LdapSyntaxError, Result};
use crate::{rfc1779, rfc2253};

/// Which distinguished-name syntax to parse with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum DnVariant {
    /// The informal 1993 syntax: `;` separators, spaces around
    /// separators, quoted values, `OID.` prefixes.
    Rfc1779,
    /// The strict LDAPv3 syntax: `,` only, hex-pair escapes.
    Rfc2253,
}

impl DnVariant {
    pub fn grammar(self) -> &'static Grammar {
        match self {
            DnVariant::Rfc1779 => rfc1779::grammar(),
            DnVariant::Rfc2253 => rfc2253::grammar(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DnVariant::Rfc1779 => "rfc1779",
            DnVariant::Rfc2253 => "rfc2253",
        }
    }
}

impl fmt::Display for DnVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rfc1779" | "1779" => Ok(DnVariant::Rfc1779),
            "rfc2253" | "2253" | "ldapv3" => Ok(DnVariant::Rfc2253),
            _ => Err(format!("unknown DN syntax: {}", s)),
        }
    }
}

/// Parse `input` with the `name` rule of the chosen grammar.
pub fn parse_distinguished_name(
    variant: DnVariant,
    input: &str,
) -> std::result::Result<Tree, ParseError> {
    variant.grammar().parse(input)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Name(String),
    /// Dotted-decimal object identifier, without any `OID.` prefix.
    Oid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    Text(String),
    /// A value written as `#` followed by hex pairs (BER encoded).
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTypeAndValue {
    pub attr_type: AttributeType,
    pub value: AttributeValue,
}

/// One name-component; usually a single attribute, several when joined
/// with `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativeDistinguishedName {
    pub attributes: Vec<AttributeTypeAndValue>,
}

/// A decoded distinguished name, most specific component first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DistinguishedName {
    pub rdns: Vec<RelativeDistinguishedName>,
}

impl DistinguishedName {
    /// Parse and decode.  The empty string is the root DN.
    pub fn parse(variant: DnVariant, input: &str) -> Result<DistinguishedName> {
        if input.is_empty() {
            return Ok(DistinguishedName::default());
        }
        let tree = parse_distinguished_name(variant, input)?;
        DistinguishedName::from_tree(variant, &tree)
    }

    pub fn from_tree(variant: DnVariant, tree: &Tree) -> Result<DistinguishedName> {
        let rdns = tree
            .all("name-component")
            .map(|component| RelativeDistinguishedName::from_node(variant, component))
            .collect::<Result<Vec<_>>>()?;
        Ok(DistinguishedName { rdns })
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The most specific component.
    pub fn rdn(&self) -> Option<&RelativeDistinguishedName> {
        self.rdns.first()
    }

    /// Everything but the most specific component.
    pub fn parent(&self) -> Option<DistinguishedName> {
        self.rdns.split_first().map(|(_, rest)| DistinguishedName {
            rdns: rest.to_vec(),
        })
    }
}

impl RelativeDistinguishedName {
    fn from_node(variant: DnVariant, component: NodeRef<'_>) -> Result<Self> {
        let attributes = component
            .all("attribute")
            .map(|attribute| AttributeTypeAndValue::from_node(variant, attribute))
            .collect::<Result<Vec<_>>>()?;
        Ok(RelativeDistinguishedName { attributes })
    }
}

impl AttributeTypeAndValue {
    fn from_node(variant: DnVariant, attribute: NodeRef<'_>) -> Result<Self> {
        let key = attribute
            .child("key")
            .ok_or_else(|| LdapSyntaxError::MissingAttributeType(attribute.text()))?;
        let attr_type = decode_key(key)?;
        let value = match attribute.child("string") {
            Some(string) => decode_string(variant, string)?,
            None => AttributeValue::Text(String::new()),
        };
        Ok(AttributeTypeAndValue { attr_type, value })
    }
}

/// The informal grammar lets keys contain spaces and start with a digit;
/// only names that also fit `ALPHA *(ALPHA / DIGIT / "-")` are kept.
fn decode_key(key: NodeRef<'_>) -> Result<AttributeType> {
    if let Some(oid) = key.first("oid") {
        return Ok(AttributeType::Oid(oid.text()));
    }
    let text = key.text();
    let text = text.trim();
    if is_dotted_decimal(text) {
        Ok(AttributeType::Oid(text.to_string()))
    } else if is_keystring(text) {
        Ok(AttributeType::Name(text.to_string()))
    } else {
        Err(LdapSyntaxError::InvalidAttributeType(text.to_string()))
    }
}

fn is_keystring(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_dotted_decimal(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()))
}

fn decode_string(variant: DnVariant, string: NodeRef<'_>) -> Result<AttributeValue> {
    if let Some(hex) = string.child("hexstring") {
        return Ok(AttributeValue::Binary(decode_hex(&hex.text())?));
    }

    let mut quoted = false;
    let mut bytes = Vec::new();
    for part in string.children() {
        match part.rule() {
            "\"" => quoted = true,
            "pair" => decode_pair(part, &mut bytes)?,
            _ => bytes.extend_from_slice(part.text().as_bytes()),
        }
    }

    let mut text =
        String::from_utf8(bytes).map_err(|e| LdapSyntaxError::InvalidUtf8(e.into_bytes()))?;
    if variant == DnVariant::Rfc1779 && !quoted {
        let end = text.trim_end_matches([' ', '\n']).len();
        text.truncate(end);
    }
    Ok(AttributeValue::Text(text))
}

fn decode_pair(pair: NodeRef<'_>, out: &mut Vec<u8>) -> Result<()> {
    // The first child is the backslash.
    if let Some(escaped) = pair.children().nth(1) {
        if escaped.rule() == "hexpair" {
            out.extend(decode_hex(&escaped.text())?);
        } else {
            out.extend_from_slice(escaped.text().as_bytes());
        }
    }
    Ok(())
}

/// Decode an even-length run of hex digits.
pub fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(LdapSyntaxError::InvalidHex(hex.to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| LdapSyntaxError::InvalidHex(hex.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// RFC 2253 rendering
// ---------------------------------------------------------------------------

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Name(name) => f.write_str(name),
            AttributeType::Oid(oid) => f.write_str(oid),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(text) => write_escaped(f, text),
            AttributeValue::Binary(bytes) => {
                f.write_char('#')?;
                for b in bytes {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let last = text.chars().count().saturating_sub(1);
    for (i, c) in text.chars().enumerate() {
        match c {
            ',' | '=' | '+' | '<' | '>' | '#' | ';' | '\\' | '"' => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            ' ' if i == 0 || i == last => f.write_str("\\20")?,
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr_type, self.value)
    }
}

impl fmt::Display for RelativeDistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attribute) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_char('+')?;
            }
            write!(f, "{}", attribute)?;
        }
        Ok(())
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{}", rdn)?;
        }
        Ok(())
    }
}

impl FromStr for DistinguishedName {
    type Err = LdapSyntaxError;

    fn from_str(s: &str) -> Result<Self> {
        DistinguishedName::parse(DnVariant::Rfc2253, s)
    }
}
