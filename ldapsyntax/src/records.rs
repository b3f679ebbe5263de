//! Typed LDIF records, decoded from an `ldif-file` parse tree.

use abnf_engine::{NodeRef, Tree};

use crate::base64;
use crate::dn::{DistinguishedName, DnVariant};
use crate::error::{LdapSyntaxError, Result};
use crate::ldif;

/// An attribute value as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A SAFE-STRING or a decoded base64 value.
    Bytes(Vec<u8>),
    /// A `:<` reference.  Never fetched.
    Url(String),
}

impl Value {
    pub fn text(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            Value::Url(_) => None,
        }
    }
}

/// An attribute: a description (type plus options) with its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub ad: String,
    pub values: Vec<Value>,
}

/// A content record: a DN with a list of attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOp {
    Add,
    Delete,
    Replace,
}

impl ModOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ModOp::Add => "add",
            ModOp::Delete => "delete",
            ModOp::Replace => "replace",
        }
    }
}

/// One `add:`/`delete:`/`replace:` block of a modify record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapMod {
    pub op: ModOp,
    pub attr: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add(Vec<Attribute>),
    Delete,
    Modify(Vec<LdapMod>),
    ModDn {
        new_rdn: String,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub dn: String,
    pub controls: Vec<Control>,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdifBody {
    Content(Vec<Entry>),
    Changes(Vec<ChangeRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdifFile {
    pub version: u32,
    pub body: LdifBody,
}

impl Entry {
    pub fn new(dn: String) -> Entry {
        Entry {
            dn,
            attributes: Vec::new(),
        }
    }

    /// Find an attribute by description.
    /// If `create` is true and the attribute doesn't exist, create it.
    pub fn find_attribute(&mut self, ad: &str, create: bool) -> Option<&mut Attribute> {
        match self.attributes.iter().position(|a| a.ad == ad) {
            Some(i) => Some(&mut self.attributes[i]),
            None if create => {
                self.attributes.push(Attribute::new(ad.to_string()));
                self.attributes.last_mut()
            }
            None => None,
        }
    }

    pub fn get_attribute(&self, ad: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.ad == ad)
    }

    /// Decode the DN with one of the distinguished-name grammars.
    pub fn distinguished_name(&self, variant: DnVariant) -> Result<DistinguishedName> {
        DistinguishedName::parse(variant, &self.dn)
    }
}

impl Attribute {
    pub fn new(ad: String) -> Attribute {
        Attribute {
            ad,
            values: Vec::new(),
        }
    }

    pub fn append_value(&mut self, value: Value) {
        self.values.push(value);
    }
}

impl ChangeRecord {
    pub fn distinguished_name(&self, variant: DnVariant) -> Result<DistinguishedName> {
        DistinguishedName::parse(variant, &self.dn)
    }
}

impl LdifFile {
    /// Unfold continuation lines, terminate the last line and parse.
    pub fn parse(input: &str) -> Result<LdifFile> {
        let tree = ldif::parse_ldif_file(&ldif::normalize(input))?;
        LdifFile::from_tree(&tree)
    }

    pub fn from_tree(tree: &Tree) -> Result<LdifFile> {
        let version = tree.require("version-number")?.text();
        if version != "1" {
            return Err(LdapSyntaxError::UnsupportedVersion(version));
        }

        let root = tree.root();
        let body = if let Some(changes) = root.child("ldif-changes") {
            let records = changes
                .children()
                .filter(|n| n.rule() == "ldif-change-record")
                .map(ChangeRecord::from_node)
                .collect::<Result<Vec<_>>>()?;
            LdifBody::Changes(records)
        } else {
            let content = root.require("ldif-content")?;
            let entries = content
                .children()
                .filter(|n| n.rule() == "ldif-attrval-record")
                .map(Entry::from_node)
                .collect::<Result<Vec<_>>>()?;
            LdifBody::Content(entries)
        };

        Ok(LdifFile { version: 1, body })
    }

    pub fn len(&self) -> usize {
        match &self.body {
            LdifBody::Content(entries) => entries.len(),
            LdifBody::Changes(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The DN of every record, in file order.
    pub fn dns(&self) -> Vec<&str> {
        match &self.body {
            LdifBody::Content(entries) => entries.iter().map(|e| e.dn.as_str()).collect(),
            LdifBody::Changes(records) => records.iter().map(|r| r.dn.as_str()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree decoding
// ---------------------------------------------------------------------------

impl Entry {
    fn from_node(record: NodeRef<'_>) -> Result<Entry> {
        let mut entry = Entry::new(decode_dn(record.require("dn-spec")?)?);
        collect_attributes(record, &mut entry.attributes)?;
        tracing::debug!(dn = %entry.dn, attributes = entry.attributes.len(), "decoded entry");
        Ok(entry)
    }
}

impl ChangeRecord {
    fn from_node(record: NodeRef<'_>) -> Result<ChangeRecord> {
        let dn = decode_dn(record.require("dn-spec")?)?;
        let controls = record
            .children()
            .filter(|n| n.rule() == "control")
            .map(Control::from_node)
            .collect::<Result<Vec<_>>>()?;

        let changerecord = record.require("changerecord")?;
        let change = if let Some(add) = changerecord.child("change-add") {
            let mut attributes = Vec::new();
            collect_attributes(add, &mut attributes)?;
            Change::Add(attributes)
        } else if changerecord.child("change-delete").is_some() {
            Change::Delete
        } else if let Some(modify) = changerecord.child("change-modify") {
            let mods = modify
                .children()
                .filter(|n| n.rule() == "mod-spec")
                .map(decode_mod)
                .collect::<Result<Vec<_>>>()?;
            Change::Modify(mods)
        } else {
            decode_moddn(changerecord.require("change-moddn")?)?
        };

        tracing::debug!(%dn, controls = controls.len(), "decoded change record");
        Ok(ChangeRecord {
            dn,
            controls,
            change,
        })
    }
}

impl Control {
    fn from_node(control: NodeRef<'_>) -> Result<Control> {
        let oid = control.require("ldap-oid")?.text();
        let critical = control
            .child("criticality")
            .is_some_and(|c| c.text().trim().eq_ignore_ascii_case("true"));
        let value = control.child("value-spec").map(decode_value).transpose()?;
        Ok(Control {
            oid,
            critical,
            value,
        })
    }
}

/// Group the `attrval-spec` children of `parent` by attribute description.
fn collect_attributes(parent: NodeRef<'_>, attributes: &mut Vec<Attribute>) -> Result<()> {
    for spec in parent.children().filter(|n| n.rule() == "attrval-spec") {
        let (ad, value) = decode_attrval(spec)?;
        match attributes.iter_mut().find(|a| a.ad == ad) {
            Some(attribute) => attribute.append_value(value),
            None => attributes.push(Attribute {
                ad,
                values: vec![value],
            }),
        }
    }
    Ok(())
}

fn decode_attrval(spec: NodeRef<'_>) -> Result<(String, Value)> {
    let ad = spec.require("AttributeDescription")?.text();
    let value = decode_value(spec.require("value-spec")?)?;
    Ok((ad, value))
}

fn decode_value(spec: NodeRef<'_>) -> Result<Value> {
    // The second child tells the forms apart: ":" for base64, "<" for URLs.
    match spec.children().nth(1).map(|n| n.rule()) {
        Some(":") => {
            let encoded = spec.child("base64-string").map(|n| n.text()).unwrap_or_default();
            Ok(Value::Bytes(base64::decode(&encoded)?))
        }
        Some("<") => Ok(Value::Url(spec.require("url")?.text())),
        _ => {
            let text = spec.child("safe-string").map(|n| n.text()).unwrap_or_default();
            Ok(Value::Bytes(text.into_bytes()))
        }
    }
}

/// The DN of a `dn-spec` or `newsuperior` node.
fn decode_dn(spec: NodeRef<'_>) -> Result<String> {
    match spec.child("base64-distinguishedName") {
        Some(encoded) => decode_utf8(&encoded.text()),
        None => Ok(spec.require("distinguishedName")?.text()),
    }
}

fn decode_utf8(encoded: &str) -> Result<String> {
    let bytes = base64::decode(encoded)?;
    String::from_utf8(bytes).map_err(|e| LdapSyntaxError::InvalidUtf8(e.into_bytes()))
}

fn decode_mod(spec: NodeRef<'_>) -> Result<LdapMod> {
    let op = match spec.children().next().map(|n| n.rule()) {
        Some("add:") => ModOp::Add,
        Some("delete:") => ModOp::Delete,
        _ => ModOp::Replace,
    };
    let attr = spec.require("AttributeDescription")?.text();

    let mut values = Vec::new();
    for attrval in spec.children().filter(|n| n.rule() == "attrval-spec") {
        let (ad, value) = decode_attrval(attrval)?;
        if !ad.eq_ignore_ascii_case(&attr) {
            tracing::warn!(expected = %attr, found = %ad, "value line names another attribute");
        }
        values.push(value);
    }

    Ok(LdapMod { op, attr, values })
}

fn decode_moddn(moddn: NodeRef<'_>) -> Result<Change> {
    let newrdn = moddn.require("newrdn")?;
    let new_rdn = match newrdn.child("base64-rdn") {
        Some(encoded) => decode_utf8(&encoded.text())?,
        None => newrdn.require("rdn")?.text(),
    };
    let delete_old_rdn = moddn.require("deleteoldrdn")?.child("1").is_some();
    let new_superior = moddn.child("newsuperior").map(decode_dn).transpose()?;
    Ok(Change::ModDn {
        new_rdn,
        delete_old_rdn,
        new_superior,
    })
}
