//! LDIF output.
//!
//! Values are written as SAFE-STRINGs when they are plain ASCII and as
//! base64 otherwise.  Lines are never folded, so whatever this module
//! writes reads back into the same records.

use std::io::{self, Write};

use crate::base64;
use crate::records::{
    Attribute, Change, ChangeRecord, Control, Entry, LdapMod, LdifBody, LdifFile, Value,
};

/// Check if the value can be printed as an LDIF SAFE-STRING:
/// no leading space/colon/less-than, no null/CR/LF/non-ASCII bytes.
fn safe_string_p(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    let c = data[0];
    if c == b' ' || c == b':' || c == b'<' {
        return false;
    }
    for &c in data {
        if c == 0 || c == b'\r' || c == b'\n' || c >= 0x80 {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Low-level output helpers
// ---------------------------------------------------------------------------

/// Write the value part of a line: `: text`, `:: base64` or `:< url`.
fn print_value(w: &mut dyn Write, value: &Value) -> io::Result<()> {
    match value {
        Value::Bytes(data) if safe_string_p(data) => {
            w.write_all(b": ")?;
            w.write_all(data)?;
        }
        Value::Bytes(data) => {
            w.write_all(b":: ")?;
            w.write_all(base64::encode(data).as_bytes())?;
        }
        Value::Url(url) => {
            w.write_all(b":< ")?;
            w.write_all(url.as_bytes())?;
        }
    }
    Ok(())
}

/// Write an LDIF attribute line: `ad: value\n` or `ad:: base64\n`.
fn print_ldif_line(w: &mut dyn Write, ad: &str, data: &[u8]) -> io::Result<()> {
    w.write_all(ad.as_bytes())?;
    print_value(w, &Value::Bytes(data.to_vec()))?;
    w.write_all(b"\n")
}

fn print_attributes(w: &mut dyn Write, attributes: &[Attribute]) -> io::Result<()> {
    for attr in attributes {
        for value in &attr.values {
            w.write_all(attr.ad.as_bytes())?;
            print_value(w, value)?;
            w.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn print_control(w: &mut dyn Write, control: &Control) -> io::Result<()> {
    write!(w, "control: {}", control.oid)?;
    if control.critical {
        w.write_all(b" true")?;
    }
    if let Some(value) = &control.value {
        print_value(w, value)?;
    }
    w.write_all(b"\n")
}

/// Blank line, `dn:` line and controls.
fn print_header(w: &mut dyn Write, dn: &str, controls: &[Control]) -> io::Result<()> {
    w.write_all(b"\n")?;
    print_ldif_line(w, "dn", dn.as_bytes())?;
    for control in controls {
        print_control(w, control)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LDIF format printers
// ---------------------------------------------------------------------------

/// Print a whole file: the version line followed by every record.
pub fn print_ldif(w: &mut dyn Write, file: &LdifFile) -> io::Result<()> {
    writeln!(w, "version: {}", file.version)?;
    match &file.body {
        LdifBody::Content(entries) => {
            for entry in entries {
                print_ldif_entry(w, entry)?;
            }
        }
        LdifBody::Changes(records) => {
            for record in records {
                print_ldif_change(w, record)?;
            }
        }
    }
    Ok(())
}

/// Print an entry in LDIF format.
pub fn print_ldif_entry(w: &mut dyn Write, entry: &Entry) -> io::Result<()> {
    print_header(w, &entry.dn, &[])?;
    print_attributes(w, &entry.attributes)
}

/// Print a change record of any kind.
pub fn print_ldif_change(w: &mut dyn Write, record: &ChangeRecord) -> io::Result<()> {
    match &record.change {
        Change::Add(attributes) => print_ldif_add(w, &record.dn, &record.controls, attributes),
        Change::Delete => print_ldif_delete(w, &record.dn, &record.controls),
        Change::Modify(mods) => print_ldif_modify(w, &record.dn, &record.controls, mods),
        Change::ModDn {
            new_rdn,
            delete_old_rdn,
            new_superior,
        } => print_ldif_modrdn(
            w,
            &record.dn,
            &record.controls,
            new_rdn,
            *delete_old_rdn,
            new_superior.as_deref(),
        ),
    }
}

/// Print a modify record in LDIF format.
pub fn print_ldif_modify(
    w: &mut dyn Write,
    dn: &str,
    controls: &[Control],
    mods: &[LdapMod],
) -> io::Result<()> {
    print_header(w, dn, controls)?;
    w.write_all(b"changetype: modify\n")?;

    for m in mods {
        writeln!(w, "{}: {}", m.op.as_str(), m.attr)?;
        for value in &m.values {
            w.write_all(m.attr.as_bytes())?;
            print_value(w, value)?;
            w.write_all(b"\n")?;
        }
        w.write_all(b"-\n")?;
    }
    Ok(())
}

/// Print a modrdn record in LDIF format.
pub fn print_ldif_modrdn(
    w: &mut dyn Write,
    dn: &str,
    controls: &[Control],
    new_rdn: &str,
    delete_old_rdn: bool,
    new_superior: Option<&str>,
) -> io::Result<()> {
    print_header(w, dn, controls)?;
    w.write_all(b"changetype: modrdn\n")?;
    print_ldif_line(w, "newrdn", new_rdn.as_bytes())?;
    writeln!(w, "deleteoldrdn: {}", if delete_old_rdn { 1 } else { 0 })?;
    if let Some(sup) = new_superior {
        print_ldif_line(w, "newsuperior", sup.as_bytes())?;
    }
    Ok(())
}

/// Print an add record in LDIF format.
pub fn print_ldif_add(
    w: &mut dyn Write,
    dn: &str,
    controls: &[Control],
    attributes: &[Attribute],
) -> io::Result<()> {
    print_header(w, dn, controls)?;
    w.write_all(b"changetype: add\n")?;
    print_attributes(w, attributes)
}

/// Print a delete record in LDIF format.
pub fn print_ldif_delete(w: &mut dyn Write, dn: &str, controls: &[Control]) -> io::Result<()> {
    print_header(w, dn, controls)?;
    w.write_all(b"changetype: delete\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ModOp;

    const DN: &str = "cn=foo,dc=example,dc=com";

    fn make_entry(dn: &str) -> Entry {
        Entry::new(dn.to_string())
    }

    fn add_value(entry: &mut Entry, ad: &str, val: &[u8]) {
        let attr = entry.find_attribute(ad, true).unwrap();
        attr.append_value(Value::Bytes(val.to_vec()));
    }

    fn make_mod(op: ModOp, attr: &str, values: &[&str]) -> LdapMod {
        LdapMod {
            op,
            attr: attr.to_string(),
            values: values.iter().map(|v| Value::text(v)).collect(),
        }
    }

    fn capture<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Group 1: print_ldif_entry ─────────────────────────────────

    #[test]
    fn ldif_entry_simple() {
        let mut e = make_entry(DN);
        add_value(&mut e, "cn", b"foo");
        let out = capture(|w| print_ldif_entry(w, &e));
        assert_eq!(out, "\ndn: cn=foo,dc=example,dc=com\ncn: foo\n");
    }

    #[test]
    fn ldif_entry_multi_valued() {
        let mut e = make_entry(DN);
        add_value(&mut e, "cn", b"foo");
        add_value(&mut e, "cn", b"bar");
        let out = capture(|w| print_ldif_entry(w, &e));
        assert_eq!(out, "\ndn: cn=foo,dc=example,dc=com\ncn: foo\ncn: bar\n");
    }

    #[test]
    fn ldif_entry_binary() {
        let mut e = make_entry(DN);
        add_value(&mut e, "cn", &[0x00, 0x01, 0x02]);
        let out = capture(|w| print_ldif_entry(w, &e));
        assert!(out.contains("cn:: AAEC\n"));
    }

    #[test]
    fn ldif_entry_non_ascii_dn() {
        let e = make_entry("ou=営業部,o=Airius");
        let out = capture(|w| print_ldif_entry(w, &e));
        assert!(out.starts_with("\ndn:: "));
    }

    #[test]
    fn ldif_entry_url() {
        let mut e = make_entry(DN);
        e.find_attribute("jpegphoto", true)
            .unwrap()
            .append_value(Value::Url("file:///tmp/a.jpg".to_string()));
        let out = capture(|w| print_ldif_entry(w, &e));
        assert!(out.contains("jpegphoto:< file:///tmp/a.jpg\n"));
    }

    // ── Group 2: change records ───────────────────────────────────

    #[test]
    fn ldif_modify() {
        let mods = vec![
            make_mod(ModOp::Add, "mail", &["foo@example.com"]),
            make_mod(ModOp::Delete, "phone", &[]),
        ];
        let out = capture(|w| print_ldif_modify(w, DN, &[], &mods));
        assert_eq!(
            out,
            "\ndn: cn=foo,dc=example,dc=com\n\
             changetype: modify\n\
             add: mail\n\
             mail: foo@example.com\n\
             -\n\
             delete: phone\n\
             -\n"
        );
    }

    #[test]
    fn ldif_modrdn() {
        let out = capture(|w| print_ldif_modrdn(w, DN, &[], "cn=new", false, None));
        assert!(out.contains("dn: cn=foo,dc=example,dc=com\n"));
        assert!(out.contains("changetype: modrdn\n"));
        assert!(out.contains("newrdn: cn=new\n"));
        assert!(out.contains("deleteoldrdn: 0\n"));
        assert!(!out.contains("newsuperior"));
    }

    #[test]
    fn ldif_modrdn_with_superior() {
        let out = capture(|w| {
            print_ldif_modrdn(w, DN, &[], "cn=new", true, Some("dc=example,dc=org"))
        });
        assert!(out.contains("deleteoldrdn: 1\n"));
        assert!(out.contains("newsuperior: dc=example,dc=org\n"));
    }

    #[test]
    fn ldif_add() {
        let attrs = vec![Attribute {
            ad: "cn".to_string(),
            values: vec![Value::text("foo")],
        }];
        let out = capture(|w| print_ldif_add(w, DN, &[], &attrs));
        assert_eq!(out, "\ndn: cn=foo,dc=example,dc=com\nchangetype: add\ncn: foo\n");
    }

    #[test]
    fn ldif_delete_with_controls() {
        let controls = vec![
            Control {
                oid: "1.2.840.113556.1.4.805".to_string(),
                critical: true,
                value: None,
            },
            Control {
                oid: "1.2.3".to_string(),
                critical: false,
                value: Some(Value::text("v")),
            },
        ];
        let out = capture(|w| print_ldif_delete(w, DN, &controls));
        assert_eq!(
            out,
            "\ndn: cn=foo,dc=example,dc=com\n\
             control: 1.2.840.113556.1.4.805 true\n\
             control: 1.2.3: v\n\
             changetype: delete\n"
        );
    }

    // ── Group 3: round trips ──────────────────────────────────────

    #[test]
    fn roundtrip_content() {
        let mut e = make_entry(DN);
        add_value(&mut e, "cn", b"foo");
        add_value(&mut e, "sn", b" leading space");
        add_value(&mut e, "description", b"line1\nline2");
        add_value(&mut e, "ou;lang-ja", "営業部".as_bytes());
        let file = LdifFile {
            version: 1,
            body: LdifBody::Content(vec![e]),
        };

        let out = capture(|w| print_ldif(w, &file));
        assert_eq!(LdifFile::parse(&out).unwrap(), file);
    }

    #[test]
    fn roundtrip_changes() {
        let input = "version: 1\n\
                     dn: cn=a\n\
                     control: 1.2.3 true:: AAEC\n\
                     changetype: modify\n\
                     replace: sn\n\
                     sn: x\n\
                     -\n\
                     \n\
                     dn: cn=b\n\
                     changetype: moddn\n\
                     newrdn: cn=c\n\
                     deleteoldrdn: 1\n\
                     newsuperior: o=x\n";
        let file = LdifFile::parse(input).unwrap();
        let out = capture(|w| print_ldif(w, &file));
        assert_eq!(LdifFile::parse(&out).unwrap(), file);
    }

    // ── Helpers: string classification ────────────────────────────

    #[test]
    fn test_safe_string_p() {
        assert!(safe_string_p(b"hello"));
        assert!(safe_string_p(b""));
        assert!(!safe_string_p(b" leading"));
        assert!(!safe_string_p(b":colon"));
        assert!(!safe_string_p(b"<angle"));
        assert!(!safe_string_p(b"has\nnewline"));
        assert!(!safe_string_p(b"has\rreturn"));
        assert!(!safe_string_p(b"has\x00null"));
        assert!(!safe_string_p(&[0xc3, 0xa9])); // non-ASCII
    }
}
