//! Grammars for LDAP distinguished names (RFC 1779 and RFC 2253) and for
//! LDIF (RFC 2849), with typed decoding on top of the parse trees.
//!
//! ```
//! use ldapsyntax::dn::{DistinguishedName, DnVariant};
//!
//! let dn = DistinguishedName::parse(DnVariant::Rfc1779, "CN=Marshall T. Rose; C=US").unwrap();
//! assert_eq!(dn.to_string(), "CN=Marshall T. Rose,C=US");
//! ```

pub mod base64;
pub mod dn;
pub mod error;
pub mod ldif;
pub mod print;
pub mod records;
pub mod rfc1779;
pub mod rfc2253;

pub use dn::{parse_distinguished_name, DistinguishedName, DnVariant};
pub use error::{LdapSyntaxError, Result};
pub use ldif::parse_ldif_file;
pub use records::LdifFile;
