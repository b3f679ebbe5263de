use abnf_engine::{ParseError, QueryError};

#[derive(Debug, thiserror::Error)]
pub enum LdapSyntaxError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("malformed parse tree: {0}")]
    Query(#[from] QueryError),

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] ::base64::DecodeError),

    #[error("unsupported LDIF version {0}")]
    UnsupportedVersion(String),

    #[error("attribute value is not valid UTF-8: {0:?}")]
    InvalidUtf8(Vec<u8>),

    #[error("invalid hex string {0:?}")]
    InvalidHex(String),

    #[error("attribute type {0:?} is neither a name nor an OID")]
    InvalidAttributeType(String),

    #[error("attribute has no type: {0:?}")]
    MissingAttributeType(String),
}

pub type Result<T> = std::result::Result<T, LdapSyntaxError>;
