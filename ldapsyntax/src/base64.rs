//! Base64 helpers for LDIF values.
//!
//! LDIF writes base64 after a double colon.  The grammar has already
//! checked that only BASE64-CHARs are present, so decoding only has to
//! reject bad lengths and padding.

use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine as _;

use crate::error::Result;

/// Encode `src` as one unfolded base64 line.
pub fn encode(src: &[u8]) -> String {
    STANDARD.encode(src)
}

/// Decode a BASE64-STRING.
pub fn decode(src: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(src.as_bytes())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LdapSyntaxError;

    #[test]
    fn encode_empty() {
        assert_eq!(encode(b""), "");
    }

    #[test]
    fn encode_hello() {
        assert_eq!(encode(b"hello"), "aGVsbG8=");
    }

    #[test]
    fn encode_one_byte() {
        assert_eq!(encode(b"a"), "YQ==");
    }

    #[test]
    fn encode_three_bytes() {
        assert_eq!(encode(b"abc"), "YWJj");
    }

    #[test]
    fn decode_two_bytes() {
        assert_eq!(decode("YWI=").unwrap(), b"ab");
    }

    #[test]
    fn decode_invalid_length() {
        assert!(matches!(
            decode("YWJ"),
            Err(LdapSyntaxError::Base64Decode(_))
        ));
    }

    #[test]
    fn long_values_stay_on_one_line() {
        let data = vec![0xFFu8; 60];
        let s = encode(&data);
        assert!(!s.contains('\n'));
        assert_eq!(decode(&s).unwrap(), data);
    }
}
