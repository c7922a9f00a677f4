//! Hex and modhex text encoding
//!
//! Modhex maps the sixteen nibble values onto `cbdefghijklnrtuv`, letters
//! that sit on the same keys in most keyboard layouts. Decoding is
//! case-insensitive for both alphabets.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{ConfigError, Error};

const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Modhex alphabet, indexed by nibble value
pub const MODHEX_ALPHABET: &[u8; 16] = b"cbdefghijklnrtuv";

/// Text encoding of binary fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `0-9a-f`
    Hex,
    /// `cbdefghijklnrtuv`
    Modhex,
}

impl Encoding {
    fn alphabet(self) -> &'static [u8; 16] {
        match self {
            Encoding::Hex => HEX_ALPHABET,
            Encoding::Modhex => MODHEX_ALPHABET,
        }
    }

    /// Two-character override prefix written in front of encoded values
    pub fn prefix(self) -> &'static str {
        match self {
            Encoding::Hex => "h:",
            Encoding::Modhex => "m:",
        }
    }
}

/// Text decoding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Odd length or outside the accepted bounds
    Length,
    /// Character outside the alphabet
    Alphabet,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Length => write!(f, "invalid length"),
            CodecError::Alphabet => write!(f, "invalid character"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(_: CodecError) -> Self {
        Error::Config(ConfigError::InvalidValue)
    }
}

/// Encode bytes with the given alphabet
pub fn encode(data: &[u8], encoding: Encoding) -> String {
    let alphabet = encoding.alphabet();
    let mut out = String::with_capacity(data.len() * 2);
    for &b in data {
        out.push(alphabet[(b >> 4) as usize] as char);
        out.push(alphabet[(b & 0x0F) as usize] as char);
    }
    out
}

/// Encode bytes as lowercase hex
pub fn hex_encode(data: &[u8]) -> String {
    encode(data, Encoding::Hex)
}

/// Encode bytes as modhex
pub fn modhex_encode(data: &[u8]) -> String {
    encode(data, Encoding::Modhex)
}

fn nibble(c: u8, encoding: Encoding) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    encoding
        .alphabet()
        .iter()
        .position(|&a| a == c)
        .map(|p| p as u8)
}

/// Whether every character of `s` belongs to the alphabet
pub fn is_valid(s: &str, encoding: Encoding) -> bool {
    s.bytes().all(|c| nibble(c, encoding).is_some())
}

/// Decode an even-length string in the given alphabet
pub fn decode(s: &str, encoding: Encoding) -> Result<Vec<u8>, CodecError> {
    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(CodecError::Length);
    }
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let hi = nibble(pair[0], encoding).ok_or(CodecError::Alphabet)?;
            let lo = nibble(pair[1], encoding).ok_or(CodecError::Alphabet)?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

/// Decode hex
pub fn hex_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    decode(s, Encoding::Hex)
}

/// Decode modhex
pub fn modhex_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    decode(s, Encoding::Modhex)
}

/// Decode a field value that may carry an `h:`/`H:`/`m:`/`M:` prefix
///
/// The prefix forces the alphabet; without one `default` is used. Length
/// bounds apply to the characters after the prefix and the count must be
/// even.
pub fn decode_prefixed(
    s: &str,
    default: Encoding,
    min_chars: usize,
    max_chars: usize,
) -> Result<Vec<u8>, CodecError> {
    let (encoding, body) = match s.get(..2) {
        Some("m:") | Some("M:") => (Encoding::Modhex, &s[2..]),
        Some("h:") | Some("H:") => (Encoding::Hex, &s[2..]),
        _ => (default, s),
    };

    let len = body.len();
    if len % 2 != 0 || len < min_chars || len > max_chars {
        return Err(CodecError::Length);
    }
    decode(body, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0x1f, 0xa0, 0xff]), "001fa0ff");
    }

    #[test]
    fn test_modhex_encode() {
        assert_eq!(modhex_encode(&[0x00, 0x1f, 0xa0, 0xff]), "ccbvlcvv");
    }

    #[test]
    fn test_decode() {
        assert_eq!(hex_decode("DEADbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(modhex_decode("ccbvlcvv").unwrap(), vec![0x00, 0x1f, 0xa0, 0xff]);
        assert_eq!(hex_decode("abc"), Err(CodecError::Length));
        assert_eq!(hex_decode("zz"), Err(CodecError::Alphabet));
        assert_eq!(modhex_decode("00"), Err(CodecError::Alphabet));
    }

    #[test]
    fn test_prefix_overrides_default() {
        // "cbdefg" is valid modhex; the h: prefix makes it invalid hex
        assert_eq!(
            decode_prefixed("h:cbdefg", Encoding::Modhex, 0, 16),
            Err(CodecError::Alphabet)
        );
        assert_eq!(
            decode_prefixed("m:cbdefg", Encoding::Hex, 0, 16).unwrap(),
            vec![0x01, 0x23, 0x45]
        );
        assert_eq!(
            decode_prefixed("H:0102", Encoding::Modhex, 0, 16).unwrap(),
            vec![0x01, 0x02]
        );
    }

    #[test]
    fn test_prefix_length_bounds() {
        assert_eq!(
            decode_prefixed("h:0102", Encoding::Hex, 12, 12),
            Err(CodecError::Length)
        );
        assert!(decode_prefixed("010203040506", Encoding::Hex, 12, 12).is_ok());
        assert_eq!(decode_prefixed("", Encoding::Modhex, 0, 32).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("cbdefghijklnrtuv", Encoding::Modhex));
        assert!(!is_valid("cbdefghijklnrtuva", Encoding::Modhex));
        assert!(is_valid("0123456789ABCDEF", Encoding::Hex));
    }
}
