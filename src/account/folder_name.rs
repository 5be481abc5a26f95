//-
// Copyright (c) 2025, The Rehome Developers
//
// This file is part of Rehome.
//
// Rehome is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Rehome is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Rehome. If not, see <http://www.gnu.org/licenses/>.

//! Translation between e-mail addresses and legacy account folder names.
//!
//! The legacy layout named each account folder after the account's e-mail
//! address, percent-encoded with `+` in place of the usual `%`: every byte
//! outside the URI "unreserved" set becomes `+HH`, so `user@example.com`
//! is stored as `user+40example.com`. Since `+` itself is escaped, the
//! encoding is lossless.
//!
//! Decoding also accepts escapes written with a literal `%`, which some very
//! old clients produced (`user%40example.com`).

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Escape sequence cut off by end of name")]
    TruncatedEscape,
    #[error("Escape sequence contains non-hexadecimal digits")]
    BadEscape,
    #[error("Decoded name is not valid UTF-8")]
    NotUtf8,
}

const ESCAPE: u8 = b'+';
const LEGACY_ESCAPE: u8 = b'%';

/// Returns the legacy folder name for `address`.
pub fn encode(address: &str) -> String {
    let mut out = String::with_capacity(address.len());
    for &byte in address.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            out.push(ESCAPE as char);
            out.push(hex_digit(byte >> 4) as char);
            out.push(hex_digit(byte & 0xF) as char);
        }
    }

    out
}

/// Recovers the e-mail address a legacy folder name was derived from.
pub fn decode(name: &str) -> Result<String, DecodeError> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut ix = 0;
    while ix < bytes.len() {
        let byte = bytes[ix];
        if ESCAPE == byte || LEGACY_ESCAPE == byte {
            if ix + 2 >= bytes.len() {
                return Err(DecodeError::TruncatedEscape);
            }

            let hi = hex_value(bytes[ix + 1])?;
            let lo = hex_value(bytes[ix + 2])?;
            out.push(hi << 4 | lo);
            ix += 3;
        } else {
            out.push(byte);
            ix += 1;
        }
    }

    String::from_utf8(out).map_err(|_| DecodeError::NotUtf8)
}

/// The characters the legacy encoder passed through unescaped.
///
/// This is the ECMAScript `encodeURIComponent` unreserved set, which is what
/// the old clients used to build the names.
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte)
}

fn hex_digit(nybble: u8) -> u8 {
    debug_assert!(nybble < 16);
    if nybble < 10 {
        b'0' + nybble
    } else {
        b'A' + nybble - 10
    }
}

fn hex_value(digit: u8) -> Result<u8, DecodeError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(DecodeError::BadEscape),
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_simple_addresses() {
        assert_eq!("user+40example.com", encode("user@example.com"));
        assert_eq!("a.b-c_d+40host", encode("a.b-c_d@host"));
        assert_eq!("!~*'()", encode("!~*'()"));
    }

    #[test]
    fn encode_escapes_the_escape_characters() {
        assert_eq!("a+2Bb+40c", encode("a+b@c"));
        assert_eq!("100+25+40x", encode("100%@x"));
    }

    #[test]
    fn encode_non_ascii() {
        // Multi-byte characters are escaped byte by byte.
        assert_eq!("gr+C3+BC+C3+9Fe+40x.de", encode("grüße@x.de"));
    }

    #[test]
    fn decode_accepts_both_escape_styles() {
        assert_eq!("user@example.com", decode("user+40example.com").unwrap());
        assert_eq!("user@example.com", decode("user%40example.com").unwrap());
        assert_eq!("a+b@c", decode("a+2Bb%40c").unwrap());
        assert_eq!("grüße@x.de", decode("gr+C3+bc+c3+9Fe+40x.de").unwrap());
    }

    #[test]
    fn decode_rejects_malformed_names() {
        assert_eq!(Err(DecodeError::TruncatedEscape), decode("user+4"));
        assert_eq!(Err(DecodeError::TruncatedEscape), decode("user%"));
        assert_eq!(Err(DecodeError::BadEscape), decode("user+zz"));
        assert_eq!(Err(DecodeError::BadEscape), decode("user%4g"));
        assert_eq!(Err(DecodeError::NotUtf8), decode("+FFoops"));
    }

    proptest! {
        #[test]
        fn encoding_is_reversible(s in ".*") {
            prop_assert_eq!(Ok(s.clone()), decode(&encode(&s)));
        }

        #[test]
        fn decoding_never_panics(s in ".*") {
            let _ = decode(&s);
        }

        #[test]
        fn encoded_names_have_no_reserved_characters(s in ".*") {
            let encoded = encode(&s);
            prop_assert!(!encoded.contains('/'));
            prop_assert!(!encoded.contains('%'));
            prop_assert!(encoded.chars().all(|c| c.is_ascii()));
        }
    }
}
