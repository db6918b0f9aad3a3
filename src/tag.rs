//! Four byte OpenType tags.
//!
//! Tags are held as big-endian `u32` values, so `tag::GSUB` is `0x47535542`.

use crate::error::ParseError;
use std::fmt;

/// Generate a 4-byte font table tag from byte string
///
/// Example:
///
/// ```ignore
/// assert_eq!(tag!(b"glyf"), 0x676C7966);
/// ```
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    ((chars[3] as u32) << 0)
        | ((chars[2] as u32) << 8)
        | ((chars[1] as u32) << 16)
        | ((chars[0] as u32) << 24)
}

/// Build a tag from a string of up to four ASCII characters, padding with spaces.
pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

/// Returns `true` if every byte of `tag` is printable ASCII (0x20..=0x7E).
pub fn is_valid(tag: u32) -> bool {
    tag.to_be_bytes()
        .iter()
        .all(|&b| (0x20..=0x7E).contains(&b))
}

/// The `ssNN` stylistic set feature tag, for `n` in `1..=20`.
pub fn stylistic_set(n: u8) -> Option<u32> {
    match n {
        1..=20 => Some(tag([b's', b's', b'0' + n / 10, b'0' + n % 10])),
        _ => None,
    }
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.0;
        let mut s = String::with_capacity(4);
        s.push(char::from((tag >> 24) as u8));
        s.push(char::from(((tag >> 16) & 255) as u8));
        s.push(char::from(((tag >> 8) & 255) as u8));
        s.push(char::from((tag & 255) as u8));
        if s.chars().any(|c| !c.is_ascii() || c.is_ascii_control()) {
            write!(f, "0x{:08x}", tag)
        } else {
            s.fmt(f)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

// Tables
pub const GPOS: u32 = tag!(b"GPOS");
pub const GSUB: u32 = tag!(b"GSUB");
pub const HEAD: u32 = tag!(b"head");

// Scripts and languages
pub const DFLT: u32 = tag!(b"DFLT");
/// The default language system tag. Some fonts spell it `DFLT`.
pub const DFLT_LANG: u32 = tag!(b"dflt");
pub const LATN: u32 = tag!(b"latn");

// Features
pub const AALT: u32 = tag!(b"aalt");
pub const CCMP: u32 = tag!(b"ccmp");
pub const DLIG: u32 = tag!(b"dlig");
pub const LIGA: u32 = tag!(b"liga");
pub const RLIG: u32 = tag!(b"rlig");
pub const SALT: u32 = tag!(b"salt");
pub const SS01: u32 = tag!(b"ss01");
pub const SS20: u32 = tag!(b"ss20");
pub const STCH: u32 = tag!(b"stch");

// sfnt versions
pub const OTTO: u32 = tag!(b"OTTO");
pub const TRUE_TYPE: u32 = 0x0001_0000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        assert_eq!(from_string("GSUB").unwrap(), GSUB);
        assert_eq!(from_string("cvt").unwrap(), 0x63767420);
        assert_eq!(from_string("toolong"), Err(ParseError::BadValue));
        assert_eq!(from_string("a\u{7}"), Err(ParseError::BadValue));
    }

    #[test]
    fn test_display_tag() {
        assert_eq!(DisplayTag(LIGA).to_string(), "liga");
        assert_eq!(DisplayTag(0x00010000).to_string(), "0x00010000");
    }

    #[test]
    fn test_stylistic_set() {
        assert_eq!(stylistic_set(1), Some(SS01));
        assert_eq!(stylistic_set(20), Some(SS20));
        assert_eq!(stylistic_set(12), Some(from_string("ss12").unwrap()));
        assert_eq!(stylistic_set(0), None);
        assert_eq!(stylistic_set(21), None);
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(DFLT));
        assert!(is_valid(from_string("cvt").unwrap()));
        assert!(!is_valid(TRUE_TYPE));
    }
}
