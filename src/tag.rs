//! Four byte table identifiers.

use crate::error::ParseError;
use std::fmt;

/// Generate a 4-byte font table tag from byte string
///
/// Example:
///
/// ```
/// use fontscan::tag;
///
/// assert_eq!(tag::GLYF, 0x676C7966);
/// ```
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

/// Wrapper type for a tag that implements `Display`
///
/// Example:
///
/// ```
/// use fontscan::tag::{self, DisplayTag};
///
/// assert_eq!(DisplayTag(tag::HHEA).to_string(), "hhea");
/// assert_eq!(DisplayTag(0x00010000).to_string(), "0x00010000");
/// ```
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    ((chars[3] as u32) << 0)
        | ((chars[2] as u32) << 8)
        | ((chars[1] as u32) << 16)
        | ((chars[0] as u32) << 24)
}

/// Parse a tag from its string form, padding short tags with spaces.
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

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            let s = bytes.iter().map(|&b| char::from(b)).collect::<String>();
            f.write_str(&s)
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// `cmap`
pub const CMAP: u32 = tag!(b"cmap");
/// `glyf`
pub const GLYF: u32 = tag!(b"glyf");
/// `head`
pub const HEAD: u32 = tag!(b"head");
/// `hhea`
pub const HHEA: u32 = tag!(b"hhea");
/// `hmtx`
pub const HMTX: u32 = tag!(b"hmtx");
/// `loca`
pub const LOCA: u32 = tag!(b"loca");
/// `maxp`
pub const MAXP: u32 = tag!(b"maxp");
/// `name`
pub const NAME: u32 = tag!(b"name");
/// `OTTO`, CFF based OpenType
pub const OTTO: u32 = tag!(b"OTTO");
/// `post`
pub const POST: u32 = tag!(b"post");
/// `true`, Apple TrueType
pub const TRUE: u32 = tag!(b"true");
/// `ttcf`, font collection
pub const TTCF: u32 = tag!(b"ttcf");
