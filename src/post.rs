//! Parsing of the `post` table.
//!
//! Only the glyph names are retained. Names that cannot be resolved (an index past the end of
//! the string data, a string that is not UTF-8, a truncated table) become `None` for that glyph
//! rather than failing the whole table.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/post>

use std::str;

use log::debug;

use crate::binary::read::{ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt};
use crate::binary::{I8, U16Be};
use crate::error::ParseError;
use crate::tables::Fixed;

pub struct PostTable<'a> {
    pub header: Header,
    pub num_glyphs: usize,
    pub names: GlyphNames<'a>,
}

pub struct Header {
    pub version: u32,
    pub italic_angle: Fixed,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: u32,
    pub min_mem_type_42: u32,
    pub max_mem_type_42: u32,
    pub min_mem_type_1: u32,
    pub max_mem_type_1: u32,
}

/// Glyph name data, by table version.
pub enum GlyphNames<'a> {
    /// Version 1.0: the standard Macintosh ordering.
    Standard,
    /// Version 2.0: an index per glyph into the standard names followed by the table's own
    /// Pascal strings.
    Indexed {
        glyph_name_index: ReadArray<'a, U16Be>,
        strings: Vec<&'a [u8]>,
    },
    /// Version 2.5: a signed offset per glyph into the standard names.
    Offsets(ReadArray<'a, I8>),
    /// Version 3.0: no names.
    None,
}

impl ReadBinary for Header {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        let italic_angle = ctxt.read::<Fixed>()?;
        let underline_position = ctxt.read_i16be()?;
        let underline_thickness = ctxt.read_i16be()?;
        let is_fixed_pitch = ctxt.read_u32be()?;
        let min_mem_type_42 = ctxt.read_u32be()?;
        let max_mem_type_42 = ctxt.read_u32be()?;
        let min_mem_type_1 = ctxt.read_u32be()?;
        let max_mem_type_1 = ctxt.read_u32be()?;

        Ok(Header {
            version,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            min_mem_type_42,
            max_mem_type_42,
            min_mem_type_1,
            max_mem_type_1,
        })
    }
}

impl ReadBinaryDep for PostTable<'_> {
    type Args<'a> = usize;
    type HostType<'a> = PostTable<'a>;

    /// Read a `post` table for a font with `num_glyphs` glyphs.
    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        num_glyphs: usize,
    ) -> Result<PostTable<'a>, ParseError> {
        let header = ctxt.read::<Header>()?;
        let names = match header.version {
            0x00010000 => GlyphNames::Standard,
            0x00020000 => {
                let count = usize::from(ctxt.read_u16be()?);
                let glyph_name_index = ctxt.read_array::<U16Be>(count)?;
                let num_strings = glyph_name_index
                    .iter()
                    .filter(|&index| usize::from(index) >= MAC_GLYPH_NAMES.len())
                    .map(|index| usize::from(index) - MAC_GLYPH_NAMES.len() + 1)
                    .max()
                    .unwrap_or(0);
                let mut strings = Vec::with_capacity(num_strings);
                while strings.len() < num_strings {
                    match read_pascal_string(ctxt) {
                        Ok(bytes) => strings.push(bytes),
                        Err(_) => {
                            debug!("post: string data ends after {} names", strings.len());
                            break;
                        }
                    }
                }
                GlyphNames::Indexed {
                    glyph_name_index,
                    strings,
                }
            }
            0x00025000 => {
                let count = usize::from(ctxt.read_u16be()?);
                GlyphNames::Offsets(ctxt.read_array::<I8>(count)?)
            }
            0x00030000 => GlyphNames::None,
            _ => return Err(ParseError::BadVersion),
        };

        Ok(PostTable {
            header,
            num_glyphs,
            names,
        })
    }
}

fn read_pascal_string<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<&'a [u8], ParseError> {
    let length = ctxt.read_u8()?;
    Ok(ctxt.read_slice(usize::from(length))?)
}

impl<'a> PostTable<'a> {
    /// The name of `glyph_index`, if the table has a usable one.
    pub fn glyph_name(&self, glyph_index: usize) -> Option<&'a str> {
        if glyph_index >= self.num_glyphs {
            return None;
        }

        match &self.names {
            GlyphNames::Standard => MAC_GLYPH_NAMES.get(glyph_index).copied(),
            GlyphNames::Indexed {
                glyph_name_index,
                strings,
            } => {
                let name_index = usize::from(glyph_name_index.get_item(glyph_index)?);
                match name_index.checked_sub(MAC_GLYPH_NAMES.len()) {
                    None => Some(MAC_GLYPH_NAMES[name_index]),
                    Some(index) => str::from_utf8(strings.get(index)?).ok(),
                }
            }
            GlyphNames::Offsets(offsets) => {
                let offset = isize::from(offsets.get_item(glyph_index)?);
                let index = glyph_index.checked_add_signed(offset)?;
                MAC_GLYPH_NAMES.get(index).copied()
            }
            GlyphNames::None => None,
        }
    }

    /// One entry per glyph of the font.
    pub fn glyph_names(&self) -> Vec<Option<String>> {
        (0..self.num_glyphs)
            .map(|glyph_index| self.glyph_name(glyph_index).map(String::from))
            .collect()
    }
}

static MAC_GLYPH_NAMES: [&str; 258] = [
    ".notdef",
    ".null",
    "nonmarkingreturn",
    "space",
    "exclam",
    "quotedbl",
    "numbersign",
    "dollar",
    "percent",
    "ampersand",
    "quotesingle",
    "parenleft",
    "parenright",
    "asterisk",
    "plus",
    "comma",
    "hyphen",
    "period",
    "slash",
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "colon",
    "semicolon",
    "less",
    "equal",
    "greater",
    "question",
    "at",
    "A",
    "B",
    "C",
    "D",
    "E",
    "F",
    "G",
    "H",
    "I",
    "J",
    "K",
    "L",
    "M",
    "N",
    "O",
    "P",
    "Q",
    "R",
    "S",
    "T",
    "U",
    "V",
    "W",
    "X",
    "Y",
    "Z",
    "bracketleft",
    "backslash",
    "bracketright",
    "asciicircum",
    "underscore",
    "grave",
    "a",
    "b",
    "c",
    "d",
    "e",
    "f",
    "g",
    "h",
    "i",
    "j",
    "k",
    "l",
    "m",
    "n",
    "o",
    "p",
    "q",
    "r",
    "s",
    "t",
    "u",
    "v",
    "w",
    "x",
    "y",
    "z",
    "braceleft",
    "bar",
    "braceright",
    "asciitilde",
    "Adieresis",
    "Aring",
    "Ccedilla",
    "Eacute",
    "Ntilde",
    "Odieresis",
    "Udieresis",
    "aacute",
    "agrave",
    "acircumflex",
    "adieresis",
    "atilde",
    "aring",
    "ccedilla",
    "eacute",
    "egrave",
    "ecircumflex",
    "edieresis",
    "iacute",
    "igrave",
    "icircumflex",
    "idieresis",
    "ntilde",
    "oacute",
    "ograve",
    "ocircumflex",
    "odieresis",
    "otilde",
    "uacute",
    "ugrave",
    "ucircumflex",
    "udieresis",
    "dagger",
    "degree",
    "cent",
    "sterling",
    "section",
    "bullet",
    "paragraph",
    "germandbls",
    "registered",
    "copyright",
    "trademark",
    "acute",
    "dieresis",
    "notequal",
    "AE",
    "Oslash",
    "infinity",
    "plusminus",
    "lessequal",
    "greaterequal",
    "yen",
    "mu",
    "partialdiff",
    "summation",
    "product",
    "pi",
    "integral",
    "ordfeminine",
    "ordmasculine",
    "Omega",
    "ae",
    "oslash",
    "questiondown",
    "exclamdown",
    "logicalnot",
    "radical",
    "florin",
    "approxequal",
    "Delta",
    "guillemotleft",
    "guillemotright",
    "ellipsis",
    "nonbreakingspace",
    "Agrave",
    "Atilde",
    "Otilde",
    "OE",
    "oe",
    "endash",
    "emdash",
    "quotedblleft",
    "quotedblright",
    "quoteleft",
    "quoteright",
    "divide",
    "lozenge",
    "ydieresis",
    "Ydieresis",
    "fraction",
    "currency",
    "guilsinglleft",
    "guilsinglright",
    "fi",
    "fl",
    "daggerdbl",
    "periodcentered",
    "quotesinglbase",
    "quotedblbase",
    "perthousand",
    "Acircumflex",
    "Ecircumflex",
    "Aacute",
    "Edieresis",
    "Egrave",
    "Iacute",
    "Icircumflex",
    "Idieresis",
    "Igrave",
    "Oacute",
    "Ocircumflex",
    "apple",
    "Ograve",
    "Uacute",
    "Ucircumflex",
    "Ugrave",
    "dotlessi",
    "circumflex",
    "tilde",
    "macron",
    "breve",
    "dotaccent",
    "ring",
    "cedilla",
    "hungarumlaut",
    "ogonek",
    "caron",
    "Lslash",
    "lslash",
    "Scaron",
    "scaron",
    "Zcaron",
    "zcaron",
    "brokenbar",
    "Eth",
    "eth",
    "Yacute",
    "yacute",
    "Thorn",
    "thorn",
    "minus",
    "multiply",
    "onesuperior",
    "twosuperior",
    "threesuperior",
    "onehalf",
    "onequarter",
    "threequarters",
    "franc",
    "Gbreve",
    "gbreve",
    "Idotaccent",
    "Scedilla",
    "scedilla",
    "Cacute",
    "cacute",
    "Ccaron",
    "ccaron",
    "dcroat",
];
