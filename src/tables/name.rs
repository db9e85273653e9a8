//! Parsing of the `name` table.
//!
//! Records are decoded to `String`s up front so that `FontNames` owns its data. Records in
//! encodings that cannot be decoded are dropped.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/name>

use encoding_rs::{DecoderResult, Encoding, BIG5, EUC_KR, GBK, MACINTOSH, SHIFT_JIS, UTF_16BE};
use log::debug;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::U16Be;
use crate::error::ParseError;

/// Well known name ids.
pub struct NameId;

impl NameId {
    pub const COPYRIGHT: u16 = 0;
    pub const FAMILY: u16 = 1;
    pub const SUBFAMILY: u16 = 2;
    pub const UNIQUE_ID: u16 = 3;
    pub const FULL_NAME: u16 = 4;
    pub const VERSION: u16 = 5;
    pub const POSTSCRIPT_NAME: u16 = 6;
}

/// `name` table
pub struct NameTable<'a> {
    pub string_storage: ReadScope<'a>,
    pub name_records: ReadArray<'a, NameRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub length: u16,
    pub offset: u16,
}

/// A decoded name record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub value: String,
}

/// Every decodable record of a `name` table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FontNames {
    pub entries: Vec<NameEntry>,
}

#[derive(Debug, Copy, Clone)]
enum NameEncoding {
    Utf16Be,
    /// A legacy encoding stored as-is.
    Bytes(&'static Encoding),
    /// A legacy Windows encoding stored in 16-bit units; single byte characters carry a zero
    /// high byte which is dropped before decoding.
    WideBytes(&'static Encoding),
}

impl ReadBinary for NameTable<'_> {
    type HostType<'a> = NameTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<NameTable<'a>, ParseError> {
        let scope = ctxt.scope();

        let format = ctxt.read_u16be()?;
        ctxt.check_version(format <= 1)?;
        let count = usize::from(ctxt.read_u16be()?);
        let string_offset = usize::from(ctxt.read_u16be()?);
        let string_storage = scope.offset(string_offset);
        let name_records = ctxt.read_array::<NameRecord>(count)?;

        Ok(NameTable {
            string_storage,
            name_records,
        })
    }
}

impl ReadFrom for NameRecord {
    type ReadType = ((U16Be, U16Be, U16Be), (U16Be, U16Be, U16Be));
    fn read_from(
        ((platform_id, encoding_id, language_id), (name_id, length, offset)): (
            (u16, u16, u16),
            (u16, u16, u16),
        ),
    ) -> Self {
        NameRecord {
            platform_id,
            encoding_id,
            language_id,
            name_id,
            length,
            offset,
        }
    }
}

impl NameTable<'_> {
    /// Decode every record. Records that point outside the string storage or use an
    /// unsupported encoding are skipped.
    pub fn font_names(&self) -> FontNames {
        let entries = self
            .name_records
            .iter()
            .filter_map(|record| {
                let value = self.decode_record(&record);
                if value.is_none() {
                    debug!(
                        "skipping name record {} ({}, {}, {})",
                        record.name_id, record.platform_id, record.encoding_id, record.language_id
                    );
                }
                Some(NameEntry {
                    platform_id: record.platform_id,
                    encoding_id: record.encoding_id,
                    language_id: record.language_id,
                    name_id: record.name_id,
                    value: value?,
                })
            })
            .collect();

        FontNames { entries }
    }

    fn decode_record(&self, record: &NameRecord) -> Option<String> {
        let encoding = name_encoding(record.platform_id, record.encoding_id)?;
        let data = self
            .string_storage
            .offset_length(usize::from(record.offset), usize::from(record.length))
            .ok()?
            .data();
        decode_name(encoding, data)
    }
}

impl FontNames {
    /// The best available string for `name_id`, preferring full Unicode records and falling
    /// back to Macintosh Roman.
    pub fn get(&self, name_id: u16) -> Option<&str> {
        let mut best = 0;
        let mut result = None;
        for entry in self.entries.iter().filter(|entry| entry.name_id == name_id) {
            let score = score_encoding(entry.platform_id, entry.encoding_id, entry.language_id);
            if best < score {
                best = score;
                result = Some(entry.value.as_str());
            }
        }
        result
    }

    pub fn family(&self) -> Option<&str> {
        self.get(NameId::FAMILY)
    }

    pub fn subfamily(&self) -> Option<&str> {
        self.get(NameId::SUBFAMILY)
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get(NameId::FULL_NAME)
    }

    pub fn postscript_name(&self) -> Option<&str> {
        self.get(NameId::POSTSCRIPT_NAME)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn name_encoding(platform_id: u16, encoding_id: u16) -> Option<NameEncoding> {
    match (platform_id, encoding_id) {
        (0, _) => Some(NameEncoding::Utf16Be),
        (1, 0) => Some(NameEncoding::Bytes(MACINTOSH)),
        (1, 1) => Some(NameEncoding::Bytes(SHIFT_JIS)),
        (1, 2) => Some(NameEncoding::Bytes(BIG5)),
        (1, 3) => Some(NameEncoding::Bytes(EUC_KR)),
        (1, 25) => Some(NameEncoding::Bytes(GBK)),
        (3, 0) | (3, 1) | (3, 10) => Some(NameEncoding::Utf16Be),
        (3, 2) => Some(NameEncoding::WideBytes(SHIFT_JIS)),
        (3, 3) => Some(NameEncoding::WideBytes(GBK)),
        (3, 4) => Some(NameEncoding::WideBytes(BIG5)),
        (3, 5) => Some(NameEncoding::WideBytes(EUC_KR)),
        _ => None,
    }
}

fn score_encoding(platform_id: u16, encoding_id: u16, language_id: u16) -> usize {
    match (platform_id, encoding_id, language_id) {
        // Windows; Unicode full repertoire
        (3, 10, _) => 1000,

        // Unicode; Unicode full repertoire
        (0, 6, 0) => 900,

        // Unicode; Unicode 2.0 and onwards semantics, Unicode full repertoire
        (0, 4, 0) => 800,

        // Windows; Unicode BMP
        (3, 1, 0x409) => 750,
        (3, 1, _) => 700,

        // Unicode; Unicode 2.0 and onwards semantics, Unicode BMP only
        (0, 3, 0) => 600,

        // Unicode; ISO/IEC 10646 semantics
        (0, 2, 0) => 500,

        // Unicode; Unicode 1.1 semantics
        (0, 1, 0) => 400,

        // Unicode; Unicode 1.0 semantics
        (0, 0, 0) => 300,

        // Windows, Symbol
        (3, 0, _) => 200,

        // Windows and Macintosh CJK encodings
        (3, 2..=5, _) => 175,
        (1, 1..=3, _) | (1, 25, _) => 160,

        // Apple Roman
        (1, 0, 0) => 150,
        (1, 0, _) => 100,

        // Unicode with a language
        (0, _, _) => 50,
        _ => 0,
    }
}

fn decode_name(encoding: NameEncoding, data: &[u8]) -> Option<String> {
    let (mut decoder, data) = match encoding {
        NameEncoding::Utf16Be => (UTF_16BE.new_decoder_without_bom_handling(), data.to_vec()),
        NameEncoding::Bytes(encoding) => {
            (encoding.new_decoder_without_bom_handling(), data.to_vec())
        }
        NameEncoding::WideBytes(encoding) => (
            encoding.new_decoder_without_bom_handling(),
            data.iter().copied().filter(|&b| b != 0).collect(),
        ),
    };
    let size = decoder.max_utf8_buffer_length_without_replacement(data.len())?;
    let mut s = String::with_capacity(size);
    let (res, _read) = decoder.decode_to_string_without_replacement(&data, &mut s, true);
    match res {
        DecoderResult::InputEmpty => Some(s),
        DecoderResult::OutputFull => None, // should not happen
        DecoderResult::Malformed(_, _) => None,
    }
}
