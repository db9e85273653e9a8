//! Table directory parsing for single fonts (`.ttf`) and font collections (`.ttc`).
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>

use log::{debug, warn};

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::U32Be;
use crate::checksum;
use crate::error::ParseError;
use crate::tag::{self, DisplayTag};

/// sfnt version of a TrueType font
pub const TTF_MAGIC: u32 = 0x00010000;

/// The tables this crate knows how to decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TableTag {
    Header,
    MaxProfile,
    PostScript,
    HorizontalHeader,
    CharMap,
    Location,
    GlyphData,
    HorizontalMetrics,
    Name,
}

/// Location of a table within the font data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TableEntry {
    pub offset: u32,
    pub length: u32,
}

/// The recognized tables of one font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMap {
    pub head: TableEntry,
    pub maxp: TableEntry,
    pub loca: TableEntry,
    pub glyf: TableEntry,
    pub post: Option<TableEntry>,
    pub hhea: Option<TableEntry>,
    pub cmap: Option<TableEntry>,
    pub hmtx: Option<TableEntry>,
    pub name: Option<TableEntry>,
}

/// An entry in the table directory
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// OpenType Offset Table
pub struct OffsetTable<'a> {
    pub sfnt_version: u32,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
    pub table_records: ReadArray<'a, TableRecord>,
}

/// TrueType collection header
pub struct TTCHeader<'a> {
    pub major_version: u16,
    pub minor_version: u16,
    pub offset_tables: ReadArray<'a, U32Be>,
}

impl TableTag {
    pub const ALL: [TableTag; 9] = [
        TableTag::Header,
        TableTag::MaxProfile,
        TableTag::PostScript,
        TableTag::HorizontalHeader,
        TableTag::CharMap,
        TableTag::Location,
        TableTag::GlyphData,
        TableTag::HorizontalMetrics,
        TableTag::Name,
    ];

    pub fn from_tag(tag: u32) -> Option<TableTag> {
        TableTag::ALL.into_iter().find(|table_tag| table_tag.tag() == tag)
    }

    pub fn tag(self) -> u32 {
        match self {
            TableTag::Header => tag::HEAD,
            TableTag::MaxProfile => tag::MAXP,
            TableTag::PostScript => tag::POST,
            TableTag::HorizontalHeader => tag::HHEA,
            TableTag::CharMap => tag::CMAP,
            TableTag::Location => tag::LOCA,
            TableTag::GlyphData => tag::GLYF,
            TableTag::HorizontalMetrics => tag::HMTX,
            TableTag::Name => tag::NAME,
        }
    }
}

impl TableEntry {
    /// Scope covering exactly this table.
    pub fn read_table<'a>(&self, scope: &ReadScope<'a>) -> Result<ReadScope<'a>, ParseError> {
        let offset = usize::try_from(self.offset)?;
        let length = usize::try_from(self.length)?;
        scope.offset_length(offset, length)
    }
}

impl TableMap {
    pub fn get(&self, table_tag: TableTag) -> Option<TableEntry> {
        match table_tag {
            TableTag::Header => Some(self.head),
            TableTag::MaxProfile => Some(self.maxp),
            TableTag::Location => Some(self.loca),
            TableTag::GlyphData => Some(self.glyf),
            TableTag::PostScript => self.post,
            TableTag::HorizontalHeader => self.hhea,
            TableTag::CharMap => self.cmap,
            TableTag::HorizontalMetrics => self.hmtx,
            TableTag::Name => self.name,
        }
    }

    /// Scope covering the table `table_tag`, `None` if the font does not have it.
    pub fn read_table<'a>(
        &self,
        scope: &ReadScope<'a>,
        table_tag: TableTag,
    ) -> Result<Option<ReadScope<'a>>, ParseError> {
        self.get(table_tag)
            .map(|entry| entry.read_table(scope))
            .transpose()
    }
}

impl ReadBinary for OffsetTable<'_> {
    type HostType<'a> = OffsetTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<OffsetTable<'a>, ParseError> {
        let sfnt_version = ctxt.read_u32be()?;
        match sfnt_version {
            TTF_MAGIC | tag::TRUE => {
                let num_tables = ctxt.read_u16be()?;
                let search_range = ctxt.read_u16be()?;
                let entry_selector = ctxt.read_u16be()?;
                let range_shift = ctxt.read_u16be()?;
                let table_records = ctxt.read_array::<TableRecord>(usize::from(num_tables))?;
                Ok(OffsetTable {
                    sfnt_version,
                    search_range,
                    entry_selector,
                    range_shift,
                    table_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadBinary for TTCHeader<'_> {
    type HostType<'a> = TTCHeader<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<TTCHeader<'a>, ParseError> {
        let ttc_tag = ctxt.read_u32be()?;
        match ttc_tag {
            tag::TTCF => {
                let major_version = ctxt.read_u16be()?;
                let minor_version = ctxt.read_u16be()?;
                ctxt.check_version(major_version == 1 || major_version == 2)?;
                let num_fonts = usize::try_from(ctxt.read_u32be()?)?;
                let offset_tables = ctxt.read_array::<U32Be>(num_fonts)?;
                // Version 2 digital signature fields are not needed
                Ok(TTCHeader {
                    major_version,
                    minor_version,
                    offset_tables,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadFrom for TableRecord {
    type ReadType = ((U32Be, U32Be), (U32Be, U32Be));
    fn read_from(((table_tag, checksum), (offset, length)): ((u32, u32), (u32, u32))) -> Self {
        TableRecord {
            table_tag,
            checksum,
            offset,
            length,
        }
    }
}

impl OffsetTable<'_> {
    pub fn find_table_record(&self, tag: u32) -> Option<TableRecord> {
        self.table_records
            .iter()
            .find(|table_record| table_record.table_tag == tag)
    }

    /// Resolve the recognized tables against `scope`, the whole font file.
    pub fn table_map(&self, scope: &ReadScope<'_>) -> Result<TableMap, ParseError> {
        let mut entries = [None; 9];
        for (slot, table_tag) in entries.iter_mut().zip(TableTag::ALL) {
            *slot = match self.find_table_record(table_tag.tag()) {
                Some(record) => Some(record.verify(scope)?),
                None => None,
            };
        }
        for record in self.table_records.iter() {
            if TableTag::from_tag(record.table_tag).is_none() {
                debug!("ignoring table '{}'", DisplayTag(record.table_tag));
            }
        }

        let [head, maxp, post, hhea, cmap, loca, glyf, hmtx, name] = entries;
        let mandatory =
            |entry: Option<TableEntry>, table: u32| entry.ok_or(ParseError::MissingTable(table));
        Ok(TableMap {
            head: mandatory(head, tag::HEAD)?,
            maxp: mandatory(maxp, tag::MAXP)?,
            loca: mandatory(loca, tag::LOCA)?,
            glyf: mandatory(glyf, tag::GLYF)?,
            post,
            hhea,
            cmap,
            hmtx,
            name,
        })
    }
}

impl TableRecord {
    /// Check that the table lies within `scope` and log a checksum mismatch.
    fn verify(&self, scope: &ReadScope<'_>) -> Result<TableEntry, ParseError> {
        let entry = TableEntry {
            offset: self.offset,
            length: self.length,
        };
        let end = usize::try_from(self.offset)?
            .checked_add(usize::try_from(self.length)?)
            .ok_or(ParseError::BadOffset)?;
        if end > scope.data().len() {
            return Err(ParseError::BadOffset);
        }

        let data = entry.read_table(scope)?.data();
        let actual = if self.table_tag == tag::HEAD {
            checksum::head_checksum(data)
        } else {
            checksum::table_checksum(data)
        };
        if actual.0 != self.checksum {
            warn!(
                "checksum mismatch in '{}' table: expected {:#010x}, got {:#010x}",
                DisplayTag(self.table_tag),
                self.checksum,
                actual.0
            );
        }

        Ok(entry)
    }
}

/// Parse the table directory of a single font.
///
/// Fails on an unrecognized signature (including CFF fonts and collections), a directory that
/// runs past the data, a table outside the data or a missing mandatory table.
pub fn parse_file_header(scope: ReadScope<'_>) -> Result<TableMap, ParseError> {
    read_table_directory(&scope, 0)
}

/// Parse the header of a font collection and the table directory of every font in it.
pub fn parse_shared_file_header(scope: ReadScope<'_>) -> Result<Vec<TableMap>, ParseError> {
    let header = scope.read::<TTCHeader<'_>>()?;
    header
        .offset_tables
        .iter()
        .map(|offset| read_table_directory(&scope, usize::try_from(offset)?))
        .collect()
}

fn read_table_directory(scope: &ReadScope<'_>, offset: usize) -> Result<TableMap, ParseError> {
    if offset >= scope.data().len() {
        return Err(ParseError::BadOffset);
    }
    let offset_table = scope.offset(offset).read::<OffsetTable<'_>>()?;
    offset_table.table_map(scope)
}
