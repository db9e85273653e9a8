#![deny(missing_docs)]

use std::num::Wrapping;

/// Calculate a checksum of `data` according to the OpenType table checksum algorithm
///
/// A trailing partial word is padded with zero bytes.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/otff#calculating-checksums
pub fn table_checksum(data: &[u8]) -> Wrapping<u32> {
    data.chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            Wrapping(u32::from_be_bytes(word))
        })
        .sum()
}

/// Calculate the checksum of a `head` table, treating `checkSumAdjustment` as zero.
pub fn head_checksum(data: &[u8]) -> Wrapping<u32> {
    // checkSumAdjustment is the third u32 of the table
    let adjustment = data
        .get(8..12)
        .map(table_checksum)
        .unwrap_or(Wrapping(0));
    table_checksum(data) - adjustment
}
