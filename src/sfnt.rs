//! Assembly of sfnt font files from encoded tables.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::num::Wrapping;

use log::debug;

use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext};
use crate::binary::{long_align, U32Be};
use crate::checksum;
use crate::error::{LayoutError, WriteError};
use crate::gsub::Substitution;
use crate::table::Record;
use crate::tag::{self, DisplayTag};
use crate::types::Scalar;

/// Magic number the whole font checksum is subtracted from to get `checkSumAdjustment`.
const CHECKSUM_MAGIC: u32 = 0xB1B0AFBA;

/// Offset of `checkSumAdjustment` in the `head` table.
const CHECK_SUM_ADJUSTMENT_OFFSET: usize = 8;

const OFFSET_TABLE_SIZE: usize = 12;

/// Collects encoded tables and writes them out as a font file.
#[derive(Debug, Clone)]
pub struct FontBuilder {
    sfnt_version: u32,
    tables: BTreeMap<u32, Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

impl TableRecord {
    pub const SIZE: usize = 16;

    fn record(&self) -> Record {
        Record::new(
            "TableRecord",
            vec![
                ("tableTag".to_string(), Scalar::Tag(self.table_tag)),
                ("checksum".to_string(), Scalar::ULong(self.checksum)),
                ("offset".to_string(), Scalar::ULong(self.offset)),
                ("length".to_string(), Scalar::ULong(self.length)),
            ],
        )
    }
}

impl FontBuilder {
    /// `sfnt_version` is `0x00010000` for TrueType outlines or `OTTO` for CFF.
    pub fn new(sfnt_version: u32) -> Self {
        FontBuilder {
            sfnt_version,
            tables: BTreeMap::new(),
        }
    }

    /// Add an encoded table, replacing any table with the same tag.
    pub fn add_table(&mut self, table_tag: u32, data: Vec<u8>) {
        self.tables.insert(table_tag, data);
    }

    /// Add the `GSUB` table held by `gsub`, if there is one.
    pub fn add_substitution(&mut self, gsub: &Substitution) -> Result<(), LayoutError> {
        if let Some(data) = gsub.encode()? {
            self.add_table(tag::GSUB, data);
        }
        Ok(())
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Write out the font.
    ///
    /// Tables are written in tag order, each starting on a four byte boundary. If a `head` table
    /// is present its `checkSumAdjustment` is filled in. Tags that are not printable ASCII are
    /// rejected with `WriteError::BadValue`.
    pub fn build(self) -> Result<Vec<u8>, WriteError> {
        let mut font = WriteBuffer::new();
        self.write_offset_table(&mut font)?;

        let mut table_offset = long_align(OFFSET_TABLE_SIZE + self.tables.len() * TableRecord::SIZE);
        let mut tables = Vec::with_capacity(self.tables.len());
        let mut tables_checksum = Wrapping(0);
        for (&table_tag, data) in &self.tables {
            let mut data = data.clone();
            if table_tag == tag::HEAD {
                let adjustment = data
                    .get_mut(CHECK_SUM_ADJUSTMENT_OFFSET..CHECK_SUM_ADJUSTMENT_OFFSET + 4)
                    .ok_or(WriteError::BadValue)?;
                adjustment.copy_from_slice(&[0; 4]);
            }

            let table_checksum = checksum::table_checksum(&data);
            tables_checksum += table_checksum;
            let record = TableRecord {
                table_tag,
                checksum: table_checksum.0,
                offset: u32::try_from(table_offset)?,
                length: u32::try_from(data.len())?,
            };
            debug!(
                "table '{}' at offset {} length {}",
                DisplayTag(table_tag),
                record.offset,
                record.length
            );
            Record::write(&mut font, &record.record())?;

            table_offset += long_align(data.len());
            tables.push((table_tag, data));
        }

        let length = font.bytes_written();
        font.write_zeros(long_align(length) - length)?;

        let font_checksum = checksum::table_checksum(font.bytes()) + tables_checksum;
        let adjustment = Wrapping(CHECKSUM_MAGIC) - font_checksum;

        for (table_tag, data) in tables {
            if table_tag == tag::HEAD {
                font.write_bytes(&data[..CHECK_SUM_ADJUSTMENT_OFFSET])?;
                U32Be::write(&mut font, adjustment.0)?;
                font.write_bytes(&data[CHECK_SUM_ADJUSTMENT_OFFSET + 4..])?;
            } else {
                font.write_bytes(&data)?;
            }
            font.write_zeros(long_align(data.len()) - data.len())?;
        }

        Ok(font.into_inner())
    }

    fn write_offset_table(&self, font: &mut WriteBuffer) -> Result<(), WriteError> {
        let num_tables = u16::try_from(self.tables.len())?;
        let entry_selector = max_power_of_2(num_tables);
        let search_range = (1u32 << entry_selector) * 16;
        let range_shift = (u32::from(num_tables) * 16).saturating_sub(search_range);

        let offset_table = Record::new(
            "OffsetTable",
            vec![
                ("sfntVersion".to_string(), Scalar::ULong(self.sfnt_version)),
                ("numTables".to_string(), Scalar::UShort(num_tables)),
                ("searchRange".to_string(), Scalar::UShort(u16::try_from(search_range)?)),
                ("entrySelector".to_string(), Scalar::UShort(entry_selector)),
                ("rangeShift".to_string(), Scalar::UShort(u16::try_from(range_shift)?)),
            ],
        );
        Record::write(font, &offset_table)?;

        Ok(())
    }
}

/// Calculate the maximum power of 2 that is <= num
fn max_power_of_2(num: u16) -> u16 {
    15u16.saturating_sub(num.leading_zeros() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gsub::SingleSubstitution;
    use byteorder::{BigEndian, ByteOrder};

    fn head_table() -> Vec<u8> {
        let mut head = vec![0; 54];
        // version 1.0
        head[1] = 1;
        // checkSumAdjustment left over from an earlier build
        head[8..12].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        // magicNumber
        head[12..16].copy_from_slice(&[0x5F, 0x0F, 0x3C, 0xF5]);
        head
    }

    #[test]
    fn test_max_power_of_2() {
        assert_eq!(max_power_of_2(0), 0);
        assert_eq!(max_power_of_2(1), 0);
        assert_eq!(max_power_of_2(2), 1);
        assert_eq!(max_power_of_2(3), 1);
        assert_eq!(max_power_of_2(16), 4);
        assert_eq!(max_power_of_2(17), 4);
    }

    #[test]
    fn test_offset_table() {
        let mut builder = FontBuilder::new(tag::OTTO);
        for table_tag in &[tag::GSUB, tag::GPOS, tag::HEAD] {
            builder.add_table(*table_tag, head_table());
        }
        let font = builder.build().unwrap();

        assert_eq!(&font[0..4], b"OTTO");
        assert_eq!(BigEndian::read_u16(&font[4..]), 3); // numTables
        assert_eq!(BigEndian::read_u16(&font[6..]), 32); // searchRange
        assert_eq!(BigEndian::read_u16(&font[8..]), 1); // entrySelector
        assert_eq!(BigEndian::read_u16(&font[10..]), 16); // rangeShift
    }

    #[test]
    fn test_table_directory() {
        let mut builder = FontBuilder::new(tag::TRUE_TYPE);
        builder.add_table(tag::HEAD, head_table());
        builder.add_table(tag::GPOS, vec![1, 2, 3, 4, 5]);
        builder.add_table(tag::GSUB, vec![6, 7]);
        let font = builder.build().unwrap();

        let records: Vec<_> = (0..3)
            .map(|i| {
                let record = &font[OFFSET_TABLE_SIZE + i * TableRecord::SIZE..];
                (
                    BigEndian::read_u32(record),
                    BigEndian::read_u32(&record[8..]),
                    BigEndian::read_u32(&record[12..]),
                )
            })
            .collect();
        // Sorted by tag, each table on a four byte boundary
        assert_eq!(
            records,
            vec![
                (tag::GPOS, 60, 5),
                (tag::GSUB, 68, 2),
                (tag::HEAD, 72, 54)
            ]
        );
        assert_eq!(&font[60..68], &[1, 2, 3, 4, 5, 0, 0, 0]);
        assert_eq!(&font[68..72], &[6, 7, 0, 0]);
        assert_eq!(font.len(), 72 + 56);

        // Table checksums cover the padded data
        let gpos_checksum = BigEndian::read_u32(&font[OFFSET_TABLE_SIZE + 4..]);
        assert_eq!(gpos_checksum, 0x0102_0304 + 0x0500_0000);
    }

    #[test]
    fn test_check_sum_adjustment() {
        let mut builder = FontBuilder::new(tag::TRUE_TYPE);
        builder.add_table(tag::HEAD, head_table());
        builder.add_table(tag::GSUB, vec![0xFF; 7]);
        let font = builder.build().unwrap();

        assert_eq!(checksum::table_checksum(&font), Wrapping(CHECKSUM_MAGIC));

        // The head record checksum is calculated with checkSumAdjustment zeroed
        let mut head = head_table();
        head[8..12].copy_from_slice(&[0; 4]);
        let head_record = &font[OFFSET_TABLE_SIZE + TableRecord::SIZE..];
        assert_eq!(
            BigEndian::read_u32(&head_record[4..]),
            checksum::table_checksum(&head).0
        );
    }

    #[test]
    fn test_short_head_table() {
        let mut builder = FontBuilder::new(tag::TRUE_TYPE);
        builder.add_table(tag::HEAD, vec![0; 10]);
        assert_eq!(builder.build(), Err(WriteError::BadValue));
    }

    #[test]
    fn test_add_substitution() {
        let mut builder = FontBuilder::new(tag::TRUE_TYPE);
        builder.add_substitution(&Substitution::new()).unwrap();
        assert_eq!(builder.num_tables(), 0);

        let mut gsub = Substitution::new();
        gsub.add_single(tag::SS01, SingleSubstitution { sub: 5, by: 9 }, None, None)
            .unwrap();
        builder.add_substitution(&gsub).unwrap();
        assert_eq!(builder.num_tables(), 1);

        let expected = gsub.encode().unwrap().unwrap();
        let font = builder.build().unwrap();
        assert_eq!(&font[12..16], b"GSUB");
        assert_eq!(&font[28..28 + expected.len()], expected.as_slice());
    }
}
