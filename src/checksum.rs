#![deny(missing_docs)]

//! Table checksums.

use std::num::Wrapping;

use byteorder::{BigEndian, ByteOrder};

/// Calculate a checksum of `data` according to the OpenType table checksum algorithm
///
/// Data that is not a multiple of four bytes long is treated as if padded with zeros.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/otff#calculating-checksums
pub fn table_checksum(data: &[u8]) -> Wrapping<u32> {
    let mut chunks = data.chunks_exact(4);
    let mut sum: Wrapping<u32> = chunks
        .by_ref()
        .map(|chunk| Wrapping(BigEndian::read_u32(chunk)))
        .sum();

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut last = [0u8; 4];
        last[..rest.len()].copy_from_slice(rest);
        sum += Wrapping(BigEndian::read_u32(&last));
    }

    sum
}
