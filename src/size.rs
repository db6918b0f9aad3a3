//! Definitions of the sizes of binary types.

use std::mem;

pub const U8: usize = mem::size_of::<u8>();
pub const U16: usize = mem::size_of::<u16>();
pub const I16: usize = mem::size_of::<i16>();
pub const U24: usize = 3;
pub const U32: usize = mem::size_of::<u32>();
pub const I32: usize = mem::size_of::<i32>();
pub const I64: usize = mem::size_of::<i64>();

/// 16.16 fixed-point number.
pub const FIXED: usize = I32;
/// Seconds since 1904-01-01 00:00 UTC.
pub const LONG_DATE_TIME: usize = I64;
/// Four byte tag.
pub const TAG: usize = U32;
/// Offset from the start of the enclosing table.
pub const OFFSET16: usize = U16;
