/// Read binary data
pub mod read;

/// Write binary data
pub mod write;

use crate::size;

/// Calculate the length required to 32-bit (long) align data of length `len`
///
/// Example:
///
/// ```
/// use otlayout::binary::long_align;
///
/// let length = 123;
/// let padded_length = long_align(length);
/// assert_eq!(padded_length, 124);
/// ```
pub const fn long_align(len: usize) -> usize {
    (len + 3) / 4 * 4
}

/// Types with a fixed encoded width.
///
/// Placeholders reserve exactly `SIZE` bytes for a value of this type.
pub trait FixedSize {
    const SIZE: usize;
}

#[derive(Copy, Clone)]
pub enum U8 {}

#[derive(Copy, Clone)]
pub enum U16Be {}

#[derive(Copy, Clone)]
pub enum I16Be {}

#[derive(Copy, Clone)]
pub enum U24Be {}

#[derive(Copy, Clone)]
pub enum U32Be {}

#[derive(Copy, Clone)]
pub enum I32Be {}

#[derive(Copy, Clone)]
pub enum I64Be {}

macro_rules! fixed_size {
    ($ty:ty, $size:expr) => {
        impl FixedSize for $ty {
            const SIZE: usize = $size;
        }
    };
}

fixed_size!(U8, size::U8);
fixed_size!(U16Be, size::U16);
fixed_size!(I16Be, size::I16);
fixed_size!(U24Be, size::U24);
fixed_size!(U32Be, size::U32);
fixed_size!(I32Be, size::I32);
fixed_size!(I64Be, size::I64);
