//! Encoding and decoding of the primitive OpenType data types.
//!
//! Every value that can appear as a field of a [`Table`](crate::table::Table) is a [`Scalar`].
//! The variant of a scalar selects its wire type, and so its codec. All multi-byte values are
//! big-endian.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#data-types>

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use crate::binary::read::{ReadBinaryDep, ReadCtxt, ReadScope};
use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext};
use crate::binary::{I16Be, I32Be, I64Be, U16Be, U24Be, U32Be, U8};
use crate::error::{ParseError, WriteError};
use crate::{size, tag};

/// Seconds between 1904-01-01 and 1970-01-01.
const SECONDS_FROM_1904_TO_1970: i64 = 2_082_844_800;

/// The wire type of a field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Char,
    UShort,
    Short,
    UInt24,
    ULong,
    Long,
    Fixed,
    FWord,
    UFWord,
    LongDateTime,
    Tag,
    CharArray,
    Table,
}

/// 16.16 fixed-point number.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fixed(pub i32);

/// Date as seconds since 12:00 midnight, January 1, 1904, UTC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LongDateTime(pub i64);

/// A primitive field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scalar {
    Byte(u8),
    /// A single character, U+0000 to U+00FF.
    Char(char),
    UShort(u16),
    Short(i16),
    /// 24-bit unsigned integer, at most `0xFFFFFF`.
    UInt24(u32),
    ULong(u32),
    Long(i32),
    Fixed(Fixed),
    FWord(i16),
    UFWord(u16),
    LongDateTime(LongDateTime),
    Tag(u32),
    /// Raw bytes, written as-is.
    CharArray(Vec<u8>),
}

impl FieldType {
    /// The name of this type as used in table layout descriptions, e.g. `USHORT`.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Char => "CHAR",
            FieldType::UShort => "USHORT",
            FieldType::Short => "SHORT",
            FieldType::UInt24 => "UINT24",
            FieldType::ULong => "ULONG",
            FieldType::Long => "LONG",
            FieldType::Fixed => "FIXED",
            FieldType::FWord => "FWORD",
            FieldType::UFWord => "UFWORD",
            FieldType::LongDateTime => "LONGDATETIME",
            FieldType::Tag => "TAG",
            FieldType::CharArray => "CHARARRAY",
            FieldType::Table => "TABLE",
        }
    }

    /// The encoded size of values of this type, `None` for variable sized types.
    ///
    /// For `Table` this is the size of the offset that points at the table.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            FieldType::Byte | FieldType::Char => Some(size::U8),
            FieldType::UShort | FieldType::Short | FieldType::FWord | FieldType::UFWord => {
                Some(size::U16)
            }
            FieldType::UInt24 => Some(size::U24),
            FieldType::ULong | FieldType::Long => Some(size::U32),
            FieldType::Fixed => Some(size::FIXED),
            FieldType::LongDateTime => Some(size::LONG_DATE_TIME),
            FieldType::Tag => Some(size::TAG),
            FieldType::Table => Some(size::OFFSET16),
            FieldType::CharArray => None,
        }
    }
}

impl FromStr for FieldType {
    type Err = WriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field_type = match s {
            "BYTE" => FieldType::Byte,
            "CHAR" => FieldType::Char,
            "USHORT" => FieldType::UShort,
            "SHORT" => FieldType::Short,
            "UINT24" => FieldType::UInt24,
            "ULONG" => FieldType::ULong,
            "LONG" => FieldType::Long,
            "FIXED" => FieldType::Fixed,
            "FWORD" => FieldType::FWord,
            "UFWORD" => FieldType::UFWord,
            "LONGDATETIME" => FieldType::LongDateTime,
            "TAG" => FieldType::Tag,
            "CHARARRAY" => FieldType::CharArray,
            "TABLE" => FieldType::Table,
            _ => return Err(WriteError::UnsupportedType(s.to_string())),
        };
        Ok(field_type)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Fixed {
    pub const ONE: Fixed = Fixed(0x0001_0000);

    /// Convert a float to 16.16, rounding to the nearest representable value.
    ///
    /// Fails for values outside `-32768.0..32768.0` and for NaN or infinities.
    pub fn from_f64(value: f64) -> Result<Fixed, WriteError> {
        let scaled = (value * 65536.0).round();
        if scaled.is_finite() && scaled >= f64::from(i32::MIN) && scaled <= f64::from(i32::MAX) {
            Ok(Fixed(scaled as i32))
        } else {
            Err(WriteError::BadValue)
        }
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 65536.0
    }
}

impl LongDateTime {
    pub fn from_unix_seconds(seconds: i64) -> Result<LongDateTime, WriteError> {
        seconds
            .checked_add(SECONDS_FROM_1904_TO_1970)
            .map(LongDateTime)
            .ok_or(WriteError::BadValue)
    }

    pub fn to_unix_seconds(self) -> Option<i64> {
        self.0.checked_sub(SECONDS_FROM_1904_TO_1970)
    }
}

impl Scalar {
    pub fn field_type(&self) -> FieldType {
        match self {
            Scalar::Byte(_) => FieldType::Byte,
            Scalar::Char(_) => FieldType::Char,
            Scalar::UShort(_) => FieldType::UShort,
            Scalar::Short(_) => FieldType::Short,
            Scalar::UInt24(_) => FieldType::UInt24,
            Scalar::ULong(_) => FieldType::ULong,
            Scalar::Long(_) => FieldType::Long,
            Scalar::Fixed(_) => FieldType::Fixed,
            Scalar::FWord(_) => FieldType::FWord,
            Scalar::UFWord(_) => FieldType::UFWord,
            Scalar::LongDateTime(_) => FieldType::LongDateTime,
            Scalar::Tag(_) => FieldType::Tag,
            Scalar::CharArray(_) => FieldType::CharArray,
        }
    }

    /// Build a numeric scalar of type `field_type` from `value`.
    ///
    /// The value must fit the type; it is never truncated. `Fixed` values are whole numbers
    /// and `Tag` values are the big-endian `u32` form of the tag.
    pub fn from_int(field_type: FieldType, value: i64) -> Result<Scalar, WriteError> {
        let scalar = match field_type {
            FieldType::Byte => Scalar::Byte(u8::try_from(value)?),
            FieldType::Char => Scalar::Char(char::from(u8::try_from(value)?)),
            FieldType::UShort => Scalar::UShort(u16::try_from(value)?),
            FieldType::Short => Scalar::Short(i16::try_from(value)?),
            FieldType::UInt24 => {
                let value = u32::try_from(value)?;
                if value > 0xFF_FFFF {
                    return Err(WriteError::BadValue);
                }
                Scalar::UInt24(value)
            }
            FieldType::ULong => Scalar::ULong(u32::try_from(value)?),
            FieldType::Long => Scalar::Long(i32::try_from(value)?),
            FieldType::Fixed => {
                let whole = i16::try_from(value)?;
                Scalar::Fixed(Fixed(i32::from(whole) << 16))
            }
            FieldType::FWord => Scalar::FWord(i16::try_from(value)?),
            FieldType::UFWord => Scalar::UFWord(u16::try_from(value)?),
            FieldType::LongDateTime => Scalar::LongDateTime(LongDateTime(value)),
            FieldType::Tag => {
                let tag = u32::try_from(value)?;
                if !tag::is_valid(tag) {
                    return Err(WriteError::BadValue);
                }
                Scalar::Tag(tag)
            }
            FieldType::CharArray | FieldType::Table => return Err(WriteError::BadValue),
        };
        Ok(scalar)
    }

    /// The number of bytes `encode` produces for this value.
    pub fn size(&self) -> usize {
        match self {
            Scalar::CharArray(bytes) => bytes.len(),
            other => other.field_type().fixed_size().unwrap_or(0),
        }
    }
}

impl WriteBinary<&Self> for Scalar {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, scalar: &Scalar) -> Result<(), WriteError> {
        match *scalar {
            Scalar::Byte(value) => U8::write(ctxt, value),
            Scalar::Char(c) => {
                let byte = u8::try_from(u32::from(c))?;
                U8::write(ctxt, byte)
            }
            Scalar::UShort(value) | Scalar::UFWord(value) => U16Be::write(ctxt, value),
            Scalar::Short(value) | Scalar::FWord(value) => I16Be::write(ctxt, value),
            Scalar::UInt24(value) => U24Be::write(ctxt, value),
            Scalar::ULong(value) => U32Be::write(ctxt, value),
            Scalar::Long(value) => I32Be::write(ctxt, value),
            Scalar::Fixed(Fixed(value)) => I32Be::write(ctxt, value),
            Scalar::LongDateTime(LongDateTime(value)) => I64Be::write(ctxt, value),
            Scalar::Tag(value) => {
                if !tag::is_valid(value) {
                    return Err(WriteError::BadValue);
                }
                U32Be::write(ctxt, value)
            }
            Scalar::CharArray(ref bytes) => ctxt.write_bytes(bytes),
        }
    }
}

impl ReadBinaryDep for Scalar {
    type Args<'a> = FieldType;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, field_type: FieldType) -> Result<Self, ParseError> {
        let scalar = match field_type {
            FieldType::Byte => Scalar::Byte(ctxt.read::<U8>()?),
            FieldType::Char => Scalar::Char(char::from(ctxt.read::<U8>()?)),
            FieldType::UShort => Scalar::UShort(ctxt.read::<U16Be>()?),
            FieldType::Short => Scalar::Short(ctxt.read::<I16Be>()?),
            FieldType::UInt24 => Scalar::UInt24(ctxt.read::<U24Be>()?),
            FieldType::ULong => Scalar::ULong(ctxt.read::<U32Be>()?),
            FieldType::Long => Scalar::Long(ctxt.read::<I32Be>()?),
            FieldType::Fixed => Scalar::Fixed(Fixed(ctxt.read::<I32Be>()?)),
            FieldType::FWord => Scalar::FWord(ctxt.read::<I16Be>()?),
            FieldType::UFWord => Scalar::UFWord(ctxt.read::<U16Be>()?),
            FieldType::LongDateTime => Scalar::LongDateTime(LongDateTime(ctxt.read::<I64Be>()?)),
            FieldType::Tag => {
                let tag = ctxt.read::<U32Be>()?;
                ctxt.check(tag::is_valid(tag))?;
                Scalar::Tag(tag)
            }
            FieldType::CharArray => Scalar::CharArray(ctxt.read_remaining().to_vec()),
            // Tables are only ever written
            FieldType::Table => return Err(ParseError::NotImplemented),
        };
        Ok(scalar)
    }
}

/// Encode `scalar` into a new byte vector.
pub fn encode(scalar: &Scalar) -> Result<Vec<u8>, WriteError> {
    let mut buffer = WriteBuffer::new();
    Scalar::write(&mut buffer, scalar)?;
    Ok(buffer.into_inner())
}

/// Decode a value of type `field_type` from the start of `data`.
///
/// `CharArray` consumes all of `data`.
pub fn decode(field_type: FieldType, data: &[u8]) -> Result<Scalar, ParseError> {
    ReadScope::new(data).read_dep::<Scalar>(field_type)
}

/// The number of bytes `encode` produces for `scalar`.
pub fn size_of(scalar: &Scalar) -> usize {
    scalar.size()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_values() -> Vec<Scalar> {
        vec![
            Scalar::Byte(0),
            Scalar::Byte(u8::MAX),
            Scalar::Char('\0'),
            Scalar::Char('\u{FF}'),
            Scalar::UShort(0),
            Scalar::UShort(u16::MAX),
            Scalar::Short(i16::MIN),
            Scalar::Short(i16::MAX),
            Scalar::UInt24(0),
            Scalar::UInt24(0xFF_FFFF),
            Scalar::ULong(u32::MAX),
            Scalar::Long(i32::MIN),
            Scalar::Long(i32::MAX),
            Scalar::Fixed(Fixed(i32::MIN)),
            Scalar::Fixed(Fixed::ONE),
            Scalar::FWord(-1),
            Scalar::UFWord(u16::MAX),
            Scalar::LongDateTime(LongDateTime(i64::MIN)),
            Scalar::LongDateTime(LongDateTime(i64::MAX)),
            Scalar::Tag(tag::DFLT),
            Scalar::Tag(tag::from_string("cvt").unwrap()),
            Scalar::CharArray(Vec::new()),
            Scalar::CharArray(b"OTTO\x00\xFF".to_vec()),
        ]
    }

    #[test]
    fn test_round_trip_boundaries() {
        for value in boundary_values() {
            let data = encode(&value).unwrap();
            assert_eq!(decode(value.field_type(), &data).unwrap(), value);
        }
    }

    #[test]
    fn test_size_matches_encoding() {
        for value in boundary_values() {
            assert_eq!(size_of(&value), encode(&value).unwrap().len(), "{:?}", value);
        }
    }

    #[test]
    fn test_big_endian_layout() {
        assert_eq!(encode(&Scalar::UShort(0x0102)).unwrap(), [1, 2]);
        assert_eq!(encode(&Scalar::Short(-2)).unwrap(), [0xFF, 0xFE]);
        assert_eq!(encode(&Scalar::UInt24(0x010203)).unwrap(), [1, 2, 3]);
        assert_eq!(encode(&Scalar::Fixed(Fixed::ONE)).unwrap(), [0, 1, 0, 0]);
        assert_eq!(encode(&Scalar::Tag(tag::GSUB)).unwrap(), b"GSUB");
        assert_eq!(
            encode(&Scalar::LongDateTime(LongDateTime(1))).unwrap(),
            [0, 0, 0, 0, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_out_of_range_values_fail() {
        assert_eq!(
            encode(&Scalar::UInt24(0x0100_0000)),
            Err(WriteError::BadValue)
        );
        assert_eq!(encode(&Scalar::Char('\u{100}')), Err(WriteError::BadValue));
        assert_eq!(encode(&Scalar::Tag(0x0001_0000)), Err(WriteError::BadValue));
    }

    #[test]
    fn test_from_int_range_checks() {
        assert_eq!(
            Scalar::from_int(FieldType::UShort, 65535),
            Ok(Scalar::UShort(65535))
        );
        assert_eq!(
            Scalar::from_int(FieldType::UShort, 65536),
            Err(WriteError::BadValue)
        );
        assert_eq!(
            Scalar::from_int(FieldType::UShort, -1),
            Err(WriteError::BadValue)
        );
        assert_eq!(
            Scalar::from_int(FieldType::Short, -32768),
            Ok(Scalar::Short(-32768))
        );
        assert_eq!(
            Scalar::from_int(FieldType::Byte, 256),
            Err(WriteError::BadValue)
        );
        assert_eq!(
            Scalar::from_int(FieldType::UInt24, 0x0100_0000),
            Err(WriteError::BadValue)
        );
        assert_eq!(
            Scalar::from_int(FieldType::Fixed, 2),
            Ok(Scalar::Fixed(Fixed(0x0002_0000)))
        );
        assert_eq!(
            Scalar::from_int(FieldType::Fixed, 40_000),
            Err(WriteError::BadValue)
        );
        assert_eq!(
            Scalar::from_int(FieldType::Tag, i64::from(tag::LIGA)),
            Ok(Scalar::Tag(tag::LIGA))
        );
        assert_eq!(
            Scalar::from_int(FieldType::Table, 0),
            Err(WriteError::BadValue)
        );
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!("USHORT".parse::<FieldType>(), Ok(FieldType::UShort));
        assert_eq!("TABLE".parse::<FieldType>(), Ok(FieldType::Table));
        assert_eq!(
            "VARIANT".parse::<FieldType>(),
            Err(WriteError::UnsupportedType(String::from("VARIANT")))
        );
        assert_eq!(FieldType::LongDateTime.to_string(), "LONGDATETIME");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(FieldType::ULong, &[0, 1]), Err(ParseError::BadEof));
        assert_eq!(decode(FieldType::Tag, &[0, 1, 0, 0]), Err(ParseError::BadValue));
        assert_eq!(
            decode(FieldType::Table, &[0, 4]),
            Err(ParseError::NotImplemented)
        );
    }

    #[test]
    fn test_fixed_conversion() {
        assert_eq!(Fixed::from_f64(1.0), Ok(Fixed::ONE));
        assert_eq!(Fixed::from_f64(-0.5), Ok(Fixed(-0x8000)));
        assert_eq!(Fixed::from_f64(32768.0), Err(WriteError::BadValue));
        assert_eq!(Fixed::from_f64(f64::NAN), Err(WriteError::BadValue));
        assert_eq!(Fixed(0x0001_8000).to_f64(), 1.5);
    }

    #[test]
    fn test_long_date_time_epoch() {
        assert_eq!(
            LongDateTime::from_unix_seconds(0),
            Ok(LongDateTime(2_082_844_800))
        );
        assert_eq!(LongDateTime(0).to_unix_seconds(), Some(-2_082_844_800));
        assert_eq!(
            LongDateTime::from_unix_seconds(i64::MAX),
            Err(WriteError::BadValue)
        );
    }
}
