#![allow(missing_docs)]

//! Read binary data
//!
//! Only what the type codec needs to decode individual primitive values lives here. Whole fonts
//! are parsed elsewhere and handed over as already-decoded layout trees.

use byteorder::{BigEndian, ByteOrder};

use crate::binary::{I16Be, I32Be, I64Be, U16Be, U24Be, U32Be, U8};
use crate::error::ParseError;

#[derive(Debug, Copy, Clone)]
pub struct ReadEof {}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReadScope<'a> {
    data: &'a [u8],
}

#[derive(Clone)]
pub struct ReadCtxt<'a> {
    scope: ReadScope<'a>,
    offset: usize,
}

pub trait ReadBinary {
    type HostType<'a>: Sized; // default = Self

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError>;
}

pub trait ReadBinaryDep {
    type Args<'a>: Copy;
    type HostType<'a>: Sized; // default = Self

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        args: Self::Args<'a>,
    ) -> Result<Self::HostType<'a>, ParseError>;
}

impl<T> ReadBinaryDep for T
where
    T: ReadBinary,
{
    type Args<'a> = ();
    type HostType<'a> = T::HostType<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (): Self::Args<'_>,
    ) -> Result<Self::HostType<'a>, ParseError> {
        T::read(ctxt)
    }
}

impl<'a> ReadScope<'a> {
    pub fn new(data: &'a [u8]) -> ReadScope<'a> {
        ReadScope { data }
    }

    pub fn ctxt(&self) -> ReadCtxt<'a> {
        ReadCtxt::new(*self)
    }

    pub fn read_dep<T: ReadBinaryDep>(
        &self,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, ParseError> {
        self.ctxt().read_dep::<T>(args)
    }
}

impl<'a> ReadCtxt<'a> {
    /// ReadCtxt is constructed by calling `ReadScope::ctxt`.
    fn new(scope: ReadScope<'a>) -> ReadCtxt<'a> {
        ReadCtxt { scope, offset: 0 }
    }

    pub fn check(&self, cond: bool) -> Result<(), ParseError> {
        match cond {
            true => Ok(()),
            false => Err(ParseError::BadValue),
        }
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(&mut self) -> Result<T::HostType<'a>, ParseError> {
        T::read_dep(self, ())
    }

    pub fn read_dep<T: ReadBinaryDep>(
        &mut self,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, ParseError> {
        T::read_dep(self, args)
    }

    pub fn bytes_available(&self) -> bool {
        self.offset < self.scope.data.len()
    }

    fn take(&mut self, length: usize) -> Result<&'a [u8], ReadEof> {
        match self.offset.checked_add(length) {
            Some(endpos) if endpos <= self.scope.data.len() => {
                let bytes = &self.scope.data[self.offset..endpos];
                self.offset = endpos;
                Ok(bytes)
            }
            _ => Err(ReadEof {}),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadEof> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16be(&mut self) -> Result<u16, ReadEof> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16be(&mut self) -> Result<i16, ReadEof> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_u24be(&mut self) -> Result<u32, ReadEof> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    pub fn read_u32be(&mut self) -> Result<u32, ReadEof> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32be(&mut self) -> Result<i32, ReadEof> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_i64be(&mut self) -> Result<i64, ReadEof> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    /// Read everything left in the scope.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let rest = &self.scope.data[self.offset..];
        self.offset = self.scope.data.len();
        rest
    }
}

macro_rules! read_binary_impl {
    ($marker:ty, $host:ty, $read:ident) => {
        impl ReadBinary for $marker {
            type HostType<'a> = $host;

            fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<$host, ParseError> {
                Ok(ctxt.$read()?)
            }
        }
    };
}

read_binary_impl!(U8, u8, read_u8);
read_binary_impl!(U16Be, u16, read_u16be);
read_binary_impl!(I16Be, i16, read_i16be);
read_binary_impl!(U24Be, u32, read_u24be);
read_binary_impl!(U32Be, u32, read_u32be);
read_binary_impl!(I32Be, i32, read_i32be);
read_binary_impl!(I64Be, i64, read_i64be);
