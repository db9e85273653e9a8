#![allow(missing_docs)]

//! Parse binary data
//!
//! All font parsing in this crate goes through a `ReadScope`, a window onto a byte slice, and a
//! `ReadCtxt`, a cursor that walks forward through one scope. A scope never hands out bytes
//! outside its window: a table decoder given the scope of its table cannot read past the end of
//! that table, and every read that would do so fails with `ReadEof`.

use std::fmt;
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder};

use crate::binary::{I16Be, I32Be, I64Be, U16Be, U32Be, I8, U8};
use crate::error::ParseError;

#[derive(Debug, Copy, Clone)]
pub struct ReadEof {}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReadScope<'a> {
    base: usize,
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

/// A value with a fixed size encoding.
///
/// Reading succeeds whenever `SIZE` bytes are available, which lets arrays of these values be
/// indexed without re-validating each item.
pub trait ReadFixed {
    type HostType: Sized; // default = Self

    /// The number of bytes consumed by `from_bytes`.
    const SIZE: usize;

    /// Decode a value from `bytes`, which is exactly `SIZE` bytes long.
    fn from_bytes(bytes: &[u8]) -> Self::HostType;
}

pub trait ReadFrom {
    type ReadType: ReadFixed;
    fn read_from(value: <Self::ReadType as ReadFixed>::HostType) -> Self;
}

impl<T> ReadFixed for T
where
    T: ReadFrom,
{
    type HostType = T;

    const SIZE: usize = T::ReadType::SIZE;

    fn from_bytes(bytes: &[u8]) -> Self::HostType {
        T::read_from(T::ReadType::from_bytes(bytes))
    }
}

impl<T> ReadBinary for T
where
    T: ReadFixed,
{
    type HostType<'a> = T::HostType;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let bytes = ctxt.read_slice(T::SIZE)?;
        Ok(T::from_bytes(bytes))
    }
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

/// A lazily decoded array of fixed size values.
pub struct ReadArray<'a, T: ReadFixed> {
    scope: ReadScope<'a>,
    length: usize,
    phantom: PhantomData<T>,
}

impl<'a, T: ReadFixed> Clone for ReadArray<'a, T> {
    fn clone(&self) -> Self {
        ReadArray {
            scope: self.scope,
            length: self.length,
            phantom: PhantomData,
        }
    }
}

pub struct ReadArrayIter<'a, T: ReadFixed> {
    array: ReadArray<'a, T>,
    index: usize,
}

impl<'a> ReadScope<'a> {
    pub fn new(data: &'a [u8]) -> ReadScope<'a> {
        let base = 0;
        ReadScope { base, data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Absolute offset of this scope from the start of the buffer it was created from.
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn offset(&self, offset: usize) -> ReadScope<'a> {
        let base = self.base + offset;
        let data = self.data.get(offset..).unwrap_or(&[]);
        ReadScope { base, data }
    }

    pub fn offset_length(&self, offset: usize, length: usize) -> Result<ReadScope<'a>, ParseError> {
        if offset < self.data.len() || length == 0 {
            let data = self.data.get(offset..).unwrap_or(&[]);
            match data.get(..length) {
                Some(data) => Ok(ReadScope {
                    base: self.base + offset,
                    data,
                }),
                None => Err(ParseError::BadEof),
            }
        } else {
            Err(ParseError::BadOffset)
        }
    }

    pub fn ctxt(&self) -> ReadCtxt<'a> {
        ReadCtxt::new(*self)
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(&self) -> Result<T::HostType<'a>, ParseError> {
        self.ctxt().read::<T>()
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

    /// Check a condition, returning `ParseError::BadIndex` if `false`.
    pub fn check_index(&self, cond: bool) -> Result<(), ParseError> {
        match cond {
            true => Ok(()),
            false => Err(ParseError::BadIndex),
        }
    }

    /// Check a condition, returning `ParseError::BadVersion` if `false`.
    ///
    /// Intended for use in checking versions read from data. Example:
    ///
    /// ```
    /// use fontscan::binary::read::ReadScope;
    /// use fontscan::error::ParseError;
    ///
    /// let scope = ReadScope::new(&[0, 2]);
    /// let mut ctxt = scope.ctxt();
    /// let major_version = ctxt.read_u16be().expect("unable to read version");
    ///
    /// assert!(ctxt.check_version(major_version == 2).is_ok());
    /// assert_eq!(ctxt.check_version(major_version == 1), Err(ParseError::BadVersion));
    /// ```
    pub fn check_version(&self, cond: bool) -> Result<(), ParseError> {
        match cond {
            true => Ok(()),
            false => Err(ParseError::BadVersion),
        }
    }

    /// The scope starting at the current position.
    pub fn scope(&self) -> ReadScope<'a> {
        self.scope.offset(self.offset)
    }

    /// Current position relative to the start of the scope this cursor was created from.
    pub fn position(&self) -> usize {
        self.offset
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

    fn read_fixed<T: ReadFixed>(&mut self) -> Result<T::HostType, ReadEof> {
        let bytes = self.read_slice(T::SIZE)?;
        Ok(T::from_bytes(bytes))
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadEof> {
        self.read_fixed::<U8>()
    }

    pub fn read_i8(&mut self) -> Result<i8, ReadEof> {
        self.read_fixed::<I8>()
    }

    pub fn read_u16be(&mut self) -> Result<u16, ReadEof> {
        self.read_fixed::<U16Be>()
    }

    pub fn read_i16be(&mut self) -> Result<i16, ReadEof> {
        self.read_fixed::<I16Be>()
    }

    pub fn read_u32be(&mut self) -> Result<u32, ReadEof> {
        self.read_fixed::<U32Be>()
    }

    pub fn read_i32be(&mut self) -> Result<i32, ReadEof> {
        self.read_fixed::<I32Be>()
    }

    pub fn read_i64be(&mut self) -> Result<i64, ReadEof> {
        self.read_fixed::<I64Be>()
    }

    pub fn read_array<T: ReadFixed>(
        &mut self,
        length: usize,
    ) -> Result<ReadArray<'a, T>, ParseError> {
        let byte_length = length.checked_mul(T::SIZE).ok_or(ParseError::BadEof)?;
        let scope = self.read_scope(byte_length)?;
        Ok(ReadArray {
            scope,
            length,
            phantom: PhantomData,
        })
    }

    pub fn read_scope(&mut self, length: usize) -> Result<ReadScope<'a>, ReadEof> {
        if let Ok(scope) = self.scope.offset_length(self.offset, length) {
            self.offset += length;
            Ok(scope)
        } else {
            Err(ReadEof {})
        }
    }

    pub fn read_slice(&mut self, length: usize) -> Result<&'a [u8], ReadEof> {
        let scope = self.read_scope(length)?;
        Ok(scope.data)
    }
}

impl<'a, T: ReadFixed> ReadArray<'a, T> {
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get_item(&self, index: usize) -> Option<T::HostType> {
        if index < self.length {
            let start = index * T::SIZE;
            self.scope
                .data
                .get(start..start + T::SIZE)
                .map(T::from_bytes)
        } else {
            None
        }
    }

    pub fn read_item(&self, index: usize) -> Result<T::HostType, ParseError> {
        self.get_item(index).ok_or(ParseError::BadIndex)
    }

    pub fn last(&self) -> Option<T::HostType> {
        let index = self.length.checked_sub(1)?;
        self.get_item(index)
    }

    pub fn to_vec(&self) -> Vec<T::HostType> {
        self.iter().collect()
    }

    pub fn iter(&self) -> ReadArrayIter<'a, T> {
        ReadArrayIter {
            array: self.clone(),
            index: 0,
        }
    }
}

impl<'a, 'b, T: ReadFixed> IntoIterator for &'b ReadArray<'a, T> {
    type Item = T::HostType;
    type IntoIter = ReadArrayIter<'a, T>;
    fn into_iter(self) -> ReadArrayIter<'a, T> {
        self.iter()
    }
}

impl<'a, T: ReadFixed> Iterator for ReadArrayIter<'a, T> {
    type Item = T::HostType;

    fn next(&mut self) -> Option<T::HostType> {
        let item = self.array.get_item(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, T: ReadFixed> ExactSizeIterator for ReadArrayIter<'a, T> {}

impl ReadFixed for U8 {
    type HostType = u8;

    const SIZE: usize = 1;

    fn from_bytes(bytes: &[u8]) -> u8 {
        bytes[0]
    }
}

impl ReadFixed for I8 {
    type HostType = i8;

    const SIZE: usize = 1;

    fn from_bytes(bytes: &[u8]) -> i8 {
        bytes[0] as i8
    }
}

impl ReadFixed for U16Be {
    type HostType = u16;

    const SIZE: usize = 2;

    fn from_bytes(bytes: &[u8]) -> u16 {
        BigEndian::read_u16(bytes)
    }
}

impl ReadFixed for I16Be {
    type HostType = i16;

    const SIZE: usize = 2;

    fn from_bytes(bytes: &[u8]) -> i16 {
        BigEndian::read_i16(bytes)
    }
}

impl ReadFixed for U32Be {
    type HostType = u32;

    const SIZE: usize = 4;

    fn from_bytes(bytes: &[u8]) -> u32 {
        BigEndian::read_u32(bytes)
    }
}

impl ReadFixed for I32Be {
    type HostType = i32;

    const SIZE: usize = 4;

    fn from_bytes(bytes: &[u8]) -> i32 {
        BigEndian::read_i32(bytes)
    }
}

impl ReadFixed for I64Be {
    type HostType = i64;

    const SIZE: usize = 8;

    fn from_bytes(bytes: &[u8]) -> i64 {
        BigEndian::read_i64(bytes)
    }
}

impl<T1, T2> ReadFixed for (T1, T2)
where
    T1: ReadFixed,
    T2: ReadFixed,
{
    type HostType = (T1::HostType, T2::HostType);

    const SIZE: usize = T1::SIZE + T2::SIZE;

    fn from_bytes(bytes: &[u8]) -> Self::HostType {
        let (b1, b2) = bytes.split_at(T1::SIZE);
        (T1::from_bytes(b1), T2::from_bytes(b2))
    }
}

impl<T1, T2, T3> ReadFixed for (T1, T2, T3)
where
    T1: ReadFixed,
    T2: ReadFixed,
    T3: ReadFixed,
{
    type HostType = (T1::HostType, T2::HostType, T3::HostType);

    const SIZE: usize = T1::SIZE + T2::SIZE + T3::SIZE;

    fn from_bytes(bytes: &[u8]) -> Self::HostType {
        let (b1, rest) = bytes.split_at(T1::SIZE);
        let (b2, b3) = rest.split_at(T2::SIZE);
        (T1::from_bytes(b1), T2::from_bytes(b2), T3::from_bytes(b3))
    }
}

impl<'a, T> fmt::Debug for ReadArray<'a, T>
where
    T: ReadFixed,
    T::HostType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_list().entries(self.iter()).finish()
    }
}
