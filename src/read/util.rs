use core::convert::TryFrom;
use core::fmt;
use core::ops::Range;

use crate::pod::{self, Pod};
use crate::read::{ErrorKind, ReadError, Result};

/// A borrowed region of the input file that remembers where it came from.
///
/// Sub-slicing never copies; every region produced from a `FileSlice` refers
/// to the same underlying buffer and reports absolute offsets into it.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct FileSlice<'data> {
    data: &'data [u8],
    offset: u64,
}

impl<'data> fmt::Debug for FileSlice<'data> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSlice")
            .field("offset", &format_args!("0x{:x}", self.offset))
            .field("len", &format_args!("0x{:x}", self.data.len()))
            .finish()
    }
}

impl<'data> FileSlice<'data> {
    /// Wrap a whole file buffer. Offsets are relative to its first byte.
    #[inline]
    pub fn new(data: &'data [u8]) -> Self {
        FileSlice { data, offset: 0 }
    }

    /// Wrap a region that starts at `offset` in the original file.
    #[inline]
    pub fn with_offset(data: &'data [u8], offset: u64) -> Self {
        FileSlice { data, offset }
    }

    /// The bytes of the region.
    #[inline]
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    /// The absolute offset of the first byte of the region.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The absolute byte range covered by the region.
    #[inline]
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset.saturating_add(self.data.len() as u64)
    }

    /// Convert a range relative to this region into an absolute range.
    #[inline]
    pub fn absolute_range(&self, relative_offset: usize, len: usize) -> Range<u64> {
        let start = self.offset.saturating_add(relative_offset as u64);
        start..start.saturating_add(len as u64)
    }

    /// Return the sub-region `[offset, offset + size)`, relative to this region.
    ///
    /// Fails if the sub-region is not inside this region, or if its absolute
    /// end offset does not fit in a `u64`.
    pub fn sub_slice(&self, offset: u64, size: u64, message: &'static str) -> Result<Self> {
        let absolute = self
            .offset
            .checked_add(offset)
            .read_error(ErrorKind::Truncated, self.offset, message)?;
        let start = usize::try_from(offset)
            .ok()
            .read_error(ErrorKind::Truncated, absolute, message)?;
        let size = usize::try_from(size)
            .ok()
            .read_error(ErrorKind::Truncated, absolute, message)?;
        let data = self
            .data
            .get(start..)
            .and_then(|tail| tail.get(..size))
            .read_error(ErrorKind::Truncated, absolute, message)?;
        absolute
            .checked_add(data.len() as u64)
            .read_error(ErrorKind::Truncated, absolute, message)?;
        Ok(FileSlice {
            data,
            offset: absolute,
        })
    }

    /// Cast the bytes at a relative offset to a `Pod` type.
    pub fn read_at<T: Pod>(&self, offset: usize, message: &'static str) -> Result<&'data T> {
        let mut cursor = Cursor::new(*self);
        cursor.skip(offset, message)?;
        cursor.read(message)
    }
}

/// A forward-only reader over a [`FileSlice`].
///
/// Every read is bounds checked. A read that would pass the end of the data
/// fails with the absolute offset at which it was attempted, and leaves the
/// position unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'data> {
    slice: FileSlice<'data>,
    position: usize,
}

impl<'data> Cursor<'data> {
    #[inline]
    pub fn new(slice: FileSlice<'data>) -> Self {
        Cursor { slice, position: 0 }
    }

    /// The number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The absolute file offset of the next unread byte.
    #[inline]
    pub fn absolute_position(&self) -> u64 {
        self.slice.offset.saturating_add(self.position as u64)
    }

    /// The number of bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.slice.len().saturating_sub(self.position)
    }

    /// Return true while any bytes remain.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.remaining() != 0
    }

    /// Return the next byte without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.slice.data.get(self.position).copied()
    }

    /// Return the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize, message: &'static str) -> Result<&'data [u8]> {
        let bytes = self
            .position
            .checked_add(count)
            .and_then(|end| self.slice.data.get(self.position..end))
            .read_error(ErrorKind::Truncated, self.absolute_position(), message)?;
        self.position += count;
        Ok(bytes)
    }

    /// Return the next `count` bytes as a region of the file and advance past them.
    pub fn read_slice(&mut self, count: usize, message: &'static str) -> Result<FileSlice<'data>> {
        let offset = self.absolute_position();
        let data = self.read_bytes(count, message)?;
        Ok(FileSlice { data, offset })
    }

    /// Cast the next bytes to a `Pod` type and advance past them.
    pub fn read<T: Pod>(&mut self, message: &'static str) -> Result<&'data T> {
        let offset = self.absolute_position();
        let bytes = self.read_bytes(core::mem::size_of::<T>(), message)?;
        let (value, _) =
            pod::from_bytes(bytes).read_error(ErrorKind::Misaligned, offset, message)?;
        Ok(value)
    }

    /// Advance past the next `count` bytes.
    pub fn skip(&mut self, count: usize, message: &'static str) -> Result<()> {
        self.read_bytes(count, message).map(|_| ())
    }
}

/// A table of zero-terminated strings.
///
/// This is used for the Mach-O symbol string table.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringTable<'data> {
    data: &'data [u8],
}

impl<'data> StringTable<'data> {
    /// Interpret the given data as a string table.
    pub fn new(data: &'data [u8]) -> Self {
        StringTable { data }
    }

    /// Return the string at the given offset.
    pub fn get(&self, offset: u32) -> core::result::Result<&'data [u8], ()> {
        let offset = usize::try_from(offset).map_err(|_| ())?;
        read_string_at(self.data, offset).ok_or(())
    }
}

/// Read a null terminated string starting at `offset`.
///
/// Does not assume any encoding. Does not return the null byte.
pub(crate) fn read_string_at(data: &[u8], offset: usize) -> Option<&[u8]> {
    let tail = data.get(offset..)?;
    let null = memchr::memchr(b'\0', tail)?;
    tail.get(..null)
}
