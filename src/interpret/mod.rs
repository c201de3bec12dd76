//! Section interpreters.
//!
//! An interpreter decodes the bytes of one Mach-O section into typed values,
//! its payload, and presents them as a [`Translation`]. Interpreters borrow a
//! [`SearchSource`] to resolve addresses and symbol indices into names.
//!
//! Use [`SectionInterpreter::new`] to select an interpreter from a section type.

use crate::endian::{Endian, Endianness};
use crate::read::{Error, ErrorKind, FileSlice, Result};
use crate::translate::Translation;

mod any;
pub use any::*;

mod literal;
pub use literal::*;

pub mod search;
pub use search::{IndirectSymbol, SearchSource, SymbolEntry, SymbolTables};

mod symbol_pointer;
pub use symbol_pointer::*;

/// A section interpreter.
///
/// Building the payload may be deferred until it is first needed, and
/// item enumeration never mutates anything observable.
pub trait Interpreter<'data>: Translation {
    /// The decoded values of the section.
    type Payload: ?Sized;

    /// The section bytes.
    fn data(&self) -> FileSlice<'data>;

    /// The decoded values of the section.
    fn payload(&self) -> &Self::Payload;
}

/// The size in bytes of a pointer.
#[inline]
pub fn pointer_width(is_64: bool) -> usize {
    if is_64 {
        8
    } else {
        4
    }
}

/// The number of pointers in a section that is a dense pointer array.
fn pointer_count(data: FileSlice<'_>, is_64: bool, message: &'static str) -> Result<usize> {
    let width = pointer_width(is_64);
    if data.len() % width != 0 {
        return Err(Error::new(ErrorKind::Misaligned, data.offset(), message));
    }
    Ok(data.len() / width)
}

/// Read the pointer in slot `index`, zero-extended to 64 bits.
fn read_pointer(data: FileSlice<'_>, index: usize, is_64: bool, endian: Endianness) -> Option<u64> {
    let width = pointer_width(is_64);
    let start = index.checked_mul(width)?;
    let bytes = data.data().get(start..)?.get(..width)?;
    if is_64 {
        Some(endian.read_u64_bytes(bytes.try_into().ok()?))
    } else {
        Some(endian.read_u32_bytes(bytes.try_into().ok()?).into())
    }
}
