//! Tools for converting file format structures from bytes.
//!
//! This module should be replaced once rust provides safe transmutes.

use core::{mem, slice};

use crate::endian::{Endian, U16Bytes, U32Bytes, U64Bytes};

/// A trait for types that can safely be converted from byte slices.
///
/// # Safety
/// A type that is `Pod` must:
/// - be `#[repr(C)]` or `#[repr(transparent)]`
/// - have no invalid byte values
/// - have no padding
pub unsafe trait Pod: Copy + 'static {}

/// Cast the head of `data` to a `T`, returning the value and the remaining bytes.
///
/// Returns `None` if `data` is too short or incorrectly aligned for `T`.
#[inline]
pub fn from_bytes<T: Pod>(data: &[u8]) -> Option<(&T, &[u8])> {
    let ptr = data.as_ptr();
    if (ptr as usize) % mem::align_of::<T>() != 0 {
        return None;
    }
    let size = mem::size_of::<T>();
    let tail = data.get(size..)?;
    // Safety:
    // The alignment and size are checked by this function.
    // The Pod trait ensures the type is valid to cast from bytes.
    let val = unsafe { &*ptr.cast() };
    Some((val, tail))
}

/// Cast the head of `data` to a slice of `count` values of `T`.
#[inline]
pub fn slice_from_bytes<T: Pod>(data: &[u8], count: usize) -> Option<(&[T], &[u8])> {
    let ptr = data.as_ptr();
    if (ptr as usize) % mem::align_of::<T>() != 0 {
        return None;
    }
    let size = count.checked_mul(mem::size_of::<T>())?;
    let tail = data.get(size..)?;
    // Safety:
    // The alignment and size are checked by this function.
    // The Pod trait ensures the type is valid to cast from bytes.
    let slice = unsafe { slice::from_raw_parts(ptr.cast(), count) };
    Some((slice, tail))
}

unsafe impl<const N: usize> Pod for [u8; N] {}
unsafe impl<E: Endian> Pod for U16Bytes<E> {}
unsafe impl<E: Endian> Pod for U32Bytes<E> {}
unsafe impl<E: Endian> Pod for U64Bytes<E> {}
