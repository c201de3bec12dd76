//! Types for compile-time and run-time endianness.
//!
//! Mach-O container fields are stored in a fixed byte order that may differ
//! from the host. The field types here are unaligned byte arrays, so they can
//! be cast from any offset of a file buffer.

use core::fmt::{self, Debug};
use core::marker::PhantomData;

/// A trait for using an endianness specification.
///
/// Provides methods for converting between the specified endianness and
/// the native endianness of the target machine.
pub trait Endian: Debug + Default + Clone + Copy + PartialEq + Eq + 'static {
    /// Return true for big endian byte order.
    fn is_big_endian(self) -> bool;

    /// Return true for little endian byte order.
    #[inline]
    fn is_little_endian(self) -> bool {
        !self.is_big_endian()
    }

    /// Converting unaligned bytes from the specified endianness to native endianness.
    #[inline]
    fn read_u16_bytes(self, n: [u8; 2]) -> u16 {
        if self.is_big_endian() {
            u16::from_be_bytes(n)
        } else {
            u16::from_le_bytes(n)
        }
    }

    /// Converting unaligned bytes from the specified endianness to native endianness.
    #[inline]
    fn read_u32_bytes(self, n: [u8; 4]) -> u32 {
        if self.is_big_endian() {
            u32::from_be_bytes(n)
        } else {
            u32::from_le_bytes(n)
        }
    }

    /// Converting unaligned bytes from the specified endianness to native endianness.
    #[inline]
    fn read_u64_bytes(self, n: [u8; 8]) -> u64 {
        if self.is_big_endian() {
            u64::from_be_bytes(n)
        } else {
            u64::from_le_bytes(n)
        }
    }
}

/// An endianness that is selectable at run-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Little endian byte order.
    Little,
    /// Big endian byte order.
    Big,
}

impl Default for Endianness {
    #[cfg(target_endian = "little")]
    #[inline]
    fn default() -> Endianness {
        Endianness::Little
    }

    #[cfg(target_endian = "big")]
    #[inline]
    fn default() -> Endianness {
        Endianness::Big
    }
}

impl Endian for Endianness {
    #[inline]
    fn is_big_endian(self) -> bool {
        self == Endianness::Big
    }
}

/// Compile-time big endian byte order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BigEndian;

impl Endian for BigEndian {
    #[inline]
    fn is_big_endian(self) -> bool {
        true
    }
}

/// Compile-time little endian byte order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LittleEndian;

impl Endian for LittleEndian {
    #[inline]
    fn is_big_endian(self) -> bool {
        false
    }
}

/// An unaligned `u16` value with an externally specified endianness of type `E`.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct U16Bytes<E: Endian>([u8; 2], PhantomData<E>);

impl<E: Endian> U16Bytes<E> {
    /// Construct a new value given bytes that already have the required endianness.
    pub const fn from_bytes(n: [u8; 2]) -> Self {
        Self(n, PhantomData)
    }

    /// Return the value as a native endian value.
    #[inline]
    pub fn get(self, e: E) -> u16 {
        e.read_u16_bytes(self.0)
    }
}

/// An unaligned `u32` value with an externally specified endianness of type `E`.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct U32Bytes<E: Endian>([u8; 4], PhantomData<E>);

impl<E: Endian> U32Bytes<E> {
    /// Construct a new value given bytes that already have the required endianness.
    pub const fn from_bytes(n: [u8; 4]) -> Self {
        Self(n, PhantomData)
    }

    /// Return the value as a native endian value.
    #[inline]
    pub fn get(self, e: E) -> u32 {
        e.read_u32_bytes(self.0)
    }
}

/// An unaligned `u64` value with an externally specified endianness of type `E`.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct U64Bytes<E: Endian>([u8; 8], PhantomData<E>);

impl<E: Endian> U64Bytes<E> {
    /// Construct a new value given bytes that already have the required endianness.
    pub const fn from_bytes(n: [u8; 8]) -> Self {
        Self(n, PhantomData)
    }

    /// Return the value as a native endian value.
    #[inline]
    pub fn get(self, e: E) -> u64 {
        e.read_u64_bytes(self.0)
    }
}

impl<E: Endian> Debug for U16Bytes<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U16({:x}, {:x})", self.0[0], self.0[1])
    }
}

impl<E: Endian> Debug for U32Bytes<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "U32({:x}, {:x}, {:x}, {:x})",
            self.0[0], self.0[1], self.0[2], self.0[3],
        )
    }
}

impl<E: Endian> Debug for U64Bytes<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "U64({:x}, {:x}, {:x}, {:x}, {:x}, {:x}, {:x}, {:x})",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5], self.0[6], self.0[7],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order() {
        let bytes = [0x01, 0x23, 0x45, 0x67];
        assert_eq!(U32Bytes::<BigEndian>::from_bytes(bytes).get(BigEndian), 0x0123_4567);
        assert_eq!(
            U32Bytes::<LittleEndian>::from_bytes(bytes).get(LittleEndian),
            0x6745_2301
        );
        assert_eq!(
            U32Bytes::<Endianness>::from_bytes(bytes).get(Endianness::Big),
            0x0123_4567
        );
        assert_eq!(
            U16Bytes::<Endianness>::from_bytes([0x01, 0x23]).get(Endianness::Little),
            0x2301
        );
        assert_eq!(
            U64Bytes::<BigEndian>::from_bytes([0, 0, 0, 1, 0, 0, 0, 2]).get(BigEndian),
            0x0000_0001_0000_0002
        );
    }
}
