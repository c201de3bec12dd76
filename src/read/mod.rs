//! Interface for decoding Apple container files.
//!
//! The entry point is [`decode_container`], which sniffs the leading magic of a
//! buffer and recursively decodes fat images and static archives, handing each
//! concrete object image to an [`ObjectDecoder`].

use core::fmt;

mod util;
pub use util::*;

mod any;
pub use any::*;

mod object;
pub use object::*;

#[cfg(feature = "archive")]
pub mod archive;

#[cfg(feature = "fat")]
pub mod fat;

/// The category of a decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A field or region extends past the end of the available data.
    Truncated,
    /// A magic, terminator, or required numeric field is invalid.
    Malformed,
    /// A section's size is not a multiple of its element size.
    Misaligned,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Truncated => "truncated",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Misaligned => "misaligned",
        })
    }
}

/// The error type used within the read module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    offset: Option<u64>,
    message: &'static str,
}

impl Error {
    /// Create an error at an absolute offset in the input buffer.
    #[inline]
    pub fn new(kind: ErrorKind, offset: u64, message: &'static str) -> Self {
        Error {
            kind,
            offset: Some(offset),
            message,
        }
    }

    /// Create an error that has no meaningful position.
    #[inline]
    pub fn unpositioned(kind: ErrorKind, message: &'static str) -> Self {
        Error {
            kind,
            offset: None,
            message,
        }
    }

    /// The category of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The absolute offset in the input buffer at which decoding failed.
    #[inline]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// A description of the field or structure that failed to decode.
    #[inline]
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} at offset 0x{:x}", self.message, offset),
            None => f.write_str(self.message),
        }
    }
}

impl std::error::Error for Error {}

/// The result type used within the read module.
pub type Result<T> = core::result::Result<T, Error>;

pub(crate) trait ReadError<T> {
    fn read_error(self, kind: ErrorKind, offset: u64, message: &'static str) -> Result<T>;
}

impl<T> ReadError<T> for core::result::Result<T, ()> {
    fn read_error(self, kind: ErrorKind, offset: u64, message: &'static str) -> Result<T> {
        self.map_err(|()| Error::new(kind, offset, message))
    }
}

impl<T> ReadError<T> for Option<T> {
    fn read_error(self, kind: ErrorKind, offset: u64, message: &'static str) -> Result<T> {
        self.ok_or(Error::new(kind, offset, message))
    }
}

/// The architecture of a fat slice or object image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Architecture {
    /// An unrecognized CPU type.
    Unknown,
    /// 32-bit ARM
    Arm,
    /// 64-bit ARM
    Arm64,
    /// 64-bit ARM with 32-bit pointers
    Arm64_32,
    /// 32-bit x86
    I386,
    /// 64-bit x86
    X86_64,
    /// 32-bit PowerPC
    PowerPc,
    /// 64-bit PowerPC
    PowerPc64,
}

impl Architecture {
    /// Map a Mach-O CPU type to an architecture.
    pub fn from_cputype(cputype: u32) -> Self {
        use crate::macho;
        match cputype {
            macho::CPU_TYPE_ARM => Architecture::Arm,
            macho::CPU_TYPE_ARM64 => Architecture::Arm64,
            macho::CPU_TYPE_ARM64_32 => Architecture::Arm64_32,
            macho::CPU_TYPE_X86 => Architecture::I386,
            macho::CPU_TYPE_X86_64 => Architecture::X86_64,
            macho::CPU_TYPE_POWERPC => Architecture::PowerPc,
            macho::CPU_TYPE_POWERPC64 => Architecture::PowerPc64,
            _ => Architecture::Unknown,
        }
    }

    /// The conventional name of the architecture, as used by `lipo`.
    pub fn name(self) -> &'static str {
        match self {
            Architecture::Unknown => "unknown",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
            Architecture::Arm64_32 => "arm64_32",
            Architecture::I386 => "i386",
            Architecture::X86_64 => "x86_64",
            Architecture::PowerPc => "ppc",
            Architecture::PowerPc64 => "ppc64",
        }
    }

    /// Return true if pointers are 64 bits wide on this architecture.
    pub fn is_64(self) -> Option<bool> {
        match self {
            Architecture::Unknown => None,
            Architecture::Arm64 | Architecture::X86_64 | Architecture::PowerPc64 => Some(true),
            Architecture::Arm
            | Architecture::Arm64_32
            | Architecture::I386
            | Architecture::PowerPc => Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = Error::new(ErrorKind::Truncated, 0x3c, "Invalid archive member header");
        assert_eq!(
            error.to_string(),
            "Invalid archive member header at offset 0x3c"
        );
        assert_eq!(error.kind(), ErrorKind::Truncated);
        assert_eq!(error.offset(), Some(0x3c));

        let error = Error::unpositioned(ErrorKind::Malformed, "Container nesting is too deep");
        assert_eq!(error.to_string(), "Container nesting is too deep");
        assert_eq!(error.offset(), None);
    }

    #[test]
    fn read_error() {
        let value: Option<u32> = None;
        let error = value
            .read_error(ErrorKind::Malformed, 8, "Invalid fat header")
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
        assert_eq!(error.offset(), Some(8));

        let value: core::result::Result<u32, ()> = Ok(5);
        assert_eq!(
            value.read_error(ErrorKind::Malformed, 0, "unused"),
            Ok(5)
        );
    }

    #[test]
    fn architecture() {
        use crate::macho;
        assert_eq!(
            Architecture::from_cputype(macho::CPU_TYPE_ARM64),
            Architecture::Arm64
        );
        assert_eq!(Architecture::from_cputype(macho::CPU_TYPE_X86_64).name(), "x86_64");
        assert_eq!(Architecture::from_cputype(0x1234), Architecture::Unknown);
        assert_eq!(Architecture::Arm64_32.is_64(), Some(false));
        assert_eq!(Architecture::Unknown.is_64(), None);
    }
}
