//! Archive definitions.
//!
//! These definitions are independent of the decoders, and describe the on-disk
//! layout of a Unix `ar` archive as produced by Apple's `ar` and `libtool`.

use crate::pod::Pod;

/// File identification bytes stored at the beginning of the file.
pub const MAGIC: [u8; 8] = *b"!<arch>\n";

/// The terminator for each archive member header.
pub const TERMINATOR: [u8; 2] = *b"`\n";

/// The prefix of a member name that stores its real name in front of the member data.
///
/// The remaining bytes of the name field hold the length of the real name in decimal.
pub const BSD_EXTENDED_NAME_PREFIX: [u8; 3] = *b"#1/";

/// The name prefix shared by all variants of the symbol table member.
///
/// This covers `__.SYMDEF`, `__.SYMDEF SORTED`, `__.SYMDEF_64` and
/// `__.SYMDEF_64 SORTED`.
pub const SYMDEF_PREFIX: &[u8] = b"__.SYMDEF";

/// The header at the start of an archive member.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Header {
    /// The file name.
    pub name: [u8; 16],
    /// File modification timestamp in decimal.
    pub date: [u8; 12],
    /// User ID in decimal.
    pub uid: [u8; 6],
    /// Group ID in decimal.
    pub gid: [u8; 6],
    /// File mode in octal.
    pub mode: [u8; 8],
    /// File size in decimal.
    pub size: [u8; 10],
    /// Must be equal to `TERMINATOR`.
    pub terminator: [u8; 2],
}

unsafe impl Pod for Header {}
