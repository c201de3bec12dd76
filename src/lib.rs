//! # `machscope`
//!
//! The `machscope` crate decodes Apple container files (fat universal images
//! and BSD `ar` static libraries) down to the object images they hold, and
//! presents decoded structures as annotated byte ranges of the input.
//!
//! ## Raw struct definitions
//!
//! Raw structs are defined for: [Mach-O](macho) and [Unix archive](archive).
//! Types and traits for zerocopy support are defined in the [`pod`] and
//! [`endian`] modules.
//!
//! ## Decoding
//!
//! [`read::decode_file`] sniffs the leading magic of a buffer and recursively
//! decodes fat images and archives, handing each object image to a
//! [`read::ObjectDecoder`]. [`read::MachHeaderDecoder`] is a built-in decoder
//! that summarizes the Mach header.
//!
//! Decoded headers, and the section interpreters in [`interpret`], implement
//! [`translate::Translation`]: an indexable sequence of
//! [`translate::TranslationItem`]s, each labelling a range of input bytes.
//!
//! ## Example
//!  ```no_run
//! use machscope::read::{decode_file, MachHeaderDecoder};
//! use std::error::Error;
//! use std::fs;
//!
//! /// Reads a universal binary and displays the architecture of each image.
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let data = fs::read("path/to/binary")?;
//!     let container = decode_file(&data, "binary", &MachHeaderDecoder)?;
//!     for object in container.objects() {
//!         println!("{}: {}", object.name(), object.architecture().name());
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_debug_implementations)]

pub mod endian;
pub use endian::*;

pub mod pod;

pub mod archive;
pub mod macho;

pub mod read;
pub use read::*;

pub mod translate;

#[cfg(feature = "interpret")]
pub mod interpret;
