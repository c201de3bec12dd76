use core::fmt;

use crate::macho;
use crate::read::{Error, ErrorKind, FileSlice, Result};

#[cfg(feature = "archive")]
use crate::read::archive::ArchiveFile;
#[cfg(feature = "fat")]
use crate::read::fat::FatFile;

/// A file format kind, determined from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FileKind {
    /// A Unix `ar` archive (static library).
    Archive,
    /// A 32-bit fat (universal) image.
    MachOFat32,
    /// A 64-bit fat (universal) image.
    MachOFat64,
    /// A 32-bit Mach-O object image.
    MachO32,
    /// A 64-bit Mach-O object image.
    MachO64,
    /// Anything else.
    Unknown,
}

impl FileKind {
    /// Determine the file kind for the given data.
    pub fn sniff(data: &[u8]) -> FileKind {
        if data.starts_with(&crate::archive::MAGIC) {
            return FileKind::Archive;
        }
        let magic = match data.get(..4) {
            Some(&[a, b, c, d]) => u32::from_be_bytes([a, b, c, d]),
            _ => return FileKind::Unknown,
        };
        match magic {
            macho::FAT_MAGIC => FileKind::MachOFat32,
            macho::FAT_MAGIC_64 => FileKind::MachOFat64,
            macho::MH_MAGIC | macho::MH_CIGAM => FileKind::MachO32,
            macho::MH_MAGIC_64 | macho::MH_CIGAM_64 => FileKind::MachO64,
            _ => FileKind::Unknown,
        }
    }
}

/// Runtime limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// The maximum nesting of containers, counting the outermost file as depth 0.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions { max_depth: 4 }
    }
}

/// Diagnostic context threaded through a recursive decode.
///
/// Each nested container receives its own context derived from its parent's,
/// so labels never leak between siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeContext {
    name: String,
    depth: usize,
    options: DecodeOptions,
}

impl DecodeContext {
    /// Create the context for a top level file.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, DecodeOptions::default())
    }

    /// Create the context for a top level file with explicit options.
    pub fn with_options(name: impl Into<String>, options: DecodeOptions) -> Self {
        DecodeContext {
            name: name.into(),
            depth: 0,
            options,
        }
    }

    /// The display name of the container being decoded.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nesting depth of the container being decoded.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Derive the context for a nested container.
    pub fn child(&self, name: impl Into<String>) -> Self {
        DecodeContext {
            name: name.into(),
            depth: self.depth + 1,
            options: self.options,
        }
    }

    /// Derive the context for an architecture slice of this container.
    pub fn arch_child(&self, arch: &str) -> Self {
        self.child(format!("{} ({})", self.name, arch))
    }
}

/// Decodes a single object image.
///
/// The container decoders never look inside object images; they hand each one
/// to an implementation of this trait.
pub trait ObjectDecoder<'data> {
    /// The decoded representation of an object image.
    type Object;

    /// Decode the object image in `data`.
    fn decode(&self, data: FileSlice<'data>, context: &DecodeContext) -> Result<Self::Object>;
}

impl<'data, O, F> ObjectDecoder<'data> for F
where
    F: Fn(FileSlice<'data>, &DecodeContext) -> Result<O>,
{
    type Object = O;

    fn decode(&self, data: FileSlice<'data>, context: &DecodeContext) -> Result<O> {
        self(data, context)
    }
}

/// The decoded structure of a file or of a nested region of a file.
pub enum Container<'data, O> {
    /// A concrete object image.
    Object(O),
    /// A static archive.
    #[cfg(feature = "archive")]
    Archive(ArchiveFile<'data, O>),
    /// A fat image.
    #[cfg(feature = "fat")]
    Fat(FatFile<'data, O>),
    /// A region whose magic is not recognized.
    Unsupported(FileSlice<'data>),
}

impl<'data, O: fmt::Debug> fmt::Debug for Container<'data, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Object(object) => f.debug_tuple("Object").field(object).finish(),
            #[cfg(feature = "archive")]
            Container::Archive(archive) => f.debug_tuple("Archive").field(archive).finish(),
            #[cfg(feature = "fat")]
            Container::Fat(fat) => f.debug_tuple("Fat").field(fat).finish(),
            Container::Unsupported(data) => f.debug_tuple("Unsupported").field(data).finish(),
        }
    }
}

impl<'data, O> Container<'data, O> {
    /// Return the object if this container is a concrete object image.
    pub fn as_object(&self) -> Option<&O> {
        match self {
            Container::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Return the archive if this container is a static archive.
    #[cfg(feature = "archive")]
    pub fn as_archive(&self) -> Option<&ArchiveFile<'data, O>> {
        match self {
            Container::Archive(archive) => Some(archive),
            _ => None,
        }
    }

    /// Return the fat image if this container is a fat image.
    #[cfg(feature = "fat")]
    pub fn as_fat(&self) -> Option<&FatFile<'data, O>> {
        match self {
            Container::Fat(fat) => Some(fat),
            _ => None,
        }
    }

    /// Return true if the magic of this region was not recognized.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Container::Unsupported(_))
    }

    /// All successfully decoded objects, in file order.
    ///
    /// Nested slices and members that failed to decode are skipped.
    pub fn objects(&self) -> Vec<&O> {
        let mut objects = Vec::new();
        self.collect_objects(&mut objects);
        objects
    }

    pub(crate) fn collect_objects<'a>(&'a self, objects: &mut Vec<&'a O>) {
        match self {
            Container::Object(object) => objects.push(object),
            #[cfg(feature = "archive")]
            Container::Archive(archive) => {
                for member in archive.members() {
                    if let Ok(content) = member.content() {
                        content.collect_objects(objects);
                    }
                }
            }
            #[cfg(feature = "fat")]
            Container::Fat(fat) => {
                for slice in fat.slices() {
                    if let Ok(content) = slice.content() {
                        content.collect_objects(objects);
                    }
                }
            }
            Container::Unsupported(_) => {}
        }
    }
}

/// Decode a whole file buffer.
pub fn decode_file<'data, D>(
    data: &'data [u8],
    name: &str,
    decoder: &D,
) -> Result<Container<'data, D::Object>>
where
    D: ObjectDecoder<'data>,
{
    decode_container(FileSlice::new(data), &DecodeContext::new(name), decoder)
}

/// Decode a region of a file, dispatching on its magic.
///
/// Fat images and archives recurse into their slices and members; object
/// images are passed to `decoder`.
pub fn decode_container<'data, D>(
    data: FileSlice<'data>,
    context: &DecodeContext,
    decoder: &D,
) -> Result<Container<'data, D::Object>>
where
    D: ObjectDecoder<'data>,
{
    if context.depth() > context.options().max_depth {
        return Err(Error::new(
            ErrorKind::Malformed,
            data.offset(),
            "Container nesting is too deep",
        ));
    }
    let kind = FileKind::sniff(data.data());
    tracing::debug!(
        name = context.name(),
        depth = context.depth(),
        offset = data.offset(),
        size = data.len(),
        ?kind,
        "decoding container"
    );
    match kind {
        #[cfg(feature = "archive")]
        FileKind::Archive => ArchiveFile::parse(data, context, decoder).map(Container::Archive),
        #[cfg(feature = "fat")]
        FileKind::MachOFat32 | FileKind::MachOFat64 => {
            FatFile::parse(data, context, decoder).map(Container::Fat)
        }
        FileKind::MachO32 | FileKind::MachO64 => decoder.decode(data, context).map(Container::Object),
        _ => Ok(Container::Unsupported(data)),
    }
}
