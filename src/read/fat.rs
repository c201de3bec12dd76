//! Support for fat (universal) images.
//!
//! A fat image starts with a big-endian [`macho::FatHeader`] followed by a
//! directory of architecture entries. Each entry locates one slice of the
//! file, which is itself an object image or a static archive.

use core::fmt::{self, Debug};
use core::ops::Range;

use crate::endian::BigEndian;
use crate::macho;
use crate::pod::Pod;
use crate::read::{
    decode_container, Architecture, Container, Cursor, DecodeContext, Error, ErrorKind,
    FileSlice, ObjectDecoder, ReadError, Result,
};
use crate::translate::{hex, IndexPath, Translation, TranslationItem};

/// A trait for generic access to [`macho::FatArch32`] and [`macho::FatArch64`].
#[allow(missing_docs)]
pub trait FatArch: Pod + Debug {
    const MAGIC: u32;

    fn cputype(&self) -> u32;
    fn cpusubtype(&self) -> u32;
    fn offset(&self) -> u64;
    fn size(&self) -> u64;
    fn align(&self) -> u32;
    fn reserved(&self) -> u32;
}

impl FatArch for macho::FatArch32 {
    const MAGIC: u32 = macho::FAT_MAGIC;

    fn cputype(&self) -> u32 {
        self.cputype.get(BigEndian)
    }

    fn cpusubtype(&self) -> u32 {
        self.cpusubtype.get(BigEndian)
    }

    fn offset(&self) -> u64 {
        self.offset.get(BigEndian).into()
    }

    fn size(&self) -> u64 {
        self.size.get(BigEndian).into()
    }

    fn align(&self) -> u32 {
        self.align.get(BigEndian)
    }

    fn reserved(&self) -> u32 {
        0
    }
}

impl FatArch for macho::FatArch64 {
    const MAGIC: u32 = macho::FAT_MAGIC_64;

    fn cputype(&self) -> u32 {
        self.cputype.get(BigEndian)
    }

    fn cpusubtype(&self) -> u32 {
        self.cpusubtype.get(BigEndian)
    }

    fn offset(&self) -> u64 {
        self.offset.get(BigEndian)
    }

    fn size(&self) -> u64 {
        self.size.get(BigEndian)
    }

    fn align(&self) -> u32 {
        self.align.get(BigEndian)
    }

    fn reserved(&self) -> u32 {
        self.reserved.get(BigEndian)
    }
}

/// One decoded entry of a fat architecture directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatArchEntry {
    entry_offset: u64,
    is_64: bool,
    cputype: u32,
    cpusubtype: u32,
    offset: u64,
    size: u64,
    align: u32,
    reserved: u32,
}

impl FatArchEntry {
    fn from_raw<Arch: FatArch>(arch: &Arch, entry_offset: u64) -> Self {
        FatArchEntry {
            entry_offset,
            is_64: Arch::MAGIC == macho::FAT_MAGIC_64,
            cputype: arch.cputype(),
            cpusubtype: arch.cpusubtype(),
            offset: arch.offset(),
            size: arch.size(),
            align: arch.align(),
            reserved: arch.reserved(),
        }
    }

    #[inline]
    pub fn cputype(&self) -> u32 {
        self.cputype
    }

    #[inline]
    pub fn cpusubtype(&self) -> u32 {
        self.cpusubtype
    }

    /// The offset of the slice, relative to the start of the fat image.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The slice alignment as a power of 2.
    #[inline]
    pub fn align(&self) -> u32 {
        self.align
    }

    /// The architecture of the slice.
    #[inline]
    pub fn architecture(&self) -> Architecture {
        Architecture::from_cputype(self.cputype)
    }

    /// The absolute byte range of the directory entry itself.
    pub fn entry_range(&self) -> Range<u64> {
        self.entry_offset..self.entry_offset + self.entry_size() as u64
    }

    fn entry_size(&self) -> usize {
        if self.is_64 {
            core::mem::size_of::<macho::FatArch64>()
        } else {
            core::mem::size_of::<macho::FatArch32>()
        }
    }

    // (label, offset within the entry, size) for each on-disk field.
    fn fields(&self) -> &'static [(&'static str, usize, usize)] {
        if self.is_64 {
            &[
                ("CPU Type", 0, 4),
                ("CPU Subtype", 4, 4),
                ("File Offset", 8, 8),
                ("File Size", 16, 8),
                ("Align", 24, 4),
                ("Reserved", 28, 4),
            ]
        } else {
            &[
                ("CPU Type", 0, 4),
                ("CPU Subtype", 4, 4),
                ("File Offset", 8, 4),
                ("File Size", 12, 4),
                ("Align", 16, 4),
            ]
        }
    }

    fn field_item(&self, index: usize) -> Option<TranslationItem> {
        let &(label, offset, size) = self.fields().get(index)?;
        let start = self.entry_offset + offset as u64;
        let explanation = match index {
            0 => format!("{} ({})", self.architecture().name(), hex(self.cputype)),
            1 => hex(self.cpusubtype & !macho::CPU_SUBTYPE_MASK),
            2 => hex(self.offset),
            3 => hex(self.size),
            4 => match 1u64.checked_shl(self.align) {
                Some(alignment) => format!("2^{} ({})", self.align, alignment),
                None => format!("2^{}", self.align),
            },
            _ => hex(self.reserved),
        };
        let item = TranslationItem::new(start..start + size as u64, label, explanation);
        if index + 1 == self.fields().len() {
            Some(item.with_divider())
        } else {
            Some(item)
        }
    }
}

/// The header and architecture directory of a fat image.
#[derive(Debug, Clone)]
pub struct FatDirectory<'data> {
    data: FileSlice<'data>,
    header: &'data macho::FatHeader,
    arches: Vec<FatArchEntry>,
}

impl<'data> FatDirectory<'data> {
    /// Parse the fat header and directory.
    ///
    /// Every entry is checked to lie within `data`.
    pub fn parse(data: FileSlice<'data>) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = cursor.read::<macho::FatHeader>("Invalid fat header size")?;
        let arches = match header.magic.get(BigEndian) {
            macho::FAT_MAGIC => Self::parse_arches::<macho::FatArch32>(data, cursor, header)?,
            macho::FAT_MAGIC_64 => Self::parse_arches::<macho::FatArch64>(data, cursor, header)?,
            _ => {
                return Err(Error::new(
                    ErrorKind::Malformed,
                    data.offset(),
                    "Invalid fat magic",
                ))
            }
        };
        Ok(FatDirectory {
            data,
            header,
            arches,
        })
    }

    fn parse_arches<Arch: FatArch>(
        data: FileSlice<'data>,
        mut cursor: Cursor<'data>,
        header: &macho::FatHeader,
    ) -> Result<Vec<FatArchEntry>> {
        let count = header.nfat_arch.get(BigEndian) as usize;
        let entry_size = core::mem::size_of::<Arch>();
        count
            .checked_mul(entry_size)
            .filter(|size| *size <= cursor.remaining())
            .read_error(
                ErrorKind::Truncated,
                data.offset() + 4,
                "Invalid fat arch count",
            )?;

        let mut arches = Vec::with_capacity(count);
        for _ in 0..count {
            let entry_offset = cursor.absolute_position();
            let arch = cursor.read::<Arch>("Invalid fat arch size")?;
            let entry = FatArchEntry::from_raw(arch, entry_offset);
            data.sub_slice(entry.offset, entry.size, "Invalid fat arch offset or size")
                .map_err(|_| {
                    Error::new(
                        ErrorKind::Truncated,
                        entry_offset + 8,
                        "Fat arch slice is outside the file",
                    )
                })?;
            arches.push(entry);
        }
        Ok(arches)
    }

    /// Return true for the 64-bit fat format.
    #[inline]
    pub fn is_64(&self) -> bool {
        self.header.magic.get(BigEndian) == macho::FAT_MAGIC_64
    }

    /// The number of architectures declared by the header.
    #[inline]
    pub fn arch_count(&self) -> u32 {
        self.header.nfat_arch.get(BigEndian)
    }

    /// The directory entries, in file order.
    #[inline]
    pub fn arches(&self) -> &[FatArchEntry] {
        &self.arches
    }

    /// The region of the file holding the slice for `arch`.
    pub fn slice(&self, arch: &FatArchEntry) -> Result<FileSlice<'data>> {
        self.data
            .sub_slice(arch.offset, arch.size, "Invalid fat arch offset or size")
    }

    /// Return the entry for the given architecture.
    pub fn find(&self, architecture: Architecture) -> Option<&FatArchEntry> {
        self.arches
            .iter()
            .find(|arch| arch.architecture() == architecture)
    }
}

/// The fat header forms the first section, and each directory entry its own section.
impl<'data> Translation for FatDirectory<'data> {
    fn section_count(&self) -> usize {
        1 + self.arches.len()
    }

    fn item_count(&self, section: usize) -> usize {
        match section {
            0 => 2,
            _ => self
                .arches
                .get(section - 1)
                .map_or(0, |arch| arch.fields().len()),
        }
    }

    fn item(&self, path: IndexPath) -> Option<TranslationItem> {
        if path.section == 0 {
            let start = self.data.offset();
            return match path.item {
                0 => Some(TranslationItem::new(
                    start..start + 4,
                    "Magic",
                    hex(self.header.magic.get(BigEndian)),
                )),
                1 => Some(
                    TranslationItem::new(
                        start + 4..start + 8,
                        "Number of Architectures",
                        self.arch_count().to_string(),
                    )
                    .with_divider(),
                ),
                _ => None,
            };
        }
        self.arches.get(path.section - 1)?.field_item(path.item)
    }
}

/// One decoded architecture slice.
pub struct FatSlice<'data, O> {
    arch: FatArchEntry,
    data: FileSlice<'data>,
    content: Result<Container<'data, O>>,
}

impl<'data, O> FatSlice<'data, O> {
    /// The directory entry for this slice.
    #[inline]
    pub fn arch(&self) -> &FatArchEntry {
        &self.arch
    }

    /// The region of the file holding this slice.
    #[inline]
    pub fn data(&self) -> FileSlice<'data> {
        self.data
    }

    /// The decoded slice.
    #[inline]
    pub fn content(&self) -> core::result::Result<&Container<'data, O>, &Error> {
        self.content.as_ref()
    }
}

impl<'data, O: Debug> Debug for FatSlice<'data, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatSlice")
            .field("arch", &self.arch)
            .field("data", &self.data)
            .field("content", &self.content)
            .finish()
    }
}

/// A decoded fat image.
pub struct FatFile<'data, O> {
    directory: FatDirectory<'data>,
    slices: Vec<FatSlice<'data, O>>,
}

impl<'data, O> FatFile<'data, O> {
    /// Parse the directory and decode every slice.
    ///
    /// A slice whose content fails to decode is kept, with the error as its
    /// content. A malformed directory aborts the whole image.
    pub fn parse<D>(data: FileSlice<'data>, context: &DecodeContext, decoder: &D) -> Result<Self>
    where
        D: ObjectDecoder<'data, Object = O>,
    {
        let directory = FatDirectory::parse(data)?;
        let mut slices = Vec::with_capacity(directory.arches().len());
        for arch in directory.arches() {
            let slice_data = directory.slice(arch)?;
            let slice_context = context.arch_child(arch.architecture().name());
            tracing::debug!(
                name = slice_context.name(),
                offset = slice_data.offset(),
                size = slice_data.len(),
                "decoding fat slice"
            );
            let content = decode_container(slice_data, &slice_context, decoder);
            if let Err(error) = &content {
                tracing::warn!(name = slice_context.name(), %error, "fat slice failed to decode");
            }
            slices.push(FatSlice {
                arch: *arch,
                data: slice_data,
                content,
            });
        }
        Ok(FatFile { directory, slices })
    }

    /// The fat header and architecture directory.
    #[inline]
    pub fn directory(&self) -> &FatDirectory<'data> {
        &self.directory
    }

    /// The decoded slices, in directory order.
    #[inline]
    pub fn slices(&self) -> &[FatSlice<'data, O>] {
        &self.slices
    }
}

impl<'data, O: Debug> Debug for FatFile<'data, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatFile")
            .field("directory", &self.directory)
            .field("slices", &self.slices)
            .finish()
    }
}
