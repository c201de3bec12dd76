use core::fmt::Debug;
use core::mem;

use crate::endian::{BigEndian, Endian, Endianness};
use crate::macho;
use crate::pod::Pod;
use crate::read::{
    Architecture, Cursor, DecodeContext, Error, ErrorKind, FileSlice, ObjectDecoder, Result,
};
use crate::translate::{hex, IndexPath, Translation, TranslationItem};

/// A trait for generic access to [`macho::MachHeader32`] and [`macho::MachHeader64`].
#[allow(missing_docs)]
pub trait MachHeader: Debug + Pod {
    /// The magic value identifying the byte order for this header size.
    const MAGIC: u32;

    /// Return true if this type is a 64-bit header.
    fn is_type_64(&self) -> bool;

    fn magic(&self) -> u32;
    fn cputype(&self, endian: Endianness) -> u32;
    fn cpusubtype(&self, endian: Endianness) -> u32;
    fn filetype(&self, endian: Endianness) -> u32;
    fn ncmds(&self, endian: Endianness) -> u32;
    fn sizeofcmds(&self, endian: Endianness) -> u32;
    fn flags(&self, endian: Endianness) -> u32;
    fn reserved(&self, endian: Endianness) -> u32;

    /// The byte order of the remaining fields, derived from the magic.
    fn endian(&self) -> Option<Endianness> {
        let magic = self.magic();
        if magic == Self::MAGIC {
            Some(Endianness::Big)
        } else if magic == Self::MAGIC.swap_bytes() {
            Some(Endianness::Little)
        } else {
            None
        }
    }
}

impl MachHeader for macho::MachHeader32<Endianness> {
    const MAGIC: u32 = macho::MH_MAGIC;

    fn is_type_64(&self) -> bool {
        false
    }

    fn magic(&self) -> u32 {
        self.magic.get(BigEndian)
    }

    fn cputype(&self, endian: Endianness) -> u32 {
        self.cputype.get(endian)
    }

    fn cpusubtype(&self, endian: Endianness) -> u32 {
        self.cpusubtype.get(endian)
    }

    fn filetype(&self, endian: Endianness) -> u32 {
        self.filetype.get(endian)
    }

    fn ncmds(&self, endian: Endianness) -> u32 {
        self.ncmds.get(endian)
    }

    fn sizeofcmds(&self, endian: Endianness) -> u32 {
        self.sizeofcmds.get(endian)
    }

    fn flags(&self, endian: Endianness) -> u32 {
        self.flags.get(endian)
    }

    fn reserved(&self, _endian: Endianness) -> u32 {
        0
    }
}

impl MachHeader for macho::MachHeader64<Endianness> {
    const MAGIC: u32 = macho::MH_MAGIC_64;

    fn is_type_64(&self) -> bool {
        true
    }

    fn magic(&self) -> u32 {
        self.magic.get(BigEndian)
    }

    fn cputype(&self, endian: Endianness) -> u32 {
        self.cputype.get(endian)
    }

    fn cpusubtype(&self, endian: Endianness) -> u32 {
        self.cpusubtype.get(endian)
    }

    fn filetype(&self, endian: Endianness) -> u32 {
        self.filetype.get(endian)
    }

    fn ncmds(&self, endian: Endianness) -> u32 {
        self.ncmds.get(endian)
    }

    fn sizeofcmds(&self, endian: Endianness) -> u32 {
        self.sizeofcmds.get(endian)
    }

    fn flags(&self, endian: Endianness) -> u32 {
        self.flags.get(endian)
    }

    fn reserved(&self, endian: Endianness) -> u32 {
        self.reserved.get(endian)
    }
}

/// A summary of a Mach-O header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachHeaderInfo<'data> {
    data: FileSlice<'data>,
    name: String,
    endian: Endianness,
    is_64: bool,
    magic: u32,
    cputype: u32,
    cpusubtype: u32,
    filetype: u32,
    ncmds: u32,
    sizeofcmds: u32,
    flags: u32,
    reserved: u32,
}

impl<'data> MachHeaderInfo<'data> {
    /// Parse the Mach header at the start of `data`.
    pub fn parse(data: FileSlice<'data>, name: &str) -> Result<Self> {
        let magic = match data.data().get(..4) {
            Some(&[a, b, c, d]) => Some(u32::from_be_bytes([a, b, c, d])),
            _ => None,
        };
        match magic {
            Some(macho::MH_MAGIC) | Some(macho::MH_CIGAM) => {
                Self::parse_header::<macho::MachHeader32<Endianness>>(data, name)
            }
            Some(macho::MH_MAGIC_64) | Some(macho::MH_CIGAM_64) => {
                Self::parse_header::<macho::MachHeader64<Endianness>>(data, name)
            }
            _ => Err(Error::new(
                ErrorKind::Malformed,
                data.offset(),
                "Invalid Mach-O magic",
            )),
        }
    }

    fn parse_header<Mach: MachHeader>(data: FileSlice<'data>, name: &str) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = cursor.read::<Mach>("Invalid Mach-O header size or alignment")?;
        let endian = header.endian().ok_or(Error::new(
            ErrorKind::Malformed,
            data.offset(),
            "Unsupported Mach-O endian",
        ))?;
        let sizeofcmds = header.sizeofcmds(endian);
        cursor.skip(sizeofcmds as usize, "Invalid Mach-O load command table size")?;
        Ok(MachHeaderInfo {
            data,
            name: name.into(),
            endian,
            is_64: header.is_type_64(),
            magic: header.magic(),
            cputype: header.cputype(endian),
            cpusubtype: header.cpusubtype(endian),
            filetype: header.filetype(endian),
            ncmds: header.ncmds(endian),
            sizeofcmds,
            flags: header.flags(endian),
            reserved: header.reserved(endian),
        })
    }

    /// The region of the file holding the image.
    #[inline]
    pub fn data(&self) -> FileSlice<'data> {
        self.data
    }

    /// The diagnostic name of the image.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn endian(&self) -> Endianness {
        self.endian
    }

    #[inline]
    pub fn is_little_endian(&self) -> bool {
        self.endian.is_little_endian()
    }

    #[inline]
    pub fn is_64(&self) -> bool {
        self.is_64
    }

    #[inline]
    pub fn cputype(&self) -> u32 {
        self.cputype
    }

    #[inline]
    pub fn cpusubtype(&self) -> u32 {
        self.cpusubtype
    }

    #[inline]
    pub fn filetype(&self) -> u32 {
        self.filetype
    }

    /// The number of load commands.
    #[inline]
    pub fn ncmds(&self) -> u32 {
        self.ncmds
    }

    /// The total size of the load commands.
    #[inline]
    pub fn sizeofcmds(&self) -> u32 {
        self.sizeofcmds
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// The reserved field of a 64-bit header, or 0 for a 32-bit header.
    #[inline]
    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    #[inline]
    pub fn architecture(&self) -> Architecture {
        Architecture::from_cputype(self.cputype)
    }

    fn header_size(&self) -> usize {
        if self.is_64 {
            mem::size_of::<macho::MachHeader64<Endianness>>()
        } else {
            mem::size_of::<macho::MachHeader32<Endianness>>()
        }
    }
}

fn filetype_name(filetype: u32) -> Option<&'static str> {
    Some(match filetype {
        macho::MH_OBJECT => "MH_OBJECT",
        macho::MH_EXECUTE => "MH_EXECUTE",
        macho::MH_DYLIB => "MH_DYLIB",
        macho::MH_DYLINKER => "MH_DYLINKER",
        macho::MH_BUNDLE => "MH_BUNDLE",
        macho::MH_DSYM => "MH_DSYM",
        _ => return None,
    })
}

/// One item per header field, in a single section.
impl<'data> Translation for MachHeaderInfo<'data> {
    fn section_count(&self) -> usize {
        1
    }

    fn item_count(&self, section: usize) -> usize {
        match section {
            0 => self.header_size() / 4,
            _ => 0,
        }
    }

    fn item(&self, path: IndexPath) -> Option<TranslationItem> {
        if path.section != 0 || path.item >= self.item_count(0) {
            return None;
        }
        let range = self.data.absolute_range(path.item * 4, 4);
        let item = match path.item {
            0 => TranslationItem::new(range, "Magic", hex(self.magic)),
            1 => TranslationItem::new(
                range,
                "CPU Type",
                format!("{} ({})", self.architecture().name(), hex(self.cputype)),
            ),
            2 => TranslationItem::new(
                range,
                "CPU Subtype",
                hex(self.cpusubtype & !macho::CPU_SUBTYPE_MASK),
            ),
            3 => {
                let explanation = match filetype_name(self.filetype) {
                    Some(name) => name.to_string(),
                    None => hex(self.filetype),
                };
                TranslationItem::new(range, "File Type", explanation)
            }
            4 => TranslationItem::new(range, "Number of Load Commands", self.ncmds.to_string()),
            5 => TranslationItem::new(range, "Size of Load Commands", hex(self.sizeofcmds)),
            6 => TranslationItem::new(range, "Flags", hex(self.flags)),
            _ => TranslationItem::new(range, "Reserved", hex(self.reserved)),
        };
        if path.item + 1 == self.item_count(0) {
            Some(item.with_divider())
        } else {
            Some(item)
        }
    }
}

/// An [`ObjectDecoder`] that validates and summarizes the Mach header of each image.
#[derive(Debug, Default, Clone, Copy)]
pub struct MachHeaderDecoder;

impl<'data> ObjectDecoder<'data> for MachHeaderDecoder {
    type Object = MachHeaderInfo<'data>;

    fn decode(&self, data: FileSlice<'data>, context: &DecodeContext) -> Result<Self::Object> {
        MachHeaderInfo::parse(data, context.name())
    }
}
