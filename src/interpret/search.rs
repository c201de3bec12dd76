//! Queries that section interpreters make against the enclosing image.

use std::collections::BTreeMap;
use std::mem;

use crate::endian::{Endianness, U32Bytes};
use crate::macho;
use crate::pod::{self, Pod};
use crate::read::{read_string_at, Error, ErrorKind, FileSlice, Result, StringTable};

/// Read-only lookups into the tables of a decoded object image.
///
/// Every lookup may fail to resolve. Stripped and synthetic entries are
/// common, so a miss is reported as `None` and never as an error.
pub trait SearchSource {
    /// The byte order of the image.
    fn endian(&self) -> Endianness {
        Endianness::Little
    }

    /// The NUL-terminated string stored at a virtual address, without the NUL.
    fn string_for_address(&self, address: u64) -> Option<&[u8]>;

    /// The entry at `index` in the indirect symbol table.
    fn indirect_symbol(&self, index: usize) -> Option<IndirectSymbol>;

    /// The entry at `index` in the symbol table.
    fn symbol(&self, index: usize) -> Option<SymbolEntry>;

    /// The string at `offset` in the symbol string table.
    fn string_table_entry(&self, offset: u32) -> Option<&[u8]>;

    /// Follow an indirect symbol table entry through the symbol table to a name.
    fn indirect_symbol_name(&self, index: usize) -> Option<&[u8]> {
        let indirect = self.indirect_symbol(index)?;
        let symbol = self.symbol(indirect.symbol_index()?)?;
        self.string_table_entry(symbol.string_index)
    }
}

/// An entry of the indirect symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndirectSymbol {
    /// The raw table value.
    pub value: u32,
}

impl IndirectSymbol {
    /// The symbol was local and has been stripped.
    #[inline]
    pub fn is_local(&self) -> bool {
        self.value & macho::INDIRECT_SYMBOL_LOCAL != 0
    }

    /// The symbol was absolute.
    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.value & macho::INDIRECT_SYMBOL_ABS != 0
    }

    /// The symbol table index, unless this entry is a sentinel.
    pub fn symbol_index(&self) -> Option<usize> {
        if self.is_local() || self.is_absolute() {
            None
        } else {
            Some(self.value as usize)
        }
    }
}

/// An entry of the symbol table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolEntry {
    /// The offset of the name in the string table.
    pub string_index: u32,
    pub n_type: u8,
    pub n_sect: u8,
    pub n_desc: u16,
    pub n_value: u64,
}

/// A trait for generic access to [`macho::Nlist32`] and [`macho::Nlist64`].
trait Nlist: Pod {
    fn entry(&self, endian: Endianness) -> SymbolEntry;
}

impl Nlist for macho::Nlist32<Endianness> {
    fn entry(&self, endian: Endianness) -> SymbolEntry {
        SymbolEntry {
            string_index: self.n_strx.get(endian),
            n_type: self.n_type,
            n_sect: self.n_sect,
            n_desc: self.n_desc.get(endian),
            n_value: self.n_value.get(endian).into(),
        }
    }
}

impl Nlist for macho::Nlist64<Endianness> {
    fn entry(&self, endian: Endianness) -> SymbolEntry {
        SymbolEntry {
            string_index: self.n_strx.get(endian),
            n_type: self.n_type,
            n_sect: self.n_sect,
            n_desc: self.n_desc.get(endian),
            n_value: self.n_value.get(endian),
        }
    }
}

/// A [`SearchSource`] over the raw tables of a Mach-O image.
///
/// The tables are borrowed from the file data. C string sections are
/// registered by their virtual address.
#[derive(Debug, Clone)]
pub struct SymbolTables<'data> {
    endian: Endianness,
    is_64: bool,
    symbols: FileSlice<'data>,
    strings: StringTable<'data>,
    indirect_symbols: &'data [U32Bytes<Endianness>],
    cstrings: BTreeMap<u64, &'data [u8]>,
}

impl<'data> SymbolTables<'data> {
    /// Create empty tables for an image with the given byte order and pointer width.
    pub fn new(endian: Endianness, is_64: bool) -> Self {
        SymbolTables {
            endian,
            is_64,
            symbols: FileSlice::default(),
            strings: StringTable::default(),
            indirect_symbols: &[],
            cstrings: BTreeMap::new(),
        }
    }

    fn nlist_size(&self) -> usize {
        if self.is_64 {
            mem::size_of::<macho::Nlist64<Endianness>>()
        } else {
            mem::size_of::<macho::Nlist32<Endianness>>()
        }
    }

    /// Use `data` as the symbol table.
    pub fn with_symbols(mut self, data: FileSlice<'data>) -> Result<Self> {
        if data.len() % self.nlist_size() != 0 {
            return Err(Error::new(
                ErrorKind::Misaligned,
                data.offset(),
                "Invalid Mach-O symbol table size",
            ));
        }
        self.symbols = data;
        Ok(self)
    }

    /// Use `data` as the symbol string table.
    pub fn with_strings(mut self, data: &'data [u8]) -> Self {
        self.strings = StringTable::new(data);
        self
    }

    /// Use `data` as the indirect symbol table.
    pub fn with_indirect_symbols(mut self, data: FileSlice<'data>) -> Result<Self> {
        let count = data.len() / mem::size_of::<U32Bytes<Endianness>>();
        let (indirect_symbols, tail) = pod::slice_from_bytes(data.data(), count).ok_or(
            Error::new(
                ErrorKind::Misaligned,
                data.offset(),
                "Invalid Mach-O indirect symbol table",
            ),
        )?;
        if !tail.is_empty() {
            return Err(Error::new(
                ErrorKind::Misaligned,
                data.offset(),
                "Invalid Mach-O indirect symbol table size",
            ));
        }
        self.indirect_symbols = indirect_symbols;
        Ok(self)
    }

    /// Register a C string section loaded at `address`.
    pub fn add_cstring_section(&mut self, address: u64, data: &'data [u8]) {
        self.cstrings.insert(address, data);
    }

    /// The number of symbol table entries.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len() / self.nlist_size()
    }

    /// The number of indirect symbol table entries.
    pub fn indirect_symbol_count(&self) -> usize {
        self.indirect_symbols.len()
    }

    fn read_symbol<T: Nlist>(&self, index: usize) -> Option<SymbolEntry> {
        let offset = index.checked_mul(mem::size_of::<T>())?;
        let nlist = self
            .symbols
            .read_at::<T>(offset, "Invalid Mach-O symbol index")
            .ok()?;
        Some(nlist.entry(self.endian))
    }
}

impl<'data> SearchSource for SymbolTables<'data> {
    fn endian(&self) -> Endianness {
        self.endian
    }

    fn string_for_address(&self, address: u64) -> Option<&[u8]> {
        let (&start, &data) = self.cstrings.range(..=address).next_back()?;
        let offset = usize::try_from(address - start).ok()?;
        read_string_at(data, offset)
    }

    fn indirect_symbol(&self, index: usize) -> Option<IndirectSymbol> {
        let value = self.indirect_symbols.get(index)?.get(self.endian);
        Some(IndirectSymbol { value })
    }

    fn symbol(&self, index: usize) -> Option<SymbolEntry> {
        if self.is_64 {
            self.read_symbol::<macho::Nlist64<Endianness>>(index)
        } else {
            self.read_symbol::<macho::Nlist32<Endianness>>(index)
        }
    }

    fn string_table_entry(&self, offset: u32) -> Option<&[u8]> {
        self.strings.get(offset).ok()
    }
}
