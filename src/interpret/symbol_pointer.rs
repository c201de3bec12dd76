use core::fmt;

use once_cell::sync::OnceCell;

use crate::interpret::{pointer_count, pointer_width, read_pointer, Interpreter, SearchSource};
use crate::macho;
use crate::read::{FileSlice, Result};
use crate::translate::{hex, IndexPath, Translation, TranslationItem};

/// The kind of a symbol pointer section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolPointerKind {
    /// `S_NON_LAZY_SYMBOL_POINTERS`
    NonLazy,
    /// `S_LAZY_SYMBOL_POINTERS`
    Lazy,
    /// `S_LAZY_DYLIB_SYMBOL_POINTERS`
    LazyDylib,
    /// `S_THREAD_LOCAL_VARIABLE_POINTERS`
    ThreadLocalVariable,
}

impl SymbolPointerKind {
    /// Map the type bits of a section's flags to a symbol pointer kind.
    pub fn from_section_type(section_type: u32) -> Option<Self> {
        match section_type & macho::SECTION_TYPE {
            macho::S_NON_LAZY_SYMBOL_POINTERS => Some(SymbolPointerKind::NonLazy),
            macho::S_LAZY_SYMBOL_POINTERS => Some(SymbolPointerKind::Lazy),
            macho::S_LAZY_DYLIB_SYMBOL_POINTERS => Some(SymbolPointerKind::LazyDylib),
            macho::S_THREAD_LOCAL_VARIABLE_POINTERS => Some(SymbolPointerKind::ThreadLocalVariable),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SymbolPointerKind::NonLazy => "Non-Lazy Symbol Pointer",
            SymbolPointerKind::Lazy => "Lazy Symbol Pointer",
            SymbolPointerKind::LazyDylib => "Lazy Dylib Symbol Pointer",
            SymbolPointerKind::ThreadLocalVariable => "Thread Local Variable Pointer",
        }
    }
}

/// One slot of a symbol pointer section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolPointer {
    /// The offset of the slot within the section.
    pub relative_offset: usize,
    /// The value stored in the slot.
    pub value: u64,
    /// The index of the slot's entry in the indirect symbol table.
    ///
    /// This is `None` if the index overflows.
    pub indirect_index: Option<usize>,
}

/// Interprets a section of symbol pointers.
///
/// Slot `i` corresponds to entry `start_index + i` of the indirect symbol
/// table. All slots are items of a single translation section.
pub struct SymbolPointerInterpreter<'data, 'a> {
    data: FileSlice<'data>,
    is_64: bool,
    source: &'a dyn SearchSource,
    kind: SymbolPointerKind,
    start_index: usize,
    payload: OnceCell<Vec<SymbolPointer>>,
}

impl<'data, 'a> SymbolPointerInterpreter<'data, 'a> {
    /// Create an interpreter for the section bytes in `data`.
    ///
    /// `start_index` is the section's first index into the indirect symbol
    /// table, as stored in its `reserved1` field.
    pub fn new(
        data: FileSlice<'data>,
        is_64: bool,
        source: &'a dyn SearchSource,
        kind: SymbolPointerKind,
        start_index: usize,
    ) -> Result<Self> {
        pointer_count(data, is_64, "Invalid symbol pointer section size")?;
        Ok(SymbolPointerInterpreter {
            data,
            is_64,
            source,
            kind,
            start_index,
            payload: OnceCell::new(),
        })
    }

    #[inline]
    pub fn kind(&self) -> SymbolPointerKind {
        self.kind
    }

    /// The section's first index into the indirect symbol table.
    #[inline]
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// The number of pointers in the section.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / pointer_width(self.is_64)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn pointers(&self) -> &[SymbolPointer] {
        self.payload.get_or_init(|| {
            let endian = self.source.endian();
            let width = pointer_width(self.is_64);
            (0..self.len())
                .filter_map(|index| {
                    let value = read_pointer(self.data, index, self.is_64, endian)?;
                    Some(SymbolPointer {
                        relative_offset: index * width,
                        value,
                        indirect_index: self.start_index.checked_add(index),
                    })
                })
                .collect()
        })
    }

    /// The name of the symbol targeted by `pointer`, if the lookup chain resolves.
    pub fn target_name(&self, pointer: &SymbolPointer) -> Option<&'a [u8]> {
        let name = pointer
            .indirect_index
            .and_then(|index| self.source.indirect_symbol_name(index));
        if name.is_none() {
            tracing::trace!(
                indirect_index = pointer.indirect_index,
                "unresolved symbol pointer"
            );
        }
        name
    }
}

impl<'data, 'a> fmt::Debug for SymbolPointerInterpreter<'data, 'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolPointerInterpreter")
            .field("data", &self.data)
            .field("is_64", &self.is_64)
            .field("kind", &self.kind)
            .field("start_index", &self.start_index)
            .finish_non_exhaustive()
    }
}

impl<'data, 'a> Translation for SymbolPointerInterpreter<'data, 'a> {
    fn section_count(&self) -> usize {
        1
    }

    fn item_count(&self, section: usize) -> usize {
        match section {
            0 => self.len(),
            _ => 0,
        }
    }

    fn item(&self, path: IndexPath) -> Option<TranslationItem> {
        if path.section != 0 {
            return None;
        }
        let pointer = self.pointers().get(path.item)?;
        let range = self
            .data
            .absolute_range(pointer.relative_offset, pointer_width(self.is_64));
        let item = TranslationItem::new(range, self.kind.label(), hex(pointer.value));
        Some(match self.target_name(pointer) {
            Some(name) => item.with_extra(
                "Target Symbol for This Pointer",
                String::from_utf8_lossy(name).into_owned(),
            ),
            None => item,
        })
    }
}

impl<'data, 'a> Interpreter<'data> for SymbolPointerInterpreter<'data, 'a> {
    type Payload = [SymbolPointer];

    fn data(&self) -> FileSlice<'data> {
        self.data
    }

    fn payload(&self) -> &[SymbolPointer] {
        self.pointers()
    }
}
