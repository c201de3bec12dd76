use core::fmt;

use once_cell::sync::OnceCell;

use crate::interpret::{pointer_count, pointer_width, read_pointer, Interpreter, SearchSource};
use crate::read::{FileSlice, Result};
use crate::translate::{hex, IndexPath, Translation, TranslationItem};

/// One slot of a literal pointer section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralPointer {
    /// The offset of the slot within the section.
    pub relative_offset: usize,
    /// The address stored in the slot.
    pub value: u64,
}

/// Interprets an `S_LITERAL_POINTERS` section.
///
/// Each pointer forms its own translation section holding one item, which
/// shows the pointer value and the string it references, if any.
pub struct LiteralPointerInterpreter<'data, 'a> {
    data: FileSlice<'data>,
    is_64: bool,
    source: &'a dyn SearchSource,
    payload: OnceCell<Vec<LiteralPointer>>,
}

impl<'data, 'a> LiteralPointerInterpreter<'data, 'a> {
    /// Create an interpreter for the section bytes in `data`.
    ///
    /// Returns an error if the section size is not a multiple of the pointer size.
    pub fn new(data: FileSlice<'data>, is_64: bool, source: &'a dyn SearchSource) -> Result<Self> {
        pointer_count(data, is_64, "Invalid literal pointer section size")?;
        Ok(LiteralPointerInterpreter {
            data,
            is_64,
            source,
            payload: OnceCell::new(),
        })
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

    fn pointers(&self) -> &[LiteralPointer] {
        self.payload.get_or_init(|| {
            let endian = self.source.endian();
            let width = pointer_width(self.is_64);
            (0..self.len())
                .filter_map(|index| {
                    let value = read_pointer(self.data, index, self.is_64, endian)?;
                    Some(LiteralPointer {
                        relative_offset: index * width,
                        value,
                    })
                })
                .collect()
        })
    }
}

impl<'data, 'a> fmt::Debug for LiteralPointerInterpreter<'data, 'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiteralPointerInterpreter")
            .field("data", &self.data)
            .field("is_64", &self.is_64)
            .finish_non_exhaustive()
    }
}

impl<'data, 'a> Translation for LiteralPointerInterpreter<'data, 'a> {
    fn section_count(&self) -> usize {
        self.len()
    }

    fn item_count(&self, section: usize) -> usize {
        if section < self.len() {
            1
        } else {
            0
        }
    }

    fn item(&self, path: IndexPath) -> Option<TranslationItem> {
        if path.item != 0 {
            return None;
        }
        let pointer = self.pointers().get(path.section)?;
        let range = self
            .data
            .absolute_range(pointer.relative_offset, pointer_width(self.is_64));
        let item = TranslationItem::new(
            range,
            "Pointer Value (Virtual Address)",
            hex(pointer.value),
        );
        let item = match self.source.string_for_address(pointer.value) {
            Some(string) => item.with_extra(
                "Referenced String Symbol",
                String::from_utf8_lossy(string).into_owned(),
            ),
            None => {
                tracing::trace!(address = pointer.value, "unresolved literal pointer");
                item
            }
        };
        Some(item.with_divider())
    }
}

impl<'data, 'a> Interpreter<'data> for LiteralPointerInterpreter<'data, 'a> {
    type Payload = [LiteralPointer];

    fn data(&self) -> FileSlice<'data> {
        self.data
    }

    fn payload(&self) -> &[LiteralPointer] {
        self.pointers()
    }
}
