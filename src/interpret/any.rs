use crate::interpret::{
    Interpreter, LiteralPointerInterpreter, SearchSource, SymbolPointerInterpreter,
    SymbolPointerKind,
};
use crate::macho;
use crate::read::{FileSlice, Result};
use crate::translate::{IndexPath, Translation, TranslationItem};

/// An interpreter for any supported section type.
#[derive(Debug)]
#[non_exhaustive]
pub enum SectionInterpreter<'data, 'a> {
    /// `S_LITERAL_POINTERS`
    LiteralPointers(LiteralPointerInterpreter<'data, 'a>),
    /// Any of the symbol pointer section types.
    SymbolPointers(SymbolPointerInterpreter<'data, 'a>),
}

impl<'data, 'a> SectionInterpreter<'data, 'a> {
    /// Select an interpreter from the type bits of a section's flags.
    ///
    /// `indirect_start` is the section's `reserved1` field, and is only used
    /// by symbol pointer sections. Returns `Ok(None)` for section types that
    /// have no interpreter.
    pub fn new(
        section_type: u32,
        data: FileSlice<'data>,
        is_64: bool,
        source: &'a dyn SearchSource,
        indirect_start: usize,
    ) -> Result<Option<Self>> {
        if section_type & macho::SECTION_TYPE == macho::S_LITERAL_POINTERS {
            return LiteralPointerInterpreter::new(data, is_64, source)
                .map(|interpreter| Some(SectionInterpreter::LiteralPointers(interpreter)));
        }
        match SymbolPointerKind::from_section_type(section_type) {
            Some(kind) => {
                SymbolPointerInterpreter::new(data, is_64, source, kind, indirect_start)
                    .map(|interpreter| Some(SectionInterpreter::SymbolPointers(interpreter)))
            }
            None => Ok(None),
        }
    }

    /// The section bytes.
    pub fn data(&self) -> FileSlice<'data> {
        match self {
            SectionInterpreter::LiteralPointers(interpreter) => interpreter.data(),
            SectionInterpreter::SymbolPointers(interpreter) => interpreter.data(),
        }
    }

    fn translation(&self) -> &dyn Translation {
        match self {
            SectionInterpreter::LiteralPointers(interpreter) => interpreter,
            SectionInterpreter::SymbolPointers(interpreter) => interpreter,
        }
    }
}

impl<'data, 'a> Translation for SectionInterpreter<'data, 'a> {
    fn section_count(&self) -> usize {
        self.translation().section_count()
    }

    fn item_count(&self, section: usize) -> usize {
        self.translation().item_count(section)
    }

    fn item(&self, path: IndexPath) -> Option<TranslationItem> {
        self.translation().item(path)
    }
}
