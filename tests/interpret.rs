#![cfg(feature = "interpret")]

use machscope::endian::Endianness;
use machscope::interpret::{
    pointer_width, Interpreter, LiteralPointerInterpreter, SectionInterpreter, SymbolTables,
};
use machscope::macho;
use machscope::read::FileSlice;
use machscope::translate::{Translation, TranslationItem};

fn pointers(values: &[u64], is_64: bool) -> Vec<u8> {
    let mut data = Vec::new();
    for &value in values {
        if is_64 {
            data.extend_from_slice(&value.to_le_bytes());
        } else {
            data.extend_from_slice(&(value as u32).to_le_bytes());
        }
    }
    data
}

fn nlist64(strx: u32) -> Vec<u8> {
    let mut data = strx.to_le_bytes().to_vec();
    data.extend_from_slice(&[0x01, 0, 0, 0]);
    data.extend_from_slice(&0u64.to_le_bytes());
    data
}

fn assert_contiguous(items: &[TranslationItem], start: u64, end: u64) {
    let mut next = start;
    for item in items {
        assert_eq!(item.source_range().start, next);
        next = item.source_range().end;
    }
    assert_eq!(next, end);
}

#[test]
fn literal_pointer_items() {
    for is_64 in [false, true] {
        let mut tables = SymbolTables::new(Endianness::Little, is_64);
        tables.add_cstring_section(0x3000, b"alpha\0beta\0");
        let data = pointers(&[0x3000, 0x3006, 0x3000, 0x10], is_64);
        let slice = FileSlice::with_offset(&data, 0x700);
        let interpreter = LiteralPointerInterpreter::new(slice, is_64, &tables).unwrap();

        let width = pointer_width(is_64);
        assert_eq!(interpreter.total_item_count(), data.len() / width);
        assert_eq!(interpreter.payload().len(), 4);

        let items: Vec<TranslationItem> = interpreter.items().collect();
        for item in &items {
            assert_eq!(item.source_range().end - item.source_range().start, width as u64);
        }
        assert_contiguous(&items, 0x700, 0x700 + data.len() as u64);

        let strings: Vec<Option<&str>> = items.iter().map(|item| item.extra_explanation()).collect();
        assert_eq!(strings, [Some("alpha"), Some("beta"), Some("alpha"), None]);
    }
}

#[test]
fn symbol_pointer_chain() {
    // Symbols 0 and 1 are named "bar" and "foo".
    let mut symbols = nlist64(5);
    symbols.extend(nlist64(1));
    let strings = b"\0foo\0bar\0";
    // Indirect entries 0..5 are padding. Entry 5 is stripped, entry 6 names
    // symbol 1 and entry 7 names a symbol past the end of the table.
    let mut indirect = Vec::new();
    for value in [0, 0, 0, 0, 0, macho::INDIRECT_SYMBOL_LOCAL, 1, 99u32] {
        indirect.extend_from_slice(&value.to_le_bytes());
    }
    let tables = SymbolTables::new(Endianness::Little, true)
        .with_symbols(FileSlice::new(&symbols))
        .unwrap()
        .with_strings(strings)
        .with_indirect_symbols(FileSlice::new(&indirect))
        .unwrap();

    let data = pointers(&[0x1111, 0x2222, 0x3333], true);
    let slice = FileSlice::with_offset(&data, 0x4000);
    let interpreter =
        SectionInterpreter::new(macho::S_LAZY_SYMBOL_POINTERS, slice, true, &tables, 5)
            .unwrap()
            .unwrap();

    assert_eq!(interpreter.section_count(), 1);
    let items: Vec<TranslationItem> = interpreter.items().collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].extra_explanation(), None);
    assert_eq!(items[1].extra_explanation(), Some("foo"));
    assert_eq!(items[2].extra_explanation(), None);
    assert_eq!(items[1].explanation(), "0x2222");
    assert_contiguous(&items, 0x4000, 0x4018);

    // Repeated and out of order requests agree.
    assert_eq!(interpreter.item_at(1), Some(items[1].clone()));
    assert_eq!(interpreter.item_at(0), Some(items[0].clone()));
}
