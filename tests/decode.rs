#![cfg(all(feature = "archive", feature = "fat"))]

use machscope::macho;
use machscope::read::{
    decode_container, decode_file, Architecture, Container, DecodeContext, DecodeOptions,
    ErrorKind, FileSlice, MachHeaderDecoder, MachHeaderInfo,
};
use machscope::translate::Translation;

// A 64-bit little endian Mach header with no load commands.
fn object(cputype: u32) -> Vec<u8> {
    let mut data = Vec::new();
    for value in [macho::MH_MAGIC_64, cputype, 0, macho::MH_OBJECT, 0, 0, 0, 0] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

fn fat(slices: &[(u32, &[u8])]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&macho::FAT_MAGIC.to_be_bytes());
    data.extend_from_slice(&(slices.len() as u32).to_be_bytes());
    let mut offset = 0x100;
    for (cputype, content) in slices {
        for value in [*cputype, 0, offset, content.len() as u32, 8] {
            data.extend_from_slice(&value.to_be_bytes());
        }
        offset += 0x100;
    }
    for (index, (_, content)) in slices.iter().enumerate() {
        data.resize(0x100 * (index + 1), 0);
        data.extend_from_slice(content);
    }
    data
}

fn member(name: &str, content: &[u8]) -> Vec<u8> {
    let header = format!(
        "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
        name,
        0,
        0,
        0,
        644,
        content.len()
    );
    let mut data = header.into_bytes();
    data.extend_from_slice(content);
    if data.len() % 2 != 0 {
        data.push(b'\n');
    }
    data
}

fn archive(members: &[Vec<u8>]) -> Vec<u8> {
    let mut data = b"!<arch>\n".to_vec();
    for member in members {
        data.extend_from_slice(member);
    }
    data
}

fn extended_member(name: &str, content: &[u8]) -> Vec<u8> {
    let header = format!(
        "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
        format!("#1/{}", name.len()),
        0,
        0,
        0,
        644,
        name.len() + content.len()
    );
    let mut data = header.into_bytes();
    data.extend_from_slice(name.as_bytes());
    data.extend_from_slice(content);
    data
}

fn names<'a>(objects: &[&'a MachHeaderInfo<'_>]) -> Vec<&'a str> {
    objects.iter().map(|object| object.name()).collect()
}

#[test]
fn fat_two_architectures() {
    let x86_64 = object(macho::CPU_TYPE_X86_64);
    let arm64 = object(macho::CPU_TYPE_ARM64);
    let data = fat(&[
        (macho::CPU_TYPE_X86_64, &x86_64[..]),
        (macho::CPU_TYPE_ARM64, &arm64[..]),
    ]);
    let container = decode_file(&data, "universal", &MachHeaderDecoder).unwrap();
    let fat = container.as_fat().unwrap();
    assert_eq!(fat.directory().arch_count(), 2);
    assert_eq!(fat.slices().len(), 2);
    for slice in fat.slices() {
        let range = slice.data().range();
        assert!(range.end <= data.len() as u64);
        assert_eq!(range.start, slice.arch().offset());
        assert_eq!(range.end - range.start, slice.arch().size());
    }

    let objects = container.objects();
    assert_eq!(names(&objects), ["universal (x86_64)", "universal (arm64)"]);
    assert_eq!(objects[0].architecture(), Architecture::X86_64);
    assert_eq!(objects[0].data().offset(), 0x100);
    assert_eq!(objects[1].architecture(), Architecture::Arm64);
    assert_eq!(objects[1].data().offset(), 0x200);
}

#[test]
fn archive_member_names() {
    let symdef = member("__.SYMDEF", b"\0\0\0\0\0\0\0\0");
    let data = archive(&[
        symdef.clone(),
        member("a.o", &object(macho::CPU_TYPE_ARM64)),
        extended_member("longname.o", &object(macho::CPU_TYPE_ARM64)),
    ]);
    let container = decode_file(&data, "libfoo.a", &MachHeaderDecoder).unwrap();
    let archive = container.as_archive().unwrap();
    let member_names: Vec<&[u8]> = archive
        .members()
        .iter()
        .map(|member| member.header().name())
        .collect();
    assert_eq!(member_names, [&b"a.o"[..], &b"longname.o"[..]]);

    // The symbol table is skipped by exactly its size.
    assert_eq!(archive.members()[0].header().offset(), 8 + symdef.len() as u64);

    let long = archive.members()[1].header();
    assert_eq!(long.extended_name_len(), 10);
    assert_eq!(archive.members()[1].data().len(), 32);
    assert_eq!(names(&container.objects()), ["a.o", "longname.o"]);
}

#[test]
fn fat_of_archive() {
    let library = archive(&[member("a.o", &object(macho::CPU_TYPE_ARM64))]);
    let data = fat(&[(macho::CPU_TYPE_ARM64, &library[..])]);
    let container = decode_file(&data, "libfat.a", &MachHeaderDecoder).unwrap();
    let slice = &container.as_fat().unwrap().slices()[0];
    let archive = slice.content().unwrap().as_archive().unwrap();
    assert_eq!(archive.members().len(), 1);

    let objects = container.objects();
    assert_eq!(names(&objects), ["a.o"]);
    assert_eq!(objects[0].data().offset(), 0x100 + 8 + 60);
}

#[test]
fn archive_of_fat() {
    let x86_64 = object(macho::CPU_TYPE_X86_64);
    let arm64 = object(macho::CPU_TYPE_ARM64);
    let universal = fat(&[
        (macho::CPU_TYPE_X86_64, &x86_64[..]),
        (macho::CPU_TYPE_ARM64, &arm64[..]),
    ]);
    let data = archive(&[member("u.o", &universal)]);
    let container = decode_file(&data, "lib.a", &MachHeaderDecoder).unwrap();
    let objects = container.objects();
    assert_eq!(names(&objects), ["u.o (x86_64)", "u.o (arm64)"]);
    // Fat offsets are relative to the start of the member.
    assert_eq!(objects[0].data().offset(), 8 + 60 + 0x100);
}

#[test]
fn partial_failure() {
    let good = object(macho::CPU_TYPE_X86_64);
    let truncated = object(macho::CPU_TYPE_ARM64)[..12].to_vec();
    let data = fat(&[
        (macho::CPU_TYPE_X86_64, &good[..]),
        (macho::CPU_TYPE_ARM64, &truncated[..]),
        (macho::CPU_TYPE_X86, &b"not an object"[..]),
    ]);
    let container = decode_file(&data, "mixed", &MachHeaderDecoder).unwrap();
    let slices = container.as_fat().unwrap().slices();
    assert_eq!(slices.len(), 3);
    assert!(slices[0].content().unwrap().as_object().is_some());
    let error = slices[1].content().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Truncated);
    assert_eq!(error.offset(), Some(0x200));
    assert!(slices[2].content().unwrap().is_unsupported());
    assert_eq!(container.objects().len(), 1);
}

#[test]
fn fat_slice_outside_file() {
    let object = object(macho::CPU_TYPE_ARM64);
    let mut data = fat(&[(macho::CPU_TYPE_ARM64, &object[..])]);
    data.truncate(0x110);
    let error = decode_file(&data, "short", &MachHeaderDecoder).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Truncated);
}

#[test]
fn nesting_limit() {
    let inner = archive(&[member("a.o", &object(macho::CPU_TYPE_ARM64))]);
    let outer = archive(&[member("inner.a", &inner)]);
    let options = DecodeOptions { max_depth: 1 };
    let context = DecodeContext::with_options("outer.a", options);
    let container = decode_container(FileSlice::new(&outer), &context, &MachHeaderDecoder).unwrap();
    let archive = container.as_archive().unwrap();
    let nested = archive.members()[0].content().unwrap().as_archive().unwrap();
    let error = nested.members()[0].content().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Malformed);
    assert!(container.objects().is_empty());

    let container = decode_file(&outer, "outer.a", &MachHeaderDecoder).unwrap();
    assert_eq!(names(&container.objects()), ["a.o"]);
}

#[test]
fn translations_cover_headers() {
    let object = object(macho::CPU_TYPE_ARM64);
    let data = fat(&[(macho::CPU_TYPE_ARM64, &object[..])]);
    let container = decode_file(&data, "one", &MachHeaderDecoder).unwrap();
    let fat = container.as_fat().unwrap();

    let mut end = 0;
    for item in fat.directory().items() {
        assert_eq!(item.source_range().start, end);
        end = item.source_range().end;
    }
    assert_eq!(end, 8 + 20);

    let header = container.objects()[0];
    let mut end = 0x100;
    for item in header.items() {
        assert_eq!(item.source_range().start, end);
        end = item.source_range().end;
    }
    assert_eq!(end, 0x100 + 32);
}

#[test]
fn unsupported_file() {
    let container = decode_file(b"\x7fELF\x02\x01\x01", "elf", &MachHeaderDecoder).unwrap();
    assert!(matches!(container, Container::Unsupported(_)));
}
