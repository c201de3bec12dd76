//! Support for archive files.
//!
//! ## Example
//!  ```no_run
//! use machscope::read::{decode_file, MachHeaderDecoder};
//! use std::error::Error;
//! use std::fs;
//!
//! /// Reads a static library and displays the name of each member.
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let data = fs::read("path/to/libfoo.a")?;
//!     let container = decode_file(&data, "libfoo.a", &MachHeaderDecoder)?;
//!     if let Some(archive) = container.as_archive() {
//!         for member in archive.members() {
//!             println!("{}", String::from_utf8_lossy(member.header().name()));
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use core::convert::TryFrom;
use core::fmt;
use core::ops::Range;

use crate::archive;
use crate::read::{
    decode_container, Container, Cursor, DecodeContext, Error, ErrorKind, FileSlice,
    ObjectDecoder, ReadError, Result,
};
use crate::translate::{IndexPath, Translation, TranslationItem};

/// The kind of archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ArchiveKind {
    /// There is no symbol table member that indicates the archive format.
    Unknown,
    /// The BSD archive format.
    Bsd,
    /// The BSD archive format with 64-bit symbol table.
    Bsd64,
}

/// A decoded archive member header.
///
/// For BSD extended names, the real name is read from the start of the member
/// data and the header's content size still includes it.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveMemberHeader<'data> {
    header: &'data archive::Header,
    offset: u64,
    name: &'data [u8],
    extended_name: Option<FileSlice<'data>>,
    content_size: usize,
}

impl<'data> ArchiveMemberHeader<'data> {
    /// The size of the fixed part of a member header.
    pub const SIZE: usize = core::mem::size_of::<archive::Header>();

    /// Parse a member header, and its extended name if any, advancing `cursor`
    /// to the start of the member content.
    pub fn parse(cursor: &mut Cursor<'data>) -> Result<Self> {
        let offset = cursor.absolute_position();
        let header = cursor
            .read::<archive::Header>("Invalid archive member header")?;
        if header.terminator != archive::TERMINATOR {
            return Err(Error::new(
                ErrorKind::Malformed,
                offset + 58,
                "Invalid archive terminator",
            ));
        }

        let content_size = parse_u64_digits(&header.size, 10)
            .and_then(|size| usize::try_from(size).ok())
            .read_error(ErrorKind::Malformed, offset + 48, "Invalid archive member size")?;

        let (name, extended_name) = if header.name.starts_with(&archive::BSD_EXTENDED_NAME_PREFIX)
        {
            // 4.4BSD stores the real name in front of the data, and the name
            // field holds its length.
            let digits = &header.name[archive::BSD_EXTENDED_NAME_PREFIX.len()..];
            let len = parse_u64_digits(digits, 10)
                .and_then(|len| usize::try_from(len).ok())
                .filter(|len| *len <= content_size)
                .read_error(
                    ErrorKind::Malformed,
                    offset + 3,
                    "Invalid archive extended name length",
                )?;
            let name_data = cursor.read_slice(len, "Invalid archive extended name")?;
            (trim_name(name_data.data()), Some(name_data))
        } else {
            (trim_name(&header.name), None)
        };

        Ok(ArchiveMemberHeader {
            header,
            offset,
            name,
            extended_name,
            content_size,
        })
    }

    /// Return the raw header.
    #[inline]
    pub fn raw(&self) -> &'data archive::Header {
        self.header
    }

    /// The absolute offset of the header.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Return the parsed file name.
    ///
    /// This may be an extended file name.
    #[inline]
    pub fn name(&self) -> &'data [u8] {
        self.name
    }

    /// Return true for the archive's symbol table member.
    #[inline]
    pub fn is_symbol_table(&self) -> bool {
        self.name.starts_with(archive::SYMDEF_PREFIX)
    }

    /// The region holding the extended file name, if the header uses one.
    #[inline]
    pub fn extended_name(&self) -> Option<FileSlice<'data>> {
        self.extended_name
    }

    /// The length of the extended file name, or 0.
    #[inline]
    pub fn extended_name_len(&self) -> usize {
        self.extended_name.map_or(0, |name| name.len())
    }

    /// The size recorded in the header. This includes any extended name.
    #[inline]
    pub fn content_size(&self) -> usize {
        self.content_size
    }

    /// The size of the member data that follows the extended name.
    #[inline]
    pub fn data_size(&self) -> usize {
        self.content_size - self.extended_name_len()
    }

    /// The modification timestamp field, as text.
    #[inline]
    pub fn date_text(&self) -> Option<&'data str> {
        text_field(&self.header.date)
    }

    /// The owner ID field, as text.
    #[inline]
    pub fn uid_text(&self) -> Option<&'data str> {
        text_field(&self.header.uid)
    }

    /// The group ID field, as text.
    #[inline]
    pub fn gid_text(&self) -> Option<&'data str> {
        text_field(&self.header.gid)
    }

    /// The file mode field, as text.
    #[inline]
    pub fn mode_text(&self) -> Option<&'data str> {
        text_field(&self.header.mode)
    }

    /// Parse the file modification timestamp from the header.
    #[inline]
    pub fn date(&self) -> Option<u64> {
        parse_u64_digits(&self.header.date, 10)
    }

    /// Parse the user ID from the header.
    #[inline]
    pub fn uid(&self) -> Option<u64> {
        parse_u64_digits(&self.header.uid, 10)
    }

    /// Parse the group ID from the header.
    #[inline]
    pub fn gid(&self) -> Option<u64> {
        parse_u64_digits(&self.header.gid, 10)
    }

    /// Parse the file mode from the header.
    #[inline]
    pub fn mode(&self) -> Option<u64> {
        parse_u64_digits(&self.header.mode, 8)
    }

    /// The absolute byte range of the fixed header.
    #[inline]
    pub fn header_range(&self) -> Range<u64> {
        self.offset..self.offset + Self::SIZE as u64
    }
}

// (label, offset within the header, size) for each fixed field.
const HEADER_FIELDS: [(&str, usize, usize); 7] = [
    ("File ID", 0, 16),
    ("Modification Time", 16, 12),
    ("Owner ID", 28, 6),
    ("Group ID", 34, 6),
    ("File Mode", 40, 8),
    ("Content Size", 48, 10),
    ("Header Terminator", 58, 2),
];

/// One item per fixed header field, followed by the extended name if present.
impl<'data> Translation for ArchiveMemberHeader<'data> {
    fn section_count(&self) -> usize {
        1
    }

    fn item_count(&self, section: usize) -> usize {
        match section {
            0 => HEADER_FIELDS.len() + usize::from(self.extended_name.is_some()),
            _ => 0,
        }
    }

    fn item(&self, path: IndexPath) -> Option<TranslationItem> {
        if path.section != 0 {
            return None;
        }
        let item = match HEADER_FIELDS.get(path.item) {
            Some(&(label, offset, size)) => {
                let start = self.offset + offset as u64;
                let raw = &self.header.name;
                let explanation = match path.item {
                    0 => String::from_utf8_lossy(trim_name(raw)).into_owned(),
                    1 => self.date_text().unwrap_or_default().to_string(),
                    2 => self.uid_text().unwrap_or_default().to_string(),
                    3 => self.gid_text().unwrap_or_default().to_string(),
                    4 => self.mode_text().unwrap_or_default().to_string(),
                    5 => self.content_size.to_string(),
                    _ => String::from("`\\n"),
                };
                TranslationItem::new(start..start + size as u64, label, explanation)
            }
            None if path.item == HEADER_FIELDS.len() => {
                let name = self.extended_name?;
                TranslationItem::new(
                    name.range(),
                    "Extended File ID",
                    String::from_utf8_lossy(self.name).into_owned(),
                )
            }
            None => return None,
        };
        if path.item + 1 == self.item_count(0) {
            Some(item.with_divider())
        } else {
            Some(item)
        }
    }
}

/// An iterator over the headers and data of the members of an archive.
///
/// The symbol table member is skipped. After an error, the iterator is fused.
#[derive(Debug, Clone)]
pub struct ArchiveMemberIterator<'data> {
    cursor: Cursor<'data>,
    kind: ArchiveKind,
    done: bool,
}

impl<'data> ArchiveMemberIterator<'data> {
    /// Check the archive magic and position the iterator at the first member.
    pub fn new(data: FileSlice<'data>) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let magic = cursor.read_bytes(archive::MAGIC.len(), "Invalid archive size")?;
        if magic != archive::MAGIC {
            return Err(Error::new(
                ErrorKind::Malformed,
                data.offset(),
                "Unsupported archive identifier",
            ));
        }
        Ok(ArchiveMemberIterator {
            cursor,
            kind: ArchiveKind::Unknown,
            done: false,
        })
    }

    /// The archive format, as determined by the members read so far.
    #[inline]
    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn next_member(&mut self) -> Result<Option<(ArchiveMemberHeader<'data>, FileSlice<'data>)>> {
        while self.cursor.has_remaining() {
            let header = ArchiveMemberHeader::parse(&mut self.cursor)?;
            let data = self
                .cursor
                .read_slice(header.data_size(), "Archive member size is too large")?;
            // Entries are padded to an even number of bytes.
            if header.content_size() & 1 != 0 && self.cursor.peek() == Some(b'\n') {
                self.cursor.skip(1, "Invalid archive member padding")?;
            }
            if header.is_symbol_table() {
                self.kind = if header.name().starts_with(b"__.SYMDEF_64") {
                    ArchiveKind::Bsd64
                } else {
                    ArchiveKind::Bsd
                };
                tracing::trace!(
                    offset = header.offset(),
                    size = data.len(),
                    "skipping archive symbol table"
                );
                continue;
            }
            return Ok(Some((header, data)));
        }
        Ok(None)
    }
}

impl<'data> Iterator for ArchiveMemberIterator<'data> {
    type Item = Result<(ArchiveMemberHeader<'data>, FileSlice<'data>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_member() {
            Ok(Some(member)) => Some(Ok(member)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

/// A decoded archive member.
pub struct ArchiveMember<'data, O> {
    header: ArchiveMemberHeader<'data>,
    data: FileSlice<'data>,
    content: Result<Container<'data, O>>,
}

impl<'data, O> ArchiveMember<'data, O> {
    /// The member header.
    #[inline]
    pub fn header(&self) -> &ArchiveMemberHeader<'data> {
        &self.header
    }

    /// The member data, excluding any extended name.
    #[inline]
    pub fn data(&self) -> FileSlice<'data> {
        self.data
    }

    /// The decoded member data.
    #[inline]
    pub fn content(&self) -> core::result::Result<&Container<'data, O>, &Error> {
        self.content.as_ref()
    }
}

impl<'data, O: fmt::Debug> fmt::Debug for ArchiveMember<'data, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveMember")
            .field("name", &String::from_utf8_lossy(self.header.name()))
            .field("data", &self.data)
            .field("content", &self.content)
            .finish()
    }
}

/// A decoded archive file.
pub struct ArchiveFile<'data, O> {
    data: FileSlice<'data>,
    kind: ArchiveKind,
    members: Vec<ArchiveMember<'data, O>>,
}

impl<'data, O> ArchiveFile<'data, O> {
    /// Parse the archive and decode each member other than the symbol table.
    ///
    /// A member whose data fails to decode is kept, with the error as its
    /// content. A malformed member header aborts the whole archive.
    pub fn parse<D>(data: FileSlice<'data>, context: &DecodeContext, decoder: &D) -> Result<Self>
    where
        D: ObjectDecoder<'data, Object = O>,
    {
        let mut iter = ArchiveMemberIterator::new(data)?;
        let mut members = Vec::new();
        for member in &mut iter {
            let (header, member_data) = member?;
            let member_context = context.child(String::from_utf8_lossy(header.name()));
            tracing::debug!(
                archive = context.name(),
                member = member_context.name(),
                offset = member_data.offset(),
                size = member_data.len(),
                "decoding archive member"
            );
            let content = decode_container(member_data, &member_context, decoder);
            if let Err(error) = &content {
                tracing::warn!(member = member_context.name(), %error, "archive member failed to decode");
            }
            members.push(ArchiveMember {
                header,
                data: member_data,
                content,
            });
        }
        Ok(ArchiveFile {
            data,
            kind: iter.kind(),
            members,
        })
    }

    /// The region of the file holding the archive.
    #[inline]
    pub fn data(&self) -> FileSlice<'data> {
        self.data
    }

    /// Return the archive format.
    #[inline]
    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// The members of the archive, in file order.
    ///
    /// This does not include the symbol table member.
    #[inline]
    pub fn members(&self) -> &[ArchiveMember<'data, O>] {
        &self.members
    }
}

impl<'data, O: fmt::Debug> fmt::Debug for ArchiveFile<'data, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFile")
            .field("data", &self.data)
            .field("kind", &self.kind)
            .field("members", &self.members)
            .finish()
    }
}

// Ignores bytes starting from the first space.
fn parse_u64_digits(digits: &[u8], radix: u32) -> Option<u64> {
    if let [b' ', ..] = digits {
        return None;
    }
    let mut result: u64 = 0;
    for &c in digits {
        if c == b' ' {
            return Some(result);
        } else {
            let x = (c as char).to_digit(radix)?;
            result = result
                .checked_mul(u64::from(radix))?
                .checked_add(u64::from(x))?;
        }
    }
    Some(result)
}

// Names end at the first null, and are right-padded with spaces.
fn trim_name(name: &[u8]) -> &[u8] {
    let name = match memchr::memchr(b'\0', name) {
        Some(len) => &name[..len],
        None => name,
    };
    let len = name.iter().rposition(|&c| c != b' ').map_or(0, |last| last + 1);
    &name[..len]
}

fn text_field(field: &[u8]) -> Option<&str> {
    let text = core::str::from_utf8(trim_name(field)).ok()?;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(data: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        ArchiveMemberIterator::new(FileSlice::new(data))
            .unwrap()
            .map(|member| {
                let (header, data) = member.unwrap();
                (header.name().to_vec(), data.data().to_vec())
            })
            .collect()
    }

    #[test]
    fn bsd_names() {
        let data = b"\
            !<arch>\n\
            0123456789abcde 0           0     0     644     3         `\n\
            odd\n\
            #1/16           0           0     0     644     20        `\n\
            0123456789abcdefeven";
        assert_eq!(
            members(data),
            vec![
                (b"0123456789abcde".to_vec(), b"odd".to_vec()),
                (b"0123456789abcdef".to_vec(), b"even".to_vec()),
            ]
        );
    }

    #[test]
    fn extended_name_padding() {
        // ld64 pads extended names with nulls to keep the data aligned.
        let data = b"\
            !<arch>\n\
            #1/12           1700000000  501   20    100644  16        `\n\
            short.o\0\0\0\0\0DATA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let (header, member) = iter.next().unwrap().unwrap();
        assert_eq!(header.name(), b"short.o");
        assert_eq!(header.extended_name_len(), 12);
        assert_eq!(header.content_size(), 16);
        assert_eq!(header.data_size(), 4);
        assert_eq!(member.data(), b"DATA");
        assert_eq!(member.offset(), 8 + 60 + 12);
        assert_eq!(header.date(), Some(1_700_000_000));
        assert_eq!(header.uid(), Some(501));
        assert_eq!(header.gid(), Some(20));
        assert_eq!(header.mode(), Some(0o100644));
        assert_eq!(header.mode_text(), Some("100644"));
        assert!(iter.next().is_none());
    }

    #[test]
    fn extended_name_space_padding() {
        let data = b"\
            !<arch>\n\
            #1/12           0           0     0     644     16        `\n\
            short.o     DATA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let (header, member) = iter.next().unwrap().unwrap();
        assert_eq!(header.name(), b"short.o");
        assert_eq!(header.extended_name_len(), 12);
        assert_eq!(member.data(), b"DATA");
        assert_eq!(member.offset(), 8 + 60 + 12);
        assert!(iter.next().is_none());
    }

    #[test]
    fn header_translation() {
        let data = b"\
            !<arch>\n\
            #1/12           1700000000  501   20    100644  16        `\n\
            short.o\0\0\0\0\0DATA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let (header, _) = iter.next().unwrap().unwrap();
        assert_eq!(header.total_item_count(), 8);

        let items: Vec<TranslationItem> = header.items().collect();
        let descriptions: Vec<&str> = items.iter().map(TranslationItem::description).collect();
        assert_eq!(
            descriptions,
            [
                "File ID",
                "Modification Time",
                "Owner ID",
                "Group ID",
                "File Mode",
                "Content Size",
                "Header Terminator",
                "Extended File ID",
            ]
        );
        assert_eq!(items[0].explanation(), "#1/12");
        assert_eq!(items[1].explanation(), "1700000000");
        assert_eq!(items[4].explanation(), "100644");
        assert_eq!(items[5].explanation(), "16");
        assert_eq!(items[7].explanation(), "short.o");
        assert!(items[7].has_divider());
        assert!(!items[6].has_divider());

        // The header and extended name are covered without gaps.
        let mut end = 8;
        for item in &items {
            assert_eq!(item.source_range().start, end);
            end = item.source_range().end;
        }
        assert_eq!(end, 8 + 60 + 12);
    }

    #[test]
    fn symbol_table_skipped() {
        let data = b"\
            !<arch>\n\
            #1/20           0           0     0     644     28        `\n\
            __.SYMDEF SORTED\0\0\0\0SYMBOLS!\
            a.o             0           0     0     644     4         `\n\
            AAAA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let (header, member) = iter.next().unwrap().unwrap();
        assert_eq!(header.name(), b"a.o");
        assert_eq!(header.offset(), 8 + 60 + 28);
        assert_eq!(member.data(), b"AAAA");
        assert_eq!(iter.kind(), ArchiveKind::Bsd);
        assert!(iter.next().is_none());

        let data = b"\
            !<arch>\n\
            __.SYMDEF_64    0           0     0     644     4         `\n\
            0000";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        assert!(iter.next().is_none());
        assert_eq!(iter.kind(), ArchiveKind::Bsd64);
    }

    #[test]
    fn optional_fields() {
        let data = b"\
            !<arch>\n\
            b.o                                             2         `\n\
            BB";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let (header, _) = iter.next().unwrap().unwrap();
        assert_eq!(header.date_text(), None);
        assert_eq!(header.date(), None);
        assert_eq!(header.uid_text(), None);
        assert_eq!(header.mode(), None);
    }

    #[test]
    fn bad_terminator() {
        let data = b"\
            !<arch>\n\
            a.o             0           0     0     644     4         XX\
            AAAA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let error = iter.next().unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
        assert_eq!(error.offset(), Some(8 + 58));
        assert!(iter.next().is_none());
    }

    #[test]
    fn bad_size() {
        let data = b"\
            !<arch>\n\
            a.o             0           0     0     644     4x        `\n\
            AAAA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let error = iter.next().unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
        assert_eq!(error.offset(), Some(8 + 48));
    }

    #[test]
    fn truncated_member() {
        let data = b"\
            !<arch>\n\
            a.o             0           0     0     644     40        `\n\
            AAAA";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let error = iter.next().unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Truncated);
        assert_eq!(error.offset(), Some(8 + 60));

        let data = b"!<arch>\na.o        ";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let error = iter.next().unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Truncated);
        assert_eq!(error.offset(), Some(8));
    }

    #[test]
    fn extended_name_too_long() {
        let data = b"\
            !<arch>\n\
            #1/8            0           0     0     644     4         `\n\
            long";
        let mut iter = ArchiveMemberIterator::new(FileSlice::new(data)).unwrap();
        let error = iter.next().unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn bad_magic() {
        let error = ArchiveMemberIterator::new(FileSlice::new(b"!<thin>\n")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
        let error = ArchiveMemberIterator::new(FileSlice::new(b"!<ar")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn empty() {
        assert!(members(b"!<arch>\n").is_empty());
    }

    fn reject_a(data: FileSlice<'_>, context: &DecodeContext) -> Result<u64> {
        if context.name() == "a.o" {
            Err(Error::new(ErrorKind::Malformed, data.offset(), "Rejected"))
        } else {
            Ok(data.offset())
        }
    }

    #[test]
    fn member_failure_kept() {
        let data = b"\
            !<arch>\n\
            a.o             0           0     0     644     4         `\n\
            \xcf\xfa\xed\xfe\
            b.o             0           0     0     644     4         `\n\
            \xcf\xfa\xed\xfe\
            c.txt           0           0     0     644     4         `\n\
            text";
        let context = DecodeContext::new("lib.a");
        let archive = ArchiveFile::parse(FileSlice::new(data), &context, &reject_a).unwrap();
        assert_eq!(archive.kind(), ArchiveKind::Unknown);

        let members = archive.members();
        assert_eq!(members.len(), 3);
        let error = members[0].content().unwrap_err();
        assert_eq!(error.message(), "Rejected");
        assert_eq!(error.offset(), Some(8 + 60));
        let offset = members[1].content().unwrap().as_object();
        assert_eq!(offset, Some(&(8 + 60 + 4 + 60)));
        assert!(members[2].content().unwrap().is_unsupported());
    }

    #[test]
    fn digits() {
        assert_eq!(parse_u64_digits(b"1234      ", 10), Some(1234));
        assert_eq!(parse_u64_digits(b"      ", 10), None);
        assert_eq!(parse_u64_digits(b"644", 8), Some(0o644));
        assert_eq!(parse_u64_digits(b"9", 8), None);
        assert_eq!(parse_u64_digits(b"99999999999999999999999", 10), None);
    }
}
