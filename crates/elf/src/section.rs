//! ELF64 section header and string table parsing.
//!
//! Provides zero-copy, zero-allocation parsing of ELF64 section headers and
//! name lookup through the section header string table (`.shstrtab`).

use crate::ElfFile;
use crate::header::{ELF64_SHDR_SIZE, Encoding, u32_at, u64_at};

/// Parsed ELF64 section header entry, reduced to the fields the DWARF
/// checker driver needs.
#[derive(Debug, Clone, Copy)]
pub struct Elf64SectionHeader {
    /// Offset into the section header string table for this section's name.
    pub sh_name: u32,
    /// Section type.
    pub sh_type: u32,
    /// File offset of the section data.
    pub sh_offset: u64,
    /// Size of the section data in bytes.
    pub sh_size: u64,
}

impl Elf64SectionHeader {
    /// Parse a section header from raw bytes at the given file offset.
    ///
    /// The caller must ensure `file_offset + ELF64_SHDR_SIZE <= data.len()`.
    pub(crate) fn parse(data: &[u8], file_offset: usize, enc: Encoding) -> Self {
        let b = &data[file_offset..];
        Self {
            sh_name: u32_at(b, 0, enc),
            sh_type: u32_at(b, 4, enc),
            // sh_flags at 8, sh_addr at 16 — skipped
            sh_offset: u64_at(b, 24, enc),
            sh_size: u64_at(b, 32, enc),
        }
    }
}

/// A zero-copy wrapper around a NUL-terminated string table section.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Creates a new string table from the raw section data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Looks up a NUL-terminated string at the given byte offset.
    ///
    /// Returns `None` if the offset is out of bounds, the string is not
    /// NUL-terminated, or it contains invalid UTF-8.
    #[must_use]
    pub fn get(&self, offset: u32) -> Option<&'a str> {
        let start = offset as usize;
        if start >= self.data.len() {
            return None;
        }
        let remaining = &self.data[start..];
        let nul_pos = remaining.iter().position(|&b| b == 0)?;
        core::str::from_utf8(&remaining[..nul_pos]).ok()
    }
}

/// An iterator over ELF64 section headers.
pub struct SectionIter<'a> {
    data: &'a [u8],
    enc: Encoding,
    shoff: usize,
    shentsize: usize,
    index: usize,
    count: usize,
}

impl Iterator for SectionIter<'_> {
    type Item = Elf64SectionHeader;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let offset = self.shoff + self.index * self.shentsize;
        if offset + ELF64_SHDR_SIZE > self.data.len() {
            return None;
        }
        let hdr = Elf64SectionHeader::parse(self.data, offset, self.enc);
        self.index += 1;
        Some(hdr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a> ElfFile<'a> {
    /// Returns an iterator over all section headers.
    ///
    /// Returns an empty iterator if the ELF has no sections (`e_shnum == 0`).
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "ELF fields are u32/u64, truncation checked by format"
    )]
    pub fn sections(&self) -> SectionIter<'a> {
        let hdr = self.header();
        SectionIter {
            data: self.raw_data(),
            enc: hdr.encoding,
            shoff: hdr.e_shoff as usize,
            shentsize: hdr.e_shentsize as usize,
            index: 0,
            count: hdr.e_shnum as usize,
        }
    }

    /// Finds a section by name, looking up names in the section header string table.
    #[must_use]
    pub fn find_section_by_name(&self, name: &str) -> Option<Elf64SectionHeader> {
        let shstrtab = self.section_header_strtab()?;
        self.sections()
            .find(|s| shstrtab.get(s.sh_name) == Some(name))
    }

    /// Returns the raw data slice for a given section header.
    ///
    /// Returns `None` if the section data is out of bounds.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "ELF fields are u32/u64, truncation checked by format"
    )]
    pub fn section_data(&self, shdr: &Elf64SectionHeader) -> Option<&'a [u8]> {
        let start = shdr.sh_offset as usize;
        let size = shdr.sh_size as usize;
        let data = self.raw_data();
        if start.checked_add(size)? > data.len() {
            return None;
        }
        Some(&data[start..start + size])
    }

    /// Returns the section header at the given 0-based index.
    ///
    /// Returns `None` if the index is out of range or the section header
    /// is out of bounds in the file.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "ELF fields are u32/u64, truncation checked by format"
    )]
    pub fn section_by_index(&self, index: usize) -> Option<Elf64SectionHeader> {
        let hdr = self.header();
        if index >= hdr.e_shnum as usize {
            return None;
        }
        let offset = hdr.e_shoff as usize + index * hdr.e_shentsize as usize;
        let data = self.raw_data();
        if offset + ELF64_SHDR_SIZE > data.len() {
            return None;
        }
        Some(Elf64SectionHeader::parse(data, offset, hdr.encoding))
    }

    /// Returns the section header string table (`.shstrtab`).
    fn section_header_strtab(&self) -> Option<StringTable<'a>> {
        let hdr = self.header();
        if hdr.e_shstrndx == 0 || hdr.e_shstrndx >= hdr.e_shnum {
            return None;
        }
        let shdr = self.section_by_index(hdr.e_shstrndx as usize)?;
        let strtab_data = self.section_data(&shdr)?;
        Some(StringTable::new(strtab_data))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
