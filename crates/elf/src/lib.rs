//! Minimal ELF64 section reader for the muon DWARF checker.
//!
//! Parses the ELF64 file header and section header table from raw byte
//! slices using safe field extraction, and exposes section lookup by name
//! through `.shstrtab`. Both little- and big-endian objects are supported;
//! the detected [`Encoding`] is what downstream DWARF decoding keys its
//! integer reads on.
//!
//! # Usage
//!
//! ```
//! use muon_elf::ElfFile;
//!
//! fn load_debug_info(data: &[u8]) {
//!     let elf = ElfFile::parse(data).expect("valid ELF");
//!     if let Some(shdr) = elf.find_section_by_name(".debug_info") {
//!         let bytes = elf.section_data(&shdr);
//!         // hand bytes to the checker
//!         let _ = bytes;
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod header;
pub mod section;

pub use header::{Elf64Header, ElfError, Encoding};
pub use section::{Elf64SectionHeader, SectionIter, StringTable};

/// A parsed ELF file, wrapping the raw bytes and the validated header.
#[derive(Debug, Clone, Copy)]
pub struct ElfFile<'a> {
    data: &'a [u8],
    header: Elf64Header,
}

impl<'a> ElfFile<'a> {
    /// Parses and validates the ELF64 file header.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if the data is not a well-formed ELF64 image.
    pub fn parse(data: &'a [u8]) -> Result<Self, ElfError> {
        let header = Elf64Header::parse(data)?;
        Ok(Self { data, header })
    }

    /// Returns the parsed file header.
    #[must_use]
    pub fn header(&self) -> &Elf64Header {
        &self.header
    }

    /// Returns `true` if the object is little-endian.
    #[must_use]
    pub fn is_little_endian(&self) -> bool {
        self.header.encoding == Encoding::Little
    }

    /// Returns the underlying raw ELF data.
    #[must_use]
    pub fn raw_data(&self) -> &'a [u8] {
        self.data
    }
}
