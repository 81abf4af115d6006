//! Pedantic structural checking of DWARF debugging information.
//!
//! Given the raw images of the DWARF sections of one object file, this
//! crate parses the abbreviation tables, walks the compilation-unit /
//! DIE tree, and cross-checks the address-ranges and public-names
//! tables against it, reporting structural anomalies with precise
//! offsets — from outright corruption (unreadable length fields,
//! dangling references) down to style-level concerns (zero-padded
//! LEB128 encodings, excessive sibling attributes, unused
//! abbreviations, unreferenced strings).
//!
//! Pipeline: load `.debug_abbrev` tables → walk `.debug_info` CUs
//! (which cannot be parsed without them) → resolve references →
//! cross-check `.debug_aranges` and `.debug_pubnames` → enumerate
//! `.debug_str` coverage holes.
//!
//! The section loader is not part of this crate: the caller hands in
//! one byte slice per section plus the object's byte order, and a
//! [`report::Reporter`] that collects the findings.

pub mod abbrev;
pub mod aranges;
pub mod consts;
pub mod coverage;
pub mod info;
pub mod pubnames;
pub mod reader;
pub mod records;
pub mod report;

use std::io::Write;

use reader::{ByteOrder, ReadCtx};
use report::{Category, Reporter};

/// The DWARF section images of one object file.
///
/// Sections an object does not carry are `None`; the checker reports
/// their absence per the missing-section policy.
#[derive(Debug, Clone, Copy)]
pub struct Sections<'a> {
    /// Byte order of the object file.
    pub order: ByteOrder,
    /// `.debug_abbrev` image.
    pub abbrev: Option<&'a [u8]>,
    /// `.debug_info` image.
    pub info: Option<&'a [u8]>,
    /// `.debug_str` image.
    pub strings: Option<&'a [u8]>,
    /// `.debug_aranges` image.
    pub aranges: Option<&'a [u8]>,
    /// `.debug_pubnames` image.
    pub pubnames: Option<&'a [u8]>,
}

impl Sections<'_> {
    /// Returns `true` if the object carries any DWARF section at all.
    #[must_use]
    pub fn has_dwarf(&self) -> bool {
        self.abbrev.is_some()
            || self.info.is_some()
            || self.strings.is_some()
            || self.aranges.is_some()
            || self.pubnames.is_some()
    }
}

/// Runs every structural check over the given sections.
///
/// `.debug_abbrev`, `.debug_info` and `.debug_str` are load-bearing:
/// without them the dependent checks cannot run, which is an error
/// unless `tolerate_nodebug` is set. A missing `.debug_aranges` or
/// `.debug_pubnames` is merely reported.
pub fn check_sections<W: Write>(
    sections: &Sections<'_>,
    tolerate_nodebug: bool,
    rep: &mut Reporter<W>,
) {
    let mut tables = match sections.abbrev {
        Some(data) => abbrev::load_tables(&mut ReadCtx::new(data, sections.order), rep),
        None => {
            if !tolerate_nodebug {
                rep.error(format_args!(".debug_abbrev data not found."));
            }
            None
        }
    };

    let mut cus = None;
    if let Some(tables) = tables.as_mut() {
        match (sections.info, sections.strings) {
            (Some(info), Some(strings)) => {
                cus = info::check_info(
                    &mut ReadCtx::new(info, sections.order),
                    tables,
                    strings,
                    rep,
                );
            }
            _ => {
                if !tolerate_nodebug {
                    rep.error(format_args!(".debug_info or .debug_str data not found."));
                }
            }
        }
    }

    match sections.aranges {
        Some(data) => {
            aranges::check_aranges(
                &mut ReadCtx::new(data, sections.order),
                cus.as_deref(),
                rep,
            );
        }
        None => rep.message(
            Category::IMPACT_4 | Category::ACC_SUBOPTIMAL | Category::ELF,
            format_args!(".debug_aranges data not found."),
        ),
    }

    match sections.pubnames {
        Some(data) => {
            pubnames::check_pubnames(
                &mut ReadCtx::new(data, sections.order),
                cus.as_deref(),
                rep,
            );
        }
        None => rep.message(
            Category::IMPACT_4 | Category::ACC_SUBOPTIMAL | Category::ELF,
            format_args!(".debug_pubnames data not found."),
        ),
    }
}
