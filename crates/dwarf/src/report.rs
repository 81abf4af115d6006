//! Classified diagnostic emission with category filters.
//!
//! Every message carries a [`Category`] bitmask combining a severity
//! level, optional accuracy flags, exactly one subject area, and an
//! optional error flag. Two [`Criteria`] decide, per message, whether it
//! is printed at all and whether it is rendered (and counted) as an error
//! or merely as a warning. The criteria are configured once from the
//! command-line flags and never change afterwards.

use core::fmt;
use std::io::{self, Write};

use bitflags::bitflags;

use crate::reader::{LengthError, ReadCtx};

bitflags! {
    /// Classification bits of a diagnostic message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Category: u32 {
        /// No impact on a consumer of the file.
        const IMPACT_1 = 0x1;
        /// Still no impact, but suspicious or worth mentioning.
        const IMPACT_2 = 0x2;
        /// Some impact.
        const IMPACT_3 = 0x4;
        /// High impact.
        const IMPACT_4 = 0x8;

        /// Unnecessary constructs (e.g. unreferenced strings).
        const ACC_BLOAT = 0x10;
        /// Suboptimal construct (e.g. lack of siblings).
        const ACC_SUBOPTIMAL = 0x20;

        /// Make the message into an error regardless of severity.
        const ERROR = 0x40;

        /// ULEB/SLEB storage.
        const LEB128 = 0x100;
        /// Abbreviations and abbreviation tables.
        const ABBREVS = 0x200;
        /// DIE sibling relationship.
        const DIE_SIBLING = 0x1000;
        /// DIE parent/child relationship.
        const DIE_CHILD = 0x2000;
        /// DIE relationship by reference.
        const DIE_REF = 0x4000;
        /// Other messages related to DIEs and `.debug_info` tables.
        const DIE_OTHER = 0x8000;
        /// String table.
        const STRINGS = 0x1_0000;
        /// Address ranges table.
        const ARANGES = 0x2_0000;
        /// ELF structure, e.g. missing optional sections.
        const ELF = 0x4_0000;
        /// Table of public names.
        const PUBNAMES = 0x8_0000;
        /// Messages unrelated to any of the above.
        const OTHER = 0x10_0000;

        /// All severity levels.
        const IMPACT_ALL = Self::IMPACT_1.bits()
            | Self::IMPACT_2.bits()
            | Self::IMPACT_3.bits()
            | Self::IMPACT_4.bits();
        /// All accuracy flags.
        const ACC_ALL = Self::ACC_BLOAT.bits() | Self::ACC_SUBOPTIMAL.bits();
        /// All subject areas.
        const AREA_ALL = Self::LEB128.bits()
            | Self::ABBREVS.bits()
            | Self::DIE_SIBLING.bits()
            | Self::DIE_CHILD.bits()
            | Self::DIE_REF.bits()
            | Self::DIE_OTHER.bits()
            | Self::STRINGS.bits()
            | Self::ARANGES.bits()
            | Self::ELF.bits()
            | Self::PUBNAMES.bits()
            | Self::OTHER.bits();
    }
}

/// An accept/reject mask pair over message categories.
#[derive(Debug, Clone, Copy)]
pub struct Criteria {
    /// The message category must intersect this mask.
    pub accept: Category,
    /// The message category must not intersect this mask.
    pub reject: Category,
}

impl Criteria {
    /// Default warning filter: every area except the string table.
    ///
    /// String-coverage findings are only interesting when asked for
    /// (`--strict`); everything else is on by default.
    #[must_use]
    pub fn default_warnings() -> Self {
        Self {
            accept: Category::AREA_ALL.difference(Category::STRINGS),
            reject: Category::empty(),
        }
    }

    /// Default error classification: high impact or explicitly flagged.
    #[must_use]
    pub fn default_errors() -> Self {
        Self {
            accept: Category::IMPACT_4 | Category::ERROR,
            reject: Category::empty(),
        }
    }

    /// Returns `true` if a message with category `cat` passes the filter.
    #[must_use]
    pub fn accepts(&self, cat: Category) -> bool {
        cat.intersects(self.accept) && !cat.intersects(self.reject)
    }
}

/// Location tag of a diagnostic: the enclosing section plus up to four
/// nested offsets, rendered as the message prefix. Constructed as parsing
/// descends; it is not part of the parsed data.
#[derive(Debug, Clone, Copy)]
pub enum Where {
    /// `abbrev 0x…`
    Abbrev {
        /// Offset of the abbreviation (or its table) in `.debug_abbrev`.
        abbr: u64,
    },
    /// `abbrev 0x…, attribute 0x…`
    AbbrevAttr {
        /// Offset of the abbreviation in `.debug_abbrev`.
        abbr: u64,
        /// Offset of the attribute pair in `.debug_abbrev`.
        attr: u64,
    },
    /// `.debug_info: CU 0x…`
    Cu {
        /// Offset of the CU in `.debug_info`.
        cu: u64,
    },
    /// `.debug_info: CU 0x…, DIE 0x…`
    Die {
        /// Offset of the CU in `.debug_info`.
        cu: u64,
        /// CU-relative offset of the DIE.
        die: u64,
    },
    /// `.debug_info: CU 0x…, DIE 0x…, abbrev 0x…, attribute 0x…`
    DieAttr {
        /// Offset of the CU in `.debug_info`.
        cu: u64,
        /// CU-relative offset of the DIE.
        die: u64,
        /// Code of the abbreviation governing the DIE.
        abbr: u64,
        /// Offset of the attribute pair in `.debug_abbrev`.
        attr: u64,
    },
    /// `.debug_str`
    Str,
    /// `.debug_aranges: arange table 0x…`
    ArangeTable {
        /// Offset of the table in `.debug_aranges`.
        table: u64,
    },
    /// `.debug_aranges: arange table 0x… (for CU 0x…)`
    ArangeTableCu {
        /// Offset of the table in `.debug_aranges`.
        table: u64,
        /// Offset of the referenced CU in `.debug_info`.
        cu: u64,
    },
    /// `.debug_aranges: arange table 0x… (for CU 0x…), record 0x…`
    ArangeRecord {
        /// Offset of the table in `.debug_aranges`.
        table: u64,
        /// Offset of the referenced CU in `.debug_info`.
        cu: u64,
        /// Table-relative offset of the tuple.
        record: u64,
    },
    /// `.debug_pubnames: pubname set 0x…`
    PubnameSet {
        /// Offset of the set in `.debug_pubnames`.
        set: u64,
    },
    /// `.debug_pubnames: pubname set 0x… (for CU 0x…)`
    PubnameSetCu {
        /// Offset of the set in `.debug_pubnames`.
        set: u64,
        /// Offset of the referenced CU in `.debug_info`.
        cu: u64,
    },
    /// `.debug_pubnames: pubname set 0x… (for CU 0x…), record 0x…`
    PubnameRecord {
        /// Offset of the set in `.debug_pubnames`.
        set: u64,
        /// Offset of the referenced CU in `.debug_info`.
        cu: u64,
        /// Set-relative offset of the record.
        record: u64,
    },
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Abbrev { abbr } => write!(f, "abbrev 0x{abbr:x}"),
            Self::AbbrevAttr { abbr, attr } => {
                write!(f, "abbrev 0x{abbr:x}, attribute 0x{attr:x}")
            }
            Self::Cu { cu } => write!(f, ".debug_info: CU 0x{cu:x}"),
            Self::Die { cu, die } => write!(f, ".debug_info: CU 0x{cu:x}, DIE 0x{die:x}"),
            Self::DieAttr { cu, die, abbr, attr } => write!(
                f,
                ".debug_info: CU 0x{cu:x}, DIE 0x{die:x}, abbrev 0x{abbr:x}, attribute 0x{attr:x}"
            ),
            Self::Str => write!(f, ".debug_str"),
            Self::ArangeTable { table } => {
                write!(f, ".debug_aranges: arange table 0x{table:x}")
            }
            Self::ArangeTableCu { table, cu } => write!(
                f,
                ".debug_aranges: arange table 0x{table:x} (for CU 0x{cu:x})"
            ),
            Self::ArangeRecord { table, cu, record } => write!(
                f,
                ".debug_aranges: arange table 0x{table:x} (for CU 0x{cu:x}), record 0x{record:x}"
            ),
            Self::PubnameSet { set } => write!(f, ".debug_pubnames: pubname set 0x{set:x}"),
            Self::PubnameSetCu { set, cu } => write!(
                f,
                ".debug_pubnames: pubname set 0x{set:x} (for CU 0x{cu:x})"
            ),
            Self::PubnameRecord { set, cu, record } => write!(
                f,
                ".debug_pubnames: pubname set 0x{set:x} (for CU 0x{cu:x}), record 0x{record:x}"
            ),
        }
    }
}

/// Diagnostic state for one checker run: the configured criteria, the
/// error counter, and the output sink.
#[derive(Debug)]
pub struct Reporter<W> {
    warnings: Criteria,
    errors: Criteria,
    error_count: usize,
    out: W,
}

impl Reporter<io::Stdout> {
    /// Creates a reporter printing to stdout.
    #[must_use]
    pub fn new(warnings: Criteria) -> Self {
        Self::with_sink(warnings, io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    /// Creates a reporter with an explicit output sink.
    pub fn with_sink(warnings: Criteria, out: W) -> Self {
        Self {
            warnings,
            errors: Criteria::default_errors(),
            error_count: 0,
            out,
        }
    }

    /// Number of errors emitted so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns `true` if messages with category `cat` would be emitted.
    ///
    /// Lets checkers skip work (e.g. string coverage tracking) whose
    /// findings would be filtered out anyway.
    #[must_use]
    pub fn checks(&self, cat: Category) -> bool {
        self.warnings.accepts(cat)
    }

    /// Consumes the reporter and returns the sink.
    pub fn into_sink(self) -> W {
        self.out
    }

    /// Emits an unconditional error and counts it.
    pub fn error(&mut self, msg: fmt::Arguments<'_>) {
        self.error_count += 1;
        let _ = writeln!(self.out, "error: {msg}");
    }

    /// Emits an unconditional warning. Warnings do not affect the error
    /// count or the exit code.
    pub fn warning(&mut self, msg: fmt::Arguments<'_>) {
        let _ = writeln!(self.out, "warning: {msg}");
    }

    /// Emits a classified message if the warning criteria accept it,
    /// rendered as an error or a warning per the error criteria.
    pub fn message(&mut self, cat: Category, msg: fmt::Arguments<'_>) {
        if self.warnings.accepts(cat) {
            if self.errors.accepts(cat) {
                self.error(msg);
            } else {
                self.warning(msg);
            }
        }
    }

    /// Reports an inclusive byte range of unnecessary zero padding.
    pub fn padding_zero(&mut self, cat: Category, begin: u64, end: u64, loc: &Where) {
        self.message(
            cat | Category::ACC_BLOAT | Category::IMPACT_1,
            format_args!("{loc}: 0x{begin:x}..0x{end:x}: unnecessary padding with zero bytes."),
        );
    }

    /// Reports an inclusive byte range of unreferenced non-zero content.
    pub fn padding_nonzero(&mut self, cat: Category, begin: u64, end: u64, loc: &Where) {
        self.message(
            cat | Category::ACC_BLOAT | Category::IMPACT_2,
            format_args!("{loc}: 0x{begin:x}..0x{end:x}: unreferenced non-zero bytes."),
        );
    }
}

/// Reads a ULEB128, reporting failures and unnecessarily long encodings.
///
/// Returns `None` after emitting `can't read <what>` if the value is
/// unreadable; the caller is expected to abandon the enclosing unit.
pub fn checked_read_uleb128<W: Write>(
    ctx: &mut ReadCtx<'_>,
    rep: &mut Reporter<W>,
    loc: &Where,
    what: &str,
) -> Option<u64> {
    match ctx.read_uleb128() {
        Ok((value, redundant)) => {
            if redundant {
                rep.message(
                    Category::LEB128 | Category::ACC_BLOAT | Category::IMPACT_3,
                    format_args!("{loc}: unnecessarily long encoding of {what}."),
                );
            }
            Some(value)
        }
        Err(_) => {
            rep.error(format_args!("{loc}: can't read {what}."));
            None
        }
    }
}

/// Reads an SLEB128, reporting failures and unnecessarily long encodings.
pub fn checked_read_sleb128<W: Write>(
    ctx: &mut ReadCtx<'_>,
    rep: &mut Reporter<W>,
    loc: &Where,
    what: &str,
) -> Option<i64> {
    match ctx.read_sleb128() {
        Ok((value, redundant)) => {
            if redundant {
                rep.message(
                    Category::LEB128 | Category::ACC_BLOAT | Category::IMPACT_3,
                    format_args!("{loc}: unnecessarily long encoding of {what}."),
                );
            }
            Some(value)
        }
        Err(_) => {
            rep.error(format_args!("{loc}: can't read {what}."));
            None
        }
    }
}

/// Resolves an initial-length value, reporting failures.
pub fn read_size_extra<W: Write>(
    ctx: &mut ReadCtx<'_>,
    size32: u32,
    rep: &mut Reporter<W>,
    loc: &Where,
) -> Option<(u64, bool)> {
    match ctx.read_size_extra(size32) {
        Ok(pair) => Some(pair),
        Err(LengthError::Truncated) => {
            rep.error(format_args!("{loc}: can't read 64bit CU length."));
            None
        }
        Err(LengthError::UnknownEscape(value)) => {
            rep.error(format_args!(
                "{loc}: unrecognized CU length escape value: 0x{value:x}."
            ));
            None
        }
    }
}

/// Checks that everything from the cursor to the end of the data is zero.
///
/// On success the padding is reported against `cat` and the cursor is
/// left at the end. On the first non-zero byte the cursor is restored and
/// `false` is returned so the caller can emit its own diagnostic. An
/// empty remainder trivially succeeds without a message.
pub fn check_zero_padding<W: Write>(
    ctx: &mut ReadCtx<'_>,
    cat: Category,
    rep: &mut Reporter<W>,
    loc: &Where,
) -> bool {
    let start = ctx.offset();
    if ctx.is_eof() {
        return true;
    }
    while let Ok(byte) = ctx.read_u8() {
        if byte != 0 {
            ctx.set_offset(start);
            return false;
        }
    }
    rep.padding_zero(cat, start, ctx.offset(), loc);
    true
}
