//! `.debug_aranges` structural checking.
//!
//! The section is a sequence of length-prefixed tables, each tying a run
//! of `(address, length)` tuples to one compilation unit. Tuples must
//! start at an offset that is a multiple of twice the address size; the
//! header is padded up to that boundary, and the pad bytes are expected
//! to be zero. A `(0, 0)` tuple terminates the table.

use std::io::Write;

use crate::info::{CompilationUnit, find_cu};
use crate::reader::ReadCtx;
use crate::report::{Category, Reporter, Where, check_zero_padding, read_size_extra};

/// Checks the `.debug_aranges` section.
///
/// A damaged table is abandoned individually; parsing resumes at the
/// next length-prefixed table. `cus` is `None` when `.debug_info` was
/// not soundly parsed, in which case CU cross-checks are skipped.
pub fn check_aranges<W: Write>(
    ctx: &mut ReadCtx<'_>,
    cus: Option<&[CompilationUnit]>,
    rep: &mut Reporter<W>,
) -> bool {
    let mut sound = true;

    while !ctx.is_eof() {
        let table_off = ctx.offset();
        let loc = Where::ArangeTable { table: table_off };

        let Ok(size32) = ctx.read_u32() else {
            rep.error(format_args!("{loc}: can't read unit length."));
            return false;
        };
        let Some((size, dwarf64)) = read_size_extra(ctx, size32, rep, &loc) else {
            return false;
        };
        if (ctx.remaining() as u64) < size {
            rep.error(format_args!(
                "{loc}: section doesn't have enough data to read table of size 0x{size:x}."
            ));
            ctx.seek_to_end();
            return false;
        }
        let table_end = ctx.offset() + size;

        let mut sub = ctx.sub(table_off, table_end);
        if !check_table(&mut sub, table_off, dwarf64, cus, rep) {
            sound = false;
        }
        ctx.set_offset(table_end);
    }

    sound
}

/// Checks one aranges table; `sub` is bounded to it.
fn check_table<W: Write>(
    sub: &mut ReadCtx<'_>,
    table_off: u64,
    dwarf64: bool,
    cus: Option<&[CompilationUnit]>,
    rep: &mut Reporter<W>,
) -> bool {
    let loc = Where::ArangeTable { table: table_off };

    // Version
    let Ok(version) = sub.read_u16() else {
        rep.error(format_args!("{loc}: can't read version."));
        return false;
    };
    if version != 2 {
        rep.error(format_args!("{loc}: unsupported version {version}."));
        return false;
    }

    // CU offset
    let Ok(cu_off) = sub.read_offset(dwarf64) else {
        rep.error(format_args!("{loc}: can't read debug info offset."));
        return false;
    };
    if let Some(cus) = cus {
        if find_cu(cus, cu_off).is_none() {
            rep.error(format_args!("{loc}: unresolved reference to CU 0x{cu_off:x}."));
        }
    }
    let cloc = Where::ArangeTableCu {
        table: table_off,
        cu: cu_off,
    };

    // Address size
    let Ok(address_size) = sub.read_u8() else {
        rep.error(format_args!("{cloc}: can't read unit address size."));
        return false;
    };
    if !matches!(address_size, 2 | 4 | 8) {
        rep.error(format_args!("{cloc}: invalid address size: {address_size}."));
        return false;
    }

    // Segment size
    let Ok(segment_size) = sub.read_u8() else {
        rep.error(format_args!("{cloc}: can't read unit segment size."));
        return false;
    };
    if segment_size != 0 {
        rep.warning(format_args!(
            "{cloc}: can't handle segment_size {segment_size}."
        ));
        return false;
    }

    // The first tuple must begin at an offset that is a multiple of the
    // tuple size, i.e. twice the address size; the header is padded to
    // that boundary.
    let tuple_size = u64::from(2 * address_size);
    let header_end = sub.offset();
    if header_end % tuple_size != 0 {
        let aligned = (header_end / tuple_size + 1) * tuple_size;
        for _ in header_end..aligned {
            let pad_off = sub.offset();
            let Ok(byte) = sub.read_u8() else {
                rep.error(format_args!(
                    "{cloc}: section ends after the header, but before the first entry."
                ));
                return false;
            };
            if byte != 0 {
                rep.message(
                    Category::IMPACT_2 | Category::ARANGES,
                    format_args!(
                        "{cloc}: non-zero byte at 0x{pad_off:x} in padding before the first entry."
                    ),
                );
            }
        }
    }

    // Tuples, up to the (0, 0) terminator
    let mut terminated = false;
    while !sub.is_eof() {
        let tuple_off = sub.offset();
        let rloc = Where::ArangeRecord {
            table: table_off,
            cu: cu_off,
            record: tuple_off,
        };
        let Ok(address) = sub.read_var(address_size) else {
            rep.error(format_args!("{rloc}: can't read address field."));
            return false;
        };
        let Ok(length) = sub.read_var(address_size) else {
            rep.error(format_args!("{rloc}: can't read length field."));
            return false;
        };
        if address == 0 && length == 0 {
            terminated = true;
            break;
        }
        // Address and length themselves are checked at a higher level.
    }
    if !terminated {
        rep.error(format_args!("{cloc}: table is not terminated with a zero tuple."));
        return false;
    }

    // Anything after the terminator must be zero padding
    if !sub.is_eof() && !check_zero_padding(sub, Category::ARANGES, rep, &cloc) {
        rep.padding_nonzero(
            Category::ARANGES | Category::ERROR,
            sub.offset(),
            sub.size(),
            &cloc,
        );
        return false;
    }

    true
}
