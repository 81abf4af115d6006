//! `.debug_pubnames` structural checking.
//!
//! The section is a sequence of length-prefixed sets. Each set names one
//! compilation unit, restates that CU's length, and lists pairs of a
//! CU-relative DIE offset and a NUL-terminated name. An offset field of
//! zero terminates the set.

use std::io::Write;

use crate::info::{CompilationUnit, find_cu};
use crate::reader::ReadCtx;
use crate::report::{Category, Reporter, Where, check_zero_padding, read_size_extra};

/// Checks the `.debug_pubnames` section.
///
/// A damaged set is abandoned individually; parsing resumes at the next
/// length-prefixed set. `cus` is `None` when `.debug_info` was not
/// soundly parsed, in which case CU cross-checks are skipped.
pub fn check_pubnames<W: Write>(
    ctx: &mut ReadCtx<'_>,
    cus: Option<&[CompilationUnit]>,
    rep: &mut Reporter<W>,
) -> bool {
    let mut sound = true;

    while !ctx.is_eof() {
        let set_off = ctx.offset();
        let loc = Where::PubnameSet { set: set_off };

        let Ok(size32) = ctx.read_u32() else {
            rep.error(format_args!("{loc}: can't read set length."));
            return false;
        };
        let Some((size, dwarf64)) = read_size_extra(ctx, size32, rep, &loc) else {
            return false;
        };
        if (ctx.remaining() as u64) < size {
            rep.error(format_args!(
                "{loc}: section doesn't have enough data to read set of size 0x{size:x}."
            ));
            ctx.seek_to_end();
            return false;
        }
        let set_end = ctx.offset() + size;

        let mut sub = ctx.sub(set_off, set_end);
        if !check_set(&mut sub, set_off, dwarf64, cus, rep) {
            sound = false;
        }
        ctx.set_offset(set_end);
    }

    sound
}

/// Checks one pubnames set; `sub` is bounded to it.
fn check_set<W: Write>(
    sub: &mut ReadCtx<'_>,
    set_off: u64,
    dwarf64: bool,
    cus: Option<&[CompilationUnit]>,
    rep: &mut Reporter<W>,
) -> bool {
    let loc = Where::PubnameSet { set: set_off };

    // Version; nothing is keyed on it structurally.
    if sub.read_u16().is_err() {
        rep.error(format_args!("{loc}: can't read set version."));
        return false;
    }

    // CU offset
    let Ok(cu_off) = sub.read_offset(dwarf64) else {
        rep.error(format_args!("{loc}: can't read debug info offset."));
        return false;
    };
    let cu = cus.and_then(|cus| find_cu(cus, cu_off));
    if cus.is_some() && cu.is_none() {
        rep.error(format_args!("{loc}: unresolved reference to CU 0x{cu_off:x}."));
        return false;
    }
    let cloc = Where::PubnameSetCu {
        set: set_off,
        cu: cu_off,
    };

    // Covered length: must restate the CU's length
    let Ok(cu_len) = sub.read_offset(dwarf64) else {
        rep.error(format_args!("{cloc}: can't read covered length."));
        return false;
    };
    if let Some(cu) = cu {
        if cu_len != cu.length {
            rep.error(format_args!(
                "{cloc}: the set covers length {cu_len} but CU has length {}.",
                cu.length
            ));
            return false;
        }
    }

    // Offset/name pairs, terminated by a zero offset
    while !sub.is_eof() {
        let pair_off = sub.offset();
        let rloc = Where::PubnameRecord {
            set: set_off,
            cu: cu_off,
            record: pair_off,
        };
        let Ok(offset) = sub.read_offset(dwarf64) else {
            rep.error(format_args!("{rloc}: can't read offset field."));
            return false;
        };
        if offset == 0 {
            break;
        }

        // The offset is CU-relative; rebased, it must name a DIE.
        if let Some(cu) = cu {
            if !cu.die_addrs.contains(offset + cu.offset) {
                rep.error(format_args!("{rloc}: unresolved reference to DIE 0x{offset:x}."));
                return false;
            }
        }

        if sub.skip_cstr().is_err() {
            rep.error(format_args!("{rloc}: can't read symbol name."));
            return false;
        }
    }

    // Anything after the terminator must be zero padding
    if !sub.is_eof() && !check_zero_padding(sub, Category::PUBNAMES, rep, &loc) {
        rep.padding_nonzero(
            Category::PUBNAMES | Category::ERROR,
            sub.offset(),
            sub.size(),
            &loc,
        );
        return false;
    }

    true
}
