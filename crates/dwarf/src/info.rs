//! `.debug_info` structural checking.
//!
//! Walks every compilation unit and its DIE chain, interpreting attribute
//! values according to the abbreviation tables. Along the way it records
//! where DIEs begin and which DIEs reference which, so that CU-local
//! references can be resolved as each CU finishes and global references
//! once the whole section has been read. `DW_FORM_strp` attributes feed
//! the `.debug_str` coverage map, whose holes are reported at the end.

use std::io::Write;

use crate::abbrev::{AbbrevTable, SiblingForm, check_sibling_form};
use crate::consts::{
    DW_AT_SIBLING, DW_FORM_ADDR, DW_FORM_BLOCK, DW_FORM_BLOCK1, DW_FORM_BLOCK2, DW_FORM_BLOCK4,
    DW_FORM_DATA1, DW_FORM_DATA2, DW_FORM_DATA4, DW_FORM_DATA8, DW_FORM_FLAG, DW_FORM_INDIRECT,
    DW_FORM_REF_ADDR, DW_FORM_REF_UDATA, DW_FORM_REF1, DW_FORM_REF2, DW_FORM_REF4, DW_FORM_REF8,
    DW_FORM_SDATA, DW_FORM_STRING, DW_FORM_STRP, DW_FORM_UDATA, attrib_form_valid, form_name,
};
use crate::coverage::Coverage;
use crate::reader::ReadCtx;
use crate::records::{AddrRecord, RefRecord};
use crate::report::{
    Category, Reporter, Where, check_zero_padding, checked_read_sleb128, checked_read_uleb128,
    read_size_extra,
};

/// One compilation unit as seen by the structural checks.
#[derive(Debug)]
pub struct CompilationUnit {
    /// Offset of the CU in `.debug_info`.
    pub offset: u64,
    /// Byte length of the CU including the length prefix itself.
    pub length: u64,
    /// Section-absolute offsets at which DIEs begin in this CU.
    pub die_addrs: AddrRecord,
    /// Global (`DW_FORM_ref_addr`) references emitted by this CU.
    pub die_refs: RefRecord,
}

/// Finds the CU anchored at exactly `offset`.
#[must_use]
pub fn find_cu(cus: &[CompilationUnit], offset: u64) -> Option<&CompilationUnit> {
    cus.iter().find(|cu| cu.offset == offset)
}

/// Checks the `.debug_info` section against the loaded abbreviation
/// tables, returning the CU records for the aranges/pubnames checkers.
///
/// Returns `None` if the section (or any reference in it) was unsound;
/// dependent checkers then skip their CU cross-checks.
pub fn check_info<W: Write>(
    ctx: &mut ReadCtx<'_>,
    tables: &mut [AbbrevTable],
    strings: &[u8],
    rep: &mut Reporter<W>,
) -> Option<Vec<CompilationUnit>> {
    let mut cus: Vec<CompilationUnit> = Vec::new();
    let mut success = true;

    // Tracking which bytes of .debug_str are referenced is pointless when
    // the findings would be filtered out anyway.
    let mut strings_coverage = if rep.checks(Category::STRINGS) {
        Some(Coverage::new(strings.len() as u64))
    } else {
        None
    };

    while !ctx.is_eof() {
        let cu_off = ctx.offset();
        let loc = Where::Cu { cu: cu_off };

        // Reading the CU header is a bit tricky: we don't know yet if we
        // have run into (superfluous but allowed) zero padding.
        if ctx.remaining() < 4 && check_zero_padding(ctx, Category::DIE_OTHER, rep, &loc) {
            break;
        }
        let Ok(size32) = ctx.read_u32() else {
            rep.error(format_args!("{loc}: can't read CU length."));
            success = false;
            break;
        };
        if size32 == 0 && check_zero_padding(ctx, Category::DIE_OTHER, rep, &loc) {
            break;
        }
        let Some((size, dwarf64)) = read_size_extra(ctx, size32, rep, &loc) else {
            success = false;
            break;
        };
        if (ctx.remaining() as u64) < size {
            rep.error(format_args!(
                "{loc}: section doesn't have enough data to read CU of size 0x{size:x}."
            ));
            ctx.seek_to_end();
            success = false;
            break;
        }
        let cu_end = ctx.offset() + size;

        let mut cu = CompilationUnit {
            offset: cu_off,
            length: cu_end - cu_off,
            die_addrs: AddrRecord::default(),
            die_refs: RefRecord::default(),
        };

        // version + debug_abbrev_offset + address_size
        let header_size = 2 + if dwarf64 { 8 } else { 4 } + 1;
        if size < header_size {
            rep.error(format_args!(
                "{loc}: claimed length of 0x{size:x} doesn't even cover CU header."
            ));
            success = false;
        } else {
            // The CU context begins just before the CU length, so DIE
            // offsets come out CU-relative.
            let mut cu_ctx = ctx.sub(cu_off, cu_end);
            if check_cu(
                &mut cu_ctx,
                &mut cu,
                tables,
                strings,
                dwarf64,
                strings_coverage.as_mut(),
                rep,
            ) {
                if !cu_ctx.is_eof()
                    && !check_zero_padding(&mut cu_ctx, Category::DIE_OTHER, rep, &loc)
                {
                    rep.padding_nonzero(Category::DIE_OTHER, cu_ctx.offset(), cu.length, &loc);
                }
            } else {
                // Fatal for this CU only; the next one begins at a known
                // offset, so keep going.
                success = false;
            }
            cus.push(cu);
        }

        ctx.set_offset(cu_end);
    }

    if success && !ctx.is_eof() {
        rep.message(
            Category::DIE_OTHER | Category::IMPACT_4,
            format_args!(".debug_info: CU lengths don't exactly match the section contents."),
        );
    }

    for table in tables.iter() {
        if !table.used {
            rep.message(
                Category::IMPACT_3 | Category::ACC_BLOAT | Category::ABBREVS,
                format_args!(
                    "abbrev 0x{:x}: abbreviation table is never used.",
                    table.offset
                ),
            );
        }
    }

    let references_sound = check_global_die_references(&cus, rep);

    if let Some(cov) = &strings_coverage {
        if success {
            cov.find_holes(|begin, end| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "hole bounds come from the section size"
                )]
                let all_zeroes = strings[begin as usize..=end as usize]
                    .iter()
                    .all(|&b| b == 0);
                if all_zeroes {
                    rep.padding_zero(Category::STRINGS, begin, end, &Where::Str);
                } else {
                    rep.padding_nonzero(Category::STRINGS, begin, end, &Where::Str);
                }
            });
        }
    }

    if success && references_sound {
        Some(cus)
    } else {
        None
    }
}

/// Checks one CU: header fields, the DIE chain, local reference
/// resolution, and the used-abbreviation audit.
fn check_cu<W: Write>(
    ctx: &mut ReadCtx<'_>,
    cu: &mut CompilationUnit,
    tables: &mut [AbbrevTable],
    strings: &[u8],
    dwarf64: bool,
    strings_coverage: Option<&mut Coverage>,
    rep: &mut Reporter<W>,
) -> bool {
    let loc = Where::Cu { cu: cu.offset };

    if read_cu_version(ctx, dwarf64, &loc, rep).is_none() {
        return false;
    }

    let Ok(abbrev_offset) = ctx.read_offset(dwarf64) else {
        rep.error(format_args!("{loc}: can't read abbrev offset."));
        return false;
    };

    let Ok(address_size) = ctx.read_u8() else {
        rep.error(format_args!("{loc}: can't read address size."));
        return false;
    };
    if address_size != 4 && address_size != 8 {
        rep.error(format_args!(
            "{loc}: invalid address size: {address_size} (only 4 or 8 allowed)."
        ));
        return false;
    }

    let Some(table_index) = tables.iter().position(|t| t.offset == abbrev_offset) else {
        rep.error(format_args!(
            "{loc}: couldn't find abbrev section with offset 0x{abbrev_offset:x}."
        ));
        return false;
    };
    let table = &mut tables[table_index];
    table.used = true;

    let mut die_loc_refs = RefRecord::default();
    let chain = read_die_chain(
        ctx,
        cu,
        table,
        strings,
        dwarf64,
        address_size == 8,
        &mut die_loc_refs,
        strings_coverage,
        rep,
    );

    match chain {
        Err(CuFatal) => false,
        Ok(_) => {
            for ab in &table.abbrevs {
                if !ab.used {
                    rep.message(
                        Category::IMPACT_3 | Category::ACC_BLOAT | Category::ABBREVS,
                        format_args!("{loc}: Abbreviation with code {} is never used.", ab.code),
                    );
                }
            }
            check_die_references(cu, &die_loc_refs, rep)
        }
    }
}

/// Reads and validates a CU header version field.
///
/// A 64-bit unit claiming DWARF 2 is a standard violation but still
/// readable, so it is reported without aborting the CU.
fn read_cu_version<W: Write>(
    ctx: &mut ReadCtx<'_>,
    dwarf64: bool,
    loc: &Where,
    rep: &mut Reporter<W>,
) -> Option<u16> {
    let Ok(version) = ctx.read_u16() else {
        rep.error(format_args!("{loc}: can't read version."));
        return None;
    };
    if version < 2 {
        rep.error(format_args!("{loc}: invalid version {version}."));
        return None;
    }
    if version > 3 {
        rep.error(format_args!("{loc}: unsupported version {version}."));
        return None;
    }
    if version == 2 && dwarf64 {
        rep.error(format_args!("{loc}: invalid 64-bit unit in DWARF 2 format."));
    }
    Some(version)
}

/// Marker for an error that abandons the current CU.
struct CuFatal;

/// Records a DIE-to-DIE reference.
///
/// CU-local references are validated against the CU length and rebased to
/// section-absolute offsets; out-of-range ones are diagnosed and dropped.
fn record_ref<W: Write>(
    cu: &mut CompilationUnit,
    die_loc_refs: &mut RefRecord,
    addr: u64,
    who: u64,
    local: bool,
    loc: &Where,
    rep: &mut Reporter<W>,
) {
    if local {
        if addr > cu.length {
            rep.error(format_args!(
                "{loc}: invalid reference outside the CU: 0x{addr:x}."
            ));
            return;
        }
        die_loc_refs.add(addr + cu.offset, who);
    } else {
        cu.die_refs.add(addr, who);
    }
}

/// Walks one DIE chain (one nesting level) recursively.
///
/// Returns whether any DIE was read; `Err(CuFatal)` abandons the CU.
#[expect(
    clippy::too_many_arguments,
    clippy::too_many_lines,
    reason = "the walker threads the whole per-CU parse state"
)]
fn read_die_chain<W: Write>(
    ctx: &mut ReadCtx<'_>,
    cu: &mut CompilationUnit,
    table: &mut AbbrevTable,
    strings: &[u8],
    dwarf64: bool,
    addr64: bool,
    die_loc_refs: &mut RefRecord,
    mut strings_coverage: Option<&mut Coverage>,
    rep: &mut Reporter<W>,
) -> Result<bool, CuFatal> {
    let chain_begin = ctx.offset();
    let mut got_die = false;
    let mut sibling_addr = 0u64;
    let mut prev_die_off = 0u64;
    let mut prev_had_children = false;

    while !ctx.is_eof() {
        let die_off = ctx.offset();
        let dloc = Where::Die {
            cu: cu.offset,
            die: die_off,
        };
        let Some(abbr_code) = checked_read_uleb128(ctx, rep, &dloc, "abbrev code") else {
            return Err(CuFatal);
        };

        // A zero code terminates this chain.
        if abbr_code == 0 {
            if sibling_addr != 0 {
                rep.error(format_args!(
                    "{}: is the last sibling in chain, but has a DW_AT_sibling attribute.",
                    Where::Die {
                        cu: cu.offset,
                        die: prev_die_off
                    }
                ));
            }
            return Ok(got_die);
        }

        // Check the sibling value advertised last time through the loop.
        if sibling_addr != 0 {
            if sibling_addr != die_off {
                rep.error(format_args!(
                    "{}: This DIE should have had its sibling at 0x{sibling_addr:x}, \
                     but it's at 0x{die_off:x} instead.",
                    Where::Die {
                        cu: cu.offset,
                        die: prev_die_off
                    }
                ));
            }
            sibling_addr = 0;
        } else if prev_had_children {
            // A DIE with children should advertise where its sibling
            // starts; consumers otherwise have to walk the whole subtree.
            rep.message(
                Category::DIE_SIBLING | Category::ACC_SUBOPTIMAL | Category::IMPACT_4,
                format_args!(
                    "{}: This DIE had children, but no DW_AT_sibling attribute.",
                    Where::Die {
                        cu: cu.offset,
                        die: prev_die_off
                    }
                ),
            );
        }

        if ctx.is_eof() {
            rep.error(format_args!(
                "{}: DIE chain at 0x{chain_begin:x} not terminated with DIE with zero abbrev code.",
                Where::Cu { cu: cu.offset }
            ));
            break;
        }

        got_die = true;

        let Some(abbrev_index) = table.find(abbr_code) else {
            rep.error(format_args!(
                "{dloc}: abbrev section at 0x{:x} doesn't contain code {abbr_code}.",
                table.offset
            ));
            return Err(CuFatal);
        };
        table.abbrevs[abbrev_index].used = true;
        let has_children = table.abbrevs[abbrev_index].has_children;

        cu.die_addrs.add(cu.offset + die_off);

        for attr_index in 0..table.abbrevs[abbrev_index].attribs.len() {
            let it = table.abbrevs[abbrev_index].attribs[attr_index];
            let aloc = Where::DieAttr {
                cu: cu.offset,
                die: die_off,
                abbr: abbr_code,
                attr: it.offset,
            };

            let mut form = it.form;
            if form == DW_FORM_INDIRECT {
                let Some(value) =
                    checked_read_uleb128(ctx, rep, &aloc, "indirect attribute form")
                else {
                    return Err(CuFatal);
                };
                if !attrib_form_valid(value) {
                    rep.error(format_args!("{aloc}: invalid indirect form 0x{value:x}."));
                    return Err(CuFatal);
                }
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "the form was just bounds-checked"
                )]
                {
                    form = value as u8;
                }

                if it.name == DW_AT_SIBLING {
                    match check_sibling_form(form) {
                        SiblingForm::Ok => {}
                        SiblingForm::RefAddr => rep.message(
                            Category::DIE_SIBLING | Category::IMPACT_2,
                            format_args!(
                                "{aloc}: DW_AT_sibling attribute with (indirect) form \
                                 DW_FORM_ref_addr."
                            ),
                        ),
                        SiblingForm::NonReference => rep.error(format_args!(
                            "{aloc}: DW_AT_sibling attribute with non-reference (indirect) \
                             form {}.",
                            form_name(form)
                        )),
                    }
                }
            }

            match form {
                DW_FORM_STRP => {
                    let Ok(addr) = ctx.read_offset(dwarf64) else {
                        rep.error(format_args!("{aloc}: can't read attribute value."));
                        return Err(CuFatal);
                    };
                    if addr >= strings.len() as u64 {
                        rep.error(format_args!(
                            "{aloc}: invalid offset outside .debug_str: 0x{addr:x}."
                        ));
                    } else if let Some(cov) = strings_coverage.as_deref_mut() {
                        // Record the used part of .debug_str, including
                        // the NUL terminator.
                        #[expect(
                            clippy::cast_possible_truncation,
                            reason = "addr was just checked against the section size"
                        )]
                        let start = addr as usize;
                        let len = strings[start..]
                            .iter()
                            .position(|&b| b == 0)
                            .unwrap_or(strings.len() - start);
                        cov.add(addr, addr + len as u64);
                    }
                }

                DW_FORM_STRING => {
                    if ctx.skip_cstr().is_err() {
                        rep.error(format_args!("{aloc}: can't read attribute value."));
                        return Err(CuFatal);
                    }
                }

                DW_FORM_ADDR => {
                    let width = if addr64 { 8 } else { 4 };
                    if ctx.read_var(width).is_err() {
                        rep.error(format_args!("{aloc}: can't read attribute value."));
                        return Err(CuFatal);
                    }
                    // No validity criteria for a bare address.
                }

                DW_FORM_REF_ADDR => {
                    let Ok(addr) = ctx.read_offset(dwarf64) else {
                        rep.error(format_args!("{aloc}: can't read attribute value."));
                        return Err(CuFatal);
                    };
                    record_ref(cu, die_loc_refs, addr, die_off, false, &aloc, rep);
                }

                DW_FORM_UDATA | DW_FORM_REF_UDATA => {
                    let Some(value) = checked_read_uleb128(ctx, rep, &aloc, "attribute value")
                    else {
                        return Err(CuFatal);
                    };
                    if it.name == DW_AT_SIBLING {
                        sibling_addr = value;
                    } else if form == DW_FORM_REF_UDATA {
                        record_ref(cu, die_loc_refs, value, die_off, true, &aloc, rep);
                    }
                }

                DW_FORM_FLAG | DW_FORM_DATA1 | DW_FORM_REF1 | DW_FORM_DATA2 | DW_FORM_REF2
                | DW_FORM_DATA4 | DW_FORM_REF4 | DW_FORM_DATA8 | DW_FORM_REF8 => {
                    let width = match form {
                        DW_FORM_FLAG | DW_FORM_DATA1 | DW_FORM_REF1 => 1,
                        DW_FORM_DATA2 | DW_FORM_REF2 => 2,
                        DW_FORM_DATA4 | DW_FORM_REF4 => 4,
                        _ => 8,
                    };
                    let Ok(value) = ctx.read_var(width) else {
                        rep.error(format_args!("{aloc}: can't read attribute value."));
                        return Err(CuFatal);
                    };
                    if it.name == DW_AT_SIBLING {
                        sibling_addr = value;
                    } else if matches!(
                        form,
                        DW_FORM_REF1 | DW_FORM_REF2 | DW_FORM_REF4 | DW_FORM_REF8
                    ) {
                        record_ref(cu, die_loc_refs, value, die_off, true, &aloc, rep);
                    }
                }

                DW_FORM_SDATA => {
                    if checked_read_sleb128(ctx, rep, &aloc, "attribute value").is_none() {
                        return Err(CuFatal);
                    }
                }

                DW_FORM_BLOCK | DW_FORM_BLOCK1 | DW_FORM_BLOCK2 | DW_FORM_BLOCK4 => {
                    let length = if form == DW_FORM_BLOCK {
                        let Some(length) =
                            checked_read_uleb128(ctx, rep, &aloc, "attribute value")
                        else {
                            return Err(CuFatal);
                        };
                        length
                    } else {
                        let width = match form {
                            DW_FORM_BLOCK1 => 1,
                            DW_FORM_BLOCK2 => 2,
                            _ => 4,
                        };
                        let Ok(length) = ctx.read_var(width) else {
                            rep.error(format_args!("{aloc}: can't read attribute value."));
                            return Err(CuFatal);
                        };
                        length
                    };
                    if ctx.skip(length).is_err() {
                        rep.error(format_args!("{aloc}: can't read attribute value."));
                        return Err(CuFatal);
                    }
                }

                DW_FORM_INDIRECT => {
                    rep.error(format_args!("{aloc}: indirect form is again indirect."));
                    return Err(CuFatal);
                }

                _ => {
                    // Reserved form 0x02 slips past the abbrev validator;
                    // its size is unknowable, so the stream is lost.
                    rep.error(format_args!("{aloc}: unhandled form 0x{form:x}."));
                    return Err(CuFatal);
                }
            }
        }

        if has_children {
            let children = read_die_chain(
                ctx,
                cu,
                table,
                strings,
                dwarf64,
                addr64,
                die_loc_refs,
                strings_coverage.as_deref_mut(),
                rep,
            )?;
            if !children {
                rep.message(
                    Category::IMPACT_3 | Category::ACC_SUBOPTIMAL | Category::DIE_CHILD,
                    format_args!("{dloc}: Abbrev has_children, but the chain was empty."),
                );
            }
        }

        prev_die_off = die_off;
        prev_had_children = has_children;
    }

    if sibling_addr != 0 {
        rep.error(format_args!(
            "{}: This DIE should have had its sibling at 0x{sibling_addr:x}, \
             but the DIE chain ended.",
            Where::Die {
                cu: cu.offset,
                die: prev_die_off
            }
        ));
    }

    Ok(got_die)
}

/// Verifies that every CU-local reference points at a recorded DIE.
fn check_die_references<W: Write>(
    cu: &CompilationUnit,
    refs: &RefRecord,
    rep: &mut Reporter<W>,
) -> bool {
    let mut sound = true;
    for r in refs.iter() {
        if !cu.die_addrs.contains(r.addr) {
            rep.error(format_args!(
                "{}: unresolved reference to DIE 0x{:x}.",
                Where::Die {
                    cu: cu.offset,
                    die: r.who
                },
                r.addr
            ));
            sound = false;
        }
    }
    sound
}

/// Resolves every global reference against the DIEs of all CUs.
fn check_global_die_references<W: Write>(
    cus: &[CompilationUnit],
    rep: &mut Reporter<W>,
) -> bool {
    let mut sound = true;
    for cu in cus {
        for r in cu.die_refs.iter() {
            let owner = cus.iter().find(|c| c.die_addrs.contains(r.addr));
            match owner {
                None => {
                    rep.error(format_args!(
                        "{}: unresolved (non-CU-local) reference to DIE 0x{:x}.",
                        Where::Die {
                            cu: cu.offset,
                            die: r.who
                        },
                        r.addr
                    ));
                    sound = false;
                }
                Some(owner) if owner.offset == cu.offset => {
                    rep.message(
                        Category::IMPACT_2 | Category::ACC_SUBOPTIMAL | Category::DIE_REF,
                        format_args!(
                            "{}: local reference to DIE 0x{:x} formed as global.",
                            Where::Die {
                                cu: cu.offset,
                                die: r.who
                            },
                            r.addr
                        ),
                    );
                }
                Some(_) => {}
            }
        }
    }
    sound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abbrev::load_tables;
    use crate::reader::ByteOrder;
    use crate::report::Criteria;

    /// Build a DWARF32 CU image: length prefix, version 3 header with
    /// abbrev offset 0 and 4-byte addresses, then the given DIE bytes.
    fn make_cu(dies: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let payload_len = (2 + 4 + 1 + dies.len()) as u32;
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&3u16.to_le_bytes()); // version
        buf.extend_from_slice(&0u32.to_le_bytes()); // abbrev offset
        buf.push(4); // address size
        buf.extend_from_slice(dies);
        buf
    }

    fn run_with(
        criteria: Criteria,
        abbrev: &[u8],
        info: &[u8],
        strings: &[u8],
    ) -> (Option<Vec<CompilationUnit>>, usize, String) {
        let mut rep = Reporter::with_sink(criteria, Vec::new());
        let mut tables = load_tables(&mut ReadCtx::new(abbrev, ByteOrder::Little), &mut rep)
            .expect("test abbrev section loads");
        let cus = check_info(
            &mut ReadCtx::new(info, ByteOrder::Little),
            &mut tables,
            strings,
            &mut rep,
        );
        let errors = rep.error_count();
        let out = String::from_utf8(rep.into_sink()).expect("diagnostics are UTF-8");
        (cus, errors, out)
    }

    fn run(abbrev: &[u8], info: &[u8]) -> (Option<Vec<CompilationUnit>>, usize, String) {
        run_with(Criteria::default_warnings(), abbrev, info, &[])
    }

    /// Abbrev 1 = compile_unit, no children, no attributes.
    const MINIMAL_ABBREV: &[u8] = &[0x01, 0x11, 0x00, 0x00, 0x00, 0x00];

    #[test]
    fn minimal_well_formed_die_chain() {
        let info = make_cu(&[0x01, 0x00]);
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert_eq!(errors, 0);
        assert!(out.is_empty(), "unexpected diagnostics: {out}");
        let cus = cus.expect("section is sound");
        assert_eq!(cus.len(), 1);
        assert_eq!(cus[0].offset, 0);
        assert_eq!(cus[0].length, info.len() as u64);
        assert!(cus[0].die_addrs.contains(0xb));
    }

    #[test]
    fn empty_section_is_fine() {
        let (cus, errors, out) = run(MINIMAL_ABBREV, &[]);
        assert_eq!(errors, 0);
        // The table is loaded but never referenced.
        assert!(out.contains("abbreviation table is never used"));
        assert_eq!(cus.expect("sound").len(), 0);
    }

    #[test]
    fn zero_length_cu_with_zero_tail_is_padding() {
        let mut info = make_cu(&[0x01, 0x00]);
        info.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert_eq!(errors, 0);
        assert!(out.contains("unnecessary padding with zero bytes"));
        assert_eq!(cus.expect("sound").len(), 1);
    }

    #[test]
    fn reserved_length_escape_is_rejected() {
        let mut info = Vec::new();
        info.extend_from_slice(&0xffff_fff0u32.to_le_bytes());
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert!(cus.is_none());
        assert!(errors >= 1);
        assert!(out.contains("unrecognized CU length escape value: 0xfffffff0"));
    }

    #[test]
    fn dwarf64_escape_switches_offset_size() {
        // DWARF64 CU: 0xffffffff, 8-byte length, version 3, 8-byte abbrev
        // offset, address size 8, one DIE, terminator.
        let mut info = Vec::new();
        info.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
        info.extend_from_slice(&13u64.to_le_bytes()); // 2 + 8 + 1 + 2
        info.extend_from_slice(&3u16.to_le_bytes());
        info.extend_from_slice(&0u64.to_le_bytes());
        info.push(8);
        info.extend_from_slice(&[0x01, 0x00]);
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert_eq!(errors, 0, "diagnostics: {out}");
        let cus = cus.expect("sound");
        assert_eq!(cus[0].length, info.len() as u64);
    }

    #[test]
    fn truncated_cu_is_fatal() {
        let mut info = make_cu(&[0x01, 0x00]);
        // Claim more data than the section holds
        let bogus = (info.len() + 10) as u32;
        info[0..4].copy_from_slice(&bogus.to_le_bytes());
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("section doesn't have enough data"));
    }

    #[test]
    fn length_below_header_size_is_fatal() {
        let mut info = make_cu(&[0x01, 0x00]);
        info[0..4].copy_from_slice(&3u32.to_le_bytes());
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert!(cus.is_none());
        assert!(errors >= 1);
        assert!(out.contains("doesn't even cover CU header"));
    }

    #[test]
    fn bad_version_aborts_cu_but_not_section() {
        // First CU has version 9; a second, valid CU follows.
        let mut bad = make_cu(&[0x01, 0x00]);
        bad[4..6].copy_from_slice(&9u16.to_le_bytes());
        let good = make_cu(&[0x01, 0x00]);
        let mut info = bad;
        info.extend_from_slice(&good);
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        // The section is withheld, but the second CU was still parsed.
        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("unsupported version 9"));
    }

    #[test]
    fn unknown_abbrev_offset_is_fatal_for_cu() {
        let mut info = make_cu(&[0x01, 0x00]);
        info[6..10].copy_from_slice(&0x100u32.to_le_bytes());
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("couldn't find abbrev section with offset 0x100"));
    }

    #[test]
    fn missing_abbrev_code_is_fatal_for_cu() {
        let info = make_cu(&[0x05, 0x00]);
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("doesn't contain code 5"));
    }

    #[test]
    fn sibling_mismatch_is_reported() {
        // Abbrev 1: compile_unit with children and a ref1 sibling;
        // abbrev 2: subprogram, childless, no attributes.
        let abbrev = [
            0x01, 0x11, 0x01, 0x01, 0x11, 0x00, 0x00, //
            0x02, 0x2e, 0x00, 0x00, 0x00, //
            0x00,
        ];
        // Root at 0xb advertises its sibling at 0x10; the actual sibling
        // lands at 0xf.
        let info = make_cu(&[
            0x01, 0x10, // root, DW_AT_sibling = 0x10
            0x02, // child at 0xd
            0x00, // end of children
            0x02, // root's sibling at 0xf
            0x00, // end of top chain
        ]);
        let (cus, errors, out) = run(&abbrev, &info);

        // A sibling mismatch is an error but not structural unsoundness.
        assert!(cus.is_some());
        assert_eq!(errors, 1);
        assert!(out.contains(
            ".debug_info: CU 0x0, DIE 0xb: This DIE should have had its sibling at 0x10, \
             but it's at 0xf instead."
        ));
    }

    #[test]
    fn last_sibling_with_sibling_attribute() {
        // Childless abbrev with a ref1 sibling attribute; the DIE is the
        // last one in the chain.
        let abbrev = [0x01, 0x11, 0x00, 0x01, 0x11, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x20, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert!(cus.is_some());
        assert_eq!(errors, 1);
        assert!(out.contains("is the last sibling in chain, but has a DW_AT_sibling attribute"));
        // The excessive-sibling bloat warning from abbrev loading also fires.
        assert!(out.contains("Excessive DW_AT_sibling attribute at childless abbrev"));
    }

    #[test]
    fn children_without_sibling_attribute_is_suboptimal() {
        // Abbrev 1 has children but no sibling attribute; two sibling
        // subtrees make the walker notice on the second root.
        let abbrev = [
            0x01, 0x11, 0x01, 0x00, 0x00, //
            0x02, 0x2e, 0x00, 0x00, 0x00, //
            0x00,
        ];
        let info = make_cu(&[
            0x01, // root with children at 0xb
            0x02, 0x00, // one child, end of children
            0x02, // root's sibling at 0xe
            0x00, // end of top chain
        ]);
        let (_, errors, out) = run(&abbrev, &info);

        // impact-4 makes the finding an error by default criteria
        assert_eq!(errors, 1);
        assert!(out.contains("This DIE had children, but no DW_AT_sibling attribute"));
    }

    #[test]
    fn empty_child_chain_is_suboptimal() {
        let abbrev = [0x01, 0x11, 0x01, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x00, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0);
        assert!(out.contains("Abbrev has_children, but the chain was empty"));
        assert!(cus.is_some());
    }

    #[test]
    fn local_reference_outside_cu_is_dropped() {
        // Abbrev 1: compile_unit, no children, one DW_AT_type/ref4.
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x13, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x80, 0x00, 0x00, 0x00, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 1);
        assert!(out.contains("invalid reference outside the CU: 0x80"));
        // Dropped: no later "unresolved reference" report.
        assert!(!out.contains("unresolved reference"));
        // The drop is a diagnosis, not unsoundness of the section.
        assert!(cus.is_some());
    }

    #[test]
    fn unresolved_local_reference() {
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x13, 0x00, 0x00, 0x00];
        // ref4 to CU-relative 0x05: inside the CU, but not a DIE start.
        let info = make_cu(&[0x01, 0x05, 0x00, 0x00, 0x00, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("unresolved reference to DIE 0x5"));
    }

    #[test]
    fn valid_local_reference_resolves() {
        // Two DIEs; the second one references the first by its
        // CU-relative offset 0xb.
        let abbrev = [
            0x01, 0x11, 0x00, 0x00, 0x00, //
            0x02, 0x2e, 0x00, 0x49, 0x13, 0x00, 0x00, //
            0x00,
        ];
        let info = make_cu(&[0x01, 0x02, 0x0b, 0x00, 0x00, 0x00, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0, "diagnostics: {out}");
        assert!(cus.is_some());
    }

    #[test]
    fn global_reference_resolution() {
        // CU 0 holds a DIE at absolute 0xb; CU 1 references it globally.
        let abbrev = [
            0x01, 0x11, 0x00, 0x00, 0x00, //
            0x02, 0x11, 0x00, 0x49, 0x10, 0x00, 0x00, //
            0x00,
        ];
        let cu0 = make_cu(&[0x01, 0x00]);
        let cu1 = make_cu(&[0x02, 0x0b, 0x00, 0x00, 0x00, 0x00]);
        let mut info = cu0;
        info.extend_from_slice(&cu1);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0, "diagnostics: {out}");
        assert_eq!(cus.expect("sound").len(), 2);
    }

    #[test]
    fn unresolved_global_reference() {
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x10, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x00, 0x10, 0x00, 0x00, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("unresolved (non-CU-local) reference to DIE 0x1000"));
    }

    #[test]
    fn local_reference_formed_as_global() {
        // The CU's only DIE references itself through ref_addr.
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x10, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x0b, 0x00, 0x00, 0x00, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0);
        assert!(out.contains("local reference to DIE 0xb formed as global"));
        assert!(cus.is_some());
    }

    #[test]
    fn unused_abbreviation_is_reported() {
        let abbrev = [
            0x01, 0x11, 0x00, 0x00, 0x00, //
            0x02, 0x2e, 0x00, 0x00, 0x00, //
            0x00,
        ];
        let info = make_cu(&[0x01, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0);
        assert!(out.contains("Abbreviation with code 2 is never used"));
        assert!(cus.is_some());
    }

    #[test]
    fn nonzero_trailing_cu_bytes() {
        // The garbage byte sits inside the claimed CU length, after the
        // chain terminator.
        let info = make_cu(&[0x01, 0x00, 0xab]);
        let (cus, errors, out) = run(MINIMAL_ABBREV, &info);

        assert_eq!(errors, 0);
        assert!(out.contains("unreferenced non-zero bytes"));
        assert!(cus.is_some());
    }

    #[test]
    fn string_coverage_reports_unreferenced_tail() {
        let mut criteria = Criteria::default_warnings();
        criteria.accept |= Category::STRINGS;

        // Abbrev 1: compile_unit with one DW_AT_name/strp attribute.
        let abbrev = [0x01, 0x11, 0x00, 0x03, 0x0e, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let strings = b"hello\0world\0";
        let (cus, errors, out) = run_with(criteria, &abbrev, &info, strings);

        assert_eq!(errors, 0, "diagnostics: {out}");
        assert!(cus.is_some());
        assert!(out.contains(".debug_str: 0x6..0xb: unreferenced non-zero bytes."));
    }

    #[test]
    fn string_coverage_reports_zero_padding() {
        let mut criteria = Criteria::default_warnings();
        criteria.accept |= Category::STRINGS;

        let abbrev = [0x01, 0x11, 0x00, 0x03, 0x0e, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let strings = b"hello\0\0\0\0";
        let (_, errors, out) = run_with(criteria, &abbrev, &info, strings);

        assert_eq!(errors, 0);
        assert!(out.contains(".debug_str: 0x6..0x8: unnecessary padding with zero bytes."));
    }

    #[test]
    fn strp_outside_string_section() {
        let abbrev = [0x01, 0x11, 0x00, 0x03, 0x0e, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0xff, 0x00, 0x00, 0x00, 0x00]);
        let (_, errors, out) = run_with(Criteria::default_warnings(), &abbrev, &info, b"hi\0");

        assert_eq!(errors, 1);
        assert!(out.contains("invalid offset outside .debug_str: 0xff"));
    }

    #[test]
    fn indirect_form_resolves_once() {
        // DW_AT_type with DW_FORM_indirect; the DIE stores form ref4.
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x16, 0x00, 0x00, 0x00];
        let info = make_cu(&[
            0x01, 0x13, // indirect -> ref4
            0x0b, 0x00, 0x00, 0x00, // self-reference
            0x00,
        ]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0, "diagnostics: {out}");
        assert!(cus.is_some());
    }

    #[test]
    fn doubly_indirect_form_is_fatal() {
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x16, 0x00, 0x00, 0x00];
        let info = make_cu(&[0x01, 0x16, 0x00]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert!(cus.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("indirect form is again indirect"));
    }

    #[test]
    fn block_and_scalar_forms_are_consumed() {
        // data1, block1 (2 payload bytes), sdata, string
        let abbrev = [
            0x01, 0x11, 0x00, //
            0x0b, 0x0b, // DW_AT_byte_size, data1
            0x02, 0x0a, // DW_AT_location, block1
            0x1c, 0x0d, // DW_AT_const_value, sdata
            0x03, 0x08, // DW_AT_name, string
            0x00, 0x00, //
            0x00,
        ];
        let info = make_cu(&[
            0x01, // abbrev code
            0x2a, // data1
            0x02, 0x91, 0x04, // block1: length 2, payload
            0x7f, // sdata: -1
            b'm', b'u', 0x00, // string
            0x00, // chain terminator
        ]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert_eq!(errors, 0, "diagnostics: {out}");
        assert!(cus.is_some());
    }

    #[test]
    fn truncated_attribute_value_is_fatal() {
        let abbrev = [0x01, 0x11, 0x00, 0x49, 0x13, 0x00, 0x00, 0x00];
        // ref4 needs 4 bytes; only 1 remains
        let info = make_cu(&[0x01, 0x0b]);
        let (cus, errors, out) = run(&abbrev, &info);

        assert!(cus.is_none());
        assert!(errors >= 1);
        assert!(out.contains("can't read attribute value"));
    }
}
