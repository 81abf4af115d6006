//! `.debug_abbrev` loading and validation.
//!
//! The abbreviation section is a sequence of tables laid back-to-back,
//! each a run of abbreviations terminated by a zero code. A table may be
//! followed by additional zero codes before the next one starts; those
//! are legal but useless, and are diagnosed as padding. The DIE walker
//! cannot interpret `.debug_info` without these tables, so any structural
//! damage here abandons the whole section.

use std::io::Write;

use crate::consts::{
    DW_AT_HI_USER, DW_AT_SIBLING, DW_CHILDREN_NO, DW_CHILDREN_YES, DW_FORM_INDIRECT,
    DW_FORM_REF_ADDR, DW_FORM_REF_UDATA, DW_FORM_REF1, DW_FORM_REF2, DW_FORM_REF4, DW_FORM_REF8,
    DW_TAG_HI_USER, attrib_form_valid, form_name,
};
use crate::reader::ReadCtx;
use crate::report::{Category, Reporter, Where, checked_read_uleb128};

/// One attribute descriptor: `(name, form)` plus the section offset at
/// which the pair was parsed.
#[derive(Debug, Clone, Copy)]
pub struct AbbrevAttrib {
    /// Offset of the pair in `.debug_abbrev`.
    pub offset: u64,
    /// Attribute name code (`DW_AT_*`).
    pub name: u16,
    /// Attribute form code (`DW_FORM_*`).
    pub form: u8,
}

/// One abbreviation: the DIE template keyed by its code.
#[derive(Debug)]
pub struct Abbrev {
    /// Abbreviation code, a positive ULEB128.
    pub code: u64,
    /// DIE tag (`DW_TAG_*`).
    pub tag: u16,
    /// Whether DIEs using this abbreviation are followed by a child chain.
    pub has_children: bool,
    /// Set when some DIE uses this abbreviation.
    pub used: bool,
    /// Attribute descriptors, in file order.
    pub attribs: Vec<AbbrevAttrib>,
}

/// A contiguous group of abbreviations, identified by its starting offset.
#[derive(Debug)]
pub struct AbbrevTable {
    /// Offset of the table in `.debug_abbrev`; CU headers name tables by
    /// this value.
    pub offset: u64,
    /// Abbreviations, sorted ascending by code after loading.
    pub abbrevs: Vec<Abbrev>,
    /// Set when some CU references this table.
    pub used: bool,
}

impl AbbrevTable {
    /// Binary-search lookup by abbreviation code, returning the index.
    #[must_use]
    pub fn find(&self, code: u64) -> Option<usize> {
        self.abbrevs.binary_search_by_key(&code, |a| a.code).ok()
    }
}

/// Outcome of validating a `DW_AT_sibling` attribute's form.
pub(crate) enum SiblingForm {
    /// A CU-local reference form (or `indirect`, resolved later).
    Ok,
    /// `DW_FORM_ref_addr` — legal but discouraged by the DWARF standard.
    RefAddr,
    /// Not a reference form at all.
    NonReference,
}

/// Classifies a form used for `DW_AT_sibling`.
pub(crate) fn check_sibling_form(form: u8) -> SiblingForm {
    match form {
        // Indirect is tolerated here; the dereferenced form is checked
        // again while the DIE is loaded.
        DW_FORM_INDIRECT | DW_FORM_REF1 | DW_FORM_REF2 | DW_FORM_REF4 | DW_FORM_REF8
        | DW_FORM_REF_UDATA => SiblingForm::Ok,
        DW_FORM_REF_ADDR => SiblingForm::RefAddr,
        _ => SiblingForm::NonReference,
    }
}

/// Loads every abbreviation table from a `.debug_abbrev` image.
///
/// Returns `None` on unrecoverable damage; all CUs depend on this
/// section, so there is nothing to salvage.
#[expect(
    clippy::too_many_lines,
    reason = "the table grammar is one loop; splitting it obscures the state"
)]
pub fn load_tables<W: Write>(
    ctx: &mut ReadCtx<'_>,
    rep: &mut Reporter<W>,
) -> Option<Vec<AbbrevTable>> {
    let mut tables: Vec<AbbrevTable> = Vec::new();
    let mut open = false;
    let mut section_off = 0u64;

    while !ctx.is_eof() {
        // Hunt for the next non-zero abbreviation code. A single zero
        // terminates the open table; two or more in a row are padding.
        let mut zero_seq_off: Option<u64> = None;
        let mut prev_zero_off = 0u64;
        let mut prev_was_zero = false;
        let mut next: Option<(u64, u64)> = None;

        while !ctx.is_eof() {
            let off = ctx.offset();
            let loc = Where::Abbrev { abbr: off };
            let value = checked_read_uleb128(ctx, rep, &loc, "abbrev code")?;
            if value != 0 {
                next = Some((off, value));
                break;
            }
            if prev_was_zero && zero_seq_off.is_none() {
                zero_seq_off = Some(prev_zero_off);
            }
            open = false;
            prev_was_zero = true;
            prev_zero_off = off;
        }

        if let Some(start) = zero_seq_off {
            rep.padding_zero(
                Category::ABBREVS,
                start,
                prev_zero_off,
                &Where::Abbrev { abbr: section_off },
            );
        }

        let Some((abbr_off, code)) = next else {
            break;
        };

        if !open {
            tables.push(AbbrevTable {
                offset: abbr_off,
                abbrevs: Vec::new(),
                used: false,
            });
            section_off = abbr_off;
            open = true;
        }

        let loc = Where::Abbrev { abbr: abbr_off };

        // Tag
        let tag = checked_read_uleb128(ctx, rep, &loc, "abbrev tag")?;
        if tag > DW_TAG_HI_USER {
            rep.error(format_args!("{loc}: invalid abbrev tag 0x{tag:x}."));
            return None;
        }

        // has_children
        let Ok(children) = ctx.read_u8() else {
            rep.error(format_args!("{loc}: can't read abbrev has_children."));
            return None;
        };
        if children != DW_CHILDREN_NO && children != DW_CHILDREN_YES {
            rep.error(format_args!(
                "{loc}: invalid has_children value 0x{children:x}."
            ));
            return None;
        }
        let has_children = children == DW_CHILDREN_YES;

        // Attribute pairs, terminated by a zero/zero pair
        let mut attribs = Vec::new();
        let mut sibling_attr: Option<u64> = None;
        loop {
            let attr_off = ctx.offset();
            let aloc = Where::AbbrevAttr {
                abbr: abbr_off,
                attr: attr_off,
            };
            let name = checked_read_uleb128(ctx, rep, &aloc, "attribute name")?;
            let form = checked_read_uleb128(ctx, rep, &aloc, "attribute form")?;
            if name == 0 && form == 0 {
                break;
            }

            if name > DW_AT_HI_USER {
                rep.error(format_args!("{aloc}: invalid name 0x{name:x}."));
                return None;
            }
            if !attrib_form_valid(form) {
                rep.error(format_args!("{aloc}: invalid form 0x{form:x}."));
                return None;
            }
            #[expect(
                clippy::cast_possible_truncation,
                reason = "name and form were just bounds-checked"
            )]
            let (name, form) = (name as u16, form as u8);

            // The DIE walker checks sibling attributes structurally, so
            // make sure the assumptions it relies on hold: at most one
            // DW_AT_sibling per abbreviation, with a reference-class form.
            if name == DW_AT_SIBLING {
                match sibling_attr {
                    Some(first) => rep.error(format_args!(
                        "{aloc}: Another DW_AT_sibling attribute in one abbreviation. \
                         (First was 0x{first:x}.)"
                    )),
                    None => {
                        sibling_attr = Some(attr_off);
                        if !has_children {
                            rep.message(
                                Category::DIE_SIBLING | Category::ACC_BLOAT | Category::IMPACT_1,
                                format_args!(
                                    "{aloc}: Excessive DW_AT_sibling attribute at childless abbrev."
                                ),
                            );
                        }
                    }
                }

                match check_sibling_form(form) {
                    SiblingForm::Ok => {}
                    SiblingForm::RefAddr => rep.message(
                        Category::DIE_SIBLING | Category::IMPACT_2,
                        format_args!(
                            "{aloc}: DW_AT_sibling attribute with form DW_FORM_ref_addr."
                        ),
                    ),
                    SiblingForm::NonReference => rep.error(format_args!(
                        "{aloc}: DW_AT_sibling attribute with non-reference form {}.",
                        form_name(form)
                    )),
                }
            }

            attribs.push(AbbrevAttrib {
                offset: attr_off,
                name,
                form,
            });
        }

        let table_index = tables.len() - 1;
        tables[table_index].abbrevs.push(Abbrev {
            code,
            tag: u16::try_from(tag).unwrap_or(u16::MAX),
            has_children,
            used: false,
            attribs,
        });
    }

    // The tables are most likely already sorted in the file, but the
    // lookup relies on it.
    for table in &mut tables {
        table.abbrevs.sort_by_key(|a| a.code);
        for pair in table.abbrevs.windows(2) {
            if pair[0].code == pair[1].code {
                rep.error(format_args!(
                    "abbrev 0x{:x}: duplicate abbreviation code {}.",
                    table.offset, pair[0].code
                ));
            }
        }
    }

    Some(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ByteOrder;
    use crate::report::Criteria;

    fn run(data: &[u8]) -> (Option<Vec<AbbrevTable>>, usize, String) {
        let mut rep = Reporter::with_sink(Criteria::default_warnings(), Vec::new());
        let mut ctx = ReadCtx::new(data, ByteOrder::Little);
        let tables = load_tables(&mut ctx, &mut rep);
        let count = rep.error_count();
        let out = String::from_utf8(rep.into_sink()).expect("diagnostics are UTF-8");
        (tables, count, out)
    }

    #[test]
    fn minimal_table() {
        // code 1, tag 0x11 (compile_unit), no children, no attributes
        let (tables, errors, out) = run(&[0x01, 0x11, 0x00, 0x00, 0x00, 0x00]);
        let tables = tables.expect("loadable");
        assert_eq!(errors, 0);
        assert!(out.is_empty());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].offset, 0);
        assert_eq!(tables[0].abbrevs.len(), 1);
        let ab = &tables[0].abbrevs[0];
        assert_eq!(ab.code, 1);
        assert_eq!(ab.tag, 0x11);
        assert!(!ab.has_children);
        assert!(ab.attribs.is_empty());
    }

    #[test]
    fn attributes_are_recorded_in_order() {
        // code 1, tag 0x2e (subprogram), children, attrs (name, strp),
        // (low_pc, addr)
        let data = [0x01, 0x2e, 0x01, 0x03, 0x0e, 0x11, 0x01, 0x00, 0x00, 0x00];
        let (tables, errors, _) = run(&data);
        let tables = tables.expect("loadable");
        assert_eq!(errors, 0);

        let ab = &tables[0].abbrevs[0];
        assert!(ab.has_children);
        assert_eq!(ab.attribs.len(), 2);
        assert_eq!((ab.attribs[0].name, ab.attribs[0].form), (0x03, 0x0e));
        assert_eq!((ab.attribs[1].name, ab.attribs[1].form), (0x11, 0x01));
        assert_eq!(ab.attribs[0].offset, 3);
        assert_eq!(ab.attribs[1].offset, 5);
    }

    #[test]
    fn back_to_back_tables() {
        let data = [
            0x01, 0x11, 0x00, 0x00, 0x00, // table at 0: abbrev 1
            0x00, // terminator
            0x01, 0x2e, 0x00, 0x00, 0x00, // table at 6: abbrev 1
            0x00, // terminator
        ];
        let (tables, errors, out) = run(&data);
        let tables = tables.expect("loadable");
        assert_eq!(errors, 0);
        assert!(out.is_empty());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].offset, 0);
        assert_eq!(tables[1].offset, 6);
    }

    #[test]
    fn zero_run_between_tables_is_padding() {
        let data = [
            0x01, 0x11, 0x00, 0x00, 0x00, // table at 0
            0x00, 0x00, 0x00, // terminator plus two padding zeroes
            0x01, 0x2e, 0x00, 0x00, 0x00, 0x00, // table at 8
        ];
        let (tables, errors, out) = run(&data);
        let tables = tables.expect("loadable");
        assert_eq!(errors, 0);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].offset, 8);
        assert_eq!(
            out,
            "warning: abbrev 0x0: 0x5..0x7: unnecessary padding with zero bytes.\n"
        );
    }

    #[test]
    fn trailing_zero_run_is_padding() {
        let data = [0x01, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 0);
        assert!(out.contains("unnecessary padding with zero bytes"));
    }

    #[test]
    fn redundant_code_encoding_is_diagnosed() {
        // Abbrev code 1 encoded as 0x81 0x00
        let data = [0x81, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 0);
        assert_eq!(
            out,
            "warning: abbrev 0x0: unnecessarily long encoding of abbrev code.\n"
        );
    }

    #[test]
    fn invalid_tag_is_fatal() {
        // Tag 0x1ffff exceeds DW_TAG_hi_user
        let data = [0x01, 0xff, 0xff, 0x07, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("invalid abbrev tag 0x1ffff"));
    }

    #[test]
    fn invalid_has_children_is_fatal() {
        let data = [0x01, 0x11, 0x02, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("invalid has_children value 0x2"));
    }

    #[test]
    fn invalid_form_is_fatal() {
        // Form 0x17 is past DW_FORM_indirect
        let data = [0x01, 0x11, 0x00, 0x03, 0x17, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("invalid form 0x17"));
    }

    #[test]
    fn truncated_mid_abbrev_is_fatal() {
        let data = [0x01, 0x11];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_none());
        assert_eq!(errors, 1);
        assert!(out.contains("can't read abbrev has_children"));
    }

    #[test]
    fn second_sibling_attribute_is_an_error() {
        // Two DW_AT_sibling attributes, both ref4
        let data = [
            0x01, 0x11, 0x01, 0x01, 0x13, 0x01, 0x13, 0x00, 0x00, 0x00,
        ];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 1);
        assert!(out.contains("Another DW_AT_sibling attribute in one abbreviation"));
        assert!(out.contains("(First was 0x3.)"));
    }

    #[test]
    fn sibling_on_childless_abbrev_is_bloat() {
        let data = [0x01, 0x11, 0x00, 0x01, 0x13, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 0);
        assert!(out.contains("Excessive DW_AT_sibling attribute at childless abbrev"));
    }

    #[test]
    fn sibling_form_checks() {
        // ref_addr sibling: discouraged, warning
        let data = [0x01, 0x11, 0x01, 0x01, 0x10, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 0);
        assert!(out.contains("DW_AT_sibling attribute with form DW_FORM_ref_addr"));

        // data4 sibling: not a reference class, error
        let data = [0x01, 0x11, 0x01, 0x01, 0x06, 0x00, 0x00, 0x00];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 1);
        assert!(out.contains("non-reference form DW_FORM_data4"));
    }

    #[test]
    fn lookup_is_sorted_by_code() {
        // Codes 3, 1, 2 in file order
        let data = [
            0x03, 0x11, 0x00, 0x00, 0x00, //
            0x01, 0x2e, 0x00, 0x00, 0x00, //
            0x02, 0x34, 0x00, 0x00, 0x00, //
            0x00,
        ];
        let (tables, errors, _) = run(&data);
        let tables = tables.expect("loadable");
        assert_eq!(errors, 0);

        let table = &tables[0];
        let codes: Vec<u64> = table.abbrevs.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec![1, 2, 3]);
        assert_eq!(table.abbrevs[table.find(3).unwrap()].tag, 0x11);
        assert_eq!(table.abbrevs[table.find(1).unwrap()].tag, 0x2e);
        assert!(table.find(4).is_none());
    }

    #[test]
    fn duplicate_codes_are_an_error() {
        let data = [
            0x01, 0x11, 0x00, 0x00, 0x00, //
            0x01, 0x2e, 0x00, 0x00, 0x00, //
            0x00,
        ];
        let (tables, errors, out) = run(&data);
        assert!(tables.is_some());
        assert_eq!(errors, 1);
        assert!(out.contains("duplicate abbreviation code 1"));
    }
}
