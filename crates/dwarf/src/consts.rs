//! DWARF numeric constants used by the structural checks.
//!
//! Values are from the DWARF 3 specification. Only the vocabulary the
//! checkers actually interpret is defined here; attribute names and tags
//! are otherwise treated as opaque numbers bounded by the `*_hi_user`
//! ceilings.

// ---------------------------------------------------------------------------
// Tags and attribute names
// ---------------------------------------------------------------------------

/// `DW_TAG_hi_user` — upper bound of the vendor tag range.
pub const DW_TAG_HI_USER: u64 = 0xffff;

/// `DW_AT_sibling` — reference to the next sibling DIE.
pub const DW_AT_SIBLING: u16 = 0x01;

/// `DW_AT_hi_user` — upper bound of the vendor attribute range.
pub const DW_AT_HI_USER: u64 = 0x3fff;

/// `DW_CHILDREN_no` — the DIE has no children.
pub const DW_CHILDREN_NO: u8 = 0;

/// `DW_CHILDREN_yes` — the DIE is followed by a child chain.
pub const DW_CHILDREN_YES: u8 = 1;

// ---------------------------------------------------------------------------
// Attribute forms
// ---------------------------------------------------------------------------

/// `DW_FORM_addr` — machine address, `address_size` bytes.
pub const DW_FORM_ADDR: u8 = 0x01;
/// `DW_FORM_block2` — block with 2-byte length prefix.
pub const DW_FORM_BLOCK2: u8 = 0x03;
/// `DW_FORM_block4` — block with 4-byte length prefix.
pub const DW_FORM_BLOCK4: u8 = 0x04;
/// `DW_FORM_data2` — 2-byte constant.
pub const DW_FORM_DATA2: u8 = 0x05;
/// `DW_FORM_data4` — 4-byte constant.
pub const DW_FORM_DATA4: u8 = 0x06;
/// `DW_FORM_data8` — 8-byte constant.
pub const DW_FORM_DATA8: u8 = 0x07;
/// `DW_FORM_string` — inline NUL-terminated string.
pub const DW_FORM_STRING: u8 = 0x08;
/// `DW_FORM_block` — block with ULEB128 length prefix.
pub const DW_FORM_BLOCK: u8 = 0x09;
/// `DW_FORM_block1` — block with 1-byte length prefix.
pub const DW_FORM_BLOCK1: u8 = 0x0a;
/// `DW_FORM_data1` — 1-byte constant.
pub const DW_FORM_DATA1: u8 = 0x0b;
/// `DW_FORM_flag` — 1-byte flag.
pub const DW_FORM_FLAG: u8 = 0x0c;
/// `DW_FORM_sdata` — SLEB128 constant.
pub const DW_FORM_SDATA: u8 = 0x0d;
/// `DW_FORM_strp` — offset into `.debug_str`.
pub const DW_FORM_STRP: u8 = 0x0e;
/// `DW_FORM_udata` — ULEB128 constant.
pub const DW_FORM_UDATA: u8 = 0x0f;
/// `DW_FORM_ref_addr` — section-absolute reference into `.debug_info`.
pub const DW_FORM_REF_ADDR: u8 = 0x10;
/// `DW_FORM_ref1` — CU-local reference, 1 byte.
pub const DW_FORM_REF1: u8 = 0x11;
/// `DW_FORM_ref2` — CU-local reference, 2 bytes.
pub const DW_FORM_REF2: u8 = 0x12;
/// `DW_FORM_ref4` — CU-local reference, 4 bytes.
pub const DW_FORM_REF4: u8 = 0x13;
/// `DW_FORM_ref8` — CU-local reference, 8 bytes.
pub const DW_FORM_REF8: u8 = 0x14;
/// `DW_FORM_ref_udata` — CU-local reference, ULEB128.
pub const DW_FORM_REF_UDATA: u8 = 0x15;
/// `DW_FORM_indirect` — the form is stored with the attribute value.
pub const DW_FORM_INDIRECT: u8 = 0x16;

// ---------------------------------------------------------------------------
// Initial-length escapes
// ---------------------------------------------------------------------------

/// Initial-length value announcing the 64-bit DWARF format.
pub const DWARF_LENGTH_64BIT: u32 = 0xffff_ffff;

/// Lowest reserved initial-length escape value.
pub const DWARF_LENGTH_MIN_ESCAPE: u32 = 0xffff_fff0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns `true` if `form` is inside the defined form range
/// `(0, DW_FORM_indirect]`.
#[must_use]
pub fn attrib_form_valid(form: u64) -> bool {
    form > 0 && form <= u64::from(DW_FORM_INDIRECT)
}

/// Returns the `DW_FORM_*` spelling of a form for diagnostics.
#[must_use]
pub fn form_name(form: u8) -> &'static str {
    match form {
        DW_FORM_ADDR => "DW_FORM_addr",
        DW_FORM_BLOCK2 => "DW_FORM_block2",
        DW_FORM_BLOCK4 => "DW_FORM_block4",
        DW_FORM_DATA2 => "DW_FORM_data2",
        DW_FORM_DATA4 => "DW_FORM_data4",
        DW_FORM_DATA8 => "DW_FORM_data8",
        DW_FORM_STRING => "DW_FORM_string",
        DW_FORM_BLOCK => "DW_FORM_block",
        DW_FORM_BLOCK1 => "DW_FORM_block1",
        DW_FORM_DATA1 => "DW_FORM_data1",
        DW_FORM_FLAG => "DW_FORM_flag",
        DW_FORM_SDATA => "DW_FORM_sdata",
        DW_FORM_STRP => "DW_FORM_strp",
        DW_FORM_UDATA => "DW_FORM_udata",
        DW_FORM_REF_ADDR => "DW_FORM_ref_addr",
        DW_FORM_REF1 => "DW_FORM_ref1",
        DW_FORM_REF2 => "DW_FORM_ref2",
        DW_FORM_REF4 => "DW_FORM_ref4",
        DW_FORM_REF8 => "DW_FORM_ref8",
        DW_FORM_REF_UDATA => "DW_FORM_ref_udata",
        DW_FORM_INDIRECT => "DW_FORM_indirect",
        _ => "DW_FORM_<unknown>",
    }
}
