//! Pedantic structural checker for DWARF in ELF object files.
//!
//! Pipeline per file: read the object → locate the `.debug_*` sections →
//! run the structural checkers over them → print classified diagnostics.
//! Exit code is 0 only when no file produced an error.

mod cli;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use muon_dwarf::reader::ByteOrder;
use muon_dwarf::report::{Category, Criteria, Reporter};
use muon_dwarf::{Sections, check_sections};
use muon_elf::ElfFile;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let mut warnings = Criteria::default_warnings();
    if cli.strict {
        warnings.accept |= Category::STRINGS;
    }
    if cli.gnu {
        warnings.reject |= Category::ACC_BLOAT;
    }
    if cli.ignore_missing {
        warnings.reject |= Category::ELF;
    }

    let only_one = cli.files.len() == 1;
    let mut total_errors = 0usize;

    for path in &cli.files {
        if !only_one {
            println!("\n{}:", path.display());
        }
        match check_file(path, warnings, cli.ignore_missing) {
            Ok(file_errors) => {
                total_errors += file_errors;
                if file_errors == 0 && !cli.quiet {
                    println!("No errors");
                }
            }
            Err(err) => {
                println!("error: {err:#}");
                total_errors += 1;
            }
        }
    }

    if total_errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Checks one object file, returning the number of errors it produced.
fn check_file(path: &Path, warnings: Criteria, tolerate_nodebug: bool) -> Result<usize> {
    let data = fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    let elf = ElfFile::parse(&data).with_context(|| format!("cannot parse '{}'", path.display()))?;

    let order = if elf.is_little_endian() {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };
    let section = |name| {
        elf.find_section_by_name(name)
            .and_then(|shdr| elf.section_data(&shdr))
    };
    let sections = Sections {
        order,
        abbrev: section(".debug_abbrev"),
        info: section(".debug_info"),
        strings: section(".debug_str"),
        aranges: section(".debug_aranges"),
        pubnames: section(".debug_pubnames"),
    };

    let mut rep = Reporter::new(warnings);
    if !sections.has_dwarf() {
        if !tolerate_nodebug {
            rep.error(format_args!(
                "{}: no DWARF debugging information found.",
                path.display()
            ));
        }
        return Ok(rep.error_count());
    }

    check_sections(&sections, tolerate_nodebug, &mut rep);
    Ok(rep.error_count())
}
