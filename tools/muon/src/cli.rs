//! Command-line interface definitions for muon.

use std::path::PathBuf;

use clap::Parser;

/// Pedantic checking of DWARF stored in ELF files.
#[derive(Parser)]
#[command(name = "muon", version, about)]
pub struct Cli {
    /// Object files to check.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Be extremely strict; also flag string-table bloat.
    #[arg(long)]
    pub strict: bool,

    /// The binary was created with a GNU toolchain and is therefore known
    /// to be broken in certain ways.
    #[arg(long)]
    pub gnu: bool,

    /// Don't complain if files have no DWARF at all.
    #[arg(long, short = 'i')]
    pub ignore_missing: bool,

    /// Do not print anything if successful.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}
