//! CLI subcommand implementations for the `ibb` binary.
//!
//! CLI argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`] and
//! shared between `main.rs` and `build.rs` (for man page and completion
//! generation) via `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct holding
//! the parsed arguments and a `pub fn execute(opts, writer) -> Result<(), IbbError>`
//! entry point. The `writer: &mut dyn Write` parameter allows output to be
//! captured in tests or redirected to a file via the global `--output` flag.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `ibb header` | [`header`] | Header page fields: page size, version, file id, start LSN |
//! | `ibb checksum` | [`checksum`] | CRC-32C validation of every page, exit status 1 on damage |
//! | `ibb chunks` | [`chunks`] | Chunk framing of data pages: type, flags, length |
//! | `ibb dump` | [`dump`] | Event group stream as hex dump or raw bytes |
//!
//! `header`, `checksum` and `chunks` accept `--json`. A progress bar (via
//! [`indicatif`]) is shown while `checksum` scans large files. The `wprintln!`
//! and `wprint!` macros wrap `writeln!`/`write!` to convert `io::Error` into
//! `IbbError`.

pub mod app;
pub mod checksum;
pub mod chunks;
pub mod dump;
pub mod header;

/// Write a line to the given writer, converting io::Error to IbbError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::IbbError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::IbbError::Io(e.to_string()))
    };
}

/// Write (without newline) to the given writer, converting io::Error to IbbError.
macro_rules! wprint {
    ($w:expr, $($arg:tt)*) => {
        write!($w, $($arg)*).map_err(|e| $crate::IbbError::Io(e.to_string()))
    };
}

pub(crate) use wprint;
pub(crate) use wprintln;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a styled progress bar for iterating over pages.
pub(crate) fn create_progress_bar(count: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(count);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}})",
            unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
