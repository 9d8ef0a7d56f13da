//! InnoDB engine binlog reader.
//!
//! The `innodb-binlog-utils` crate (library name `ibb`) reads the binary log
//! files (`binlog-NNNNNN.ibb`) written by the InnoDB engine binlog, and turns
//! them back into the stream of committed event groups a server would send
//! to a replica. It works on files only; no server is involved.
//!
//! # CLI Reference
//!
//! ## Subcommands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`ibb header`](cli::app::Commands::Header) | Show the header page of a binlog file |
//! | [`ibb checksum`](cli::app::Commands::Checksum) | Validate the CRC-32C checksum of every page |
//! | [`ibb chunks`](cli::app::Commands::Chunks) | List the chunk framing of data pages |
//! | [`ibb dump`](cli::app::Commands::Dump) | Decode the event stream (hex dump or raw bytes) |
//!
//! ## Global options
//!
//! All subcommands accept `--color <auto|always|never>`, `--output <file>`
//! and `-v` for debug logging (`RUST_LOG` takes precedence).
//!
//! # Library API
//!
//! ```no_run
//! use ibb::binlog::reader::open_binlog;
//!
//! let mut reader = open_binlog("binlog-000001.ibb", 0).unwrap();
//! let mut buf = vec![0u8; 16384];
//! loop {
//!     let n = reader.read(&mut buf).unwrap();
//!     if n == 0 {
//!         break;
//!     }
//!     // buf[..n] holds event group data
//! }
//! ```
//!
//! ## Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`open_binlog`](binlog::reader::open_binlog) | Open a file and start reading events |
//! | [`BinlogReader`](binlog::reader::BinlogReader) | Event stream state machine, also `std::io::Read` |
//! | [`ChunkReader`](binlog::chunk::ChunkReader) | Record reassembly from page chunks |
//! | [`OobReader`](binlog::oob::OobReader) | Out-of-band data forest traversal |
//! | [`FileHeader`](binlog::header::FileHeader) | Header page of a binlog file |
//! | [`validate_page_checksum`](binlog::checksum::validate_page_checksum) | CRC-32C page validation |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | The `ibb` binary and its dependencies (`clap`, `colored`, `indicatif`, `tracing-subscriber`). |

pub mod binlog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod util;

use thiserror::Error;

/// Errors returned by `ibb` operations.
#[derive(Error, Debug)]
pub enum IbbError {
    /// An I/O error occurred (file open, stat, seek, or read failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// A header page could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The file was written by a newer, incompatible format version.
    #[error("Unsupported version {found} of InnoDB binlog file, cannot read (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Damaged or inconsistent data found while reading records.
    #[error("Corrupt InnoDB binlog found on page {page_no} in binlog number {file_no}: {reason}")]
    Corrupt {
        file_no: u64,
        page_no: u64,
        reason: String,
    },

    /// An invalid argument was supplied (out-of-range page number, bad option, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The operation needs a running server.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}
