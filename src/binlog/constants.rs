//! Engine binlog file structure constants.
//!
//! Offsets and sizes for the header page, the data page trailer, and the
//! chunk framing used inside data pages.

// ── File naming ─────────────────────────────────────────────────────

/// Prefix of every binlog file name.
pub const BINLOG_NAME_BASE: &str = "binlog-";
/// Extension of every binlog file name.
pub const BINLOG_NAME_EXT: &str = ".ibb";

/// Build the file name for a binlog file id, e.g. `binlog-000042.ibb`.
pub fn binlog_file_name(file_no: u64) -> String {
    format!("{}{:06}{}", BINLOG_NAME_BASE, file_no, BINLOG_NAME_EXT)
}

/// Parse the file id out of a binlog file name, if it follows the convention.
pub fn parse_binlog_file_name(name: &str) -> Option<u64> {
    let digits = name
        .strip_prefix(BINLOG_NAME_BASE)?
        .strip_suffix(BINLOG_NAME_EXT)?;
    if digits.len() < 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ── Header page (page 0) ────────────────────────────────────────────

/// Size of the header page that is read before the real page size is known.
pub const BINLOG_HEADER_PAGE_SIZE: u32 = 512;
/// Magic bytes at the start of the header page.
pub const INNODB_BINLOG_MAGIC: [u8; 4] = [0xfe, 0xfe, 0x0d, 0x01];
/// Highest major file format version this reader understands.
pub const INNODB_BINLOG_FILE_VERS_MAJOR: u32 = 1;

/// Offset of the magic (4 bytes).
pub const BINLOG_HEADER_MAGIC: usize = 0;
/// Offset of log2(page size) (4 bytes, LE).
pub const BINLOG_HEADER_PAGE_SIZE_SHIFT: usize = 4;
/// Offset of the major format version (4 bytes, LE).
pub const BINLOG_HEADER_VERS_MAJOR: usize = 8;
/// Offset of the minor format version (4 bytes, LE).
pub const BINLOG_HEADER_VERS_MINOR: usize = 12;
/// Offset of the file id (8 bytes, LE).
pub const BINLOG_HEADER_FILE_NO: usize = 16;
/// Offset of the file size in pages (8 bytes, LE).
pub const BINLOG_HEADER_SIZE_IN_PAGES: usize = 24;
/// Offset of the start LSN (8 bytes, LE).
pub const BINLOG_HEADER_START_LSN: usize = 32;

/// Smallest supported page size shift (512 bytes).
pub const BINLOG_PAGE_SIZE_SHIFT_MIN: u32 = 9;
/// Largest supported page size shift (64 KiB).
pub const BINLOG_PAGE_SIZE_SHIFT_MAX: u32 = 16;

// ── Data pages ──────────────────────────────────────────────────────

/// Start of chunk data within a page.
pub const BINLOG_PAGE_DATA: usize = 0;
/// Size of the CRC-32C trailer at the end of every page.
pub const BINLOG_PAGE_CHECKSUM: usize = 4;
/// Bytes at the end of a page that never hold chunk data.
pub const BINLOG_PAGE_DATA_END: usize = BINLOG_PAGE_CHECKSUM;
/// First data page; page 0 is always the header page.
pub const BINLOG_FIRST_DATA_PAGE: u32 = 1;

// ── Chunks ──────────────────────────────────────────────────────────

/// Chunk header size: type byte plus 2-byte little-endian length.
pub const BINLOG_CHUNK_HEADER: usize = 3;

/// No data; effectively end of the written log.
pub const FSP_BINLOG_TYPE_EMPTY: u8 = 0;
/// A committed event group.
pub const FSP_BINLOG_TYPE_COMMIT: u8 = 1;
/// A binlog GTID state record.
pub const FSP_BINLOG_TYPE_GTID_STATE: u8 = 2;
/// Out-of-band event group data.
pub const FSP_BINLOG_TYPE_OOB_DATA: u8 = 3;
/// Dummy record filling the remainder of a file.
pub const FSP_BINLOG_TYPE_DUMMY: u8 = 4;
/// One past the last known type.
pub const FSP_BINLOG_TYPE_END: u8 = 5;
/// Padding at the end of a page.
pub const FSP_BINLOG_TYPE_FILLER: u8 = 0xff;

/// Set on every chunk of a record except the first.
pub const FSP_BINLOG_FLAG_CONT: u8 = 1 << 7;
/// Set on the final chunk of a record.
pub const FSP_BINLOG_FLAG_LAST: u8 = 1 << 6;
/// Mask selecting the 6-bit type tag.
pub const FSP_BINLOG_TYPE_MASK: u8 = !(FSP_BINLOG_FLAG_CONT | FSP_BINLOG_FLAG_LAST);

/// Record types that may appear in the middle of another record.
///
/// A GTID state record is written at the start of a page even when a record
/// continues across it; dummy records can pad the end of a file.
pub const ALLOWED_NESTED_RECORDS: u64 =
    (1 << FSP_BINLOG_TYPE_GTID_STATE) | (1 << FSP_BINLOG_TYPE_DUMMY);

/// Name of a chunk type tag (flags masked off).
pub fn chunk_type_name(type_byte: u8) -> &'static str {
    if type_byte == FSP_BINLOG_TYPE_FILLER {
        return "FILLER";
    }
    match type_byte & FSP_BINLOG_TYPE_MASK {
        FSP_BINLOG_TYPE_EMPTY => "EMPTY",
        FSP_BINLOG_TYPE_COMMIT => "COMMIT",
        FSP_BINLOG_TYPE_GTID_STATE => "GTID_STATE",
        FSP_BINLOG_TYPE_OOB_DATA => "OOB_DATA",
        FSP_BINLOG_TYPE_DUMMY => "DUMMY",
        _ => "UNKNOWN",
    }
}

// ── Headers parsed from record payloads ─────────────────────────────

/// Largest encoding of a 64-bit compressed integer.
pub const COMPR_INT_MAX64: usize = 9;
/// Buffer size for commit-record and OOB-node headers (5 integers).
pub const HEADER_BUF_SIZE: usize = 5 * COMPR_INT_MAX64;
