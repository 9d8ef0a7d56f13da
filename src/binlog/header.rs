//! Binlog file header page parsing.
//!
//! Page 0 of every `.ibb` file is a fixed 512-byte header page, independent
//! of the data page size. It carries the page size of the file, the format
//! version and the file's own id, and is protected by a CRC-32C trailer like
//! every other page.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic `FE FE 0D 01` |
//! | 4 | 4 | log2(page size) |
//! | 8 | 4 | Major format version |
//! | 12 | 4 | Minor format version |
//! | 16 | 8 | File id |
//! | 24 | 8 | File size in pages |
//! | 32 | 8 | Start LSN |
//! | 508 | 4 | CRC-32C of bytes 0..508 |
//!
//! All integers are little-endian.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::binlog::checksum::{calculate_page_checksum, stored_page_checksum};
use crate::binlog::constants::*;
use crate::IbbError;

/// Parsed header page of a binlog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    /// Whether the magic bytes match [`INNODB_BINLOG_MAGIC`].
    ///
    /// Reported only; readers do not reject a file on a magic mismatch.
    pub magic_ok: bool,
    /// log2 of the data page size.
    pub page_size_shift: u32,
    /// Major format version.
    pub vers_major: u32,
    /// Minor format version.
    pub vers_minor: u32,
    /// Id of this file (the `NNNNNN` in `binlog-NNNNNN.ibb`).
    pub file_no: u64,
    /// File size in pages as preallocated by the writer.
    pub size_in_pages: u64,
    /// LSN at which the file was started.
    pub start_lsn: u64,
}

impl FileHeader {
    /// Parse and validate a header page.
    ///
    /// `page` must hold at least [`BINLOG_HEADER_PAGE_SIZE`] bytes. Fails if
    /// the checksum does not match, the major version is newer than
    /// [`INNODB_BINLOG_FILE_VERS_MAJOR`], or the page size is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use byteorder::{ByteOrder, LittleEndian};
    /// use ibb::binlog::checksum::write_page_checksum;
    /// use ibb::binlog::constants::*;
    /// use ibb::binlog::header::FileHeader;
    ///
    /// let mut page = vec![0u8; BINLOG_HEADER_PAGE_SIZE as usize];
    /// page[..4].copy_from_slice(&INNODB_BINLOG_MAGIC);
    /// LittleEndian::write_u32(&mut page[BINLOG_HEADER_PAGE_SIZE_SHIFT..], 12);
    /// LittleEndian::write_u32(&mut page[BINLOG_HEADER_VERS_MAJOR..], 1);
    /// LittleEndian::write_u64(&mut page[BINLOG_HEADER_FILE_NO..], 7);
    /// write_page_checksum(&mut page);
    ///
    /// let hdr = FileHeader::parse(&page).unwrap();
    /// assert_eq!(hdr.page_size(), 4096);
    /// assert_eq!(hdr.file_no, 7);
    /// ```
    pub fn parse(page: &[u8]) -> Result<Self, IbbError> {
        let size = BINLOG_HEADER_PAGE_SIZE as usize;
        if page.len() < size {
            return Err(IbbError::Parse(format!(
                "Header page too small: {} bytes, need {}",
                page.len(),
                size
            )));
        }
        let page = &page[..size];

        if stored_page_checksum(page) != calculate_page_checksum(page) {
            return Err(IbbError::Parse(
                "Invalid checksum on first page, cannot read binlog file".to_string(),
            ));
        }

        let vers_major = LittleEndian::read_u32(&page[BINLOG_HEADER_VERS_MAJOR..]);
        if vers_major > INNODB_BINLOG_FILE_VERS_MAJOR {
            return Err(IbbError::UnsupportedVersion {
                found: vers_major,
                supported: INNODB_BINLOG_FILE_VERS_MAJOR,
            });
        }

        let page_size_shift = LittleEndian::read_u32(&page[BINLOG_HEADER_PAGE_SIZE_SHIFT..]);
        if !(BINLOG_PAGE_SIZE_SHIFT_MIN..=BINLOG_PAGE_SIZE_SHIFT_MAX).contains(&page_size_shift) {
            return Err(IbbError::Parse(format!(
                "Invalid page size shift {} in binlog header",
                page_size_shift
            )));
        }

        Ok(FileHeader {
            magic_ok: page[BINLOG_HEADER_MAGIC..BINLOG_HEADER_MAGIC + 4] == INNODB_BINLOG_MAGIC,
            page_size_shift,
            vers_major,
            vers_minor: LittleEndian::read_u32(&page[BINLOG_HEADER_VERS_MINOR..]),
            file_no: LittleEndian::read_u64(&page[BINLOG_HEADER_FILE_NO..]),
            size_in_pages: LittleEndian::read_u64(&page[BINLOG_HEADER_SIZE_IN_PAGES..]),
            start_lsn: LittleEndian::read_u64(&page[BINLOG_HEADER_START_LSN..]),
        })
    }

    /// Data page size in bytes.
    pub fn page_size(&self) -> u32 {
        1 << self.page_size_shift
    }

    /// Serialize back into a header page (used to build fixtures).
    pub fn to_page(&self) -> Vec<u8> {
        let mut page = vec![0u8; BINLOG_HEADER_PAGE_SIZE as usize];
        page[BINLOG_HEADER_MAGIC..BINLOG_HEADER_MAGIC + 4].copy_from_slice(&INNODB_BINLOG_MAGIC);
        LittleEndian::write_u32(&mut page[BINLOG_HEADER_PAGE_SIZE_SHIFT..], self.page_size_shift);
        LittleEndian::write_u32(&mut page[BINLOG_HEADER_VERS_MAJOR..], self.vers_major);
        LittleEndian::write_u32(&mut page[BINLOG_HEADER_VERS_MINOR..], self.vers_minor);
        LittleEndian::write_u64(&mut page[BINLOG_HEADER_FILE_NO..], self.file_no);
        LittleEndian::write_u64(&mut page[BINLOG_HEADER_SIZE_IN_PAGES..], self.size_in_pages);
        LittleEndian::write_u64(&mut page[BINLOG_HEADER_START_LSN..], self.start_lsn);
        crate::binlog::checksum::write_page_checksum(&mut page);
        page
    }
}
