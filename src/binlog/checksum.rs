//! Page checksum validation.
//!
//! Every binlog page (the 512-byte header page included) ends with a 4-byte
//! little-endian CRC-32C of everything before it. A page that is entirely
//! zero has not been written yet and is accepted as valid.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::binlog::constants::BINLOG_PAGE_CHECKSUM;

/// Outcome of validating one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Stored checksum matches the page payload.
    Valid,
    /// Page is all zero bytes (not yet written).
    Empty,
    /// Stored checksum does not match and the page is not empty.
    Invalid,
}

/// Result of a checksum validation.
#[derive(Debug, Clone, Serialize)]
pub struct ChecksumResult {
    pub status: PageStatus,
    pub stored_checksum: u32,
    pub calculated_checksum: u32,
}

impl ChecksumResult {
    /// True for [`PageStatus::Valid`] and [`PageStatus::Empty`].
    pub fn is_ok(&self) -> bool {
        self.status != PageStatus::Invalid
    }
}

/// Calculate the CRC-32C of a page payload (everything but the trailer).
pub fn calculate_page_checksum(page: &[u8]) -> u32 {
    let payload = page.len() - BINLOG_PAGE_CHECKSUM;
    crc32c::crc32c(&page[..payload])
}

/// Read the checksum stored in the page trailer.
pub fn stored_page_checksum(page: &[u8]) -> u32 {
    LittleEndian::read_u32(&page[page.len() - BINLOG_PAGE_CHECKSUM..])
}

/// Validate a page's checksum.
///
/// `page` must be exactly one page long; its last four bytes are the trailer.
pub fn validate_page_checksum(page: &[u8]) -> ChecksumResult {
    if page.len() <= BINLOG_PAGE_CHECKSUM {
        return ChecksumResult {
            status: PageStatus::Invalid,
            stored_checksum: 0,
            calculated_checksum: 0,
        };
    }

    let stored_checksum = stored_page_checksum(page);
    let calculated_checksum = calculate_page_checksum(page);

    let status = if stored_checksum == calculated_checksum {
        PageStatus::Valid
    } else if page.iter().all(|&b| b == 0) {
        PageStatus::Empty
    } else {
        PageStatus::Invalid
    };

    ChecksumResult {
        status,
        stored_checksum,
        calculated_checksum,
    }
}

/// Compute and store the trailer checksum of a page.
pub fn write_page_checksum(page: &mut [u8]) {
    let crc = calculate_page_checksum(page);
    let trailer = page.len() - BINLOG_PAGE_CHECKSUM;
    LittleEndian::write_u32(&mut page[trailer..], crc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_page_is_empty() {
        let page = vec![0u8; 4096];
        let result = validate_page_checksum(&page);
        assert_eq!(result.status, PageStatus::Empty);
        assert!(result.is_ok());
    }

    #[test]
    fn test_written_checksum_validates() {
        let mut page = vec![0u8; 4096];
        page[0] = 0x41;
        page[1] = 5;
        write_page_checksum(&mut page);
        let result = validate_page_checksum(&page);
        assert_eq!(result.status, PageStatus::Valid);
        assert_eq!(result.stored_checksum, result.calculated_checksum);
    }

    #[test]
    fn test_single_bit_flip_is_invalid() {
        let mut page = vec![0xffu8; 1024];
        write_page_checksum(&mut page);
        page[100] ^= 0x01;
        let result = validate_page_checksum(&page);
        assert_eq!(result.status, PageStatus::Invalid);
        assert!(!result.is_ok());
    }

    #[test]
    fn test_zero_payload_with_wrong_trailer_is_invalid() {
        let mut page = vec![0u8; 512];
        LittleEndian::write_u32(&mut page[508..], 0xDEADBEEF);
        assert_eq!(validate_page_checksum(&page).status, PageStatus::Invalid);
    }

    #[test]
    fn test_too_short_buffer() {
        assert_eq!(validate_page_checksum(&[0u8; 4]).status, PageStatus::Invalid);
    }
}
