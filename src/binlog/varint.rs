//! Compressed integers used in commit-record and OOB-node headers.
//!
//! The number of bytes is carried in the low 3 bits of the first byte:
//!
//! | Low bits | Total bytes | Value |
//! |----------|-------------|-------|
//! | `0..=6` | `low + 1` | little-endian word of all bytes, shifted right by 3 |
//! | `7` | 9 | little-endian `u64` of bytes 0..8 shifted right by 3, with byte 8 as bits 61..63 |
//!
//! So values below 2^5 take one byte, below 2^53 at most seven, and any
//! `u64` at most [`COMPR_INT_MAX64`] bytes.

use byteorder::{ByteOrder, LittleEndian};

use crate::binlog::constants::COMPR_INT_MAX64;

/// Decode one compressed integer from the front of `buf`.
///
/// Returns the value and the number of bytes consumed, or `None` when `buf`
/// ends before the encoding does.
///
/// # Examples
///
/// ```
/// use ibb::binlog::varint::{read_compressed, write_compressed};
///
/// let mut buf = Vec::new();
/// write_compressed(&mut buf, 300);
/// buf.push(0xaa);
/// assert_eq!(read_compressed(&buf), Some((300, 2)));
/// assert_eq!(read_compressed(&buf[..1]), None);
/// ```
pub fn read_compressed(buf: &[u8]) -> Option<(u64, usize)> {
    let first = *buf.first()?;
    let tag = (first & 7) as usize;
    if tag < 7 {
        let len = tag + 1;
        if buf.len() < len {
            return None;
        }
        Some((LittleEndian::read_uint(buf, len) >> 3, len))
    } else {
        if buf.len() < COMPR_INT_MAX64 {
            return None;
        }
        let low = LittleEndian::read_u64(&buf[..8]) >> 3;
        Some((low | ((buf[8] as u64) << 61), COMPR_INT_MAX64))
    }
}

/// Number of bytes [`write_compressed`] uses for `v`.
pub fn compressed_len(v: u64) -> usize {
    for len in 1..=7usize {
        if v < 1u64 << (8 * len - 3) {
            return len;
        }
    }
    COMPR_INT_MAX64
}

/// Append the compressed encoding of `v` to `out`.
///
/// The writer lives outside this crate; this is used to build fixtures.
pub fn write_compressed(out: &mut Vec<u8>, v: u64) {
    let len = compressed_len(v);
    if len < COMPR_INT_MAX64 {
        let word = (v << 3) | (len as u64 - 1);
        let mut tmp = [0u8; 8];
        LittleEndian::write_u64(&mut tmp, word);
        out.extend_from_slice(&tmp[..len]);
    } else {
        let mut tmp = [0u8; 8];
        LittleEndian::write_u64(&mut tmp, (v << 3) | 7);
        out.extend_from_slice(&tmp);
        out.push((v >> 61) as u8);
    }
}
