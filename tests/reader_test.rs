//! Integration tests for reading binlog files from disk.
//!
//! Fixtures are written into a temporary directory as `binlog-NNNNNN.ibb`,
//! either from [`LogBuilder`] images or assembled by hand with byteorder and
//! crc32c so the on-disk layout is checked independently of the builder.

use std::fs;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use tempfile::TempDir;

use ibb::binlog::builder::LogBuilder;
use ibb::binlog::constants::binlog_file_name;
use ibb::binlog::file::{BinlogDir, BinlogFile, MemoryBinlogs};
use ibb::binlog::reader::{open_binlog, BinlogReader};
use ibb::IbbError;

const PAGE_SIZE: usize = 512;

fn write_files(dir: &Path, files: &MemoryBinlogs, ids: std::ops::RangeInclusive<u64>) {
    for id in ids {
        let image = files.get(id).expect("file image should exist");
        fs::write(dir.join(binlog_file_name(id)), image).unwrap();
    }
}

fn read_all(rd: &mut BinlogReader) -> Result<Vec<u8>, IbbError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 300];
    loop {
        let n = rd.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_add(seed)).collect()
}

/// Header page for a 512-byte page file, checksummed.
fn header_page(file_no: u64, size_in_pages: u64) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    page[0..4].copy_from_slice(&[0xfe, 0xfe, 0x0d, 0x01]);
    LittleEndian::write_u32(&mut page[4..], 9);
    LittleEndian::write_u32(&mut page[8..], 1);
    LittleEndian::write_u32(&mut page[12..], 0);
    LittleEndian::write_u64(&mut page[16..], file_no);
    LittleEndian::write_u64(&mut page[24..], size_in_pages);
    LittleEndian::write_u64(&mut page[32..], 4711);
    seal(&mut page);
    page
}

fn seal(page: &mut [u8]) {
    let end = page.len() - 4;
    let crc = crc32c::crc32c(&page[..end]);
    LittleEndian::write_u32(&mut page[end..], crc);
}

fn push_chunk(page: &mut Vec<u8>, type_byte: u8, data: &[u8]) {
    page.push(type_byte);
    let mut len = [0u8; 2];
    LittleEndian::write_u16(&mut len, data.len() as u16);
    page.extend_from_slice(&len);
    page.extend_from_slice(data);
}

fn commit_payload(body: &[u8]) -> Vec<u8> {
    // A zero OOB count is the single byte 0.
    let mut p = vec![0u8];
    p.extend_from_slice(body);
    p
}

#[test]
fn test_hand_built_file() {
    let tmp = TempDir::new().unwrap();

    let mut page = Vec::new();
    push_chunk(&mut page, 0x02 | 0x40, b"gtid-state");
    push_chunk(&mut page, 0x01 | 0x40, &commit_payload(b"BEGIN;"));
    push_chunk(&mut page, 0x01, &commit_payload(b"INSERT "));
    page.resize(PAGE_SIZE - 4, 0xff);
    page.extend_from_slice(&[0u8; 4]);
    seal(&mut page);

    let mut page2 = Vec::new();
    push_chunk(&mut page2, 0x01 | 0x80 | 0x40, b"INTO t;");
    page2.resize(PAGE_SIZE, 0);
    seal(&mut page2);

    let mut image = header_page(3, 3);
    image.extend_from_slice(&page);
    image.extend_from_slice(&page2);
    let path = tmp.path().join(binlog_file_name(3));
    fs::write(&path, &image).unwrap();

    let mut file = BinlogFile::open(&path).unwrap();
    let header = file.read_header().unwrap();
    assert!(header.magic_ok);
    assert_eq!(header.file_no, 3);
    assert_eq!(header.page_size(), 512);
    assert_eq!(header.start_lsn, 4711);

    let mut rd = open_binlog(&path, 0).unwrap();
    assert_eq!(read_all(&mut rd).unwrap(), b"BEGIN;INSERT INTO t;");
}

#[test]
fn test_open_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = open_binlog(tmp.path().join("binlog-000001.ibb"), 0)
        .err()
        .expect("opening a missing file should fail");
    assert!(matches!(err, IbbError::Io(_)));
}

#[test]
fn test_bad_header_checksum_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut image = header_page(1, 1);
    image[20] ^= 0xff;
    let path = tmp.path().join(binlog_file_name(1));
    fs::write(&path, &image).unwrap();
    let err = open_binlog(&path, 0).err().expect("bad header should fail");
    assert!(err.to_string().contains("Invalid checksum on first page"));
}

#[test]
fn test_future_version_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut image = header_page(1, 1);
    LittleEndian::write_u32(&mut image[8..], 2);
    seal(&mut image);
    let path = tmp.path().join(binlog_file_name(1));
    fs::write(&path, &image).unwrap();
    let err = open_binlog(&path, 0).err().expect("future version should fail");
    assert!(matches!(
        err,
        IbbError::UnsupportedVersion {
            found: 2,
            supported: 1
        }
    ));
}

#[test]
fn test_follow_rotation_on_disk() {
    let tmp = TempDir::new().unwrap();
    let big = payload(1500, 7);
    let mut b = LogBuilder::new(512, 10).pages_per_file(2);
    b.commit(b"first", None, None);
    b.commit(&big, None, None);
    b.commit(b"last", None, None);
    let last_file = b.file_no();
    let files = b.finish();
    write_files(tmp.path(), &files, 10..=last_file);

    let dir = BinlogDir::new(tmp.path());
    let mut rd = open_binlog(dir.path_for(10), 0).unwrap();
    let mut out = read_all(&mut rd).unwrap();
    let mut next = 11;
    while dir.contains(next) {
        rd.reopen(BinlogFile::open(dir.path_for(next)).unwrap(), 0)
            .unwrap();
        out.extend(read_all(&mut rd).unwrap());
        next += 1;
    }

    let mut expected = b"first".to_vec();
    expected.extend_from_slice(&big);
    expected.extend_from_slice(b"last");
    assert_eq!(out, expected);
}

#[test]
fn test_oob_links_into_earlier_file() {
    let tmp = TempDir::new().unwrap();
    let nodes: Vec<Vec<u8>> = (0..5).map(|i| payload(250, i * 40)).collect();
    let slices: Vec<&[u8]> = nodes.iter().map(|n| n.as_slice()).collect();

    let mut b = LogBuilder::new(512, 1).pages_per_file(3);
    let forest = b.oob_forest(&slices);
    b.end_file();
    b.commit(b"tail", forest, None);
    let last_file = b.file_no();
    let files = b.finish();
    write_files(tmp.path(), &files, 1..=last_file);

    // Start at the file holding the commit record; the OOB nodes live in
    // earlier files and are reached through the directory.
    let path: PathBuf = BinlogDir::new(tmp.path()).path_for(last_file);
    let mut rd = open_binlog(&path, 0).unwrap();
    let mut expected = b"tail".to_vec();
    for n in &nodes {
        expected.extend_from_slice(n);
    }
    assert_eq!(read_all(&mut rd).unwrap(), expected);
}

#[test]
fn test_damaged_page_on_disk() {
    let tmp = TempDir::new().unwrap();
    let mut b = LogBuilder::new(512, 1);
    b.commit(b"good", None, None);
    b.end_page();
    b.commit(b"bad", None, None);
    let files = b.finish();
    let mut image = files.get(1).unwrap().to_vec();
    image[2 * PAGE_SIZE + 5] ^= 0x55;
    let path = tmp.path().join(binlog_file_name(1));
    fs::write(&path, &image).unwrap();

    let mut rd = open_binlog(&path, 0).unwrap();
    let err = read_all(&mut rd).expect_err("damaged page should fail");
    match err {
        IbbError::Corrupt {
            file_no, page_no, ..
        } => {
            assert_eq!(file_no, 1);
            assert_eq!(page_no, 2);
        }
        other => panic!("unexpected error {other}"),
    }
}
