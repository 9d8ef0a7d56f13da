//! Chunk-level reading of binlog pages.
//!
//! Data pages hold a sequence of chunks, `[type:1][len:2 LE][len bytes]`,
//! packed from the start of the page and padded with `0xFF` filler. A
//! record is a run of chunks of one type: the first without the CONT flag,
//! every following one with CONT, and the final one with LAST. Records are
//! split at page boundaries and may continue into the next file.
//!
//! [`ChunkReader`] presents the payload of the record at its cursor as a
//! byte stream. GTID state and dummy records may be written in the middle of
//! another record; they are skipped without disturbing it. Any other break
//! in the framing is reported as corruption with the file and page where it
//! was found.
//!
//! Reads come in two granularities. A cross-page read keeps going until the
//! buffer is full or the record ends. A single-page read stops at the end of
//! the current page, so each call fetches at most one page from disk.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, error, trace};

use crate::binlog::checksum::{validate_page_checksum, PageStatus};
use crate::binlog::constants::*;
use crate::binlog::file::{BinlogFile, BinlogSource};
use crate::binlog::header::FileHeader;
use crate::binlog::varint::read_compressed;
use crate::IbbError;

/// Location of a record: file id and byte offset within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub file_no: u64,
    pub offset: u64,
}

impl Location {
    pub fn new(file_no: u64, offset: u64) -> Self {
        Location { file_no, offset }
    }

    /// The all-zero location, meaning "no link".
    pub fn is_null(&self) -> bool {
        self.file_no == 0 && self.offset == 0
    }
}

/// Snapshot of a [`ChunkReader`] cursor.
///
/// Obtained from [`ChunkReader::save_pos`] and handed back to
/// [`ChunkReader::restore_pos`] to resume reading at the same point, in the
/// middle of a chunk if need be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedPosition {
    file_no: u64,
    page_no: u32,
    /// Start of the current chunk inside the page.
    in_page_offset: u32,
    /// Length of the current chunk, valid while `chunk_loaded`.
    chunk_len: u32,
    /// Read position inside the current chunk.
    chunk_read_offset: u32,
    /// Type byte of the current (or last) chunk, flags included.
    chunk_type: u8,
    chunk_loaded: bool,
    /// Discard the rest of the current record instead of copying it.
    skip_current: bool,
    /// Set while in the middle of a record.
    in_record: bool,
}

impl SavedPosition {
    fn at(file_no: u64, page_no: u32, in_page_offset: u32) -> Self {
        SavedPosition {
            file_no,
            page_no,
            in_page_offset,
            chunk_len: 0,
            chunk_read_offset: 0,
            chunk_type: FSP_BINLOG_TYPE_FILLER,
            chunk_loaded: false,
            skip_current: false,
            in_record: false,
        }
    }

    pub fn file_no(&self) -> u64 {
        self.file_no
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    /// Offset of the current chunk within its page.
    pub fn in_page_offset(&self) -> u32 {
        self.in_page_offset
    }

    pub fn in_record(&self) -> bool {
        self.in_record
    }
}

struct OpenFile {
    file_no: u64,
    file: BinlogFile,
}

/// Result of trying to load the chunk at the cursor.
enum ChunkLoad {
    /// A chunk of the current (or a new) record is ready to read.
    Loaded,
    /// The cursor moved past filler or a chunk that is not part of the record.
    Skipped,
    /// An EMPTY chunk: nothing has been written from here on.
    Empty,
    /// The cursor is at the end of the file data.
    EndOfFile,
}

/// Reads records chunk by chunk from a sequence of binlog files.
pub struct ChunkReader {
    source: Box<dyn BinlogSource>,
    s: SavedPosition,
    file: Option<OpenFile>,
    page: Vec<u8>,
    page_loaded: bool,
    page_size: u32,
    skipping_partial: bool,
}

impl ChunkReader {
    /// Create a reader over `file`, whose header page is parsed first.
    ///
    /// Following files are opened through `source` by id. The cursor starts
    /// at the first data page of `file`.
    pub fn open(source: Box<dyn BinlogSource>, mut file: BinlogFile) -> Result<Self, IbbError> {
        let header = file.read_header()?;
        let page_size = header.page_size();
        debug!(
            file = file.name(),
            file_no = header.file_no,
            page_size,
            "Parsed binlog file header"
        );
        Ok(ChunkReader {
            source,
            s: SavedPosition::at(header.file_no, BINLOG_FIRST_DATA_PAGE, 0),
            file: Some(OpenFile {
                file_no: header.file_no,
                file,
            }),
            page: vec![0u8; page_size as usize],
            page_loaded: false,
            page_size,
            skipping_partial: false,
        })
    }

    /// Replace the open file with `file` and parse its header.
    ///
    /// The cursor's file id becomes the id found in the header; the page and
    /// in-page offset are left as they are.
    pub fn set_file(&mut self, file: BinlogFile) -> Result<FileHeader, IbbError> {
        self.file = Some(OpenFile {
            file_no: self.s.file_no,
            file,
        });
        self.page_loaded = false;
        self.parse_file_header()
    }

    /// Read the header page of the open file and adopt its page size and id.
    pub fn parse_file_header(&mut self) -> Result<FileHeader, IbbError> {
        let open = self
            .file
            .as_mut()
            .ok_or_else(|| IbbError::Argument("No binlog file is open".to_string()))?;
        let header = open.file.read_header()?;
        open.file_no = header.file_no;
        debug!(
            file = open.file.name(),
            file_no = header.file_no,
            page_size = header.page_size(),
            "Parsed binlog file header"
        );

        self.s.file_no = header.file_no;
        self.page_size = header.page_size();
        self.page.resize(self.page_size as usize, 0);
        self.page_loaded = false;
        Ok(header)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Type tag of the current chunk, or the filler tag between records.
    pub fn cur_type(&self) -> u8 {
        self.s.chunk_type & FSP_BINLOG_TYPE_MASK
    }

    pub fn cur_is_cont(&self) -> bool {
        self.s.chunk_type & FSP_BINLOG_FLAG_CONT != 0
    }

    pub fn end_of_record(&self) -> bool {
        !self.s.in_record
    }

    /// Byte offset of the cursor within the current file.
    pub fn current_pos(&self) -> u64 {
        self.s.page_no as u64 * self.page_size as u64 + self.s.in_page_offset as u64
    }

    /// Current cursor, identical to [`save_pos`](Self::save_pos).
    pub fn position(&self) -> SavedPosition {
        self.s
    }

    fn file_len(&self) -> u64 {
        self.file.as_ref().map_or(u64::MAX, |f| f.file.len())
    }

    /// True when no further chunk can start on the current page.
    pub fn is_end_of_page(&self) -> bool {
        self.s.in_page_offset as usize
            >= self.page_size as usize - (BINLOG_PAGE_DATA_END + BINLOG_CHUNK_HEADER)
    }

    /// True when no further chunk can start in the open file.
    ///
    /// Always false while no file is open, since the length is unknown.
    pub fn is_end_of_file(&self) -> bool {
        self.current_pos()
            .saturating_add((BINLOG_PAGE_DATA_END + BINLOG_CHUNK_HEADER) as u64)
            >= self.file_len()
    }

    /// Build a corruption error for the current cursor and log it.
    pub fn corruption(&self, reason: &str) -> IbbError {
        report_corruption(self.s.file_no, self.s.page_no as u64, reason)
    }

    /// Discard the rest of the current record on subsequent reads.
    pub fn skip_current(&mut self) {
        if self.s.in_record {
            self.s.skip_current = true;
        }
    }

    /// Skip leading continuation chunks instead of treating them as corrupt.
    ///
    /// Used after seeking to a position that may be in the middle of a
    /// record, until the first real record start has been found.
    pub fn skip_partial(&mut self, skip: bool) {
        self.skipping_partial = skip;
    }

    pub fn save_pos(&self) -> SavedPosition {
        self.s
    }

    /// Restore a saved cursor. A different file is reopened lazily.
    pub fn restore_pos(&mut self, pos: &SavedPosition) {
        if self.file.as_ref().is_some_and(|f| f.file_no != pos.file_no) {
            trace!(from = self.s.file_no, to = pos.file_no, "Closing binlog file on restore");
            self.file = None;
        }
        self.s = *pos;
        self.page_loaded = false;
    }

    /// Move the cursor to the start of a chunk at `offset` in `file_no`.
    ///
    /// Offsets whose page number does not fit in 32 bits cannot come from a
    /// valid log and are reported as corruption at the current cursor.
    pub fn seek(&mut self, file_no: u64, offset: u64) -> Result<(), IbbError> {
        let page_size = self.page_size as u64;
        let page_no = u32::try_from(offset / page_size)
            .map_err(|_| self.corruption("Binlog position out of range"))?;
        let pos = SavedPosition::at(file_no, page_no, (offset % page_size) as u32);
        self.restore_pos(&pos);
        Ok(())
    }

    fn next_file(&mut self) {
        self.file = None;
        self.s.file_no += 1;
        self.s.page_no = BINLOG_FIRST_DATA_PAGE;
        self.s.in_page_offset = 0;
        debug!(file_no = self.s.file_no, "Moving to next binlog file");
    }

    fn next_page(&mut self) {
        self.s.page_no += 1;
        self.s.in_page_offset = 0;
        self.page_loaded = false;
        if self.file.is_some()
            && self.s.page_no as u64 * self.page_size as u64 >= self.file_len()
        {
            self.next_file();
        }
    }

    /// Load the page at the cursor, moving on to the next file at end of file.
    fn fetch_current_page(&mut self) -> Result<(), IbbError> {
        self.page_loaded = false;
        loop {
            let mut open = match self.file.take() {
                Some(open) => open,
                None => OpenFile {
                    file_no: self.s.file_no,
                    file: self.source.open_file(self.s.file_no)?,
                },
            };

            if self.current_pos() >= open.file.len() {
                self.next_file();
                continue;
            }

            let n = open.file.read_page(self.s.page_no, &mut self.page)?;
            if n < self.page.len() {
                self.next_file();
                continue;
            }

            self.file = Some(open);
            break;
        }

        trace!(file_no = self.s.file_no, page_no = self.s.page_no, "Fetched binlog page");
        if validate_page_checksum(&self.page).status == PageStatus::Invalid {
            return Err(self.corruption("Page checksum mismatch"));
        }
        self.page_loaded = true;
        Ok(())
    }

    /// Step past a chunk of `chunk_len` bytes, onto the next page if needed.
    fn end_chunk(&mut self, chunk_len: u32) {
        self.s.in_page_offset += BINLOG_CHUNK_HEADER as u32 + chunk_len;
        self.s.chunk_loaded = false;
        self.s.chunk_len = 0;
        self.s.chunk_read_offset = 0;
        if self.is_end_of_page() && self.current_pos() < self.file_len() {
            self.next_page();
        }
    }

    /// Finish the current chunk, ending the record on a LAST chunk.
    fn finish_chunk(&mut self) {
        self.end_chunk(self.s.chunk_len);
        if self.s.chunk_type & FSP_BINLOG_FLAG_LAST != 0 {
            self.s.in_record = false;
            self.s.skip_current = false;
        }
    }

    /// Validate and load the chunk at the cursor. The page must be loaded.
    fn load_chunk(&mut self) -> Result<ChunkLoad, IbbError> {
        if self.current_pos() >= self.file_len() {
            return Ok(ChunkLoad::EndOfFile);
        }

        let off = self.s.in_page_offset as usize;
        if self.is_end_of_page() || self.page[off] == FSP_BINLOG_TYPE_FILLER {
            self.next_page();
            return Ok(ChunkLoad::Skipped);
        }

        let type_byte = self.page[off];
        if type_byte == FSP_BINLOG_TYPE_EMPTY {
            return Ok(ChunkLoad::Empty);
        }

        let chunk_len = LittleEndian::read_u16(&self.page[off + 1..]) as u32;
        if off + BINLOG_CHUNK_HEADER + chunk_len as usize > self.page.len() - BINLOG_PAGE_DATA_END {
            return Err(self.corruption("Chunk extends past end of page"));
        }

        if !self.s.in_record {
            if type_byte & FSP_BINLOG_FLAG_CONT != 0 {
                if self.skipping_partial {
                    trace!(file_no = self.s.file_no, page_no = self.s.page_no, "Skipping partial record chunk");
                    self.end_chunk(chunk_len);
                    return Ok(ChunkLoad::Skipped);
                }
                return Err(self.corruption("Binlog record starts with continuation chunk"));
            }
        } else {
            if (type_byte ^ self.s.chunk_type) & FSP_BINLOG_TYPE_MASK != 0 {
                if ALLOWED_NESTED_RECORDS & (1u64 << (type_byte & FSP_BINLOG_TYPE_MASK)) != 0 {
                    self.end_chunk(chunk_len);
                    return Ok(ChunkLoad::Skipped);
                }
                return Err(self.corruption("Binlog record missing end chunk"));
            }
            if type_byte & FSP_BINLOG_FLAG_CONT == 0 {
                return Err(self.corruption("Binlog record missing end chunk"));
            }
        }

        self.s.chunk_type = type_byte;
        self.s.in_record = true;
        self.s.chunk_len = chunk_len;
        self.s.chunk_read_offset = 0;
        self.s.chunk_loaded = true;
        Ok(ChunkLoad::Loaded)
    }

    /// Read up to `buf.len()` bytes of the record at the cursor.
    ///
    /// With `multipage`, keeps reading following chunks across pages and
    /// files until `buf` is full or the record ends. Without it, stops at the
    /// end of the current page even if the record continues.
    ///
    /// Returns the number of bytes read; 0 means there is no more data (an
    /// EMPTY chunk or the end of the file data).
    pub fn read(&mut self, buf: &mut [u8], multipage: bool) -> Result<usize, IbbError> {
        let mut sofar = 0;
        loop {
            if sofar == buf.len() {
                return Ok(sofar);
            }
            if !self.page_loaded {
                self.fetch_current_page()?;
            }

            if !self.s.chunk_loaded {
                match self.load_chunk()? {
                    ChunkLoad::Loaded => {}
                    ChunkLoad::Skipped => {
                        if sofar > 0 && (!multipage || !self.s.in_record) {
                            return Ok(sofar);
                        }
                        continue;
                    }
                    ChunkLoad::Empty => return Ok(0),
                    ChunkLoad::EndOfFile => return Ok(sofar),
                }
            }

            if self.s.skip_current {
                self.s.chunk_read_offset = self.s.chunk_len;
            } else {
                let avail = (self.s.chunk_len - self.s.chunk_read_offset) as usize;
                let size = avail.min(buf.len() - sofar);
                let start = self.s.in_page_offset as usize
                    + BINLOG_CHUNK_HEADER
                    + self.s.chunk_read_offset as usize;
                buf[sofar..sofar + size].copy_from_slice(&self.page[start..start + size]);
                self.s.chunk_read_offset += size as u32;
                sofar += size;
            }

            if self.s.chunk_read_offset < self.s.chunk_len {
                return Ok(sofar);
            }

            self.finish_chunk();
            if sofar > 0 && (!multipage || !self.s.in_record) {
                return Ok(sofar);
            }
        }
    }

    /// Discard the remainder of the current record, stopping at its end.
    pub fn skip_record(&mut self) -> Result<(), IbbError> {
        self.skip_current();
        while self.s.in_record {
            if !self.page_loaded {
                self.fetch_current_page()?;
            }
            if !self.s.chunk_loaded {
                match self.load_chunk()? {
                    ChunkLoad::Loaded => {}
                    ChunkLoad::Skipped => continue,
                    ChunkLoad::Empty | ChunkLoad::EndOfFile => return Ok(()),
                }
            }
            self.finish_chunk();
        }
        Ok(())
    }
}

/// Report corrupt binlog data found on `page_no` of file `file_no`.
pub fn report_corruption(file_no: u64, page_no: u64, reason: &str) -> IbbError {
    error!(file_no, page_no, reason, "Corrupt InnoDB binlog");
    IbbError::Corrupt {
        file_no,
        page_no,
        reason: reason.to_string(),
    }
}

/// Small header read from the front of a record, plus its leftover bytes.
///
/// Commit records and OOB nodes start with a few compressed integers. The
/// header is read with one cross-page read of up to [`HEADER_BUF_SIZE`]
/// bytes; whatever follows the decoded integers in that buffer is record
/// payload and must be handed out before reading on from the chunk reader.
#[derive(Debug, Clone)]
pub struct HeaderBuf {
    buf: [u8; HEADER_BUF_SIZE],
    len: usize,
    pos: usize,
}

impl HeaderBuf {
    /// Read the start of the record at the cursor of `chunk_rd`.
    pub fn fill(chunk_rd: &mut ChunkReader) -> Result<Self, IbbError> {
        let mut buf = [0u8; HEADER_BUF_SIZE];
        let len = chunk_rd.read(&mut buf, true)?;
        Ok(HeaderBuf { buf, len, pos: 0 })
    }

    /// Number of bytes read from the record.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decode the next compressed integer.
    pub fn next_int(&mut self, chunk_rd: &ChunkReader) -> Result<u64, IbbError> {
        match read_compressed(&self.buf[self.pos..self.len]) {
            Some((v, used)) => {
                self.pos += used;
                Ok(v)
            }
            None => Err(chunk_rd.corruption("Short chunk")),
        }
    }

    /// Leftover payload bytes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.len - self.pos
    }

    /// Copy leftover payload bytes into `out`; returns the count copied.
    pub fn drain(&mut self, out: &mut [u8]) -> usize {
        let size = self.remaining().min(out.len());
        out[..size].copy_from_slice(&self.buf[self.pos..self.pos + size]);
        self.pos += size;
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::builder::LogBuilder;
    use crate::binlog::checksum::write_page_checksum;
    use crate::binlog::file::{CountingBinlogs, MemoryBinlogs};

    fn reader_for(files: &MemoryBinlogs, file_no: u64) -> ChunkReader {
        let file = files.open_file(file_no).unwrap();
        ChunkReader::open(Box::new(files.clone()), file).unwrap()
    }

    fn payload(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    fn read_record(rd: &mut ChunkReader, at: Location) -> Vec<u8> {
        rd.seek(at.file_no, at.offset).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 777];
        loop {
            let n = rd.read(&mut buf, true).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n == 0 || rd.end_of_record() {
                return out;
            }
        }
    }

    #[test]
    fn test_cross_page_read_reassembles_any_split() {
        for (page_size, max_chunk) in [(512u32, 7usize), (512, 505), (1024, 64), (4096, 3000)] {
            let data = payload(5000, max_chunk as u8);
            let mut b = LogBuilder::new(page_size, 1).max_chunk(max_chunk);
            b.record(FSP_BINLOG_TYPE_COMMIT, b"lead");
            let at = b.record(FSP_BINLOG_TYPE_COMMIT, &data);
            b.zero_pages(1);
            let files = b.finish();
            let mut rd = reader_for(&files, 1);
            assert_eq!(read_record(&mut rd, at), data, "page {page_size} chunk {max_chunk}");
            assert!(rd.end_of_record());
        }
    }

    #[test]
    fn test_record_spanning_files() {
        let data = payload(3000, 9);
        let mut b = LogBuilder::new(512, 4).pages_per_file(3);
        let at = b.record(FSP_BINLOG_TYPE_COMMIT, &data);
        let files = b.finish();
        assert!(files.get(5).is_some());
        let mut rd = reader_for(&files, 4);
        assert_eq!(read_record(&mut rd, at), data);
        assert_eq!(rd.position().file_no(), 5);
    }

    #[test]
    fn test_single_page_read_returns_prefix() {
        let data = payload(1200, 1);
        let mut b = LogBuilder::new(512, 1);
        b.record(FSP_BINLOG_TYPE_COMMIT, &data);
        b.zero_pages(1);
        let files = b.finish();
        let mut rd = reader_for(&files, 1);

        let mut buf = vec![0u8; 4096];
        let n1 = rd.read(&mut buf, false).unwrap();
        assert_eq!(n1, 505);
        assert_eq!(rd.position().page_no(), 2);
        assert!(!rd.end_of_record());
        let n2 = rd.read(&mut buf[n1..], false).unwrap();
        assert_eq!(n2, 505);
        let n3 = rd.read(&mut buf[n1 + n2..], false).unwrap();
        assert_eq!(n3, 190);
        assert!(rd.end_of_record());
        assert_eq!(&buf[..1200], &data[..]);
        // next page is all zero: clean end of data
        assert_eq!(rd.read(&mut buf, false).unwrap(), 0);
    }

    #[test]
    fn test_single_page_read_fetches_at_most_one_page() {
        let mut b = LogBuilder::new(512, 1).pages_per_file(3);
        b.record(FSP_BINLOG_TYPE_COMMIT, &payload(1200, 3));
        b.record(FSP_BINLOG_TYPE_GTID_STATE, &payload(40, 4));
        b.record(FSP_BINLOG_TYPE_COMMIT, &payload(900, 5));
        let files = b.finish();
        assert!(files.get(2).is_some());

        let (source, page_reads) = CountingBinlogs::new(files);
        let file = source.open_file(1).unwrap();
        let mut rd = ChunkReader::open(Box::new(source), file).unwrap();
        let mut buf = vec![0u8; 8192];
        let mut total = 0;
        let mut calls = 0;
        loop {
            page_reads.set(0);
            let n = rd.read(&mut buf, false).unwrap();
            assert!(page_reads.get() <= 1, "call {calls} read {} pages", page_reads.get());
            if n == 0 {
                break;
            }
            total += n;
            calls += 1;
        }
        assert_eq!(total, 1200 + 40 + 900);
        assert!(calls >= 5);
    }

    #[test]
    fn test_small_buffer_resumes_mid_chunk() {
        let data = payload(300, 2);
        let mut b = LogBuilder::new(1024, 1);
        b.record(FSP_BINLOG_TYPE_COMMIT, &data);
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut out = Vec::new();
        let mut buf = [0u8; 17];
        while !rd.end_of_record() || out.is_empty() {
            let n = rd.read(&mut buf, false).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_nested_gtid_state_and_dummy_are_transparent() {
        let mut b = LogBuilder::new(1024, 1);
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT, b"hello ");
        b.raw_chunk(FSP_BINLOG_TYPE_GTID_STATE, b"gtid-1");
        b.raw_chunk(FSP_BINLOG_TYPE_GTID_STATE | FSP_BINLOG_FLAG_CONT | FSP_BINLOG_FLAG_LAST, b"gtid-2");
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT | FSP_BINLOG_FLAG_CONT, b"nested ");
        b.raw_chunk(FSP_BINLOG_TYPE_DUMMY | FSP_BINLOG_FLAG_LAST, &[0u8; 20]);
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT | FSP_BINLOG_FLAG_CONT | FSP_BINLOG_FLAG_LAST, b"world");
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut buf = [0u8; 64];
        let n = rd.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..n], b"hello nested world");
        assert!(rd.end_of_record());
    }

    #[test]
    fn test_leading_continuation_chunk_rejected() {
        let mut b = LogBuilder::new(512, 3);
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT | FSP_BINLOG_FLAG_CONT | FSP_BINLOG_FLAG_LAST, b"tail");
        let files = b.finish();
        let mut rd = reader_for(&files, 3);
        let mut buf = [0u8; 16];
        match rd.read(&mut buf, true) {
            Err(IbbError::Corrupt { file_no, page_no, reason }) => {
                assert_eq!(file_no, 3);
                assert_eq!(page_no, 1);
                assert!(reason.contains("continuation"), "{reason}");
            }
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_partial_resumes_at_next_record() {
        let mut b = LogBuilder::new(512, 1);
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT | FSP_BINLOG_FLAG_CONT, b"stale-1");
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT | FSP_BINLOG_FLAG_CONT | FSP_BINLOG_FLAG_LAST, b"stale-2");
        b.record(FSP_BINLOG_TYPE_COMMIT, b"fresh");
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        rd.skip_partial(true);
        let mut buf = [0u8; 16];
        let n = rd.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..n], b"fresh");
    }

    #[test]
    fn test_type_change_mid_record_rejected() {
        let mut b = LogBuilder::new(512, 1);
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT, b"abc");
        b.raw_chunk(FSP_BINLOG_TYPE_OOB_DATA | FSP_BINLOG_FLAG_CONT | FSP_BINLOG_FLAG_LAST, b"def");
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut buf = [0u8; 16];
        let err = rd.read(&mut buf, true).unwrap_err();
        assert!(err.to_string().contains("missing end chunk"), "{err}");
    }

    #[test]
    fn test_new_record_before_last_chunk_rejected() {
        let mut b = LogBuilder::new(512, 1);
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT, b"abc");
        b.raw_chunk(FSP_BINLOG_TYPE_COMMIT | FSP_BINLOG_FLAG_LAST, b"def");
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut buf = [0u8; 16];
        assert!(matches!(rd.read(&mut buf, true), Err(IbbError::Corrupt { .. })));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let mut b = LogBuilder::new(512, 2);
        b.record(FSP_BINLOG_TYPE_COMMIT, b"payload");
        let files = b.finish();
        let mut image = files.get(2).unwrap().to_vec();
        image[512 + 5] ^= 0x40;
        let mut corrupted = MemoryBinlogs::new();
        corrupted.insert(2, image);
        let mut rd = reader_for(&corrupted, 2);
        let mut buf = [0u8; 16];
        match rd.read(&mut buf, true) {
            Err(IbbError::Corrupt { page_no, reason, .. }) => {
                assert_eq!(page_no, 1);
                assert!(reason.contains("checksum"));
            }
            other => panic!("expected checksum failure, got {other:?}"),
        }
    }

    #[test]
    fn test_chunk_overrunning_page_rejected() {
        let mut b = LogBuilder::new(512, 1);
        b.record(FSP_BINLOG_TYPE_COMMIT, b"x");
        let files = b.finish();
        let mut image = files.get(1).unwrap().to_vec();
        image[513] = 0xff;
        image[514] = 0x01;
        write_page_checksum(&mut image[512..1024]);
        let mut bad = MemoryBinlogs::new();
        bad.insert(1, image);
        let mut rd = reader_for(&bad, 1);
        let mut buf = [0u8; 16];
        let err = rd.read(&mut buf, true).unwrap_err();
        assert!(err.to_string().contains("past end of page"), "{err}");
    }

    #[test]
    fn test_save_restore_across_files() {
        let first = payload(900, 3);
        let second = payload(700, 4);
        let mut b = LogBuilder::new(512, 1).pages_per_file(2);
        let a = b.record(FSP_BINLOG_TYPE_COMMIT, &first);
        b.end_file();
        let c = b.record(FSP_BINLOG_TYPE_COMMIT, &second);
        let files = b.finish();
        assert_eq!(c.file_no, 2);

        let mut rd = reader_for(&files, 1);
        rd.seek(a.file_no, a.offset).unwrap();
        let mut head = [0u8; 100];
        assert_eq!(rd.read(&mut head, true).unwrap(), 100);
        let saved = rd.save_pos();

        assert_eq!(read_record(&mut rd, c), second);
        rd.restore_pos(&saved);
        let mut rest = vec![0u8; 2000];
        let n = rd.read(&mut rest, true).unwrap();
        assert_eq!(n, 800);
        assert_eq!(&rest[..n], &first[100..]);
    }

    #[test]
    fn test_skip_record_stops_at_record_end() {
        let mut b = LogBuilder::new(512, 1).max_chunk(50);
        b.record(FSP_BINLOG_TYPE_GTID_STATE, &payload(400, 5));
        b.record(FSP_BINLOG_TYPE_COMMIT, b"next");
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut buf = [0u8; 10];
        rd.read(&mut buf, true).unwrap();
        assert_eq!(rd.cur_type(), FSP_BINLOG_TYPE_GTID_STATE);
        rd.skip_record().unwrap();
        assert!(rd.end_of_record());
        let n = rd.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..n], b"next");
        assert_eq!(rd.cur_type(), FSP_BINLOG_TYPE_COMMIT);
    }

    #[test]
    fn test_end_of_file_and_rotation() {
        let mut b = LogBuilder::new(512, 1);
        b.end_file();
        b.record(FSP_BINLOG_TYPE_COMMIT, &payload(502, 6));
        b.end_file();
        let files = b.finish();
        assert!(files.get(3).is_none());

        let mut rd = reader_for(&files, 1);
        // file 1 holds only its header page
        assert!(rd.is_end_of_file());
        let mut buf = vec![0u8; 600];
        assert_eq!(rd.read(&mut buf, true).unwrap(), 502);
        assert_eq!(&buf[..502], &payload(502, 6)[..]);
        // the record filled its page, so the cursor already moved on
        assert_eq!(rd.position().file_no(), 3);
        assert!(!rd.is_end_of_file());
        assert!(rd.read(&mut buf, true).is_err());
    }

    #[test]
    fn test_unfinished_page_reads_as_end_of_data() {
        let mut b = LogBuilder::new(512, 1);
        b.record(FSP_BINLOG_TYPE_COMMIT, b"only");
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut buf = [0u8; 16];
        assert_eq!(rd.read(&mut buf, true).unwrap(), 4);
        assert_eq!(rd.read(&mut buf, true).unwrap(), 0);
        assert_eq!(rd.read(&mut buf, false).unwrap(), 0);
    }

    #[test]
    fn test_header_buf_decode_and_drain() {
        let mut body = Vec::new();
        crate::binlog::varint::write_compressed(&mut body, 3);
        crate::binlog::varint::write_compressed(&mut body, 70000);
        body.extend_from_slice(b"rest");
        let mut b = LogBuilder::new(512, 1);
        b.record(FSP_BINLOG_TYPE_COMMIT, &body);
        let files = b.finish();
        let mut rd = reader_for(&files, 1);
        let mut hdr = HeaderBuf::fill(&mut rd).unwrap();
        assert_eq!(hdr.len(), body.len());
        assert_eq!(hdr.next_int(&rd).unwrap(), 3);
        assert_eq!(hdr.next_int(&rd).unwrap(), 70000);
        let mut out = [0u8; 8];
        assert_eq!(hdr.drain(&mut out), 4);
        assert_eq!(&out[..4], b"rest");
        assert!(hdr.next_int(&rd).is_err());
    }
}
