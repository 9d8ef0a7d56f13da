//! Synthetic binlog images for tests and benchmarks.
//!
//! [`LogBuilder`] lays records out into checksummed pages the way the server
//! does: records are cut into chunks at page boundaries with CONT/LAST flags,
//! pages are padded with filler, and files rotate after a fixed number of
//! data pages. OOB data is written as a forest of perfect binary trees with
//! the same append rule the server uses, so readers can be exercised against
//! realistic layouts without a server.
//!
//! This is fixture code shared with the integration tests and benchmarks,
//! not a supported writer: it panics on input the server never produces.

use crate::binlog::checksum::write_page_checksum;
use crate::binlog::chunk::Location;
use crate::binlog::constants::*;
use crate::binlog::file::MemoryBinlogs;
use crate::binlog::header::FileHeader;
use crate::binlog::varint::write_compressed;

/// An OOB forest as referenced from a commit record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OobForest {
    /// Total number of nodes.
    pub count: u64,
    /// First node written.
    pub first: Location,
    /// Root of the most recently written tree.
    pub last: Location,
}

#[derive(Debug, Clone, Copy)]
struct TreeRoot {
    loc: Location,
    index: u64,
    height: u32,
}

/// Builds binlog file images page by page.
pub struct LogBuilder {
    page_size: usize,
    file_no: u64,
    pages_per_file: Option<usize>,
    max_chunk: usize,
    page: Vec<u8>,
    pages: Vec<Vec<u8>>,
    out: MemoryBinlogs,
}

impl LogBuilder {
    /// Start a log whose first file has id `first_file_no`.
    ///
    /// # Panics
    ///
    /// If `page_size` is not a power of two of at least 512 bytes.
    pub fn new(page_size: u32, first_file_no: u64) -> Self {
        assert!(page_size.is_power_of_two() && page_size >= BINLOG_HEADER_PAGE_SIZE);
        LogBuilder {
            page_size: page_size as usize,
            file_no: first_file_no,
            pages_per_file: None,
            max_chunk: u16::MAX as usize,
            page: Vec::new(),
            pages: Vec::new(),
            out: MemoryBinlogs::new(),
        }
    }

    /// Rotate to a new file after this many data pages.
    pub fn pages_per_file(mut self, pages: usize) -> Self {
        self.pages_per_file = Some(pages);
        self
    }

    /// Cap the payload of each chunk, forcing records into more chunks.
    pub fn max_chunk(mut self, len: usize) -> Self {
        self.max_chunk = len.clamp(1, u16::MAX as usize);
        self
    }

    pub fn file_no(&self) -> u64 {
        self.file_no
    }

    /// Location the next chunk will be written at.
    pub fn position(&mut self) -> Location {
        self.make_room();
        Location::new(
            self.file_no,
            (self.pages.len() as u64 + 1) * self.page_size as u64 + self.page.len() as u64,
        )
    }

    fn page_limit(&self) -> usize {
        self.page_size - BINLOG_PAGE_DATA_END
    }

    /// End the page if no further chunk can start on it.
    fn make_room(&mut self) {
        if self.page.len() + BINLOG_CHUNK_HEADER + BINLOG_PAGE_DATA_END >= self.page_size {
            self.end_page();
        }
    }

    /// Write one raw chunk with an explicit type byte.
    ///
    /// # Panics
    ///
    /// If the chunk does not fit in the rest of the current page.
    pub fn raw_chunk(&mut self, type_byte: u8, data: &[u8]) -> Location {
        let loc = self.position();
        assert!(self.page.len() + BINLOG_CHUNK_HEADER + data.len() <= self.page_limit());
        self.page.push(type_byte);
        self.page.extend_from_slice(&(data.len() as u16).to_le_bytes());
        self.page.extend_from_slice(data);
        loc
    }

    /// Payload room for a chunk starting at the current position.
    pub fn room(&mut self) -> usize {
        self.make_room();
        self.page_limit() - self.page.len() - BINLOG_CHUNK_HEADER
    }

    /// Write a whole record of type `tag`, split into chunks as needed.
    pub fn record(&mut self, tag: u8, payload: &[u8]) -> Location {
        let start = self.position();
        let mut sofar = 0;
        loop {
            let room = self.room().min(self.max_chunk);
            let size = room.min(payload.len() - sofar);
            let mut type_byte = tag;
            if sofar > 0 {
                type_byte |= FSP_BINLOG_FLAG_CONT;
            }
            if sofar + size == payload.len() {
                type_byte |= FSP_BINLOG_FLAG_LAST;
            }
            self.raw_chunk(type_byte, &payload[sofar..sofar + size]);
            sofar += size;
            if sofar == payload.len() {
                return start;
            }
        }
    }

    /// Write one OOB tree node.
    pub fn oob_node(&mut self, index: u64, left: Location, right: Location, data: &[u8]) -> Location {
        let mut payload = Vec::with_capacity(HEADER_BUF_SIZE + data.len());
        write_compressed(&mut payload, index);
        write_compressed(&mut payload, left.file_no);
        write_compressed(&mut payload, left.offset);
        write_compressed(&mut payload, right.file_no);
        write_compressed(&mut payload, right.offset);
        payload.extend_from_slice(data);
        self.record(FSP_BINLOG_TYPE_OOB_DATA, &payload)
    }

    /// Append OOB payloads as a forest of perfect binary trees.
    ///
    /// Each new node either merges the two most recent trees when they have
    /// equal height, or becomes a singleton tree whose leaf links back to the
    /// previous tree's root.
    pub fn oob_forest(&mut self, payloads: &[&[u8]]) -> Option<OobForest> {
        let mut roots: Vec<TreeRoot> = Vec::new();
        let mut first = None;
        for data in payloads {
            let n = roots.len();
            let index = roots.last().map_or(0, |r| r.index + 1);
            if n >= 2 && roots[n - 2].height == roots[n - 1].height {
                let (left, right) = (roots[n - 2], roots[n - 1]);
                let loc = self.oob_node(index, left.loc, right.loc, data);
                roots.truncate(n - 2);
                roots.push(TreeRoot { loc, index, height: left.height + 1 });
            } else {
                let back = roots.last().map_or(Location::default(), |r| r.loc);
                let loc = self.oob_node(index, Location::default(), back, data);
                first.get_or_insert(loc);
                roots.push(TreeRoot { loc, index, height: 0 });
            }
        }
        let last = roots.last()?;
        Some(OobForest {
            count: last.index + 1,
            first: first?,
            last: last.loc,
        })
    }

    /// Write a commit record with its OOB references and inline body.
    pub fn commit(
        &mut self,
        body: &[u8],
        oob: Option<OobForest>,
        oob2: Option<OobForest>,
    ) -> Location {
        let mut payload = Vec::with_capacity(HEADER_BUF_SIZE + body.len());
        match oob {
            Some(o) => {
                write_compressed(&mut payload, o.count);
                write_compressed(&mut payload, o.first.file_no);
                write_compressed(&mut payload, o.first.offset);
                write_compressed(&mut payload, o.last.file_no);
                write_compressed(&mut payload, o.last.offset);
                match oob2 {
                    Some(o2) => {
                        write_compressed(&mut payload, o2.count);
                        write_compressed(&mut payload, o2.first.file_no);
                        write_compressed(&mut payload, o2.first.offset);
                        write_compressed(&mut payload, o2.last.file_no);
                        write_compressed(&mut payload, o2.last.offset);
                    }
                    None => write_compressed(&mut payload, 0),
                }
            }
            None => write_compressed(&mut payload, 0),
        }
        payload.extend_from_slice(body);
        self.record(FSP_BINLOG_TYPE_COMMIT, &payload)
    }

    /// Pad the current page with filler and seal it.
    pub fn end_page(&mut self) {
        let mut page = std::mem::take(&mut self.page);
        page.resize(self.page_limit(), FSP_BINLOG_TYPE_FILLER);
        page.resize(self.page_size, 0);
        write_page_checksum(&mut page);
        self.pages.push(page);
        if self.pages_per_file.is_some_and(|n| self.pages.len() >= n) {
            self.end_file();
        }
    }

    /// Append `count` all-zero (not yet written) pages to the current file.
    pub fn zero_pages(&mut self, count: usize) {
        if !self.page.is_empty() {
            self.end_page();
        }
        for _ in 0..count {
            self.pages.push(vec![0u8; self.page_size]);
        }
    }

    /// Seal the current file and start the next one.
    ///
    /// The rest of a partly used last page is taken by a dummy record, so
    /// the file ends exactly where its last record does.
    pub fn end_file(&mut self) {
        if !self.page.is_empty() {
            if self.page.len() + BINLOG_CHUNK_HEADER + BINLOG_PAGE_DATA_END < self.page_size {
                let room = self.page_limit() - self.page.len() - BINLOG_CHUNK_HEADER;
                let pad = vec![0u8; room];
                self.raw_chunk(FSP_BINLOG_TYPE_DUMMY | FSP_BINLOG_FLAG_LAST, &pad);
            }
            let pages_per_file = self.pages_per_file.take();
            self.end_page();
            self.pages_per_file = pages_per_file;
        }
        self.write_file();
    }

    fn write_file(&mut self) {
        let header = FileHeader {
            magic_ok: true,
            page_size_shift: self.page_size.trailing_zeros(),
            vers_major: INNODB_BINLOG_FILE_VERS_MAJOR,
            vers_minor: 0,
            file_no: self.file_no,
            size_in_pages: self.pages.len() as u64 + 1,
            start_lsn: 0,
        };
        let mut image = header.to_page();
        image.resize(self.page_size, 0);
        for page in self.pages.drain(..) {
            image.extend_from_slice(&page);
        }
        self.out.insert(self.file_no, image);
        self.file_no += 1;
    }

    /// Return the file images.
    ///
    /// The last file is left as the server leaves the file it is writing to:
    /// the partly used page is zero after its last chunk.
    pub fn finish(mut self) -> MemoryBinlogs {
        if !self.page.is_empty() {
            let mut page = std::mem::take(&mut self.page);
            page.resize(self.page_size, 0);
            write_page_checksum(&mut page);
            self.pages.push(page);
        }
        if !self.pages.is_empty() {
            self.write_file();
        }
        self.out
    }
}
