//! Binlog file access.
//!
//! [`BinlogFile`] wraps one open `.ibb` file (or an in-memory image of one)
//! and reads pages from it. [`BinlogSource`] maps file ids to files so the
//! chunk reader can follow a record across a file rotation; [`BinlogDir`]
//! resolves ids to `binlog-NNNNNN.ibb` in a directory and [`MemoryBinlogs`]
//! serves in-memory images.

use std::collections::BTreeMap;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::binlog::constants::{binlog_file_name, BINLOG_HEADER_PAGE_SIZE};
use crate::binlog::header::FileHeader;
use crate::IbbError;

/// Supertrait combining `Read + Seek` for type-erased readers.
pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// An open binlog file with its length captured at open time.
pub struct BinlogFile {
    reader: Box<dyn ReadSeek>,
    length: u64,
    name: String,
}

impl BinlogFile {
    /// Open a binlog file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IbbError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| IbbError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

        let length = file
            .metadata()
            .map_err(|e| IbbError::Io(format!("Cannot stat {}: {}", path.display(), e)))?
            .len();

        debug!(path = %path.display(), length, "Opened binlog file");

        Ok(BinlogFile {
            reader: Box::new(file),
            length,
            name: path.display().to_string(),
        })
    }

    /// Wrap any seekable reader whose length is already known.
    pub(crate) fn from_reader(
        reader: Box<dyn ReadSeek>,
        length: u64,
        name: impl Into<String>,
    ) -> Self {
        BinlogFile {
            reader,
            length,
            name: name.into(),
        }
    }

    /// Wrap an in-memory file image.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>, name: impl Into<String>) -> Self {
        let data: Arc<[u8]> = data.into();
        let length = data.len() as u64;
        Self::from_reader(Box::new(Cursor::new(data)), length, name)
    }

    /// File length in bytes, as seen when the file was opened.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// True if the file has no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Display name (path or label) used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read up to `buf.len()` bytes at `offset`.
    ///
    /// Returns fewer bytes only when the file ends first.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, IbbError> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| IbbError::Io(format!("Cannot seek {} to {}: {}", self.name, offset, e)))?;

        let mut sofar = 0;
        while sofar < buf.len() {
            match self.reader.read(&mut buf[sofar..]) {
                Ok(0) => break,
                Ok(n) => sofar += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(IbbError::Io(format!(
                        "Cannot read {} at offset {}: {}",
                        self.name, offset, e
                    )))
                }
            }
        }
        Ok(sofar)
    }

    /// Read page `page_no` of `buf.len()` bytes; returns the bytes read.
    pub fn read_page(&mut self, page_no: u32, buf: &mut [u8]) -> Result<usize, IbbError> {
        self.read_at(page_no as u64 * buf.len() as u64, buf)
    }

    /// Read and parse the header page.
    pub fn read_header(&mut self) -> Result<FileHeader, IbbError> {
        let mut page = vec![0u8; BINLOG_HEADER_PAGE_SIZE as usize];
        let n = self.read_at(0, &mut page)?;
        if n < page.len() {
            return Err(IbbError::Parse(format!(
                "Cannot read first page of InnoDB binlog file {}",
                self.name
            )));
        }
        FileHeader::parse(&page)
    }
}

/// Resolves binlog file ids to open files.
pub trait BinlogSource {
    /// Open the file with the given id.
    fn open_file(&self, file_no: u64) -> Result<BinlogFile, IbbError>;
}

/// Binlog files in a directory, named `binlog-NNNNNN.ibb`.
#[derive(Debug, Clone)]
pub struct BinlogDir {
    dir: PathBuf,
}

impl BinlogDir {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        BinlogDir { dir: dir.into() }
    }

    /// Directory containing `path`, or `.` for a bare file name.
    pub fn containing<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::new(parent),
            _ => Self::new("."),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file with the given id.
    pub fn path_for(&self, file_no: u64) -> PathBuf {
        self.dir.join(binlog_file_name(file_no))
    }

    /// Whether the file with the given id exists (it may have been purged).
    pub fn contains(&self, file_no: u64) -> bool {
        self.path_for(file_no).is_file()
    }
}

impl BinlogSource for BinlogDir {
    fn open_file(&self, file_no: u64) -> Result<BinlogFile, IbbError> {
        BinlogFile::open(self.path_for(file_no))
    }
}

/// In-memory binlog file images keyed by file id.
#[derive(Debug, Clone, Default)]
pub struct MemoryBinlogs {
    files: BTreeMap<u64, Arc<[u8]>>,
}

impl MemoryBinlogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_no: u64, data: Vec<u8>) {
        self.files.insert(file_no, data.into());
    }

    pub fn get(&self, file_no: u64) -> Option<&[u8]> {
        self.files.get(&file_no).map(|d| &d[..])
    }
}

impl BinlogSource for MemoryBinlogs {
    fn open_file(&self, file_no: u64) -> Result<BinlogFile, IbbError> {
        let data = self.files.get(&file_no).ok_or_else(|| {
            IbbError::Io(format!("Cannot open {}: not found", binlog_file_name(file_no)))
        })?;
        Ok(BinlogFile::from_bytes(Arc::clone(data), binlog_file_name(file_no)))
    }
}

/// In-memory images that count the data page reads made through them.
#[cfg(test)]
pub(crate) struct CountingBinlogs {
    files: MemoryBinlogs,
    page_reads: std::rc::Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl CountingBinlogs {
    pub(crate) fn new(files: MemoryBinlogs) -> (Self, std::rc::Rc<std::cell::Cell<usize>>) {
        let page_reads = std::rc::Rc::new(std::cell::Cell::new(0));
        let source = CountingBinlogs {
            files,
            page_reads: page_reads.clone(),
        };
        (source, page_reads)
    }
}

#[cfg(test)]
struct CountingReader {
    inner: Cursor<Arc<[u8]>>,
    page_reads: std::rc::Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
impl Seek for CountingReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        // every read_at seeks once; offset 0 is the header page
        if pos != SeekFrom::Start(0) {
            self.page_reads.set(self.page_reads.get() + 1);
        }
        self.inner.seek(pos)
    }
}

#[cfg(test)]
impl BinlogSource for CountingBinlogs {
    fn open_file(&self, file_no: u64) -> Result<BinlogFile, IbbError> {
        let data: Arc<[u8]> = self
            .files
            .get(file_no)
            .ok_or_else(|| IbbError::Io(format!("Cannot open {}: not found", binlog_file_name(file_no))))?
            .into();
        let length = data.len() as u64;
        let reader = CountingReader {
            inner: Cursor::new(data),
            page_reads: self.page_reads.clone(),
        };
        Ok(BinlogFile::from_reader(Box::new(reader), length, binlog_file_name(file_no)))
    }
}
