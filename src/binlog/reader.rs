//! Logical event stream of an InnoDB binlog.
//!
//! [`BinlogReader`] turns the records of a binlog file into the byte stream
//! of committed event groups, the same bytes a server would send to a
//! replica: for each commit record, its inline body, followed by any OOB data
//! it references (primary forest first, then secondary). Records of other
//! types (GTID state, dummy, OOB nodes met in file order) are skipped.
//!
//! Reads are page-granular: a call returns after touching at most about one
//! page of commit data, so callers should pass buffers of at least a page.
//!
//! ```no_run
//! use std::io::Read;
//!
//! let mut reader = ibb::binlog::reader::open_binlog("/var/lib/mysql/binlog-000001.ibb", 0)?;
//! let mut events = Vec::new();
//! reader.read_to_end(&mut events)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::binlog::chunk::{ChunkReader, HeaderBuf, Location, SavedPosition};
use crate::binlog::constants::FSP_BINLOG_TYPE_COMMIT;
use crate::binlog::file::{BinlogDir, BinlogFile, BinlogSource};
use crate::binlog::oob::OobReader;
use crate::IbbError;

/// OOB references decoded from the start of a commit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitHeader {
    /// Number of nodes in the primary OOB forest.
    pub oob_count: u64,
    /// Root of the last tree of the primary forest.
    pub oob_root: Location,
    /// Number of nodes in the secondary OOB forest.
    pub oob2_count: u64,
    /// Root of the last tree of the secondary forest.
    pub oob2_root: Location,
}

impl CommitHeader {
    /// Decode the header; the location of each forest's first node is
    /// present on disk but not needed for reading.
    pub fn decode(header: &mut HeaderBuf, chunk_rd: &ChunkReader) -> Result<Self, IbbError> {
        let mut commit = CommitHeader {
            oob_count: header.next_int(chunk_rd)?,
            ..Default::default()
        };
        if commit.oob_count == 0 {
            return Ok(commit);
        }

        let _first = (header.next_int(chunk_rd)?, header.next_int(chunk_rd)?);
        commit.oob_root = Location::new(header.next_int(chunk_rd)?, header.next_int(chunk_rd)?);

        commit.oob2_count = header.next_int(chunk_rd)?;
        if commit.oob2_count > 0 {
            let _first2 = (header.next_int(chunk_rd)?, header.next_int(chunk_rd)?);
            commit.oob2_root = Location::new(header.next_int(chunk_rd)?, header.next_int(chunk_rd)?);
        }
        Ok(commit)
    }

    pub fn primary(&self) -> Option<Location> {
        (self.oob_count > 0).then_some(self.oob_root)
    }

    pub fn secondary(&self) -> Option<Location> {
        (self.oob_count > 0 && self.oob2_count > 0).then_some(self.oob2_root)
    }
}

enum ReadState {
    /// Looking for the next commit record.
    NextEventGroup,
    /// Streaming the inline body of a commit record.
    CommitRecord {
        header: HeaderBuf,
        commit: CommitHeader,
    },
    /// Streaming OOB data; `resume` is the cursor after the commit record.
    OobData {
        secondary: Option<Location>,
        resume: SavedPosition,
    },
}

/// Reader of the committed event groups in a binlog, one file at a time.
pub struct BinlogReader {
    chunk_rd: ChunkReader,
    oob_rd: OobReader,
    state: ReadState,
    start_file_no: u64,
}

impl BinlogReader {
    /// Start reading `file` at byte `start_position`.
    ///
    /// Positions inside the header page mean the first data page. The
    /// position may fall in the middle of a record; continuation chunks are
    /// skipped up to the next record start. Other files of the log (reached
    /// by records that span files, or by OOB links) are opened through
    /// `source`.
    pub fn open(
        source: Box<dyn BinlogSource>,
        file: BinlogFile,
        start_position: u64,
    ) -> Result<Self, IbbError> {
        let chunk_rd = ChunkReader::open(source, file)?;
        let start_file_no = chunk_rd.position().file_no();
        let mut reader = BinlogReader {
            chunk_rd,
            oob_rd: OobReader::new(),
            state: ReadState::NextEventGroup,
            start_file_no,
        };
        reader.seek_start(start_position)?;
        Ok(reader)
    }

    /// Switch to the next file to read.
    ///
    /// If `file` directly follows the previous one, reading continues where
    /// it stopped, since the last record of the previous file may already
    /// have been read into this one. Otherwise reading starts over at
    /// `start_position` in `file`.
    pub fn reopen(&mut self, file: BinlogFile, start_position: u64) -> Result<(), IbbError> {
        let prev_start = self.start_file_no;
        let prev_pos = self.chunk_rd.position();
        let header = self.chunk_rd.set_file(file)?;
        self.start_file_no = header.file_no;

        if prev_start.checked_add(1) == Some(header.file_no) {
            debug!(file_no = header.file_no, "Continuing into next binlog file");
            if prev_pos.file_no() != header.file_no {
                let page_size = self.chunk_rd.page_size() as u64;
                self.chunk_rd.seek(header.file_no, page_size)?;
            } else {
                self.chunk_rd.restore_pos(&prev_pos);
            }
        } else {
            self.state = ReadState::NextEventGroup;
            self.seek_start(start_position)?;
        }
        Ok(())
    }

    fn seek_start(&mut self, start_position: u64) -> Result<(), IbbError> {
        let page_size = self.chunk_rd.page_size() as u64;
        if start_position / page_size > u32::MAX as u64 {
            return Err(IbbError::Argument(format!(
                "Start position {} is beyond the largest binlog file",
                start_position
            )));
        }
        let offset = start_position.max(page_size);
        debug!(file_no = self.start_file_no, offset, "Starting binlog read");
        self.chunk_rd.seek(self.start_file_no, offset)?;
        self.chunk_rd.skip_partial(true);
        Ok(())
    }

    /// Id of the file being read (the last one passed to open/reopen).
    pub fn file_no(&self) -> u64 {
        self.start_file_no
    }

    pub fn page_size(&self) -> u32 {
        self.chunk_rd.page_size()
    }

    /// Cursor of the underlying chunk reader.
    pub fn position(&self) -> SavedPosition {
        self.chunk_rd.position()
    }

    /// Read event group data into `buf`.
    ///
    /// Returns the number of bytes read, which may be less than `buf.len()`
    /// even when more data follows. `Ok(0)` means the end of the current
    /// file's data.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, IbbError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut sofar = 0;
        loop {
            match std::mem::replace(&mut self.state, ReadState::NextEventGroup) {
                ReadState::NextEventGroup => {
                    let file_no = self.chunk_rd.position().file_no();
                    if file_no > self.start_file_no
                        || (file_no == self.start_file_no && self.chunk_rd.is_end_of_file())
                    {
                        return Ok(sofar);
                    }

                    let mut header = HeaderBuf::fill(&mut self.chunk_rd)?;
                    if header.is_empty() {
                        return Ok(sofar);
                    }
                    if self.chunk_rd.cur_type() != FSP_BINLOG_TYPE_COMMIT {
                        self.chunk_rd.skip_record()?;
                        continue;
                    }
                    self.chunk_rd.skip_partial(false);

                    let commit = CommitHeader::decode(&mut header, &self.chunk_rd)?;
                    trace!(
                        oob_count = commit.oob_count,
                        oob2_count = commit.oob2_count,
                        "Found commit record"
                    );
                    self.state = ReadState::CommitRecord { header, commit };
                }

                ReadState::CommitRecord { mut header, commit } => {
                    sofar += header.drain(&mut buf[sofar..]);
                    if sofar < buf.len() && !self.chunk_rd.end_of_record() {
                        sofar += self.chunk_rd.read(&mut buf[sofar..], false)?;
                    }

                    if header.remaining() > 0 || !self.chunk_rd.end_of_record() {
                        self.state = ReadState::CommitRecord { header, commit };
                        return Ok(sofar);
                    }

                    match commit.primary() {
                        None => {
                            if sofar < buf.len() && !self.chunk_rd.is_end_of_page() {
                                continue;
                            }
                        }
                        Some(root) => {
                            self.oob_rd.start_traversal(root);
                            self.state = ReadState::OobData {
                                secondary: commit.secondary(),
                                resume: self.chunk_rd.save_pos(),
                            };
                        }
                    }
                    if sofar > 0 {
                        return Ok(sofar);
                    }
                }

                ReadState::OobData { secondary, resume } => {
                    let n = self.oob_rd.read(&mut self.chunk_rd, &mut buf[sofar..])?;
                    if self.oob_rd.traversal_done() {
                        match secondary {
                            Some(root) => {
                                trace!("Switching to secondary OOB data");
                                self.oob_rd.start_traversal(root);
                                self.state = ReadState::OobData {
                                    secondary: None,
                                    resume,
                                };
                            }
                            None => self.chunk_rd.restore_pos(&resume),
                        }
                    } else {
                        self.state = ReadState::OobData { secondary, resume };
                    }

                    sofar += n;
                    if sofar > 0 {
                        return Ok(sofar);
                    }
                }
            }
        }
    }

    /// Restrict reading to a single file. Only meaningful against a live server.
    pub fn enable_single_file(&mut self) -> Result<(), IbbError> {
        Err(live_only("enable_single_file"))
    }

    /// Position by legacy file name and offset. Only meaningful against a live server.
    pub fn init_legacy_pos(&mut self, _file_name: &str, _offset: u64) -> Result<(), IbbError> {
        Err(live_only("init_legacy_pos"))
    }

    /// Position by GTID. Only meaningful against a live server.
    pub fn init_gtid_pos(&mut self, _gtid_pos: &str) -> Result<(), IbbError> {
        Err(live_only("init_gtid_pos"))
    }

    /// Wait for more data to be written. Only meaningful against a live server.
    pub fn wait_available(&mut self, _timeout: Option<Duration>) -> Result<bool, IbbError> {
        Err(live_only("wait_available"))
    }

    /// Whether unread data is available. Only meaningful against a live server.
    pub fn data_available(&self) -> Result<bool, IbbError> {
        Err(live_only("data_available"))
    }
}

fn live_only(op: &str) -> IbbError {
    IbbError::Unsupported(format!(
        "{} requires a running server and is not available when reading binlog files",
        op
    ))
}

impl io::Read for BinlogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        BinlogReader::read(self, buf).map_err(io::Error::other)
    }
}

/// Open the binlog file at `path` and start reading at `start_position`.
///
/// Other files of the log are looked up next to it as `binlog-NNNNNN.ibb`.
pub fn open_binlog<P: AsRef<Path>>(path: P, start_position: u64) -> Result<BinlogReader, IbbError> {
    let path = path.as_ref();
    let file = BinlogFile::open(path)?;
    BinlogReader::open(Box::new(BinlogDir::containing(path)), file, start_position)
}
