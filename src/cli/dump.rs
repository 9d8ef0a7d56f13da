use std::io::Write;

use tracing::info;

use crate::binlog::file::{BinlogDir, BinlogFile};
use crate::binlog::reader::BinlogReader;
use crate::cli::wprintln;
use crate::util::hex::hex_dump;
use crate::IbbError;

pub struct DumpOptions {
    pub file: String,
    pub start_position: u64,
    pub to_last_log: bool,
    pub raw: bool,
    pub read_size: usize,
}

const HEX_LINE: usize = 16;

/// Where the event group bytes go: raw, or hex dump lines numbered by their
/// offset in the decoded stream.
struct StreamSink<'a> {
    writer: &'a mut dyn Write,
    raw: bool,
    pending: Vec<u8>,
    offset: u64,
}

impl<'a> StreamSink<'a> {
    fn new(writer: &'a mut dyn Write, raw: bool) -> Self {
        StreamSink {
            writer,
            raw,
            pending: Vec::with_capacity(HEX_LINE * 2),
            offset: 0,
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), IbbError> {
        if self.raw {
            return self
                .writer
                .write_all(data)
                .map_err(|e| IbbError::Io(format!("Cannot write output: {}", e)));
        }
        self.pending.extend_from_slice(data);
        let full = self.pending.len() / HEX_LINE * HEX_LINE;
        if full > 0 {
            wprintln!(self.writer, "{}", hex_dump(&self.pending[..full], self.offset))?;
            self.offset += full as u64;
            self.pending.drain(..full);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<u64, IbbError> {
        if !self.pending.is_empty() {
            wprintln!(self.writer, "{}", hex_dump(&self.pending, self.offset))?;
            self.offset += self.pending.len() as u64;
            self.pending.clear();
        }
        self.writer
            .flush()
            .map_err(|e| IbbError::Io(format!("Cannot write output: {}", e)))?;
        Ok(self.offset)
    }
}

/// Stream the event groups of a binlog file (and optionally the files
/// following it) to the writer.
pub fn execute(opts: &DumpOptions, writer: &mut dyn Write) -> Result<(), IbbError> {
    if opts.read_size == 0 {
        return Err(IbbError::Argument("--read-size must be at least 1".to_string()));
    }

    let dir = BinlogDir::containing(&opts.file);
    let file = BinlogFile::open(&opts.file)?;
    let mut reader = BinlogReader::open(Box::new(dir.clone()), file, opts.start_position)?;

    let mut sink = StreamSink::new(writer, opts.raw);
    let mut buf = vec![0u8; opts.read_size];
    let mut files = 1u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n > 0 {
            sink.write(&buf[..n])?;
            continue;
        }

        if !opts.to_last_log {
            break;
        }
        let next = reader.file_no() + 1;
        if !dir.contains(next) {
            break;
        }
        info!(file_no = next, "Continuing with next binlog file");
        reader.reopen(BinlogFile::open(dir.path_for(next))?, 0)?;
        files += 1;
    }

    let total = sink.finish()?;
    info!(bytes = total, files, "Binlog dump complete");
    Ok(())
}
