use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};
use colored::Colorize;
use serde::Serialize;

use crate::binlog::checksum::{validate_page_checksum, PageStatus};
use crate::binlog::constants::*;
use crate::binlog::file::BinlogFile;
use crate::cli::wprintln;
use crate::util::hex::format_preview;
use crate::IbbError;

pub struct ChunksOptions {
    pub file: String,
    pub page: Option<u64>,
    pub json: bool,
}

/// One chunk header found in a data page.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkInfo {
    pub offset: usize,
    pub type_name: &'static str,
    pub type_byte: u8,
    pub cont: bool,
    pub last: bool,
    pub length: usize,
    pub preview: String,
}

/// How the walk over a page's chunks stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageEnd {
    /// Filler bytes pad the rest of the page.
    Filler,
    /// Unwritten space; the log ends here.
    Empty,
    /// Chunks run to the end of the usable page area.
    Full,
    /// A chunk length runs past the page trailer.
    Overrun,
}

#[derive(Serialize)]
struct PageChunksJson {
    page_no: u64,
    checksum: PageStatus,
    end: PageEnd,
    chunks: Vec<ChunkInfo>,
}

const PREVIEW_BYTES: usize = 16;

/// Walk the chunk framing of one data page.
pub fn walk_page(page: &[u8]) -> (Vec<ChunkInfo>, PageEnd) {
    let mut chunks = Vec::new();
    let data_end = page.len().saturating_sub(BINLOG_PAGE_DATA_END);
    let mut off = BINLOG_PAGE_DATA;

    while off + BINLOG_CHUNK_HEADER < data_end {
        let type_byte = page[off];
        if type_byte == FSP_BINLOG_TYPE_FILLER {
            return (chunks, PageEnd::Filler);
        }
        if type_byte == FSP_BINLOG_TYPE_EMPTY {
            return (chunks, PageEnd::Empty);
        }
        let length = LittleEndian::read_u16(&page[off + 1..]) as usize;
        let start = off + BINLOG_CHUNK_HEADER;
        if start + length > data_end {
            return (chunks, PageEnd::Overrun);
        }
        chunks.push(ChunkInfo {
            offset: off,
            type_name: chunk_type_name(type_byte),
            type_byte,
            cont: type_byte & FSP_BINLOG_FLAG_CONT != 0,
            last: type_byte & FSP_BINLOG_FLAG_LAST != 0,
            length,
            preview: format_preview(&page[start..start + length], PREVIEW_BYTES),
        });
        off = start + length;
    }
    (chunks, PageEnd::Full)
}

/// List the chunks stored in the data pages of a binlog file.
pub fn execute(opts: &ChunksOptions, writer: &mut dyn Write) -> Result<(), IbbError> {
    let mut file = BinlogFile::open(&opts.file)?;
    let header = file.read_header()?;
    let page_size = header.page_size();
    let page_count = file.len() / page_size as u64;

    let pages: Vec<u64> = match opts.page {
        Some(p) if p < BINLOG_FIRST_DATA_PAGE as u64 || p >= page_count => {
            return Err(IbbError::Argument(format!(
                "Page {} out of range (data pages are {}..{})",
                p, BINLOG_FIRST_DATA_PAGE, page_count
            )));
        }
        Some(p) => vec![p],
        None => (BINLOG_FIRST_DATA_PAGE as u64..page_count).collect(),
    };

    let mut buf = vec![0u8; page_size as usize];
    let mut json_pages = Vec::new();

    if !opts.json {
        wprintln!(
            writer,
            "Binlog file {} (file number {}, page size {})",
            opts.file,
            header.file_no,
            page_size
        )?;
    }

    for page_no in pages {
        file.read_page(page_no as u32, &mut buf)?;
        let checksum = validate_page_checksum(&buf).status;
        let (chunks, end) = walk_page(&buf);

        if opts.json {
            json_pages.push(PageChunksJson {
                page_no,
                checksum,
                end,
                chunks,
            });
            continue;
        }

        let status = match checksum {
            PageStatus::Valid => "checksum OK".green(),
            PageStatus::Empty => "empty".dimmed(),
            PageStatus::Invalid => "checksum INVALID".red(),
        };
        wprintln!(writer)?;
        wprintln!(writer, "Page {} ({})", page_no, status)?;
        for c in &chunks {
            let mut flags = String::new();
            if c.cont {
                flags.push_str(" CONT");
            }
            if c.last {
                flags.push_str(" LAST");
            }
            wprintln!(
                writer,
                "  {:>5}  {:<10}{:<10} len={:<5} {}",
                c.offset,
                c.type_name,
                flags,
                c.length,
                c.preview.dimmed()
            )?;
        }
        match end {
            PageEnd::Filler => wprintln!(writer, "  (filler)")?,
            PageEnd::Empty => wprintln!(writer, "  (end of written data)")?,
            PageEnd::Full => {}
            PageEnd::Overrun => wprintln!(
                writer,
                "  {}",
                "chunk length runs past the end of the page".red()
            )?,
        }
    }

    if opts.json {
        let json = serde_json::to_string_pretty(&json_pages)
            .map_err(|e| IbbError::Parse(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
    }

    Ok(())
}
