use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::binlog::checksum::{validate_page_checksum, ChecksumResult, PageStatus};
use crate::binlog::constants::BINLOG_HEADER_PAGE_SIZE;
use crate::binlog::file::BinlogFile;
use crate::binlog::header::FileHeader;
use crate::cli::{create_progress_bar, wprintln};
use crate::util::hex::format_hex32;
use crate::IbbError;

pub struct ChecksumOptions {
    pub file: String,
    pub all: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct PageChecksumJson {
    page_no: u64,
    #[serde(flatten)]
    result: ChecksumResult,
}

#[derive(Serialize)]
struct ChecksumSummaryJson {
    file: String,
    file_no: Option<u64>,
    page_size: Option<u32>,
    total_pages: u64,
    valid_pages: u64,
    empty_pages: u64,
    invalid_pages: u64,
    pages: Vec<PageChecksumJson>,
}

#[derive(Default)]
struct Tally {
    valid: u64,
    empty: u64,
    invalid: u64,
    first_invalid: Option<u64>,
}

impl Tally {
    fn add(&mut self, page_no: u64, result: &ChecksumResult) {
        match result.status {
            PageStatus::Valid => self.valid += 1,
            PageStatus::Empty => self.empty += 1,
            PageStatus::Invalid => {
                self.invalid += 1;
                self.first_invalid.get_or_insert(page_no);
            }
        }
    }
}

/// Validate the checksum of every page in a binlog file.
///
/// Fails with a corruption error naming the first damaged page if any page
/// does not validate, after printing the report.
pub fn execute(opts: &ChecksumOptions, writer: &mut dyn Write) -> Result<(), IbbError> {
    let mut file = BinlogFile::open(&opts.file)?;
    let mut tally = Tally::default();
    let mut pages = Vec::new();

    let mut header_page = vec![0u8; BINLOG_HEADER_PAGE_SIZE as usize];
    let n = file.read_at(0, &mut header_page)?;
    if n < header_page.len() {
        return Err(IbbError::Parse(format!(
            "Cannot read first page of InnoDB binlog file {}",
            opts.file
        )));
    }
    let header_result = validate_page_checksum(&header_page);
    tally.add(0, &header_result);
    let header = if header_result.status == PageStatus::Valid {
        Some(FileHeader::parse(&header_page)?)
    } else {
        None
    };

    if !opts.json {
        wprintln!(
            writer,
            "Validating checksums for {} ({} bytes)...",
            opts.file,
            file.len()
        )?;
        wprintln!(writer)?;
    }
    report_page(opts, writer, &mut pages, 0, &header_result)?;

    let mut total_pages = 1;
    if let Some(ref header) = header {
        let page_size = header.page_size();
        let page_count = file.len() / page_size as u64;
        total_pages = page_count.max(1);

        let pb = if !opts.json && page_count > 1 {
            Some(create_progress_bar(page_count - 1, "pages"))
        } else {
            None
        };

        let mut page = vec![0u8; page_size as usize];
        for page_no in 1..page_count {
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            file.read_page(page_no as u32, &mut page)?;
            let result = validate_page_checksum(&page);
            tally.add(page_no, &result);
            report_page(opts, writer, &mut pages, page_no, &result)?;
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
    }

    if opts.json {
        let summary = ChecksumSummaryJson {
            file: opts.file.clone(),
            file_no: header.as_ref().map(|h| h.file_no),
            page_size: header.as_ref().map(|h| h.page_size()),
            total_pages,
            valid_pages: tally.valid,
            empty_pages: tally.empty,
            invalid_pages: tally.invalid,
            pages,
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| IbbError::Parse(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
    } else {
        wprintln!(writer)?;
        wprintln!(writer, "Summary:")?;
        wprintln!(writer, "  Total pages: {}", total_pages)?;
        wprintln!(writer, "  Empty pages: {}", tally.empty)?;
        wprintln!(writer, "  Valid checksums: {}", tally.valid)?;
        let invalid = format!("{}", tally.invalid);
        wprintln!(
            writer,
            "  Invalid checksums: {}",
            if tally.invalid > 0 { invalid.red() } else { invalid.green() }
        )?;
        if header.is_none() {
            wprintln!(
                writer,
                "  {}",
                "Header page is damaged; page size unknown, data pages not checked".yellow()
            )?;
        }
    }

    match tally.first_invalid {
        Some(page_no) => Err(IbbError::Corrupt {
            file_no: header.map_or(0, |h| h.file_no),
            page_no,
            reason: format!("{} page(s) failed checksum validation", tally.invalid),
        }),
        None => Ok(()),
    }
}

fn report_page(
    opts: &ChecksumOptions,
    writer: &mut dyn Write,
    pages: &mut Vec<PageChecksumJson>,
    page_no: u64,
    result: &ChecksumResult,
) -> Result<(), IbbError> {
    let invalid = result.status == PageStatus::Invalid;
    if !invalid && !opts.all {
        return Ok(());
    }
    if opts.json {
        pages.push(PageChecksumJson {
            page_no,
            result: result.clone(),
        });
        return Ok(());
    }

    let status = match result.status {
        PageStatus::Valid => "OK".green(),
        PageStatus::Empty => "EMPTY".dimmed(),
        PageStatus::Invalid => "INVALID".red(),
    };
    wprintln!(
        writer,
        "Page {}: {} (stored={}, calculated={})",
        page_no,
        status,
        format_hex32(result.stored_checksum),
        format_hex32(result.calculated_checksum)
    )
}
