use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::binlog::constants::parse_binlog_file_name;
use crate::binlog::file::BinlogFile;
use crate::binlog::header::FileHeader;
use crate::cli::wprintln;
use crate::util::hex::format_offset;
use crate::IbbError;

pub struct HeaderOptions {
    pub file: String,
    pub json: bool,
}

#[derive(Serialize)]
struct HeaderJson<'a> {
    file: &'a str,
    file_size: u64,
    page_size: u32,
    data_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name_file_no: Option<u64>,
    #[serde(flatten)]
    header: &'a FileHeader,
}

pub fn execute(opts: &HeaderOptions, writer: &mut dyn Write) -> Result<(), IbbError> {
    let mut file = BinlogFile::open(&opts.file)?;
    let header = file.read_header()?;
    let page_size = header.page_size();
    let data_pages = (file.len() / page_size as u64).saturating_sub(1);
    let name_file_no = Path::new(&opts.file)
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_binlog_file_name);

    if opts.json {
        let out = HeaderJson {
            file: &opts.file,
            file_size: file.len(),
            page_size,
            data_pages,
            name_file_no,
            header: &header,
        };
        let json = serde_json::to_string_pretty(&out)
            .map_err(|e| IbbError::Parse(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "Binlog file: {}", opts.file)?;
    wprintln!(
        writer,
        "  Magic:          {}",
        if header.magic_ok {
            "OK".green().to_string()
        } else {
            "MISMATCH".yellow().to_string()
        }
    )?;
    wprintln!(
        writer,
        "  Format version: {}.{}",
        header.vers_major, header.vers_minor
    )?;
    match name_file_no {
        Some(n) if n != header.file_no => wprintln!(
            writer,
            "  File number:    {} {}",
            header.file_no,
            format!("(file name says {})", n).yellow()
        )?,
        _ => wprintln!(writer, "  File number:    {}", header.file_no)?,
    }
    wprintln!(writer, "  Page size:      {}", page_size)?;
    wprintln!(writer, "  Size in pages:  {}", header.size_in_pages)?;
    wprintln!(writer, "  Start LSN:      {}", header.start_lsn)?;
    wprintln!(writer, "  File size:      {}", format_offset(file.len()))?;
    wprintln!(writer, "  Data pages:     {}", data_pages)?;

    Ok(())
}
