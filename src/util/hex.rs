//! Hex formatting utilities.
//!
//! Helpers for formatting offsets and checksums, short byte previews, and
//! traditional hex dump output with offset columns and ASCII sidebars.

/// Format a byte offset as "decimal (0xhex)".
pub fn format_offset(offset: u64) -> String {
    format!("{} (0x{:x})", offset, offset)
}

/// Format a u32 value as hex with 0x prefix.
pub fn format_hex32(value: u32) -> String {
    format!("0x{:08x}", value)
}

/// Format up to `max` leading bytes as compact hex, with `..` if cut short.
pub fn format_preview(data: &[u8], max: usize) -> String {
    let mut out: String = data.iter().take(max).map(|b| format!("{:02x}", b)).collect();
    if data.len() > max {
        out.push_str("..");
    }
    out
}

/// Produce a standard hex dump of `data` with the given `base_offset`.
///
/// Output format (16 bytes per line):
/// ```text
/// 00000000  xx xx xx xx xx xx xx xx  xx xx xx xx xx xx xx xx  |................|
/// ```
pub fn hex_dump(data: &[u8], base_offset: u64) -> String {
    let mut lines = Vec::new();

    for (i, row) in data.chunks(16).enumerate() {
        let mut line = format!("{:08x}  ", base_offset + (i * 16) as u64);

        for j in 0..16 {
            if j == 8 {
                line.push(' ');
            }
            match row.get(j) {
                Some(byte) => line.push_str(&format!("{:02x} ", byte)),
                None => line.push_str("   "),
            }
        }

        line.push_str(" |");
        for j in 0..16 {
            line.push(match row.get(j) {
                Some(b) if b.is_ascii_graphic() || *b == b' ' => *b as char,
                Some(_) => '.',
                None => ' ',
            });
        }
        line.push('|');

        lines.push(line);
    }

    lines.join("\n")
}
