//! InnoDB engine binlog format reading.
//!
//! The InnoDB binlog stores the server's binary log inside the storage
//! engine, as a sequence of `binlog-NNNNNN.ibb` files made of checksummed
//! pages. This module reads those files offline, without a server:
//!
//! - [`header`] parses the 512-byte header page at the start of each file.
//! - [`checksum`] validates the CRC-32C trailer of a page.
//! - [`file`] opens files and resolves file ids to paths.
//! - [`chunk`] reassembles records from the chunks they are split into.
//! - [`oob`] walks the out-of-band data forests of large event groups.
//! - [`reader`] produces the logical event stream from commit records.
//!
//! Start with [`reader::open_binlog`] to read the events in a file.

#[doc(hidden)]
pub mod builder;
pub mod checksum;
pub mod chunk;
pub mod constants;
pub mod file;
pub mod header;
pub mod oob;
pub mod reader;
pub mod varint;
