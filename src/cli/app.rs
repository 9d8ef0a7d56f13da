use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ibb")]
#[command(about = "InnoDB engine binlog (.ibb) reader")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Log more detail to stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the header page of a binlog file
    Header {
        /// Path to binlog file (binlog-NNNNNN.ibb)
        #[arg(short, long)]
        file: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate page checksums
    Checksum {
        /// Path to binlog file (binlog-NNNNNN.ibb)
        #[arg(short, long)]
        file: String,

        /// List every page, not only damaged ones
        #[arg(short, long)]
        all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the chunks stored in data pages
    Chunks {
        /// Path to binlog file (binlog-NNNNNN.ibb)
        #[arg(short, long)]
        file: String,

        /// Only list this data page
        #[arg(short, long)]
        page: Option<u64>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Decode the event group stream
    Dump {
        /// Path to binlog file (binlog-NNNNNN.ibb)
        #[arg(short, long)]
        file: String,

        /// Byte offset in the file to start reading at
        #[arg(short, long = "start-position", default_value = "0")]
        start_position: u64,

        /// Continue with the following binlog files while they exist
        #[arg(long = "to-last-log")]
        to_last_log: bool,

        /// Output raw event bytes (no formatting)
        #[arg(long)]
        raw: bool,

        /// Size of each read from the binlog reader
        #[arg(long = "read-size", default_value = "16384")]
        read_size: usize,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
