#[cfg(not(feature = "cli"))]
compile_error!("The `ibb` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use tracing_subscriber::EnvFilter;

use ibb::cli;
use ibb::cli::app::{Cli, ColorMode, Commands};
use ibb::IbbError;

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, IbbError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| IbbError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Header { file, json } => {
            cli::header::execute(&cli::header::HeaderOptions { file, json }, &mut writer)
        }

        Commands::Checksum { file, all, json } => cli::checksum::execute(
            &cli::checksum::ChecksumOptions { file, all, json },
            &mut writer,
        ),

        Commands::Chunks { file, page, json } => {
            cli::chunks::execute(&cli::chunks::ChunksOptions { file, page, json }, &mut writer)
        }

        Commands::Dump {
            file,
            start_position,
            to_last_log,
            raw,
            read_size,
        } => cli::dump::execute(
            &cli::dump::DumpOptions {
                file,
                start_position,
                to_last_log,
                raw,
                read_size,
            },
            &mut writer,
        ),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "ibb", &mut writer);
            Ok(())
        }
    };

    if let Err(e) = result {
        let _ = writer.flush();
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
