use std::io;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use byteorder::ReadBytesExt;
use clap::Parser;
use log::{info, LevelFilter};

use rdsurvey::tmc::TmcDatabase;
use rdsurvey::RdsReceiverBuilder;

mod app;
mod cli;

use cli::{Args, CliError, Format};

fn main() {
    match rdsdec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn rdsdec() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // create the decoder
    let mut builder = RdsReceiverBuilder::new();
    builder
        .with_sync_threshold(args.sync_threshold as usize)
        .with_sync_confirm_groups(args.sync_confirm)
        .with_sync_loss_groups(args.sync_loss)
        .with_pi_tolerance(args.pi_tolerance)
        .with_rbds(args.rbds);

    if let Some(dir) = &args.tmc_dir {
        let db = TmcDatabase::load_dir(dir)
            .with_context(|| format!("Unable to load --tmc-dir \"{}\"", dir.display()))?;
        builder.with_tmc_database(Arc::new(db));
    }
    let mut rx = builder.build();

    // file setup: locks stdin in case we need it
    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let mut inbuf = file_setup(&args, stdin_handle)?;

    match args.format {
        Format::Hex => app::run_hex(&args, &mut rx, inbuf)?,
        Format::Bits => app::run_bits(
            &args,
            &mut rx,
            std::iter::from_fn(|| inbuf.read_u8().ok()).filter_map(ascii_bit),
        )?,
        Format::Binary => app::run_bits(
            &args,
            &mut rx,
            std::iter::from_fn(|| inbuf.read_u8().ok()).flat_map(byte_bits),
        )?,
    }

    Ok(())
}

// '0' and '1' are bits, all else is ignored
fn ascii_bit(byte: u8) -> Option<bool> {
    match byte {
        b'0' => Some(false),
        b'1' => Some(true),
        _ => None,
    }
}

// MSB first
fn byte_bits(byte: u8) -> impl Iterator<Item = bool> {
    (0..8).rev().map(move |b| (byte >> b) & 1 == 1)
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("rdsurvey", log_filter)
            .filter_module("rdsdec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("RDS decoder reading standard input");
        if args.format == Format::Binary && is_terminal(&std::io::stdin()) {
            Err(anyhow!(
                "cowardly refusing to read binary bits from a terminal.

Pipe a source of packed RDS bits from a demodulator into this
program, or use --format hex or --format bits."
            ))
        } else {
            Ok(Box::new(io::BufReader::new(stdin)))
        }
    } else {
        info!("RDS decoder reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("Unable to open --file \"{}\"", args.file))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_sources() {
        let bits: Vec<bool> = b"0 1\n10x".iter().copied().filter_map(ascii_bit).collect();
        assert_eq!(vec![false, true, true, false], bits);

        let bits: Vec<bool> = byte_bits(0xa1).collect();
        assert_eq!(
            vec![true, false, true, false, false, false, false, true],
            bits
        );
    }
}
