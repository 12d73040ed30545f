//! Decoding loops and printing
//!
//! Hex dumps are decoded group by group. A `% Freq` record in
//! the dump ends the current station: its summary is printed,
//! and the receiver is reset for the next one.
//!
//! Bit streams are decoded bit by bit. If requested, every
//! group is printed as a hex dump line as soon as the
//! synchronizer completes it.
//!
//! ```txt
//!   input ==> RdsReceiver ==> events  ==> stdout
//!                  ||
//!                  ||======> station ==> summary at EOF
//!                                        or retune
//! ```

use std::io::{self, BufRead};

use anyhow::Context;
use chrono::SecondsFormat;
use log::{debug, info};
use rdsurvey::hexdump::{HexDumpReader, HexDumpWriter, HexRecord};
use rdsurvey::{LogEvent, RdsEvent, RdsReceiver, Station};

use crate::cli::Args;

/// Run the receiver over a hex dump
///
/// Reads every record from `input` until it is exhausted.
/// Stops at the first malformed line.
pub fn run_hex<R>(args: &Args, receiver: &mut RdsReceiver, input: R) -> Result<(), anyhow::Error>
where
    R: BufRead,
{
    let mut reader = HexDumpReader::new(input);
    while let Some(record) = reader.next() {
        match record.with_context(|| format!("Unable to read --file \"{}\"", args.file))? {
            HexRecord::Group(group) => receiver.input_group(&group),
            HexRecord::Frequency(khz) => {
                info!("retuned to {:?} kHz at line {}", khz, reader.line());
                receiver.end_station();
                finish_station(args, receiver);
                receiver.reset();
                if !args.quiet {
                    match khz {
                        Some(khz) => println!("=== {}.{} MHz ===", khz / 1000, khz % 1000 / 100),
                        None => println!("=== retune ==="),
                    }
                }
            }
        }
        print_events(args, receiver);
    }

    receiver.end();
    finish_station(args, receiver);
    Ok(())
}

/// Run the receiver over a bit stream
///
/// If `--groups` was given, decoded groups are written to
/// standard output as a hex dump.
pub fn run_bits<I>(args: &Args, receiver: &mut RdsReceiver, input: I) -> Result<(), anyhow::Error>
where
    I: Iterator<Item = bool>,
{
    let stdout = io::stdout();
    let mut dump = HexDumpWriter::new(stdout.lock());

    for bit in input {
        if let Some(group) = receiver.input_bit(bit) {
            if args.groups && !args.quiet {
                dump.write_group(&group)
                    .context("Unable to write group to standard output")?;
            }
        }
        print_events(args, receiver);
    }

    dump.into_inner()
        .context("Unable to write group to standard output")?;
    receiver.end();
    finish_station(args, receiver);
    Ok(())
}

// end of input or retune: report the station
fn finish_station(args: &Args, receiver: &mut RdsReceiver) {
    print_events(args, receiver);

    debug!(
        "{} groups decoded, quality {:0.2}",
        receiver.group_count(),
        receiver.quality()
    );
    if let Some(station) = receiver.station() {
        if !args.quiet {
            print_station(station);
        }
    }
}

fn print_events(args: &Args, receiver: &mut RdsReceiver) {
    for evt in receiver.events() {
        if !args.quiet {
            println!("{}", format_event(&evt));
        }
    }
}

// one line per event
fn format_event(evt: &RdsEvent) -> String {
    match evt.what() {
        LogEvent::ClockTime(ct) => match ct.to_datetime() {
            Some(dt) => format!(
                "[{:<14}]: clock time: {}",
                evt.bit_time(),
                dt.to_rfc3339_opts(SecondsFormat::Secs, false)
            ),
            None => evt.to_string(),
        },
        _ => evt.to_string(),
    }
}

fn print_station(station: &Station) {
    println!("{}", station);

    for app in station.oda().applications() {
        if let Some(tmc) = app.as_alert_c() {
            if !tmc.provider_name().trim().is_empty() {
                println!("TMC provider: {}", tmc.provider_name());
            }
            for on in tmc.other_networks().values() {
                println!("TMC ON: {}", on);
            }
            for msg in tmc.messages() {
                println!("TMC: {}", msg);
            }
        }
        if let Some(paging) = app.as_paging() {
            for call in paging.messages() {
                println!("Paging: {}", call);
            }
        }
        if let Some(inhouse) = app.as_in_house() {
            for (data, count) in inhouse.messages() {
                println!("In-house: {} x{}", data, count);
            }
        }
    }
    println!();
}
