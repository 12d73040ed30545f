use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser, ValueEnum};

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program decodes RDS/RBDS data from an FM broadcast. The input may be a hex dump of groups, a text file of 0 and 1 characters, or packed binary bits. Events are printed as they occur, and a summary of each station is printed at the end.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program decodes RDS/RBDS data from an FM broadcast. The input may be a hex dump of groups, a text file of 0 and 1 characters, or packed binary bits. Events are printed as they occur, and a summary of each station is printed at the end.

Hex dumps contain one group per line, as four hex words. Invalid blocks are written as "----". Lines beginning with "%" are metadata; "% Freq <kHz>" marks a retune, which ends the current station.

    rdsdec --file capture.hex

Bit streams are read in order of reception. With --format bits, every "0" and "1" character is a bit and all other bytes are ignored. With --format binary, each byte holds eight bits, most significant first.

    some_rds_demodulator | rdsdec --format binary --groups

Traffic messages (TMC/Alert-C) are decoded if the station carries them. To show event text and locations, give a directory which contains the event list (EL.DAT) and the location tables of your country, in the Alert-C exchange format:

    rdsdec --file capture.hex --tmc-dir /path/to/LT_58_1
"#;

const ADVANCED: &str = "Advanced Synchronizer Options";

/// Input format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Hex dump of groups, one per line
    Hex,

    /// Text "0" and "1" characters, one per bit
    Bits,

    /// Packed bytes, MSB first
    Binary,
}

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even events
    #[arg(short, long)]
    pub quiet: bool,

    /// Input file (or "-" for stdin)
    #[arg(long, default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// Input format
    #[arg(short, long, value_enum, default_value_t = Format::Hex)]
    pub format: Format,

    /// Directory of TMC event and location tables
    #[arg(long)]
    pub tmc_dir: Option<PathBuf>,

    /// Use North American (RBDS) programme types
    #[arg(long)]
    pub rbds: bool,

    /// Print each decoded group as a hex dump
    ///
    /// Only meaningful for bit inputs.
    #[arg(long)]
    pub groups: bool,

    /// Syndrome matches required to acquire sync
    #[arg(long, default_value_t = 2)]
    #[arg(value_parser = value_parser!(u32).range(0..8))]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub sync_threshold: u32,

    /// Confirmation window for sync (groups)
    #[arg(long, default_value_t = 5)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub sync_confirm: u32,

    /// Invalid groups before sync is lost
    #[arg(long, default_value_t = 10)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub sync_loss: u32,

    /// PI glitches tolerated before a station change
    #[arg(long, default_value_t = 3)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub pi_tolerance: u32,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}
