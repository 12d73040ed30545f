//! Group hex dump files
//!
//! The hex dump format stores one group per line as four
//! whitespace-separated, four-digit hex words. Blocks which
//! were not received correctly are written as `----`:
//!
//! ```txt
//! % Freq 87600
//! F202 0408 5C66 2043
//! F202 0409 ---- 554C
//! ```
//!
//! Lines beginning with `%` are metadata. The `% Freq` record
//! announces a retune, in kHz. Other metadata lines, blank
//! lines, and `<...>` lines written by RDS Spy are ignored.
//! Any leading fields before the last four (such as time
//! stamps) are ignored too.

use std::io::{self, BufRead, Write};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::group::{Group, GroupParseErr};
use crate::syndrome::GROUP_BITS;

/// Error reading a hex dump
#[derive(Error, Debug)]
pub enum HexDumpErr {
    /// A group line could not be parsed
    #[error("hex dump line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: GroupParseErr,
    },

    /// I/O error from the underlying reader
    #[error("hex dump read error: {0}")]
    Io(#[from] io::Error),
}

/// One record from a hex dump
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HexRecord {
    /// A received group
    Group(Group),

    /// The receiver was retuned to the given frequency, in kHz
    ///
    /// The frequency is `None` if the record did not include
    /// a readable value.
    Frequency(Option<u32>),
}

lazy_static! {
    static ref FREQ_LINE: Regex = Regex::new(r"^%\s*Freq\b\s*(\d+)?").expect("bad regex");
}

/// Streaming hex dump reader
///
/// Iterates over the records in a hex dump. Groups are
/// stamped with a synthetic bit time which advances by one
/// group (104 bits) per line, starting at zero.
///
/// ```
/// use rdsurvey::hexdump::{HexDumpReader, HexRecord};
///
/// let dump = "% Freq 87600\n<RDS Spy>\nF202 0408 5C66 2043\n";
/// let mut rd = HexDumpReader::new(dump.as_bytes());
/// assert_eq!(HexRecord::Frequency(Some(87600)), rd.next().unwrap().unwrap());
/// match rd.next().unwrap().unwrap() {
///     HexRecord::Group(grp) => assert_eq!(Some(0xf202), grp.pi()),
///     _ => unreachable!(),
/// }
/// assert!(rd.next().is_none());
/// ```
#[derive(Debug)]
pub struct HexDumpReader<R> {
    inner: R,
    line: usize,
    bit_time: u64,
    buf: String,
}

impl<R> HexDumpReader<R>
where
    R: BufRead,
{
    /// Read a hex dump from `inner`
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            bit_time: 0,
            buf: String::new(),
        }
    }

    /// Number of lines read so far
    pub fn line(&self) -> usize {
        self.line
    }

    /// Iterate only over the groups, stopping at the first error
    ///
    /// Frequency records are dropped.
    pub fn groups(self) -> impl Iterator<Item = Result<Group, HexDumpErr>> {
        self.filter_map(|rec| match rec {
            Ok(HexRecord::Group(grp)) => Some(Ok(grp)),
            Ok(HexRecord::Frequency(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    // classify one trimmed line
    fn parse_line(&mut self, line: &str) -> Option<Result<HexRecord, HexDumpErr>> {
        if line.is_empty() || line.starts_with('<') {
            return None;
        }

        if line.starts_with('%') {
            return FREQ_LINE.captures(line).map(|cap| {
                let khz = cap.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                debug!("hexdump: line {}: retune to {:?} kHz", self.line, khz);
                Ok(HexRecord::Frequency(khz))
            });
        }

        Some(match line.parse::<Group>() {
            Ok(grp) => {
                let out = Group::new(*grp.blocks(), self.bit_time);
                self.bit_time += GROUP_BITS as u64;
                Ok(HexRecord::Group(out))
            }
            Err(source) => Err(HexDumpErr::Parse {
                line: self.line,
                source,
            }),
        })
    }
}

impl<R> Iterator for HexDumpReader<R>
where
    R: BufRead,
{
    type Item = Result<HexRecord, HexDumpErr>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            let line = std::mem::take(&mut self.buf);
            let out = self.parse_line(line.trim());
            self.buf = line;
            if out.is_some() {
                return out;
            }
        }
    }
}

/// Hex dump writer
///
/// Writes records in the same format that
/// [`HexDumpReader`] reads.
#[derive(Debug)]
pub struct HexDumpWriter<W> {
    inner: W,
}

impl<W> HexDumpWriter<W>
where
    W: Write,
{
    /// Write a hex dump to `inner`
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one group line
    pub fn write_group(&mut self, group: &Group) -> io::Result<()> {
        writeln!(self.inner, "{}", group)
    }

    /// Write a retune record, in kHz
    pub fn write_frequency(&mut self, khz: u32) -> io::Result<()> {
        writeln!(self.inner, "% Freq {}", khz)
    }

    /// Write any record
    pub fn write_record(&mut self, record: &HexRecord) -> io::Result<()> {
        match record {
            HexRecord::Group(grp) => self.write_group(grp),
            HexRecord::Frequency(Some(khz)) => self.write_frequency(*khz),
            HexRecord::Frequency(None) => writeln!(self.inner, "% Freq"),
        }
    }

    /// Flush and return the inner writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "% RDS Surveyor dump
% Freq 104500
<RDS Spy 1.0>

F202 0408 5C66 2043
F202 0409 ---- 554C
12:00:01 F202 040A 1E5C 5455
% Freq
";

    #[test]
    fn test_read_dump() {
        let records: Vec<HexRecord> = HexDumpReader::new(DUMP.as_bytes())
            .collect::<Result<_, _>>()
            .expect("parse");
        assert_eq!(5, records.len());
        assert_eq!(HexRecord::Frequency(Some(104500)), records[0]);
        assert_eq!(HexRecord::Frequency(None), records[4]);

        match &records[2] {
            HexRecord::Group(grp) => {
                assert_eq!(104, grp.bit_time());
                assert_eq!(None, grp.block(2));
                assert_eq!(Some(0x554c), grp.block(3));
            }
            _ => panic!("expected group"),
        }
        match &records[3] {
            HexRecord::Group(grp) => assert_eq!(208, grp.bit_time()),
            _ => panic!("expected group"),
        }
    }

    #[test]
    fn test_read_error_has_line() {
        let mut rd = HexDumpReader::new("F202 0408 5C66 2043\nF202 0408\n".as_bytes());
        assert!(rd.next().expect("some").is_ok());
        match rd.next() {
            Some(Err(HexDumpErr::Parse { line, source })) => {
                assert_eq!(2, line);
                assert_eq!(GroupParseErr::TooFewBlocks, source);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_write_matches_read() {
        let mut wr = HexDumpWriter::new(Vec::new());
        let rd = HexDumpReader::new(DUMP.as_bytes());
        for rec in rd {
            wr.write_record(&rec.expect("parse")).expect("write");
        }
        let out = String::from_utf8(wr.into_inner().expect("flush")).expect("utf8");
        assert_eq!(
            "% Freq 104500
F202 0408 5C66 2043
F202 0409 ---- 554C
F202 040A 1E5C 5455
% Freq
",
            out
        );
    }
}
