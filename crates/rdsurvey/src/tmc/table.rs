//! Semicolon-delimited table files
//!
//! TMC event lists and location tables are distributed as
//! `.DAT` text files with one record per line and fields
//! separated by `;`. The first line is a header which names
//! the columns:
//!
//! ```txt
//! CID;TABCD;LCD;NEG_OFF_LCD;POS_OFF_LCD
//! 58;1;10001;;10002
//! ```
//!
//! Older files are ISO-8859-1. Newer files are UTF-8 and
//! usually begin with a byte-order mark. Both are accepted.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error loading a table
#[derive(Error, Debug)]
pub enum TableErr {
    /// The file could not be read
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A required column is not named in the header
    #[error("{table}: missing column {column}")]
    MissingColumn { table: String, column: String },

    /// A numeric field holds something else
    #[error("{table} line {line}: bad integer in {column}: \"{value}\"")]
    BadInteger {
        table: String,
        line: usize,
        column: String,
        value: String,
    },
}

/// A parsed table
///
/// ```
/// use rdsurvey::tmc::Table;
///
/// let tab = Table::parse("SOFFSETS", "CID;TABCD;LCD;NEG_OFF_LCD;POS_OFF_LCD\n58;1;100;;101\n");
/// let row = tab.rows().next().unwrap();
/// assert_eq!(Some(101), row.opt_int("POS_OFF_LCD").unwrap());
/// assert_eq!(None, row.opt_int("NEG_OFF_LCD").unwrap());
/// assert_eq!("100", row.str("LCD"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: HashMap<String, usize>,
    rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    /// Parse table `name` from text
    ///
    /// Blank lines are skipped.
    pub fn parse(name: &str, text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.lines().enumerate();

        let columns = lines
            .next()
            .map(|(_, header)| {
                split_fields(header)
                    .enumerate()
                    .map(|(i, col)| (col.to_ascii_uppercase(), i))
                    .collect()
            })
            .unwrap_or_default();

        let rows = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, split_fields(line).map(str::to_owned).collect()))
            .collect();

        Self {
            name: name.to_owned(),
            columns,
            rows,
        }
    }

    /// Read and parse a table file
    ///
    /// The table is named after the file stem.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, TableErr> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| TableErr::Io {
            path: path.to_owned(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_uppercase())
            .unwrap_or_default();
        Ok(Self::parse(&name, &decode(&bytes)))
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True if the header names `column`
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Fail unless every one of `columns` is present
    pub fn require(&self, columns: &[&str]) -> Result<(), TableErr> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(TableErr::MissingColumn {
                table: self.name.clone(),
                column: (*missing).to_owned(),
            }),
            None => Ok(()),
        }
    }

    /// Data rows, in file order
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |(line, fields)| Row {
            table: self,
            line: *line,
            fields,
        })
    }
}

/// One data row of a [`Table`]
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a Table,
    line: usize,
    fields: &'a [String],
}

impl<'a> Row<'a> {
    /// Line number in the file, starting from 1
    pub fn line(&self) -> usize {
        self.line
    }

    /// Field by position
    ///
    /// Missing fields are empty.
    pub fn field(&self, index: usize) -> &'a str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Field by column name
    ///
    /// Unknown columns and missing fields are empty.
    pub fn str(&self, column: &str) -> &'a str {
        self.table
            .columns
            .get(column)
            .map(|i| self.field(*i))
            .unwrap_or("")
    }

    /// Optional integer field
    ///
    /// Empty fields are `None`. A leading `+` is accepted.
    pub fn opt_int(&self, column: &str) -> Result<Option<i64>, TableErr> {
        let value = self.str(column);
        if value.is_empty() {
            return Ok(None);
        }
        value
            .strip_prefix('+')
            .unwrap_or(value)
            .parse::<i64>()
            .map(Some)
            .map_err(|_| self.bad_value(column, value))
    }

    /// Mandatory integer field
    pub fn int(&self, column: &str) -> Result<i64, TableErr> {
        self.opt_int(column)?
            .ok_or_else(|| self.bad_value(column, ""))
    }

    /// Integer field which must fit the target type
    pub fn int_as<T: TryFrom<i64>>(&self, column: &str) -> Result<T, TableErr> {
        let value = self.int(column)?;
        T::try_from(value).map_err(|_| self.bad_value(column, &value.to_string()))
    }

    /// Optional integer field which must fit the target type
    pub fn opt_int_as<T: TryFrom<i64>>(&self, column: &str) -> Result<Option<T>, TableErr> {
        match self.opt_int(column)? {
            Some(value) => T::try_from(value)
                .map(Some)
                .map_err(|_| self.bad_value(column, &value.to_string())),
            None => Ok(None),
        }
    }

    pub(crate) fn bad_value(&self, column: &str, value: &str) -> TableErr {
        TableErr::BadInteger {
            table: self.table.name.clone(),
            line: self.line,
            column: column.to_owned(),
            value: value.to_owned(),
        }
    }
}

/// Split one line into trimmed fields
///
/// Fields may be wrapped in double quotes, which are removed.
pub fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.trim_end_matches('\r').split(';').map(|f| {
        let f = f.trim();
        f.strip_prefix('"')
            .and_then(|f| f.strip_suffix('"'))
            .unwrap_or(f)
    })
}

/// Decode file contents as UTF-8, falling back to ISO-8859-1
pub fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|b| *b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_bom() {
        let tab = Table::parse(
            "NAMES",
            "\u{feff}cid;LID;NID;NAME;NCOMMENT\r\n58;1;1;\"Köln\";\r\n\r\n58;1;2;Bonn\r\n",
        );
        assert_eq!(2, tab.len());
        assert!(tab.require(&["CID", "NID", "NAME"]).is_ok());

        let rows: Vec<Row> = tab.rows().collect();
        assert_eq!("Köln", rows[0].str("NAME"));
        assert_eq!(2, rows[0].line());
        assert_eq!("", rows[1].str("NCOMMENT"));
        assert_eq!(2, rows[1].int("NID").expect("nid"));
        assert_eq!(4, rows[1].line());
    }

    #[test]
    fn test_missing_column() {
        let tab = Table::parse("POFFSETS", "CID;TABCD;LCD\n");
        match tab.require(&["CID", "NEG_OFF_LCD"]) {
            Err(TableErr::MissingColumn { table, column }) => {
                assert_eq!("POFFSETS", table);
                assert_eq!("NEG_OFF_LCD", column);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_integer() {
        let tab = Table::parse("POINTS", "LCD;XCOORD\nabc;+00650000\n");
        let row = tab.rows().next().expect("row");
        assert_eq!(650000, row.int("XCOORD").expect("xcoord"));
        match row.int("LCD") {
            Err(TableErr::BadInteger { line, value, .. }) => {
                assert_eq!(2, line);
                assert_eq!("abc", value);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(row.int_as::<u8>("XCOORD").is_err());
    }

    #[test]
    fn test_latin1() {
        let bytes = b"NAME\nK\xf6ln\n";
        assert_eq!("NAME\nKöln\n", decode(bytes));
    }
}
