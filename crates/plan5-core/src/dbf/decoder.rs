//! Record decoding: fixed-width binary rows into typed [`Record`]s.
//!
//! The decoder converts per the *declared* field kinds; the file's own
//! column types only describe the byte layout. Value-level problems (an
//! unparseable number, an impossible date) decode as `Null`; only
//! structural corruption fails the table.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use super::encoding::decode_text;
use super::header::{DbfHeader, DELETED_FLAG};
use crate::catalog::{FieldDef, FieldKind, TableDef};
use crate::error::DecodeError;
use crate::record::Record;
use crate::value::Value;

/// An eagerly decoded table.
#[derive(Debug)]
pub struct DecodedTable {
    /// Records in file order, deleted rows skipped.
    pub records: Vec<Record>,
    /// Non-fatal observations (e.g. encoding fallback).
    pub advisories: Vec<String>,
}

/// Streaming decoder over one table file.
#[derive(Debug)]
pub struct Decoder {
    path: PathBuf,
    header: DbfHeader,
    reader: BufReader<File>,
    table: TableDef,
    /// Declared field -> column index in the file, by column header.
    bindings: Vec<Option<usize>>,
}

impl Decoder {
    /// Open a table file and parse its header.
    pub fn open(path: impl AsRef<Path>, table: &TableDef) -> Result<Self, DecodeError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| DecodeError::Io {
            path: path.clone(),
            source,
        })?;
        let file_len = file
            .metadata()
            .map_err(|source| DecodeError::Io {
                path: path.clone(),
                source,
            })?
            .len();

        let mut reader = BufReader::new(file);
        let header = DbfHeader::read(&mut reader, file_len, &path)?;

        let bindings: Vec<Option<usize>> = table
            .fields
            .iter()
            .map(|field| {
                header
                    .columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(&field.column))
            })
            .collect();

        for (field, binding) in table.fields.iter().zip(&bindings) {
            if binding.is_none() {
                debug!(
                    table = %table.name,
                    field = %field.name,
                    column = %field.column,
                    "declared column absent from file; field decodes as null"
                );
            }
        }

        Ok(Self {
            path,
            header,
            reader,
            table: table.clone(),
            bindings,
        })
    }

    /// The parsed file header.
    pub fn header(&self) -> &DbfHeader {
        &self.header
    }

    /// Stream records lazily in bounded memory.
    pub fn records(self) -> RecordIter {
        RecordIter {
            path: self.path,
            header: self.header,
            reader: self.reader,
            table: self.table,
            bindings: self.bindings,
            next_record: 0,
            position: 0,
            encoding_fallback: false,
            done: false,
        }
    }

    /// Materialize the whole table.
    pub fn decode_eager(self) -> Result<DecodedTable, DecodeError> {
        let mut iter = self.records();
        let mut records = Vec::with_capacity(iter.header.record_count as usize);
        while let Some(record) = iter.try_next()? {
            records.push(record);
        }
        Ok(DecodedTable {
            records,
            advisories: iter.advisories(),
        })
    }
}

/// Lazy record iterator; yields `Err` once on structural corruption, then
/// ends.
pub struct RecordIter {
    path: PathBuf,
    header: DbfHeader,
    reader: BufReader<File>,
    table: TableDef,
    bindings: Vec<Option<usize>>,
    next_record: u32,
    position: u32,
    encoding_fallback: bool,
    done: bool,
}

impl RecordIter {
    /// Advisories collected so far.
    pub fn advisories(&self) -> Vec<String> {
        if self.encoding_fallback {
            vec!["text decoded with permissive fallback encoding".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Read the next non-deleted record.
    pub fn try_next(&mut self) -> Result<Option<Record>, DecodeError> {
        if self.done {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.header.record_len];
        loop {
            if self.next_record >= self.header.record_count {
                self.done = true;
                return Ok(None);
            }
            let index = self.next_record;
            self.reader.read_exact(&mut buf).map_err(|e| {
                self.done = true;
                DecodeError::Record {
                    path: self.path.clone(),
                    index,
                    detail: format!("record boundary unreadable: {e}"),
                }
            })?;
            self.next_record += 1;

            if buf[0] == DELETED_FLAG {
                continue;
            }

            let record = self.convert(&buf);
            self.position += 1;
            return Ok(Some(record));
        }
    }

    fn convert(&mut self, buf: &[u8]) -> Record {
        let mut fields = Vec::with_capacity(self.table.fields.len());
        for (field, binding) in self.table.fields.iter().zip(&self.bindings) {
            let value = match binding {
                None => Value::Null,
                Some(column_index) => {
                    let column = &self.header.columns[*column_index];
                    let raw = &buf[column.offset..column.offset + column.length];
                    convert_value(field, raw, &mut self.encoding_fallback)
                }
            };
            fields.push((field.name.clone(), value));
        }
        Record::new(&self.table.name, self.position, fields)
    }
}

impl Iterator for RecordIter {
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn convert_value(field: &FieldDef, raw: &[u8], encoding_fallback: &mut bool) -> Value {
    match field.kind {
        FieldKind::Text => {
            let (text, fallback) = decode_text(raw);
            *encoding_fallback |= fallback;
            Value::Text(text)
        }
        FieldKind::Int => match trimmed_ascii(raw) {
            "" => Value::Null,
            text => text.parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        },
        FieldKind::Float => match trimmed_ascii(raw) {
            "" => Value::Null,
            text => text.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        },
        FieldKind::Date => parse_date(trimmed_ascii(raw)),
        FieldKind::Bool => match trimmed_ascii(raw).bytes().next() {
            Some(b'T' | b't' | b'Y' | b'y' | b'1') => Value::Bool(true),
            Some(b'F' | b'f' | b'N' | b'n' | b'0') => Value::Bool(false),
            _ => Value::Null,
        },
    }
}

fn trimmed_ascii(raw: &[u8]) -> &str {
    std::str::from_utf8(raw)
        .unwrap_or("")
        .trim_matches(|c| c == ' ' || c == '\0')
}

/// `YYYYMMDD`; blank is null, as is anything outside the plausible range
/// of the archives.
fn parse_date(text: &str) -> Value {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Value::Null;
    }
    let year: i32 = text[0..4].parse().unwrap_or(0);
    let month: u32 = text[4..6].parse().unwrap_or(0);
    let day: u32 = text[6..8].parse().unwrap_or(0);
    if !(1900..=2100).contains(&year) {
        return Value::Null;
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Value::Date)
        .unwrap_or(Value::Null)
}
