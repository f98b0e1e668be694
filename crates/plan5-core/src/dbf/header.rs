//! dBase III header and column descriptor parsing.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::DecodeError;

/// Size of the fixed header prelude.
pub(crate) const PRELUDE_SIZE: usize = 32;
/// Size of one column descriptor.
pub(crate) const DESCRIPTOR_SIZE: usize = 32;
/// Byte terminating the descriptor area.
pub(crate) const HEADER_TERMINATOR: u8 = 0x0D;
/// Deletion flag marking a record as removed.
pub(crate) const DELETED_FLAG: u8 = b'*';

/// One column as laid out in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfColumn {
    /// Uppercase column header (at most 10 characters).
    pub name: String,
    /// dBase type character: `C`, `N`, `F`, `D`, `L`, or `M`.
    pub kind: u8,
    /// Field width in bytes.
    pub length: usize,
    /// Decimal places for numeric columns.
    pub decimals: u8,
    /// Byte offset of the field within a record (the deletion flag is
    /// byte 0).
    pub offset: usize,
}

/// Parsed file header: record geometry plus the column layout.
#[derive(Debug, Clone)]
pub struct DbfHeader {
    /// Number of records the header declares.
    pub record_count: u32,
    /// Total header length in bytes (prelude + descriptors + terminator).
    pub header_len: usize,
    /// Length of one record in bytes, including the deletion flag.
    pub record_len: usize,
    /// Date of last update, if the header carries a plausible one.
    pub last_update: Option<NaiveDate>,
    /// Column descriptors in file order.
    pub columns: Vec<DbfColumn>,
}

impl DbfHeader {
    /// Read and validate the header from the start of `reader`.
    ///
    /// Fails with [`DecodeError::Header`] whenever the declared geometry is
    /// inconsistent with itself or with `file_len`.
    pub fn read(reader: &mut impl Read, file_len: u64, path: &Path) -> Result<Self, DecodeError> {
        let mut prelude = [0u8; PRELUDE_SIZE];
        reader.read_exact(&mut prelude).map_err(|_| header_err(
            path,
            format!("file is shorter than the {PRELUDE_SIZE}-byte header prelude"),
        ))?;

        let record_count = u32::from_le_bytes([prelude[4], prelude[5], prelude[6], prelude[7]]);
        let header_len = u16::from_le_bytes([prelude[8], prelude[9]]) as usize;
        let record_len = u16::from_le_bytes([prelude[10], prelude[11]]) as usize;

        if header_len < PRELUDE_SIZE + 1 {
            return Err(header_err(
                path,
                format!("declared header length {header_len} is impossibly small"),
            ));
        }
        if record_len == 0 {
            return Err(header_err(path, "declared record length is zero"));
        }

        let mut descriptor_area = vec![0u8; header_len - PRELUDE_SIZE];
        reader.read_exact(&mut descriptor_area).map_err(|_| {
            header_err(
                path,
                format!("file is shorter than the declared header length {header_len}"),
            )
        })?;

        let columns = parse_columns(&descriptor_area, path)?;

        let layout_len: usize = 1 + columns.iter().map(|c| c.length).sum::<usize>();
        if layout_len != record_len {
            return Err(header_err(
                path,
                format!(
                    "record length {record_len} disagrees with the field layout ({layout_len} bytes)"
                ),
            ));
        }

        let expected = header_len as u64 + record_count as u64 * record_len as u64;
        if expected > file_len {
            return Err(header_err(
                path,
                format!(
                    "header declares {record_count} records of {record_len} bytes but the file \
                     holds only {file_len} bytes"
                ),
            ));
        }

        let last_update = parse_last_update(&prelude);

        Ok(Self {
            record_count,
            header_len,
            record_len,
            last_update,
            columns,
        })
    }

    /// Look up a column by header (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&DbfColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

fn parse_columns(area: &[u8], path: &Path) -> Result<Vec<DbfColumn>, DecodeError> {
    let mut columns = Vec::new();
    let mut offset_in_record = 1usize; // byte 0 is the deletion flag
    let mut pos = 0usize;

    loop {
        if pos >= area.len() {
            return Err(header_err(path, "descriptor area ends without terminator"));
        }
        if area[pos] == HEADER_TERMINATOR {
            break;
        }
        if pos + DESCRIPTOR_SIZE > area.len() {
            return Err(header_err(path, "truncated column descriptor"));
        }

        let descriptor = &area[pos..pos + DESCRIPTOR_SIZE];
        let name_bytes = &descriptor[..11];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(11);
        let name = String::from_utf8_lossy(&name_bytes[..name_end])
            .trim()
            .to_string();
        if name.is_empty() {
            return Err(header_err(path, "column descriptor with empty name"));
        }

        let length = descriptor[16] as usize;
        if length == 0 {
            return Err(header_err(path, format!("column {name} has zero width")));
        }

        columns.push(DbfColumn {
            name,
            kind: descriptor[11],
            length,
            decimals: descriptor[17],
            offset: offset_in_record,
        });
        offset_in_record += length;
        pos += DESCRIPTOR_SIZE;
    }

    if columns.is_empty() {
        return Err(header_err(path, "file declares no columns"));
    }

    Ok(columns)
}

fn parse_last_update(prelude: &[u8]) -> Option<NaiveDate> {
    let year = 1900 + prelude[1] as i32;
    NaiveDate::from_ymd_opt(year, prelude[2] as u32, prelude[3] as u32)
}

fn header_err(path: &Path, detail: impl Into<String>) -> DecodeError {
    DecodeError::Header {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    /// Build header bytes for the given columns: `(name, kind, length)`.
    fn header_bytes(record_count: u32, columns: &[(&str, u8, u8)]) -> Vec<u8> {
        let header_len = PRELUDE_SIZE + columns.len() * DESCRIPTOR_SIZE + 1;
        let record_len = 1 + columns.iter().map(|&(_, _, l)| l as usize).sum::<usize>();

        let mut bytes = vec![0u8; PRELUDE_SIZE];
        bytes[0] = 0x03; // dBase III without memo
        bytes[1] = 99; // 1999-

        bytes[2] = 7;
        bytes[3] = 1;
        bytes[4..8].copy_from_slice(&record_count.to_le_bytes());
        bytes[8..10].copy_from_slice(&(header_len as u16).to_le_bytes());
        bytes[10..12].copy_from_slice(&(record_len as u16).to_le_bytes());

        for &(name, kind, length) in columns {
            let mut descriptor = [0u8; DESCRIPTOR_SIZE];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = kind;
            descriptor[16] = length;
            bytes.extend_from_slice(&descriptor);
        }
        bytes.push(HEADER_TERMINATOR);
        bytes
    }

    #[test]
    fn test_parse_valid_header() {
        let bytes = header_bytes(2, &[("ID", b'N', 6), ("NAME", b'C', 20)]);
        let file_len = bytes.len() as u64 + 2 * 27;
        let header =
            DbfHeader::read(&mut Cursor::new(&bytes), file_len, &PathBuf::from("5EMPL.DBF"))
                .unwrap();

        assert_eq!(header.record_count, 2);
        assert_eq!(header.record_len, 27);
        assert_eq!(header.columns.len(), 2);
        assert_eq!(header.columns[0].offset, 1);
        assert_eq!(header.columns[1].offset, 7);
        assert_eq!(header.last_update, NaiveDate::from_ymd_opt(1999, 7, 1));
        assert!(header.column("name").is_some());
    }

    #[test]
    fn test_truncated_prelude_rejected() {
        let err = DbfHeader::read(&mut Cursor::new(&[0u8; 10]), 10, &PathBuf::from("x.DBF"))
            .unwrap_err();
        assert!(err.to_string().contains("header prelude"));
    }

    #[test]
    fn test_record_count_beyond_file_size_rejected() {
        let bytes = header_bytes(1000, &[("ID", b'N', 6)]);
        let file_len = bytes.len() as u64 + 7; // room for one record only
        let err = DbfHeader::read(&mut Cursor::new(&bytes), file_len, &PathBuf::from("x.DBF"))
            .unwrap_err();
        assert!(err.to_string().contains("holds only"));
    }

    #[test]
    fn test_record_length_mismatch_rejected() {
        let mut bytes = header_bytes(1, &[("ID", b'N', 6)]);
        // Corrupt the declared record length.
        bytes[10..12].copy_from_slice(&99u16.to_le_bytes());
        let err = DbfHeader::read(&mut Cursor::new(&bytes), 10_000, &PathBuf::from("x.DBF"))
            .unwrap_err();
        assert!(err.to_string().contains("disagrees"));
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let mut bytes = header_bytes(0, &[("ID", b'N', 6)]);
        let len = bytes.len();
        bytes[len - 1] = 0x20; // overwrite the 0x0D terminator
        let err = DbfHeader::read(&mut Cursor::new(&bytes), 10_000, &PathBuf::from("x.DBF"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Header { .. }));
    }
}
