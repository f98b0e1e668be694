//! Shared fixtures: a small catalog and hand-written DBF files.

#![allow(dead_code)]

use std::path::Path;

use plan5_core::catalog::{Catalog, FieldDef, FieldKind, RelationDef, TableDef};

/// Write a minimal dBase III file: `columns` are `(name, type, length)`,
/// each row a vector of pre-formatted cell strings.
pub fn write_dbf(path: &Path, columns: &[(&str, u8, u8)], rows: &[Vec<String>]) {
    let header_len = 32 + columns.len() * 32 + 1;
    let record_len = 1 + columns.iter().map(|&(_, _, l)| l as usize).sum::<usize>();

    let mut bytes = vec![0u8; 32];
    bytes[0] = 0x03;
    bytes[4..8].copy_from_slice(&(rows.len() as u32).to_le_bytes());
    bytes[8..10].copy_from_slice(&(header_len as u16).to_le_bytes());
    bytes[10..12].copy_from_slice(&(record_len as u16).to_le_bytes());

    for &(name, kind, length) in columns {
        let mut descriptor = [0u8; 32];
        descriptor[..name.len()].copy_from_slice(name.as_bytes());
        descriptor[11] = kind;
        descriptor[16] = length;
        bytes.extend_from_slice(&descriptor);
    }
    bytes.push(0x0D);

    for row in rows {
        bytes.push(b' ');
        for (value, &(_, _, length)) in row.iter().zip(columns) {
            let mut cell = value.clone().into_bytes();
            assert!(
                cell.len() <= length as usize,
                "cell {value:?} exceeds column width {length}"
            );
            cell.resize(length as usize, b' ');
            bytes.extend_from_slice(&cell);
        }
    }
    bytes.push(0x1A);

    std::fs::write(path, bytes).unwrap();
}

/// Right-justified numeric cell, as dBase writes numbers.
pub fn num(value: i64, width: usize) -> String {
    format!("{value:>width$}")
}

/// A catalog covering employees, absences, and leave types.
pub fn test_catalog() -> Catalog {
    Catalog::builder()
        .table(
            TableDef::new("5EMPL")
                .with_description("Employee master data")
                .with_field(FieldDef::required("id", FieldKind::Int))
                .with_field(FieldDef::required("name", FieldKind::Text))
                .with_field(FieldDef::new("firstname", FieldKind::Text))
                .with_field(FieldDef::new("hrsweek", FieldKind::Float)),
        )
        .table(
            TableDef::new("5LEAVT")
                .with_field(FieldDef::required("id", FieldKind::Int))
                .with_field(FieldDef::required("name", FieldKind::Text)),
        )
        .table(
            TableDef::new("5ABSEN")
                .with_field(FieldDef::required("id", FieldKind::Int))
                .with_field(FieldDef::required("employee_id", FieldKind::Int).with_column("EMPLOYEEID"))
                .with_field(FieldDef::new("leave_type_id", FieldKind::Int).with_column("LEAVETYPID"))
                .with_field(FieldDef::new("date", FieldKind::Date)),
        )
        .relation(RelationDef::one_to_many(
            "employee_absences",
            "5EMPL",
            "id",
            "5ABSEN",
            "employee_id",
        ))
        .relation(RelationDef::one_to_many(
            "leave_type_absences",
            "5LEAVT",
            "id",
            "5ABSEN",
            "leave_type_id",
        ))
        .build()
        .unwrap()
}

pub const EMPL_COLUMNS: &[(&str, u8, u8)] = &[
    ("ID", b'N', 6),
    ("NAME", b'C', 20),
    ("FIRSTNAME", b'C', 20),
    ("HRSWEEK", b'N', 8),
];

pub const LEAVT_COLUMNS: &[(&str, u8, u8)] = &[("ID", b'N', 6), ("NAME", b'C', 20)];

pub const ABSEN_COLUMNS: &[(&str, u8, u8)] = &[
    ("ID", b'N', 6),
    ("EMPLOYEEID", b'N', 6),
    ("LEAVETYPID", b'N', 6),
    ("DATE", b'D', 8),
];

pub fn employee_row(id: i64, name: &str, firstname: &str, hrsweek: &str) -> Vec<String> {
    vec![
        num(id, 6),
        name.to_string(),
        firstname.to_string(),
        hrsweek.to_string(),
    ]
}

pub fn absence_row(id: i64, employee_id: i64, leave_type_id: i64, date: &str) -> Vec<String> {
    vec![
        num(id, 6),
        num(employee_id, 6),
        num(leave_type_id, 6),
        date.to_string(),
    ]
}

/// Write the default archive: two employees, one leave type, three
/// absences (two for employee 1, one for employee 2).
pub fn write_archive(dir: &Path) {
    write_dbf(
        &dir.join("5EMPL.DBF"),
        EMPL_COLUMNS,
        &[
            employee_row(1, "Mustermann", "Max", "   38.50"),
            employee_row(2, "Beispiel", "Erika", "   20.00"),
        ],
    );
    write_dbf(
        &dir.join("5LEAVT.DBF"),
        LEAVT_COLUMNS,
        &[vec![num(1, 6), "Urlaub".to_string()]],
    );
    write_dbf(
        &dir.join("5ABSEN.DBF"),
        ABSEN_COLUMNS,
        &[
            absence_row(10, 1, 1, "20240102"),
            absence_row(11, 1, 1, "20240103"),
            absence_row(12, 2, 1, "20240104"),
        ],
    );
}
