//! dBase-style (DBF) binary table decoding.

mod decoder;
mod encoding;
mod header;

pub use decoder::{DecodedTable, Decoder, RecordIter};
pub use header::{DbfColumn, DbfHeader};
