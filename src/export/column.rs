//! Per-column literal encoding.
//!
//! Each column of a dumped table is assigned a [`ColumnKind`] once, from its
//! declared type name, and keeps it for every row. A [`Column`] is the decode
//! target the row source fills and the encoder that renders the value as a
//! SQL literal.

use bytes::BytesMut;

use super::escape::escape_into;

const NULL_LITERAL: &[u8] = b"NULL";
const QUOTE: u8 = b'\'';
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// How a column's value is rendered into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Quoted, escaped literal: character, text, temporal, enum, set and json types.
    String,
    /// Verbatim unquoted literal: integer, float, decimal and boolean types.
    Number,
    /// Hex literal `x'..'`: blob, binary and bit types.
    Binary,
}

impl ColumnKind {
    /// Map a column type name to its rendering kind.
    ///
    /// Matching ignores ASCII case. Unknown types are rendered as strings,
    /// which is always a valid literal.
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name.trim().to_ascii_uppercase().as_str() {
            "CHAR" | "NCHAR" | "VARCHAR" | "NVARCHAR" | "CHARACTER" | "VARCHARACTER"
            | "TIMESTAMP" | "DATETIME" | "DATE" | "TIME" | "YEAR" | "SQL_TSI_YEAR" | "TEXT"
            | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" | "JSON" => {
                ColumnKind::String
            }
            "INTEGER" | "BIGINT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INT1"
            | "INT2" | "INT3" | "INT8" | "FLOAT" | "REAL" | "DOUBLE" | "DOUBLE PRECISION"
            | "DECIMAL" | "NUMERIC" | "FIXED" | "BOOL" | "BOOLEAN" => ColumnKind::Number,
            "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "LONG" | "BINARY" | "VARBINARY"
            | "BIT" => ColumnKind::Binary,
            _ => ColumnKind::String,
        }
    }
}

/// One column of a row image.
///
/// The value buffer is reused across rows, so decoding a row does not
/// allocate once the buffer has grown to the column's typical width.
#[derive(Debug, Clone)]
pub struct Column {
    kind: ColumnKind,
    value: Vec<u8>,
    present: bool,
}

impl Column {
    /// Create an empty (NULL) column of the given kind.
    pub fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            value: Vec::new(),
            present: false,
        }
    }

    /// Create an empty column for a declared type name.
    pub fn for_type(type_name: &str) -> Self {
        Self::new(ColumnKind::from_type_name(type_name))
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Store a present value.
    pub fn set_bytes(&mut self, raw: &[u8]) {
        self.value.clear();
        self.value.extend_from_slice(raw);
        self.present = true;
    }

    /// Store SQL NULL.
    pub fn set_null(&mut self) {
        self.value.clear();
        self.present = false;
    }

    /// Store either a value or NULL.
    pub fn set(&mut self, raw: Option<&[u8]>) {
        match raw {
            Some(raw) => self.set_bytes(raw),
            None => self.set_null(),
        }
    }

    /// The stored value, `None` for NULL.
    pub fn value(&self) -> Option<&[u8]> {
        self.present.then_some(self.value.as_slice())
    }

    pub fn is_null(&self) -> bool {
        !self.present
    }

    /// Approximate serialized size, used for flush decisions.
    ///
    /// This is the raw value length, not the escaped or hex-expanded one.
    pub fn report_size(&self) -> u64 {
        match self.value() {
            Some(raw) => raw.len() as u64,
            None => NULL_LITERAL.len() as u64,
        }
    }

    /// Append the SQL literal for this value to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut, escape_backslash: bool) {
        let Some(raw) = self.value() else {
            buf.extend_from_slice(NULL_LITERAL);
            return;
        };
        match self.kind {
            ColumnKind::String => {
                buf.extend_from_slice(&[QUOTE]);
                escape_into(raw, escape_backslash, buf);
                buf.extend_from_slice(&[QUOTE]);
            }
            ColumnKind::Number => buf.extend_from_slice(raw),
            ColumnKind::Binary => write_hex_literal(raw, buf),
        }
    }

    /// Render the SQL literal as a string.
    ///
    /// Bytes that are not valid UTF-8 are replaced; use [`Column::write_to`]
    /// when the exact bytes matter.
    pub fn to_sql(&self, escape_backslash: bool) -> String {
        let mut buf = BytesMut::with_capacity(self.report_size() as usize + 2);
        self.write_to(&mut buf, escape_backslash);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_hex_literal(raw: &[u8], buf: &mut BytesMut) {
    buf.reserve(2 * raw.len() + 3);
    buf.extend_from_slice(b"x'");
    for &b in raw {
        buf.extend_from_slice(&[
            HEX_DIGITS[usize::from(b >> 4)],
            HEX_DIGITS[usize::from(b & 0x0f)],
        ]);
    }
    buf.extend_from_slice(&[QUOTE]);
}
