//! Row images: one reusable set of column decode targets per table dump.

use bytes::BytesMut;

use super::column::Column;

/// Ordered columns of one decoded row, in declaration order.
///
/// A row image is built once per table from the column type names and
/// refilled for every row by the row source.
#[derive(Debug, Clone)]
pub struct RowImage {
    columns: Vec<Column>,
}

impl RowImage {
    /// Build a row image from column type names.
    pub fn from_types<S: AsRef<str>>(column_types: &[S]) -> Self {
        Self {
            columns: column_types
                .iter()
                .map(|t| Column::for_type(t.as_ref()))
                .collect(),
        }
    }

    /// Decode targets for every column, in order.
    pub fn bind(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Sum of the per-column size estimates.
    pub fn report_size(&self) -> u64 {
        self.columns.iter().map(Column::report_size).sum()
    }

    /// Append `(v1,v2,...)` to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut, escape_backslash: bool) {
        buf.extend_from_slice(b"(");
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                buf.extend_from_slice(b",");
            }
            column.write_to(buf, escape_backslash);
        }
        buf.extend_from_slice(b")");
    }

    /// Render `(v1,v2,...)` as a string. Invalid UTF-8 is replaced.
    pub fn to_sql(&self, escape_backslash: bool) -> String {
        let mut buf = BytesMut::with_capacity(self.report_size() as usize + 2 * self.len() + 2);
        self.write_to(&mut buf, escape_backslash);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
