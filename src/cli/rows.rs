//! JSON Lines row source
//!
//! Each non-blank line of the input is a JSON array with one element per
//! column. Rows are segmented into groups of `rows_per_statement` rows, or a
//! single group when that is 0.

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use crate::config::TableConfig;
use crate::error::{DecodeError, Result, SourceError};
use crate::export::{Column, ColumnKind, RowImage, TableData};

/// Row file read line by line
pub struct JsonLinesTable {
    name: String,
    column_types: Vec<String>,
    selected_field: Option<String>,
    special_comments: Vec<String>,
    escape_backslash: bool,
    rows_per_statement: usize,
    lines: Lines<BufReader<File>>,
    /// 1-based number of the last line read
    line: usize,
    rows_in_group: usize,
    exhausted: bool,
}

impl JsonLinesTable {
    /// Open `path` as the row file for `table`
    ///
    /// # Arguments
    /// * `path` - Row file path
    /// * `table` - Table description (name, columns, comments)
    /// * `escape_backslash` - String literal dialect
    /// * `rows_per_statement` - Group size, 0 for one group
    pub async fn open(
        path: &str,
        table: &TableConfig,
        escape_backslash: bool,
        rows_per_statement: usize,
    ) -> Result<Self> {
        let file = File::open(path)
            .await
            .map_err(|e| SourceError::ReadFailed(format!("{}: {}", path, e)))?;
        debug!("reading rows from {}", path);

        Ok(Self {
            name: table.name.clone(),
            column_types: table.column_types(),
            selected_field: table.selected_field.clone(),
            special_comments: table.special_comments.clone(),
            escape_backslash,
            rows_per_statement,
            lines: BufReader::new(file).lines(),
            line: 0,
            rows_in_group: 0,
            exhausted: false,
        })
    }

    /// Next non-blank line, or `None` at end of input
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let next = self
                .lines
                .next_line()
                .await
                .map_err(|e| SourceError::ReadFailed(format!("line {}: {}", self.line + 1, e)))?;
            let Some(text) = next else {
                return Ok(None);
            };
            self.line += 1;
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
        }
    }
}

/// Store one JSON value into `column`
///
/// Number columns are written unquoted, so they only accept JSON numbers,
/// booleans and strings that are plain numeric literals.
fn set_value(column: &mut Column, index: usize, line: usize, value: &Value) -> Result<()> {
    let invalid = |reason: String| DecodeError::InvalidValue {
        column: index,
        reason: format!("line {}: {}", line, reason),
    };

    match (column.kind(), value) {
        (_, Value::Null) => column.set_null(),
        (_, Value::Bool(b)) => column.set_bytes(if *b { b"1" } else { b"0" }),
        // digits are kept exactly as written in the row file
        (_, Value::Number(n)) => column.set_bytes(n.to_string().as_bytes()),
        (ColumnKind::Binary, Value::String(s)) => {
            let bytes = hex::decode(s).map_err(|e| invalid(format!("invalid hex: {}", e)))?;
            column.set_bytes(&bytes);
        }
        (ColumnKind::Number, Value::String(s)) => {
            if !is_numeric_literal(s) {
                return Err(invalid(format!("not a numeric literal: {:?}", s)).into());
            }
            column.set_bytes(s.as_bytes());
        }
        (ColumnKind::Number, other) => {
            return Err(invalid(format!("not a numeric literal: {}", other)).into());
        }
        (_, Value::String(s)) => column.set_bytes(s.as_bytes()),
        // nested values are stored as their JSON text
        (_, other) => column.set_bytes(other.to_string().as_bytes()),
    }
    Ok(())
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, with digits on at least one side of the point
fn is_numeric_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_end = digits_from(i);
    let mut mantissa_digits = int_end - i;
    i = int_end;
    if bytes.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        mantissa_digits += frac_end - (i + 1);
        i = frac_end;
    }
    if mantissa_digits == 0 {
        return false;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_end = digits_from(i);
        if exp_end == i {
            return false;
        }
        i = exp_end;
    }
    i == bytes.len()
}

/// Parse one line into `row`
fn decode_line(text: &str, line: usize, row: &mut RowImage) -> Result<()> {
    let values: Vec<Value> = serde_json::from_str(text).map_err(|e| SourceError::Malformed {
        line,
        reason: e.to_string(),
    })?;

    let columns = row.bind();
    if values.len() != columns.len() {
        return Err(DecodeError::Failed(format!(
            "line {}: expected {} columns, found {}",
            line,
            columns.len(),
            values.len()
        ))
        .into());
    }

    for (index, (column, value)) in columns.iter_mut().zip(&values).enumerate() {
        set_value(column, index, line, value)?;
    }
    Ok(())
}

#[async_trait]
impl TableData for JsonLinesTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn column_types(&self) -> &[String] {
        &self.column_types
    }

    fn selected_field(&self) -> Option<&str> {
        self.selected_field.as_deref()
    }

    fn escape_backslash(&self) -> bool {
        self.escape_backslash
    }

    fn special_comments(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(self.special_comments.iter().cloned())
    }

    async fn next_group(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.rows_in_group = 0;
        Ok(true)
    }

    async fn next_row(&mut self, row: &mut RowImage) -> Result<bool> {
        if self.exhausted
            || (self.rows_per_statement > 0 && self.rows_in_group >= self.rows_per_statement)
        {
            return Ok(false);
        }

        let Some(text) = self.next_line().await? else {
            debug!("row file of {} exhausted after {} lines", self.name, self.line);
            self.exhausted = true;
            return Ok(false);
        };

        decode_line(&text, self.line, row)?;
        self.rows_in_group += 1;
        Ok(true)
    }
}
