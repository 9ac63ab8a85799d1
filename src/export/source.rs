//! Row-source abstractions for dump operations
//!
//! A dump consumes a [`TableData`]: table-level facts (name, column types,
//! dialect, optional explicit column list) plus a row sequence segmented into
//! groups, one INSERT statement per group. Rows are decoded straight into the
//! dumper's [`RowImage`], so a source never allocates per-row objects.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::{DecodeError, Result};

use super::row::RowImage;

/// Row stream for one table
#[async_trait]
pub trait TableData: Send {
    /// Name placed in the statement's identifier position
    fn table_name(&self) -> &str;

    /// Declared column type names, in column order
    fn column_types(&self) -> &[String];

    /// Explicit column list such as `` (`a`,`b`) ``, present when generated
    /// columns must be left out of the implicit list
    fn selected_field(&self) -> Option<&str> {
        None
    }

    /// Whether string literals use backslash escapes (`false` for
    /// `NO_BACKSLASH_ESCAPES` servers)
    fn escape_backslash(&self) -> bool {
        true
    }

    /// Dialect hint lines written verbatim before any data
    fn special_comments(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(std::iter::empty())
    }

    /// Advance to the next row group
    ///
    /// # Returns
    /// * `Result<bool>` - `false` once every group has been consumed
    async fn next_group(&mut self) -> Result<bool>;

    /// Decode the next row of the current group into `row`
    ///
    /// # Returns
    /// * `Result<bool>` - `false` at the end of the current group
    async fn next_row(&mut self, row: &mut RowImage) -> Result<bool>;
}

/// Schema object whose creation statement precedes its data
pub trait MetaData: Send + Sync {
    /// Name of the object described, for logging
    fn target_name(&self) -> &str;

    /// Statement text without the trailing `;`
    fn meta_sql(&self) -> &str;

    /// Dialect hint lines written before the statement
    fn special_comments(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(std::iter::empty())
    }
}

/// Raw column values of one row; `None` is SQL NULL
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Fill `row` from raw values, checking the column count
pub fn decode_raw_row(values: &[Option<Vec<u8>>], row: &mut RowImage) -> Result<()> {
    let targets = row.bind();
    if targets.len() != values.len() {
        return Err(DecodeError::ColumnCount {
            expected: targets.len(),
            found: values.len(),
        }
        .into());
    }
    for (target, value) in targets.iter_mut().zip(values) {
        target.set(value.as_deref());
    }
    Ok(())
}

/// In-memory table, already segmented into row groups
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    name: String,
    column_types: Vec<String>,
    selected_field: Option<String>,
    escape_backslash: bool,
    special_comments: Vec<String>,
    groups: VecDeque<Vec<RawRow>>,
    current: VecDeque<RawRow>,
}

impl MemoryTable {
    pub fn new<S: AsRef<str>>(name: &str, column_types: &[S]) -> Self {
        Self {
            name: name.to_string(),
            column_types: column_types.iter().map(|t| t.as_ref().to_string()).collect(),
            escape_backslash: true,
            ..Default::default()
        }
    }

    /// Append a row group (one INSERT statement)
    pub fn with_group(mut self, rows: Vec<RawRow>) -> Self {
        self.groups.push_back(rows);
        self
    }

    /// Append `rows` split into groups of at most `rows_per_group` (0 = one group)
    pub fn with_rows(mut self, rows: Vec<RawRow>, rows_per_group: usize) -> Self {
        if rows.is_empty() {
            return self;
        }
        if rows_per_group == 0 {
            self.groups.push_back(rows);
            return self;
        }
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            self.groups
                .push_back(rows.by_ref().take(rows_per_group).collect());
        }
        self
    }

    pub fn with_selected_field(mut self, field: &str) -> Self {
        self.selected_field = Some(field.to_string());
        self
    }

    pub fn with_escape_backslash(mut self, escape_backslash: bool) -> Self {
        self.escape_backslash = escape_backslash;
        self
    }

    pub fn with_special_comment(mut self, comment: &str) -> Self {
        self.special_comments.push(comment.to_string());
        self
    }
}

#[async_trait]
impl TableData for MemoryTable {
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
        match self.groups.pop_front() {
            Some(group) => {
                self.current = group.into();
                Ok(true)
            }
            None => {
                self.current.clear();
                Ok(false)
            }
        }
    }

    async fn next_row(&mut self, row: &mut RowImage) -> Result<bool> {
        match self.current.pop_front() {
            Some(values) => {
                decode_raw_row(&values, row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Creation statement held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryMeta {
    pub target: String,
    pub sql: String,
    pub special_comments: Vec<String>,
}

impl MetaData for MemoryMeta {
    fn target_name(&self) -> &str {
        &self.target
    }

    fn meta_sql(&self) -> &str {
        &self.sql
    }

    fn special_comments(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(self.special_comments.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[Option<&str>]) -> RawRow {
        values.iter().map(|v| v.map(|s| s.as_bytes().to_vec())).collect()
    }

    #[tokio::test]
    async fn test_memory_table_groups() {
        let rows = (0..5).map(|i| raw(&[Some(i.to_string().as_str())])).collect();
        let mut table = MemoryTable::new("t", &["INT"]).with_rows(rows, 2);
        let mut row = RowImage::from_types(table.column_types());

        let mut sizes = Vec::new();
        while table.next_group().await.unwrap() {
            let mut n = 0;
            while table.next_row(&mut row).await.unwrap() {
                n += 1;
            }
            sizes.push(n);
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_decode_checks_arity() {
        let mut table =
            MemoryTable::new("t", &["INT", "TEXT"]).with_group(vec![raw(&[Some("1")])]);
        let mut row = RowImage::from_types(table.column_types());

        assert!(table.next_group().await.unwrap());
        let err = table.next_row(&mut row).await.unwrap_err();
        assert_eq!(err.to_string(), "Decode error: expected 2 columns, found 1");
    }

    #[test]
    fn test_with_rows_single_group() {
        let rows = vec![raw(&[None]), raw(&[None])];
        let table = MemoryTable::new("t", &["INT"]).with_rows(rows, 0);
        assert_eq!(table.groups.len(), 1);
        assert_eq!(MemoryTable::new("t", &["INT"]).with_rows(vec![], 3).groups.len(), 0);
    }
}
