//! Schema statement output.

use tracing::{debug, error};

use crate::error::Result;

use super::source::MetaData;
use super::writers::SqlWriter;

/// Write a schema object's creation statement straight to `writer`
///
/// Each special comment is written as its own line, then the statement
/// terminated by `;\n`. No pipe is involved; the first error is returned.
pub async fn write_meta(meta: &dyn MetaData, writer: &dyn SqlWriter) -> Result<()> {
    debug!("writing meta for {}", meta.target_name());

    let mut text = String::new();
    for comment in meta.special_comments() {
        text.push_str(&comment);
        text.push('\n');
    }
    text.push_str(meta.meta_sql());
    text.push_str(";\n");

    writer.write_all(text.as_bytes()).await.inspect_err(|e| {
        error!("writing meta for {} failed: {}", meta.target_name(), e);
    })
}
