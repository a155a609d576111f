//! CSV rendering of result pages.

use crate::executor::PagedResult;
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Render a result as RFC 4180 CSV.
///
/// The header row holds the qualified column keys. Cells are quoted only
/// when needed; nulls become empty fields.
pub fn to_csv(result: &PagedResult) -> Result<String, ExportError> {
    let keys: Vec<String> = result.columns.iter().map(|c| c.key()).collect();
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&keys)?;

    for row in &result.rows {
        writer.write_record(
            keys.iter()
                .map(|k| row.get(k).unwrap_or(&Value::Null).to_string()),
        )?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
