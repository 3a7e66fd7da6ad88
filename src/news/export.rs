//! CSV export of the extracted news texts.
//!
//! One column headed `新闻内容`, UTF-8 with a byte-order mark so that
//! spreadsheet tools pick the right encoding. Overwritten on every run.

use std::path::Path;

use thiserror::Error;

/// Header of the single export column.
pub const EXPORT_HEADER: &str = "新闻内容";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to access export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Export has no '{}' header", EXPORT_HEADER)]
    MissingHeader,
}

/// Serialize texts into export bytes (BOM, header, one row per text).
pub fn to_export_bytes<S: AsRef<str>>(texts: &[S]) -> Result<Vec<u8>, ExportError> {
    let mut buf = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record([EXPORT_HEADER])?;
        for text in texts {
            writer.write_record([text.as_ref()])?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Write the export to `path`, creating parent directories.
pub fn write_export<S: AsRef<str>>(path: &Path, texts: &[S]) -> Result<(), ExportError> {
    let bytes = to_export_bytes(texts)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;

    tracing::info!(path = %path.display(), rows = texts.len(), "Wrote news export");
    Ok(())
}

/// Parse export bytes back into texts. The BOM is optional.
pub fn parse_export(bytes: &[u8]) -> Result<Vec<String>, ExportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    if reader.headers()?.get(0) != Some(EXPORT_HEADER) {
        return Err(ExportError::MissingHeader);
    }

    let mut texts = Vec::new();
    for record in reader.records() {
        let record = record?;
        texts.push(record.get(0).unwrap_or_default().to_string());
    }
    Ok(texts)
}

pub fn read_export(path: &Path) -> Result<Vec<String>, ExportError> {
    parse_export(&std::fs::read(path)?)
}
