use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use scout_core::{ResultRow, RESULT_COLUMNS};

use crate::persist::{AtomicFileWriter, PersistError};

pub const DEFAULT_EXPORT_FILE_NAME: &str = "linkedin_job_offers.csv";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// UTF-8 CSV with a header row, one record per row in buffer order.
///
/// The header is written even when `rows` is empty.
pub fn encode_csv(rows: &[ResultRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(RESULT_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}

/// Parses bytes produced by [`encode_csv`].
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<ResultRow>, ExportError> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .collect::<Result<Vec<ResultRow>, _>>()
        .map_err(ExportError::from)
}

/// Writes `rows` to `{dir}/{file_name}` atomically and returns the final path.
pub fn write_csv(dir: &Path, file_name: &str, rows: &[ResultRow]) -> Result<PathBuf, ExportError> {
    let bytes = encode_csv(rows)?;
    let path = AtomicFileWriter::new(dir.to_path_buf()).write(file_name, &bytes)?;
    engine_info!("Exported {} rows to {:?}", rows.len(), path);
    Ok(path)
}
