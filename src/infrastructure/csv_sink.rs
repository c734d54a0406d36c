//! Append-only CSV destination for extracted records
//!
//! The file is opened in append mode for every batch, so a restart simply
//! continues the same file. The header row is written only while the
//! destination is missing or empty.

#![allow(clippy::uninlined_format_args)]

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::ExtractedRecord;
use crate::domain::record::COLUMNS;
use crate::infrastructure::config::OutputConfig;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER: u8 = b';';

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Durable, single-writer destination for record batches
pub trait RecordSink: Send {
    /// Make sure the destination exists with its header, even before any record arrives.
    fn ensure_initialized(&mut self) -> Result<(), SinkError>;

    /// Append one page worth of records; returns how many were written.
    fn append(&mut self, records: &[ExtractedRecord]) -> Result<usize, SinkError>;
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    utf8_bom: bool,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            utf8_bom: true,
        }
    }

    pub fn from_config(config: &OutputConfig, destination: &Path) -> Self {
        Self::new(destination).with_utf8_bom(config.utf8_bom)
    }

    #[must_use]
    pub fn with_utf8_bom(mut self, utf8_bom: bool) -> Self {
        self.utf8_bom = utf8_bom;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> SinkError {
        SinkError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    /// Encode rows in memory so a failed row never leaves a partial batch on disk.
    fn encode<T: Serialize>(&self, rows: &[T]) -> Result<Vec<u8>, SinkError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).map_err(|e| self.csv_error(e))?;
        }
        writer.into_inner().map_err(|e| self.io_error(e.into_error()))
    }

    /// Encode and append a batch with a single write.
    fn write_rows<T: Serialize>(&self, rows: &[T]) -> Result<usize, SinkError> {
        let bytes = self.encode(rows)?;
        let mut file = self.open_for_append()?;
        file.write_all(&bytes).map_err(|e| self.io_error(e))?;
        file.flush().map_err(|e| self.io_error(e))?;
        Ok(rows.len())
    }

    /// Open for append, writing BOM and header first if the file is fresh.
    fn open_for_append(&self) -> Result<fs::File, SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let is_fresh = file.metadata().map_err(|e| self.io_error(e))?.len() == 0;
        if is_fresh {
            let mut preamble = if self.utf8_bom { UTF8_BOM.to_vec() } else { Vec::new() };
            preamble.extend(self.encode(&[COLUMNS])?);
            file.write_all(&preamble).map_err(|e| self.io_error(e))?;
            info!("Initialized output file with header: {:?}", self.path);
        }

        Ok(file)
    }
}

impl RecordSink for CsvSink {
    fn ensure_initialized(&mut self) -> Result<(), SinkError> {
        self.open_for_append().map(drop)
    }

    fn append(&mut self, records: &[ExtractedRecord]) -> Result<usize, SinkError> {
        if records.is_empty() {
            return Ok(0);
        }

        let written = self.write_rows(records)?;
        debug!("Appended {} records to {:?}", written, self.path);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_record;

    #[test]
    fn test_fresh_file_gets_bom_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let mut sink = CsvSink::new(&path);

        sink.ensure_initialized().unwrap();
        let bytes = fs::read(&path).unwrap();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(";"));
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        assert_eq!(sink.append(&[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_bom_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path).with_utf8_bom(false);

        sink.append(&[sample_record("https://p.example.com/MLB-1")]).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert!(text.starts_with("extraction_date;cycle_id;"));
        assert_eq!(text.lines().count(), 2);
    }

    #[derive(Serialize)]
    struct Row {
        link: &'static str,
        tags: Option<std::collections::BTreeMap<&'static str, &'static str>>,
    }

    #[test]
    fn test_failed_row_leaves_no_partial_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::new(&path).with_utf8_bom(false);
        sink.open_for_append().unwrap();

        let rows = [
            Row {
                link: "https://p.example.com/MLB-1",
                tags: None,
            },
            Row {
                link: "https://p.example.com/MLB-2",
                tags: Some([("k", "v")].into_iter().collect()),
            },
        ];
        assert!(matches!(sink.write_rows(&rows), Err(SinkError::Csv { .. })));

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![COLUMNS.join(";")]);
    }

    #[test]
    fn test_unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        assert!(matches!(
            sink.append(&[sample_record("https://p.example.com/MLB-1")]),
            Err(SinkError::Io { .. })
        ));
    }
}
