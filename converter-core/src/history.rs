//! Conversion history persisted as JSON Lines: one record per line, appended
//! at the end of every session.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::model::ConversionRecord;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records`, creating the file and its directory if needed.
    ///
    /// Returns the number of records written.
    pub fn append(&self, records: &[ConversionRecord]) -> Result<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)
                .context("Failed to serialize conversion record")?;
            writer.write_all(b"\n")?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;

        debug!(count = records.len(), path = %self.path.display(), "Appended conversion history");
        Ok(records.len())
    }

    /// Read every stored record, oldest first. A missing file is empty history.
    pub fn load(&self) -> Result<Vec<ConversionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .with_context(|| format!("Failed to read history file: {}", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ConversionRecord = serde_json::from_str(&line).with_context(|| {
                format!("Malformed history entry at {}:{}", self.path.display(), idx + 1)
            })?;
            records.push(record);
        }

        Ok(records)
    }
}
