//! Detection table export.
//!
//! The table is a comma-separated file with the header
//! `frame,box_num,x1,y1,x2,y2,confidence` and one row per box, sorted by
//! frame. Writes go to a temporary file in the destination directory which
//! is renamed over the target only once complete, so a failed export never
//! leaves a partial table behind.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::aggregate::Detection;
use crate::error::{PitchError, Result};

/// Column names, in file order.
pub const COLUMNS: [&str; 7] = ["frame", "box_num", "x1", "y1", "x2", "y2", "confidence"];

/// Detections sorted by frame, ready to serialize.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionTable {
    rows: Vec<Detection>,
}

impl DetectionTable {
    /// Build a table from records in any order.
    ///
    /// Sorting is stable on frame index, so boxes within a frame keep the
    /// order they were collected in.
    pub fn from_records(mut records: Vec<Detection>) -> Self {
        records.sort_by_key(|d| d.frame_index);
        Self { rows: records }
    }

    pub fn rows(&self) -> &[Detection] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize to CSV, header first.
    pub fn write_to<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv.write_record(COLUMNS).context("write header")?;
        for row in &self.rows {
            csv.serialize(row)
                .with_context(|| format!("write frame {} box {}", row.frame_index, row.box_ordinal))?;
        }
        csv.flush().context("flush table")?;
        Ok(())
    }

    /// Write the table to `path`, replacing any existing file.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temporary file in {}", dir.display()))
            .map_err(|e| PitchError::write(path, e))?;
        self.write_to(staged.as_file_mut())
            .map_err(|e| PitchError::write(path, e))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| PitchError::write(path, e))?;
        staged
            .persist(path)
            .map_err(|e| PitchError::write(path, e.error))?;
        log::info!("wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Read a table previously written by `write_csv`.
    pub fn read_csv(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("open {}", path.display()))?;
        let headers = reader.headers().context("read header")?.clone();
        if headers.iter().ne(COLUMNS) {
            anyhow::bail!("unexpected columns in {}: {:?}", path.display(), headers);
        }
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<Detection>, _>>()
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(Self::from_records(rows))
    }

    /// SHA-256 of the serialized table, hex encoded.
    pub fn digest(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(hex::encode(Sha256::digest(&buf)))
    }
}
