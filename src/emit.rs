//! The generated workbook as a downloadable artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;

/// File name prefix of every generated workbook.
pub const FILE_PREFIX: &str = "OEMA_HWOL_";

/// `OEMA_HWOL_<YYYY-MM-DD>.xlsx` for the given date.
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{FILE_PREFIX}{}.xlsx", date.format("%Y-%m-%d"))
}

/// A serialized workbook held in memory until saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Names the workbook with today's local date.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name_for(Local::now().date_naive()),
            bytes,
        }
    }

    /// Saves into `dir`, replacing any file of the same name.
    ///
    /// The bytes go to a temporary file in `dir` first and are renamed into
    /// place; on failure the temporary file is removed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let target = dir.join(&self.file_name);
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        info!(path = %target.display(), bytes = self.bytes.len(), "artifact saved");
        Ok(target)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
