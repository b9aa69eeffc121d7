use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::JobId;
use crate::error::ClipsortError;
use crate::store;

/// Line-delimited list of ids that failed in the most recent run.
#[derive(Debug, Clone)]
pub struct FailureFile {
    path: Utf8PathBuf,
}

impl FailureFile {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.as_std_path().exists()
    }

    /// `None` when there is no record at all; blank lines are ignored.
    pub fn load(&self) -> Result<Option<Vec<String>>, ClipsortError> {
        let content = match fs::read_to_string(self.path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ClipsortError::Filesystem(format!(
                    "read {}: {err}",
                    self.path
                )));
            }
        };
        let ids = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Some(ids))
    }

    /// Replaces the whole record.
    pub fn save(&self, ids: &[JobId]) -> Result<(), ClipsortError> {
        let mut content = String::new();
        for id in ids {
            content.push_str(id.as_str());
            content.push('\n');
        }
        store::write_bytes_atomic(&self.path, content.as_bytes())
    }

    pub fn clear(&self) -> Result<(), ClipsortError> {
        match fs::remove_file(self.path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClipsortError::Filesystem(format!(
                "remove {}: {err}",
                self.path
            ))),
        }
    }

    /// Saves `ids`, or removes the record when there is nothing left to retry.
    pub fn replace(&self, ids: &[JobId]) -> Result<(), ClipsortError> {
        if ids.is_empty() {
            self.clear()
        } else {
            self.save(ids)
        }
    }
}
