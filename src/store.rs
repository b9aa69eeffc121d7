use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, NamedTempFile};

use crate::domain::{Job, Label};
use crate::error::ClipsortError;

/// Where clips land: `<root>/<label>/<id>.mp4`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn label_dir(&self, label: &Label) -> Utf8PathBuf {
        self.root.join(label.as_str())
    }

    pub fn video_path(&self, job: &Job) -> Utf8PathBuf {
        self.label_dir(&job.label).join(job.file_name())
    }

    /// Creates one directory per distinct label, in sorted order.
    /// Existing directories are left alone.
    pub fn ensure_label_dirs(&self, jobs: &[Job]) -> Result<Vec<Utf8PathBuf>, ClipsortError> {
        let labels = jobs.iter().map(|job| &job.label).collect::<BTreeSet<_>>();
        let mut created = Vec::with_capacity(labels.len());
        for label in labels {
            let dir = self.label_dir(label);
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| ClipsortError::Filesystem(format!("create {dir}: {err}")))?;
            created.push(dir);
        }
        Ok(created)
    }
}

/// Temporary file next to `dest`, so the final rename never crosses filesystems.
pub fn temp_file_beside(dest: &Utf8Path, prefix: &str) -> Result<NamedTempFile, ClipsortError> {
    let parent = match dest.parent() {
        Some(parent) if parent.as_str().is_empty() => Utf8Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(ClipsortError::Filesystem(
                "invalid destination path".to_string(),
            ));
        }
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ClipsortError::Filesystem(err.to_string()))?;
    Builder::new()
        .prefix(prefix)
        .suffix(".part")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ClipsortError::Filesystem(err.to_string()))
}

pub fn persist_temp(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), ClipsortError> {
    temp.persist(dest.as_std_path())
        .map_err(|err| ClipsortError::Filesystem(format!("persist {dest}: {}", err.error)))?;
    Ok(())
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ClipsortError> {
    use std::io::Write;

    let mut temp = temp_file_beside(path, ".clipsort")?;
    temp.write_all(content)
        .and_then(|_| temp.flush())
        .map_err(|err| ClipsortError::Filesystem(err.to_string()))?;
    persist_temp(temp, path)
}
