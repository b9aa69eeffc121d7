use std::io::Read;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;

use crate::config::ColumnNames;
use crate::domain::Job;
use crate::error::ClipsortError;

/// A row that could not become a job; the rest of the dataset is still used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line number, the header being row 1.
    pub row: usize,
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub jobs: Vec<Job>,
    pub rejected: Vec<RejectedRow>,
}

/// Reads the dataset at `path` into jobs, in file order.
pub fn load(path: &Utf8Path, columns: &ColumnNames) -> Result<Dataset, ClipsortError> {
    let file = std::fs::File::open(path.as_std_path())
        .map_err(|err| ClipsortError::DatasetRead(format!("open {path}: {err}")))?;
    parse(file, columns)
}

pub fn parse<R: Read>(reader: R, columns: &ColumnNames) -> Result<Dataset, ClipsortError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|err| ClipsortError::DatasetRead(err.to_string()))?
        .clone();
    let index = ColumnIndex::locate(&headers, columns)?;

    let mut dataset = Dataset::default();
    for (offset, record) in reader.records().enumerate() {
        let row = offset + 2;
        let record = record.map_err(|err| ClipsortError::DatasetRead(err.to_string()))?;
        let id = field(&record, index.id);
        match Job::new(id, field(&record, index.url), field(&record, index.label)) {
            Ok(job) => dataset.jobs.push(job),
            Err(err) => {
                tracing::warn!(row, id, error = %err, "rejecting dataset row");
                dataset.rejected.push(RejectedRow {
                    row,
                    id: id.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(dataset)
}

struct ColumnIndex {
    id: usize,
    url: usize,
    label: usize,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord, columns: &ColumnNames) -> Result<Self, ClipsortError> {
        let position = |name: &str| headers.iter().position(|header| header == name);
        let id = position(&columns.id);
        let url = position(&columns.url);
        let label = position(&columns.label);

        match (id, url, label) {
            (Some(id), Some(url), Some(label)) => Ok(Self { id, url, label }),
            _ => {
                let missing = [(id, &columns.id), (url, &columns.url), (label, &columns.label)]
                    .into_iter()
                    .filter(|(found, _)| found.is_none())
                    .map(|(_, name)| name.clone())
                    .collect();
                Err(ClipsortError::Schema { missing })
            }
        }
    }
}

// Short rows read as empty cells.
fn field(record: &StringRecord, column: usize) -> &str {
    record.get(column).unwrap_or("")
}
