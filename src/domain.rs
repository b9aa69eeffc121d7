use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClipsortError;

/// Container extension written for every downloaded clip, whatever the source format.
pub const OUTPUT_EXTENSION: &str = "mp4";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ClipsortError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(path_component("id", value)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Label {
    type Err = ClipsortError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(path_component("label", value)?))
    }
}

// Ids and labels end up as a single path segment under the output root.
fn path_component(kind: &'static str, value: &str) -> Result<String, ClipsortError> {
    let trimmed = value.trim();
    let is_valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(['/', '\\', '\0']);
    if !is_valid {
        return Err(ClipsortError::InvalidPathComponent {
            kind,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// One dataset row: where to fetch a clip from and which label folder it belongs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub label: Label,
}

impl Job {
    pub fn new(id: &str, url: &str, label: &str) -> Result<Self, ClipsortError> {
        Ok(Self {
            id: id.parse()?,
            url: url.trim().to_string(),
            label: label.parse()?,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.{OUTPUT_EXTENSION}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn trims_id_and_label() {
        let job = Job::new(" 17 ", " https://drive.google.com/file/d/x/view ", " happy").unwrap();
        assert_eq!(job.id.as_str(), "17");
        assert_eq!(job.label.as_str(), "happy");
        assert_eq!(job.url, "https://drive.google.com/file/d/x/view");
        assert_eq!(job.file_name(), "17.mp4");
    }

    #[test]
    fn rejects_traversal_labels() {
        let err = "..".parse::<Label>().unwrap_err();
        assert_matches!(err, ClipsortError::InvalidPathComponent { kind: "label", .. });

        let err = "sad/../../etc".parse::<Label>().unwrap_err();
        assert_matches!(err, ClipsortError::InvalidPathComponent { .. });
    }

    #[test]
    fn rejects_empty_id() {
        let err = "   ".parse::<JobId>().unwrap_err();
        assert_matches!(err, ClipsortError::InvalidPathComponent { kind: "id", .. });
    }
}
