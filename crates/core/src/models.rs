use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A repository addressed by owner login and name.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into() }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Annotation level, named the way the Checks API names them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Failure,
}

/// A single finding attached to a check run.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub start_column: Option<u32>,
    pub end_column: Option<u32>,
    pub severity: Severity,
    pub title: Option<String>,
    pub message: String,
}

impl Annotation {
    pub fn new(path: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            start_line: None,
            end_line: None,
            start_column: None,
            end_column: None,
            severity,
            title: None,
            message: message.into(),
        }
    }

    pub fn failure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, Severity::Failure, message)
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, Severity::Warning, message)
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.start_line = Some(line);
        self.end_line = Some(line);
        self
    }

    /// Columns only apply to single-line annotations.
    pub fn with_column(mut self, column: u32) -> Self {
        if self.start_line.is_some() && self.start_line == self.end_line {
            self.start_column = Some(column);
            self.end_column = Some(column);
        }
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_failure(&self) -> bool { self.severity == Severity::Failure }
}

/// Diff status of a file in a pull request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileDiff {
    pub filename: String,
    pub status: FileStatus,
}

impl FileDiff {
    pub fn new(filename: impl Into<String>, status: FileStatus) -> Self {
        Self { filename: filename.into(), status }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunConclusion {
    Success,
    Failure,
    Neutral,
}

impl CheckRunConclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
        }
    }
}

/// Request to create a check run on a commit.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewCheckRun {
    pub name: String,
    pub head_sha: String,
    pub status: CheckRunStatus,
    pub started_at: OffsetDateTime,
}

/// The final update of a check run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CheckRunUpdate {
    pub conclusion: CheckRunConclusion,
    pub completed_at: OffsetDateTime,
    pub duration: Duration,
    pub title: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

/// Check suite as returned when listing suites for a ref.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CheckSuiteSummary {
    pub id: u64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
}
