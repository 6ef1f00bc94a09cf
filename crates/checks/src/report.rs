use std::time::{Duration, Instant};

use anyhow::Result;
use kube_validator_core::models::{
    Annotation, CheckRunConclusion, CheckRunStatus, CheckRunUpdate, NewCheckRun, RepoRef,
};
use kube_validator_github::gateway::{MAX_ANNOTATIONS_PER_REQUEST, RemoteRepoGateway};
use time::OffsetDateTime;

/// How a check suite ended, and what to tell GitHub about it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Report {
    ConfigMissing { path: String },
    ConfigInvalid { annotation: Annotation },
    NoPullRequest,
    ChangedFilesUnavailable { error: String },
    Validated { candidates: usize, validated: usize, annotations: Vec<Annotation> },
}

impl Report {
    pub fn conclusion(&self) -> CheckRunConclusion {
        match self {
            Self::ConfigMissing { .. } | Self::NoPullRequest => CheckRunConclusion::Neutral,
            Self::ConfigInvalid { .. } | Self::ChangedFilesUnavailable { .. } => {
                CheckRunConclusion::Failure
            }
            Self::Validated { annotations, .. } => {
                if annotations.iter().any(Annotation::is_failure) {
                    CheckRunConclusion::Failure
                } else {
                    CheckRunConclusion::Success
                }
            }
        }
    }

    fn annotations(&self) -> &[Annotation] {
        match self {
            Self::ConfigInvalid { annotation } => std::slice::from_ref(annotation),
            Self::Validated { annotations, .. } => annotations,
            _ => &[],
        }
    }

    fn title(&self) -> String {
        match self {
            Self::ConfigMissing { .. } => "Missing configuration".to_string(),
            Self::ConfigInvalid { .. } => "Invalid configuration".to_string(),
            Self::NoPullRequest => "No pull request".to_string(),
            Self::ChangedFilesUnavailable { .. } => "Couldn't list changed files".to_string(),
            Self::Validated { candidates: 0, .. } => "No manifests to validate".to_string(),
            Self::Validated { annotations, .. } => {
                match annotations.iter().filter(|a| a.is_failure()).count() {
                    0 => "All manifests valid".to_string(),
                    1 => "1 problem found".to_string(),
                    n => format!("{n} problems found"),
                }
            }
        }
    }

    fn summary(&self, duration: Duration) -> String {
        let mut summary = match self {
            Self::ConfigMissing { path } => {
                format!("Add `{path}` to this repository to validate Kubernetes manifests.")
            }
            Self::ConfigInvalid { annotation } => {
                format!("`{}` could not be parsed: {}", annotation.path, annotation.message)
            }
            Self::NoPullRequest => {
                "This commit is not part of a pull request, so no files were validated."
                    .to_string()
            }
            Self::ChangedFilesUnavailable { error } => {
                format!("The changed files of this pull request could not be listed: {error}")
            }
            Self::Validated { candidates, validated, annotations } => {
                let warnings = annotations.iter().filter(|a| !a.is_failure()).count();
                format!(
                    "Validated {validated} of {candidates} matching files ({warnings} warnings)."
                )
            }
        };
        summary.push_str(&format!(" Took {:.2}s.", duration.as_secs_f64()));
        let total = self.annotations().len();
        if total > MAX_ANNOTATIONS_PER_REQUEST {
            summary.push_str(&format!(
                "\n\nShowing the first {MAX_ANNOTATIONS_PER_REQUEST} of {total} annotations."
            ));
        }
        summary
    }

    pub fn into_update(self, duration: Duration) -> CheckRunUpdate {
        let conclusion = self.conclusion();
        let title = self.title();
        let summary = self.summary(duration);
        let annotations = match self {
            Self::ConfigInvalid { annotation } => vec![annotation],
            Self::Validated { annotations, .. } => annotations,
            _ => vec![],
        };
        CheckRunUpdate {
            conclusion,
            completed_at: OffsetDateTime::now_utc(),
            duration,
            title,
            summary,
            annotations,
        }
    }
}

/// An in-progress check run. Finalizing consumes it, so a run is updated
/// exactly once after creation.
pub struct CheckRunReporter<'a, G> {
    gateway: &'a G,
    repo: &'a RepoRef,
    check_run_id: u64,
    started: Instant,
}

impl<'a, G: RemoteRepoGateway> CheckRunReporter<'a, G> {
    /// Creates the check run in the `in_progress` state.
    pub async fn start(
        gateway: &'a G,
        repo: &'a RepoRef,
        name: &str,
        head_sha: &str,
    ) -> Result<Self> {
        let started = Instant::now();
        let check_run = NewCheckRun {
            name: name.to_string(),
            head_sha: head_sha.to_string(),
            status: CheckRunStatus::InProgress,
            started_at: OffsetDateTime::now_utc(),
        };
        let check_run_id = gateway.create_check_run(repo, &check_run).await?;
        tracing::info!("Created check run {} on {}@{}", check_run_id, repo, head_sha);
        Ok(Self { gateway, repo, check_run_id, started })
    }

    pub fn check_run_id(&self) -> u64 { self.check_run_id }

    pub async fn finalize(self, report: Report) -> Result<CheckRunConclusion> {
        let update = report.into_update(self.started.elapsed());
        self.gateway.update_check_run(self.repo, self.check_run_id, &update).await?;
        tracing::info!(
            "Completed check run {} on {}: {} ({} annotations, {}ms)",
            self.check_run_id,
            self.repo,
            update.conclusion.as_str(),
            update.annotations.len(),
            update.duration.as_millis()
        );
        Ok(update.conclusion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(annotations: Vec<Annotation>) -> Report {
        Report::Validated { candidates: 2, validated: 2, annotations }
    }

    #[test]
    fn test_conclusion() {
        let cases = [
            (Report::ConfigMissing { path: "c.yaml".to_string() }, CheckRunConclusion::Neutral),
            (
                Report::ConfigInvalid { annotation: Annotation::failure("c.yaml", "bad") },
                CheckRunConclusion::Failure,
            ),
            (Report::NoPullRequest, CheckRunConclusion::Neutral),
            (
                Report::ChangedFilesUnavailable { error: "502".to_string() },
                CheckRunConclusion::Failure,
            ),
            (validated(vec![]), CheckRunConclusion::Success),
            (validated(vec![Annotation::warning("a.yaml", "meh")]), CheckRunConclusion::Success),
            (
                validated(vec![
                    Annotation::warning("a.yaml", "meh"),
                    Annotation::failure("b.yaml", "bad"),
                ]),
                CheckRunConclusion::Failure,
            ),
        ];
        for (report, expected) in cases {
            assert_eq!(report.conclusion(), expected, "{report:?}");
        }
    }

    #[test]
    fn test_into_update() {
        let update = validated(vec![
            Annotation::failure("a.yaml", "bad"),
            Annotation::warning("a.yaml", "meh"),
            Annotation::failure("b.yaml", "worse"),
        ])
        .into_update(Duration::from_millis(1500));
        assert_eq!(update.conclusion, CheckRunConclusion::Failure);
        assert_eq!(update.title, "2 problems found");
        assert_eq!(update.summary, "Validated 2 of 2 matching files (1 warnings). Took 1.50s.");
        assert_eq!(update.annotations.len(), 3);
        assert_eq!(update.duration, Duration::from_millis(1500));

        let update = Report::Validated { candidates: 0, validated: 0, annotations: vec![] }
            .into_update(Duration::ZERO);
        assert_eq!(update.title, "No manifests to validate");
    }

    #[test]
    fn test_summary_mentions_truncation() {
        let annotations =
            (0..60).map(|i| Annotation::failure(format!("{i}.yaml"), "bad")).collect();
        let update = validated(annotations).into_update(Duration::ZERO);
        assert_eq!(update.annotations.len(), 60);
        assert!(update.summary.ends_with("Showing the first 50 of 60 annotations."));
    }
}
