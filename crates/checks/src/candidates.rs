//! Changed files selected for validation.

use std::collections::HashSet;

use futures_util::{StreamExt, stream};
use kube_validator_core::models::{Annotation, FileDiff, FileStatus, RepoRef};
use kube_validator_github::gateway::RemoteRepoGateway;

use crate::{config::ValidatorConfig, manifest::ManifestValidator};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ValidationOutcome {
    /// No failure-level findings (warnings allowed).
    Passed,
    Failed,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Candidate {
    pub path: String,
    pub status: FileStatus,
    pub strict: bool,
    /// Set by [`Candidates::load_bytes`] when the file was fetched.
    pub contents: Option<Vec<u8>>,
    pub load_failed: bool,
    /// Set by [`Candidates::validate`].
    pub outcome: Option<ValidationOutcome>,
}

impl Candidate {
    pub fn new(path: impl Into<String>, status: FileStatus, strict: bool) -> Self {
        Self {
            path: path.into(),
            status,
            strict,
            contents: None,
            load_failed: false,
            outcome: None,
        }
    }
}

/// Candidates in change-set order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Candidates {
    items: Vec<Candidate>,
}

impl Candidates {
    /// Selects the changed files matched by `config`, keeping their order.
    ///
    /// Removed files have nothing to validate and are skipped. The first
    /// matching rule decides strictness, and each path is selected once.
    pub fn matching(config: &ValidatorConfig, files: &[FileDiff]) -> Self {
        let mut seen = HashSet::new();
        let items = files
            .iter()
            .filter(|file| file.status != FileStatus::Removed)
            .filter_map(|file| {
                let rule = config.rule_for(&file.filename)?;
                seen.insert(file.filename.as_str())
                    .then(|| Candidate::new(&file.filename, file.status, rule.strict))
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> { self.items.iter() }

    pub fn validated(&self) -> usize { self.items.iter().filter(|c| c.outcome.is_some()).count() }

    /// Phase one: fetch every candidate at `head_sha`.
    ///
    /// Requests run concurrently, up to `concurrency` at a time, but results
    /// are applied in candidate order. Each candidate that could not be
    /// fetched yields one annotation.
    pub async fn load_bytes<G: RemoteRepoGateway>(
        &mut self,
        gateway: &G,
        repo: &RepoRef,
        head_sha: &str,
        concurrency: usize,
    ) -> Vec<Annotation> {
        // Owned paths keep the stream free of closures over borrowed candidates,
        // which would make the future `!Send`.
        let paths = self.items.iter().map(|c| c.path.clone()).collect::<Vec<_>>();
        let results = stream::iter(paths)
            .map(move |path| async move { gateway.fetch_file_content(repo, head_sha, &path).await })
            .buffered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut annotations = Vec::new();
        for (candidate, result) in self.items.iter_mut().zip(results) {
            match result {
                Ok(Some(contents)) => candidate.contents = Some(contents),
                Ok(None) => {
                    candidate.load_failed = true;
                    annotations.push(
                        Annotation::failure(&candidate.path, format!("not found at {head_sha}"))
                            .with_title("Couldn't load file"),
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to load {} from {}: {:?}", candidate.path, repo, e);
                    candidate.load_failed = true;
                    annotations.push(
                        Annotation::failure(&candidate.path, format!("{e:#}"))
                            .with_title("Couldn't load file"),
                    );
                }
            }
        }
        annotations
    }

    /// Phase two: validate every candidate that loaded.
    pub fn validate(&mut self, validator: &dyn ManifestValidator) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        for candidate in &mut self.items {
            let Some(contents) = &candidate.contents else {
                continue;
            };
            let findings = validator.validate(&candidate.path, contents, candidate.strict);
            candidate.outcome = Some(if findings.iter().any(Annotation::is_failure) {
                ValidationOutcome::Failed
            } else {
                ValidationOutcome::Passed
            });
            annotations.extend(findings);
        }
        annotations
    }
}
