//! Validation of the manifests changed in a check suite.

use kube_validator_core::{
    config::ValidatorSettings,
    models::{CheckRunConclusion, RepoRef},
};
use kube_validator_github::{
    events::{CheckSuite, CheckSuiteAction, CheckSuiteEvent},
    gateway::RemoteRepoGateway,
};

use crate::{
    candidates::Candidates,
    changes::{self, ChangeSetError},
    config::{self, ConfigOutcome},
    manifest::ManifestValidator,
    report::{CheckRunReporter, Report},
};

pub struct CheckSuitePipeline<'a, G> {
    pub gateway: &'a G,
    pub validator: &'a dyn ManifestValidator,
    pub settings: &'a ValidatorSettings,
}

impl<G: RemoteRepoGateway> CheckSuitePipeline<'_, G> {
    /// Runs the pipeline for a check suite event and returns the conclusion
    /// reported, if a check run was completed.
    ///
    /// Infrastructure failures are logged and end the run early.
    pub async fn run(&self, event: &CheckSuiteEvent) -> Option<CheckRunConclusion> {
        if !matches!(
            event.action,
            CheckSuiteAction::Created | CheckSuiteAction::Requested | CheckSuiteAction::Rerequested
        ) {
            tracing::debug!("Ignoring check suite action {:?}", event.action);
            return None;
        }
        let repo = event.repository.repo_ref();
        let suite = &event.check_suite;
        let reporter = match CheckRunReporter::start(
            self.gateway,
            &repo,
            &self.settings.check_name,
            &suite.head_sha,
        )
        .await
        {
            Ok(reporter) => reporter,
            Err(e) => {
                // TODO: surface a retryable status once check suites are processed inline
                tracing::error!("Couldn't create check run for suite {}: {:?}", suite.id, e);
                return None;
            }
        };
        let report = self.report(&repo, suite).await;
        let check_run_id = reporter.check_run_id();
        match reporter.finalize(report).await {
            Ok(conclusion) => Some(conclusion),
            Err(e) => {
                tracing::error!("Couldn't complete check run {}: {:?}", check_run_id, e);
                None
            }
        }
    }

    async fn report(&self, repo: &RepoRef, suite: &CheckSuite) -> Report {
        let config_path = &self.settings.config_path;
        let config =
            match config::resolve(self.gateway, repo, &suite.head_sha, config_path).await {
                ConfigOutcome::Absent => {
                    return Report::ConfigMissing { path: config_path.clone() };
                }
                ConfigOutcome::Malformed(annotation) => {
                    return Report::ConfigInvalid { annotation };
                }
                ConfigOutcome::Present(config) => config,
            };

        let files = match changes::changed_files(self.gateway, repo, suite).await {
            Ok(files) => files,
            Err(ChangeSetError::NoPullRequest(id)) => {
                tracing::info!("Check suite {} on {} has no pull request", id, repo);
                return Report::NoPullRequest;
            }
            Err(e) => {
                tracing::error!("Couldn't list changed files for suite {}: {:?}", suite.id, e);
                return Report::ChangedFilesUnavailable { error: format!("{e:#}") };
            }
        };

        let mut candidates = Candidates::matching(&config, &files);
        tracing::debug!(
            "{} of {} changed files in {} match {}",
            candidates.len(),
            files.len(),
            repo,
            config_path
        );
        let mut annotations = candidates
            .load_bytes(self.gateway, repo, &suite.head_sha, self.settings.fetch_concurrency)
            .await;
        annotations.extend(candidates.validate(self.validator));
        Report::Validated {
            candidates: candidates.len(),
            validated: candidates.validated(),
            annotations,
        }
    }
}
