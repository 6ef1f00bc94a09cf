use kube_validator_core::models::{FileDiff, RepoRef};
use kube_validator_github::{events::CheckSuite, gateway::RemoteRepoGateway};

#[derive(Debug, thiserror::Error)]
pub enum ChangeSetError {
    #[error("check suite {0} has no associated pull request")]
    NoPullRequest(u64),
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

/// Lists the files changed by the pull request a check suite belongs to.
///
/// Suites listing several pull requests use the first one.
pub async fn changed_files<G: RemoteRepoGateway>(
    gateway: &G,
    repo: &RepoRef,
    suite: &CheckSuite,
) -> Result<Vec<FileDiff>, ChangeSetError> {
    let Some(pull_request) = suite.pull_requests.first() else {
        return Err(ChangeSetError::NoPullRequest(suite.id));
    };
    let files = gateway.list_changed_files(repo, pull_request.number).await?;
    tracing::debug!("{}#{} changes {} files", repo, pull_request.number, files.len());
    Ok(files)
}
