//! Re-requesting check suites so they run again.

use kube_validator_github::{
    events::{CheckRunAction, CheckRunEvent, PullRequestAction, PullRequestEvent},
    gateway::RemoteRepoGateway,
};

/// Re-requests this app's check suite when a pull request is opened or
/// reopened, so suites created before the pull request existed get a run.
///
/// Acts only when exactly one suite matches the head ref; with none or
/// several there is no safe choice.
///
/// Returns `true` only once the re-request itself succeeded.
pub async fn process_pull_request<G: RemoteRepoGateway>(
    gateway: &G,
    app_id: u64,
    event: &PullRequestEvent,
) -> bool {
    if !matches!(event.action, PullRequestAction::Opened | PullRequestAction::Reopened) {
        return false;
    }
    let repo = event.repository.repo_ref();
    let head = &event.pull_request.head.ref_field;
    let suites = match gateway.list_check_suites(&repo, head, app_id).await {
        Ok(suites) => suites,
        Err(e) => {
            tracing::error!("{:?}", e);
            return false;
        }
    };
    let [suite] = suites.as_slice() else {
        tracing::info!(
            "Found {} check suites for {}@{}, not re-requesting",
            suites.len(),
            repo,
            head
        );
        return false;
    };
    if let Err(e) = gateway.rerequest_check_suite(&repo, suite.id).await {
        tracing::error!("{:?}", e);
        return false;
    }
    tracing::info!("Re-requested check suite {} for {}#{}", suite.id, repo, event.number);
    true
}

/// Re-requests the suite owning a check run the user asked to re-run.
pub async fn process_check_run<G: RemoteRepoGateway>(gateway: &G, event: &CheckRunEvent) -> bool {
    if event.action != CheckRunAction::Rerequested {
        return false;
    }
    let repo = event.repository.repo_ref();
    let suite_id = event.check_run.check_suite.id;
    if let Err(e) = gateway.rerequest_check_suite(&repo, suite_id).await {
        tracing::error!("{:?}", e);
        return false;
    }
    tracing::info!("Re-requested check suite {} for check run {}", suite_id, event.check_run.id);
    true
}
