//! Typed webhook payloads for the events the validator reacts to.
//!
//! Deliveries are classified with octocrab's [`WebhookEventType`]. Its check
//! suite and check run payloads are untyped, so bodies are read into the
//! narrow structs below instead. Only the fields the validator reads are
//! modelled; everything else in the payload is ignored.

use kube_validator_core::models::RepoRef;
use octocrab::models::webhook_events::WebhookEventType;
use serde::Deserialize;

/// An inbound webhook delivery, classified by the `X-GitHub-Event` header.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckSuite(CheckSuiteEvent),
    PullRequest(PullRequestEvent),
    CheckRun(CheckRunEvent),
    Installation(InstallationEvent),
    InstallationRepositories(InstallationEvent),
    /// Any other event kind, carrying the header value.
    Other(String),
}

impl WebhookEvent {
    pub fn parse(kind: &str, body: &[u8]) -> serde_json::Result<Self> {
        let event_type: WebhookEventType =
            serde_json::from_value(serde_json::Value::String(kind.to_string()))?;
        Ok(match event_type {
            WebhookEventType::CheckSuite => Self::CheckSuite(serde_json::from_slice(body)?),
            WebhookEventType::PullRequest => Self::PullRequest(serde_json::from_slice(body)?),
            WebhookEventType::CheckRun => Self::CheckRun(serde_json::from_slice(body)?),
            WebhookEventType::Installation => Self::Installation(serde_json::from_slice(body)?),
            WebhookEventType::InstallationRepositories => {
                Self::InstallationRepositories(serde_json::from_slice(body)?)
            }
            _ => Self::Other(kind.to_string()),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::CheckSuite(_) => "check_suite",
            Self::PullRequest(_) => "pull_request",
            Self::CheckRun(_) => "check_run",
            Self::Installation(_) => "installation",
            Self::InstallationRepositories(_) => "installation_repositories",
            Self::Other(kind) => kind,
        }
    }

    pub fn installation_id(&self) -> Option<u64> {
        match self {
            Self::CheckSuite(e) => e.installation.as_ref().map(|i| i.id),
            Self::PullRequest(e) => e.installation.as_ref().map(|i| i.id),
            Self::CheckRun(e) => e.installation.as_ref().map(|i| i.id),
            Self::Installation(e) | Self::InstallationRepositories(e) => Some(e.installation.id),
            Self::Other(_) => None,
        }
    }

    pub fn repository(&self) -> Option<RepoRef> {
        match self {
            Self::CheckSuite(e) => Some(e.repository.repo_ref()),
            Self::PullRequest(e) => Some(e.repository.repo_ref()),
            Self::CheckRun(e) => Some(e.repository.repo_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSuiteAction {
    Created,
    Requested,
    Rerequested,
    Completed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Reopened,
    Synchronize,
    Closed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunAction {
    Created,
    Completed,
    Rerequested,
    RequestedAction,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteEvent {
    pub action: CheckSuiteAction,
    pub check_suite: CheckSuite,
    pub repository: Repository,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuite {
    pub id: u64,
    pub head_sha: String,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub head: GitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunEvent {
    pub action: CheckRunAction,
    pub check_run: CheckRun,
    pub repository: Repository,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub check_suite: CheckSuiteRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationEvent {
    pub action: String,
    pub installation: InstallationRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

impl Repository {
    pub fn repo_ref(&self) -> RepoRef { RepoRef::new(&self.owner.login, &self.name) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK_SUITE: &str = r#"{
        "action": "requested",
        "check_suite": {
            "id": 118578147,
            "head_branch": "changes",
            "head_sha": "ec26c3e57ca3a959ca5aad62de7213c562f8c821",
            "status": "queued",
            "pull_requests": [{"url": "https://api.github.com/x", "id": 1, "number": 2}]
        },
        "repository": {"id": 186853002, "name": "Hello-World", "owner": {"login": "Codertocat"}},
        "installation": {"id": 2311213}
    }"#;

    #[test]
    fn test_parse_check_suite() {
        let event = WebhookEvent::parse("check_suite", CHECK_SUITE.as_bytes()).unwrap();
        assert_eq!(event.kind(), "check_suite");
        assert_eq!(event.installation_id(), Some(2311213));
        assert_eq!(event.repository(), Some(RepoRef::new("Codertocat", "Hello-World")));
        let WebhookEvent::CheckSuite(event) = event else { panic!("expected check_suite") };
        assert_eq!(event.action, CheckSuiteAction::Requested);
        assert_eq!(event.check_suite.id, 118578147);
        assert_eq!(event.check_suite.pull_requests[0].number, 2);
    }

    #[test]
    fn test_parse_unknown_action_and_kind() {
        let body = r#"{
            "action": "labeled",
            "number": 5,
            "pull_request": {"head": {"ref": "feature", "sha": "abc"}},
            "repository": {"name": "r", "owner": {"login": "o"}}
        }"#;
        let event = WebhookEvent::parse("pull_request", body.as_bytes()).unwrap();
        let WebhookEvent::PullRequest(event) = event else { panic!("expected pull_request") };
        assert_eq!(event.action, PullRequestAction::Other);
        assert_eq!(event.pull_request.head.ref_field, "feature");

        for kind in ["star", "push", "some_future_event"] {
            let event = WebhookEvent::parse(kind, b"not even json").unwrap();
            assert!(matches!(&event, WebhookEvent::Other(other) if other == kind));
            assert_eq!(event.installation_id(), None);
        }
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(WebhookEvent::parse("check_run", b"{}").is_err());
    }
}
