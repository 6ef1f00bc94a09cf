use std::future::Future;

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{StatusCode, Uri};
use kube_validator_core::models::{
    Annotation, CheckRunConclusion, CheckRunStatus, CheckRunUpdate, CheckSuiteSummary, FileDiff,
    Installation, NewCheckRun, RepoRef, Severity,
};
use octocrab::{GitHubError, Octocrab};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

/// The Checks API rejects requests carrying more annotations than this.
pub const MAX_ANNOTATIONS_PER_REQUEST: usize = 50;

/// Every remote call the validator makes against GitHub.
pub trait RemoteRepoGateway: Send + Sync {
    /// Creates a check run and returns its ID.
    fn create_check_run(
        &self,
        repo: &RepoRef,
        check_run: &NewCheckRun,
    ) -> impl Future<Output = Result<u64>> + Send;

    fn update_check_run(
        &self,
        repo: &RepoRef,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Lists the check suites created by `app_id` for a ref.
    fn list_check_suites(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        app_id: u64,
    ) -> impl Future<Output = Result<Vec<CheckSuiteSummary>>> + Send;

    fn rerequest_check_suite(
        &self,
        repo: &RepoRef,
        check_suite_id: u64,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_changed_files(
        &self,
        repo: &RepoRef,
        pull_number: u64,
    ) -> impl Future<Output = Result<Vec<FileDiff>>> + Send;

    /// Fetches a file at a ref. `Ok(None)` means the file does not exist.
    fn fetch_file_content(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        path: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Lists one page of the app's installations (1-based pages).
    fn list_installations(
        &self,
        page: u32,
        per_page: u8,
    ) -> impl Future<Output = Result<Vec<Installation>>> + Send;
}

/// Gateway backed by an installation client for repository calls and the
/// app (JWT) client for app-level calls.
#[derive(Clone)]
pub struct OctocrabGateway {
    client: Octocrab,
    app_client: Octocrab,
}

impl OctocrabGateway {
    pub fn new(client: Octocrab, app_client: Octocrab) -> Self { Self { client, app_client } }
}

#[derive(Serialize)]
struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    per_page: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
}

#[derive(Serialize)]
struct CheckSuiteParams {
    app_id: u64,
    per_page: u8,
}

#[derive(Serialize)]
struct ContentParams<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Serialize)]
struct CreateCheckRunBody<'a> {
    name: &'a str,
    head_sha: &'a str,
    status: CheckRunStatus,
    #[serde(with = "time::serde::rfc3339")]
    started_at: OffsetDateTime,
}

#[derive(Serialize)]
struct UpdateCheckRunBody<'a> {
    status: CheckRunStatus,
    conclusion: CheckRunConclusion,
    #[serde(with = "time::serde::rfc3339")]
    completed_at: OffsetDateTime,
    output: CheckRunOutput<'a>,
}

#[derive(Serialize)]
struct CheckRunOutput<'a> {
    title: &'a str,
    summary: &'a str,
    annotations: Vec<AnnotationBody<'a>>,
}

#[derive(Serialize)]
struct AnnotationBody<'a> {
    path: &'a str,
    start_line: u32,
    end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_column: Option<u32>,
    annotation_level: Severity,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

impl<'a> From<&'a Annotation> for AnnotationBody<'a> {
    fn from(annotation: &'a Annotation) -> Self {
        // File-scoped findings are pinned to the first line.
        let start_line = annotation.start_line.unwrap_or(1);
        Self {
            path: &annotation.path,
            start_line,
            end_line: annotation.end_line.unwrap_or(start_line),
            start_column: annotation.start_column,
            end_column: annotation.end_column,
            annotation_level: annotation.severity,
            message: &annotation.message,
            title: annotation.title.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct CheckRunResponse {
    id: u64,
}

#[derive(Deserialize)]
struct CheckSuiteList {
    check_suites: Vec<CheckSuiteSummary>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Builds `/repos/{owner}/{name}/...` with every segment percent-encoded.
/// Parts are split on `/` so file paths and branch names keep their hierarchy.
fn repo_route(repo: &RepoRef, parts: &[&str]) -> Result<String> {
    let mut url = Url::parse("https://api.github.com")?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("API base URL cannot have a path"))?
        .clear()
        .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
        .extend(parts.iter().flat_map(|part| part.split('/')));
    Ok(url.path().to_string())
}

fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(
        err,
        octocrab::Error::GitHub { source, .. }
            if matches!(**source, GitHubError { status_code: StatusCode::NOT_FOUND, .. })
    )
}

fn decode_content(response: ContentResponse) -> Result<Vec<u8>> {
    match response.encoding.as_deref() {
        Some("base64") => {}
        // Files above the inline limit come back with encoding "none".
        Some(other) => bail!("Unsupported content encoding {other:?} (file too large?)"),
        None => bail!("Missing content encoding"),
    }
    let content: String = response
        .content
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(content).context("Failed to decode file content")
}

impl RemoteRepoGateway for OctocrabGateway {
    async fn create_check_run(&self, repo: &RepoRef, check_run: &NewCheckRun) -> Result<u64> {
        let body = CreateCheckRunBody {
            name: &check_run.name,
            head_sha: &check_run.head_sha,
            status: check_run.status,
            started_at: check_run.started_at,
        };
        let response: CheckRunResponse = self
            .client
            .post(repo_route(repo, &["check-runs"])?, Some(&body))
            .await
            .with_context(|| format!("Failed to create check run on {repo}"))?;
        Ok(response.id)
    }

    async fn update_check_run(
        &self,
        repo: &RepoRef,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> Result<()> {
        if update.annotations.len() > MAX_ANNOTATIONS_PER_REQUEST {
            tracing::warn!(
                "Check run {} has {} annotations, sending the first {}",
                check_run_id,
                update.annotations.len(),
                MAX_ANNOTATIONS_PER_REQUEST
            );
        }
        let body = UpdateCheckRunBody {
            status: CheckRunStatus::Completed,
            conclusion: update.conclusion,
            completed_at: update.completed_at,
            output: CheckRunOutput {
                title: &update.title,
                summary: &update.summary,
                annotations: update
                    .annotations
                    .iter()
                    .take(MAX_ANNOTATIONS_PER_REQUEST)
                    .map(AnnotationBody::from)
                    .collect(),
            },
        };
        let _: CheckRunResponse = self
            .client
            .patch(repo_route(repo, &["check-runs", &check_run_id.to_string()])?, Some(&body))
            .await
            .with_context(|| format!("Failed to update check run {check_run_id} on {repo}"))?;
        Ok(())
    }

    async fn list_check_suites(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        app_id: u64,
    ) -> Result<Vec<CheckSuiteSummary>> {
        let response: CheckSuiteList = self
            .client
            .get(
                repo_route(repo, &["commits", git_ref, "check-suites"])?,
                Some(&CheckSuiteParams { app_id, per_page: 100 }),
            )
            .await
            .with_context(|| format!("Failed to list check suites for {repo}@{git_ref}"))?;
        Ok(response.check_suites)
    }

    async fn rerequest_check_suite(&self, repo: &RepoRef, check_suite_id: u64) -> Result<()> {
        let route =
            repo_route(repo, &["check-suites", &check_suite_id.to_string(), "rerequest"])?;
        let uri = Uri::builder().path_and_query(route).build()?;
        let response = self
            .client
            ._post(uri, None::<&()>)
            .await
            .with_context(|| format!("Failed to re-request check suite {check_suite_id}"))?;
        octocrab::map_github_error(response)
            .await
            .with_context(|| format!("Failed to re-request check suite {check_suite_id}"))?;
        Ok(())
    }

    async fn list_changed_files(&self, repo: &RepoRef, pull_number: u64) -> Result<Vec<FileDiff>> {
        const PER_PAGE: u8 = 100;
        let route = repo_route(repo, &["pulls", &pull_number.to_string(), "files"])?;
        let mut files = Vec::new();
        let mut page = 1;
        loop {
            let batch: Vec<FileDiff> = self
                .client
                .get(&route, Some(&PageParams { per_page: Some(PER_PAGE), page: Some(page) }))
                .await
                .with_context(|| {
                    format!("Failed to list files for {repo}#{pull_number} (page {page})")
                })?;
            let done = batch.len() < PER_PAGE as usize;
            files.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        Ok(files)
    }

    async fn fetch_file_content(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        path: &str,
    ) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get::<ContentResponse, _, _>(
                repo_route(repo, &["contents", path])?,
                Some(&ContentParams { git_ref }),
            )
            .await;
        match result {
            Ok(response) => decode_content(response)
                .with_context(|| format!("Failed to read {path} from {repo}@{git_ref}"))
                .map(Some),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to fetch {path} from {repo}@{git_ref}"))
            }
        }
    }

    async fn list_installations(&self, page: u32, per_page: u8) -> Result<Vec<Installation>> {
        let params = PageParams { per_page: Some(per_page), page: Some(page) };
        self.app_client
            .get("/app/installations", Some(&params))
            .await
            .context("Failed to list installations")
    }
}
