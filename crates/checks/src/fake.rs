//! Recording in-memory gateway for tests.

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::Mutex,
};

use anyhow::{Result, anyhow};
use kube_validator_core::models::{
    CheckRunUpdate, CheckSuiteSummary, FileDiff, Installation, NewCheckRun, RepoRef,
};
use kube_validator_github::gateway::RemoteRepoGateway;

pub const CHECK_RUN_ID: u64 = 42;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Op {
    CreateCheckRun,
    UpdateCheckRun,
    ListCheckSuites,
    RerequestCheckSuite,
    ListChangedFiles,
    ListInstallations,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    CreateCheckRun(NewCheckRun),
    UpdateCheckRun(u64, CheckRunUpdate),
    ListCheckSuites { git_ref: String, app_id: u64 },
    RerequestCheckSuite(u64),
    ListChangedFiles(u64),
    FetchFileContent(String),
    ListInstallations { page: u32, per_page: u8 },
}

#[derive(Default)]
pub struct FakeGateway {
    files: HashMap<String, Vec<u8>>,
    fetch_errors: HashSet<String>,
    changed_files: Vec<FileDiff>,
    check_suites: Vec<CheckSuiteSummary>,
    installations: usize,
    failing: HashSet<Op>,
    calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.as_bytes().to_vec());
        self
    }

    pub fn with_fetch_error(mut self, path: &str) -> Self {
        self.fetch_errors.insert(path.to_string());
        self
    }

    pub fn with_changed_files(mut self, files: Vec<FileDiff>) -> Self {
        self.changed_files = files;
        self
    }

    pub fn with_check_suites(mut self, ids: &[u64]) -> Self {
        self.check_suites = ids
            .iter()
            .map(|&id| CheckSuiteSummary { id })
            .collect();
        self
    }

    pub fn with_installations(mut self, count: usize) -> Self {
        self.installations = count;
        self
    }

    pub fn failing(mut self, op: Op) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }

    pub fn fetched_paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::FetchFileContent(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<CheckRunUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UpdateCheckRun(_, update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    // Calls are recorded when made, not when polled, so concurrent requests
    // still record in issue order.
    fn record(&self, call: Call) { self.calls.lock().unwrap().push(call); }

    fn check(&self, op: Op) -> Result<()> {
        if self.failing.contains(&op) { Err(anyhow!("{op:?} failed")) } else { Ok(()) }
    }
}

impl RemoteRepoGateway for FakeGateway {
    fn create_check_run(
        &self,
        _repo: &RepoRef,
        check_run: &NewCheckRun,
    ) -> impl Future<Output = Result<u64>> + Send {
        self.record(Call::CreateCheckRun(check_run.clone()));
        let result = self.check(Op::CreateCheckRun).map(|()| CHECK_RUN_ID);
        async move { result }
    }

    fn update_check_run(
        &self,
        _repo: &RepoRef,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> impl Future<Output = Result<()>> + Send {
        self.record(Call::UpdateCheckRun(check_run_id, update.clone()));
        let result = self.check(Op::UpdateCheckRun);
        async move { result }
    }

    fn list_check_suites(
        &self,
        _repo: &RepoRef,
        git_ref: &str,
        app_id: u64,
    ) -> impl Future<Output = Result<Vec<CheckSuiteSummary>>> + Send {
        self.record(Call::ListCheckSuites { git_ref: git_ref.to_string(), app_id });
        let result = self.check(Op::ListCheckSuites).map(|()| self.check_suites.clone());
        async move { result }
    }

    fn rerequest_check_suite(
        &self,
        _repo: &RepoRef,
        check_suite_id: u64,
    ) -> impl Future<Output = Result<()>> + Send {
        self.record(Call::RerequestCheckSuite(check_suite_id));
        let result = self.check(Op::RerequestCheckSuite);
        async move { result }
    }

    fn list_changed_files(
        &self,
        _repo: &RepoRef,
        pull_number: u64,
    ) -> impl Future<Output = Result<Vec<FileDiff>>> + Send {
        self.record(Call::ListChangedFiles(pull_number));
        let result = self.check(Op::ListChangedFiles).map(|()| self.changed_files.clone());
        async move { result }
    }

    fn fetch_file_content(
        &self,
        _repo: &RepoRef,
        _git_ref: &str,
        path: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send {
        self.record(Call::FetchFileContent(path.to_string()));
        let result = if self.fetch_errors.contains(path) {
            Err(anyhow!("500 fetching {path}"))
        } else {
            Ok(self.files.get(path).cloned())
        };
        async move { result }
    }

    fn list_installations(
        &self,
        page: u32,
        per_page: u8,
    ) -> impl Future<Output = Result<Vec<Installation>>> + Send {
        self.record(Call::ListInstallations { page, per_page });
        let start = (page.saturating_sub(1) as usize) * per_page as usize;
        let end = (start + per_page as usize).min(self.installations);
        let result = self.check(Op::ListInstallations).map(|()| {
            let ids = start..end.max(start);
            ids.map(|id| Installation { id: id as u64 }).collect()
        });
        async move { result }
    }
}
