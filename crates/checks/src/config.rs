//! Per-repository validator configuration.

use globset::{GlobBuilder, GlobMatcher};
use kube_validator_core::models::{Annotation, RepoRef};
use kube_validator_github::gateway::RemoteRepoGateway;
use serde::Deserialize;

pub const CONFIG_KIND: &str = "KubeValidator";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    kind: Option<String>,
    spec: RawSpec,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpec {
    #[serde(default)]
    manifests: Vec<RawManifestRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifestRule {
    glob: String,
    #[serde(default)]
    strict: bool,
}

/// A parsed configuration with its globs compiled.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub rules: Vec<ManifestRule>,
}

#[derive(Debug, Clone)]
pub struct ManifestRule {
    pub glob: String,
    pub strict: bool,
    matcher: GlobMatcher,
}

impl ManifestRule {
    pub fn new(glob: &str, strict: bool) -> Result<Self, globset::Error> {
        let matcher = GlobBuilder::new(glob).literal_separator(true).build()?.compile_matcher();
        Ok(Self { glob: glob.to_string(), strict, matcher })
    }

    pub fn is_match(&self, path: &str) -> bool { self.matcher.is_match(path) }
}

impl ValidatorConfig {
    /// First rule matching `path`, in declaration order.
    pub fn rule_for(&self, path: &str) -> Option<&ManifestRule> {
        self.rules.iter().find(|rule| rule.is_match(path))
    }
}

/// The three ways looking up a repository's configuration can end.
#[derive(Debug, Clone)]
pub enum ConfigOutcome {
    /// No configuration file; the repository has not opted in.
    Absent,
    /// The file exists but could not be parsed. Carries the finding to report.
    Malformed(Annotation),
    Present(ValidatorConfig),
}

/// Fetches `path` at `head_sha` and classifies the result.
pub async fn resolve<G: RemoteRepoGateway>(
    gateway: &G,
    repo: &RepoRef,
    head_sha: &str,
    path: &str,
) -> ConfigOutcome {
    match gateway.fetch_file_content(repo, head_sha, path).await {
        Ok(Some(bytes)) => match parse(path, &bytes) {
            Ok(config) => ConfigOutcome::Present(config),
            Err(annotation) => {
                tracing::info!("Invalid {} in {}: {}", path, repo, annotation.message);
                ConfigOutcome::Malformed(annotation)
            }
        },
        Ok(None) => {
            tracing::info!("No {} in {}@{}", path, repo, head_sha);
            ConfigOutcome::Absent
        }
        Err(e) => {
            tracing::warn!("Treating unreachable {} in {} as absent: {:?}", path, repo, e);
            ConfigOutcome::Absent
        }
    }
}

/// Parses configuration bytes, describing any problem as an annotation on `path`.
pub fn parse(path: &str, bytes: &[u8]) -> Result<ValidatorConfig, Annotation> {
    let invalid =
        |message: String| Annotation::failure(path, message).with_title("Invalid configuration");
    let raw: RawConfig = serde_yaml::from_slice(bytes).map_err(|e| {
        let annotation = invalid(e.to_string());
        match e.location() {
            Some(location) => annotation
                .with_line(location.line() as u32)
                .with_column(location.column() as u32),
            None => annotation,
        }
    })?;
    if let Some(kind) = raw.kind.as_deref()
        && kind != CONFIG_KIND
    {
        return Err(invalid(format!("kind must be {CONFIG_KIND}, found {kind}")));
    }
    let rules = raw
        .spec
        .manifests
        .iter()
        .map(|rule| {
            ManifestRule::new(&rule.glob, rule.strict)
                .map_err(|e| invalid(format!("invalid glob {:?}: {}", rule.glob, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ValidatorConfig { rules })
}
