use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub validator: ValidatorSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub app: GitHubAppConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubAppConfig {
    pub id: u64,
    pub webhook_secret: String,
    pub private_key: String,
}

/// Knobs for the check-suite pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorSettings {
    /// Path of the per-repository configuration file.
    pub config_path: String,
    /// Name of the check run reported back to GitHub.
    pub check_name: String,
    /// Maximum concurrent file content requests per check suite.
    pub fetch_concurrency: usize,
    /// Installation count above which the app qualifies for the Marketplace.
    pub marketplace_threshold: usize,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            config_path: ".github/kubevalidator.yaml".to_string(),
            check_name: "kubevalidator".to_string(),
            fetch_concurrency: 8,
            marketplace_threshold: 250,
        }
    }
}
