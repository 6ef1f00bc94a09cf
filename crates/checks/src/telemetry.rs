use anyhow::{Context, Result};
use kube_validator_github::gateway::RemoteRepoGateway;

/// Largest page size the installations endpoint honours.
const PER_PAGE: u8 = 100;

/// Logs how many installations the app has, relative to the Marketplace
/// listing requirement of more than `threshold` installations.
///
/// Stops paging as soon as the count is known to exceed `threshold`.
pub async fn log_installation_count<G: RemoteRepoGateway>(
    gateway: &G,
    threshold: usize,
) -> Result<usize> {
    let mut count = 0;
    let mut page = 1;
    loop {
        let installations = gateway
            .list_installations(page, PER_PAGE)
            .await
            .with_context(|| format!("Failed to count installations (page {page})"))?;
        count += installations.len();
        if installations.len() < PER_PAGE as usize || count > threshold {
            break;
        }
        page += 1;
    }
    if count > threshold {
        tracing::info!("{} installations. get thee to the market!", count);
    } else {
        tracing::info!("{} installations. keep it up!", count);
    }
    Ok(count)
}
