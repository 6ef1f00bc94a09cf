use std::sync::Arc;

use kube_validator_core::config::ValidatorSettings;
use kube_validator_github::{events::WebhookEvent, gateway::RemoteRepoGateway};

use crate::{
    manifest::{ManifestValidator, StructuralValidator},
    pipeline::CheckSuitePipeline,
    rerequest, telemetry,
};

/// Routes webhook events to their handlers.
pub struct Dispatcher<G> {
    gateway: G,
    app_id: u64,
    settings: ValidatorSettings,
    validator: Arc<dyn ManifestValidator>,
}

impl<G: RemoteRepoGateway> Dispatcher<G> {
    pub fn new(gateway: G, app_id: u64, settings: ValidatorSettings) -> Self {
        Self { gateway, app_id, settings, validator: Arc::new(StructuralValidator) }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ManifestValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn gateway(&self) -> &G { &self.gateway }

    /// Handles one delivery. Returns whether the event was acted upon;
    /// failures are logged and reported as `false`.
    pub async fn process(&self, event: &WebhookEvent) -> bool {
        match event {
            WebhookEvent::CheckSuite(event) => {
                let pipeline = CheckSuitePipeline {
                    gateway: &self.gateway,
                    validator: self.validator.as_ref(),
                    settings: &self.settings,
                };
                pipeline.run(event).await;
                true
            }
            WebhookEvent::PullRequest(event) => {
                rerequest::process_pull_request(&self.gateway, self.app_id, event).await
            }
            WebhookEvent::CheckRun(event) => {
                rerequest::process_check_run(&self.gateway, event).await
            }
            WebhookEvent::Installation(_) | WebhookEvent::InstallationRepositories(_) => {
                match telemetry::log_installation_count(
                    &self.gateway,
                    self.settings.marketplace_threshold,
                )
                .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!("{:?}", e);
                        false
                    }
                }
            }
            WebhookEvent::Other(kind) => {
                tracing::info!("ignoring {}", kind);
                false
            }
        }
    }
}
