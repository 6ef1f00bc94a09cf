use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kube_validator_checks::Dispatcher;
use kube_validator_core::AppError;
use kube_validator_github::webhook::GitHubEvent;

use crate::AppState;

/// Accepts a delivery and processes it in the background.
pub async fn webhook(
    State(state): State<AppState>,
    GitHubEvent { delivery, event }: GitHubEvent,
) -> Result<Response, AppError> {
    let delivery = delivery.unwrap_or_else(|| "[unknown]".to_string());
    match event.repository() {
        Some(repo) => {
            tracing::info!("Received {} event {} from {}", event.kind(), delivery, repo)
        }
        None => tracing::info!("Received {} event {}", event.kind(), delivery),
    }

    let Some(gateway) = state.github.gateway_for(&event).await? else {
        tracing::warn!("Received {} event {} with no installation ID", event.kind(), delivery);
        return Ok((StatusCode::OK, "No installation ID").into_response());
    };
    let dispatcher = Dispatcher::new(gateway, state.github.app_id, state.config.validator.clone());
    tokio::spawn(async move {
        let handled = dispatcher.process(&event).await;
        tracing::debug!("Delivery {} ({}) handled: {}", delivery, event.kind(), handled);
    });

    Ok((StatusCode::ACCEPTED, "Event accepted").into_response())
}
