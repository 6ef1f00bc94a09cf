use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

mod webhook;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/api/github/webhook", post(webhook::webhook))
}

async fn index() -> &'static str { "kube-validator is running" }
