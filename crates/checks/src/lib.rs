//! Validates the Kubernetes manifests changed in pull requests and reports
//! the result as a GitHub check run.

pub mod candidates;
pub mod changes;
pub mod config;
pub mod dispatch;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod rerequest;
pub mod telemetry;

#[cfg(test)]
mod fake;

pub use dispatch::Dispatcher;
