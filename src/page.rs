//! The page capability consumed by the extractors.
//!
//! The browser tab itself is owned by an external browser-context manager;
//! this crate only reads from it for the duration of one call. Modeling the
//! handle as a trait keeps the dispatcher and extractors testable without a
//! live browser, with the chromiumoxide adapter providing the real thing.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by page-level operations.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("CDP operation failed: {0}")]
    Cdp(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("unsupported CDP method: {0}")]
    UnsupportedMethod(String),
}

/// Read-only view of one browser tab.
#[async_trait]
pub trait AgentPage: Send + Sync {
    /// Run a JavaScript expression in the page and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, PageError>;

    /// Issue a raw CDP command against the page.
    async fn send_cdp(&self, method: &str, params: Option<Value>)
        -> Result<Value, PageError>;

    /// Suspend until the page reports a non-loading DOM state or `timeout`
    /// elapses, whichever comes first. Timing out is not an error; extraction
    /// proceeds best-effort on a possibly-still-loading page.
    async fn wait_for_non_loading_dom(&self, timeout: Duration);
}
