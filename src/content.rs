//! The `get_page_content` tool: extract page content by content type.
//!
//! [`ContentTool::get_content`] is the single entry point. It validates the
//! requested content type, resolves the active page, waits for the readiness
//! gate, runs the matching extractor, and reports ACT_START/ACT_OK lifecycle
//! events along the way. Failures travel back on the error channel only; no
//! event is emitted for them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use crate::a11y::{AccessibilityError, AccessibilityTreeBuilder};
use crate::config::ScoutConfig;
use crate::context::ScoutContext;
use crate::dom_scripts::filtered_text_script;
use crate::events::{Actor, EventSink, ExecutionEvent, ExecutionState};
use crate::logging::ScoutLogger;
use crate::page::{AgentPage, PageError};

/// Tool name carried in lifecycle events.
pub const GET_PAGE_CONTENT: &str = "get_page_content";

/// Returned instead of a snapshot when `input_fields` finds nothing to report.
pub const INPUT_FIELDS_ADVISORY: &str =
    "Could not fetch input fields. Please consider trying with content_type all_fields.";

/// Debug artifact holding the last `text_only` extraction.
pub const TEXT_ARTIFACT_FILE: &str = "text_only_dom.txt";

/// Supported extraction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    TextOnly,
    InputFields,
    AllFields,
}

impl ContentType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text_only" => Some(ContentType::TextOnly),
            "input_fields" => Some(ContentType::InputFields),
            "all_fields" => Some(ContentType::AllFields),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::TextOnly => "text_only",
            ContentType::InputFields => "input_fields",
            ContentType::AllFields => "all_fields",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful extraction result.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    /// `text_only`: visible text plus labelled image alt texts.
    Text(String),
    /// `input_fields`: snapshot filtered to input-capable nodes.
    InputFields(Value),
    /// `all_fields`: full accessibility snapshot.
    AllFields(Value),
    /// `input_fields` found nothing; the caller should retry with
    /// `all_fields`. Still a success, not an error.
    Advisory(String),
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("No active page found. OpenURL command opens a new page.")]
    NoActivePage,
    #[error("Unsupported content_type: {0}")]
    UnsupportedContentType(String),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Accessibility(#[from] AccessibilityError),
}

/// Content extraction tool wired with its injected capabilities.
pub struct ContentTool {
    config: ScoutConfig,
    logger: Arc<ScoutLogger>,
    events: Arc<dyn EventSink>,
    tree_builder: Arc<dyn AccessibilityTreeBuilder>,
}

impl ContentTool {
    pub fn new(
        config: ScoutConfig,
        logger: Arc<ScoutLogger>,
        events: Arc<dyn EventSink>,
        tree_builder: Arc<dyn AccessibilityTreeBuilder>,
    ) -> Self {
        Self {
            config,
            logger,
            events,
            tree_builder,
        }
    }

    /// Extract content from the active page.
    ///
    /// The content type is validated before anything else; an unknown value
    /// fails without touching the page or emitting events. A missing active
    /// page likewise fails silently on the event bus, since a run that never
    /// started must not appear started to observers.
    pub async fn get_content(
        &self,
        ctx: &ScoutContext,
        content_type: &str,
    ) -> Result<PageContent, ContentError> {
        let content_type = ContentType::parse(content_type)
            .ok_or_else(|| ContentError::UnsupportedContentType(content_type.to_string()))?;

        let page = ctx.active_page().ok_or(ContentError::NoActivePage)?;

        self.events.emit(ExecutionEvent::new(
            ExecutionState::ActStart,
            Actor::Navigator,
            ctx,
            GET_PAGE_CONTENT,
            format!("Executing Get DOM Command based on content_type: {content_type}"),
        ));

        let started = Instant::now();
        page.wait_for_non_loading_dom(Duration::from_millis(self.config.dom_settle_timeout_ms))
            .await;

        let (content, success_message) = match content_type {
            ContentType::TextOnly => {
                self.logger
                    .debug("Fetching DOM for text_only", Some("content"), None);
                let text = self.extract_filtered_text(page.as_ref()).await?;
                self.write_text_artifact(ctx, &text).await;
                (
                    PageContent::Text(text),
                    "Fetched the text content of the DOM",
                )
            }
            ContentType::InputFields => {
                self.logger
                    .debug("Fetching DOM for input_fields", Some("content"), None);
                let snapshot = self
                    .tree_builder
                    .build(page.as_ref(), true, ctx.logs_dir())
                    .await?;
                match snapshot {
                    Some(snapshot) => (
                        PageContent::InputFields(snapshot),
                        "Fetched only input fields in the DOM",
                    ),
                    None => (
                        PageContent::Advisory(INPUT_FIELDS_ADVISORY.to_string()),
                        "Fetched only input fields in the DOM",
                    ),
                }
            }
            ContentType::AllFields => {
                let snapshot = self
                    .tree_builder
                    .build(page.as_ref(), false, ctx.logs_dir())
                    .await?
                    .unwrap_or(Value::Null);
                (
                    PageContent::AllFields(snapshot),
                    "Fetched all the fields in the DOM",
                )
            }
        };

        self.logger.info(
            format!(
                "Get DOM Command executed in {}ms",
                started.elapsed().as_millis()
            ),
            Some("content"),
            None,
        );

        self.events.emit(ExecutionEvent::new(
            ExecutionState::ActOk,
            Actor::Navigator,
            ctx,
            GET_PAGE_CONTENT,
            success_message,
        ));

        Ok(content)
    }

    async fn extract_filtered_text(&self, page: &dyn AgentPage) -> Result<String, ContentError> {
        let script = filtered_text_script(&self.config.overlay_selectors);
        let result = page.evaluate(&script).await?;
        match result {
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    /// Artifact write failures degrade to a warning; extraction already
    /// succeeded and its result must still reach the caller.
    async fn write_text_artifact(&self, ctx: &ScoutContext, text: &str) {
        let path = ctx.logs_dir().join(TEXT_ARTIFACT_FILE);
        if let Err(err) = tokio::fs::write(&path, text).await {
            self.logger.warn(
                format!("Failed to write {}: {err}", path.display()),
                Some("content"),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parses_wire_names_only() {
        assert_eq!(ContentType::parse("text_only"), Some(ContentType::TextOnly));
        assert_eq!(
            ContentType::parse("input_fields"),
            Some(ContentType::InputFields)
        );
        assert_eq!(
            ContentType::parse("all_fields"),
            Some(ContentType::AllFields)
        );
        assert_eq!(ContentType::parse("TEXT_ONLY"), None);
        assert_eq!(ContentType::parse("html"), None);
        assert_eq!(ContentType::parse(""), None);
    }

    #[test]
    fn content_type_round_trips_through_display() {
        for content_type in [
            ContentType::TextOnly,
            ContentType::InputFields,
            ContentType::AllFields,
        ] {
            assert_eq!(
                ContentType::parse(&content_type.to_string()),
                Some(content_type)
            );
        }
    }

    #[test]
    fn error_messages_match_tool_contract() {
        assert_eq!(
            ContentError::NoActivePage.to_string(),
            "No active page found. OpenURL command opens a new page."
        );
        assert_eq!(
            ContentError::UnsupportedContentType("html".to_string()).to_string(),
            "Unsupported content_type: html"
        );
    }
}
