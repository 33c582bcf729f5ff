//! Lifecycle events reported to the agent framework's event bus.
//!
//! The bus itself lives outside this crate; it is injected as an [`EventSink`]
//! capability so the extraction tool can be exercised without a live bus.
//! Emission is fire-and-forget: a sink failure must never change the result
//! of an extraction call, so [`EventSink::emit`] is infallible by contract.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::ScoutContext;
use crate::logging::ScoutLogger;

/// Execution phase of a tool invocation.
///
/// The tool only ever emits `ActStart` and `ActOk`; failures travel back to
/// the caller on the error channel, bypassing the bus. `ActError` is part of
/// the shared vocabulary for sinks that aggregate events from other tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    ActStart,
    ActOk,
    ActError,
}

/// Role within the agent loop on whose behalf the event is emitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Planner,
    Navigator,
    Validator,
}

/// Immutable record handed to the bus. Ownership transfers on emit; the tool
/// never stores events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionEvent {
    pub state: ExecutionState,
    pub actor: Actor,
    pub task_id: String,
    pub step: u64,
    pub tool_round: u64,
    pub tool: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    pub fn new(
        state: ExecutionState,
        actor: Actor,
        ctx: &ScoutContext,
        tool: &str,
        details: impl Into<String>,
    ) -> Self {
        Self {
            state,
            actor,
            task_id: ctx.task_id().to_string(),
            step: ctx.step(),
            tool_round: ctx.tool_round(),
            tool: tool.to_string(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Injected capability standing in for the external event bus.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

/// Default sink that forwards events to the structured logger, useful when the
/// tool runs outside the full agent framework.
pub struct LoggingEventSink {
    logger: Arc<ScoutLogger>,
}

impl LoggingEventSink {
    pub fn new(logger: Arc<ScoutLogger>) -> Self {
        Self { logger }
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: ExecutionEvent) {
        self.logger.debug(
            event.details.clone(),
            Some("event"),
            Some(json!({
                "state": event.state,
                "actor": event.actor,
                "taskId": event.task_id,
                "step": event.step,
                "toolRound": event.tool_round,
                "tool": event.tool,
            })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use crate::logging::LogCallback;
    use std::sync::Mutex;

    #[test]
    fn execution_state_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExecutionState::ActStart).unwrap(),
            "\"ACT_START\""
        );
        assert_eq!(
            serde_json::to_string(&ExecutionState::ActOk).unwrap(),
            "\"ACT_OK\""
        );
        let parsed: ExecutionState = serde_json::from_str("\"ACT_ERROR\"").unwrap();
        assert_eq!(parsed, ExecutionState::ActError);
    }

    #[test]
    fn event_captures_context_identifiers() {
        let mut ctx = ScoutContext::new("task-9", "/tmp/logs");
        ctx.begin_step(3);
        ctx.begin_tool_round(7);

        let event = ExecutionEvent::new(
            ExecutionState::ActStart,
            Actor::Navigator,
            &ctx,
            "get_page_content",
            "starting",
        );

        assert_eq!(event.task_id, "task-9");
        assert_eq!(event.step, 3);
        assert_eq!(event.tool_round, 7);
        assert_eq!(event.tool, "get_page_content");
    }

    #[test]
    fn logging_sink_forwards_to_logger() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&records);
        let callback: LogCallback = Arc::new(move |record| {
            capture.lock().unwrap().push(record.clone());
        });

        let mut logger = ScoutLogger::new(Verbosity::Detailed);
        logger.set_external_logger(Some(callback));
        let sink = LoggingEventSink::new(Arc::new(logger));

        let ctx = ScoutContext::new("task-1", "/tmp/logs");
        sink.emit(ExecutionEvent::new(
            ExecutionState::ActOk,
            Actor::Navigator,
            &ctx,
            "get_page_content",
            "Fetched the text content of the DOM",
        ));

        let values = records.lock().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].message, "Fetched the text content of the DOM");
        assert_eq!(
            values[0]
                .auxiliary
                .as_ref()
                .and_then(|aux| aux.get("state"))
                .and_then(|state| state.as_str()),
            Some("ACT_OK")
        );
    }
}
