//! pagescout: DOM content extraction for browser agents.
//!
//! The crate exposes one tool, [`ContentTool::get_content`], which pulls
//! either the visible text or an accessibility-tree snapshot out of the
//! active browser tab. The tab, the event bus, and the tree builder are all
//! injected capabilities, so the tool runs against a real chromiumoxide page
//! in production and against stubs in tests.

pub mod a11y;
pub mod adapter;
pub mod config;
pub mod content;
pub mod context;
pub mod dom_scripts;
pub mod events;
pub mod logging;
pub mod page;
pub mod settle;
pub mod types;

pub use a11y::{AccessibilityError, AccessibilityTreeBuilder, CdpTreeBuilder};
pub use adapter::ChromiumPageHandle;
pub use config::{ScoutConfig, ScoutConfigOverrides, Verbosity};
pub use content::{
    ContentError, ContentTool, ContentType, PageContent, GET_PAGE_CONTENT, INPUT_FIELDS_ADVISORY,
};
pub use context::{PageId, ScoutContext, ScoutContextError};
pub use events::{Actor, EventSink, ExecutionEvent, ExecutionState, LoggingEventSink};
pub use logging::{LogCallback, LogConfig, LogLevel, ScoutLogRecord, ScoutLogger};
pub use page::{AgentPage, PageError};
