//! Per-task context handed to the extraction tool by the agent loop.
//!
//! The context tracks the pages the external browser-context manager has
//! supplied, which one is active, and the task/step/round identifiers that
//! lifecycle events carry. Page handles are registered and retired by the
//! manager; this crate never creates or closes them.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::page::AgentPage;

pub type PageId = String;

/// Errors surfaced by [`ScoutContext`] bookkeeping.
#[derive(Debug, Error)]
pub enum ScoutContextError {
    #[error("page '{0}' is not registered")]
    PageNotFound(PageId),
}

/// Mutable task context: identifiers, log directory, and the page registry.
pub struct ScoutContext {
    task_id: String,
    step: u64,
    tool_round: u64,
    logs_dir: PathBuf,
    pages: HashMap<PageId, Arc<dyn AgentPage>>,
    active_page: Option<PageId>,
}

impl ScoutContext {
    pub fn new(task_id: impl Into<String>, logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            task_id: task_id.into(),
            step: 0,
            tool_round: 0,
            logs_dir: logs_dir.into(),
            pages: HashMap::new(),
            active_page: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn tool_round(&self) -> u64 {
        self.tool_round
    }

    /// Directory where debug artifacts for this run are written.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn begin_step(&mut self, step: u64) {
        self.step = step;
    }

    pub fn begin_tool_round(&mut self, tool_round: u64) {
        self.tool_round = tool_round;
    }

    /// Register a page handle. Registration is idempotent; re-registering an
    /// id replaces the stored handle.
    pub fn register_page(&mut self, page_id: impl Into<PageId>, page: Arc<dyn AgentPage>) {
        self.pages.insert(page_id.into(), page);
    }

    /// Mark a registered page as the active tab.
    pub fn set_active_page(&mut self, page_id: &PageId) -> Result<(), ScoutContextError> {
        if !self.pages.contains_key(page_id) {
            return Err(ScoutContextError::PageNotFound(page_id.clone()));
        }
        self.active_page = Some(page_id.clone());
        Ok(())
    }

    /// The currently active page handle, if one has been selected.
    pub fn active_page(&self) -> Option<Arc<dyn AgentPage>> {
        self.active_page
            .as_ref()
            .and_then(|page_id| self.pages.get(page_id))
            .cloned()
    }

    pub fn page(&self, page_id: &PageId) -> Option<Arc<dyn AgentPage>> {
        self.pages.get(page_id).cloned()
    }

    /// Remove a page from the registry, clearing the active marker if it
    /// pointed at the removed page. Returns `true` if a page was removed.
    pub fn remove_page(&mut self, page_id: &PageId) -> bool {
        if self.pages.remove(page_id).is_some() {
            if self.active_page.as_ref() == Some(page_id) {
                self.active_page = None;
            }
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for ScoutContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoutContext")
            .field("task_id", &self.task_id)
            .field("step", &self.step)
            .field("tool_round", &self.tool_round)
            .field("page_count", &self.pages.len())
            .field("active_page", &self.active_page)
            .finish()
    }
}
