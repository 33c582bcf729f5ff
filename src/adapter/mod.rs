//! Browser adapters implementing the [`crate::page::AgentPage`] capability.

pub mod chromiumoxide;

pub use chromiumoxide::ChromiumPageHandle;
