//! Shared data structures for the extraction tool.

pub mod a11y;

pub use a11y::{AccessibilityNode, AxNode, AxProperty, AxValue, TreeSnapshot};
