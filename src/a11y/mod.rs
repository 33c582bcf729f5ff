//! Accessibility tree construction.
//!
//! The dispatcher consumes this through the [`AccessibilityTreeBuilder`]
//! capability so it can be tested with stubs; [`CdpTreeBuilder`] is the real
//! implementation, assembling Chromium's flat `Accessibility.getFullAXTree`
//! node list into a pruned hierarchical snapshot. In input-only mode the
//! snapshot keeps just input-capable nodes and their ancestors, returning
//! `None` when the page has nothing the agent could type into or toggle.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::logging::ScoutLogger;
use crate::page::{AgentPage, PageError};
use crate::types::{AccessibilityNode, AxNode, TreeSnapshot};

/// Diagnostic artifact written next to the run's other logs.
pub const TREE_DIAGNOSTIC_FILE: &str = "accessibility_tree.json";

#[derive(Debug, Error)]
pub enum AccessibilityError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Injected capability producing accessibility snapshots from a page.
///
/// `Ok(None)` is the empty sentinel for input-only mode: the page exposes no
/// input-capable elements. It is not an error.
#[async_trait]
pub trait AccessibilityTreeBuilder: Send + Sync {
    async fn build(
        &self,
        page: &dyn AgentPage,
        only_input_fields: bool,
        logs_dir: &Path,
    ) -> Result<Option<Value>, AccessibilityError>;
}

fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assemble the flat CDP node list into pruned root subtrees.
pub fn assemble_tree(nodes: Vec<AxNode>) -> Vec<AccessibilityNode> {
    let mut node_map: HashMap<String, AccessibilityNode> = HashMap::new();

    for raw in nodes {
        // Negative ids mark ignored/backing nodes.
        if raw
            .node_id
            .parse::<i64>()
            .map(|value| value < 0)
            .unwrap_or(false)
        {
            continue;
        }

        let role = raw
            .role
            .as_ref()
            .and_then(|role| role.value.as_ref())
            .map(json_value_to_string)
            .unwrap_or_default();
        let name = raw
            .name
            .as_ref()
            .and_then(|name| name.value.as_ref())
            .map(json_value_to_string);

        let has_children = raw
            .child_ids
            .as_ref()
            .map(|child_ids| !child_ids.is_empty())
            .unwrap_or(false);
        let has_valid_name = name
            .as_ref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        let is_structural = matches!(role.as_str(), "none" | "generic" | "InlineTextBox");

        if !has_valid_name && !has_children && is_structural {
            continue;
        }

        let node = AccessibilityNode {
            node_id: Some(raw.node_id.clone()),
            role: Some(role),
            name,
            description: raw
                .description
                .as_ref()
                .and_then(|description| description.value.as_ref())
                .map(json_value_to_string),
            value: raw
                .value
                .as_ref()
                .and_then(|value| value.value.as_ref())
                .map(json_value_to_string),
            backend_dom_node_id: raw.backend_dom_node_id,
            parent_id: raw.parent_id.clone(),
            child_ids: raw.child_ids.clone(),
            children: None,
            properties: raw.properties.clone(),
        };
        node_map.insert(raw.node_id, node);
    }

    let root_ids: Vec<String> = node_map
        .iter()
        .filter_map(|(id, node)| {
            if node.parent_id.is_none() {
                Some(id.clone())
            } else {
                None
            }
        })
        .collect();

    let mut forest = Vec::new();
    for root_id in root_ids {
        let mut visiting = HashSet::new();
        if let Some(root) = build_subtree(&root_id, &node_map, &mut visiting) {
            if let Some(pruned) = prune_structural(root) {
                forest.push(pruned);
            }
        }
    }
    forest
}

fn build_subtree(
    node_id: &str,
    node_map: &HashMap<String, AccessibilityNode>,
    visiting: &mut HashSet<String>,
) -> Option<AccessibilityNode> {
    if !visiting.insert(node_id.to_string()) {
        return node_map.get(node_id).cloned();
    }

    let mut node = node_map.get(node_id)?.clone();
    let child_ids = node.child_ids.clone().unwrap_or_default();
    let mut children = Vec::new();

    for child_id in child_ids {
        if let Some(child) = build_subtree(&child_id, node_map, visiting) {
            children.push(child);
        }
    }

    if !children.is_empty() {
        node.children = Some(children);
    }

    visiting.remove(node_id);
    Some(node)
}

/// Drop structural `generic`/`none` wrappers, splicing single children up.
fn prune_structural(mut node: AccessibilityNode) -> Option<AccessibilityNode> {
    let children = node.children.take().unwrap_or_default();
    let mut kept: Vec<AccessibilityNode> =
        children.into_iter().filter_map(prune_structural).collect();

    if matches!(node.role.as_deref(), Some("generic" | "none")) {
        if kept.len() == 1 {
            return kept.pop();
        }
        if kept.is_empty() {
            return None;
        }
    }

    let kept = drop_redundant_static_text(&node, kept);
    node.children = Some(kept);
    Some(node)
}

/// Remove StaticText children whose combined text merely repeats the parent's
/// accessible name.
fn drop_redundant_static_text(
    parent: &AccessibilityNode,
    children: Vec<AccessibilityNode>,
) -> Vec<AccessibilityNode> {
    let Some(target_name) = parent
        .name
        .as_ref()
        .map(|name| normalize_whitespace(name))
        .filter(|name| !name.is_empty())
    else {
        return children;
    };

    let combined = children
        .iter()
        .filter(|child| child.role.as_deref() == Some("StaticText"))
        .filter_map(|child| child.name.as_ref())
        .fold(String::new(), |mut acc, name| {
            let normalized = normalize_whitespace(name);
            if !normalized.is_empty() {
                acc.push_str(&normalized);
            }
            acc
        });

    if combined == target_name {
        children
            .into_iter()
            .filter(|child| {
                child.role.as_deref() != Some("StaticText")
                    || child
                        .name
                        .as_ref()
                        .map(|name| name.is_empty())
                        .unwrap_or(true)
            })
            .collect()
    } else {
        children
    }
}

/// Keep only input-capable nodes and the ancestors leading to them,
/// incrementing `count` for every capable node retained.
fn retain_input_paths(
    mut node: AccessibilityNode,
    count: &mut usize,
) -> Option<AccessibilityNode> {
    let children = node.children.take().unwrap_or_default();
    let kept: Vec<AccessibilityNode> = children
        .into_iter()
        .filter_map(|child| retain_input_paths(child, count))
        .collect();

    let capable = node.is_input_capable();
    if capable {
        *count += 1;
    }

    if capable || !kept.is_empty() {
        node.children = Some(kept);
        Some(node)
    } else {
        None
    }
}

fn count_input_capable(node: &AccessibilityNode) -> usize {
    let own = usize::from(node.is_input_capable());
    let children = node
        .children
        .as_ref()
        .map(|children| children.iter().map(count_input_capable).sum())
        .unwrap_or(0);
    own + children
}

/// Render the tree as an indented text outline for prompt consumption.
pub fn format_outline(node: &AccessibilityNode, level: usize) -> String {
    let indent = "  ".repeat(level);
    let node_id = node.node_id.as_deref().unwrap_or("?");
    let role = node.role.as_deref().unwrap_or("?");
    let name_part = node
        .name
        .as_ref()
        .filter(|name| !name.is_empty())
        .map(|name| format!(": {name}"))
        .unwrap_or_default();
    let value_part = node
        .value
        .as_ref()
        .filter(|value| !value.is_empty())
        .map(|value| format!(" = {value}"))
        .unwrap_or_default();

    let mut result = format!("{indent}[{node_id}] {role}{name_part}{value_part}\n");
    if let Some(children) = node.children.as_ref() {
        for child in children {
            result.push_str(&format_outline(child, level + 1));
        }
    }
    result
}

/// CDP-backed [`AccessibilityTreeBuilder`].
pub struct CdpTreeBuilder {
    logger: Arc<ScoutLogger>,
}

impl CdpTreeBuilder {
    pub fn new(logger: Arc<ScoutLogger>) -> Self {
        Self { logger }
    }

    async fn fetch_and_assemble(
        &self,
        page: &dyn AgentPage,
        only_input_fields: bool,
    ) -> Result<Option<Value>, AccessibilityError> {
        let cdp_result = page.send_cdp("Accessibility.getFullAXTree", None).await?;
        let nodes_value = cdp_result
            .get("nodes")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let nodes: Vec<AxNode> = serde_json::from_value(nodes_value)?;

        let forest = assemble_tree(nodes);
        let (forest, input_field_count) = if only_input_fields {
            let mut count = 0;
            let filtered: Vec<AccessibilityNode> = forest
                .into_iter()
                .filter_map(|node| retain_input_paths(node, &mut count))
                .collect();
            if count == 0 {
                return Ok(None);
            }
            (filtered, count)
        } else {
            let count = forest.iter().map(count_input_capable).sum();
            (forest, count)
        };

        let outline = forest
            .iter()
            .map(|node| format_outline(node, 0))
            .collect::<Vec<_>>()
            .join("\n");

        let snapshot = TreeSnapshot {
            tree: forest,
            outline,
            input_field_count,
        };
        Ok(Some(serde_json::to_value(&snapshot)?))
    }

    async fn write_diagnostic(&self, logs_dir: &Path, snapshot: &Value) {
        let path = logs_dir.join(TREE_DIAGNOSTIC_FILE);
        let pretty =
            serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| snapshot.to_string());
        if let Err(err) = tokio::fs::write(&path, pretty).await {
            self.logger.warn(
                format!("Failed to write {}: {err}", path.display()),
                Some("a11y"),
                None,
            );
        }
    }
}

#[async_trait]
impl AccessibilityTreeBuilder for CdpTreeBuilder {
    async fn build(
        &self,
        page: &dyn AgentPage,
        only_input_fields: bool,
        logs_dir: &Path,
    ) -> Result<Option<Value>, AccessibilityError> {
        let started = Instant::now();

        if let Err(err) = page.send_cdp("Accessibility.enable", None).await {
            self.logger.debug(
                format!("Failed to enable Accessibility domain: {err}"),
                Some("a11y"),
                None,
            );
        }

        let result = self.fetch_and_assemble(page, only_input_fields).await;

        if let Err(err) = page.send_cdp("Accessibility.disable", None).await {
            self.logger.debug(
                "Failed to disable Accessibility domain on cleanup.",
                Some("a11y"),
                Some(json!({ "error": err.to_string() })),
            );
        }

        match result {
            Ok(Some(snapshot)) => {
                self.logger.debug(
                    format!(
                        "built accessibility tree in {}ms",
                        started.elapsed().as_millis()
                    ),
                    Some("a11y"),
                    None,
                );
                self.write_diagnostic(logs_dir, &snapshot).await;
                Ok(Some(snapshot))
            }
            Ok(None) => {
                self.logger.debug(
                    "No input-capable elements found in the accessibility tree.",
                    Some("a11y"),
                    None,
                );
                Ok(None)
            }
            Err(err) => {
                self.logger.error(
                    "Error building accessibility tree",
                    Some("a11y"),
                    Some(json!({ "error": err.to_string() })),
                );
                Err(err)
            }
        }
    }
}
