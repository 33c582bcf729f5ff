//! Accessibility tree shapes.
//!
//! [`AxNode`] and friends mirror the flat node records returned by the Chrome
//! DevTools Protocol; [`AccessibilityNode`] is the hierarchical, pruned form
//! handed back to the agent loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// AX property key/value pair as returned by Chromium accessibility snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxProperty {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// AX value wrapper exposing both the primitive type and the value itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxValue {
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Raw accessibility node shape returned by the Chrome DevTools Protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxNode {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AxValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<AxValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<AxValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AxValue>,
    #[serde(rename = "backendDOMNodeId", skip_serializing_if = "Option::is_none")]
    pub backend_dom_node_id: Option<i64>,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "childIds", skip_serializing_if = "Option::is_none")]
    pub child_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<AxProperty>>,
}

/// AX roles the agent can type into, toggle, or otherwise operate.
const INPUT_CAPABLE_ROLES: &[&str] = &[
    "textbox",
    "searchbox",
    "combobox",
    "listbox",
    "checkbox",
    "radio",
    "button",
    "switch",
    "slider",
    "spinbutton",
    "menuitemcheckbox",
    "menuitemradio",
];

/// Hierarchical accessibility node after assembly and pruning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AccessibilityNode {
    #[serde(rename = "nodeId", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "backendDOMNodeId", skip_serializing_if = "Option::is_none")]
    pub backend_dom_node_id: Option<i64>,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "childIds", skip_serializing_if = "Option::is_none")]
    pub child_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<AccessibilityNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<AxProperty>>,
}

impl AccessibilityNode {
    /// Whether the agent can feed input into this node. Editable nodes count
    /// even when Chromium reports an unusual role for them.
    pub fn is_input_capable(&self) -> bool {
        if let Some(role) = self.role.as_deref() {
            if INPUT_CAPABLE_ROLES.contains(&role) {
                return true;
            }
        }
        self.has_truthy_property("editable") || self.has_truthy_property("settable")
    }

    fn has_truthy_property(&self, name: &str) -> bool {
        let Some(properties) = self.properties.as_ref() else {
            return false;
        };
        properties.iter().any(|prop| {
            prop.name == name
                && prop
                    .value
                    .as_ref()
                    .and_then(|value| value.get("value"))
                    .map(|value| value.as_bool().unwrap_or(!value.is_null()))
                    .unwrap_or(false)
        })
    }
}

/// Snapshot returned for `input_fields` and `all_fields` extractions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub tree: Vec<AccessibilityNode>,
    /// Indented text outline of the tree for prompt-friendly consumption.
    pub outline: String,
    pub input_field_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_drives_input_capability() {
        let node = AccessibilityNode {
            role: Some("textbox".to_string()),
            ..AccessibilityNode::default()
        };
        assert!(node.is_input_capable());

        let heading = AccessibilityNode {
            role: Some("heading".to_string()),
            ..AccessibilityNode::default()
        };
        assert!(!heading.is_input_capable());
    }

    #[test]
    fn editable_property_marks_input_capability() {
        let node = AccessibilityNode {
            role: Some("generic".to_string()),
            properties: Some(vec![AxProperty {
                name: "editable".to_string(),
                value: Some(json!({ "type": "token", "value": "richtext" })),
            }]),
            ..AccessibilityNode::default()
        };
        assert!(node.is_input_capable());
    }

    #[test]
    fn ax_node_parses_cdp_payload() {
        let node: AxNode = serde_json::from_value(json!({
            "nodeId": "7",
            "role": { "type": "role", "value": "button" },
            "name": { "type": "computedString", "value": "Submit" },
            "backendDOMNodeId": 42,
            "parentId": "1",
            "childIds": []
        }))
        .expect("parse");

        assert_eq!(node.node_id, "7");
        assert_eq!(node.backend_dom_node_id, Some(42));
        assert_eq!(
            node.role.and_then(|role| role.value),
            Some(Value::String("button".to_string()))
        );
    }
}
