//! Resolving input references against registered variables.

use log::debug;
use serde::{Deserialize, Serialize};

use super::node::Variable;

/// A named reference to a variable, as configured on a workflow node.
///
/// `key_path` is `[node_id, key, key, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<InputRef>,
}

impl InputRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            children: Vec::new(),
        }
    }

    pub fn with_key_path<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_path = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_children(mut self, children: Vec<InputRef>) -> Self {
        self.children = children;
        self
    }
}

/// An input reference together with the variable it resolved to.
///
/// `key_path` no longer contains the node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVariable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<Variable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AvailableVariable>,
}

impl AvailableVariable {
    fn unresolved(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key_path: None,
            variable: None,
            children: Vec::new(),
        }
    }
}

fn find_available_variable(variables: &[Variable], input: &InputRef) -> AvailableVariable {
    let Some((node_id, keys)) = input.key_path.as_deref().and_then(<[String]>::split_first) else {
        return AvailableVariable::unresolved(&input.name);
    };

    let mut layer: Vec<&Variable> = variables
        .iter()
        .filter(|variable| variable.node_id.as_deref() == Some(node_id.as_str()))
        .collect();
    let mut resolved = None;
    for (position, key) in keys.iter().enumerate() {
        let target = layer.iter().copied().find(|variable| variable.key == *key);
        if position == keys.len() - 1 {
            resolved = target;
        }
        layer = target
            .map(|variable| variable.children.iter().collect())
            .unwrap_or_default();
    }

    match resolved {
        Some(variable) => AvailableVariable {
            name: input.name.clone(),
            key_path: Some(keys.to_vec()),
            variable: Some(variable.clone()),
            children: Vec::new(),
        },
        None => {
            debug!("input '{}' does not resolve to a variable", input.name);
            AvailableVariable::unresolved(&input.name)
        }
    }
}

/// Resolves every input (and nested inputs) against the registered variables.
///
/// Inputs without a key path, or whose path does not lead to a variable, are
/// kept by name only.
pub fn find_available_variables(
    variables: &[Variable],
    inputs: &[InputRef],
) -> Vec<AvailableVariable> {
    inputs
        .iter()
        .map(|input| {
            let mut available = find_available_variable(variables, input);
            if !input.children.is_empty() {
                available.children = find_available_variables(variables, &input.children);
            }
            available
        })
        .collect()
}
