//! Arena-backed variable tree.
//!
//! This module provides the `VariableTree` type, the forest of variables an
//! expression can reference. Nodes live in a flat arena and refer to each
//! other by [`NodeId`]; children are owned by the tree, parent links are plain
//! indices used to walk back up when rebuilding a full path.
//!
//! # Example
//!
//! ```
//! use exprquill::document::node::TreeNode;
//! use exprquill::document::tree::VariableTree;
//!
//! let mut tree = VariableTree::new();
//! let user = tree.add_root(TreeNode::new("user"));
//! let name = tree.add_child(user, TreeNode::new("name"));
//!
//! assert_eq!(tree.roots(), &[user]);
//! assert_eq!(tree.parent(name), Some(user));
//! assert_eq!(tree.get_node(&[0, 0]), Some(name));
//! ```

use serde::{Deserialize, Serialize};

use super::available::AvailableVariable;
use super::node::{NodeId, TreeNode, Variable, VariableType};

/// A forest of variable nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTree {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
}

/// Nested, serializable form of a variable tree node.
///
/// Missing `key` defaults to the dotted label path and missing `value`
/// defaults to the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VariableType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

/// Flat description of a single node, used for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub label: String,
    pub value: String,
    pub key: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VariableType>,
    pub has_children: bool,
}

impl VariableTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level node and returns its id.
    pub fn add_root(&mut self, node: TreeNode) -> NodeId {
        let id = self.push(node, None);
        self.roots.push(id);
        id
    }

    /// Adds `node` as the last child of `parent` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not issued by this tree.
    pub fn add_child(&mut self, parent: NodeId, node: TreeNode) -> NodeId {
        let id = self.push(node, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, mut node: TreeNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        id
    }

    /// Returns the top-level layer.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns the node for `id`, or `None` for an id from another tree.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Iterates from `id` up to its root, `id` included.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).map(|_| id), move |current| self.parent(*current))
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves a path of child positions, starting with a root position.
    ///
    /// Returns `None` when any position is out of bounds.
    pub fn get_node(&self, path: &[usize]) -> Option<NodeId> {
        let (first, rest) = path.split_first()?;
        let mut current = *self.roots.get(*first)?;
        for &index in rest {
            current = *self.children(current).get(index)?;
        }
        Some(current)
    }

    /// Finds a node by its labels from the root down, e.g. `["user", "name"]`.
    pub fn find_by_labels(&self, labels: &[&str]) -> Option<NodeId> {
        let mut layer = self.roots.as_slice();
        let mut found = None;
        for label in labels {
            let id = layer
                .iter()
                .copied()
                .find(|id| self.node(*id).label == *label)?;
            layer = self.children(id);
            found = Some(id);
        }
        found
    }

    /// Returns the labels from the root down to `id`.
    pub fn label_path(&self, id: NodeId) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .ancestors(id)
            .map(|ancestor| self.node(ancestor).label.as_str())
            .collect();
        labels.reverse();
        labels
    }

    pub fn summary(&self, id: NodeId) -> NodeSummary {
        let node = self.node(id);
        NodeSummary {
            label: node.label.clone(),
            value: node.value.clone(),
            key: node.key.clone(),
            var_type: node.var_type,
            has_children: !node.children.is_empty(),
        }
    }

    /// Builds a tree from nested node specs.
    pub fn from_specs(specs: &[NodeSpec]) -> Self {
        let mut tree = Self::new();
        for spec in specs {
            tree.insert_spec(spec, None);
        }
        tree
    }

    fn insert_spec(&mut self, spec: &NodeSpec, parent: Option<NodeId>) {
        let key = spec.key.clone().unwrap_or_else(|| match parent {
            Some(parent) => format!("{}.{}", self.node(parent).key, spec.label),
            None => spec.label.clone(),
        });
        let mut node = TreeNode::new(spec.label.as_str())
            .with_value(spec.value.clone().unwrap_or_else(|| key.clone()))
            .with_key(key);
        node.var_type = spec.var_type;

        let id = match parent {
            Some(parent) => self.add_child(parent, node),
            None => self.add_root(node),
        };
        for child in &spec.children {
            self.insert_spec(child, Some(id));
        }
    }

    /// Converts the subtrees rooted at `ids` back to nested specs.
    pub fn to_specs(&self, ids: &[NodeId]) -> Vec<NodeSpec> {
        ids.iter()
            .map(|id| {
                let node = self.node(*id);
                NodeSpec {
                    label: node.label.clone(),
                    value: Some(node.value.clone()),
                    key: Some(node.key.clone()),
                    var_type: node.var_type,
                    children: self.to_specs(&node.children),
                }
            })
            .collect()
    }

    /// Builds the tree for resolved input references.
    ///
    /// Each available variable becomes a node keyed by its dotted name path
    /// whose value is the joined key path. Nested inputs become child nodes;
    /// otherwise the resolved variable's own fields are expanded as leaves.
    pub fn from_available(available: &[AvailableVariable]) -> Self {
        let mut tree = Self::new();
        tree.insert_available(available, None);
        tree
    }

    fn insert_available(&mut self, available: &[AvailableVariable], parent: Option<NodeId>) {
        for entry in available {
            let path = match parent {
                Some(parent) => format!("{}.{}", self.node(parent).key, entry.name),
                None => entry.name.clone(),
            };
            let value = entry
                .key_path
                .as_ref()
                .map(|keys| keys.join("."))
                .filter(|joined| !joined.is_empty())
                .unwrap_or_else(|| path.clone());

            let mut node = TreeNode::new(entry.name.as_str())
                .with_value(value)
                .with_key(path);
            node.key_path = entry.key_path.clone();
            if let Some(variable) = &entry.variable {
                node = node.with_variable(variable.clone());
            }

            let id = match parent {
                Some(parent) => self.add_child(parent, node),
                None => self.add_root(node),
            };

            if !entry.children.is_empty() {
                self.insert_available(&entry.children, Some(id));
            } else if let Some(variable) = &entry.variable {
                self.insert_variable_leaves(&variable.children, id);
            }
        }
    }

    fn insert_variable_leaves(&mut self, variables: &[Variable], parent: NodeId) {
        for variable in variables {
            let path = format!("{}.{}", self.node(parent).value, variable.key);
            let node = TreeNode::new(variable.name.as_str())
                .with_value(path.as_str())
                .with_key(path)
                .with_variable(variable.clone());
            let id = self.add_child(parent, node);
            self.insert_variable_leaves(&variable.children, id);
        }
    }
}

impl<'de> Deserialize<'de> for VariableTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let specs = Vec::<NodeSpec>::deserialize(deserializer)?;
        Ok(VariableTree::from_specs(&specs))
    }
}

impl Serialize for VariableTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_specs(&self.roots).serialize(serializer)
    }
}
