//! Variable schema records and variable tree nodes.
//!
//! A [`Variable`] describes one output field of a workflow node as the host
//! application registers it. [`TreeNode`] is the view of a variable inside a
//! [`VariableTree`](super::tree::VariableTree): the label users type, the
//! value the expression resolves to, and an optional type tag.
//!
//! # Example
//!
//! ```
//! use exprquill::document::node::{Variable, VariableType};
//!
//! let items = Variable::new("k1", "items", VariableType::ArrayObject)
//!     .with_children(vec![Variable::new("k2", "price", VariableType::Number)]);
//! assert!(items.var_type.is_array_type());
//! assert_eq!(items.children.len(), 1);
//! ```

use serde::{Deserialize, Serialize};

/// Variable type tags, stored with the host's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum VariableType {
    String,
    Integer,
    Boolean,
    Number,
    Object,
    ArrayString,
    ArrayInteger,
    ArrayBoolean,
    ArrayNumber,
    ArrayObject,
    /// A code this crate has no name for, kept as-is
    Other(u32),
}

impl VariableType {
    /// Returns true for the array types, which must be indexed before their
    /// fields can be referenced.
    pub fn is_array_type(&self) -> bool {
        matches!(
            self,
            VariableType::ArrayString
                | VariableType::ArrayInteger
                | VariableType::ArrayBoolean
                | VariableType::ArrayNumber
                | VariableType::ArrayObject
        )
    }
}

impl From<u32> for VariableType {
    fn from(code: u32) -> Self {
        match code {
            1 => VariableType::String,
            2 => VariableType::Integer,
            3 => VariableType::Boolean,
            4 => VariableType::Number,
            6 => VariableType::Object,
            99 => VariableType::ArrayString,
            100 => VariableType::ArrayInteger,
            101 => VariableType::ArrayBoolean,
            102 => VariableType::ArrayNumber,
            103 => VariableType::ArrayObject,
            other => VariableType::Other(other),
        }
    }
}

impl From<VariableType> for u32 {
    fn from(var_type: VariableType) -> Self {
        match var_type {
            VariableType::String => 1,
            VariableType::Integer => 2,
            VariableType::Boolean => 3,
            VariableType::Number => 4,
            VariableType::Object => 6,
            VariableType::ArrayString => 99,
            VariableType::ArrayInteger => 100,
            VariableType::ArrayBoolean => 101,
            VariableType::ArrayNumber => 102,
            VariableType::ArrayObject => 103,
            VariableType::Other(code) => code,
        }
    }
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Other(code) => write!(f, "Other({})", code),
            named => write!(f, "{:?}", named),
        }
    }
}

/// A registered variable of a workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Stable identifier used in key paths
    pub key: String,
    /// Display name users type in expressions
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_title: Option<String>,
}

impl Variable {
    pub fn new(key: impl Into<String>, name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            var_type,
            children: Vec::new(),
            node_id: None,
            node_title: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Variable>) -> Self {
        self.children = children;
        self
    }

    /// Attaches the workflow node that produces this variable.
    pub fn with_node(mut self, node_id: impl Into<String>, node_title: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self.node_title = Some(node_title.into());
        self
    }
}

/// Index of a node inside its [`VariableTree`](super::tree::VariableTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One node of a variable tree.
///
/// Links to children and parent are kept by the owning tree; the node only
/// carries its own data.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Name matched against object-key segments
    pub label: String,
    /// Resolved reference, e.g. `node_id.key.key`
    pub value: String,
    /// Unique dotted label path
    pub key: String,
    pub key_path: Option<Vec<String>>,
    pub var_type: Option<VariableType>,
    pub variable: Option<Variable>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl TreeNode {
    /// Creates a detached node whose value and key both equal `label`.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            value: label.clone(),
            key: label.clone(),
            label,
            key_path: None,
            var_type: None,
            variable: None,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_type(mut self, var_type: VariableType) -> Self {
        self.var_type = Some(var_type);
        self
    }

    /// Attaches the schema variable and takes its type tag.
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.var_type = Some(variable.var_type);
        self.variable = Some(variable);
        self
    }

    pub fn with_key_path(mut self, key_path: Vec<String>) -> Self {
        self.key_path = Some(key_path);
        self
    }

    pub fn is_array_type(&self) -> bool {
        self.var_type.is_some_and(|t| t.is_array_type())
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}
