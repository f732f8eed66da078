//! Variable schema model: registered variables, input references and the
//! variable tree that expressions are matched against.

pub mod available;
pub mod node;
pub mod tree;

pub use available::{find_available_variables, AvailableVariable, InputRef};
pub use node::{NodeId, TreeNode, Variable, VariableType};
pub use tree::{NodeSpec, NodeSummary, VariableTree};
