//! Autocompletion state for the expression under the cursor.
//!
//! Everything here is recomputed from scratch for each [`ParseData`]: which
//! label is being typed, which layer of the variable tree to offer, which
//! node the full expression already points at, and why the offer is empty.
//! [`apply_completion`] produces the edited line once a node is chosen.
//!
//! # Example
//!
//! ```
//! use exprquill::document::node::TreeNode;
//! use exprquill::document::tree::VariableTree;
//! use exprquill::expression::Parser;
//! use exprquill::suggestion::{apply_completion, Suggestion};
//!
//! let mut tree = VariableTree::new();
//! let user = tree.add_root(TreeNode::new("user"));
//! let name = tree.add_child(user, TreeNode::new("name"));
//!
//! let parse = Parser::parse("Hi {{user.}}", 10).unwrap();
//! let suggestion = Suggestion::compute(&tree, &parse);
//! assert_eq!(suggestion.variable_tree, vec![name]);
//!
//! let completion = apply_completion(&tree, &parse, name);
//! assert_eq!(completion.line, "Hi {{user.name}}");
//! ```

use log::debug;
use serde::Serialize;

use crate::document::node::NodeId;
use crate::document::tree::VariableTree;
use crate::expression::ast::{ParseData, Segment};
use crate::expression::tokenizer::{byte_index, utf16_len};
use crate::expression::tree_helper::{PruneFallback, TreeHelper};

/// Why the suggestion list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyContent {
    /// Nothing has been typed and there is nothing to offer
    NoInput,
    /// The path resolves to a variable without fields
    NoSubVariable,
}

impl std::fmt::Display for EmptyContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyContent::NoInput => write!(f, "no variables available"),
            EmptyContent::NoSubVariable => write!(f, "variable has no fields"),
        }
    }
}

/// Suggestion state for one parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Label prefix used to filter the offered layer
    pub search: String,
    /// Layer of the tree to offer
    pub variable_tree: Vec<NodeId>,
    /// Node the complete inline expression points at
    pub selected: Option<NodeId>,
    /// Nodes matched by the reachable path
    pub match_tree_branch: Option<Vec<NodeId>>,
    pub empty_content: Option<EmptyContent>,
}

impl Suggestion {
    /// Computes the suggestion state, falling back to the full tree when the
    /// typed path does not resolve.
    pub fn compute(tree: &VariableTree, parse: &ParseData) -> Self {
        Self::compute_with(tree, parse, PruneFallback::FullTree)
    }

    pub fn compute_with(tree: &VariableTree, parse: &ParseData, fallback: PruneFallback) -> Self {
        let helper = TreeHelper::new(tree);
        let variable_tree = helper.pruning_with(&parse.segments.reachable, fallback);
        let match_tree_branch = helper.match_tree_branch(&parse.segments.reachable);
        let empty_content = compute_empty_content(
            tree,
            parse,
            &variable_tree,
            match_tree_branch.as_deref(),
        );
        Self {
            search: compute_search(parse),
            selected: compute_selected(tree, parse),
            variable_tree,
            match_tree_branch,
            empty_content,
        }
    }
}

/// Returns the label being typed.
///
/// A trailing array index belongs to the key before it, so that key is used
/// instead. Anything but an object key yields an empty search.
pub fn compute_search(parse: &ParseData) -> String {
    let segments = &parse.segments.reachable;
    let last = match segments.last() {
        Some(Segment::ArrayIndex { .. }) => segments.len().checked_sub(2).and_then(|i| segments.get(i)),
        other => other,
    };
    last.and_then(Segment::key).unwrap_or_default().to_string()
}

/// Returns the tree layer offered for the reachable path.
pub fn compute_variable_tree(tree: &VariableTree, parse: &ParseData) -> Vec<NodeId> {
    TreeHelper::new(tree).pruning(&parse.segments.reachable)
}

/// Returns the node the whole inline expression resolves to.
pub fn compute_selected(tree: &VariableTree, parse: &ParseData) -> Option<NodeId> {
    let inline = parse.segments.inline.as_ref()?;
    let branch = TreeHelper::new(tree).match_tree_branch(inline)?;
    branch.last().copied()
}

/// Explains an empty suggestion list, if it is empty for a known reason.
pub fn compute_empty_content(
    tree: &VariableTree,
    parse: &ParseData,
    variable_tree: &[NodeId],
    match_tree_branch: Option<&[NodeId]>,
) -> Option<EmptyContent> {
    if tree.roots().is_empty() {
        return parse
            .content
            .reachable
            .is_empty()
            .then_some(EmptyContent::NoInput);
    }
    if !variable_tree.is_empty() {
        return None;
    }
    if parse.content.inline.is_empty() {
        return Some(EmptyContent::NoInput);
    }
    match match_tree_branch {
        Some(branch) if !branch.is_empty() => Some(EmptyContent::NoSubVariable),
        _ => None,
    }
}

/// A line after a suggestion was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub line: String,
    /// UTF-16 offset right after the inserted `}}`
    pub cursor: usize,
    /// Path written between the braces
    pub full_path: String,
}

/// Replaces the whole `{{...}}` span of `parse` with the full path of `node`.
pub fn apply_completion(tree: &VariableTree, parse: &ParseData, node: NodeId) -> Completion {
    let full_path = TreeHelper::new(tree).concat_full_path(node, &parse.segments.reachable);
    let source = &parse.content.line;
    let start = parse.offset.last_start.saturating_sub(1);
    let end = parse.offset.first_end + 2;
    let head = byte_index(source, start).unwrap_or(0);
    let tail = byte_index(source, end).unwrap_or(source.len()).max(head);

    let mut line = String::with_capacity(source.len() + full_path.len());
    line.push_str(&source[..head]);
    line.push_str("{{");
    line.push_str(&full_path);
    line.push_str("}}");
    let cursor = start + utf16_len(&full_path) + 4;
    line.push_str(&source[tail..]);
    debug!("completed '{}' at {}..{}", full_path, start, end);

    Completion {
        line,
        cursor,
        full_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::{TreeNode, VariableType};
    use crate::expression::Parser;

    fn make_test_tree() -> VariableTree {
        let mut tree = VariableTree::new();
        let foo = tree.add_root(TreeNode::new("foo").with_type(VariableType::ArrayObject));
        let bar = tree.add_child(foo, TreeNode::new("bar").with_type(VariableType::Object));
        tree.add_child(bar, TreeNode::new("baz").with_type(VariableType::String));
        tree.add_root(TreeNode::new("qux").with_type(VariableType::String));
        tree
    }

    #[test]
    fn test_compute_search() {
        let parse = Parser::parse("{{foo.ba}}", 8).unwrap();
        assert_eq!(compute_search(&parse), "ba");

        let parse = Parser::parse("{{foo[1]}}", 8).unwrap();
        assert_eq!(compute_search(&parse), "foo");

        let parse = Parser::parse("{{foo.}}", 6).unwrap();
        assert_eq!(compute_search(&parse), "");
    }

    #[test]
    fn test_compute_selected_uses_inline_segments() {
        let tree = make_test_tree();
        // Cursor after "foo", the rest of the line completes the path
        let parse = Parser::parse("{{foo[0].bar}}", 5).unwrap();
        let selected = compute_selected(&tree, &parse).unwrap();
        assert_eq!(tree.node(selected).label, "bar");
    }

    #[test]
    fn test_empty_content_no_sub_variable() {
        let tree = make_test_tree();
        // qux is a leaf: the layer below it is empty and the branch matches
        let parse = Parser::parse("{{qux.}}", 6).unwrap();
        let suggestion = Suggestion::compute(&tree, &parse);
        assert!(suggestion.variable_tree.is_empty());
        assert_eq!(suggestion.empty_content, Some(EmptyContent::NoSubVariable));
    }

    #[test]
    fn test_empty_content_none_when_tree_offered() {
        let tree = make_test_tree();
        let parse = Parser::parse("{{zzz.}}", 6).unwrap();
        let suggestion = Suggestion::compute(&tree, &parse);
        assert_eq!(suggestion.variable_tree, tree.roots().to_vec());
        assert_eq!(suggestion.match_tree_branch, None);
        assert_eq!(suggestion.empty_content, None);
    }

    #[test]
    fn test_empty_content_empty_tree() {
        let tree = VariableTree::new();
        let parse = Parser::parse("{{}}", 2).unwrap();
        let suggestion = Suggestion::compute(&tree, &parse);
        assert_eq!(suggestion.empty_content, Some(EmptyContent::NoInput));

        let parse = Parser::parse("{{a}}", 3).unwrap();
        assert_eq!(Suggestion::compute(&tree, &parse).empty_content, None);
    }

    #[test]
    fn test_apply_completion_keeps_surrounding_text() {
        let tree = make_test_tree();
        let parse = Parser::parse("a {{foo[3].}} b", 11).unwrap();
        let bar = tree.find_by_labels(&["foo", "bar"]).unwrap();
        let completion = apply_completion(&tree, &parse, bar);
        assert_eq!(completion.full_path, "foo[3].bar");
        assert_eq!(completion.line, "a {{foo[3].bar}} b");
        assert_eq!(completion.cursor, 16);
    }
}
