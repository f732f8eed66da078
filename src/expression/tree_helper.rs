use log::debug;
use serde::{Deserialize, Serialize};

use super::ast::Segment;
use crate::document::node::NodeId;
use crate::document::tree::VariableTree;

/// What [`TreeHelper::pruning_with`] returns when a key matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PruneFallback {
    /// Show the whole tree again
    #[default]
    FullTree,
    /// Show nothing
    Empty,
}

/// Matches parsed segments against a variable tree.
pub struct TreeHelper<'a> {
    tree: &'a VariableTree,
}

#[derive(Debug)]
struct PathItem<'a> {
    object_key: &'a str,
    array_index: Option<usize>,
}

impl<'a> TreeHelper<'a> {
    pub fn new(tree: &'a VariableTree) -> Self {
        TreeHelper { tree }
    }

    /// Narrows the tree to the layer the user is currently choosing from.
    ///
    /// The last segment is the one being typed and is dropped first; a
    /// trailing array index is dropped together with its key. Each remaining
    /// key then selects the children of every node carrying that label.
    /// When a key matches no node the full tree is returned.
    pub fn pruning(&self, segments: &[Segment]) -> Vec<NodeId> {
        self.pruning_with(segments, PruneFallback::FullTree)
    }

    /// Same as [`pruning`](Self::pruning) with an explicit no-match policy.
    pub fn pruning_with(&self, segments: &[Segment], fallback: PruneFallback) -> Vec<NodeId> {
        let roots = self.tree.roots();
        let Some(last) = segments.last() else {
            return roots.to_vec();
        };
        let keep = if last.is_array_index() {
            segments.len().saturating_sub(2)
        } else {
            segments.len() - 1
        };

        let mut layer: Vec<NodeId> = roots.to_vec();
        for segment in &segments[..keep] {
            let Some(key) = segment.key() else {
                continue;
            };
            let matched: Vec<NodeId> = layer
                .iter()
                .copied()
                .filter(|id| self.tree.node(*id).label == key)
                .collect();
            if matched.is_empty() {
                debug!("pruning: '{}' matches nothing, fallback {:?}", key, fallback);
                return match fallback {
                    PruneFallback::FullTree => roots.to_vec(),
                    PruneFallback::Empty => Vec::new(),
                };
            }
            layer = matched
                .iter()
                .flat_map(|id| self.tree.children(*id).iter().copied())
                .collect();
        }
        layer
    }

    /// Validates a whole path against the tree.
    ///
    /// Returns the nodes matched by each object key, in order, or `None` when:
    /// - an array index does not directly follow an array-typed node
    /// - an array-typed node is followed by anything but an array index
    /// - an object key has no node with that label in the current layer
    pub fn match_tree_branch(&self, segments: &[Segment]) -> Option<Vec<NodeId>> {
        let mut layer: &[NodeId] = self.tree.roots();
        let mut branch = Vec::new();
        // Node matched by the segment right before the current one
        let mut previous: Option<NodeId> = None;

        for segment in segments {
            let previous_is_array = previous.is_some_and(|id| self.tree.node(id).is_array_type());
            // Indices subscript array nodes, and array nodes take nothing else
            if segment.is_array_index() != previous_is_array {
                return None;
            }
            match segment {
                Segment::ObjectKey { object_key, .. } => {
                    let id = layer
                        .iter()
                        .copied()
                        .find(|id| self.tree.node(*id).label == *object_key)?;
                    layer = self.tree.children(id);
                    branch.push(id);
                    previous = Some(id);
                }
                _ => previous = None,
            }
        }

        let key_count = segments.iter().filter(|s| s.is_object_key()).count();
        (branch.len() == key_count).then_some(branch)
    }

    /// Renders the text that selecting `node` inserts between `{{` and `}}`.
    ///
    /// Every array-typed node on the way down gets an index: the one typed
    /// in `segments` when its key lines up positionally, 0 otherwise. The
    /// selected node itself never gets a subscript.
    pub fn concat_full_path(&self, node: NodeId, segments: &[Segment]) -> String {
        let mut items: Vec<PathItem> = self
            .tree
            .ancestors(node)
            .map(|id| {
                let tree_node = self.tree.node(id);
                PathItem {
                    object_key: &tree_node.label,
                    array_index: tree_node.is_array_type().then_some(0),
                }
            })
            .collect();
        items.reverse();

        let mut position = 0;
        for (index, segment) in segments.iter().enumerate() {
            let Some(key) = segment.key() else {
                continue;
            };
            let Some(item) = items.get_mut(position) else {
                break;
            };
            position += 1;
            if item.object_key != key {
                break;
            }
            if let (Some(_), Some(Segment::ArrayIndex { array_index, .. })) =
                (item.array_index, segments.get(index + 1))
            {
                item.array_index = Some(*array_index);
            }
        }

        let last = items.len().saturating_sub(1);
        items
            .iter()
            .enumerate()
            .map(|(index, item)| match item.array_index {
                Some(array_index) if index != last => {
                    format!("{}[{}]", item.object_key, array_index)
                }
                _ => item.object_key.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::{TreeNode, VariableType};

    fn make_test_tree() -> VariableTree {
        let mut tree = VariableTree::new();
        let foo = tree.add_root(TreeNode::new("foo").with_type(VariableType::ArrayObject));
        let bar = tree.add_child(foo, TreeNode::new("bar").with_type(VariableType::Object));
        tree.add_child(bar, TreeNode::new("baz").with_type(VariableType::String));
        tree
    }

    fn keys(labels: &[&str]) -> Vec<Segment> {
        labels
            .iter()
            .enumerate()
            .map(|(index, label)| Segment::object_key(index, *label))
            .collect()
    }

    #[test]
    fn test_pruning_without_segments_keeps_tree() {
        let tree = make_test_tree();
        let helper = TreeHelper::new(&tree);
        assert_eq!(helper.pruning(&[]), tree.roots().to_vec());
    }

    #[test]
    fn test_pruning_empty_fallback() {
        let tree = make_test_tree();
        let helper = TreeHelper::new(&tree);
        let segments = vec![Segment::object_key(0, "nope"), Segment::end_empty(1)];
        assert_eq!(helper.pruning(&segments), tree.roots().to_vec());
        assert!(helper
            .pruning_with(&segments, PruneFallback::Empty)
            .is_empty());
    }

    #[test]
    fn test_pruning_leaf_has_no_children() {
        let tree = make_test_tree();
        let helper = TreeHelper::new(&tree);
        let mut segments = keys(&["foo", "bar", "baz"]);
        segments.push(Segment::end_empty(3));
        assert!(helper.pruning(&segments).is_empty());
    }

    #[test]
    fn test_pruning_unions_same_labels() {
        let mut tree = VariableTree::new();
        let a = tree.add_root(TreeNode::new("dup"));
        tree.add_child(a, TreeNode::new("x"));
        let b = tree.add_root(TreeNode::new("dup"));
        tree.add_child(b, TreeNode::new("y"));
        let helper = TreeHelper::new(&tree);

        let layer = helper.pruning(&[Segment::object_key(0, "dup"), Segment::end_empty(1)]);
        let labels: Vec<&str> = layer.iter().map(|id| tree.node(*id).label.as_str()).collect();
        assert_eq!(labels, vec!["x", "y"]);
    }

    #[test]
    fn test_match_tree_branch_simple() {
        let mut tree = VariableTree::new();
        let user = tree.add_root(TreeNode::new("user"));
        let name = tree.add_child(user, TreeNode::new("name"));
        let helper = TreeHelper::new(&tree);
        assert_eq!(
            helper.match_tree_branch(&keys(&["user", "name"])),
            Some(vec![user, name])
        );
        assert_eq!(helper.match_tree_branch(&keys(&["user", "age"])), None);
    }

    #[test]
    fn test_match_tree_branch_empty_segments() {
        let tree = make_test_tree();
        assert_eq!(TreeHelper::new(&tree).match_tree_branch(&[]), Some(vec![]));
    }

    #[test]
    fn test_match_tree_branch_trailing_separator_after_array() {
        let tree = make_test_tree();
        let segments = vec![Segment::object_key(0, "foo"), Segment::end_empty(1)];
        assert_eq!(TreeHelper::new(&tree).match_tree_branch(&segments), None);
    }

    #[test]
    fn test_match_tree_branch_index_first_is_rejected() {
        let tree = make_test_tree();
        let segments = vec![Segment::array_index(0, 1)];
        assert_eq!(TreeHelper::new(&tree).match_tree_branch(&segments), None);
    }

    #[test]
    fn test_concat_full_path_defaults_index_to_zero() {
        let tree = make_test_tree();
        let baz = tree.find_by_labels(&["foo", "bar", "baz"]).unwrap();
        let helper = TreeHelper::new(&tree);
        assert_eq!(helper.concat_full_path(baz, &[]), "foo[0].bar.baz");
    }

    #[test]
    fn test_concat_full_path_last_item_has_no_index() {
        let tree = make_test_tree();
        let foo = tree.roots()[0];
        let helper = TreeHelper::new(&tree);
        let segments = vec![Segment::object_key(0, "foo"), Segment::array_index(1, 4)];
        assert_eq!(helper.concat_full_path(foo, &segments), "foo");
    }

    #[test]
    fn test_concat_full_path_stops_at_mismatch() {
        let tree = make_test_tree();
        let baz = tree.find_by_labels(&["foo", "bar", "baz"]).unwrap();
        let helper = TreeHelper::new(&tree);
        let segments = vec![
            Segment::object_key(0, "other"),
            Segment::object_key(1, "foo"),
            Segment::array_index(2, 7),
        ];
        assert_eq!(helper.concat_full_path(baz, &segments), "foo[0].bar.baz");
    }
}
