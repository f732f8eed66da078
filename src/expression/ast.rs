//! Data types produced by the expression parser.

use serde::{Deserialize, Serialize};

/// A classified component of a `{{...}}` variable path.
///
/// `index` is the position of the raw fragment the segment was built from,
/// so indices are not necessarily contiguous with segment positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Segment {
    /// Named field access (`foo` in `foo.bar`)
    ObjectKey {
        index: usize,
        #[serde(rename = "objectKey")]
        object_key: String,
    },
    /// Array subscript (`[0]` in `foo[0]`), always preceded by an `ObjectKey`
    ArrayIndex {
        index: usize,
        #[serde(rename = "arrayIndex")]
        array_index: usize,
    },
    /// Trailing empty component left by a separator the user just typed
    EndEmpty { index: usize },
}

impl Segment {
    /// Creates an `ObjectKey` segment.
    pub fn object_key(index: usize, key: impl Into<String>) -> Self {
        Segment::ObjectKey {
            index,
            object_key: key.into(),
        }
    }

    /// Creates an `ArrayIndex` segment.
    pub fn array_index(index: usize, array_index: usize) -> Self {
        Segment::ArrayIndex { index, array_index }
    }

    /// Creates an `EndEmpty` segment.
    pub fn end_empty(index: usize) -> Self {
        Segment::EndEmpty { index }
    }

    /// Returns the fragment position this segment was classified from.
    pub fn index(&self) -> usize {
        match self {
            Segment::ObjectKey { index, .. }
            | Segment::ArrayIndex { index, .. }
            | Segment::EndEmpty { index } => *index,
        }
    }

    /// Returns the key when this is an `ObjectKey` segment.
    pub fn key(&self) -> Option<&str> {
        match self {
            Segment::ObjectKey { object_key, .. } => Some(object_key),
            _ => None,
        }
    }

    pub fn is_object_key(&self) -> bool {
        matches!(self, Segment::ObjectKey { .. })
    }

    pub fn is_array_index(&self) -> bool {
        matches!(self, Segment::ArrayIndex { .. })
    }
}

/// Text pieces of a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseContent {
    /// The full editor line
    pub line: String,
    /// Everything between `{{` and `}}`
    pub inline: String,
    /// Inline content before the cursor
    pub reachable: String,
    /// Inline content after the cursor
    pub unreachable: String,
}

/// Offsets of a parsed expression, counted in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOffset {
    /// Cursor offset within the line
    pub line: usize,
    /// Cursor offset within the inline content
    pub inline: usize,
    /// Offset of the second `{` of the opening `{{`
    pub last_start: usize,
    /// Offset of the first `}` of the closing `}}`
    pub first_end: usize,
}

/// Segment lists of a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSegments {
    /// Segments of the whole inline content; `None` when it is not a valid path
    pub inline: Option<Vec<Segment>>,
    /// Segments of the reachable prefix
    pub reachable: Vec<Segment>,
}

/// Result of parsing the expression under the cursor.
///
/// Built fresh for every cursor position and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseData {
    pub content: ParseContent,
    pub offset: ParseOffset,
    pub segments: ParseSegments,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_accessors() {
        let key = Segment::object_key(0, "foo");
        assert_eq!(key.index(), 0);
        assert_eq!(key.key(), Some("foo"));
        assert!(key.is_object_key());

        let idx = Segment::array_index(1, 3);
        assert_eq!(idx.index(), 1);
        assert_eq!(idx.key(), None);
        assert!(idx.is_array_index());

        assert_eq!(Segment::end_empty(2).index(), 2);
    }

    #[test]
    fn test_segment_serializes_with_type_tag() {
        let json = serde_json::to_value(Segment::object_key(0, "China")).unwrap();
        assert_eq!(json["type"], "ObjectKey");
        assert_eq!(json["objectKey"], "China");

        let json = serde_json::to_value(Segment::array_index(1, 0)).unwrap();
        assert_eq!(json["type"], "ArrayIndex");
        assert_eq!(json["arrayIndex"], 0);
    }
}
