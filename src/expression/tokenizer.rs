//! Locating the `{{ ... }}` span around a cursor and slicing its content.
//!
//! Every offset here counts UTF-16 code units, the unit host editors report
//! cursor positions in. CJK keys take one unit per char; astral chars such
//! as emoji take two.

use serde::{Deserialize, Serialize};

const OPEN_BRACE: u16 = b'{' as u16;
const CLOSE_BRACE: u16 = b'}' as u16;

/// Positions of the expression tokens surrounding the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOffset {
    /// Offset of the second `{` of the nearest `{{` before the cursor
    pub last_start: usize,
    /// Offset of the first `}` of the nearest `}}` at or after the cursor
    pub first_end: usize,
}

/// Inline content of an expression and the cursor position within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub content: String,
    pub offset: usize,
}

/// Inline content split at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableSlice {
    pub reachable: String,
    pub unreachable: String,
}

/// Converts a UTF-16 offset into a byte index of `text`.
///
/// Returns `None` past the end or inside a surrogate pair.
pub fn byte_index(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, c) in text.char_indices() {
        if units == offset {
            return Some(byte);
        }
        if units > offset {
            return None;
        }
        units += c.len_utf16();
    }
    (units == offset).then_some(text.len())
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Finds the first `}` at or after `line_offset`.
///
/// Only that first `}` is considered: if it is not immediately followed by
/// another `}` the search fails instead of moving on.
pub fn first_end_token(line: &[u16], line_offset: usize) -> Option<usize> {
    let tail = line.get(line_offset..)?;
    let position = line_offset + tail.iter().position(|&unit| unit == CLOSE_BRACE)?;
    (line.get(position + 1) == Some(&CLOSE_BRACE)).then_some(position)
}

/// Finds the nearest `{` before `line_offset`, requiring a `{` right before it.
pub fn last_start_token(line: &[u16], line_offset: usize) -> Option<usize> {
    let head = line.get(..line_offset)?;
    let position = head.iter().rposition(|&unit| unit == OPEN_BRACE)?;
    if position == 0 || line[position - 1] != OPEN_BRACE {
        return None;
    }
    Some(position)
}

/// Finds both expression tokens around the cursor.
pub fn token_offset(line_content: &str, line_offset: usize) -> Option<TokenOffset> {
    let line: Vec<u16> = line_content.encode_utf16().collect();
    let first_end = first_end_token(&line, line_offset)?;
    let last_start = last_start_token(&line, line_offset)?;
    Some(TokenOffset {
        last_start,
        first_end,
    })
}

/// Extracts the text strictly between `{{` and `}}` and the cursor offset
/// relative to it.
pub fn extract_content(
    line_content: &str,
    line_offset: usize,
    tokens: TokenOffset,
) -> Option<ExtractedContent> {
    let TokenOffset {
        last_start,
        first_end,
    } = tokens;
    if line_offset <= last_start || line_offset > first_end {
        return None;
    }
    let from = byte_index(line_content, last_start + 1)?;
    let to = byte_index(line_content, first_end)?;
    Some(ExtractedContent {
        content: line_content.get(from..to)?.to_string(),
        offset: line_offset - last_start - 1,
    })
}

/// Splits inline content at the cursor.
///
/// Fails when the cursor is past the end or splits a surrogate pair.
pub fn slice_reachable(content: &str, offset: usize) -> Option<ReachableSlice> {
    let split = byte_index(content, offset)?;
    let (reachable, unreachable) = content.split_at(split);
    Some(ReachableSlice {
        reachable: reachable.to_string(),
        unreachable: unreachable.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_offset() {
        let result = token_offset("test input: {{Earth.Asia.China.Hangzhou}}", 39);
        assert_eq!(
            result,
            Some(TokenOffset {
                last_start: 13,
                first_end: 39,
            })
        );
    }

    #[test]
    fn test_token_offset_single_brace_fails() {
        assert_eq!(token_offset("test: {foo}}", 8), None);
        assert_eq!(token_offset("test: {{foo}", 9), None);
    }

    #[test]
    fn test_token_offset_stops_at_first_close_brace() {
        // The first '}' after the cursor is single, so no match even though '}}' follows
        assert_eq!(token_offset("{{a} b}}", 2), None);
    }

    #[test]
    fn test_token_offset_out_of_range() {
        assert_eq!(token_offset("{{foo}}", 42), None);
        assert_eq!(token_offset("", 1), None);
        assert_eq!(token_offset("{{}}", 0), None);
    }

    #[test]
    fn test_token_offset_counts_utf16_units() {
        // "主题" are two units, so the tokens sit at the same offsets as for "ab"
        assert_eq!(token_offset("{{主题}}", 4), token_offset("{{ab}}", 4));
        assert_eq!(
            token_offset("{{主题}}", 4),
            Some(TokenOffset {
                last_start: 1,
                first_end: 4,
            })
        );
    }

    #[test]
    fn test_extract_content() {
        let result = extract_content(
            "test input: {{Earth.Asia.China.Hangzhou}}",
            39,
            TokenOffset {
                last_start: 13,
                first_end: 39,
            },
        );
        assert_eq!(
            result,
            Some(ExtractedContent {
                content: "Earth.Asia.China.Hangzhou".to_string(),
                offset: 25,
            })
        );
    }

    #[test]
    fn test_extract_content_rejects_cursor_outside() {
        let tokens = TokenOffset {
            last_start: 1,
            first_end: 5,
        };
        assert_eq!(extract_content("{{abc}}", 1, tokens), None);
        assert_eq!(extract_content("{{abc}}", 6, tokens), None);
    }

    #[test]
    fn test_slice_reachable() {
        let result = slice_reachable("China.Hangzhou", 6);
        assert_eq!(
            result,
            Some(ReachableSlice {
                reachable: "China.".to_string(),
                unreachable: "Hangzhou".to_string(),
            })
        );
    }

    #[test]
    fn test_slice_reachable_edges() {
        let start = slice_reachable("foo", 0).unwrap();
        assert_eq!(start.reachable, "");
        assert_eq!(start.unreachable, "foo");

        let end = slice_reachable("foo", 3).unwrap();
        assert_eq!(end.reachable, "foo");
        assert_eq!(end.unreachable, "");

        assert_eq!(slice_reachable("foo", 4), None);
    }

    #[test]
    fn test_slice_reachable_multibyte() {
        let result = slice_reachable("主题.名称", 3).unwrap();
        assert_eq!(result.reachable, "主题.");
        assert_eq!(result.unreachable, "名称");
    }

    #[test]
    fn test_token_offset_astral_char_takes_two_units() {
        // The emoji is one char but two UTF-16 units
        assert_eq!(
            token_offset("😊 {{foo}}", 8),
            Some(TokenOffset {
                last_start: 4,
                first_end: 8,
            })
        );
    }

    #[test]
    fn test_byte_index() {
        assert_eq!(byte_index("a😊b", 0), Some(0));
        assert_eq!(byte_index("a😊b", 1), Some(1));
        assert_eq!(byte_index("a😊b", 2), None);
        assert_eq!(byte_index("a😊b", 3), Some(5));
        assert_eq!(byte_index("a😊b", 4), Some(6));
        assert_eq!(byte_index("a😊b", 5), None);
        assert_eq!(utf16_len("a😊b"), 4);
    }

    #[test]
    fn test_slice_reachable_inside_surrogate_pair_fails() {
        assert_eq!(slice_reachable("😊", 1), None);
        let slice = slice_reachable("😊x", 2).unwrap();
        assert_eq!(slice.reachable, "😊");
        assert_eq!(slice.unreachable, "x");
    }
}
