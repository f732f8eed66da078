//! Variable path parsing for `{{...}}` expressions.

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{ParseContent, ParseData, ParseOffset, ParseSegments, Segment};
use super::error::ExpressionError;
use super::tokenizer::{extract_content, first_end_token, slice_reachable, token_offset};

static ARRAY_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[0-9]+\]").expect("array index pattern is valid"));

/// Splits a dotted/bracketed path into raw fragments.
///
/// The text is split on `.` first. A fragment containing a `[<digits>]`
/// group is then split once more at its last `[`, keeping the prefix even
/// when it is empty so `a.[0]` and `a[0]` stay distinguishable.
///
/// ```
/// use exprquill::expression::parser::split_text;
///
/// assert_eq!(split_text("a.b[0].c"), vec!["a", "b", "[0]", "c"]);
/// assert_eq!(split_text("a..b"), vec!["a", "", "b"]);
/// ```
pub fn split_text(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    for part in text.split('.') {
        if ARRAY_INDEX.is_match(part) {
            if let Some(bracket) = part.rfind('[') {
                let (prefix, index) = part.split_at(bracket);
                fragments.push(prefix.to_string());
                fragments.push(index.to_string());
                continue;
            }
        }
        fragments.push(part.to_string());
    }
    fragments
}

/// Returns true when every char may appear in an object key.
///
/// Keys are made of letters (CJK included), ASCII digits and underscores.
fn is_object_key(fragment: &str) -> bool {
    !fragment.is_empty()
        && fragment
            .chars()
            .all(|c| c == '_' || c.is_alphabetic() || c.is_ascii_digit())
}

fn parse_array_index(inner: &str) -> Option<usize> {
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// Classifies a path into segments.
///
/// Returns `None` as soon as any fragment is invalid; partial results are
/// never produced.
pub fn to_segments(text: &str) -> Option<Vec<Segment>> {
    let fragments = split_text(text);
    let last = fragments.len().saturating_sub(1);
    let mut segments: Vec<Segment> = Vec::with_capacity(fragments.len());

    for (index, fragment) in fragments.iter().enumerate() {
        if let Some(inner) = fragment
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let array_index = parse_array_index(inner)?;
            // An index needs a key to subscript
            if !segments.last().is_some_and(Segment::is_object_key) {
                return None;
            }
            segments.push(Segment::array_index(index, array_index));
            continue;
        }

        if index == last && fragment.is_empty() {
            segments.push(Segment::end_empty(index));
            continue;
        }

        if !is_object_key(fragment) {
            return None;
        }
        segments.push(Segment::object_key(index, fragment.as_str()));
    }

    Some(segments)
}

/// Parser for the expression under an editor cursor.
pub struct Parser;

impl Parser {
    /// Parses the expression surrounding `line_offset`, reporting why it failed.
    ///
    /// The inline segments are optional in the result: suggestions only need
    /// the text before the cursor to be a valid path.
    pub fn try_parse(line_content: &str, line_offset: usize) -> Result<ParseData, ExpressionError> {
        let line: Vec<u16> = line_content.encode_utf16().collect();
        if first_end_token(&line, line_offset).is_none() {
            return Err(ExpressionError::MissingEndToken {
                offset: line_offset,
            });
        }
        let tokens = token_offset(line_content, line_offset).ok_or(
            ExpressionError::MissingStartToken {
                offset: line_offset,
            },
        )?;

        let out_of_range = || ExpressionError::ContentOutOfRange {
            offset: line_offset,
            start: tokens.last_start,
            end: tokens.first_end,
        };
        let extracted = extract_content(line_content, line_offset, tokens).ok_or_else(out_of_range)?;
        let slice = slice_reachable(&extracted.content, extracted.offset).ok_or_else(out_of_range)?;

        let inline_segments = to_segments(&extracted.content);
        let reachable_segments =
            to_segments(&slice.reachable).ok_or_else(|| ExpressionError::InvalidPath {
                path: slice.reachable.clone(),
            })?;
        trace!(
            "parsed '{}' at {}: reachable '{}', unreachable '{}'",
            extracted.content,
            line_offset,
            slice.reachable,
            slice.unreachable
        );

        Ok(ParseData {
            content: ParseContent {
                line: line_content.to_string(),
                inline: extracted.content,
                reachable: slice.reachable,
                unreachable: slice.unreachable,
            },
            offset: ParseOffset {
                line: line_offset,
                inline: extracted.offset,
                last_start: tokens.last_start,
                first_end: tokens.first_end,
            },
            segments: ParseSegments {
                inline: inline_segments,
                reachable: reachable_segments,
            },
        })
    }

    /// Parses the expression surrounding `line_offset`.
    ///
    /// Returns `None` when the cursor is not inside a complete `{{ }}` pair
    /// or the text before the cursor is not a valid path.
    pub fn parse(line_content: &str, line_offset: usize) -> Option<ParseData> {
        match Self::try_parse(line_content, line_offset) {
            Ok(data) => Some(data),
            Err(err) => {
                debug!("no expression at offset {}: {}", line_offset, err);
                None
            }
        }
    }
}
