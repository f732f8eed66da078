//! Parsing of mark templates embedded in prompt text.
//!
//! Prompt text can wrap content in paired comment tags:
//!
//! ```text
//! {#InputSlot placeholder="city" #}Hangzhou{#/InputSlot#}
//! ```
//!
//! The opening tag carries `attr="value"` pairs. A [`TemplateParser`] finds
//! these pairs for one mark, reads and rewrites their attributes, and strips
//! them from text. Parsers are shared per mark through a caller-owned
//! [`TemplateRegistry`].
//!
//! All offsets count UTF-16 code units.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::expression::tokenizer::{byte_index, utf16_len};

/// Attributes of an opening tag, in the order they appear.
pub type TemplateData = IndexMap<String, String>;

/// The marks prompt text can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateMark {
    InputSlot,
    LibraryBlock,
}

impl TemplateMark {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateMark::InputSlot => "InputSlot",
            TemplateMark::LibraryBlock => "LibraryBlock",
        }
    }

    fn patterns(&self) -> &'static MarkPatterns {
        match self {
            TemplateMark::InputSlot => &INPUT_SLOT,
            TemplateMark::LibraryBlock => &LIBRARY_BLOCK,
        }
    }
}

impl std::fmt::Display for TemplateMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateMark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InputSlot" | "input-slot" | "input_slot" => Ok(TemplateMark::InputSlot),
            "LibraryBlock" | "library-block" | "library_block" => Ok(TemplateMark::LibraryBlock),
            other => Err(format!(
                "unknown template mark '{}', expected InputSlot or LibraryBlock",
                other
            )),
        }
    }
}

#[derive(Debug)]
struct MarkPatterns {
    open: Regex,
    close: Regex,
    data: Regex,
    tags: Regex,
}

impl MarkPatterns {
    fn build(mark: &str) -> Self {
        let mark = regex::escape(mark);
        let compile = |pattern: String| Regex::new(&pattern).expect("mark pattern is valid");
        Self {
            open: compile(format!(r"^\{{#\s*{}", mark)),
            close: compile(format!(r"^\{{#\s*/{}", mark)),
            data: compile(format!(r"\{{#{}\s+([^#]+)#\}}", mark)),
            tags: compile(format!(r"\{{#{m}\s+[^#]+#\}}|\{{#/{m}#\}}", m = mark)),
        }
    }
}

static INPUT_SLOT: Lazy<MarkPatterns> = Lazy::new(|| MarkPatterns::build("InputSlot"));
static LIBRARY_BLOCK: Lazy<MarkPatterns> = Lazy::new(|| MarkPatterns::build("LibraryBlock"));
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{#.*?#\}").expect("comment pattern is valid"));
static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid"));

/// A half-open range of UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkRange {
    pub from: usize,
    pub to: usize,
}

/// A matched pair of tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkRangeInfo {
    /// Start of the opening tag
    pub from: usize,
    /// End of the closing tag
    pub to: usize,
    pub open: MarkRange,
    pub close: MarkRange,
}

/// Selecting `source` should select all of `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionEnlarger {
    pub source: MarkRange,
    pub target: MarkRange,
}

/// Everything derived from the marks in a text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkSpecs {
    pub specs: Vec<SelectionEnlarger>,
    /// Ranges between each opening and closing tag
    pub contents: Vec<MarkRange>,
    pub marks: Vec<MarkRangeInfo>,
}

/// Generated tags for a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateJson {
    pub open: String,
    pub close: String,
    pub text_content: String,
    pub template: String,
}

/// Template parser for a single mark.
#[derive(Debug)]
pub struct TemplateParser {
    mark: TemplateMark,
    patterns: &'static MarkPatterns,
}

fn unit_offset(text: &str, byte: usize) -> usize {
    utf16_len(&text[..byte])
}

/// Byte span of a range taken from [`TemplateParser::marks`].
fn byte_span(text: &str, range: MarkRange) -> (usize, usize) {
    let from = byte_index(text, range.from).unwrap_or(text.len());
    let to = byte_index(text, range.to).unwrap_or(text.len()).max(from);
    (from, to)
}

fn slice_units(text: &str, range: MarkRange) -> String {
    let (from, to) = byte_span(text, range);
    text[from..to].to_string()
}

fn replace_units(text: &str, range: MarkRange, insert: &str) -> String {
    let (from, to) = byte_span(text, range);
    let mut result = String::with_capacity(text.len() + insert.len());
    result.push_str(&text[..from]);
    result.push_str(insert);
    result.push_str(&text[to..]);
    result
}

impl TemplateParser {
    pub fn new(mark: TemplateMark) -> Self {
        Self {
            mark,
            patterns: mark.patterns(),
        }
    }

    pub fn mark(&self) -> TemplateMark {
        self.mark
    }

    /// Returns true when `tag` is an opening tag of this mark.
    pub fn is_open_tag(&self, tag: &str) -> bool {
        self.patterns.open.is_match(tag)
    }

    /// Returns true when `tag` is a closing tag of this mark.
    pub fn is_close_tag(&self, tag: &str) -> bool {
        self.patterns.close.is_match(tag)
    }

    /// Reads the attributes of the first opening tag with attributes.
    pub fn data(&self, text: &str) -> Option<TemplateData> {
        let captures = self.patterns.data.captures(text)?;
        let attributes = captures.get(1)?.as_str().trim();
        Some(
            ATTRIBUTE
                .captures_iter(attributes)
                .map(|attr| (attr[1].to_string(), attr[2].to_string()))
                .collect(),
        )
    }

    /// Pairs every opening tag with the first closing tag after it.
    ///
    /// Opening tags without a closing tag are skipped.
    pub fn marks(&self, text: &str) -> Vec<MarkRangeInfo> {
        let tags: Vec<(MarkRange, &str)> = COMMENT
            .find_iter(text)
            .map(|m| {
                (
                    MarkRange {
                        from: unit_offset(text, m.start()),
                        to: unit_offset(text, m.end()),
                    },
                    m.as_str(),
                )
            })
            .collect();

        tags.iter()
            .enumerate()
            .filter(|(_, (_, tag))| self.is_open_tag(tag))
            .filter_map(|(position, (open, _))| {
                let (close, _) = tags[position + 1..]
                    .iter()
                    .find(|(_, tag)| self.is_close_tag(tag))?;
                Some(MarkRangeInfo {
                    from: open.from,
                    to: close.to,
                    open: *open,
                    close: *close,
                })
            })
            .collect()
    }

    /// Collects marks, their content ranges and selection enlargers.
    pub fn mark_specs(&self, text: &str) -> MarkSpecs {
        let marks = self.marks(text);
        let mut specs = Vec::with_capacity(marks.len() * 2);
        let mut contents = Vec::with_capacity(marks.len());
        for info in &marks {
            let target = MarkRange {
                from: info.from,
                to: info.to,
            };
            specs.push(SelectionEnlarger {
                source: info.open,
                target,
            });
            specs.push(SelectionEnlarger {
                source: info.close,
                target,
            });
            contents.push(MarkRange {
                from: info.open.to,
                to: info.close.from,
            });
        }
        MarkSpecs {
            specs,
            contents,
            marks,
        }
    }

    /// Ranges between each opening and closing tag.
    pub fn contents(&self, text: &str) -> Vec<MarkRange> {
        self.mark_specs(text).contents
    }

    /// Returns the mark strictly enclosing `position`.
    pub fn position_in_mark(&self, text: &str, position: usize) -> Option<MarkRangeInfo> {
        self.marks(text)
            .into_iter()
            .find(|info| info.from < position && position < info.to)
    }

    /// Returns the mark enclosing `range.to` when both ends are inside a mark.
    pub fn range_in_mark(&self, text: &str, range: MarkRange) -> Option<MarkRangeInfo> {
        self.position_in_mark(text, range.from)?;
        self.position_in_mark(text, range.to)
    }

    /// Reads the attributes of the mark around the cursor.
    pub fn cursor_template_data(&self, text: &str, cursor: usize) -> Option<TemplateData> {
        let info = self.position_in_mark(text, cursor)?;
        self.data(&slice_units(text, info.open))
    }

    /// Merges `data` into the opening tag around the cursor.
    ///
    /// Existing attributes keep their position; new ones are appended.
    /// Returns the rewritten text, or `None` when the cursor is not in a mark.
    pub fn update_template_data(
        &self,
        text: &str,
        cursor: usize,
        data: &TemplateData,
    ) -> Option<String> {
        let info = self.position_in_mark(text, cursor)?;
        let mut merged = self
            .data(&slice_units(text, info.open))
            .unwrap_or_default();
        for (key, value) in data {
            merged.insert(key.clone(), value.clone());
        }
        Some(replace_units(text, info.open, &self.open_template(&merged)))
    }

    /// Returns the content between the tags around the cursor.
    pub fn template_content(&self, text: &str, cursor: usize) -> Option<String> {
        let info = self.position_in_mark(text, cursor)?;
        Some(slice_units(
            text,
            MarkRange {
                from: info.open.to,
                to: info.close.from,
            },
        ))
    }

    /// Replaces the content between the tags around the cursor.
    pub fn update_template_content(&self, text: &str, cursor: usize, content: &str) -> Option<String> {
        let info = self.position_in_mark(text, cursor)?;
        let range = MarkRange {
            from: info.open.to,
            to: info.close.from,
        };
        Some(replace_units(text, range, content))
    }

    /// Renders an opening tag: `{#Mark k="v" k2="v2"#}`.
    pub fn open_template(&self, data: &TemplateData) -> String {
        let attributes = data
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{{#{} {}#}}", self.mark, attributes)
    }

    pub fn close_template(&self) -> String {
        format!("{{#/{}#}}", self.mark)
    }

    /// Wraps `content` in a tag pair carrying `data`.
    pub fn generate_template(&self, content: &str, data: &TemplateData) -> String {
        format!(
            "{}{}{}",
            self.open_template(data),
            content,
            self.close_template()
        )
    }

    pub fn generate_template_json(&self, content: &str, data: &TemplateData) -> TemplateJson {
        let open = self.open_template(data);
        let close = self.close_template();
        TemplateJson {
            template: format!("{}{}{}", open, content, close),
            text_content: self.extract_template_content(content),
            open,
            close,
        }
    }

    /// Removes every tag of this mark, nested ones included.
    pub fn extract_template_content(&self, template: &str) -> String {
        self.patterns.tags.replace_all(template, "").into_owned()
    }
}

/// Hands out one shared [`TemplateParser`] per mark.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    parsers: HashMap<TemplateMark, Arc<TemplateParser>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parser for `mark`, creating it on first use.
    pub fn parser(&mut self, mark: TemplateMark) -> Arc<TemplateParser> {
        self.parsers
            .entry(mark)
            .or_insert_with(|| Arc::new(TemplateParser::new(mark)))
            .clone()
    }

    /// Number of parsers created so far.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
