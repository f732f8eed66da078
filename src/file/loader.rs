//! Variable schema loading.
//!
//! A schema file describes the variable tree expressions are completed
//! against. Three shapes are accepted, in JSON or YAML:
//!
//! - a registry: `{ variables: [...], inputs: [...] }`, resolved through
//!   [`find_available_variables`]
//! - a wrapped tree: `{ tree: [NodeSpec, ...] }`
//! - a bare list of [`NodeSpec`]s
//!
//! Files ending in `.gz` are decompressed first.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::document::available::{find_available_variables, InputRef};
use crate::document::node::Variable;
use crate::document::tree::{NodeSpec, VariableTree};

/// A parsed schema document, before it becomes a tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaDocument {
    Registry {
        variables: Vec<Variable>,
        inputs: Vec<InputRef>,
    },
    Tree {
        tree: Vec<NodeSpec>,
    },
    Nodes(Vec<NodeSpec>),
}

impl SchemaDocument {
    pub fn into_tree(self) -> VariableTree {
        match self {
            SchemaDocument::Registry { variables, inputs } => {
                let available = find_available_variables(&variables, &inputs);
                VariableTree::from_available(&available)
            }
            SchemaDocument::Tree { tree } | SchemaDocument::Nodes(tree) => {
                VariableTree::from_specs(&tree)
            }
        }
    }
}

/// Loads a schema file from disk.
///
/// `.yaml` and `.yml` files (optionally followed by `.gz`) are parsed as
/// YAML, everything else as JSON.
///
/// # Examples
///
/// ```no_run
/// use exprquill::file::loader::load_schema_file;
///
/// let tree = load_schema_file("schema.json").unwrap();
/// println!("{} variables", tree.len());
/// ```
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid gzip when it
/// ends in `.gz`, or does not contain a schema.
pub fn load_schema_file<P: AsRef<Path>>(path: P) -> Result<VariableTree> {
    let path_ref = path.as_ref();

    let is_gzipped = path_ref
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let content = if is_gzipped {
        read_gzipped_file(path_ref)?
    } else {
        fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read schema file {}", path_ref.display()))?
    };

    let document = if determine_yaml_format(path_ref) {
        serde_yaml::from_str(&content).context("Failed to parse YAML schema")?
    } else {
        serde_json::from_str(&content).context("Failed to parse JSON schema")?
    };
    let tree = SchemaDocument::into_tree(document);
    debug!("loaded {} nodes from {}", tree.len(), path_ref.display());
    Ok(tree)
}

/// Parses schema text, trying JSON before YAML.
pub fn parse_schema_content(content: &str) -> Result<VariableTree> {
    if let Ok(document) = serde_json::from_str::<SchemaDocument>(content) {
        return Ok(document.into_tree());
    }
    let document: SchemaDocument = serde_yaml::from_str(content)
        .context("Failed to parse schema: input is neither a valid JSON nor YAML schema")?;
    Ok(document.into_tree())
}

/// Loads a schema from standard input.
///
/// Gzip input is detected by its magic bytes.
pub fn load_schema_from_stdin() -> Result<VariableTree> {
    use std::io::{self, Read};

    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read from stdin")?;

    // gzip magic bytes
    let content = if buffer.starts_with(&[0x1f, 0x8b]) {
        decompress_gzip_bytes(&buffer)?
    } else {
        String::from_utf8(buffer).context("Invalid UTF-8 in stdin")?
    };

    parse_schema_content(&content)
}

/// Checks for a `.yaml`/`.yml` extension, ignoring a trailing `.gz`.
fn determine_yaml_format<P: AsRef<Path>>(path: P) -> bool {
    let path_str = path.as_ref().to_string_lossy();
    let base = path_str.strip_suffix(".gz").unwrap_or(&path_str);
    base.ends_with(".yaml") || base.ends_with(".yml")
}

fn read_gzipped_file<P: AsRef<Path>>(path: P) -> Result<String> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let file = fs::File::open(path).context("Failed to open gzipped file")?;
    let mut decoder = GzDecoder::new(file);
    let mut content = String::new();
    decoder
        .read_to_string(&mut content)
        .context("Failed to decompress gzipped file - file may be corrupted")?;
    Ok(content)
}

fn decompress_gzip_bytes(bytes: &[u8]) -> Result<String> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(bytes);
    let mut content = String::new();
    decoder
        .read_to_string(&mut content)
        .context("Failed to decompress gzipped stdin")?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_yaml_format() {
        assert!(determine_yaml_format("schema.yaml"));
        assert!(determine_yaml_format("schema.yml"));
        assert!(determine_yaml_format("path/to/schema.yaml.gz"));
        assert!(!determine_yaml_format("schema.json"));
        assert!(!determine_yaml_format("schema.json.gz"));
    }

    #[test]
    fn test_parse_bare_node_list() {
        let tree = parse_schema_content(r#"[{"label": "user", "children": [{"label": "name"}]}]"#)
            .unwrap();
        assert_eq!(tree.len(), 2);
        let name = tree.find_by_labels(&["user", "name"]).unwrap();
        assert_eq!(tree.node(name).key, "user.name");
    }

    #[test]
    fn test_parse_wrapped_tree_yaml() {
        let content = "tree:\n  - label: order\n    type: 103\n    children:\n      - label: id\n";
        let tree = parse_schema_content(content).unwrap();
        let order = tree.roots()[0];
        assert!(tree.node(order).is_array_type());
    }

    #[test]
    fn test_parse_registry() {
        let content = r#"{
            "variables": [{"key": "q", "name": "query", "type": 1, "nodeId": "start"}],
            "inputs": [{"name": "question", "keyPath": ["start", "q"]}]
        }"#;
        let tree = parse_schema_content(content).unwrap();
        let root = tree.node(tree.roots()[0]);
        assert_eq!(root.label, "question");
        assert_eq!(root.value, "q");
    }

    #[test]
    fn test_parse_invalid_schema() {
        let result = parse_schema_content("{\"unexpected\": true}");
        assert!(result.is_err());
    }

    #[test]
    fn test_read_gzipped_file_corrupted() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let gz_path = temp_file.path().with_extension("json.gz");
        fs::write(&gz_path, b"not gzip data").unwrap();

        let err_msg = read_gzipped_file(&gz_path).unwrap_err().to_string();
        assert!(err_msg.contains("decompress") || err_msg.contains("corrupted"));
        let _ = fs::remove_file(gz_path);
    }
}
