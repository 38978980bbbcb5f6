//! Apache configuration trees and DocumentRoot extraction.
//!
//! A parsed configuration is an untyped [`ConfigNode`] tree. Sections such as
//! `<VirtualHost *:80>` become nested mappings, repeated keys fold into
//! sequences. Extraction only cares about one thing: every value stored under
//! a `documentroot` key, at any depth.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub mod parser;

pub use parser::ApacheParser;

/// Directive whose values are the served roots of virtual hosts.
pub const DOCUMENT_ROOT_KEY: &str = "documentroot";

/// Upper bound on nodes visited in one walk.
pub const MAX_VISITED_NODES: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    Mapping(Vec<(String, ConfigNode)>),
    Sequence(Vec<ConfigNode>),
    Scalar(String),
}

impl ConfigNode {
    pub fn mapping() -> Self {
        ConfigNode::Mapping(Vec::new())
    }

    /// Insert into a mapping. A repeated key folds the values into a sequence.
    /// No-op on non-mapping nodes.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigNode) {
        let ConfigNode::Mapping(entries) = self else {
            return;
        };
        let key = key.into();

        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, ConfigNode::Sequence(items))) => items.push(value),
            Some((_, existing)) => {
                let previous = std::mem::replace(existing, ConfigNode::Sequence(Vec::new()));
                *existing = ConfigNode::Sequence(vec![previous, value]);
            }
            None => entries.push((key, value)),
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Depth-first walk over every mapping entry, driven by an explicit stack.
    ///
    /// Returns `false` if the walk was cut short by `budget`.
    pub fn walk<V: ConfigVisitor>(&self, visitor: &mut V, budget: usize) -> bool {
        let mut stack: Vec<&ConfigNode> = vec![self];
        let mut visited = 0usize;

        while let Some(node) = stack.pop() {
            visited += 1;
            if visited > budget {
                return false;
            }

            match node {
                ConfigNode::Mapping(entries) => {
                    for (key, value) in entries.iter().rev() {
                        visitor.entry(key, value);
                        stack.push(value);
                    }
                }
                ConfigNode::Sequence(items) => stack.extend(items.iter().rev()),
                ConfigNode::Scalar(_) => {}
            }
        }

        true
    }
}

impl From<Value> for ConfigNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                ConfigNode::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            Value::Array(items) => ConfigNode::Sequence(items.into_iter().map(Into::into).collect()),
            Value::String(s) => ConfigNode::Scalar(s),
            Value::Null => ConfigNode::Scalar(String::new()),
            other => ConfigNode::Scalar(other.to_string()),
        }
    }
}

/// Receives every `(key, value)` pair of every mapping in a tree.
pub trait ConfigVisitor {
    fn entry(&mut self, key: &str, value: &ConfigNode);
}

#[derive(Debug, Default)]
struct DocumentRootCollector {
    roots: BTreeSet<String>,
}

impl DocumentRootCollector {
    fn collect(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.roots.insert(value.to_string());
        }
    }
}

impl ConfigVisitor for DocumentRootCollector {
    fn entry(&mut self, key: &str, value: &ConfigNode) {
        if !key.eq_ignore_ascii_case(DOCUMENT_ROOT_KEY) {
            return;
        }
        match value {
            ConfigNode::Scalar(s) => self.collect(s),
            ConfigNode::Sequence(items) => {
                for item in items {
                    if let Some(s) = item.as_scalar() {
                        self.collect(s);
                    }
                }
            }
            ConfigNode::Mapping(_) => {}
        }
    }
}

/// Every distinct DocumentRoot value in `tree`.
pub fn extract_document_roots(tree: &ConfigNode) -> BTreeSet<String> {
    let mut collector = DocumentRootCollector::default();
    if !tree.walk(&mut collector, MAX_VISITED_NODES) {
        tracing::warn!(
            "Configuration tree exceeds {} nodes; DocumentRoot search stopped early",
            MAX_VISITED_NODES
        );
    }
    collector.roots
}

/// Loader options, mirroring what Apache itself does with a config root.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Resolve relative `Include` paths against `root_dir`.
    pub include_relative: bool,
    /// Lower-case directive and section names.
    pub case_insensitive_keys: bool,
    pub root_dir: PathBuf,
}

impl ParseOptions {
    /// Options used for a top-level configuration file: includes resolve next to it.
    pub fn for_file(path: &Path) -> Self {
        Self {
            include_relative: true,
            case_insensitive_keys: true,
            root_dir: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Turns a configuration file into a tree.
pub trait ConfigParser {
    fn parse(&self, path: &Path, options: &ParseOptions) -> Result<ConfigNode>;
}
