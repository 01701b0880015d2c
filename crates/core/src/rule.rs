//! Rule documents: a parsed query rule and a corpus record as enumerated
//! from a rule store.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionNode;
use crate::error::{CoreError, Result};

/// A Sigma-style detection rule.
///
/// Only `detection` is consumed by similarity scoring. The descriptive keys
/// are kept for display, everything else lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionNode>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl SigmaRule {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if !value.is_mapping() {
            return Err(CoreError::InvalidRule(
                "rule document must be a YAML mapping".to_string(),
            ));
        }
        Ok(serde_yaml::from_value(value)?)
    }

    /// Read and parse a rule file. A missing file is reported as
    /// [`CoreError::RuleNotFound`] rather than a bare IO error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CoreError::RuleNotFound(path.to_path_buf()),
            _ => CoreError::Io(e),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The detection tree, or an empty mapping when the rule has none.
    pub fn detection_or_empty(&self) -> DetectionNode {
        match &self.detection {
            Some(node) => node.clone(),
            None => DetectionNode::empty(),
        }
    }
}

/// One record of a rule corpus.
///
/// The raw document is kept untouched so malformed records surface only
/// when the ranker asks for their detection tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Where the record came from (file path or URL).
    #[serde(default)]
    pub source: Option<String>,
    pub document: serde_yaml::Value,
}

impl StoredRule {
    /// Build a record from a raw document, taking the title from the
    /// document when it has one.
    pub fn new(id: impl Into<String>, document: serde_yaml::Value) -> Self {
        let title = document
            .get("title")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string());
        Self {
            id: id.into(),
            title,
            source: None,
            document,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Parse YAML text into a record.
    pub fn from_yaml_str(id: impl Into<String>, yaml: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        Ok(Self::new(id, document))
    }

    /// The record's detection tree.
    ///
    /// A document that is not a mapping is malformed. A missing or null
    /// `detection` key yields an empty tree, which scores zero.
    pub fn detection(&self) -> Result<DetectionNode> {
        let map = self.document.as_mapping().ok_or_else(|| {
            CoreError::InvalidRule(format!("rule '{}' is not a mapping document", self.id))
        })?;
        match map.get("detection") {
            None | Some(serde_yaml::Value::Null) => Ok(DetectionNode::empty()),
            Some(value) => Ok(DetectionNode::from(value.clone())),
        }
    }
}
