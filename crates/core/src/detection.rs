//! Typed detection tree.
//!
//! Rule documents arrive as loosely typed YAML. The `detection` block is
//! converted into a [`DetectionNode`] tree so every consumer handles the
//! three shapes (scalar, sequence, mapping) exhaustively instead of probing
//! dynamic values.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A node of a rule's detection tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetectionNode {
    Scalar(ScalarValue),
    Sequence(Vec<DetectionNode>),
    /// Keys keep their YAML document order.
    Mapping(IndexMap<String, DetectionNode>),
}

/// Leaf values. Source rules mix strings, numbers and booleans freely, so
/// type info is kept until extraction renders them to text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl ScalarValue {
    /// Render the scalar as matcher text. `Null` carries no value and
    /// renders to `None`.
    pub fn render(&self) -> Option<String> {
        match self {
            ScalarValue::Text(s) => Some(s.clone()),
            ScalarValue::Integer(i) => Some(i.to_string()),
            ScalarValue::Float(f) => Some(render_float(*f)),
            ScalarValue::Boolean(true) => Some("True".to_string()),
            ScalarValue::Boolean(false) => Some("False".to_string()),
            ScalarValue::Null => None,
        }
    }
}

/// Shortest round-trip text: positional for decimal exponents in
/// `-4..16` (whole values keep a `.0`), otherwise `1e+16` / `1e-05` style.
fn render_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    let sci = format!("{:e}", f);
    let Some((mantissa, exp)) = sci
        .split_once('e')
        .and_then(|(m, e)| e.parse::<i32>().ok().map(|e| (m, e)))
    else {
        return f.to_string();
    };

    if (-4..16).contains(&exp) {
        if f.fract() == 0.0 {
            format!("{:.1}", f)
        } else {
            f.to_string()
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}

impl DetectionNode {
    /// An empty mapping, used when a rule has no detection block.
    pub fn empty() -> Self {
        DetectionNode::Mapping(IndexMap::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DetectionNode::Scalar(ScalarValue::Null) => true,
            DetectionNode::Scalar(_) => false,
            DetectionNode::Sequence(items) => items.is_empty(),
            DetectionNode::Mapping(map) => map.is_empty(),
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, DetectionNode>> {
        match self {
            DetectionNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Parse a detection tree from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<serde_yaml::Value>(yaml).map(Self::from)
    }
}

/// Stringify a YAML mapping key. Complex keys (sequences, mappings) have no
/// field meaning and are dropped.
fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        other => match DetectionNode::from(other) {
            DetectionNode::Scalar(scalar) => scalar.render().or_else(|| Some("None".to_string())),
            _ => None,
        },
    }
}

impl From<serde_yaml::Value> for DetectionNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => DetectionNode::Scalar(ScalarValue::Null),
            Value::Bool(b) => DetectionNode::Scalar(ScalarValue::Boolean(b)),
            Value::Number(n) => DetectionNode::Scalar(if let Some(i) = n.as_i64() {
                ScalarValue::Integer(i)
            } else if let Some(u) = n.as_u64() {
                ScalarValue::Text(u.to_string())
            } else {
                ScalarValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }),
            Value::String(s) => DetectionNode::Scalar(ScalarValue::Text(s)),
            Value::Sequence(items) => {
                DetectionNode::Sequence(items.into_iter().map(DetectionNode::from).collect())
            }
            Value::Mapping(map) => DetectionNode::Mapping(
                map.into_iter()
                    .filter_map(|(k, v)| yaml_key(k).map(|k| (k, DetectionNode::from(v))))
                    .collect(),
            ),
            Value::Tagged(tagged) => DetectionNode::from(tagged.value),
        }
    }
}

impl<'de> Deserialize<'de> for DetectionNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_yaml::Value::deserialize(deserializer).map(DetectionNode::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_mapping_keeps_key_order() {
        let node = DetectionNode::from_yaml_str(
            "selection:\n  Image|endswith: cmd.exe\n  CommandLine: whoami\ncondition: selection\n",
        )
        .unwrap();
        let map = node.as_mapping().unwrap();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["selection", "condition"]);

        let selection = map["selection"].as_mapping().unwrap();
        let keys: Vec<&str> = selection.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Image|endswith", "CommandLine"]);
    }

    #[test]
    fn numeric_and_bool_keys_are_stringified() {
        let node = DetectionNode::from_yaml_str("4688: a\ntrue: b\n").unwrap();
        let map = node.as_mapping().unwrap();
        assert!(map.contains_key("4688"));
        assert!(map.contains_key("True"));
    }

    #[test]
    fn scalars_render_like_matcher_text() {
        assert_eq!(ScalarValue::Integer(4688).render().as_deref(), Some("4688"));
        assert_eq!(ScalarValue::Float(1.0).render().as_deref(), Some("1.0"));
        assert_eq!(ScalarValue::Float(0.25).render().as_deref(), Some("0.25"));
        assert_eq!(ScalarValue::Float(0.0001).render().as_deref(), Some("0.0001"));
        assert_eq!(ScalarValue::Float(1e15).render().as_deref(), Some("1000000000000000.0"));
        assert_eq!(ScalarValue::Float(-2.5).render().as_deref(), Some("-2.5"));
        assert_eq!(ScalarValue::Boolean(true).render().as_deref(), Some("True"));
        assert_eq!(ScalarValue::Null.render(), None);
    }

    #[test]
    fn large_and_tiny_floats_use_exponent_form() {
        assert_eq!(ScalarValue::Float(1e16).render().as_deref(), Some("1e+16"));
        assert_eq!(ScalarValue::Float(1e-5).render().as_deref(), Some("1e-05"));
        assert_eq!(ScalarValue::Float(1.5e-7).render().as_deref(), Some("1.5e-07"));
        assert_eq!(ScalarValue::Float(-2.5e100).render().as_deref(), Some("-2.5e+100"));
        assert_eq!(ScalarValue::Float(f64::INFINITY).render().as_deref(), Some("inf"));
    }

    #[test]
    fn deserializes_through_serde() {
        let node: DetectionNode = serde_yaml::from_str("a: [x, 1]\n").unwrap();
        assert!(!node.is_empty());
        assert!(DetectionNode::empty().is_empty());
    }
}
