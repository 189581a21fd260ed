//! Custom per-object attributes and the schema that describes them.

use serde::{Deserialize, Serialize};

/// Ordered key/value attributes attached to a shape.
///
/// Order follows the persisted document so that round trips keep the file stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite a value. Returns true if the stored value changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) if *existing == value => false,
            Some((_, existing)) => {
                *existing = value;
                true
            }
            None => {
                self.entries.push((key, value));
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.set(k, v);
        }
        attributes
    }
}

/// Input widget kind for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    Text,
    Number,
    Select,
    Textarea,
}

/// One configured attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: AttributeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            options: Vec::new(),
            min: None,
            max: None,
            step: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Value shown when nothing usable is persisted.
    pub fn default_value(&self) -> String {
        match (&self.default, self.kind) {
            (Some(default), _) => default.clone(),
            (None, AttributeKind::Number) => "0".to_string(),
            (None, _) => String::new(),
        }
    }
}

/// An attribute value resolved for display in the attribute panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    pub name: String,
    pub kind: AttributeKind,
    pub value: String,
    /// True when the value came from the schema default rather than the document
    pub from_default: bool,
}

/// Ordered attribute schema, consumed as configuration data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSchema {
    defs: Vec<AttributeDef>,
}

impl AttributeSchema {
    pub fn new(defs: Vec<AttributeDef>) -> Self {
        Self { defs }
    }

    pub fn defs(&self) -> &[AttributeDef] {
        &self.defs
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Merge schema defaults with persisted values.
    ///
    /// Missing keys and blank persisted values both resolve to the configured default.
    pub fn resolve(&self, persisted: &Attributes) -> Vec<ResolvedAttribute> {
        self.defs
            .iter()
            .map(|def| match persisted.get(&def.name) {
                Some(value) if !value.trim().is_empty() => ResolvedAttribute {
                    name: def.name.clone(),
                    kind: def.kind,
                    value: value.to_string(),
                    from_default: false,
                },
                _ => ResolvedAttribute {
                    name: def.name.clone(),
                    kind: def.kind,
                    value: def.default_value(),
                    from_default: true,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AttributeSchema {
        AttributeSchema::new(vec![
            AttributeDef::new("condition", AttributeKind::Select)
                .with_default("good")
                .with_options(vec!["good".into(), "damaged".into()]),
            AttributeDef::new("height_m", AttributeKind::Number),
            AttributeDef::new("notes", AttributeKind::Textarea),
        ])
    }

    #[test]
    fn test_set_reports_changes() {
        let mut attrs = Attributes::new();
        assert!(attrs.set("a", "1"));
        assert!(!attrs.set("a", "1"));
        assert!(attrs.set("a", "2"));
        assert_eq!(attrs.get("a"), Some("2"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_resolve_prefers_persisted_values() {
        let attrs: Attributes = [("condition", "damaged"), ("notes", "cracked")]
            .into_iter()
            .collect();
        let resolved = schema().resolve(&attrs);
        assert_eq!(resolved[0].value, "damaged");
        assert!(!resolved[0].from_default);
        assert_eq!(resolved[2].value, "cracked");
    }

    #[test]
    fn test_resolve_blank_values_use_defaults() {
        let attrs: Attributes = [("condition", "  "), ("height_m", "")].into_iter().collect();
        let resolved = schema().resolve(&attrs);
        assert_eq!(resolved[0].value, "good");
        assert!(resolved[0].from_default);
        assert_eq!(resolved[1].value, "0");
        assert_eq!(resolved[2].value, "");
    }

    #[test]
    fn test_schema_deserializes_from_list() {
        let json = r#"[{"name": "condition", "type": "select", "options": ["a", "b"], "default": "a"}]"#;
        let schema: AttributeSchema = serde_json::from_str(json).unwrap();
        let def = schema.get("condition").unwrap();
        assert_eq!(def.kind, AttributeKind::Select);
        assert_eq!(def.options.len(), 2);
    }
}
