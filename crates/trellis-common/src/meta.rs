//! Kubernetes object metadata shared by every synthesized resource

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Standard Kubernetes ObjectMeta for synthesized resources.
///
/// The name may be left empty at construction; the chart fills it in when the
/// resource is added. The namespace is optional because cluster defaults apply
/// when it is omitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Resource namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Create metadata with an explicit name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Add a label in place
    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Add an annotation in place
    pub fn add_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_not_serialized() {
        let json = serde_json::to_value(ObjectMeta::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn builder_sets_all_fields() {
        let meta = ObjectMeta::named("web")
            .with_namespace("prod")
            .with_label("tier", "frontend")
            .with_annotation("owner", "team-a");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["name"], "web");
        assert_eq!(json["namespace"], "prod");
        assert_eq!(json["labels"]["tier"], "frontend");
        assert_eq!(json["annotations"]["owner"], "team-a");
    }
}
