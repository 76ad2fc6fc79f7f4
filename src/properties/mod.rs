//! Property resolution for BOSH job templates.
//!
//! A job declares the properties it accepts in its spec, optionally with
//! defaults. A deployment supplies values as a nested tree. Resolution produces
//! the single tree that templates read through `p(...)`:
//!
//! - every declared property takes the deployment value when one is supplied,
//!   including falsy values such as `""`, `0` and `false`
//! - otherwise the schema default is used
//! - a declared property with neither a value nor a default is left out
//! - properties the job does not declare are never exposed
//!
//! Defaults that are mappings are merged key by key under a partially supplied
//! deployment mapping: supplied leaves win, default leaves fill the gaps. An
//! explicit `null` in the deployment counts as "not supplied".
//!
//! # Example
//!
//! ```rust
//! use bosh_render_cli::properties::{PropertySchema, resolve};
//! use serde_json::json;
//!
//! let schema = PropertySchema::from_defaults([
//!     ("foo", Some(json!("baz"))),
//!     ("tls", Some(json!({ "enabled": false, "port": 4443 }))),
//! ]);
//! let values = json!({ "tls": { "enabled": true }, "undeclared": 1 });
//!
//! let resolved = resolve(&schema, &values).unwrap();
//! assert_eq!(
//!     resolved.as_value(),
//!     &json!({ "foo": "baz", "tls": { "enabled": true, "port": 4443 } })
//! );
//! ```

mod path;

pub use path::{insert_path, leaf_paths, lookup_path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{RenderError, Result};
use path::describe;

/// One declared property of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Dotted property name, e.g. `nats.tls.enabled`
    pub name: String,
    /// Human description from the job spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value; `None` when the spec declares no default or a null one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Ordered set of property declarations for a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySchema {
    definitions: Vec<PropertyDefinition>,
}

impl PropertySchema {
    /// An empty schema. Resolving against it always yields an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from `(name, default)` pairs.
    pub fn from_defaults<N, I>(entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Option<Value>)>,
    {
        let mut schema = Self::new();
        for (name, default) in entries {
            schema.declare(PropertyDefinition {
                name: name.into(),
                description: None,
                default,
            });
        }
        schema
    }

    /// Build a schema from the `properties` section of a job spec.
    ///
    /// Each entry maps a dotted name to an optional mapping carrying
    /// `description` and `default`. A null entry declares the property with no
    /// default.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DataShape`] when an entry is neither null nor a mapping.
    pub fn from_spec_section(section: &Map<String, Value>) -> Result<Self> {
        let mut schema = Self::new();
        for (name, entry) in section {
            let definition = match entry {
                Value::Null => PropertyDefinition {
                    name: name.clone(),
                    description: None,
                    default: None,
                },
                Value::Object(fields) => PropertyDefinition {
                    name: name.clone(),
                    description: fields.get("description").and_then(Value::as_str).map(str::to_string),
                    default: fields.get("default").filter(|v| !v.is_null()).cloned(),
                },
                other => {
                    return Err(RenderError::data_shape(
                        format!("properties.{name}"),
                        format!("expected a property declaration mapping, found {}", describe(other)),
                    ));
                }
            };
            schema.declare(definition);
        }
        Ok(schema)
    }

    /// Declare a property. A later declaration of the same name replaces the earlier one.
    pub fn declare(&mut self, definition: PropertyDefinition) {
        if let Some(existing) = self.definitions.iter_mut().find(|d| d.name == definition.name) {
            *existing = definition;
        } else {
            self.definitions.push(definition);
        }
    }

    /// Look up a declaration by its dotted name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.definitions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// The property tree a template is evaluated against.
///
/// Only produced by [`resolve`], so holding one means every declared default
/// has already been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedProperties(Value);

impl Default for ResolvedProperties {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResolvedProperties {
    /// An empty property tree.
    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Look up a dotted property name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        lookup_path(&self.0, name)
    }

    /// The whole tree as a mapping value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Every leaf path in the tree, used for "did you mean" suggestions.
    #[must_use]
    pub fn leaf_paths(&self) -> Vec<String> {
        leaf_paths(&self.0)
    }
}

/// Merge deployment values into a job's property schema.
///
/// `values` may be `null`, which is treated as an empty tree.
///
/// # Errors
///
/// Returns [`RenderError::DataShape`] when a supplied value is structurally
/// incompatible with the declared default (a mapping default against a scalar,
/// a sequence default against a mapping, ...), or when the root of `values` is
/// neither a mapping nor null.
pub fn resolve(schema: &PropertySchema, values: &Value) -> Result<ResolvedProperties> {
    if !(values.is_object() || values.is_null()) {
        return Err(RenderError::data_shape(
            "properties",
            format!("expected a mapping of property values, found {}", describe(values)),
        ));
    }

    let mut resolved = Map::new();

    for definition in schema.iter() {
        let supplied = lookup_path(values, &definition.name);
        let value = match (supplied, &definition.default) {
            (Some(value), Some(default)) => merge_with_default(&definition.name, value, default)?,
            (Some(value), None) => value.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                tracing::trace!("property '{}' has no value and no default", definition.name);
                continue;
            }
        };
        insert_path(&mut resolved, &definition.name, value)?;
    }

    tracing::debug!(
        "resolved {} of {} declared properties",
        resolved.len(),
        schema.len()
    );
    Ok(ResolvedProperties(Value::Object(resolved)))
}

/// Combine a supplied value with the schema default at the same path.
///
/// Mappings merge key by key with supplied keys winning; every other
/// compatible pairing takes the supplied value as is.
fn merge_with_default(path: &str, supplied: &Value, default: &Value) -> Result<Value> {
    match (supplied, default) {
        (Value::Object(supplied_map), Value::Object(default_map)) => {
            let mut merged = supplied_map.clone();
            for (key, default_value) in default_map {
                let child_path = format!("{path}.{key}");
                match supplied_map.get(key).filter(|v| !v.is_null()) {
                    Some(supplied_value) => {
                        let value = merge_with_default(&child_path, supplied_value, default_value)?;
                        merged.insert(key.clone(), value);
                    }
                    None => {
                        merged.insert(key.clone(), default_value.clone());
                    }
                }
            }
            Ok(Value::Object(merged))
        }
        (_, Value::Null) => Ok(supplied.clone()),
        (Value::Object(_), _) | (_, Value::Object(_)) | (Value::Array(_), _) | (_, Value::Array(_))
            if !same_shape(supplied, default) =>
        {
            Err(RenderError::data_shape(
                path,
                format!(
                    "the job spec default is {} but the deployment supplied {}",
                    describe(default),
                    describe(supplied)
                ),
            ))
        }
        _ => Ok(supplied.clone()),
    }
}

fn same_shape(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(entries: Value) -> PropertySchema {
        match entries {
            Value::Object(map) => PropertySchema::from_spec_section(&map).unwrap(),
            _ => panic!("schema fixture must be a mapping"),
        }
    }

    #[test]
    fn test_default_used_when_value_missing() {
        let schema = schema(json!({ "foo": { "default": "baz" } }));
        let resolved = resolve(&schema, &json!({})).unwrap();

        assert_eq!(resolved.get("foo"), Some(&json!("baz")));
    }

    #[test]
    fn test_supplied_value_wins() {
        let schema = schema(json!({ "foo": { "default": "baz" } }));
        let resolved = resolve(&schema, &json!({ "foo": "bar" })).unwrap();

        assert_eq!(resolved.get("foo"), Some(&json!("bar")));
    }

    #[test]
    fn test_falsy_values_are_supplied_values() {
        let schema = schema(json!({
            "s": { "default": "x" },
            "n": { "default": 5 },
            "b": { "default": true },
        }));
        let resolved = resolve(&schema, &json!({ "s": "", "n": 0, "b": false })).unwrap();

        assert_eq!(resolved.as_value(), &json!({ "s": "", "n": 0, "b": false }));
    }

    #[test]
    fn test_null_value_falls_back_to_default() {
        let schema = schema(json!({ "foo": { "default": "baz" } }));
        let resolved = resolve(&schema, &json!({ "foo": null })).unwrap();

        assert_eq!(resolved.get("foo"), Some(&json!("baz")));
    }

    #[test]
    fn test_undeclared_properties_hidden() {
        let schema = schema(json!({ "foo": null }));
        let resolved = resolve(&schema, &json!({ "foo": 1, "bar": 2 })).unwrap();

        assert_eq!(resolved.as_value(), &json!({ "foo": 1 }));
    }

    #[test]
    fn test_declared_without_default_or_value_is_absent() {
        let schema = schema(json!({ "foo": { "description": "needed" } }));
        let resolved = resolve(&schema, &json!({})).unwrap();

        assert_eq!(resolved.get("foo"), None);
        assert_eq!(resolved.as_value(), &json!({}));
    }

    #[test]
    fn test_empty_schema_and_null_values() {
        let resolved = resolve(&PropertySchema::new(), &Value::Null).unwrap();
        assert_eq!(resolved, ResolvedProperties::empty());
    }

    #[test]
    fn test_dotted_names_resolve_nested_paths() {
        let schema = schema(json!({
            "nats.port": { "default": 4222 },
            "nats.user": { "default": "admin" },
        }));
        let resolved = resolve(&schema, &json!({ "nats": { "user": "ops" } })).unwrap();

        assert_eq!(resolved.as_value(), &json!({ "nats": { "port": 4222, "user": "ops" } }));
    }

    #[test]
    fn test_nested_default_merged_per_leaf() {
        let schema = schema(json!({
            "tls": { "default": { "enabled": false, "ciphers": { "strict": true, "list": ["a"] } } },
        }));
        let values = json!({ "tls": { "enabled": true, "ciphers": { "list": ["b", "c"] }, "extra": 1 } });
        let resolved = resolve(&schema, &values).unwrap();

        assert_eq!(
            resolved.get("tls"),
            Some(&json!({ "enabled": true, "ciphers": { "list": ["b", "c"], "strict": true }, "extra": 1 }))
        );
    }

    #[test]
    fn test_mapping_default_against_scalar_is_data_shape_error() {
        let schema = schema(json!({ "tls": { "default": { "enabled": false } } }));
        let err = resolve(&schema, &json!({ "tls": "yes" })).unwrap_err();

        match err {
            RenderError::DataShape {
                path,
                message,
            } => {
                assert_eq!(path, "tls");
                assert!(message.contains("a mapping"), "{message}");
                assert!(message.contains("string \"yes\""), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_shape_error_reports_full_path() {
        let schema = schema(json!({ "tls": { "default": { "ciphers": ["a"] } } }));
        let err = resolve(&schema, &json!({ "tls": { "ciphers": { "a": 1 } } })).unwrap_err();

        assert!(matches!(err, RenderError::DataShape { ref path, .. } if path == "tls.ciphers"));
    }

    #[test]
    fn test_scalar_types_may_differ() {
        let schema = schema(json!({ "port": { "default": "8080" } }));
        let resolved = resolve(&schema, &json!({ "port": 9090 })).unwrap();

        assert_eq!(resolved.get("port"), Some(&json!(9090)));
    }

    #[test]
    fn test_non_mapping_values_root_rejected() {
        let err = resolve(&PropertySchema::new(), &json!([1, 2])).unwrap_err();
        assert!(matches!(err, RenderError::DataShape { .. }));
    }

    #[test]
    fn test_invalid_spec_entry_rejected() {
        let mut section = Map::new();
        section.insert("foo".to_string(), json!("not a mapping"));

        let err = PropertySchema::from_spec_section(&section).unwrap_err();
        assert!(matches!(err, RenderError::DataShape { ref path, .. } if path == "properties.foo"));
    }

    #[test]
    fn test_leaf_paths() {
        let schema = schema(json!({
            "a.b": { "default": 1 },
            "a.c": { "default": { "d": 2 } },
            "e": { "default": [] },
        }));
        let resolved = resolve(&schema, &json!({})).unwrap();

        assert_eq!(resolved.leaf_paths(), vec!["a.b", "a.c.d", "e"]);
    }

    #[test]
    fn test_overlapping_declarations_resolve_the_same_in_any_order() {
        let child = ("a.b.c", Some(json!(1)));
        let parent = ("a", Some(json!({ "b": { "d": 2 } })));

        let child_first = PropertySchema::from_defaults([child.clone(), parent.clone()]);
        let parent_first = PropertySchema::from_defaults([parent, child]);

        let expected = json!({ "a": { "b": { "c": 1, "d": 2 } } });
        assert_eq!(resolve(&child_first, &json!({})).unwrap().as_value(), &expected);
        assert_eq!(resolve(&parent_first, &json!({})).unwrap().as_value(), &expected);
    }

    #[test]
    fn test_resolution_only_yields_value_or_default() {
        let schema = schema(json!({
            "a": { "default": 1 },
            "b": { "default": "two" },
            "c.d": { "default": [3] },
        }));
        let cases = [json!({}), json!({ "a": 10 }), json!({ "b": "", "c": { "d": [] } })];

        for values in cases {
            let resolved = resolve(&schema, &values).unwrap();
            for definition in schema.iter() {
                let got = resolved.get(&definition.name);
                let supplied = lookup_path(&values, &definition.name);
                assert!(
                    got == supplied || got == definition.default.as_ref(),
                    "{} resolved to {got:?}",
                    definition.name
                );
            }
        }
    }
}
