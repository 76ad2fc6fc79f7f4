//! Dotted-path access into property trees.
//!
//! BOSH property names such as `nats.tls.enabled` address nested mappings one
//! segment at a time.

use serde_json::{Map, Value};

use crate::core::{RenderError, Result};

/// Look up a dotted path in a property tree.
///
/// Returns `None` when any segment is missing, when an intermediate value is
/// not a mapping, or when the value found is `null`.
///
/// ```rust
/// use bosh_render_cli::properties::lookup_path;
/// use serde_json::json;
///
/// let tree = json!({ "nats": { "port": 4222, "user": null } });
/// assert_eq!(lookup_path(&tree, "nats.port"), Some(&json!(4222)));
/// assert_eq!(lookup_path(&tree, "nats.user"), None);
/// assert_eq!(lookup_path(&tree, "nats.port.extra"), None);
/// ```
pub fn lookup_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Insert a value at a dotted path, creating intermediate mappings.
///
/// When a mapping already sits at the leaf and `value` is also a mapping, the
/// two are merged at every depth: keys already present are kept and `value`
/// only fills gaps. A schema may therefore declare both `foo` and `foo.bar` in
/// either order and get the same tree.
///
/// # Errors
///
/// Returns [`RenderError::DataShape`] when an intermediate segment already holds
/// a non-mapping value, or when a mapping already at the leaf would be replaced
/// by a non-mapping value.
pub fn insert_path(tree: &mut Map<String, Value>, path: &str, value: Value) -> Result<()> {
    let mut segments = path.split('.').peekable();
    let mut current = tree;
    let mut walked = String::new();

    while let Some(segment) = segments.next() {
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);

        if segments.peek().is_none() {
            if let Some(Value::Object(existing)) = current.get_mut(segment) {
                return match value {
                    Value::Object(incoming) => {
                        fill_gaps(existing, incoming);
                        Ok(())
                    }
                    other => Err(RenderError::data_shape(
                        walked,
                        format!("expected a mapping to merge with nested values, found {}", describe(&other)),
                    )),
                };
            }
            current.insert(segment.to_string(), value);
            return Ok(());
        }

        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match next {
            Value::Object(map) => map,
            other => {
                return Err(RenderError::data_shape(
                    walked,
                    format!("expected a mapping to hold '{path}', found {}", describe(other)),
                ));
            }
        };
    }

    Ok(())
}

/// Merge `incoming` into `existing`, recursing through nested mappings.
/// Values already in `existing` win at every depth.
fn fill_gaps(existing: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match existing.get_mut(&key) {
            Some(Value::Object(existing_child)) => {
                if let Value::Object(incoming_child) = value {
                    fill_gaps(existing_child, incoming_child);
                }
            }
            Some(_) => {}
            None => {
                existing.insert(key, value);
            }
        }
    }
}

/// Every leaf path in a tree, in document order.
///
/// Empty mappings count as leaves. A non-mapping root has no paths.
pub fn leaf_paths(tree: &Value) -> Vec<String> {
    fn walk(prefix: &str, value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(&path, child, out);
                }
            }
            _ if !prefix.is_empty() => out.push(prefix.to_string()),
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk("", tree, &mut out);
    out
}

/// Short human description of a value's shape for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("a sequence of {} items", items.len()),
        Value::Object(_) => "a mapping".to_string(),
    }
}
