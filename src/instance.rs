//! Runtime identity of the instance being rendered.
//!
//! [`InstanceFacts`] is what a caller knows about an instance (typically read
//! from a YAML document). [`InstanceDescriptor::build`] turns it into the
//! immutable record templates see as `spec`, deriving `bootstrap` and the
//! default network entry.
//!
//! The index is stored as an `i64` and always serialized as a number. Callers may
//! hand it over as an integer, an integral float or a numeric string; anything
//! else is a data-shape error rather than a silent "not bootstrap".

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::{RenderError, Result};

/// Name of the synthesized network entry.
pub const DEFAULT_NETWORK: &str = "default";

/// Raw instance facts as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFacts {
    #[serde(default, deserialize_with = "scalar_string")]
    pub address: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub az: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub deployment: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: String,
    /// Ordinal position within the instance group; validated by [`parse_index`]
    #[serde(default = "zero_index")]
    pub index: Value,
    #[serde(default, deserialize_with = "scalar_string")]
    pub ip: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: String,
}

fn zero_index() -> Value {
    Value::from(0)
}

/// Deserialize a scalar into its string form.
///
/// Identity fields arrive from YAML documents where `az: 1` or `id: 42` are
/// numbers; they are kept as their text. `null` reads as an empty string.
pub(crate) fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(_) => Err(de::Error::custom("expected a scalar, found a sequence")),
        Value::Object(_) => Err(de::Error::custom("expected a scalar, found a mapping")),
    }
}

impl Default for InstanceFacts {
    fn default() -> Self {
        Self {
            address: String::new(),
            az: String::new(),
            deployment: String::new(),
            id: String::new(),
            index: zero_index(),
            ip: String::new(),
            name: String::new(),
        }
    }
}

/// One entry of the instance's `networks` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkEntry {
    pub ip: String,
    pub dns_record_name: String,
}

/// The instance identity templates are rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceDescriptor {
    pub address: String,
    pub az: String,
    pub bootstrap: bool,
    pub deployment: String,
    pub id: String,
    pub index: i64,
    pub ip: String,
    pub name: String,
    pub networks: BTreeMap<String, NetworkEntry>,
}

impl InstanceDescriptor {
    /// Build a descriptor from raw facts.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DataShape`] when `index` cannot be read as a number.
    ///
    /// ```rust
    /// use bosh_render_cli::instance::{InstanceDescriptor, InstanceFacts};
    ///
    /// let facts = InstanceFacts {
    ///     address: "web-0.example.internal".to_string(),
    ///     ip: "10.0.0.5".to_string(),
    ///     ..InstanceFacts::default()
    /// };
    /// let instance = InstanceDescriptor::build(&facts).unwrap();
    /// assert!(instance.bootstrap);
    /// assert_eq!(instance.networks["default"].dns_record_name, "web-0.example.internal");
    /// ```
    pub fn build(facts: &InstanceFacts) -> Result<Self> {
        let index = parse_index("spec.index", &facts.index)?;

        let mut networks = BTreeMap::new();
        networks.insert(
            DEFAULT_NETWORK.to_string(),
            NetworkEntry {
                ip: facts.ip.clone(),
                dns_record_name: facts.address.clone(),
            },
        );

        Ok(Self {
            address: facts.address.clone(),
            az: facts.az.clone(),
            bootstrap: index == 0,
            deployment: facts.deployment.clone(),
            id: facts.id.clone(),
            index,
            ip: facts.ip.clone(),
            name: facts.name.clone(),
            networks,
        })
    }
}

/// Read an instance index as an integer.
///
/// Accepts integers, floats with no fractional part and strings that parse as
/// an integer (surrounding whitespace ignored).
///
/// # Errors
///
/// Returns [`RenderError::DataShape`] naming `path` for any other value,
/// including `null`.
pub fn parse_index(path: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64).map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        RenderError::data_shape(
            path,
            format!("instance index must be numeric to determine bootstrap, got {value}"),
        )
    })
}
