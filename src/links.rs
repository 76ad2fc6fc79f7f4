//! Consumed links.
//!
//! A job consumes links to learn about other instance groups: their instances
//! (address, az, id, index, name) and the properties the provider exports. The
//! [`LinkResolver`] turns the raw "consumes" declarations into a [`LinkSet`].
//!
//! Rules:
//! - a link declared with no instances is absent, exactly as if it had never
//!   been declared, so templates never see a link whose `instances` is empty
//! - each link instance derives `bootstrap` from its own index
//! - link properties are exposed verbatim unless a per-link schema has been
//!   registered, in which case they resolve like job properties
//! - a name declared twice keeps the last declaration
//!
//! Deployments rendered outside a director carry the consumes map inside the
//! deployment properties at `bosh_containerization.consumes`; use
//! [`LinkResolver::consumes_from_properties`] to extract it.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::core::{RenderError, Result};
use crate::instance::{parse_index, scalar_string};
use crate::properties::{self, PropertySchema, lookup_path};

/// Path of the consumes map inside deployment properties.
pub const CONSUMES_PROPERTY: &str = "bosh_containerization.consumes";

/// One instance of a consumed link, as declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInstanceFacts {
    #[serde(default, deserialize_with = "scalar_string")]
    pub address: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub az: String,
    /// Accepted for compatibility; the derived value always wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(default = "zero_index")]
    pub index: Value,
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: String,
}

fn zero_index() -> Value {
    Value::from(0)
}

/// A consumed link as declared by the deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkDeclaration {
    /// Provider-level address, when the deployment supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub instances: Vec<LinkInstanceFacts>,
    #[serde(default)]
    pub properties: Value,
}

/// A resolved link instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInstance {
    pub address: String,
    pub az: String,
    pub bootstrap: bool,
    pub id: String,
    pub index: i64,
    pub name: String,
}

/// A resolved link with at least one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub instances: Vec<LinkInstance>,
    pub properties: Value,
}

impl Link {
    /// Look up a dotted property exported by the link.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        lookup_path(&self.properties, name)
    }
}

/// Links keyed by name.
///
/// Lookup by name is constant time. Iteration follows declaration order, which
/// keeps output deterministic but carries no meaning for templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet {
    links: Vec<Link>,
    by_name: HashMap<String, usize>,
}

impl LinkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a link, replacing any existing link with the same name in place.
    pub fn insert(&mut self, link: Link) {
        match self.by_name.get(&link.name) {
            Some(&idx) => self.links[idx] = link,
            None => {
                self.by_name.insert(link.name.clone(), self.links.len());
                self.links.push(link);
            }
        }
    }

    /// Remove a link by name.
    pub fn remove(&mut self, name: &str) -> Option<Link> {
        let idx = self.by_name.remove(name)?;
        let removed = self.links.remove(idx);
        for position in self.by_name.values_mut() {
            if *position > idx {
                *position -= 1;
            }
        }
        Some(removed)
    }

    /// The link with this name, or `None` if it was never declared or had no instances.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Link> {
        self.by_name.get(name).map(|&idx| &self.links[idx])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|link| link.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Serialize for LinkSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.links.len()))?;
        for link in &self.links {
            map.serialize_entry(&link.name, link)?;
        }
        map.end()
    }
}

/// Builds a [`LinkSet`] from consumes declarations.
#[derive(Debug, Clone, Default)]
pub struct LinkResolver {
    schemas: HashMap<String, PropertySchema>,
}

impl LinkResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the named link's properties against `schema` instead of exposing
    /// them verbatim.
    #[must_use]
    pub fn with_link_schema(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    /// Extract the consumes map from deployment properties.
    ///
    /// Returns an empty map when the path is absent.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DataShape`] when the value at
    /// [`CONSUMES_PROPERTY`] is not a mapping.
    pub fn consumes_from_properties(values: &Value) -> Result<Map<String, Value>> {
        match lookup_path(values, CONSUMES_PROPERTY) {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(RenderError::data_shape(
                CONSUMES_PROPERTY,
                format!("expected a mapping of link declarations, found {other}"),
            )),
        }
    }

    /// Resolve a raw consumes mapping (`name → declaration`).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DataShape`] when a declaration is malformed or a
    /// link instance index is not numeric.
    pub fn resolve(&self, consumes: &Map<String, Value>) -> Result<LinkSet> {
        let declarations = consumes
            .iter()
            .map(|(name, raw)| {
                let declaration = if raw.is_null() {
                    LinkDeclaration::default()
                } else {
                    serde_json::from_value::<LinkDeclaration>(raw.clone()).map_err(|e| {
                        RenderError::data_shape(format!("consumes.{name}"), e.to_string())
                    })?
                };
                Ok((name.clone(), declaration))
            })
            .collect::<Result<Vec<_>>>()?;

        self.resolve_declarations(declarations)
    }

    /// Resolve typed declarations in order. A repeated name replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DataShape`] when a link instance index is not
    /// numeric or link properties conflict with a registered link schema.
    pub fn resolve_declarations<I>(&self, declarations: I) -> Result<LinkSet>
    where
        I: IntoIterator<Item = (String, LinkDeclaration)>,
    {
        let mut links = LinkSet::new();

        for (name, declaration) in declarations {
            if declaration.instances.is_empty() {
                tracing::debug!("link '{}' has no instances, leaving it out", name);
                links.remove(&name);
                continue;
            }

            let instances = declaration
                .instances
                .iter()
                .enumerate()
                .map(|(position, facts)| build_link_instance(&name, position, facts))
                .collect::<Result<Vec<_>>>()?;

            let properties = match self.schemas.get(&name) {
                Some(schema) => properties::resolve(schema, &declaration.properties)
                    .map_err(|e| prefix_path(e, &format!("consumes.{name}.properties")))?
                    .as_value()
                    .clone(),
                None if declaration.properties.is_null() => Value::Object(Map::new()),
                None => declaration.properties,
            };

            tracing::debug!("resolved link '{}' with {} instance(s)", name, instances.len());
            links.insert(Link {
                name,
                address: declaration.address,
                instances,
                properties,
            });
        }

        Ok(links)
    }
}

fn build_link_instance(link: &str, position: usize, facts: &LinkInstanceFacts) -> Result<LinkInstance> {
    let index = parse_index(&format!("consumes.{link}.instances[{position}].index"), &facts.index)?;
    let bootstrap = index == 0;
    if let Some(declared) = facts.bootstrap.filter(|&declared| declared != bootstrap) {
        tracing::debug!(
            "link '{}' instance {} declares bootstrap={} but index {} derives {}",
            link,
            position,
            declared,
            index,
            bootstrap
        );
    }

    Ok(LinkInstance {
        address: facts.address.clone(),
        az: facts.az.clone(),
        bootstrap,
        id: facts.id.clone(),
        index,
        name: facts.name.clone(),
    })
}

fn prefix_path(err: RenderError, prefix: &str) -> RenderError {
    match err {
        RenderError::DataShape {
            path,
            message,
        } => RenderError::DataShape {
            path: format!("{prefix}.{path}"),
            message,
        },
        other => other,
    }
}
