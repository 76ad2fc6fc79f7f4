//! Evaluation context assembly.
//!
//! An [`EvaluationContext`] is everything a template is rendered against:
//! resolved job properties, the rendering instance's identity and the consumed
//! links. It is assembled once per render and never mutated afterwards.
//!
//! The properties must come from [`properties::resolve`] over the schema of the
//! job being rendered; resolving against any other schema makes `p(...)` miss
//! the job's defaults. [`RenderInputs::assemble`] runs the whole pipeline and
//! is the usual way to get a context.
//!
//! # Engine spec shape
//!
//! [`EvaluationContext::to_engine_spec`] produces the document handed to the
//! expansion engine:
//!
//! ```json
//! {
//!   "job": { "name": "web" },
//!   "address": "web-0.example.internal",
//!   "az": "z1",
//!   "bootstrap": true,
//!   "deployment": "cf",
//!   "id": "9a3c...",
//!   "index": 0,
//!   "ip": "10.0.0.5",
//!   "name": "web",
//!   "networks": { "default": { "ip": "10.0.0.5", "dns_record_name": "web-0.example.internal" } },
//!   "properties": { "...": "..." },
//!   "links": { "db": { "name": "db", "instances": [ ... ], "properties": { ... } } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Result;
use crate::instance::{InstanceDescriptor, InstanceFacts};
use crate::links::{LinkResolver, LinkSet};
use crate::properties::{self, PropertySchema, ResolvedProperties};

/// Immutable data a template is rendered against.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    job_name: Option<String>,
    properties: ResolvedProperties,
    instance: InstanceDescriptor,
    links: LinkSet,
}

#[derive(Serialize)]
struct JobRef<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct EngineSpec<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<JobRef<'a>>,
    #[serde(flatten)]
    instance: &'a InstanceDescriptor,
    properties: &'a ResolvedProperties,
    links: &'a LinkSet,
}

impl EvaluationContext {
    /// Combine already-resolved parts into a context.
    #[must_use]
    pub fn assemble(properties: ResolvedProperties, instance: InstanceDescriptor, links: LinkSet) -> Self {
        Self {
            job_name: None,
            properties,
            instance,
            links,
        }
    }

    /// Record the name of the job the template belongs to (exposed as `spec.job.name`).
    #[must_use]
    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }

    #[must_use]
    pub fn properties(&self) -> &ResolvedProperties {
        &self.properties
    }

    #[must_use]
    pub fn instance(&self) -> &InstanceDescriptor {
        &self.instance
    }

    #[must_use]
    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    /// Serialize the context into the document the expansion engine reads.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::RenderError::Serialization`] if serialization fails.
    pub fn to_engine_spec(&self) -> Result<Value> {
        let spec = EngineSpec {
            job: self.job_name.as_deref().map(|name| JobRef {
                name,
            }),
            instance: &self.instance,
            properties: &self.properties,
            links: &self.links,
        };
        Ok(serde_json::to_value(spec)?)
    }
}

/// Deployment-side inputs of a render, as read from a context document.
///
/// ```yaml
/// properties:
///   foo: bar
///   bosh_containerization:
///     consumes:
///       db:
///         instances: [{ address: db-0.internal, index: 0 }]
/// instance:
///   address: web-0.internal
///   index: 0
/// ```
///
/// When `consumes` is not given at the top level, it is read from
/// `properties.bosh_containerization.consumes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderInputs {
    #[serde(default)]
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Map<String, Value>>,
    #[serde(default)]
    pub instance: InstanceFacts,
}

impl RenderInputs {
    /// Resolve properties, links and instance identity for one job and assemble them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::RenderError::DataShape`] for any structural problem
    /// in the inputs.
    pub fn assemble(&self, schema: &PropertySchema, resolver: &LinkResolver) -> Result<EvaluationContext> {
        let resolved = properties::resolve(schema, &self.properties)?;

        let links = match &self.consumes {
            Some(consumes) => resolver.resolve(consumes)?,
            None => resolver.resolve(&LinkResolver::consumes_from_properties(&self.properties)?)?,
        };

        let instance = InstanceDescriptor::build(&self.instance)?;

        tracing::debug!(
            "assembled context: {} link(s), instance '{}' index {} (bootstrap: {})",
            links.len(),
            instance.name,
            instance.index,
            instance.bootstrap
        );
        Ok(EvaluationContext::assemble(resolved, instance, links))
    }
}
