//! In-process template expansion with Tera.
//!
//! Templates see the same data an ERB template does, through Tera syntax:
//!
//! | Tera                                   | ERB equivalent                 |
//! |----------------------------------------|--------------------------------|
//! | `{{ p(name="foo") }}`                  | `<%= p('foo') %>`              |
//! | `{{ p(name="foo", default="x") }}`     | `<%= p('foo', 'x') %>`         |
//! | `{{ p(name=["new", "old"]) }}`         | `<%= p(['new', 'old']) %>`     |
//! | `{% if has_p(name="foo") %}`           | `<% if_p('foo') do %>`         |
//! | `{% set db = link(name="db") %}{{ db.instances.0.address }}` | `<%= link('db').instances[0].address %>` |
//! | `{% if has_link(name="db") %}`         | `<% if_link('db') do %>`       |
//! | `{{ spec.index }}`, `{{ spec.networks.default.ip }}` | `<%= spec.index %>` |
//!
//! `properties` and `links` are also available as plain variables.
//!
//! A missing property or link without a default fails the render and the
//! message suggests close names.

use serde_json::{Map, Value};
use std::collections::HashMap;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::{ExpansionEngine, ExpansionRequest};
use crate::core::{RenderError, Result};
use crate::properties::{leaf_paths, lookup_path};

/// Maximum Levenshtein distance, as a percentage of the requested name's
/// length, for a name to be suggested.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Internal name Tera gives one-off templates.
const ONE_OFF_TEMPLATE: &str = "__tera_one_off";

/// In-process engine. Always available.
#[derive(Debug, Clone, Default)]
pub struct TeraEngine;

impl TeraEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render a template body against an engine spec.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TemplateExpansion`] for syntax errors, missing
    /// properties or links, and failing functions.
    pub fn render(&self, request: ExpansionRequest<'_>) -> Result<String> {
        let properties = request.spec.get("properties").cloned().unwrap_or_else(|| Value::Object(Map::new()));
        let links = request.spec.get("links").cloned().unwrap_or_else(|| Value::Object(Map::new()));

        let mut tera = Tera::default();
        tera.register_function("p", property_function(properties.clone()));
        tera.register_function("has_p", has_property_function(properties.clone()));
        tera.register_function("link", link_function(links.clone()));
        tera.register_function("has_link", has_link_function(links.clone()));

        let mut context = TeraContext::new();
        context.insert("properties", &properties);
        context.insert("links", &links);
        context.insert("spec", request.spec);

        tera.render_str(request.template, &context).map_err(|e| {
            let diagnostic = format_tera_error(&e);
            tracing::debug!("Tera render of {} failed: {}", request.template_path.display(), diagnostic);
            RenderError::TemplateExpansion {
                template: request.template_path.to_path_buf(),
                line: extract_line_from_tera_error(&diagnostic),
                diagnostic,
            }
        })
    }
}

impl ExpansionEngine for TeraEngine {
    fn name(&self) -> &'static str {
        "tera"
    }

    async fn check_available(&self) -> Result<()> {
        Ok(())
    }

    async fn expand(&self, request: ExpansionRequest<'_>) -> Result<Vec<u8>> {
        self.render(request).map(String::into_bytes)
    }
}

/// Read the `name` argument: a string or a list of strings.
fn name_argument(function: &str, args: &HashMap<String, Value>) -> tera::Result<Vec<String>> {
    match args.get("name") {
        Some(Value::String(name)) => Ok(vec![name.clone()]),
        Some(Value::Array(names)) if !names.is_empty() => names
            .iter()
            .map(|name| {
                name.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| tera::Error::msg(format!("{function}(): every name must be a string")))
            })
            .collect(),
        _ => Err(tera::Error::msg(format!("{function}() requires a `name` argument"))),
    }
}

fn property_function(properties: Value) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let names = name_argument("p", args)?;
        if let Some(value) = names.iter().find_map(|name| lookup_path(&properties, name)) {
            return Ok(value.clone());
        }
        if let Some(default) = args.get("default") {
            return Ok(default.clone());
        }
        Err(tera::Error::msg(not_found_message(
            "property",
            &names,
            &leaf_paths(&properties),
        )))
    }
}

fn has_property_function(properties: Value) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let names = name_argument("has_p", args)?;
        Ok(Value::Bool(names.iter().any(|name| lookup_path(&properties, name).is_some())))
    }
}

fn link_function(links: Value) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let names = name_argument("link", args)?;
        if let Some(link) = names.iter().find_map(|name| links.get(name.as_str())) {
            return Ok(link.clone());
        }
        let available: Vec<String> = links.as_object().map(|map| map.keys().cloned().collect()).unwrap_or_default();
        Err(tera::Error::msg(not_found_message("link", &names, &available)))
    }
}

fn has_link_function(links: Value) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let names = name_argument("has_link", args)?;
        Ok(Value::Bool(names.iter().any(|name| links.get(name.as_str()).is_some())))
    }
}

fn not_found_message(what: &str, names: &[String], available: &[String]) -> String {
    let requested = names.join("', '");
    let mut message = format!("Can't find {what} '{requested}'");

    let mut suggestions: Vec<String> = Vec::new();
    for name in names {
        for candidate in find_similar_names(name, available) {
            if !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
        }
    }
    if !suggestions.is_empty() {
        message.push_str(&format!(", did you mean '{}'?", suggestions.join("', '")));
    }
    message
}

/// Up to three names from `available` closest to `target`.
pub fn find_similar_names(target: &str, available: &[String]) -> Vec<String> {
    let limit = target.len() * SIMILARITY_THRESHOLD_PERCENT / 100;
    let mut scored: Vec<_> = available
        .iter()
        .map(|candidate| (candidate, levenshtein(target, candidate)))
        .filter(|(_, distance)| *distance <= limit)
        .collect();

    scored.sort_by_key(|(_, distance)| *distance);
    scored.into_iter().take(3).map(|(candidate, _)| candidate.clone()).collect()
}

/// Flatten a Tera error chain into one readable diagnostic.
///
/// Tera nests the useful message (a parse error location, the failing
/// function's own message) several sources deep and names the template
/// `__tera_one_off`; those wrapper lines are dropped.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let cleaned = err
            .to_string()
            .replace(&format!("Failed to render '{ONE_OFF_TEMPLATE}'"), "")
            .replace(&format!("Failed to parse '{ONE_OFF_TEMPLATE}'"), "")
            .replace(&format!("'{ONE_OFF_TEMPLATE}'"), "template")
            .trim()
            .to_string();
        if !cleaned.is_empty() {
            messages.push(cleaned);
        }
        current = err.source();
    }

    if messages.is_empty() {
        "template syntax error".to_string()
    } else {
        messages.join("\n")
    }
}

/// Template line from a Tera parse error location (`--> 3:7`).
pub fn extract_line_from_tera_error(diagnostic: &str) -> Option<usize> {
    let re = regex::Regex::new(r"-->\s*(\d+):(\d+)").ok()?;
    re.captures(diagnostic)?.get(1)?.as_str().parse().ok()
}
