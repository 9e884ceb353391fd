//! The object builder.
//!
//! [`build_module_objects`] runs the whole per-module build:
//!
//! 1. render the module's components into one composite snippet
//!    (each component's body under its qualified key) plus a side table of
//!    declared kinds
//! 2. resolve the module's parameters under full inheritance and fetch the
//!    environment-level parameter overlay
//! 3. evaluate the overlay against the merged parameters to obtain the
//!    final per-component values
//! 4. evaluate the composite snippet with those values injected and parse
//!    the result as a mapping of component name to value
//! 5. merge-patch raw-document entries from the module's *global* (non-
//!    override) parameters, then decode each entry as a resource object
//! 6. flatten `apiVersion: v1` / `kind: List` wrappers into their members
//! 7. label every resulting object with its originating component
//!
//! There is no partial-success mode: the first failure aborts the module's
//! entire contribution, carrying the offending module, component, and
//! environment in the error.

use crate::core::{KraftError, Result};
use crate::eval::{self, EvaluatorFactory};
use crate::params;
use crate::project::Project;
use crate::registry::{ComponentKind, Module, Registry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Label key identifying the component an object was built from.
pub const COMPONENT_LABEL_KEY: &str = "ksonnet.io/component";

/// Snippet label for environment-overlay evaluations.
pub(crate) const PARAMS_SNIPPET: &str = "params";
/// Snippet label for composite component evaluations.
pub(crate) const COMPONENTS_SNIPPET: &str = "components";

/// One final, labeled, flattened resource object.
///
/// A built object is always a single resource - `List` wrappers are expanded
/// before objects are returned - and always carries the component-identity
/// label under [`COMPONENT_LABEL_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BuiltObject {
    doc: Map<String, Value>,
}

impl BuiltObject {
    fn new(doc: Map<String, Value>) -> Self {
        Self { doc }
    }

    /// The object's `apiVersion` field.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.doc.get("apiVersion").and_then(Value::as_str)
    }

    /// The object's `kind` field.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.doc.get("kind").and_then(Value::as_str)
    }

    /// The component-identity label value.
    #[must_use]
    pub fn component(&self) -> Option<&str> {
        self.doc
            .get("metadata")?
            .get("labels")?
            .get(COMPONENT_LABEL_KEY)?
            .as_str()
    }

    /// The underlying document.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.doc
    }

    /// Consume the object, returning the underlying document.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.doc)
    }
}

/// The two resource shapes an evaluated component entry can decode into.
///
/// Classification inspects exactly two fields: a document declaring
/// `apiVersion: v1` and `kind: List` is a wrapper whose `items` members
/// become independent objects. Anything else - including a malformed `List`
/// whose `items` is missing or not an array - falls back to a single
/// resource.
enum ResourceShape {
    Single(Map<String, Value>),
    List(Vec<Value>),
}

fn classify(mut doc: Map<String, Value>) -> ResourceShape {
    let is_list = doc.get("apiVersion").and_then(Value::as_str) == Some("v1")
        && doc.get("kind").and_then(Value::as_str) == Some("List");

    if is_list {
        if let Some(Value::Array(items)) = doc.remove("items") {
            return ResourceShape::List(items);
        }
        tracing::debug!("List wrapper without an items array, treating as a single resource");
    }

    ResourceShape::Single(doc)
}

/// Require the minimal structured-resource shape: non-empty `apiVersion`
/// and `kind` strings.
fn validate_resource(doc: &Map<String, Value>, component: &str) -> Result<()> {
    for field in ["apiVersion", "kind"] {
        match doc.get(field) {
            Some(Value::String(s)) if !s.is_empty() => {}
            _ => {
                return Err(KraftError::Decode {
                    component: component.to_string(),
                    reason: format!("object is missing \"{field}\""),
                });
            }
        }
    }
    Ok(())
}

/// Inject the component-identity label, creating `metadata.labels` as
/// needed. Existing labels are preserved; the component key is overwritten.
fn label_object(doc: &mut Map<String, Value>, component: &str) {
    if !matches!(doc.get("metadata"), Some(Value::Object(_))) {
        doc.insert("metadata".to_string(), Value::Object(Map::new()));
    }
    let Some(Value::Object(metadata)) = doc.get_mut("metadata") else {
        return;
    };

    if !matches!(metadata.get("labels"), Some(Value::Object(_))) {
        metadata.insert("labels".to_string(), Value::Object(Map::new()));
    }
    if let Some(Value::Object(labels)) = metadata.get_mut("labels") {
        labels.insert(COMPONENT_LABEL_KEY.to_string(), Value::String(component.to_string()));
    }
}

/// Render a module's components into one composite snippet plus the side
/// table of declared kinds. Entries are keyed by qualified component name;
/// template bodies are spliced verbatim, raw documents as JSON literals.
fn render_composite(module: &Module) -> (String, BTreeMap<String, ComponentKind>) {
    let mut kinds = BTreeMap::new();
    let mut entries = Vec::new();

    for component in module.components() {
        let qualified = module.qualified_name(component.name());
        entries.push(format!(
            "  {}: {}",
            Value::String(qualified.clone()),
            component.snippet()
        ));
        kinds.insert(qualified, component.kind());
    }

    (format!("{{\n{}\n}}", entries.join(",\n")), kinds)
}

/// Build all objects for one module in one environment.
///
/// `filter` is an allow-list of qualified component names; when non-empty,
/// entries outside it contribute no objects. Entries with no kind record
/// (list members have no independent entry) default to native-template
/// handling.
///
/// # Errors
///
/// Any failure at lookup, parameter resolution, evaluation, patching, or
/// decoding aborts the module's whole contribution; see [`KraftError`] for
/// the taxonomy.
pub fn build_module_objects(
    project: &Project,
    registry: &Registry,
    module_path: &str,
    env_name: &str,
    filter: &[String],
    factory: &dyn EvaluatorFactory,
) -> Result<Vec<BuiltObject>> {
    let module = registry.module(module_path)?;
    project.environment(env_name)?;

    if module.components().next().is_none() {
        return Ok(Vec::new());
    }

    let (composite, kinds) = render_composite(module);
    let merged = params::resolved_params(registry, module.path(), env_name)?;
    let overlay = project.environment_params(env_name)?;
    let overlay = params::rewrite_legacy_imports(env_name, &overlay);
    let search_paths = project.search_paths(env_name);

    tracing::debug!(
        module = %module.path(),
        environment = %env_name,
        components = kinds.len(),
        "building module objects"
    );

    // Final per-component parameter values: the environment overlay
    // evaluated against the merged parameter document.
    let mut evaluator = factory.create();
    let env_params = eval::evaluate_with_params(
        evaluator.as_mut(),
        &search_paths,
        &merged.to_string(),
        PARAMS_SNIPPET,
        &overlay,
    )?;

    // Each evaluation gets an independent engine instance.
    let mut evaluator = factory.create();
    let evaluated = eval::evaluate_with_params(
        evaluator.as_mut(),
        &search_paths,
        &env_params,
        COMPONENTS_SNIPPET,
        &composite,
    )?;

    let entries: BTreeMap<String, Value> =
        serde_json::from_str(&evaluated).map_err(|e| KraftError::Decode {
            component: module.path().to_string(),
            reason: format!("evaluator output is not a mapping of component name to value: {e}"),
        })?;

    let global_params = module.global_params();
    let mut objects = Vec::new();

    for (name, value) in entries {
        if !filter.is_empty() && !filter.iter().any(|allowed| *allowed == name) {
            continue;
        }

        let Value::Object(doc) = value else {
            return Err(KraftError::Decode {
                component: name,
                reason: "component entry is not an object".to_string(),
            });
        };

        // Entries without a kind record default to native-template: members
        // of an evaluated List never get an independent kind entry.
        let kind = kinds.get(&name).copied().unwrap_or(ComponentKind::NativeTemplate);

        // Raw documents cannot be templated; they receive parameters as a
        // merge patch from the global (non-override) document, applied
        // before decoding.
        let doc = match kind {
            ComponentKind::NativeTemplate => doc,
            ComponentKind::RawDocument => {
                match params::apply_patch(Value::Object(doc), global_params, &name) {
                    Value::Object(patched) => patched,
                    _ => {
                        return Err(KraftError::Decode {
                            component: name,
                            reason: "patched document is not an object".to_string(),
                        });
                    }
                }
            }
        };

        match classify(doc) {
            ResourceShape::Single(mut doc) => {
                validate_resource(&doc, &name)?;
                label_object(&mut doc, &name);
                objects.push(BuiltObject::new(doc));
            }
            ResourceShape::List(items) => {
                for item in items {
                    let Value::Object(mut member) = item else {
                        tracing::debug!(component = %name, "skipping non-object List member");
                        continue;
                    };
                    validate_resource(&member, &name)?;
                    label_object(&mut member, &name);
                    objects.push(BuiltObject::new(member));
                }
            }
        }
    }

    Ok(objects)
}
