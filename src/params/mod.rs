//! The parameter resolver.
//!
//! Parameters live in nested mapping documents of the shape
//! `{"components": {qualifiedName: {...param values...}}}`, in two flavors
//! per module: the *global* document (author-set defaults shared across
//! environments) and per-environment *override* documents (deltas). This
//! module computes the merged view of those documents:
//!
//! - [`stub_params`] emits a zero-valued stub (component names present,
//!   values empty) so one module's parameters can be evaluated in isolation
//!   without sibling modules' data
//! - [`resolved_params`] deep-merges the environment override on top of the
//!   global document
//! - [`apply_patch`] feeds parameters into raw-document components, which
//!   cannot be templated, by merge-patching their global parameter object
//!   onto the document
//!
//! The merge is structural over mapping values: override keys win
//! key-by-key, recursively for nested objects, while scalar and array values
//! are replaced wholesale rather than merged element-wise.

mod legacy;

pub use legacy::rewrite_legacy_imports;

use crate::core::{KraftError, Result};
use crate::registry::Registry;
use serde_json::{Map, Value, json};

/// Key under which a parameter document nests its per-component mappings.
pub const COMPONENTS_KEY: &str = "components";

/// Deep-merge `overlay` on top of `base`.
///
/// Object values merge recursively; any other overlay value (scalar, array,
/// null) replaces the base value wholesale. Keys absent from the overlay
/// retain their base value.
#[must_use]
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                match merged.get(key) {
                    Some(base_value) => {
                        let value = deep_merge(base_value, overlay_value);
                        merged.insert(key.clone(), value);
                    }
                    None => {
                        merged.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Produce a stub parameter document for the module at `module_path`: every
/// component transitively owned by the module keyed by its environment-
/// qualified name, each mapped to an empty parameter object.
///
/// # Errors
///
/// Returns [`KraftError::ModuleNotFound`] if the module does not exist.
pub fn stub_params(registry: &Registry, module_path: &str) -> Result<Value> {
    let mut components = Map::new();
    for module in registry.subtree(module_path)? {
        for component in module.components() {
            components.insert(module.qualified_name(component.name()), json!({}));
        }
    }

    Ok(json!({ COMPONENTS_KEY: components }))
}

/// Compute the fully inherited parameter document for one module in one
/// environment: the global document with the environment's override document
/// deep-merged on top.
///
/// # Errors
///
/// Returns [`KraftError::ModuleNotFound`] for an unknown module, and
/// [`KraftError::ParamResolution`] (naming the module and environment) when
/// either source document is malformed. Resolution never partially
/// succeeds.
pub fn resolved_params(
    registry: &Registry,
    module_path: &str,
    env_name: &str,
) -> Result<Value> {
    let module = registry.module(module_path)?;

    let malformed = |reason: String| KraftError::ParamResolution {
        module: module.path().to_string(),
        environment: env_name.to_string(),
        reason,
    };

    validate_document(module.global_params()).map_err(|reason| malformed(format!("global params: {reason}")))?;

    let Some(overrides) = module.env_override(env_name) else {
        return Ok(module.global_params().clone());
    };
    validate_document(overrides).map_err(|reason| malformed(format!("environment overrides: {reason}")))?;

    Ok(deep_merge(module.global_params(), overrides))
}

/// Apply a component's global parameter object onto a raw document as a
/// merge patch. Raw-document components are not templated, so this is how
/// they still receive parameter substitution.
///
/// Components with no parameter entry (or a non-object entry) pass through
/// unchanged.
#[must_use]
pub fn apply_patch(document: Value, global_params: &Value, qualified_name: &str) -> Value {
    let patch = global_params
        .get(COMPONENTS_KEY)
        .and_then(|components| components.get(qualified_name));

    match patch {
        Some(patch @ Value::Object(_)) => deep_merge(&document, patch),
        _ => document,
    }
}

/// Check that a parameter document has the expected shape: an object whose
/// `components` entry, if present, is an object of objects.
fn validate_document(document: &Value) -> std::result::Result<(), String> {
    let Value::Object(map) = document else {
        return Err(format!("expected an object, found {}", type_name(document)));
    };

    match map.get(COMPONENTS_KEY) {
        None => Ok(()),
        Some(Value::Object(components)) => {
            for (name, params) in components {
                if !params.is_object() {
                    return Err(format!(
                        "component \"{name}\": expected an object, found {}",
                        type_name(params)
                    ));
                }
            }
            Ok(())
        }
        Some(other) => Err(format!("\"components\": expected an object, found {}", type_name(other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
