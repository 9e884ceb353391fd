//! The module/component tree.
//!
//! Modules form a hierarchical namespace addressed by `/`-delimited path
//! strings; the root module's path is `/`. Each module owns components and
//! two parameter documents (the author-set global defaults and per-environment
//! override deltas). The tree is read-only for the duration of one build.
//!
//! Modules are stored flat in a [`BTreeMap`] keyed by normalized path rather
//! than as linked nodes, so there are no parent/child reference cycles and
//! traversal order is deterministic (lexicographic by path). Child-to-parent
//! navigation, where needed, is a path computation instead of a back-pointer.

mod component;

pub use component::{Component, ComponentBody, ComponentKind};

use crate::core::{KraftError, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;

/// Path of the root module.
pub const ROOT_MODULE: &str = "/";

/// Normalize a module path to its canonical `/`-prefixed form.
///
/// Empty strings and `/` both denote the root module. Trailing slashes and a
/// missing leading slash are tolerated: `auth/`, `/auth`, and `auth` all
/// normalize to `/auth`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        ROOT_MODULE.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Derive the label-safe form of a component path: the leading separator is
/// stripped and remaining `/` separators become `.`, so nested module paths
/// collapse into a single token (`/moduleA/moduleB/widget` becomes
/// `moduleA.moduleB.widget`).
#[must_use]
pub fn component_label(path: &str) -> String {
    path.trim_start_matches('/').replace('/', ".")
}

/// A named node in the component tree.
///
/// Owns components (keyed by local name) and the module's parameter
/// documents. Component names are unique after file-extension stripping;
/// inserting a colliding name is a fatal ambiguity.
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    components: BTreeMap<String, Component>,
    global_params: Value,
    env_overrides: BTreeMap<String, Value>,
}

impl Module {
    fn new(path: String) -> Self {
        Self {
            path,
            components: BTreeMap::new(),
            global_params: json!({ "components": {} }),
            env_overrides: BTreeMap::new(),
        }
    }

    /// The module's normalized path (`/` for the root).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The module's own name: the last path segment, empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Components owned by this module, in name order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Look up a component by local name.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::ComponentNotFound`] if no such component exists.
    pub fn component(&self, name: &str) -> Result<&Component> {
        self.components.get(name).ok_or_else(|| KraftError::ComponentNotFound {
            module: self.path.clone(),
            name: name.to_string(),
        })
    }

    /// Register a component with this module.
    ///
    /// The component's file extension, if any, is stripped to form its local
    /// name (`guestbook.jsonnet` registers as `guestbook`).
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::AmbiguousComponent`] if a component with the
    /// same stripped name is already registered - two on-disk files mapping
    /// to one component name make the module unusable.
    pub fn insert_component(&mut self, mut component: Component) -> Result<()> {
        let stem = Path::new(component.name())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(component.name())
            .to_string();

        if self.components.contains_key(&stem) {
            return Err(KraftError::AmbiguousComponent {
                module: self.path.clone(),
                name: stem,
            });
        }

        component.set_name(stem.clone());
        self.components.insert(stem, component);
        Ok(())
    }

    /// The module's global (environment-independent) parameter document.
    #[must_use]
    pub fn global_params(&self) -> &Value {
        &self.global_params
    }

    /// Replace the module's global parameter document.
    pub fn set_global_params(&mut self, params: Value) {
        self.global_params = params;
    }

    /// The override parameter document for one environment, if any.
    #[must_use]
    pub fn env_override(&self, env_name: &str) -> Option<&Value> {
        self.env_overrides.get(env_name)
    }

    /// Set the override parameter document for one environment.
    pub fn set_env_override(&mut self, env_name: impl Into<String>, params: Value) {
        self.env_overrides.insert(env_name.into(), params);
    }

    /// The environment-qualified name of a component in this module:
    /// module nesting flattened into a single dotted key
    /// (`auth.ca-cert` for component `ca-cert` in module `/auth`).
    #[must_use]
    pub fn qualified_name(&self, local_name: &str) -> String {
        component_label(&self.component_path(local_name))
    }

    /// The full `/`-delimited path of a component in this module.
    #[must_use]
    pub fn component_path(&self, local_name: &str) -> String {
        if self.path == ROOT_MODULE {
            format!("/{local_name}")
        } else {
            format!("{}/{local_name}", self.path)
        }
    }
}

/// The tree of modules, addressed by normalized path.
///
/// A registry always contains the root module. Iteration order is
/// lexicographic by path, which is also the order module builds are
/// aggregated in - the original iteration order of an arbitrary map was
/// unstable, and output ordering matters for diff-based tooling downstream.
#[derive(Debug, Clone)]
pub struct Registry {
    modules: BTreeMap<String, Module>,
}

impl Registry {
    /// Create a registry containing only the root module.
    #[must_use]
    pub fn new() -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(ROOT_MODULE.to_string(), Module::new(ROOT_MODULE.to_string()));
        Self { modules }
    }

    /// Add (or fetch) the module at `path`, creating intermediate modules as
    /// needed, and return a mutable reference to it.
    pub fn add_module(&mut self, path: &str) -> &mut Module {
        let normalized = normalize_path(path);
        if normalized != ROOT_MODULE {
            // Materialize ancestors so subtree traversal sees every level.
            let segments: Vec<&str> = normalized.trim_start_matches('/').split('/').collect();
            for depth in 1..segments.len() {
                let ancestor = format!("/{}", segments[..depth].join("/"));
                self.modules.entry(ancestor.clone()).or_insert_with(|| Module::new(ancestor));
            }
        }
        self.modules.entry(normalized.clone()).or_insert_with(|| Module::new(normalized))
    }

    /// Look up a module by path.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::ModuleNotFound`] if no module exists at the
    /// normalized path.
    pub fn module(&self, path: &str) -> Result<&Module> {
        let normalized = normalize_path(path);
        self.modules.get(&normalized).ok_or(KraftError::ModuleNotFound { path: normalized })
    }

    /// Mutable lookup of a module by path.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::ModuleNotFound`] if no module exists at the
    /// normalized path.
    pub fn module_mut(&mut self, path: &str) -> Result<&mut Module> {
        let normalized = normalize_path(path);
        self.modules.get_mut(&normalized).ok_or(KraftError::ModuleNotFound { path: normalized })
    }

    /// Mutable reference to the root module.
    pub fn root_mut(&mut self) -> &mut Module {
        self.modules.get_mut(ROOT_MODULE).unwrap_or_else(|| unreachable!("root module always exists"))
    }

    /// All modules, in lexicographic path order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// All module paths, in lexicographic order.
    pub fn module_paths(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// The module at `path` plus all of its transitive children, in
    /// lexicographic path order.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::ModuleNotFound`] if the subtree root does not
    /// exist.
    pub fn subtree(&self, path: &str) -> Result<Vec<&Module>> {
        let normalized = normalize_path(path);
        if !self.modules.contains_key(&normalized) {
            return Err(KraftError::ModuleNotFound { path: normalized });
        }

        let child_prefix =
            if normalized == ROOT_MODULE { normalized.clone() } else { format!("{normalized}/") };

        Ok(self
            .modules
            .iter()
            .filter(|(path, _)| **path == normalized || path.starts_with(&child_prefix))
            .map(|(_, module)| module)
            .collect())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_normalize() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("auth"), "/auth");
        assert_eq!(normalize_path("/auth/"), "/auth");
        assert_eq!(normalize_path("auth/certs"), "/auth/certs");
    }

    #[test]
    fn labels_strip_leading_separator_and_join_with_dots() {
        assert_eq!(component_label("/moduleA/moduleB/widget"), "moduleA.moduleB.widget");
        assert_eq!(component_label("/widget"), "widget");
        assert_eq!(component_label("widget"), "widget");
    }

    #[test]
    fn insert_strips_extension_and_rejects_duplicates() {
        let mut registry = Registry::new();
        let root = registry.root_mut();
        root.insert_component(Component::template("guestbook.jsonnet", "{}")).unwrap();

        let err = root
            .insert_component(Component::raw("guestbook.yaml", serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(
            err,
            KraftError::AmbiguousComponent { ref name, .. } if name == "guestbook"
        ));

        assert_eq!(root.component("guestbook").unwrap().kind(), ComponentKind::NativeTemplate);
    }

    #[test]
    fn qualified_names_flatten_module_nesting() {
        let mut registry = Registry::new();
        let module = registry.add_module("auth/certs");
        module.insert_component(Component::template("ca", "{}")).unwrap();
        assert_eq!(module.qualified_name("ca"), "auth.certs.ca");
        assert_eq!(module.component_path("ca"), "/auth/certs/ca");

        let root = registry.module("/").unwrap();
        assert_eq!(root.qualified_name("web"), "web");
    }

    #[test]
    fn add_module_materializes_ancestors() {
        let mut registry = Registry::new();
        registry.add_module("a/b/c");
        assert!(registry.module("/a").is_ok());
        assert!(registry.module("/a/b").is_ok());
        assert_eq!(registry.module_paths(), vec!["/", "/a", "/a/b", "/a/b/c"]);
    }

    #[test]
    fn subtree_includes_transitive_children_only() {
        let mut registry = Registry::new();
        registry.add_module("auth");
        registry.add_module("auth/certs");
        registry.add_module("authn"); // sibling with shared prefix, not a child

        let subtree = registry.subtree("auth").unwrap();
        let paths: Vec<_> = subtree.iter().map(|m| m.path()).collect();
        assert_eq!(paths, vec!["/auth", "/auth/certs"]);

        let all = registry.subtree("/").unwrap();
        assert_eq!(all.len(), 4);

        assert!(matches!(registry.subtree("/nope"), Err(KraftError::ModuleNotFound { .. })));
    }

    #[test]
    fn module_lookup_reports_missing_path() {
        let registry = Registry::new();
        let err = registry.module("missing").unwrap_err();
        assert_eq!(err.to_string(), "module \"/missing\" not found");
    }
}
