//! Project root abstraction.
//!
//! A [`Project`] ties together everything a build reads besides the
//! component tree itself: the environment records, each environment's
//! parameter overlay snippet, and the directory layout that feeds the
//! evaluator's search paths:
//!
//! ```text
//! <root>/
//!   components/<module>/params.json          per-module global params
//!   environments/<name>/params.libsonnet     per-environment overlay
//!   environments/<name>/<module>/params.json per-module override params
//!   lib/                                     project library code
//!   vendor/                                  vendored dependencies
//! ```
//!
//! Search paths are consulted in a fixed priority order, first match wins:
//! the environment-specific library path (if configured), the environment
//! directory, `lib/`, then `vendor/`.
//!
//! A project can also be assembled fully in memory ([`Project::in_memory`])
//! for embedding and tests; overlay snippets set via
//! [`Project::set_environment_params`] shadow anything on disk.

use crate::core::{KraftError, Result};
use crate::environment::{Environment, Environments};
use crate::registry::Registry;
use anyhow::Context as _;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of an environment's parameter overlay.
pub const ENV_PARAMS_FILE: &str = "params.libsonnet";

/// File name of a module's parameter document (global or override).
pub const MODULE_PARAMS_FILE: &str = "params.json";

/// Directory under the project root holding environment definitions.
pub const ENVIRONMENTS_DIR: &str = "environments";

/// Directory under the project root holding module component trees.
pub const COMPONENTS_DIR: &str = "components";

/// Project-level inputs for one or more builds.
#[derive(Debug, Clone, Default)]
pub struct Project {
    root: Option<PathBuf>,
    environments: Environments,
    env_params: BTreeMap<String, String>,
    env_lib_paths: BTreeMap<String, PathBuf>,
}

impl Project {
    /// Create a project with no backing directory. All parameter overlays
    /// must be supplied via [`Self::set_environment_params`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create a project rooted at a directory on disk.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// The project root, if the project is disk-backed.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Register an environment record.
    pub fn add_environment(&mut self, env: Environment) {
        self.environments.insert(env);
    }

    /// The environment store.
    #[must_use]
    pub fn environments(&self) -> &Environments {
        &self.environments
    }

    /// Look up an environment by name.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::EnvironmentNotFound`] for unknown names.
    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments.get(name)
    }

    /// Set an environment's parameter overlay snippet, shadowing any
    /// on-disk `params.libsonnet`.
    pub fn set_environment_params(&mut self, env_name: impl Into<String>, snippet: impl Into<String>) {
        self.env_params.insert(env_name.into(), snippet.into());
    }

    /// Configure an environment-specific library path, consulted before all
    /// other search paths.
    pub fn set_environment_lib_path(&mut self, env_name: impl Into<String>, path: impl Into<PathBuf>) {
        self.env_lib_paths.insert(env_name.into(), path.into());
    }

    /// The environment's parameter overlay snippet: the in-memory value if
    /// set, otherwise `environments/<name>/params.libsonnet` from disk.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::EnvironmentNotFound`] for unknown environments
    /// and [`KraftError::EnvironmentParams`] when the overlay cannot be
    /// read.
    pub fn environment_params(&self, env_name: &str) -> Result<String> {
        let env = self.environments.get(env_name)?;

        if let Some(snippet) = self.env_params.get(env.name()) {
            return Ok(snippet.clone());
        }

        let Some(dir) = self.environment_dir(env.name()) else {
            return Err(KraftError::EnvironmentParams {
                environment: env.name().to_string(),
                reason: "no parameter overlay set and project has no root directory".to_string(),
            });
        };

        let path = dir.join(ENV_PARAMS_FILE);
        std::fs::read_to_string(&path).map_err(|e| KraftError::EnvironmentParams {
            environment: env.name().to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }

    /// The environment's directory under the project root, if disk-backed.
    #[must_use]
    pub fn environment_dir(&self, env_name: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(ENVIRONMENTS_DIR).join(env_name))
    }

    /// The project `lib/` directory, if disk-backed.
    #[must_use]
    pub fn lib_dir(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join("lib"))
    }

    /// The project `vendor/` directory, if disk-backed.
    #[must_use]
    pub fn vendor_dir(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join("vendor"))
    }

    /// Evaluator search paths for an environment, in priority order:
    /// environment-specific library path, environment directory, project
    /// `lib/`, project `vendor/`.
    #[must_use]
    pub fn search_paths(&self, env_name: &str) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(4);
        if let Some(lib) = self.env_lib_paths.get(env_name) {
            paths.push(lib.clone());
        }
        if let Some(dir) = self.environment_dir(env_name) {
            paths.push(dir);
        }
        if let Some(lib) = self.lib_dir() {
            paths.push(lib);
        }
        if let Some(vendor) = self.vendor_dir() {
            paths.push(vendor);
        }
        paths
    }

    /// Load parameter documents for every module in `registry` from disk:
    /// the global document from `components/<module>/params.json` and the
    /// override for `env_name` from
    /// `environments/<env_name>/<module>/params.json`. Modules without a
    /// file on disk keep their current documents, and an in-memory project
    /// loads nothing.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::EnvironmentNotFound`] for an unknown
    /// environment and [`KraftError::ParamResolution`] naming the module
    /// and environment when a file exists but cannot be read or parsed.
    pub fn load_params(&self, registry: &mut Registry, env_name: &str) -> Result<()> {
        let env = self.environments.get(env_name)?;
        let Some(root) = self.root.as_ref() else {
            return Ok(());
        };

        let components_dir = root.join(COMPONENTS_DIR);
        let env_dir = root.join(ENVIRONMENTS_DIR).join(env.name());

        for path in registry.module_paths() {
            let relative = path.trim_matches('/');

            let global_file = join_module(&components_dir, relative).join(MODULE_PARAMS_FILE);
            if let Some(doc) = load_params_file(&global_file, &path, env.name())? {
                tracing::debug!(module = %path, file = %global_file.display(), "loaded global params");
                registry.module_mut(&path)?.set_global_params(doc);
            }

            let override_file = join_module(&env_dir, relative).join(MODULE_PARAMS_FILE);
            if let Some(doc) = load_params_file(&override_file, &path, env.name())? {
                tracing::debug!(module = %path, file = %override_file.display(), "loaded override params");
                registry.module_mut(&path)?.set_env_override(env.name(), doc);
            }
        }
        Ok(())
    }
}

fn join_module(base: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() { base.to_path_buf() } else { base.join(relative) }
}

fn load_params_file(file: &Path, module: &str, env_name: &str) -> Result<Option<Value>> {
    if !file.is_file() {
        return Ok(None);
    }
    read_params_file(file)
        .map(Some)
        .map_err(|e| KraftError::ParamResolution {
            module: module.to_string(),
            environment: env_name.to_string(),
            reason: format!("{e:#}"),
        })
}

/// Read and parse a parameter document from a JSON file.
///
/// The file must hold the standard `{"components": {...}}` shape; shape
/// validation happens at resolution time, this only requires well-formed
/// JSON.
///
/// # Errors
///
/// IO and parse failures are returned with the file path in the context.
pub fn read_params_file(path: &Path) -> anyhow::Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading parameter file {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("parsing parameter file {}", path.display()))
}
