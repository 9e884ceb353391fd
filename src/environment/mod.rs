//! Deployment environment records.
//!
//! An [`Environment`] names a deployment target: a destination (API server
//! address plus namespace), an override flag distinguishing environment-local
//! overlays from canonical definitions, and an optional orchestration API
//! version. Environments are created and mutated elsewhere; the build
//! pipeline only reads them, through the [`Environments`] store.

use crate::core::{KraftError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an environment's objects are submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Address of the orchestration API server.
    pub server: String,
    /// Namespace objects are created in.
    pub namespace: String,
}

impl Destination {
    /// Create a destination from a server address and namespace.
    #[must_use]
    pub fn new(server: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            namespace: namespace.into(),
        }
    }
}

/// One named deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    name: String,
    /// Destination address and namespace.
    pub destination: Destination,
    /// Whether this record is an environment-local overlay rather than a
    /// canonical environment definition.
    #[serde(default)]
    pub is_override: bool,
    /// Orchestration API version the environment targets, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl Environment {
    /// Create an environment record.
    #[must_use]
    pub fn new(name: impl Into<String>, destination: Destination) -> Self {
        Self {
            name: name.into(),
            destination,
            is_override: false,
            api_version: None,
        }
    }

    /// Mark the environment as an override overlay.
    #[must_use]
    pub fn with_override(mut self, is_override: bool) -> Self {
        self.is_override = is_override;
        self
    }

    /// Pin the orchestration API version.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// The environment's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Read-only store of environment records, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Environments {
    inner: BTreeMap<String, Environment>,
}

impl Environments {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an environment, replacing any record with the same name.
    pub fn insert(&mut self, env: Environment) {
        self.inner.insert(env.name().to_string(), env);
    }

    /// Look up an environment by name.
    ///
    /// # Errors
    ///
    /// Returns [`KraftError::EnvironmentNotFound`] naming the identifier
    /// that failed to resolve.
    pub fn get(&self, name: &str) -> Result<&Environment> {
        self.inner.get(name).ok_or_else(|| KraftError::EnvironmentNotFound {
            name: name.to_string(),
        })
    }

    /// Environment names, in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// All environments, in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.inner.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_reports_missing_name() {
        let mut store = Environments::new();
        store.insert(Environment::new("default", Destination::new("https://localhost:6443", "dev")));

        assert_eq!(store.get("default").unwrap().destination.namespace, "dev");
        let err = store.get("staging").unwrap_err();
        assert!(matches!(err, KraftError::EnvironmentNotFound { ref name } if name == "staging"));
    }

    #[test]
    fn builder_options_apply() {
        let env = Environment::new("us-west", Destination::new("https://example.com", "prod"))
            .with_override(true)
            .with_api_version("version:v1.25.0");
        assert!(env.is_override);
        assert_eq!(env.api_version.as_deref(), Some("version:v1.25.0"));
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let env = Environment::new("default", Destination::new("s", "ns"));
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("api_version"));
    }
}
