//! The template evaluator seam.
//!
//! kraft drives an external template engine but does not implement one. The
//! whole dependency is the [`Evaluator`] trait: an engine accepts search
//! paths, external variables carrying JSON text, and snippets to evaluate.
//! Engine failures - syntax errors, runtime errors, unresolved imports -
//! propagate unchanged as build failures; kraft never interprets or retries
//! them.
//!
//! This module's own responsibility is input composition, done in
//! [`evaluate_with_params`]: search paths are assembled in a fixed priority
//! order (first match wins) and the merged parameter document is injected
//! under the reserved [`PARAMS_EXT_VAR`] name before delegating.
//!
//! The engine instance is CPU-bound and stateless between calls. Concurrent
//! module builds each take a fresh instance from an [`EvaluatorFactory`]
//! rather than sharing one, so reentrancy is never a question.
//!
//! A Tera-backed engine ships in [`tera`].

pub mod tera;

use crate::core::{KraftError, Result};
use std::path::{Path, PathBuf};

/// Reserved external-variable name the merged parameter document is injected
/// under. Snippets - including rewritten legacy parameter files - reference
/// parameters through this variable.
pub const PARAMS_EXT_VAR: &str = "__ksonnet/params";

/// The template engine interface.
///
/// kraft depends only on this shape, not on any engine's internals.
/// Implementations must be deterministic given identical inputs.
pub trait Evaluator: Send {
    /// Append a directory to the engine's import search path. Paths are
    /// consulted in insertion order; the first match wins.
    fn add_search_path(&mut self, path: &Path);

    /// Bind an external variable to a JSON-encoded value.
    fn set_external_var(&mut self, name: &str, json_text: &str);

    /// Evaluate one snippet, returning its output text.
    ///
    /// # Errors
    ///
    /// Engine failures surface as [`KraftError::Evaluation`] with the
    /// engine's message verbatim.
    fn evaluate_snippet(&mut self, label: &str, snippet: &str) -> Result<String>;
}

/// Produces one engine instance per module build.
///
/// Implemented for any `Fn() -> Box<dyn Evaluator>` closure, so a factory is
/// usually just `Arc::new(|| Box::new(SomeEngine::new()) as Box<dyn Evaluator>)`.
pub trait EvaluatorFactory: Send + Sync {
    /// Create a fresh, independent engine instance.
    fn create(&self) -> Box<dyn Evaluator>;
}

impl<F> EvaluatorFactory for F
where
    F: Fn() -> Box<dyn Evaluator> + Send + Sync,
{
    fn create(&self) -> Box<dyn Evaluator> {
        self()
    }
}

/// Compose evaluator inputs and delegate one snippet evaluation: search
/// paths are added in the given priority order and the merged parameter
/// document is bound to [`PARAMS_EXT_VAR`].
///
/// # Errors
///
/// Propagates the engine's error verbatim.
pub fn evaluate_with_params(
    evaluator: &mut dyn Evaluator,
    search_paths: &[PathBuf],
    params_json: &str,
    label: &str,
    snippet: &str,
) -> Result<String> {
    for path in search_paths {
        evaluator.add_search_path(path);
    }
    evaluator.set_external_var(PARAMS_EXT_VAR, params_json);

    tracing::debug!(label, paths = search_paths.len(), "evaluating snippet");
    evaluator.evaluate_snippet(label, snippet)
}
