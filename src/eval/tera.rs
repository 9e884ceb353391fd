//! Tera-backed template engine.
//!
//! [`TeraEvaluator`] implements the [`Evaluator`] seam with the Tera
//! templating engine. Snippets are Tera templates that render to JSON text:
//!
//! - external variables are exposed through the `extVar` function,
//!   `{{ extVar(name="__ksonnet/params") | json_encode() }}`
//! - library files are spliced with the `library` function,
//!   `{{ library(path="app.libsonnet") }}`, resolved against the configured
//!   search paths in priority order - the first path containing the file
//!   wins
//!
//! A fresh Tera instance is created per snippet evaluation (Tera instances
//! are cheap - empty hash maps), and a fresh `TeraEvaluator` per module
//! build keeps concurrent builds fully independent.

use super::{Evaluator, EvaluatorFactory};
use crate::core::{KraftError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::{Context, Tera, Value};

/// A sandboxed Tera engine behind the [`Evaluator`] interface.
#[derive(Debug, Default)]
pub struct TeraEvaluator {
    search_paths: Vec<PathBuf>,
    ext_vars: HashMap<String, String>,
}

impl TeraEvaluator {
    /// Create an engine with no search paths or external variables bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory producing one fresh engine per module build.
    #[must_use]
    pub fn factory() -> impl EvaluatorFactory {
        || Box::new(Self::new()) as Box<dyn Evaluator>
    }

    /// Flatten a Tera error chain into one message, dropping the unhelpful
    /// internal `__tera_one_off` template name.
    fn flatten_error(error: &tera::Error) -> String {
        let mut messages = Vec::new();
        let mut current: Option<&dyn std::error::Error> = Some(error);
        while let Some(err) = current {
            let cleaned = err
                .to_string()
                .replace("Failed to render '__tera_one_off'", "render failed")
                .replace("Failed to parse '__tera_one_off'", "syntax error")
                .replace("'__tera_one_off'", "snippet")
                .trim()
                .to_string();
            if !cleaned.is_empty() {
                messages.push(cleaned);
            }
            current = err.source();
        }
        messages.join(": ")
    }
}

impl Evaluator for TeraEvaluator {
    fn add_search_path(&mut self, path: &Path) {
        self.search_paths.push(path.to_path_buf());
    }

    fn set_external_var(&mut self, name: &str, json_text: &str) {
        self.ext_vars.insert(name.to_string(), json_text.to_string());
    }

    fn evaluate_snippet(&mut self, label: &str, snippet: &str) -> Result<String> {
        let mut tera = Tera::default();

        let ext_vars = self.ext_vars.clone();
        tera.register_function(
            "extVar",
            move |args: &HashMap<String, Value>| -> tera::Result<Value> {
                let name = args
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| tera::Error::msg("extVar requires a `name` argument"))?;
                let json_text = ext_vars
                    .get(name)
                    .ok_or_else(|| tera::Error::msg(format!("undefined external variable \"{name}\"")))?;
                serde_json::from_str(json_text).map_err(|e| {
                    tera::Error::msg(format!("external variable \"{name}\" is not valid JSON: {e}"))
                })
            },
        );

        let search_paths = self.search_paths.clone();
        tera.register_function(
            "library",
            move |args: &HashMap<String, Value>| -> tera::Result<Value> {
                let rel = args
                    .get("path")
                    .and_then(Value::as_str)
                    .ok_or_else(|| tera::Error::msg("library requires a `path` argument"))?;
                // First search path containing the file wins.
                for base in &search_paths {
                    let candidate = base.join(rel);
                    if candidate.is_file() {
                        let contents = std::fs::read_to_string(&candidate).map_err(|e| {
                            tera::Error::msg(format!("reading {}: {e}", candidate.display()))
                        })?;
                        return Ok(Value::String(contents));
                    }
                }
                Err(tera::Error::msg(format!("\"{rel}\" not found in any search path")))
            },
        );

        let context = Context::new();
        tera.render_str(snippet, &context).map_err(|e| KraftError::Evaluation {
            label: label.to_string(),
            message: Self::flatten_error(&e),
        })
    }
}
