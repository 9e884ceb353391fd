//! The build pipeline facade.
//!
//! A [`Pipeline`] binds one target environment and drives the whole build:
//! enumerate modules, build each module's objects (fanned out across worker
//! tasks), and concatenate the results in deterministic module order. The
//! pipeline owns no persistent state - it holds only the inputs needed for
//! one build and is safely discarded afterward.
//!
//! Per-module builds are mutually independent: they read disjoint parameter
//! documents and write disjoint slices of the result set, so they run
//! concurrently on blocking worker threads, each with its own engine
//! instance. The fan-out preserves input order when collecting
//! ([`futures::StreamExt::buffered`]), so output ordering is lexicographic
//! by module path regardless of completion order - downstream diffing and
//! reproducible apply operations depend on that.
//!
//! The engine has no built-in timeout; each module build runs under a
//! configurable deadline and expiry is a fatal build error. An `Objects`
//! call is all-or-nothing: any module failure fails the whole invocation.

use crate::build::{self, BuiltObject};
use crate::core::KraftError;
use crate::eval::{self, EvaluatorFactory};
use crate::params;
use crate::project::Project;
use crate::registry::Registry;
use anyhow::{Context as _, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// Default per-module evaluation deadline.
pub const DEFAULT_EVAL_DEADLINE: Duration = Duration::from_secs(300);

/// Default number of module builds in flight.
pub const DEFAULT_MAX_PARALLEL: usize = 8;

/// The build pipeline for one environment.
pub struct Pipeline {
    project: Arc<Project>,
    registry: Arc<Registry>,
    env_name: String,
    factory: Arc<dyn EvaluatorFactory>,
    eval_deadline: Duration,
    max_parallel: usize,
}

impl Pipeline {
    /// Create a pipeline bound to `env_name`.
    ///
    /// The environment's existence is checked when a build runs, not here -
    /// constructing a pipeline is infallible.
    pub fn new(
        project: Project,
        registry: Registry,
        env_name: impl Into<String>,
        factory: Arc<dyn EvaluatorFactory>,
    ) -> Self {
        let env_name = env_name.into();
        tracing::debug!(environment = %env_name, "creating build pipeline");
        Self {
            project: Arc::new(project),
            registry: Arc::new(registry),
            env_name,
            factory,
            eval_deadline: DEFAULT_EVAL_DEADLINE,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Override the per-module evaluation deadline.
    #[must_use]
    pub fn with_eval_deadline(mut self, deadline: Duration) -> Self {
        self.eval_deadline = deadline;
        self
    }

    /// Override how many module builds run concurrently.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// The environment this pipeline builds for.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.env_name
    }

    /// Paths of the modules that belong to this pipeline, in build order.
    #[must_use]
    pub fn modules(&self) -> Vec<String> {
        self.registry.module_paths()
    }

    /// Qualified names of the components that belong to this pipeline,
    /// restricted by `filter` when non-empty.
    #[must_use]
    pub fn components(&self, filter: &[String]) -> Vec<String> {
        self.registry
            .modules()
            .flat_map(|module| {
                module
                    .components()
                    .map(|component| module.qualified_name(component.name()))
                    .collect::<Vec<_>>()
            })
            .filter(|name| filter.is_empty() || filter.contains(name))
            .collect()
    }

    /// Build all objects for the bound environment.
    ///
    /// `filter` is an allow-list of qualified component names; when
    /// non-empty, a component not named in it contributes no objects even if
    /// its module is visited. Results concatenate in module traversal order
    /// (lexicographic by path).
    ///
    /// # Errors
    ///
    /// All-or-nothing: the first module failure fails the call, with the
    /// offending module named in the context chain.
    pub async fn objects(&self, filter: &[String]) -> Result<Vec<BuiltObject>> {
        // Fail fast on an unknown environment instead of once per module.
        self.project.environment(&self.env_name)?;

        let module_paths = self.registry.module_paths();
        let builds = module_paths.into_iter().map(|path| {
            let project = Arc::clone(&self.project);
            let registry = Arc::clone(&self.registry);
            let factory = Arc::clone(&self.factory);
            let env_name = self.env_name.clone();
            let filter = filter.to_vec();
            let deadline = self.eval_deadline;

            async move {
                tracing::debug!(module = %path, environment = %env_name, "building objects");

                let build_path = path.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    build::build_module_objects(
                        &project,
                        &registry,
                        &build_path,
                        &env_name,
                        &filter,
                        factory.as_ref(),
                    )
                });

                match tokio::time::timeout(deadline, handle).await {
                    Err(_) => Err(KraftError::EvaluationTimeout {
                        module: path,
                        seconds: deadline.as_secs(),
                    }
                    .into()),
                    Ok(joined) => joined
                        .context("module build task panicked")?
                        .with_context(|| format!("building module \"{path}\"")),
                }
            }
        });

        // buffered() preserves input order, so output ordering stays
        // deterministic no matter which module finishes first.
        let results: Vec<Result<Vec<BuiltObject>>> =
            futures::stream::iter(builds).buffered(self.max_parallel).collect().await;

        let mut objects = Vec::new();
        for result in results {
            objects.extend(result?);
        }
        Ok(objects)
    }

    /// Build all objects and serialize them as a multi-document YAML stream.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::objects`] failures and YAML serialization errors.
    pub async fn yaml(&self, filter: &[String]) -> Result<String> {
        let objects = self.objects(filter).await?;

        let mut out = String::new();
        for (index, object) in objects.iter().enumerate() {
            if index > 0 {
                out.push_str("---\n");
            }
            out.push_str(&serde_yaml::to_string(object).map_err(KraftError::Yaml)?);
        }
        Ok(out)
    }

    /// Resolve one module's parameter document for the bound environment and
    /// evaluate the environment overlay against it, without running the
    /// object build.
    ///
    /// With `inherited` set, parameters carry the full global-plus-override
    /// values; otherwise a zero-valued stub (component names present, values
    /// empty) is used, so one module can be previewed in isolation.
    ///
    /// # Errors
    ///
    /// Lookup, resolution, and evaluation failures surface as
    /// [`KraftError`]; object decoding never runs here.
    pub fn env_parameters(&self, module_path: &str, inherited: bool) -> Result<String, KraftError> {
        let params = if inherited {
            params::resolved_params(&self.registry, module_path, &self.env_name)?
        } else {
            params::stub_params(&self.registry, module_path)?
        };

        let overlay = self.project.environment_params(&self.env_name)?;
        let overlay = params::rewrite_legacy_imports(&self.env_name, &overlay);

        let mut evaluator = self.factory.create();
        eval::evaluate_with_params(
            evaluator.as_mut(),
            &self.project.search_paths(&self.env_name),
            &params.to_string(),
            build::PARAMS_SNIPPET,
            &overlay,
        )
    }
}
