//! kraft - a manifest build pipeline.
//!
//! kraft turns a hierarchical tree of declarative "components" (parameterized
//! resource templates) into concrete, environment-specific Kubernetes-style
//! objects, ready for submission to an orchestration API.
//!
//! # Architecture Overview
//!
//! A build runs through five layers, leaves first:
//!
//! - [`registry`] - the module/component tree: a hierarchical namespace
//!   holding component definitions, addressed by `/`-delimited paths
//! - [`params`] - the parameter resolver: merges global defaults with
//!   environment-specific overrides into one document per module
//! - [`eval`] - the template evaluator seam: composes search paths and
//!   external variables, then delegates snippet evaluation to a pluggable
//!   engine (a Tera-backed engine ships in [`eval::tera`])
//! - [`build`] - the object builder: renders components, resolves
//!   parameters, invokes the evaluator, patches raw documents, flattens
//!   `v1`/`List` wrappers, and labels every resulting object
//! - [`pipeline`] - the facade: binds one target environment and an optional
//!   component filter, fans module builds out across worker tasks, and
//!   serializes the result as structured objects or YAML
//!
//! Two supporting layers hold the inputs: [`environment`] (deployment target
//! records) and [`project`] (project root layout and parameter file IO).
//! Error types live in [`core`].
//!
//! # Component Model
//!
//! Components come in two kinds. *Native-template* components are written in
//! the template language and evaluated by the engine. *Raw-document*
//! components are already-concrete documents; they still receive parameter
//! substitution, via a merge patch derived from the module's global
//! parameters instead of templating.
//!
//! Every built object carries a `ksonnet.io/component` label naming its
//! originating component, with nested module paths joined by `.` - so the
//! component at `/moduleA/moduleB/widget` labels its objects
//! `moduleA.moduleB.widget`.
//!
//! # Example
//!
//! ```rust,no_run
//! use kraft::environment::{Destination, Environment};
//! use kraft::eval::tera::TeraEvaluator;
//! use kraft::pipeline::Pipeline;
//! use kraft::project::Project;
//! use kraft::registry::{Component, Registry};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut project = Project::in_memory();
//! project.add_environment(Environment::new(
//!     "default",
//!     Destination::new("https://localhost:6443", "dev"),
//! ));
//! project.set_environment_params(
//!     "default",
//!     r#"{{ extVar(name="__ksonnet/params") | json_encode() }}"#,
//! );
//!
//! let mut registry = Registry::new();
//! let root = registry.root_mut();
//! root.insert_component(Component::template(
//!     "guestbook.jsonnet",
//!     r#"{"apiVersion": "v1", "kind": "Service", "metadata": {"name": "guestbook"}}"#,
//! ))?;
//!
//! let pipeline = Pipeline::new(project, registry, "default", Arc::new(TeraEvaluator::factory()));
//! let yaml = pipeline.yaml(&[]).await?;
//! println!("{yaml}");
//! # Ok(())
//! # }
//! ```

// Core error types
pub mod core;

// Input model: component tree, environments, project layout
pub mod environment;
pub mod project;
pub mod registry;

// Build machinery
pub mod build;
pub mod eval;
pub mod params;
pub mod pipeline;
