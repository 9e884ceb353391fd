//! Error types for the build pipeline.
//!
//! Failures are grouped the way a caller needs to react to them:
//!
//! - **Lookup errors** - a module, component, or environment name failed to
//!   resolve. Always fatal to the requested operation, never retried.
//! - **Resolution errors** - a parameter document was malformed or
//!   unreadable. Fatal; identifies the module and environment.
//! - **Evaluation errors** - surfaced verbatim from the template engine
//!   (syntax or runtime). Fatal; kraft never interprets or retries them.
//! - **Decode errors** - evaluator output was not a well-formed mapping, or a
//!   component entry failed to decode as a resource. Fatal; names the
//!   offending component.
//! - **Ambiguity errors** - two files map to the same component name. Fatal
//!   at registration time; the build refuses to proceed past such a module.
//!
//! The legacy relative-import rewrite is deliberately *not* an error: it is
//! logged as a warning and the build continues (see
//! [`crate::params::rewrite_legacy_imports`]).

use thiserror::Error;

/// Convenience alias for operations that fail with [`KraftError`].
pub type Result<T> = std::result::Result<T, KraftError>;

/// The error type for all kraft build operations.
///
/// Every variant carries enough context to identify where the build stopped
/// without the caller having to reconstruct it: module paths, component
/// names, and environment names are embedded in the variants that concern
/// them.
#[derive(Error, Debug)]
pub enum KraftError {
    /// No module exists at the requested path.
    #[error("module \"{path}\" not found")]
    ModuleNotFound {
        /// The `/`-delimited module path that failed to resolve.
        path: String,
    },

    /// No component with the given name exists in the module.
    #[error("component \"{name}\" not found in module \"{module}\"")]
    ComponentNotFound {
        /// Path of the module that was searched.
        module: String,
        /// Local component name that failed to resolve.
        name: String,
    },

    /// No environment with the given name is defined for the project.
    #[error("environment \"{name}\" not found")]
    EnvironmentNotFound {
        /// The environment name that failed to resolve.
        name: String,
    },

    /// Two component files map to the same name once extensions are
    /// stripped. The module is unusable until the collision is resolved.
    #[error("found multiple component files with component name \"{name}\" in module \"{module}\"")]
    AmbiguousComponent {
        /// Path of the module containing the collision.
        module: String,
        /// The colliding component name (extension stripped).
        name: String,
    },

    /// A parameter document could not be read or merged.
    ///
    /// Resolution never partially succeeds; this aborts the whole module's
    /// contribution to the build.
    #[error("resolving params for module \"{module}\" in environment \"{environment}\": {reason}")]
    ParamResolution {
        /// Module whose parameters were being resolved.
        module: String,
        /// Environment the resolution targeted.
        environment: String,
        /// What went wrong, verbatim from the underlying source.
        reason: String,
    },

    /// The environment-level parameter overlay could not be read.
    #[error("reading parameter overlay for environment \"{environment}\": {reason}")]
    EnvironmentParams {
        /// Environment whose overlay was requested.
        environment: String,
        /// What went wrong.
        reason: String,
    },

    /// The template engine reported a syntax or runtime failure.
    ///
    /// The message is passed through unmodified; kraft does not interpret
    /// engine errors.
    #[error("evaluating {label}: {message}")]
    Evaluation {
        /// The snippet label the engine was given (e.g. `components`).
        label: String,
        /// The engine's error text, verbatim.
        message: String,
    },

    /// A module build did not finish inside the configured deadline.
    ///
    /// The engine has no built-in timeout, so the pipeline imposes one and
    /// treats expiry as a fatal build error rather than an infinite
    /// suspension.
    #[error("building module \"{module}\" exceeded the {seconds}s evaluation deadline")]
    EvaluationTimeout {
        /// Module whose build timed out.
        module: String,
        /// The deadline that expired, in seconds.
        seconds: u64,
    },

    /// Evaluator output (or a patched document) failed to decode as a
    /// structured resource object.
    #[error("decoding component \"{component}\": {reason}")]
    Decode {
        /// Qualified name of the offending component.
        component: String,
        /// Why the decode failed.
        reason: String,
    },

    /// YAML serialization of built objects failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
