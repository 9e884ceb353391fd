//! Core types and error handling for kraft.
//!
//! This module anchors the crate's error model. Fallible operations deep in
//! the build return the strongly-typed [`KraftError`]; the pipeline facade
//! wraps them in [`anyhow::Error`] with call-site context, so callers get one
//! terminating error per failed build invocation that still names the module,
//! component, and environment involved.

mod error;

pub use error::{KraftError, Result};
