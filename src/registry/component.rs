//! Component definitions.
//!
//! A component is one parameterized resource template (or raw document)
//! belonging to a module. The two kinds form a closed set:
//!
//! - [`ComponentKind::NativeTemplate`] - the body is template-language source
//!   text, evaluated by the external engine
//! - [`ComponentKind::RawDocument`] - the body is an already-concrete
//!   document; parameters are applied via a merge patch, not templating

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The declared kind of a component.
///
/// Anything not explicitly registered as a raw document is treated as a
/// native template; members of evaluated `List` wrappers have no independent
/// kind entry and default to [`Self::NativeTemplate`] as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// Body written in the template language, evaluated by the engine.
    NativeTemplate,
    /// Body is a concrete document, parameter-substituted by patching.
    RawDocument,
}

impl ComponentKind {
    /// String form used in logs and serialized side tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NativeTemplate => "native-template",
            Self::RawDocument => "raw-document",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native-template" => Ok(Self::NativeTemplate),
            "raw-document" => Ok(Self::RawDocument),
            other => Err(format!("unknown component kind: {other}")),
        }
    }
}

/// The body of a component, matching its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentBody {
    /// Template-language source text.
    Template(String),
    /// A parsed concrete document.
    Raw(Value),
}

/// One component definition: a local name, a kind, and a body.
///
/// Names are unique within a module after file-extension stripping; the
/// module enforces that on insert. The component itself is immutable for the
/// duration of a build.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    name: String,
    kind: ComponentKind,
    body: ComponentBody,
}

impl Component {
    /// Create a native-template component from template source text.
    ///
    /// `name` may carry a file extension (`guestbook.jsonnet`); the module
    /// strips it on insert.
    #[must_use]
    pub fn template(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::NativeTemplate,
            body: ComponentBody::Template(source.into()),
        }
    }

    /// Create a raw-document component from a parsed document.
    #[must_use]
    pub fn raw(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::RawDocument,
            body: ComponentBody::Raw(document),
        }
    }

    /// The component's local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// The component's declared kind.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// The component's body.
    #[must_use]
    pub const fn body(&self) -> &ComponentBody {
        &self.body
    }

    /// Render the component as a snippet expression for the composite
    /// document. Template bodies are spliced verbatim; raw documents are
    /// serialized to JSON, which the engine passes through unchanged.
    #[must_use]
    pub fn snippet(&self) -> String {
        match &self.body {
            ComponentBody::Template(source) => source.clone(),
            ComponentBody::Raw(document) => document.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [ComponentKind::NativeTemplate, ComponentKind::RawDocument] {
            assert_eq!(kind.as_str().parse::<ComponentKind>().unwrap(), kind);
        }
        assert!("grafana-dashboard".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn raw_snippet_is_json() {
        let c = Component::raw("cfg", json!({"kind": "ConfigMap"}));
        assert_eq!(c.snippet(), r#"{"kind":"ConfigMap"}"#);
        assert_eq!(c.kind(), ComponentKind::RawDocument);
    }

    #[test]
    fn template_snippet_is_verbatim() {
        let c = Component::template("svc", "{ kind: 'Service' }");
        assert_eq!(c.snippet(), "{ kind: 'Service' }");
        assert_eq!(c.kind(), ComponentKind::NativeTemplate);
    }
}
