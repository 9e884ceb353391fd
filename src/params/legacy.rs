//! Legacy parameter-document cleanup.
//!
//! Older generated environment parameter files import the component params
//! with a relative path. The import stops resolving once parameters are
//! merged across modules, so it is transparently rewritten to reference the
//! externally injected parameter variable instead. The rewrite is a warning,
//! not an error: stale generated files must not hard-fail builds.

use crate::eval::PARAMS_EXT_VAR;
use regex::Regex;
use std::sync::LazyLock;

static RE_PARAM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)import "\.\./\.\./components/params\.libsonnet""#)
        .unwrap_or_else(|e| unreachable!("invalid params import pattern: {e}"))
});

/// Rewrite legacy relative params imports to reference the reserved external
/// variable, emitting one warning per occurrence. Documents without the
/// legacy import are returned unchanged and produce no warning.
#[must_use]
pub fn rewrite_legacy_imports(env_name: &str, input: &str) -> String {
    let occurrences = RE_PARAM_IMPORT.find_iter(input).count();
    if occurrences == 0 {
        return input.to_string();
    }

    for _ in 0..occurrences {
        tracing::warn!(
            environment = %env_name,
            "rewriting environment params to not use relative paths"
        );
    }

    RE_PARAM_IMPORT
        .replace_all(input, format!(r#"std.extVar("{PARAMS_EXT_VAR}")"#).as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_relative_import() {
        let input = r#"local params = import "../../components/params.libsonnet";
params + { components: {} }"#;

        let out = rewrite_legacy_imports("default", input);
        assert!(!out.contains("../../components/params.libsonnet"));
        assert!(out.contains(r#"std.extVar("__ksonnet/params")"#));
    }

    #[test]
    fn leaves_clean_documents_untouched() {
        let input = r#"local params = std.extVar("__ksonnet/params");"#;
        assert_eq!(rewrite_legacy_imports("default", input), input);
    }

    #[test]
    fn rewrites_every_occurrence() {
        let input = r#"a = import "../../components/params.libsonnet";
b = import "../../components/params.libsonnet";"#;
        let out = rewrite_legacy_imports("default", input);
        assert_eq!(out.matches("std.extVar").count(), 2);
    }
}
