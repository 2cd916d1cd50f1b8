//! Environment-variable names that differ between the two runners.

use swc_core::ecma::ast::{Str, Tpl};

pub const LEGACY_WORKER_ID: &str = "JEST_WORKER_ID";
pub const TARGET_WORKER_ID: &str = "VITEST_POOL_ID";

/// Replacement for a property name, `process.env.JEST_WORKER_ID`.
pub fn rename_ident(sym: &str) -> Option<&'static str> {
    (sym == LEGACY_WORKER_ID).then_some(TARGET_WORKER_ID)
}

/// Replacement text for a string literal, keeping its quote character.
pub fn rename_str(lit: &Str, raw: &str) -> Option<String> {
    if lit.value.as_ref() != LEGACY_WORKER_ID {
        return None;
    }
    let quote = raw.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    Some(format!("{quote}{TARGET_WORKER_ID}{quote}"))
}

/// Replacement text for a template literal without substitutions.
pub fn rename_tpl(tpl: &Tpl) -> Option<String> {
    let [quasi] = tpl.quasis.as_slice() else {
        return None;
    };
    if !tpl.exprs.is_empty() || quasi.raw.as_ref() != LEGACY_WORKER_ID {
        return None;
    }
    Some(format!("`{TARGET_WORKER_ID}`"))
}
