//! Import bookkeeping: what the rewritten file needs from the target module,
//! what the file already imports, and where new declarations go.

use std::collections::BTreeSet;
use std::ops::Range;

use swc_core::ecma::ast::{ImportDecl, ImportSpecifier, ModuleDecl, ModuleExportName, ModuleItem, Program};

use crate::source::SourceUnit;
use crate::style::QuoteKind;
use crate::types::KNOWN_TYPES;

pub const TARGET_MODULE: &str = "vitest";
pub const LEGACY_MODULE: &str = "@jest/globals";

/// One name the rewritten text refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Import {
    Value(&'static str),
    Type(&'static str),
}

/// Runtime-value and type-only names to import, deduplicated and sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    values: BTreeSet<&'static str>,
    types: BTreeSet<&'static str>,
}

impl ImportPlan {
    pub fn add(&mut self, import: Import) {
        match import {
            Import::Value(name) => {
                // A value import also brings the type into scope.
                self.types.remove(name);
                self.values.insert(name);
            }
            Import::Type(name) => {
                if !self.values.contains(name) {
                    self.types.insert(name);
                }
            }
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().copied()
    }

    pub fn types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.types.is_empty()
    }

    /// Drops every name the file already imports from the target module.
    pub fn subtract(&mut self, existing: &BTreeSet<String>) {
        self.values.retain(|name| !existing.contains(*name));
        self.types.retain(|name| !existing.contains(*name));
    }

    /// Declarations to emit, value import first. In globals mode runtime
    /// values come from the environment and only types are imported.
    pub fn declarations(&self, globals: bool, quote: QuoteKind) -> Vec<String> {
        let module = quote.quote(TARGET_MODULE);
        let mut out = vec![];
        if !globals && !self.values.is_empty() {
            let names: Vec<&str> = self.values().collect();
            out.push(format!("import {{ {} }} from {module};", names.join(", ")));
        }
        if !self.types.is_empty() {
            let names: Vec<String> = self.types().map(|t| format!("type {t}")).collect();
            out.push(format!("import {{ {} }} from {module};", names.join(", ")));
        }
        out
    }
}

/// Top-level import layout of a file before rewriting.
#[derive(Debug, Default)]
pub struct ModuleLayout {
    /// Declarations importing from the legacy globals module.
    pub legacy: Vec<Range<usize>>,
    /// Type names the legacy declarations imported that the target module
    /// also exports; they keep being imported after the declaration goes.
    pub carried_types: Vec<&'static str>,
    /// Names already imported from the target module.
    pub existing: BTreeSet<String>,
    /// End offset of the last import declaration that survives rewriting.
    pub anchor: Option<usize>,
}

impl ModuleLayout {
    pub fn scan(unit: &SourceUnit) -> Self {
        let mut layout = Self::default();
        let Program::Module(module) = unit.program() else {
            return layout;
        };
        for item in &module.body {
            let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = item else {
                continue;
            };
            let range = unit.range(decl.span);
            match decl.src.value.as_ref() {
                LEGACY_MODULE => {
                    layout.legacy.push(range);
                    layout.carried_types.extend(
                        imported_names(decl)
                            .filter_map(|name| KNOWN_TYPES.into_iter().find(|t| *t == name)),
                    );
                }
                TARGET_MODULE => {
                    layout.existing.extend(imported_names(decl));
                    layout.anchor = Some(range.end);
                }
                _ => layout.anchor = Some(range.end),
            }
        }
        layout
    }
}

fn imported_names(decl: &ImportDecl) -> impl Iterator<Item = String> + '_ {
    decl.specifiers.iter().filter_map(|s| match s {
        ImportSpecifier::Named(named) => Some(match &named.imported {
            Some(ModuleExportName::Ident(i)) => i.sym.to_string(),
            Some(ModuleExportName::Str(s)) => s.value.to_string(),
            None => named.local.sym.to_string(),
        }),
        ImportSpecifier::Default(_) | ImportSpecifier::Namespace(_) => None,
    })
}

/// Puts `block` at the top of `text`, after a shebang line if there is one,
/// separated from the rest by a blank line.
pub fn prepend(text: &str, block: &str) -> String {
    let split = if text.starts_with("#!") {
        text.find('\n').map(|i| i + 1).unwrap_or(text.len())
    } else {
        0
    };
    let (head, rest) = text.split_at(split);
    let mut out = String::with_capacity(text.len() + block.len() + 3);
    out.push_str(head);
    if !head.is_empty() && !head.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(block);
    out.push('\n');
    if !rest.is_empty() && !rest.starts_with('\n') && !rest.starts_with("\r\n") {
        out.push('\n');
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_keeps_values_and_types_disjoint() {
        let mut plan = ImportPlan::default();
        plan.add(Import::Type("Mock"));
        plan.add(Import::Value("vi"));
        plan.add(Import::Value("Mock"));
        plan.add(Import::Type("Mock"));
        assert_eq!(plan.values().collect::<Vec<_>>(), vec!["Mock", "vi"]);
        assert_eq!(plan.types().count(), 0);
    }

    #[test]
    fn declarations_are_sorted_and_quoted() {
        let mut plan = ImportPlan::default();
        plan.add(Import::Value("vi"));
        plan.add(Import::Value("describe"));
        plan.add(Import::Value("vi"));
        plan.add(Import::Type("Mocked"));
        plan.add(Import::Type("Mock"));
        assert_eq!(
            plan.declarations(false, QuoteKind::Double),
            vec![
                "import { describe, vi } from \"vitest\";".to_string(),
                "import { type Mock, type Mocked } from \"vitest\";".to_string(),
            ]
        );
    }

    #[test]
    fn globals_mode_keeps_type_imports() {
        let mut plan = ImportPlan::default();
        plan.add(Import::Value("vi"));
        plan.add(Import::Type("Mock"));
        assert_eq!(
            plan.declarations(true, QuoteKind::Single),
            vec!["import { type Mock } from 'vitest';".to_string()]
        );
    }

    #[test]
    fn subtract_removes_already_imported_names() {
        let mut plan = ImportPlan::default();
        plan.add(Import::Value("vi"));
        plan.add(Import::Value("test"));
        let existing: BTreeSet<String> = ["vi".to_string()].into_iter().collect();
        plan.subtract(&existing);
        assert_eq!(plan.values().collect::<Vec<_>>(), vec!["test"]);
    }

    #[test]
    fn scan_separates_legacy_and_target_imports() {
        let text = "import { jest, type Mock } from '@jest/globals';\nimport { vi as v, test } from 'vitest';\nimport a from './a';\n\ntest('x', () => {});\n";
        let unit = SourceUnit::parse("a.test.ts", text).unwrap();
        let layout = ModuleLayout::scan(&unit);
        assert_eq!(layout.legacy.len(), 1);
        assert_eq!(layout.carried_types, vec!["Mock"]);
        assert!(layout.existing.contains("vi"));
        assert!(layout.existing.contains("test"));
        assert_eq!(layout.anchor, Some(text.find("\n\n").unwrap()));
    }

    #[test]
    fn prepend_adds_blank_line_once() {
        assert_eq!(prepend("foo();\n", "import { vi } from 'vitest';"), "import { vi } from 'vitest';\n\nfoo();\n");
        assert_eq!(prepend("\nfoo();\n", "X"), "X\n\nfoo();\n");
        assert_eq!(prepend("#!/usr/bin/env node\nfoo();\n", "X"), "#!/usr/bin/env node\nX\n\nfoo();\n");
    }
}
