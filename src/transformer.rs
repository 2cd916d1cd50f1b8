//! Per-file pipeline: parse, traverse once, aggregate imports, emit text.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use swc_core::{
    common::{Span, Spanned},
    ecma::{
        ast::{
            ArrowExpr, AwaitExpr, CallExpr, Callee, ClassMethod, Constructor, Expr, ExprStmt, Function,
            GetterProp, MemberExpr, MemberProp, MethodKind, MethodProp, Pat, PrivateMethod,
            SetterProp, Str, Tpl, TsTypeRef, VarDeclarator,
        },
        visit::{Visit, VisitWith},
    },
};

use crate::chain::Chain;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::edit::EditBuffer;
use crate::error::MigrateError;
use crate::imports::{self, Import, ModuleLayout};
use crate::literals;
use crate::rules::{self, Outcome, RuleCx, Site};
use crate::scope::{AsyncSlot, FunctionStack};
use crate::source::SourceUnit;
use crate::style::StyleProfile;
use crate::types::{self, TypeRewrite};

/// Options shared by every file of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransformOptions {
    /// Runtime functions are ambient globals; only type imports are emitted.
    pub globals: bool,
}

/// Result of rewriting one file.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub content: String,
    pub changed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Traversing,
    Aggregating,
    Emitting,
    Done,
}

/// Rewrites one file's text. Fails only when the text does not parse.
pub fn transform_source(
    path: &str,
    content: &str,
    options: &TransformOptions,
) -> Result<Rewritten, MigrateError> {
    let unit = SourceUnit::parse(path, content)?;
    let style = StyleProfile::infer(&unit);
    let mut pass = Pass::new(&unit, style);
    let rewritten = pass.run(options);
    tracing::debug!(
        path,
        changed = rewritten.changed,
        diagnostics = rewritten.diagnostics.len(),
        "transformed file"
    );
    Ok(rewritten)
}

struct Pass<'a> {
    phase: Phase,
    unit: &'a SourceUnit,
    style: StyleProfile,
    edits: EditBuffer,
    diagnostics: Diagnostics,
    scope: FunctionStack,
    // Call spans, recorded by the parent node before the call is visited.
    bound_operands: HashSet<Span>,
    awaited: HashSet<Span>,
    statements: HashMap<Span, Range<usize>>,
    // Async slot of the method whose function is about to be entered.
    method_slot: Option<AsyncSlot>,
}

impl<'a> Pass<'a> {
    fn new(unit: &'a SourceUnit, style: StyleProfile) -> Self {
        Self {
            phase: Phase::Start,
            unit,
            style,
            edits: EditBuffer::new(),
            diagnostics: Diagnostics::new(unit.path()),
            scope: FunctionStack::default(),
            bound_operands: HashSet::new(),
            awaited: HashSet::new(),
            statements: HashMap::new(),
            method_slot: None,
        }
    }

    fn advance(&mut self, next: Phase) {
        tracing::trace!(path = self.unit.path(), from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }

    fn run(&mut self, options: &TransformOptions) -> Rewritten {
        let unit = self.unit;

        self.advance(Phase::Traversing);
        unit.program().visit_with(self);

        self.advance(Phase::Aggregating);
        let layout = ModuleLayout::scan(unit);
        for range in &layout.legacy {
            self.edits.remove(unit.removal_range(range.clone()));
        }
        let mut resolved = std::mem::take(&mut self.edits).resolve();
        for name in &layout.carried_types {
            resolved.plan_mut().add(Import::Type(*name));
        }
        resolved.plan_mut().subtract(&layout.existing);

        self.advance(Phase::Emitting);
        let declarations = resolved.plan().declarations(options.globals, self.style.quote);
        let mut content = match (declarations.is_empty(), layout.anchor) {
            (true, _) => resolved.render(unit.text()),
            (false, Some(anchor)) => {
                resolved.insert(anchor, format!("\n{}", declarations.join("\n")));
                resolved.render(unit.text())
            }
            (false, None) => imports::prepend(&resolved.render(unit.text()), &declarations.join("\n")),
        };
        let changed = content != unit.text();
        if changed && !content.ends_with('\n') {
            content.push('\n');
        }

        self.advance(Phase::Done);
        Rewritten {
            content,
            changed,
            diagnostics: std::mem::take(&mut self.diagnostics).into_vec(),
        }
    }

    fn line(&self, span: Span) -> usize {
        self.unit.line(span.lo)
    }

    fn enter_function(&mut self, span: Span, slot: AsyncSlot, is_async: bool) -> bool {
        let lo = self.unit.offset(span.lo);
        let line = self.line(span);
        self.scope.enter(lo, line, slot, is_async)
    }

    fn exit_function(&mut self) {
        self.scope.exit(&mut self.edits, &mut self.diagnostics);
    }

    fn method_slot(&self, key: Span, kind: MethodKind, is_generator: bool) -> AsyncSlot {
        match kind {
            MethodKind::Getter => AsyncSlot::Unavailable("getter"),
            MethodKind::Setter => AsyncSlot::Unavailable("setter"),
            MethodKind::Method if is_generator => AsyncSlot::Unavailable("generator method"),
            MethodKind::Method => AsyncSlot::At(self.unit.offset(key.lo)),
        }
    }
}

impl Visit for Pass<'_> {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if let Callee::Expr(callee) = &n.callee {
            if let Expr::Call(inner) = &**callee {
                self.bound_operands.insert(inner.span);
            }
        }
        if let Some(chain) = Chain::resolve(n) {
            let site = Site {
                call: n,
                chain,
                bound_operand: self.bound_operands.contains(&n.span),
                awaited: self.awaited.contains(&n.span),
                statement: self.statements.get(&n.span).cloned(),
            };
            let mut cx = RuleCx {
                unit: self.unit,
                style: self.style,
                edits: &mut self.edits,
                diagnostics: &mut self.diagnostics,
                scope: &mut self.scope,
            };
            if let Outcome::Uses(name) = rules::dispatch(&mut cx, &site) {
                let at = self.unit.offset(n.span.lo);
                self.edits.require(at, Import::Value(name));
            }
        }
        n.visit_children_with(self);
    }

    fn visit_member_expr(&mut self, n: &MemberExpr) {
        if let Expr::Call(call) = &*n.obj {
            self.bound_operands.insert(call.span);
        }
        if let MemberProp::Ident(prop) = &n.prop {
            if let Some(renamed) = literals::rename_ident(prop.sym.as_ref()) {
                self.edits.replace(self.unit.range(prop.span), renamed);
            }
        }
        n.visit_children_with(self);
    }

    fn visit_await_expr(&mut self, n: &AwaitExpr) {
        if let Expr::Call(call) = &*n.arg {
            self.awaited.insert(call.span);
        }
        n.visit_children_with(self);
    }

    fn visit_expr_stmt(&mut self, n: &ExprStmt) {
        if let Expr::Call(call) = &*n.expr {
            self.statements.insert(call.span, self.unit.range(n.span));
        }
        n.visit_children_with(self);
    }

    fn visit_str(&mut self, n: &Str) {
        if let Some(text) = literals::rename_str(n, self.unit.slice(n.span)) {
            self.edits.replace(self.unit.range(n.span), text);
        }
    }

    fn visit_tpl(&mut self, n: &Tpl) {
        if let Some(text) = literals::rename_tpl(n) {
            self.edits.replace(self.unit.range(n.span), text);
        }
        n.visit_children_with(self);
    }

    fn visit_ts_type_ref(&mut self, n: &TsTypeRef) {
        match types::classify(n) {
            Some(TypeRewrite::Strip { span, name }) => {
                let range = self.unit.range(span);
                self.edits.require(range.start, Import::Type(name));
                self.edits.replace(range, name);
            }
            Some(TypeRewrite::Unknown { name }) => {
                let line = self.line(n.span);
                self.diagnostics.report(
                    line,
                    name,
                    "has no Vitest counterpart; replace the annotation by hand",
                );
            }
            None => {}
        }
        n.visit_children_with(self);
    }

    fn visit_var_declarator(&mut self, n: &VarDeclarator) {
        if let Pat::Ident(binding) = &n.name {
            if let Some(ann) = binding.type_ann.as_deref().filter(|a| types::has_unknown(a)) {
                // Let inference take over rather than keep an unresolvable type.
                let name_end = self.unit.offset(binding.id.span.lo) + binding.id.sym.len();
                let range = name_end..self.unit.offset(ann.span.hi);
                self.edits.remove(range);
                if let Some(init) = &n.init {
                    init.visit_with(self);
                }
                return;
            }
        }
        n.visit_children_with(self);
    }

    fn visit_arrow_expr(&mut self, n: &ArrowExpr) {
        let lo = self.unit.offset(n.span.lo);
        let wrapped = self.enter_function(n.span, AsyncSlot::At(lo), n.is_async);
        if wrapped {
            // The completion parameter is rewritten as a whole.
            let leading = n.params.len().saturating_sub(1);
            if let Some(tp) = &n.type_params {
                tp.visit_with(self);
            }
            for param in &n.params[..leading] {
                param.visit_with(self);
            }
            if let Some(rt) = &n.return_type {
                rt.visit_with(self);
            }
            n.body.visit_with(self);
        } else {
            n.visit_children_with(self);
        }
        self.exit_function();
    }

    fn visit_function(&mut self, n: &Function) {
        let slot = self
            .method_slot
            .take()
            .unwrap_or_else(|| AsyncSlot::At(self.unit.offset(n.span.lo)));
        let wrapped = self.enter_function(n.span, slot, n.is_async);
        if wrapped {
            let leading = n.params.len().saturating_sub(1);
            n.decorators.visit_with(self);
            if let Some(tp) = &n.type_params {
                tp.visit_with(self);
            }
            for param in &n.params[..leading] {
                param.visit_with(self);
            }
            if let Some(rt) = &n.return_type {
                rt.visit_with(self);
            }
            if let Some(body) = &n.body {
                body.visit_with(self);
            }
        } else {
            n.visit_children_with(self);
        }
        self.exit_function();
    }

    fn visit_class_method(&mut self, n: &ClassMethod) {
        n.key.visit_with(self);
        self.method_slot = Some(self.method_slot(n.key.span(), n.kind, n.function.is_generator));
        n.function.visit_with(self);
    }

    fn visit_private_method(&mut self, n: &PrivateMethod) {
        n.key.visit_with(self);
        self.method_slot = Some(self.method_slot(n.key.span, n.kind, n.function.is_generator));
        n.function.visit_with(self);
    }

    fn visit_method_prop(&mut self, n: &MethodProp) {
        n.key.visit_with(self);
        self.method_slot = Some(self.method_slot(
            n.key.span(),
            MethodKind::Method,
            n.function.is_generator,
        ));
        n.function.visit_with(self);
    }

    fn visit_constructor(&mut self, n: &Constructor) {
        self.enter_function(n.span, AsyncSlot::Unavailable("constructor"), false);
        n.visit_children_with(self);
        self.exit_function();
    }

    fn visit_getter_prop(&mut self, n: &GetterProp) {
        self.enter_function(n.span, AsyncSlot::Unavailable("getter"), false);
        n.visit_children_with(self);
        self.exit_function();
    }

    fn visit_setter_prop(&mut self, n: &SetterProp) {
        self.enter_function(n.span, AsyncSlot::Unavailable("setter"), false);
        n.visit_children_with(self);
        self.exit_function();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> String {
        transform_source("a.test.ts", src, &TransformOptions::default())
            .unwrap()
            .content
    }

    #[test]
    fn untouched_file_is_returned_verbatim() {
        let src = "const a = 1;";
        let out = transform_source("a.ts", src, &TransformOptions::default()).unwrap();
        assert!(!out.changed);
        assert_eq!(out.content, src);
    }

    #[test]
    fn imports_follow_last_surviving_import() {
        let out = run("import * as fs from 'node:fs';\n\njest.mock('node:fs');\n");
        assert_eq!(
            out,
            "import * as fs from 'node:fs';\nimport { vi } from 'vitest';\n\nvi.mock('node:fs');\n"
        );
    }

    #[test]
    fn legacy_import_is_replaced_at_top() {
        let out = run("import { jest } from \"@jest/globals\";\n\nconst m: jest.Mock = jest.fn();\n");
        assert_eq!(
            out,
            "import { vi } from \"vitest\";\nimport { type Mock } from \"vitest\";\n\nconst m: Mock = vi.fn();\n"
        );
    }

    #[test]
    fn hook_expression_body_becomes_block() {
        let out = run("beforeEach(() => jest.resetAllMocks());\n");
        assert_eq!(
            out,
            "import { beforeEach, vi } from 'vitest';\n\nbeforeEach(() => {\n  vi.resetAllMocks();\n});\n"
        );
    }

    #[test]
    fn require_actual_awaits_and_marks_factory_async() {
        let out = run("jest.mock('fs', () => {\n  const fs = jest.requireActual('fs');\n  return { ...fs };\n});\n");
        assert!(out.contains("vi.mock('fs', async () => {"));
        assert!(out.contains("const fs = await vi.importActual('fs');"));
    }

    #[test]
    fn require_actual_in_member_access_is_parenthesised() {
        let out = run("const { a } = { a: jest.requireActual('x').a };\n");
        assert!(out.contains("(await vi.importActual('x')).a"));
    }

    #[test]
    fn method_marked_async_before_key() {
        let out = run("class A {\n  static load() {\n    return jest.requireActual('x');\n  }\n}\n");
        assert!(out.contains("static async load() {"));
    }

    #[test]
    fn disable_automock_statement_is_removed() {
        let out = run("jest.disableAutomock();\ntest('a', () => {});\n");
        assert_eq!(out, "import { test } from 'vitest';\n\ntest('a', () => {});\n");
    }

    #[test]
    fn unknown_declarator_annotation_is_dropped() {
        let out = run("let spy: jest.SpyInstance;\nspy = jest.spyOn(console, 'log');\n");
        assert!(out.contains("let spy;\n"));
        assert!(out.contains("spy = vi.spyOn(console, 'log');"));
    }

    #[test]
    fn unknown_parameter_annotation_is_reported() {
        let out = transform_source(
            "a.test.ts",
            "function f(s: jest.SpyInstance) {}\n",
            &TransformOptions::default(),
        )
        .unwrap();
        assert!(!out.changed);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].construct, "jest.SpyInstance");
    }
}
