use swc_core::{
    common::Spanned,
    ecma::ast::{BlockStmtOrExpr, Callee, Expr, Lit, MemberProp, Prop, PropName, PropOrSpread},
};

use super::rename;
use crate::rules::{Outcome, RuleCx, Site, LEGACY_NAMESPACE};

/// Whether a factory body already evaluates to a module namespace object.
fn is_module_shaped(body: &Expr) -> bool {
    match body {
        Expr::Paren(p) => matches!(&*p.expr, Expr::Object(_)),
        Expr::Object(_) => true,
        Expr::Await(a) => is_module_loader(&a.arg),
        other => is_module_loader(other),
    }
}

/// `jest.requireActual(...)` / `jest.requireMock(...)`.
fn is_module_loader(expr: &Expr) -> bool {
    let Expr::Call(call) = expr else {
        return false;
    };
    let Callee::Expr(callee) = &call.callee else {
        return false;
    };
    let Expr::Member(m) = &**callee else {
        return false;
    };
    let on_namespace = matches!(&*m.obj, Expr::Ident(i) if i.sym.as_ref() == LEGACY_NAMESPACE);
    let MemberProp::Ident(method) = &m.prop else {
        return false;
    };
    on_namespace && matches!(method.sym.as_ref(), "requireActual" | "requireMock")
}

/// `jest.mock(path, () => value)` → `vi.mock(path, () => ({ default: value }))`
/// unless the factory already returns an object.
pub(super) fn mock(cx: &mut RuleCx<'_>, site: &Site<'_>, _key: &'static str) -> Outcome {
    let outcome = rename(cx, site, "mock");
    let Some(factory) = site.call.args.get(1).filter(|a| a.spread.is_none()) else {
        return outcome;
    };
    let Expr::Arrow(arrow) = &*factory.expr else {
        return outcome;
    };
    let BlockStmtOrExpr::Expr(body) = &*arrow.body else {
        return outcome;
    };
    if is_module_shaped(body) {
        return outcome;
    }
    let indent = cx.indent_of(site);
    let unit = cx.style.indent.as_str();
    let body = cx.range(body.span());
    cx.edits.insert(body.start, format!("({{\n{indent}{unit}default: "));
    cx.edits.insert(body.end, format!("\n{indent}}})"));
    outcome
}

/// `jest.mocked(v, { shallow })` → `vi.mocked(v, deep)`.
pub(super) fn mocked(cx: &mut RuleCx<'_>, site: &Site<'_>, _key: &'static str) -> Outcome {
    let outcome = rename(cx, site, "mocked");
    let [target, options] = site.call.args.as_slice() else {
        return outcome;
    };
    let obj = match &*options.expr {
        Expr::Object(obj) if options.spread.is_none() => obj,
        _ => {
            cx.report(
                site,
                "second argument is not an options object; Vitest takes a positional `deep` flag",
            );
            return outcome;
        }
    };

    let shallow = obj.props.iter().find_map(|prop| {
        let PropOrSpread::Prop(p) = prop else {
            return None;
        };
        match &**p {
            Prop::KeyValue(kv) => match &kv.key {
                PropName::Ident(i) if i.sym.as_ref() == "shallow" => Some(Some(&*kv.value)),
                PropName::Str(s) if s.value.as_ref() == "shallow" => Some(Some(&*kv.value)),
                _ => None,
            },
            Prop::Shorthand(id) if id.sym.as_ref() == "shallow" => Some(None),
            _ => None,
        }
    });

    match shallow {
        Some(Some(Expr::Lit(Lit::Bool(b)))) => {
            cx.replace(options.expr.span(), (!b.value).to_string());
        }
        Some(Some(value)) => {
            let text = format!("!({})", cx.slice(value.span()));
            cx.replace(options.expr.span(), text);
        }
        Some(None) => cx.replace(options.expr.span(), "!shallow"),
        None => {
            let range = cx.offset(target.expr.span().hi)..cx.offset(options.expr.span().hi);
            cx.edits.remove(range);
        }
    }
    outcome
}

/// `jest.requireActual(m)` → `await vi.importActual(m)`, making the
/// enclosing function async.
pub(super) fn require_module(cx: &mut RuleCx<'_>, site: &Site<'_>, key: &'static str) -> Outcome {
    let to = match key {
        "requireMock" => "importMock",
        _ => "importActual",
    };
    let outcome = rename(cx, site, to);
    if !site.awaited {
        let call = cx.range(site.call.span);
        if site.bound_operand {
            cx.edits.insert(call.start, "(await ");
            cx.edits.insert(call.end, ")");
        } else {
            cx.edits.insert(call.start, "await ");
        }
    }
    cx.scope.mark_async();
    outcome
}

pub(super) fn enable_automock(cx: &mut RuleCx<'_>, site: &Site<'_>, _key: &'static str) -> Outcome {
    cx.report(
        site,
        "Vitest has no automock switch; mock the modules explicitly with `vi.mock` in a setup file",
    );
    Outcome::Nothing
}

/// Automocking is off by default in the target, so the call just goes.
pub(super) fn disable_automock(cx: &mut RuleCx<'_>, site: &Site<'_>, _key: &'static str) -> Outcome {
    match &site.statement {
        Some(stmt) => {
            let range = cx.unit.removal_range(stmt.clone());
            cx.edits.remove(range);
        }
        None => cx.report(site, "used inside an expression; remove it by hand"),
    }
    Outcome::Nothing
}
