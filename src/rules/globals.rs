//! Test-lifecycle functions: `describe`, `it`, `test`, hooks and `expect`.

use swc_core::{
    common::{Span, Spanned},
    ecma::ast::{ArrowExpr, BlockStmtOrExpr, CallExpr, Expr, Function, Pat},
};

use super::{Outcome, RuleCx, RuleEntry, Site};
use crate::chain::Via;
use crate::scope::PromiseWrap;

pub fn lookup(name: &str) -> Option<(&'static str, RuleEntry)> {
    let entry = match name {
        "describe" => ("describe", RuleEntry::Rename("describe")),
        "fdescribe" => ("fdescribe", RuleEntry::Rename("describe.only")),
        "xdescribe" => ("xdescribe", RuleEntry::Rename("describe.skip")),
        "expect" => ("expect", RuleEntry::Rename("expect")),
        "it" => ("it", RuleEntry::Transform(test)),
        "fit" => ("fit", RuleEntry::Transform(test)),
        "xit" => ("xit", RuleEntry::Transform(test)),
        "test" => ("test", RuleEntry::Transform(test)),
        "xtest" => ("xtest", RuleEntry::Transform(test)),
        "beforeAll" => ("beforeAll", RuleEntry::Transform(hook)),
        "afterAll" => ("afterAll", RuleEntry::Transform(hook)),
        "beforeEach" => ("beforeEach", RuleEntry::Transform(hook)),
        "afterEach" => ("afterEach", RuleEntry::Transform(hook)),
        _ => return None,
    };
    Some(entry)
}

/// Modifiers whose name differs between the frameworks.
fn modifier(name: &str) -> Option<&'static str> {
    match name {
        "failing" => Some("fails"),
        _ => None,
    }
}

/// Rewrites the root to `to` (which may carry a modifier, `it.only`) and
/// renames deprecated modifiers further down the chain.
pub fn rename(cx: &mut RuleCx<'_>, site: &Site<'_>, to: &'static str) -> Outcome {
    if site.chain.owns_segments() {
        cx.rename_segment(site.chain.root(), to);
        for segment in &site.chain.segments()[1..] {
            if let Some(renamed) = modifier(&segment.name) {
                cx.replace(segment.span, renamed);
            }
        }
    }
    Outcome::Uses(to.split('.').next().unwrap_or(to))
}

fn test(cx: &mut RuleCx<'_>, site: &Site<'_>, key: &'static str) -> Outcome {
    let to = match key {
        "fit" => "it.only",
        "xit" => "it.skip",
        "xtest" => "test.skip",
        other => other,
    };
    let outcome = rename(cx, site, to);

    let chain = &site.chain;
    let each = chain.contains("each");
    // `test.each(table)` only carries the table; the test itself is the
    // curried call around it.
    if each && matches!(chain.via, Via::Direct) {
        return outcome;
    }
    let arity = match chain.via {
        Via::Tagged(_) => Some(1),
        Via::Curried(inner) if each => table_arity(inner),
        _ if each => None,
        _ => Some(0),
    };
    if let Some(callback) = site.call.args.get(1).filter(|a| a.spread.is_none()) {
        wrap_completion_callback(cx, site, &callback.expr, arity);
    }
    outcome
}

fn hook(cx: &mut RuleCx<'_>, site: &Site<'_>, key: &'static str) -> Outcome {
    let Some(callback) = site.call.args.first().filter(|a| a.spread.is_none()) else {
        return Outcome::Uses(key);
    };
    if let Expr::Arrow(arrow) = &*callback.expr {
        if let BlockStmtOrExpr::Expr(body) = &*arrow.body {
            // Already a promise-returning hook; a block would discard the promise.
            if is_new_promise(body) {
                return Outcome::Uses(key);
            }
            let indent = cx.indent_of(site);
            let unit = cx.style.indent.as_str();
            let body = cx.range(body.span());
            cx.edits.insert(body.start, format!("{{\n{indent}{unit}"));
            cx.edits.insert(body.end, format!(";\n{indent}}}"));
        }
    }
    wrap_completion_callback(cx, site, &callback.expr, Some(0));
    Outcome::Uses(key)
}

fn is_new_promise(expr: &Expr) -> bool {
    match expr {
        Expr::New(new) => matches!(&*new.callee, Expr::Ident(id) if id.sym.as_ref() == "Promise"),
        Expr::Paren(paren) => is_new_promise(&paren.expr),
        _ => false,
    }
}

/// Number of row arguments an `.each` table passes before the completion
/// callback: array rows spread into arguments, anything else is one argument.
fn table_arity(table_call: &CallExpr) -> Option<usize> {
    let table = table_call.args.first().filter(|a| a.spread.is_none())?;
    let Expr::Array(rows) = &*table.expr else {
        return None;
    };
    let first = rows.elems.first()?.as_ref().filter(|r| r.spread.is_none())?;
    match &*first.expr {
        Expr::Array(row) => Some(row.elems.len()),
        _ => Some(1),
    }
}

#[derive(Clone, Copy)]
enum Callback<'a> {
    Arrow(&'a ArrowExpr),
    Function(&'a Function),
}

/// Schedules `(lead, done) => body` to become
/// `(lead) => new Promise((done) => body)`.
fn wrap_completion_callback(
    cx: &mut RuleCx<'_>,
    site: &Site<'_>,
    callback: &Expr,
    arity: Option<usize>,
) {
    let callback = match callback {
        Expr::Arrow(arrow) => Callback::Arrow(arrow),
        Expr::Fn(f) => Callback::Function(&f.function),
        _ => return,
    };
    let (span, body_span, params): (Span, Span, Vec<&Pat>) = match callback {
        Callback::Arrow(arrow) => (arrow.span, arrow.body.span(), arrow.params.iter().collect()),
        Callback::Function(function) => {
            let Some(body) = &function.body else {
                return;
            };
            if function.is_generator {
                return;
            }
            (function.span, body.span, function.params.iter().map(|p| &p.pat).collect())
        }
    };

    let Some(arity) = arity else {
        if params.len() >= 2 {
            cx.report(
                site,
                "table shape is not a literal, so a completion callback cannot be told apart from row arguments; convert it to a promise by hand",
            );
        }
        return;
    };
    if params.len() != arity + 1 {
        return;
    }
    let Pat::Ident(done) = params[arity] else {
        return;
    };

    let lo = cx.offset(span.lo);
    let header_start = &cx.unit.text()[lo..];
    if matches!(callback, Callback::Function(_))
        && !(header_start.starts_with("function") || header_start.starts_with("async"))
    {
        cx.report(site, "completion callback could not be located; convert it to a promise by hand");
        return;
    }

    let unit = cx.unit;
    let text = unit.text();
    let done_extent = cx.range(pat_extent(params[arity]));
    let first_start = cx.offset(params[0].span().lo);
    let dropped_start = match arity {
        0 => done_extent.start,
        n => cx.range(pat_extent(params[n - 1])).end,
    };
    let body = cx.range(body_span);
    let (prefix, close) = match text[lo..first_start].rfind('(') {
        Some(open) => {
            let Some(close) = text[done_extent.end..body.start].find(')') else {
                cx.report(site, "completion callback could not be located; convert it to a promise by hand");
                return;
            };
            (lo..lo + open + 1, done_extent.end + close)
        }
        // `done => ...`
        None => (lo..done_extent.start, done_extent.end),
    };
    cx.scope.request_wrap(
        lo,
        PromiseWrap {
            prefix,
            dropped: dropped_start..close,
            tail: close..body.start,
            done: done.id.sym.to_string(),
            body_end: body.end,
        },
    );
}

/// Span of a parameter including its type annotation.
fn pat_extent(pat: &Pat) -> Span {
    let ann = match pat {
        Pat::Ident(b) => b.type_ann.as_ref(),
        Pat::Object(o) => o.type_ann.as_ref(),
        Pat::Array(a) => a.type_ann.as_ref(),
        _ => None,
    };
    let span = pat.span();
    match ann {
        Some(ann) if ann.span.hi > span.hi => span.with_hi(ann.span.hi),
        _ => span,
    }
}
