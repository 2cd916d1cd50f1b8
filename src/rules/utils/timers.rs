use std::sync::LazyLock;

use regex::Regex;
use swc_core::{
    common::Spanned,
    ecma::ast::{Expr, Lit, ObjectLit, Prop, PropName, PropOrSpread},
};

use super::rename;
use crate::rules::{Outcome, RuleCx, Site, TARGET_NAMESPACE};
use crate::style::{IndentUnit, QuoteKind};

/// Globals the legacy fake-timer implementation replaces, in its own order.
pub const FAKEABLE_APIS: [&str; 15] = [
    "Date",
    "hrtime",
    "nextTick",
    "performance",
    "queueMicrotask",
    "requestAnimationFrame",
    "cancelAnimationFrame",
    "requestIdleCallback",
    "cancelIdleCallback",
    "setImmediate",
    "clearImmediate",
    "setInterval",
    "clearInterval",
    "setTimeout",
    "clearTimeout",
];

/// The fakeable APIs minus `do_not_fake`, in list order.
pub fn to_fake<S: AsRef<str>>(do_not_fake: &[S]) -> Vec<&'static str> {
    FAKEABLE_APIS
        .into_iter()
        .filter(|api| !do_not_fake.iter().any(|d| d.as_ref() == *api))
        .collect()
}

/// Largest step count expanded into a chain.
pub const MAX_STEPS: usize = 1000;

static STEP_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9](?:_?[0-9])*$").expect("valid step count regex"));

pub(super) fn use_fake_timers(cx: &mut RuleCx<'_>, site: &Site<'_>, _key: &'static str) -> Outcome {
    let outcome = rename(cx, site, "useFakeTimers");
    let Some(options) = site.call.args.first() else {
        return outcome;
    };
    match &*options.expr {
        Expr::Object(obj) if options.spread.is_none() => translate_options(cx, site, obj),
        _ => cx.report(
            site,
            "options are not an object literal; check them against Vitest's fake timer options",
        ),
    }
    outcome
}

fn prop_key(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(i) => Some(i.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        _ => None,
    }
}

fn string_list(expr: &Expr) -> Option<Vec<String>> {
    let Expr::Array(arr) = expr else {
        return None;
    };
    arr.elems
        .iter()
        .map(|elem| match elem {
            Some(e) if e.spread.is_none() => match &*e.expr {
                Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn render_to_fake(
    apis: &[&str],
    multiline: bool,
    indent: &str,
    unit: IndentUnit,
    quote: QuoteKind,
) -> String {
    let quoted: Vec<String> = apis.iter().map(|api| quote.quote(api)).collect();
    if !multiline || quoted.is_empty() {
        return format!("toFake: [{}]", quoted.join(", "));
    }
    let inner = format!("{indent}{}", unit.as_str());
    format!(
        "toFake: [\n{inner}{}\n{indent}]",
        quoted.join(&format!(",\n{inner}"))
    )
}

/// Rewrites the recognised options one by one, keeping their order.
fn translate_options(cx: &mut RuleCx<'_>, site: &Site<'_>, obj: &ObjectLit) {
    let (Some(first), Some(last)) = (obj.props.first(), obj.props.last()) else {
        return;
    };
    let first_at = cx.offset(first.span().lo);
    let multiline = cx.unit.starts_line(first_at);
    let indent = cx.unit.line_indent(first_at);
    let unit = cx.style.indent;
    let quote = cx.style.quote;

    let mut out: Vec<String> = vec![];
    let mut changed = false;
    for prop in &obj.props {
        let original = cx.slice(prop.span());
        let PropOrSpread::Prop(p) = prop else {
            out.push(original.to_string());
            continue;
        };
        let (key, value) = match &**p {
            Prop::KeyValue(kv) => match prop_key(&kv.key) {
                Some(key) => (key, &*kv.value),
                None => {
                    out.push(original.to_string());
                    continue;
                }
            },
            Prop::Shorthand(id) if id.sym.as_ref() == "now" => {
                out.push(original.to_string());
                continue;
            }
            _ => {
                out.push(original.to_string());
                cx.report(site, format!("option `{original}` was left as is"));
                continue;
            }
        };

        match key.as_str() {
            "now" => out.push(original.to_string()),
            "advanceTimers" => {
                changed = true;
                match value {
                    Expr::Lit(Lit::Bool(b)) => out.push(format!("shouldAdvanceTime: {}", b.value)),
                    Expr::Lit(Lit::Num(_)) => {
                        out.push("shouldAdvanceTime: true".to_string());
                        out.push(format!("advanceTimeDelta: {}", cx.slice(value.span())));
                    }
                    _ => {
                        out.push("shouldAdvanceTime: true".to_string());
                        cx.report(
                            site,
                            "`advanceTimers` is not a literal; set `advanceTimeDelta` by hand if it was a duration",
                        );
                    }
                }
            }
            "doNotFake" => match string_list(value) {
                Some(skip) => {
                    changed = true;
                    out.push(render_to_fake(&to_fake(&skip), multiline, indent, unit, quote));
                }
                None => {
                    out.push(original.to_string());
                    cx.report(site, "`doNotFake` is not a list of string literals; convert it to `toFake` by hand");
                }
            },
            "timerLimit" => {
                changed = true;
                out.push(format!("loopLimit: {}", cx.slice(value.span())));
            }
            other => {
                changed = true;
                cx.report(site, format!("option `{other}` has no Vitest equivalent and was dropped"));
            }
        }
    }

    if !changed {
        return;
    }
    if out.is_empty() {
        let arg = cx.range(obj.span);
        cx.edits.remove(arg);
        return;
    }
    let sep = if multiline {
        format!(",\n{indent}")
    } else {
        ", ".to_string()
    };
    let range = cx.offset(first.span().lo)..cx.offset(last.span().hi);
    cx.edits.replace(range, out.join(&sep));
}

fn step_count(cx: &RuleCx<'_>, expr: &Expr) -> Option<usize> {
    let Expr::Lit(Lit::Num(_)) = expr else {
        return None;
    };
    let raw = cx.slice(expr.span());
    if !STEP_COUNT.is_match(raw) {
        return None;
    }
    raw.replace('_', "").parse().ok().filter(|n| *n > 0)
}

/// `advanceTimersToNextTimer(n)` → `n` chained single steps.
pub(super) fn advance_to_next_timer(cx: &mut RuleCx<'_>, site: &Site<'_>, key: &'static str) -> Outcome {
    let steps = match site.call.args.as_slice() {
        [] => Some(1),
        [arg] if arg.spread.is_none() => step_count(cx, &arg.expr),
        _ => None,
    };
    let Some(steps) = steps else {
        cx.report(site, "step count must be a positive integer literal; expand the steps by hand");
        return Outcome::Nothing;
    };
    if steps > MAX_STEPS {
        cx.report(
            site,
            format!("more than {MAX_STEPS} steps; loop over the single-step call instead"),
        );
        return Outcome::Nothing;
    }

    let outcome = rename(cx, site, key);
    if site.call.args.is_empty() {
        return outcome;
    }
    let Some(method) = site.chain.get(1) else {
        return outcome;
    };
    let step = format!("{key}()");
    let next = if key.ends_with("Async") {
        format!(".then(() => {TARGET_NAMESPACE}.{step})")
    } else {
        format!(".{step}")
    };
    let mut text = step.clone();
    for _ in 1..steps {
        text.push_str(&next);
    }
    let range = cx.offset(method.span.lo)..cx.offset(site.call.span.hi);
    cx.edits.replace(range, text);
    outcome
}
