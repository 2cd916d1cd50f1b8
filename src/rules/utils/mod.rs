//! Methods of the legacy utility namespace (`jest.fn`, `jest.mock`, ...).

mod modules;
pub mod timers;

use swc_core::common::Spanned;

use super::{Outcome, RuleCx, RuleEntry, Site, TARGET_NAMESPACE};

pub fn lookup(method: &str) -> Option<(&'static str, RuleEntry)> {
    use RuleEntry::{Rename, Transform};

    let entry = match method {
        "advanceTimersByTime" => ("advanceTimersByTime", Rename("advanceTimersByTime")),
        "advanceTimersByTimeAsync" => ("advanceTimersByTimeAsync", Rename("advanceTimersByTimeAsync")),
        "clearAllMocks" => ("clearAllMocks", Rename("clearAllMocks")),
        "clearAllTimers" => ("clearAllTimers", Rename("clearAllTimers")),
        "doMock" => ("doMock", Rename("doMock")),
        "doUnmock" => ("doUnmock", Rename("doUnmock")),
        "fn" => ("fn", Rename("fn")),
        "getRealSystemTime" => ("getRealSystemTime", Rename("getRealSystemTime")),
        "getTimerCount" => ("getTimerCount", Rename("getTimerCount")),
        "isMockFunction" => ("isMockFunction", Rename("isMockFunction")),
        "resetAllMocks" => ("resetAllMocks", Rename("resetAllMocks")),
        "resetModules" => ("resetModules", Rename("resetModules")),
        "restoreAllMocks" => ("restoreAllMocks", Rename("restoreAllMocks")),
        "runAllTicks" => ("runAllTicks", Rename("runAllTicks")),
        "runAllTimers" => ("runAllTimers", Rename("runAllTimers")),
        "runAllTimersAsync" => ("runAllTimersAsync", Rename("runAllTimersAsync")),
        "runOnlyPendingTimers" => ("runOnlyPendingTimers", Rename("runOnlyPendingTimers")),
        "runOnlyPendingTimersAsync" => ("runOnlyPendingTimersAsync", Rename("runOnlyPendingTimersAsync")),
        "setSystemTime" => ("setSystemTime", Rename("setSystemTime")),
        "spyOn" => ("spyOn", Rename("spyOn")),
        "unmock" => ("unmock", Rename("unmock")),
        "useRealTimers" => ("useRealTimers", Rename("useRealTimers")),

        "useFakeTimers" => ("useFakeTimers", Transform(timers::use_fake_timers)),
        "advanceTimersToNextTimer" => ("advanceTimersToNextTimer", Transform(timers::advance_to_next_timer)),
        "advanceTimersToNextTimerAsync" => ("advanceTimersToNextTimerAsync", Transform(timers::advance_to_next_timer)),
        "setTimeout" => ("setTimeout", Transform(set_timeout)),
        "mock" => ("mock", Transform(modules::mock)),
        "mocked" => ("mocked", Transform(modules::mocked)),
        "requireActual" => ("requireActual", Transform(modules::require_module)),
        "requireMock" => ("requireMock", Transform(modules::require_module)),
        "enableAutomock" => ("enableAutomock", Transform(modules::enable_automock)),
        "disableAutomock" => ("disableAutomock", Transform(modules::disable_automock)),
        _ => return None,
    };
    Some(entry)
}

pub fn dispatch(cx: &mut RuleCx<'_>, site: &Site<'_>) -> Outcome {
    // `jest.fn()()` and friends: the inner call owns the rewrite.
    if !site.chain.owns_segments() {
        return Outcome::Nothing;
    }
    let Some(method) = site.chain.get(1) else {
        return Outcome::Nothing;
    };
    match lookup(&method.name) {
        Some((_, RuleEntry::Rename(to))) => rename(cx, site, to),
        Some((key, RuleEntry::Transform(apply))) => apply(cx, site, key),
        None => {
            cx.unmapped(site);
            Outcome::Nothing
        }
    }
}

/// `jest.<method>` → `vi.<to>`.
pub(super) fn rename(cx: &mut RuleCx<'_>, site: &Site<'_>, to: &str) -> Outcome {
    cx.rename_segment(site.chain.root(), TARGET_NAMESPACE);
    if let Some(method) = site.chain.get(1) {
        cx.rename_segment(method, to);
    }
    Outcome::Uses(TARGET_NAMESPACE)
}

/// `jest.setTimeout(ms)` → `vi.setConfig({ testTimeout: ms })`.
fn set_timeout(cx: &mut RuleCx<'_>, site: &Site<'_>, _key: &'static str) -> Outcome {
    let Some(timeout) = site.call.args.first() else {
        cx.report(site, "called without a timeout; set `testTimeout` in the Vitest config instead");
        return Outcome::Nothing;
    };
    let outcome = rename(cx, site, "setConfig");
    let arg = cx.range(timeout.expr.span());
    cx.edits.insert(arg.start, "{ testTimeout: ");
    cx.edits.insert(arg.end, " }");
    outcome
}
