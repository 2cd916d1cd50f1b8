//! Enclosing-function bookkeeping.
//!
//! Rules that change a function header (marking it `async`, turning a
//! completion callback into a promise) only record their intent here. The
//! header edit is emitted once the traversal leaves the function, so several
//! requests against the same function collapse into one rewrite.

use std::collections::HashMap;
use std::ops::Range;

use crate::diagnostics::Diagnostics;
use crate::edit::EditBuffer;

/// Where `async ` can be inserted for a function, if anywhere.
#[derive(Debug, Clone, Copy)]
pub enum AsyncSlot {
    At(usize),
    Unavailable(&'static str),
}

/// `(lead) => new Promise((done) => body)` in place of `(lead, done) => body`.
///
/// The leading parameters are left in place so edits inside them (type
/// annotations) still apply; only the text around them is rewritten.
#[derive(Debug, Clone)]
pub struct PromiseWrap {
    /// Function start through its opening parenthesis, or up to the sole
    /// parameter of a paren-less arrow. Becomes `(`.
    pub prefix: Range<usize>,
    /// The completion parameter and the separator before it.
    pub dropped: Range<usize>,
    /// Closing parenthesis up to the body.
    pub tail: Range<usize>,
    pub done: String,
    pub body_end: usize,
}

#[derive(Debug)]
struct Frame {
    line: usize,
    slot: AsyncSlot,
    is_async: bool,
    needs_async: bool,
    wrap: Option<PromiseWrap>,
}

#[derive(Debug, Default)]
pub struct FunctionStack {
    frames: Vec<Frame>,
    pending: HashMap<usize, PromiseWrap>,
}

impl FunctionStack {
    /// Schedules a promise wrap for the function starting at `fn_lo`; it is
    /// picked up when the traversal enters that function.
    pub fn request_wrap(&mut self, fn_lo: usize, wrap: PromiseWrap) {
        self.pending.insert(fn_lo, wrap);
    }

    /// Enters a function. Returns true when a promise wrap was scheduled for
    /// it, in which case the completion parameter must not be visited.
    pub fn enter(&mut self, fn_lo: usize, line: usize, slot: AsyncSlot, is_async: bool) -> bool {
        let wrap = self.pending.remove(&fn_lo);
        let wrapped = wrap.is_some();
        self.frames.push(Frame {
            line,
            slot,
            is_async,
            needs_async: false,
            wrap,
        });
        wrapped
    }

    /// Marks the innermost function as needing `async`. Returns false at
    /// module level, where `await` is allowed as is.
    pub fn mark_async(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.needs_async = true;
                true
            }
            None => false,
        }
    }

    pub fn exit(&mut self, edits: &mut EditBuffer, diagnostics: &mut Diagnostics) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let make_async = frame.needs_async && !frame.is_async;

        if let Some(wrap) = frame.wrap {
            let inner_async = if frame.is_async || frame.needs_async {
                "async "
            } else {
                ""
            };
            edits.replace(wrap.prefix, "(");
            edits.remove(wrap.dropped);
            edits.replace(
                wrap.tail,
                format!(") => new Promise({inner_async}({}) => ", wrap.done),
            );
            edits.insert(wrap.body_end, ")");
            return;
        }

        if make_async {
            match frame.slot {
                AsyncSlot::At(at) => edits.insert(at, "async "),
                AsyncSlot::Unavailable(what) => diagnostics.report(
                    frame.line,
                    what,
                    "contains an `await` but cannot be made async; restructure it by hand",
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn async_marking_inserts_at_slot_on_exit() {
        let mut stack = FunctionStack::default();
        let mut edits = EditBuffer::new();
        let mut diags = Diagnostics::new("a.test.ts");
        stack.enter(0, 1, AsyncSlot::At(0), false);
        assert!(stack.mark_async());
        stack.exit(&mut edits, &mut diags);
        let out = edits.resolve().render("() => x");
        assert_eq!(out, "async () => x");
    }

    #[test]
    fn module_level_needs_no_marking() {
        let mut stack = FunctionStack::default();
        assert!(!stack.mark_async());
    }

    #[test]
    fn wrap_and_async_compose_into_one_header() {
        let src = "async (row, done) => { f(); }";
        let mut stack = FunctionStack::default();
        let mut edits = EditBuffer::new();
        let mut diags = Diagnostics::new("a.test.ts");
        stack.request_wrap(
            0,
            PromiseWrap {
                prefix: 0..7,
                dropped: 10..16,
                tail: 16..21,
                done: "done".into(),
                body_end: src.len(),
            },
        );
        assert!(stack.enter(0, 1, AsyncSlot::At(0), true));
        stack.exit(&mut edits, &mut diags);
        let out = edits.resolve().render(src);
        assert_eq!(out, "(row) => new Promise(async (done) => { f(); })");
    }

    #[test]
    fn paren_less_arrow_gains_parentheses() {
        let src = "done => { f(); }";
        let mut stack = FunctionStack::default();
        let mut edits = EditBuffer::new();
        let mut diags = Diagnostics::new("a.test.ts");
        stack.request_wrap(
            0,
            PromiseWrap {
                prefix: 0..0,
                dropped: 0..4,
                tail: 4..8,
                done: "done".into(),
                body_end: src.len(),
            },
        );
        stack.enter(0, 1, AsyncSlot::At(0), false);
        stack.exit(&mut edits, &mut diags);
        let out = edits.resolve().render(src);
        assert_eq!(out, "() => new Promise((done) => { f(); })");
    }

    #[test]
    fn unavailable_slot_reports() {
        let mut stack = FunctionStack::default();
        let mut edits = EditBuffer::new();
        let mut diags = Diagnostics::new("a.test.ts");
        stack.enter(4, 3, AsyncSlot::Unavailable("constructor"), false);
        stack.mark_async();
        stack.exit(&mut edits, &mut diags);
        assert!(edits.is_empty());
        assert_eq!(diags.into_vec().len(), 1);
    }
}
