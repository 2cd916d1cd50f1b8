//! Rule tables: symbol name → rename or transform.
//!
//! Globals are keyed on the root of the callee chain (`it`, `beforeEach`, ...),
//! utilities on the method called on the legacy namespace (`jest.fn`, ...).
//! Transforms never touch the tree; they describe text edits through
//! [`RuleCx`] and report what they could not rewrite.

pub mod globals;
pub mod utils;

use std::ops::Range;

use swc_core::{
    common::{BytePos, Span},
    ecma::ast::CallExpr,
};

use crate::chain::{Chain, Segment};
use crate::diagnostics::Diagnostics;
use crate::edit::EditBuffer;
use crate::scope::FunctionStack;
use crate::source::SourceUnit;
use crate::style::StyleProfile;

pub const LEGACY_NAMESPACE: &str = "jest";
pub const TARGET_NAMESPACE: &str = "vi";

/// A call under inspection, with the bits of its surroundings rules care about.
pub struct Site<'a> {
    pub call: &'a CallExpr,
    pub chain: Chain<'a>,
    /// The call is the object of a member access or the callee of another
    /// call (`call.x`, `call()`), so a prefix operator needs parentheses.
    pub bound_operand: bool,
    /// The call is the operand of an `await`.
    pub awaited: bool,
    /// Range of the expression statement that consists of exactly this call.
    pub statement: Option<Range<usize>>,
}

/// What a rule leaves for the import aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The call now refers to this target-module export.
    Uses(&'static str),
    /// Removed, reported or left alone: nothing to import.
    Nothing,
}

pub type TransformFn = fn(&mut RuleCx<'_>, &Site<'_>, &'static str) -> Outcome;

#[derive(Clone, Copy)]
pub enum RuleEntry {
    Rename(&'static str),
    Transform(TransformFn),
}

pub struct RuleCx<'a> {
    pub unit: &'a SourceUnit,
    pub style: StyleProfile,
    pub edits: &'a mut EditBuffer,
    pub diagnostics: &'a mut Diagnostics,
    pub scope: &'a mut FunctionStack,
}

impl<'a> RuleCx<'a> {
    pub fn offset(&self, pos: BytePos) -> usize {
        self.unit.offset(pos)
    }

    pub fn range(&self, span: Span) -> Range<usize> {
        self.unit.range(span)
    }

    pub fn slice(&self, span: Span) -> &'a str {
        self.unit.slice(span)
    }

    pub fn line(&self, span: Span) -> usize {
        self.unit.line(span.lo)
    }

    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        let range = self.range(span);
        self.edits.replace(range, text);
    }

    /// Replaces a chain segment unless it already reads `text`.
    pub fn rename_segment(&mut self, segment: &Segment, text: &str) {
        if segment.name != text {
            self.replace(segment.span, text);
        }
    }

    /// Indentation of the line the call starts on.
    pub fn indent_of(&self, site: &Site<'_>) -> &'a str {
        let at = self.offset(site.call.span.lo);
        self.unit.line_indent(at)
    }

    pub fn report(&mut self, site: &Site<'_>, message: impl Into<String>) {
        let line = self.line(site.call.span);
        self.diagnostics.report(line, site.chain.dotted(), message);
    }

    pub fn unmapped(&mut self, site: &Site<'_>) {
        let line = self.line(site.call.span);
        self.diagnostics.unmapped(line, site.chain.dotted());
    }
}

/// Routes a call to the utility table when it hangs off the legacy namespace
/// and to the global table otherwise.
pub fn dispatch(cx: &mut RuleCx<'_>, site: &Site<'_>) -> Outcome {
    let root = site.chain.root().name.as_str();
    if root == LEGACY_NAMESPACE {
        return utils::dispatch(cx, site);
    }
    match globals::lookup(root) {
        Some((_, RuleEntry::Rename(to))) => globals::rename(cx, site, to),
        Some((key, RuleEntry::Transform(apply))) => apply(cx, site, key),
        None => Outcome::Nothing,
    }
}
