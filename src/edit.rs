//! Span-addressed text edits.
//!
//! Rules never re-print the tree; they describe changes against the original
//! text. Everything outside an edited range is copied through untouched, so
//! comments, blank lines and quoting survive the migration.

use std::ops::Range;

use crate::imports::{Import, ImportPlan};

#[derive(Debug, Clone)]
struct Edit {
    lo: usize,
    hi: usize,
    text: String,
    seq: usize,
}

impl Edit {
    fn is_insert(&self) -> bool {
        self.lo == self.hi
    }
}

#[derive(Debug, Default)]
pub struct EditBuffer {
    edits: Vec<Edit>,
    uses: Vec<(usize, Import)>,
    seq: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.push(range.start, range.end, text.into());
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.push(at, at, text.into());
    }

    pub fn remove(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.push(range.start, range.end, String::new());
        }
    }

    /// Records that the text at `at` needs `import` from the target module.
    /// The requirement is dropped if `at` ends up inside a replaced range.
    pub fn require(&mut self, at: usize, import: Import) {
        self.uses.push((at, import));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    fn push(&mut self, lo: usize, hi: usize, text: String) {
        debug_assert!(lo <= hi);
        self.edits.push(Edit {
            lo,
            hi,
            text,
            seq: self.seq,
        });
        self.seq += 1;
    }

    /// Orders the edits, drops the ones that collide with an earlier
    /// replacement and derives the import plan from the surviving markers.
    pub fn resolve(mut self) -> Resolved {
        // Document order; at one position inserts go before replacements,
        // then registration order.
        self.edits
            .sort_by_key(|e| (e.lo, !e.is_insert(), e.seq));

        let mut kept: Vec<Edit> = Vec::with_capacity(self.edits.len());
        let mut replaced: Vec<Range<usize>> = vec![];
        let mut cursor = 0usize;
        let mut dropped = 0usize;
        for edit in self.edits {
            if edit.lo < cursor {
                dropped += 1;
                continue;
            }
            if !edit.is_insert() {
                cursor = edit.hi;
                replaced.push(edit.lo..edit.hi);
            }
            kept.push(edit);
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded edits nested in replaced ranges");
        }

        let mut plan = ImportPlan::default();
        for (at, import) in self.uses {
            let swallowed = replaced.iter().any(|r| r.start < at && at < r.end);
            if !swallowed {
                plan.add(import);
            }
        }

        Resolved { edits: kept, plan }
    }
}

/// Edits in final application order, plus the imports they need.
#[derive(Debug)]
pub struct Resolved {
    edits: Vec<Edit>,
    plan: ImportPlan,
}

impl Resolved {
    pub fn plan(&self) -> &ImportPlan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut ImportPlan {
        &mut self.plan
    }

    /// Adds a late insertion (synthesised imports) after everything else
    /// registered at the same position.
    pub fn insert(&mut self, at: usize, text: String) {
        let seq = self.edits.iter().map(|e| e.seq + 1).max().unwrap_or(0);
        let idx = self
            .edits
            .iter()
            .position(|e| e.lo > at || (e.lo == at && !e.is_insert()))
            .unwrap_or(self.edits.len());
        self.edits.insert(
            idx,
            Edit {
                lo: at,
                hi: at,
                text,
                seq,
            },
        );
    }

    pub fn render(&self, source: &str) -> String {
        let grown: usize = self.edits.iter().map(|e| e.text.len()).sum();
        let mut out = String::with_capacity(source.len() + grown);
        let mut cursor = 0usize;
        for edit in &self.edits {
            out.push_str(&source[cursor..edit.lo]);
            out.push_str(&edit.text);
            cursor = cursor.max(edit.hi);
        }
        out.push_str(&source[cursor..]);
        out
    }
}
