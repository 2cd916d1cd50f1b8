use std::fmt;

/// A construct the engine recognised but could not (or chose not to) rewrite.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub line: usize,
    pub construct: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: `{}`: {}",
            self.path, self.line, self.construct, self.message
        )
    }
}

/// Per-file sink handed to the traversal. Collected diagnostics travel back
/// with the rewritten file instead of going through a global logger.
#[derive(Debug, Default)]
pub struct Diagnostics {
    path: String,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            items: vec![],
        }
    }

    pub fn report(&mut self, line: usize, construct: impl Into<String>, message: impl Into<String>) {
        self.items.push(Diagnostic {
            path: self.path.clone(),
            line,
            construct: construct.into(),
            message: message.into(),
        });
    }

    /// Standard wording for an old-namespace call with no safe rewrite.
    pub fn unmapped(&mut self, line: usize, construct: impl Into<String>) {
        self.report(
            line,
            construct,
            "cannot be transformed automatically; migrate it to the Vitest equivalent by hand",
        );
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
