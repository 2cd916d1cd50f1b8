//! Rewrites Jest test suites into Vitest test suites.
//!
//! The engine parses each test file with swc, walks it once to find calls,
//! type references and literals belonging to Jest's API, and records text
//! edits against the original source. Everything outside an edit is copied
//! through untouched, so formatting and comments survive the migration.
//!
//! ```no_run
//! use jest_to_vitest::{transform_test_files, TestFile, TransformOptions};
//!
//! let files = vec![TestFile {
//!     path: "sum.test.ts".into(),
//!     content: "jest.mock('./sum');\n".into(),
//! }];
//! let report = transform_test_files(files, &TransformOptions::default());
//! assert!(report.failures.is_empty());
//! ```

pub mod chain;
pub mod config;
pub mod diagnostics;
pub mod discover;
pub mod edit;
pub mod error;
pub mod imports;
pub mod literals;
pub mod logging;
pub mod rules;
pub mod scope;
pub mod scripts;
pub mod source;
pub mod style;
pub mod transformer;
pub mod types;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use diagnostics::Diagnostic;
pub use error::MigrateError;
pub use transformer::{transform_source, Rewritten, TransformOptions};

// -----------------------------------------------------------------------------
// Batch API
// -----------------------------------------------------------------------------

/// One test file, as read from disk or handed over by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFile {
    pub path: String,
    pub content: String,
}

/// A file that could not be rewritten. Its entry in
/// [`BatchReport::files`] carries the original content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Every input file, in input order, with its final content.
    pub files: Vec<TestFile>,
    /// Paths whose content changed.
    pub changed: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<Failure>,
}

enum FileOutcome {
    Rewritten(TestFile, Rewritten),
    Failed(TestFile, MigrateError),
}

/// Rewrites a batch of files. Files are independent and processed in
/// parallel; a file that fails to parse is reported and kept unchanged
/// without affecting the rest of the batch.
pub fn transform_test_files(files: Vec<TestFile>, options: &TransformOptions) -> BatchReport {
    let outcomes: Vec<FileOutcome> = files
        .into_par_iter()
        .map(|file| match transform_source(&file.path, &file.content, options) {
            Ok(rewritten) => FileOutcome::Rewritten(file, rewritten),
            Err(err) => FileOutcome::Failed(file, err),
        })
        .collect();

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Rewritten(file, rewritten) => {
                if rewritten.changed {
                    report.changed.push(file.path.clone());
                }
                report.diagnostics.extend(rewritten.diagnostics);
                report.files.push(TestFile {
                    path: file.path,
                    content: rewritten.content,
                });
            }
            FileOutcome::Failed(file, err) => {
                tracing::debug!(path = %file.path, error = %err, "file left unchanged");
                report.failures.push(Failure {
                    path: file.path.clone(),
                    message: err.to_string(),
                });
                report.files.push(file);
            }
        }
    }
    report
}
